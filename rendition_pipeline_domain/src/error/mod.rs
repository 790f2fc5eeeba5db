// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error Module
//!
//! This module provides the error types for the rendition pipeline domain,
//! implementing a structured error handling approach that categorizes every
//! failure scenario the scheduling core can encounter.
//!
//! ## Overview
//!
//! The error module defines domain-specific errors that:
//!
//! - **Express Business Failures**: Unsupported formats, corrupt sources,
//!   unreachable rendition targets
//! - **Maintain Type Safety**: Strongly-typed error variants for compile-time
//!   safety
//! - **Provide Context**: Rich error information for debugging and event
//!   payloads
//! - **Support Classification**: A stable reason code accompanies every
//!   variant so event sinks and metrics can aggregate failures
//!
//! ## Error Handling Patterns
//!
//! ### Error Propagation
//! Use the `?` operator for clean error propagation within the domain;
//! the engine converts unclassified failures into
//! [`RenditionError::Generic`] at the transformer boundary.
//!
//! ### Pattern Matching
//! Match on variants for granular handling, or on [`RenditionError::reason`]
//! when only the classification matters.

mod rendition_error;

pub use rendition_error::{ErrorReason, RenditionError};
