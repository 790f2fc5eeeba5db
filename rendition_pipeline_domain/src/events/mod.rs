// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Events
//!
//! Rendition outcome events and their redaction rules. Sinks receive events
//! through the [`EventSink`](crate::services::EventSink) port.

pub mod rendition_events;

pub use rendition_events::{
    redact_instructions, RenditionCreatedEvent, RenditionEvent, RenditionFailedEvent, EVENT_RENDITION_CREATED,
    EVENT_RENDITION_FAILED,
};
