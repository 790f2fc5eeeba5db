// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Entities
//!
//! Stateful objects with identity and lifecycle: the capability manifest, the
//! refinable plan, asset descriptors and renditions, and the per-activation
//! metrics aggregate.

pub mod activation_metrics;
pub mod manifest;
pub mod plan;
pub mod rendition;

pub use activation_metrics::ActivationMetrics;
pub use manifest::{Manifest, SourceType, ATTR_SOURCE_TYPE};
pub use plan::{Plan, PlanState, Step, StepAttributes, MAX_PLAN_STEPS};
pub use rendition::{extension_for, AssetDescriptor, Rendition, Source, UploadTarget};
