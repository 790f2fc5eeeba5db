// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

// Production code safety enforced via CI lint profiles
// (lib checked separately from tests - tests may use unwrap/expect)

//! # Rendition Pipeline
//!
//! An asset-rendition pipeline engine: given a source asset and a set of
//! output instructions, it discovers a chain of registered content
//! transformers whose capability manifests reach from source to target, then
//! executes the chain step by step with per-step working directories,
//! input/output threading, event emission, activation metrics, and
//! guaranteed cleanup.
//!
//! ## Architecture Overview
//!
//! The workspace follows the domain/application split:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Application Layer                          │
//! │  (Engine, EngineContext, step preparation)                  │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Domain Layer                             │
//! │  (attribute algebra, manifests, plan finder, plan,          │
//! │   transformer contract, ports)   [rendition-pipeline-domain]│
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Infrastructure Layer                         │
//! │  (config, logging, metadata probe tools, transfer glue,     │
//! │   metrics sinks)                                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rendition_pipeline::{Engine, EngineConfig};
//! use rendition_pipeline_domain::{AssetDescriptor, Plan};
//!
//! let mut engine = Engine::new(EngineConfig::default())
//!     .with_event_sink(event_sink)
//!     .with_transfer_service(transfer);
//! engine.register_transformer(resize);
//! engine.register_transformer(tagger);
//!
//! let source = AssetDescriptor::of_type("image/png").with_path("/assets/in.png");
//! let wanted = AssetDescriptor::of_type("image/jpeg");
//!
//! let mut plan = Plan::new();
//! engine.refine_plan(&mut plan, &source, &wanted).await;
//! let result = engine.run(&mut plan).await;
//! assert!(result.rendition_errors.is_none());
//! ```
//!
//! ## Guarantees
//!
//! - Steps execute strictly in order; step *i* finishes (including side
//!   effects) before step *i+1* starts
//! - Renditions are never upscaled past their source dimensions and the
//!   source format is kept whenever the chain admits it
//! - Every exit path releases working directories and temporary cloud
//!   files; the activation base directory survives for reuse
//! - `run` reports rendition failures in its result instead of panicking or
//!   returning early

pub mod application;
pub mod infrastructure;

pub use application::{Engine, EngineContext, RunResult};
pub use infrastructure::{
    init_logging, CollectingMetricsSink, EngineConfig, LogFormat, MetadataProbeAdapter, TracingMetricsSink,
};

// Re-export the domain crate so embedders need a single dependency.
pub use rendition_pipeline_domain as domain;
