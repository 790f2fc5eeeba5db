// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Infrastructure Layer
//!
//! Adapters between the engine and the host: configuration, logging
//! bootstrap, the shell-tool metadata probe, transfer validation glue, and
//! in-process metrics sinks.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod probe;
pub mod transfer;

pub use config::EngineConfig;
pub use logging::{init_logging, LogFormat};
pub use metrics::{CollectingMetricsSink, TracingMetricsSink};
pub use probe::MetadataProbeAdapter;
