// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Metrics Sink Port
//!
//! Infrastructure port for activation metrics. `add` folds fields into the
//! running activation aggregate, `send` emits a record of a given kind, and
//! `handle_error` emits an error metric without interrupting processing.

use crate::RenditionError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Destination for activation metrics.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Folds fields into the activation aggregate
    fn add(&self, fields: HashMap<String, Value>);

    /// Emits a metrics record of the given kind
    async fn send(&self, kind: &str, fields: HashMap<String, Value>) -> Result<(), RenditionError>;

    /// Emits an error metric annotated with the location it surfaced at
    fn handle_error(&self, err: &RenditionError, location: &str);
}

/// Sink that drops every metric, for callers without a metrics service.
#[derive(Debug, Default)]
pub struct NullMetricsSink;

#[async_trait]
impl MetricsSink for NullMetricsSink {
    fn add(&self, _fields: HashMap<String, Value>) {}

    async fn send(&self, _kind: &str, _fields: HashMap<String, Value>) -> Result<(), RenditionError> {
        Ok(())
    }

    fn handle_error(&self, _err: &RenditionError, _location: &str) {}
}
