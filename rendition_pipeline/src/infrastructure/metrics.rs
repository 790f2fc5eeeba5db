// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Metrics Collection
//!
//! In-process [`MetricsSink`] implementations. The external metrics backend
//! is an injected collaborator; these sinks cover the common embeddings:
//!
//! - [`TracingMetricsSink`] logs records through `tracing`, which is how
//!   deployments without a dedicated metrics backend observe activations
//! - [`CollectingMetricsSink`] aggregates into an
//!   [`ActivationMetrics`] entity and keeps every sent record for
//!   inspection, used by tests and by embeddings that flush activation
//!   aggregates themselves

use async_trait::async_trait;
use parking_lot::RwLock;
use rendition_pipeline_domain::entities::ActivationMetrics;
use rendition_pipeline_domain::services::MetricsSink;
use rendition_pipeline_domain::RenditionError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

/// Sink that reports metrics as structured log records.
#[derive(Debug, Default)]
pub struct TracingMetricsSink;

#[async_trait]
impl MetricsSink for TracingMetricsSink {
    fn add(&self, fields: HashMap<String, Value>) {
        info!(fields = %serde_json::Value::Object(fields.into_iter().collect()), "metrics add");
    }

    async fn send(&self, kind: &str, fields: HashMap<String, Value>) -> Result<(), RenditionError> {
        info!(kind, fields = %serde_json::Value::Object(fields.into_iter().collect()), "metrics send");
        Ok(())
    }

    fn handle_error(&self, err: &RenditionError, location: &str) {
        error!(location, category = err.category(), error = %err, "metrics error");
    }
}

/// One record delivered through [`MetricsSink::send`].
#[derive(Debug, Clone)]
pub struct SentRecord {
    pub kind: String,
    pub fields: HashMap<String, Value>,
}

/// Sink aggregating into an [`ActivationMetrics`] entity.
#[derive(Debug, Clone)]
pub struct CollectingMetricsSink {
    aggregate: Arc<RwLock<ActivationMetrics>>,
    sent: Arc<RwLock<Vec<SentRecord>>>,
    errors: Arc<RwLock<Vec<(String, String)>>>,
}

impl CollectingMetricsSink {
    pub fn new(activation_id: impl Into<String>) -> Self {
        Self {
            aggregate: Arc::new(RwLock::new(ActivationMetrics::new(activation_id))),
            sent: Arc::new(RwLock::new(Vec::new())),
            errors: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Snapshot of the running aggregate
    pub fn snapshot(&self) -> Value {
        self.aggregate.read().snapshot()
    }

    /// Every record sent so far
    pub fn sent(&self) -> Vec<SentRecord> {
        self.sent.read().clone()
    }

    /// Every error handled so far, as (location, message) pairs
    pub fn errors(&self) -> Vec<(String, String)> {
        self.errors.read().clone()
    }
}

#[async_trait]
impl MetricsSink for CollectingMetricsSink {
    fn add(&self, fields: HashMap<String, Value>) {
        self.aggregate.write().add(fields);
    }

    async fn send(&self, kind: &str, fields: HashMap<String, Value>) -> Result<(), RenditionError> {
        self.sent.write().push(SentRecord {
            kind: kind.to_string(),
            fields,
        });
        Ok(())
    }

    fn handle_error(&self, err: &RenditionError, location: &str) {
        self.errors.write().push((location.to_string(), err.to_string()));
    }
}
