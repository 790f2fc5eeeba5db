// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Activation Metrics Entity
//!
//! Aggregated measurements for one engine activation: durations of the
//! probe/processing/transfer phases, byte counts, step and error tallies,
//! plus a free-form field bag for sink-specific additions. The engine owns
//! one instance per activation through its context and flushes a snapshot
//! during cleanup.
//!
//! ## Aggregation Semantics
//!
//! [`ActivationMetrics::add`] merges a field bag: numeric fields accumulate,
//! all other values overwrite. This mirrors how metric sinks fold repeated
//! observations into an activation-level record.

use crate::value_objects::Timer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Aggregated measurements for one engine activation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivationMetrics {
    // Identity fields (always first)
    activation_id: String,

    // Core measurement fields
    renditions_requested: u64,
    renditions_created: u64,
    renditions_failed: u64,
    steps_executed: u64,
    bytes_downloaded: u64,
    bytes_uploaded: u64,

    // Phase timers
    #[serde(skip)]
    processing_timer: Timer,
    #[serde(skip)]
    download_timer: Timer,
    #[serde(skip)]
    upload_timer: Timer,
    processing_seconds: f64,
    download_seconds: f64,
    upload_seconds: f64,

    // Sink-specific additions
    #[serde(default)]
    fields: HashMap<String, serde_json::Value>,

    // Metadata fields (always last)
    started_at: Option<chrono::DateTime<chrono::Utc>>,
    finished_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl ActivationMetrics {
    /// Creates metrics for an activation and starts the processing timer
    pub fn new(activation_id: impl Into<String>) -> Self {
        let mut metrics = Self {
            activation_id: activation_id.into(),
            ..Self::default()
        };
        metrics.processing_timer.start();
        metrics.started_at = Some(chrono::Utc::now());
        metrics
    }

    pub fn activation_id(&self) -> &str {
        &self.activation_id
    }

    pub fn renditions_created(&self) -> u64 {
        self.renditions_created
    }

    pub fn renditions_failed(&self) -> u64 {
        self.renditions_failed
    }

    pub fn steps_executed(&self) -> u64 {
        self.steps_executed
    }

    pub fn processing_seconds(&self) -> f64 {
        if self.processing_timer.is_running() {
            self.processing_timer.elapsed_seconds()
        } else {
            self.processing_seconds
        }
    }

    pub fn record_rendition_requested(&mut self) {
        self.renditions_requested += 1;
    }

    pub fn record_rendition_created(&mut self) {
        self.renditions_created += 1;
    }

    pub fn record_rendition_failed(&mut self) {
        self.renditions_failed += 1;
    }

    pub fn record_step_executed(&mut self) {
        self.steps_executed += 1;
    }

    pub fn add_bytes_downloaded(&mut self, bytes: u64) {
        self.bytes_downloaded += bytes;
    }

    pub fn add_bytes_uploaded(&mut self, bytes: u64) {
        self.bytes_uploaded += bytes;
    }

    /// Times one download and folds the duration into the download total
    pub fn download_timer(&mut self) -> &mut Timer {
        &mut self.download_timer
    }

    pub fn upload_timer(&mut self) -> &mut Timer {
        &mut self.upload_timer
    }

    /// Stops the processing timer; later stops keep the first reading
    pub fn stop_processing_timer(&mut self) {
        self.processing_timer.stop();
        self.processing_seconds = self.processing_timer.elapsed_seconds();
    }

    /// Stops every phase timer and stamps the finish time
    pub fn finish(&mut self) {
        self.stop_processing_timer();
        self.download_timer.stop();
        self.upload_timer.stop();
        self.download_seconds = self.download_timer.elapsed_seconds();
        self.upload_seconds = self.upload_timer.elapsed_seconds();
        if self.finished_at.is_none() {
            self.finished_at = Some(chrono::Utc::now());
        }
    }

    /// Merges a field bag: numbers accumulate, everything else overwrites
    pub fn add(&mut self, fields: HashMap<String, serde_json::Value>) {
        for (name, value) in fields {
            match (self.fields.get(&name).and_then(|v| v.as_f64()), value.as_f64()) {
                (Some(existing), Some(incoming)) => {
                    if let Some(sum) = serde_json::Number::from_f64(existing + incoming) {
                        self.fields.insert(name, serde_json::Value::Number(sum));
                    }
                }
                _ => {
                    self.fields.insert(name, value);
                }
            }
        }
    }

    pub fn fields(&self) -> &HashMap<String, serde_json::Value> {
        &self.fields
    }

    /// Serializable snapshot of the aggregate
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
