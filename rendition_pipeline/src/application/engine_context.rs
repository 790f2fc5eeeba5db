// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Engine Context
//!
//! Per-activation state owned exclusively by the engine: the activation base
//! directory, the metrics aggregate and its timers, every per-transformer
//! working directory, every temporary cloud file, and the accumulated
//! rendition errors. The context is the single place cleanup reads from, so
//! releasing its resources on every exit path is what makes the cleanup
//! guarantee hold.
//!
//! ## Working Directory Layout
//!
//! ```text
//! <base>/<activationId>/
//!   source.<ext>              one-time source download for probing
//!   0-<transformer>/ in/ out/
//!   1-<transformer>/ in/ out/
//! ```

use rendition_pipeline_domain::entities::ActivationMetrics;
use rendition_pipeline_domain::services::PresignedHandle;
use rendition_pipeline_domain::RenditionError;
use std::path::{Path, PathBuf};

/// Name of the input subdirectory inside a working directory.
pub const IN_DIR: &str = "in";
/// Name of the output subdirectory inside a working directory.
pub const OUT_DIR: &str = "out";

/// Exclusive per-activation engine state.
#[derive(Debug)]
pub struct EngineContext {
    activation_id: String,
    base_directory: PathBuf,
    metrics: ActivationMetrics,
    transformer_directories: Vec<PathBuf>,
    cloud_files: Vec<PresignedHandle>,
    rendition_errors: Vec<RenditionError>,
    final_event_emitted: bool,
}

impl EngineContext {
    /// Creates the context for one activation under the worker base
    /// directory. Nothing touches the filesystem until a directory is
    /// actually needed.
    pub fn new(activation_id: impl Into<String>, worker_base: &Path) -> Self {
        let activation_id = activation_id.into();
        let base_directory = worker_base.join(&activation_id);
        Self {
            metrics: ActivationMetrics::new(&activation_id),
            activation_id,
            base_directory,
            transformer_directories: Vec::new(),
            cloud_files: Vec::new(),
            rendition_errors: Vec::new(),
            final_event_emitted: false,
        }
    }

    pub fn activation_id(&self) -> &str {
        &self.activation_id
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Creates the activation base directory if missing
    pub async fn ensure_base_directory(&self) -> Result<(), RenditionError> {
        tokio::fs::create_dir_all(&self.base_directory).await?;
        Ok(())
    }

    /// Creates and registers the working directory for one step, laid out as
    /// `{index}-{transformer}` with `in/` and `out/` subdirectories.
    pub async fn create_working_directory(&mut self, step_index: usize, transformer: &str) -> Result<PathBuf, RenditionError> {
        let directory = self.base_directory.join(format!("{}-{}", step_index, transformer));
        tokio::fs::create_dir_all(directory.join(IN_DIR)).await?;
        tokio::fs::create_dir_all(directory.join(OUT_DIR)).await?;
        self.transformer_directories.push(directory.clone());
        Ok(directory)
    }

    pub fn working_directories(&self) -> &[PathBuf] {
        &self.transformer_directories
    }

    /// Registers a temporary cloud file for release during cleanup
    pub fn register_cloud_file(&mut self, handle: PresignedHandle) {
        self.cloud_files.push(handle);
    }

    /// Drains the registered cloud files for release
    pub fn take_cloud_files(&mut self) -> Vec<PresignedHandle> {
        std::mem::take(&mut self.cloud_files)
    }

    /// Accumulates one rendition error
    pub fn record_error(&mut self, error: RenditionError) {
        self.rendition_errors.push(error);
    }

    pub fn rendition_errors(&self) -> &[RenditionError] {
        &self.rendition_errors
    }

    pub fn metrics(&self) -> &ActivationMetrics {
        &self.metrics
    }

    pub fn metrics_mut(&mut self) -> &mut ActivationMetrics {
        &mut self.metrics
    }

    /// Marks that a final rendition event reached the sink
    pub fn mark_final_event_emitted(&mut self) {
        self.final_event_emitted = true;
    }

    pub fn final_event_emitted(&self) -> bool {
        self.final_event_emitted
    }
}

/// Filters a user-data bag to the allow-listed field names.
///
/// Non-object payloads are dropped entirely; transformers only ever see the
/// vetted fields.
pub fn filter_user_data(user_data: Option<&serde_json::Value>, allow_list: &[String]) -> Option<serde_json::Value> {
    let map = user_data?.as_object()?;
    let filtered: serde_json::Map<String, serde_json::Value> = map
        .iter()
        .filter(|(key, _)| allow_list.iter().any(|allowed| allowed == *key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    if filtered.is_empty() {
        None
    } else {
        Some(serde_json::Value::Object(filtered))
    }
}
