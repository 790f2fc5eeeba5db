// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Engine Configuration
//!
//! Explicit configuration for the engine. Everything the original system
//! controlled through process-wide environment variables is surfaced here as
//! plain struct fields, with [`EngineConfig::from_env`] as the conventional
//! reader for deployments that still wire through the environment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the worker base directory.
pub const ENV_WORKER_BASE_DIRECTORY: &str = "WORKER_BASE_DIRECTORY";
/// Environment variable disabling transfer retries (any non-empty value).
pub const ENV_DISABLE_RETRIES: &str = "WORKER_DISABLE_RETRIES";
/// Environment variable enabling process termination on cleanup leaks.
pub const ENV_KILL_ON_CLEANUP_FAILURE: &str = "WORKER_KILL_ON_CLEANUP_FAILURE";
/// Environment variable bounding transfer memory, e.g. `512 MB`.
pub const ENV_MEMORY_LIMIT: &str = "WORKER_MEMORY_LIMIT";

/// Default worker base directory when none is configured.
const DEFAULT_BASE_DIRECTORY: &str = "work";
/// Default process exit code for a working-directory leak.
const DEFAULT_LEAK_EXIT_CODE: i32 = 84;
/// Default preferred transfer chunk size (10 MiB).
const DEFAULT_CHUNK_SIZE: u64 = 10 * 1024 * 1024;

/// User-data field names forwarded to transformers by default.
pub const DEFAULT_USER_DATA_FIELDS: [&str; 4] = ["assetUuid", "label", "uploadToken", "requestId"];

/// Explicit engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Parent of per-activation base directories
    pub base_directory: PathBuf,

    /// Probe source metadata before planning
    pub probe_metadata: bool,

    /// Hard cap on one metadata probe invocation
    pub probe_timeout: Duration,

    /// Terminate the process when working directories cannot be removed,
    /// preventing stale-directory reuse across activations
    pub kill_on_cleanup_failure: bool,

    /// Exit code used by the kill-on-leak policy
    pub leak_exit_code: i32,

    /// Whether the transfer layer should retry failed operations
    pub transfer_retries: bool,

    /// Preferred transfer chunk size in bytes
    pub preferred_chunk_size: u64,

    /// Process memory limit in bytes, when known; sizes transfer concurrency
    pub memory_limit: Option<u64>,

    /// User-data field names forwarded to transformers
    pub user_data_allow_list: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_directory: PathBuf::from(DEFAULT_BASE_DIRECTORY),
            probe_metadata: true,
            probe_timeout: Duration::from_secs(30),
            kill_on_cleanup_failure: false,
            leak_exit_code: DEFAULT_LEAK_EXIT_CODE,
            transfer_retries: true,
            preferred_chunk_size: DEFAULT_CHUNK_SIZE,
            memory_limit: None,
            user_data_allow_list: DEFAULT_USER_DATA_FIELDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl EngineConfig {
    /// Reads the conventional environment variables over the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var(ENV_WORKER_BASE_DIRECTORY) {
            if !dir.is_empty() {
                config.base_directory = PathBuf::from(dir);
            }
        }
        if std::env::var(ENV_DISABLE_RETRIES).map(|v| !v.is_empty()).unwrap_or(false) {
            config.transfer_retries = false;
        }
        if std::env::var(ENV_KILL_ON_CLEANUP_FAILURE)
            .map(|v| !v.is_empty())
            .unwrap_or(false)
        {
            config.kill_on_cleanup_failure = true;
        }
        if let Ok(limit) = std::env::var(ENV_MEMORY_LIMIT) {
            if let Ok(bytes) = limit.parse::<byte_unit::Byte>() {
                config.memory_limit = Some(bytes.as_u64());
            }
        }
        config
    }

    /// Builder: base directory
    pub fn with_base_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_directory = dir.into();
        self
    }

    /// Builder: metadata probing toggle
    pub fn with_probe_metadata(mut self, enabled: bool) -> Self {
        self.probe_metadata = enabled;
        self
    }

    /// Builder: kill-on-leak policy
    pub fn with_kill_on_cleanup_failure(mut self, enabled: bool) -> Self {
        self.kill_on_cleanup_failure = enabled;
        self
    }
}
