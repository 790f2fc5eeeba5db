// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Infrastructure Logging
//!
//! Structured logging bootstrap for the engine. Production deployments log
//! JSON for machine parsing; development uses the compact human-readable
//! format. Filtering follows the conventional `RUST_LOG` environment
//! variable, defaulting to `info` for the pipeline crates.
//!
//! The engine itself only depends on the `tracing` macros; initializing a
//! subscriber is the embedding application's choice, and calling
//! [`init_logging`] more than once is a no-op.

use tracing_subscriber::{fmt, EnvFilter};

/// Output format for the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact human-readable lines, for development
    Compact,
    /// JSON lines, for aggregation
    Json,
}

/// Installs the global tracing subscriber.
///
/// Filtering defaults to `info` and honors `RUST_LOG`. Returns quietly when
/// a subscriber is already installed so tests and embeddings can call it
/// unconditionally.
pub fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match format {
        LogFormat::Compact => fmt()
            .with_env_filter(filter)
            .with_target(true)
            .compact()
            .try_init(),
        LogFormat::Json => fmt().with_env_filter(filter).json().try_init(),
    };

    if result.is_err() {
        tracing::debug!("logging already initialized, keeping existing subscriber");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_initialization_is_harmless() {
        init_logging(LogFormat::Compact);
        init_logging(LogFormat::Json);
    }
}
