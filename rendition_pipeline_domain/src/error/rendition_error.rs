// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Rendition Error System
//!
//! This module provides the hierarchical error system for the rendition
//! pipeline domain. Every failure the engine can surface to a caller or an
//! event sink is expressed as a [`RenditionError`], and every error carries a
//! stable [`ErrorReason`] used as the `errorReason` field of failure events.
//!
//! ## Error Architecture
//!
//! ### Client-visible reasons
//!
//! The first group of variants maps one-to-one onto the reason codes that
//! rendition-failure events expose to callers:
//!
//! - **Generic**: Any wrapped or unclassified failure, annotated with the
//!   location that wrapped it
//! - **SourceUnsupported**: Malformed or unsupported source URL / data URI
//! - **SourceCorrupt**: Metadata probing failed in a way indicating bad bytes
//!   or an unknown container
//! - **SourceFormatUnsupported**: No registered transformer accepts the
//!   source type
//! - **RenditionFormatUnsupported**: No transformer chain reaches the
//!   requested output format
//! - **RenditionTooLarge**: The upload target rejected the rendition size
//!
//! ### Infrastructure kinds
//!
//! The second group covers failures of the machinery itself (I/O,
//! serialization, timeouts, misconfiguration). These all classify as
//! `GenericError` on the wire.
//!
//! ## Propagation Policy
//!
//! Transformer errors of a known kind pass through unchanged; anything else
//! is wrapped via [`RenditionError::wrap`] with a location string naming the
//! transformer. Plan-finder errors fail the plan and surface through the
//! event sink rather than unwinding through business logic.

use thiserror::Error;

/// Stable reason code attached to rendition-failure events.
///
/// Reason codes are part of the external event contract: a failure event
/// carries `errorReason` so downstream consumers can aggregate failures
/// without parsing messages. Known kinds survive wrapping unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorReason {
    GenericError,
    SourceUnsupported,
    SourceCorrupt,
    SourceFormatUnsupported,
    RenditionFormatUnsupported,
    RenditionTooLarge,
}

impl std::fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorReason::GenericError => "GenericError",
            ErrorReason::SourceUnsupported => "SourceUnsupported",
            ErrorReason::SourceCorrupt => "SourceCorrupt",
            ErrorReason::SourceFormatUnsupported => "SourceFormatUnsupported",
            ErrorReason::RenditionFormatUnsupported => "RenditionFormatUnsupported",
            ErrorReason::RenditionTooLarge => "RenditionTooLarge",
        };
        write!(f, "{}", s)
    }
}

/// Domain-specific errors for the rendition pipeline system.
///
/// This enum represents all possible errors that can occur within the
/// scheduling core. Each variant includes a descriptive message designed to
/// provide clear information about what went wrong and, where relevant, which
/// asset attribute or transformer caused it.
///
/// ## Design Principles
///
/// - **Specific**: Each error type represents a specific failure mode
/// - **Classified**: Every variant maps to a stable [`ErrorReason`]
/// - **Cloneable**: Errors accumulate on the activation context and are
///   re-emitted in events, so they must be cheap to clone
#[derive(Error, Debug, Clone)]
pub enum RenditionError {
    /// Wrapped or unclassified failure. `location` names the call site that
    /// performed the wrapping, e.g. `"resize_executeTransformer"`.
    #[error("{message}")]
    Generic { message: String, location: String },

    #[error("Source unsupported: {0}")]
    SourceUnsupported(String),

    #[error("Source corrupt: {0}")]
    SourceCorrupt(String),

    #[error("Source format unsupported: {0}")]
    SourceFormatUnsupported(String),

    #[error("Rendition format unsupported: {0}")]
    RenditionFormatUnsupported(String),

    #[error("Rendition too large: {0}")]
    RenditionTooLarge(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),
}

impl RenditionError {
    /// Creates a generic error with a wrapping location
    pub fn generic(msg: impl Into<String>, location: impl Into<String>) -> Self {
        Self::Generic {
            message: msg.into(),
            location: location.into(),
        }
    }

    /// Creates a new source-unsupported error
    pub fn source_unsupported(msg: impl Into<String>) -> Self {
        Self::SourceUnsupported(msg.into())
    }

    /// Creates a new source-corrupt error
    pub fn source_corrupt(msg: impl Into<String>) -> Self {
        Self::SourceCorrupt(msg.into())
    }

    /// Creates a new configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Creates a new IO error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::IoError(msg.into())
    }

    /// Wraps an arbitrary error at a boundary.
    ///
    /// Known kinds pass through unchanged so their reason codes survive the
    /// crossing; anything else becomes [`RenditionError::Generic`] annotated
    /// with `location`.
    pub fn wrap(err: RenditionError, location: impl Into<String>) -> Self {
        match err {
            RenditionError::IoError(msg)
            | RenditionError::SerializationError(msg)
            | RenditionError::TimeoutError(msg)
            | RenditionError::InvalidConfiguration(msg) => RenditionError::Generic {
                message: msg,
                location: location.into(),
            },
            known => known,
        }
    }

    /// Gets the stable reason code for this error
    pub fn reason(&self) -> ErrorReason {
        match self {
            RenditionError::SourceUnsupported(_) => ErrorReason::SourceUnsupported,
            RenditionError::SourceCorrupt(_) => ErrorReason::SourceCorrupt,
            RenditionError::SourceFormatUnsupported(_) => ErrorReason::SourceFormatUnsupported,
            RenditionError::RenditionFormatUnsupported(_) => ErrorReason::RenditionFormatUnsupported,
            RenditionError::RenditionTooLarge(_) => ErrorReason::RenditionTooLarge,
            RenditionError::Generic { .. }
            | RenditionError::InvalidConfiguration(_)
            | RenditionError::IoError(_)
            | RenditionError::SerializationError(_)
            | RenditionError::TimeoutError(_) => ErrorReason::GenericError,
        }
    }

    /// Checks whether the failure was caused by the submitted request rather
    /// than by the machinery.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RenditionError::SourceUnsupported(_)
                | RenditionError::SourceCorrupt(_)
                | RenditionError::SourceFormatUnsupported(_)
                | RenditionError::RenditionFormatUnsupported(_)
                | RenditionError::RenditionTooLarge(_)
        )
    }

    /// Gets the error category for logging and metrics
    pub fn category(&self) -> &'static str {
        match self {
            RenditionError::Generic { .. } => "generic",
            RenditionError::SourceUnsupported(_) => "source",
            RenditionError::SourceCorrupt(_) => "source",
            RenditionError::SourceFormatUnsupported(_) => "format",
            RenditionError::RenditionFormatUnsupported(_) => "format",
            RenditionError::RenditionTooLarge(_) => "size",
            RenditionError::InvalidConfiguration(_) => "configuration",
            RenditionError::IoError(_) => "io",
            RenditionError::SerializationError(_) => "serialization",
            RenditionError::TimeoutError(_) => "timeout",
        }
    }
}

// Implement conversion from standard library errors
impl From<std::io::Error> for RenditionError {
    fn from(err: std::io::Error) -> Self {
        RenditionError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for RenditionError {
    fn from(err: serde_json::Error) -> Self {
        RenditionError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_reasons_survive_wrapping() {
        let err = RenditionError::RenditionTooLarge("exceeds 100MB".to_string());
        let wrapped = RenditionError::wrap(err, "upload");
        assert_eq!(wrapped.reason(), ErrorReason::RenditionTooLarge);

        let err = RenditionError::SourceFormatUnsupported("application/x-unknown".to_string());
        let wrapped = RenditionError::wrap(err, "plan");
        assert_eq!(wrapped.reason(), ErrorReason::SourceFormatUnsupported);
    }

    #[test]
    fn test_unknown_kinds_wrap_to_generic() {
        let err = RenditionError::IoError("disk full".to_string());
        let wrapped = RenditionError::wrap(err, "resize_executeTransformer");
        match wrapped {
            RenditionError::Generic { message, location } => {
                assert_eq!(message, "disk full");
                assert_eq!(location, "resize_executeTransformer");
            }
            other => panic!("expected Generic, got {:?}", other),
        }
    }

    #[test]
    fn test_client_error_classification() {
        assert!(RenditionError::source_corrupt("bad header").is_client_error());
        assert!(!RenditionError::io_error("read failed").is_client_error());
    }

    #[test]
    fn test_reason_display_is_wire_stable() {
        assert_eq!(ErrorReason::RenditionFormatUnsupported.to_string(), "RenditionFormatUnsupported");
        assert_eq!(ErrorReason::GenericError.to_string(), "GenericError");
    }
}
