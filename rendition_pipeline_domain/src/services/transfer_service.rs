// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Transfer and Temporary Cloud Storage Ports
//!
//! Infrastructure ports for moving bytes in and out of the activation. The
//! HTTPS transfer layer itself is an external collaborator; the engine only
//! depends on these contracts:
//!
//! - [`TransferService`] downloads source assets into working directories
//!   and uploads final renditions to their declared targets. Oversize
//!   rejections (HTTP 413 and friends) must surface as
//!   `RenditionError::RenditionTooLarge` so the reason code reaches the
//!   failure event unchanged.
//! - [`TemporaryCloudStorage`] issues short-lived presigned URLs for locally
//!   materialized bytes, used when a URL-consuming transformer is handed a
//!   local file or a data URI. Handles are owned by the engine context and
//!   released during cleanup.

use crate::entities::{AssetDescriptor, Rendition};
use crate::RenditionError;
use async_trait::async_trait;
use std::path::Path;

/// Sizing and retry discipline for one transfer operation.
///
/// The engine computes the policy once per activation from its
/// configuration (memory limit ÷ preferred chunk size, capped so
/// `concurrency × chunk_size` stays within the memory budget) and hands it
/// to every `download`/`upload` call, so implementations dispatch their
/// concurrent chunks within the activation's limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPolicy {
    /// Whether failed operations should be retried
    pub retries_enabled: bool,
    /// Number of chunk lanes an operation may run concurrently
    pub concurrency: usize,
    /// Preferred chunk size in bytes
    pub chunk_size: u64,
}

impl Default for TransferPolicy {
    fn default() -> Self {
        Self {
            retries_enabled: true,
            // Default lane count when the memory limit is unknown.
            concurrency: 8,
            chunk_size: 10 * 1024 * 1024,
        }
    }
}

/// Byte-transfer port between the activation and the outside world.
#[async_trait]
pub trait TransferService: Send + Sync {
    /// Downloads the asset's URL to a local file, honoring known size and
    /// content-type hints, chunked and retried per the policy. Returns the
    /// number of bytes written.
    async fn download(
        &self,
        asset: &AssetDescriptor,
        file: &Path,
        policy: &TransferPolicy,
    ) -> Result<u64, RenditionError>;

    /// Uploads a rendition to its declared target: a single URL or an
    /// ordered multi-part `{urls[]}` set, chunked and retried per the
    /// policy.
    async fn upload(&self, rendition: &Rendition, policy: &TransferPolicy) -> Result<(), RenditionError>;
}

/// A temporary cloud object reachable through a presigned URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedHandle {
    /// Provider-side object name, used for release
    pub name: String,
    /// Read URL handed to URL-consuming transformers
    pub url: String,
}

/// Short-lived cloud staging for locally materialized bytes.
#[async_trait]
pub trait TemporaryCloudStorage: Send + Sync {
    /// Uploads a local file and returns its presigned handle
    async fn upload(&self, path: &Path) -> Result<PresignedHandle, RenditionError>;

    /// Releases a previously issued handle
    async fn remove(&self, handle: &PresignedHandle) -> Result<(), RenditionError>;
}
