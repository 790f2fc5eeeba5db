// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Shared fixtures for engine integration tests: scripted transformers, a
//! recording event sink, and filesystem-backed transfer/cloud fakes.

use async_trait::async_trait;
use parking_lot::RwLock;
use rendition_pipeline_domain::services::{
    EventSink, PresignedHandle, TemporaryCloudStorage, Transformer, TransformerContext, TransferPolicy,
    TransferService,
};
use rendition_pipeline_domain::{AssetDescriptor, Manifest, Rendition, RenditionError, RenditionEvent};
use std::path::Path;
use std::sync::Arc;

/// What a scripted transformer does when computed.
#[derive(Clone)]
pub enum Behavior {
    /// Write a small artifact to `output.path`
    WriteOutput,
    /// Fail with the given error
    FailWith(RenditionError),
    /// Write intermediate files under the working directory, then fail
    LitterAndFail,
}

/// A transformer scripted for tests. Records every input it sees.
pub struct TestTransformer {
    name: String,
    manifest: Manifest,
    service: bool,
    behavior: Behavior,
    pub calls: Arc<RwLock<Vec<AssetDescriptor>>>,
}

impl TestTransformer {
    pub fn new(name: &str, manifest: Manifest) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            manifest,
            service: false,
            behavior: Behavior::WriteOutput,
            calls: Arc::new(RwLock::new(Vec::new())),
        })
    }

    pub fn with_behavior(name: &str, manifest: Manifest, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            manifest,
            service: false,
            behavior,
            calls: Arc::new(RwLock::new(Vec::new())),
        })
    }

    pub fn service(name: &str, manifest: Manifest) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            manifest,
            service: true,
            behavior: Behavior::WriteOutput,
            calls: Arc::new(RwLock::new(Vec::new())),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().len()
    }

    pub fn seen_inputs(&self) -> Vec<AssetDescriptor> {
        self.calls.read().clone()
    }
}

#[async_trait]
impl Transformer for TestTransformer {
    fn name(&self) -> &str {
        &self.name
    }

    fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    fn consumes_metadata(&self) -> bool {
        self.service
    }

    async fn compute(
        &self,
        input: &AssetDescriptor,
        output: &mut Rendition,
        ctx: &TransformerContext,
    ) -> Result<(), RenditionError> {
        self.calls.write().push(input.clone());
        match &self.behavior {
            Behavior::WriteOutput => {
                tokio::fs::write(&output.path, b"rendition-bytes").await?;
                Ok(())
            }
            Behavior::FailWith(err) => Err(err.clone()),
            Behavior::LitterAndFail => {
                tokio::fs::write(ctx.in_dir().join("scratch.tmp"), b"partial").await?;
                tokio::fs::write(ctx.out_dir().join("half-written"), b"partial").await?;
                Err(RenditionError::io_error("transformer crashed mid-write"))
            }
        }
    }
}

/// Builds a manifest from input and output type lists.
pub fn manifest(inputs: &[&str], outputs: &[&str]) -> Manifest {
    Manifest::default()
        .with_input_types(inputs.iter().copied())
        .with_output_types(outputs.iter().copied())
}

/// Event sink that records every emitted event.
#[derive(Default)]
pub struct RecordingEventSink {
    events: RwLock<Vec<RenditionEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<RenditionEvent> {
        self.events.read().clone()
    }

    pub fn failures(&self) -> Vec<RenditionEvent> {
        self.events.read().iter().filter(|e| e.is_failure()).cloned().collect()
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn emit(&self, event: &RenditionEvent) -> Result<(), RenditionError> {
        self.events.write().push(event.clone());
        Ok(())
    }
}

/// Transfer fake backed by the local filesystem: "downloads" copy from a
/// configured fixture file, uploads record the rendition they were asked to
/// ship. The policy handed to every operation is recorded so tests can
/// assert the engine's sizing.
#[derive(Default)]
pub struct FsTransferService {
    pub download_fixture: Option<std::path::PathBuf>,
    pub uploads: RwLock<Vec<String>>,
    pub policies: RwLock<Vec<TransferPolicy>>,
    pub reject_uploads_as_too_large: bool,
}

impl FsTransferService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn rejecting_uploads() -> Arc<Self> {
        Arc::new(Self {
            reject_uploads_as_too_large: true,
            ..Self::default()
        })
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.read().len()
    }

    pub fn seen_policies(&self) -> Vec<TransferPolicy> {
        self.policies.read().clone()
    }
}

#[async_trait]
impl TransferService for FsTransferService {
    async fn download(
        &self,
        _asset: &AssetDescriptor,
        file: &Path,
        policy: &TransferPolicy,
    ) -> Result<u64, RenditionError> {
        self.policies.write().push(*policy);
        let bytes = match &self.download_fixture {
            Some(fixture) => tokio::fs::read(fixture).await?,
            None => b"downloaded-bytes".to_vec(),
        };
        tokio::fs::write(file, &bytes).await?;
        Ok(bytes.len() as u64)
    }

    async fn upload(&self, rendition: &Rendition, policy: &TransferPolicy) -> Result<(), RenditionError> {
        self.policies.write().push(*policy);
        if self.reject_uploads_as_too_large {
            return Err(RenditionError::RenditionTooLarge(
                "upload target replied 413".to_string(),
            ));
        }
        let target = rendition
            .instructions
            .target
            .as_ref()
            .map(|t| t.urls().join(","))
            .unwrap_or_default();
        self.uploads.write().push(target);
        Ok(())
    }
}

/// Temporary cloud storage fake issuing deterministic presigned URLs.
#[derive(Default)]
pub struct FakeCloudStorage {
    pub stored: RwLock<Vec<String>>,
    pub removed: RwLock<Vec<String>>,
}

impl FakeCloudStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl TemporaryCloudStorage for FakeCloudStorage {
    async fn upload(&self, path: &Path) -> Result<PresignedHandle, RenditionError> {
        let name = format!("tmp-{}", self.stored.read().len());
        self.stored.write().push(name.clone());
        Ok(PresignedHandle {
            url: format!("https://tmp-cloud.test/{}?sig={}", name, path.display()),
            name,
        })
    }

    async fn remove(&self, handle: &PresignedHandle) -> Result<(), RenditionError> {
        self.removed.write().push(handle.name.clone());
        Ok(())
    }
}
