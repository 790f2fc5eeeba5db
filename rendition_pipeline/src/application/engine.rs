// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Rendition Engine
//!
//! The single public entry point of the pipeline. An engine owns a
//! transformer registry and an exclusive per-activation context, and drives
//! one plan through its whole lifecycle:
//!
//! 1. [`Engine::refine_plan`] — probe the source when configured, run the
//!    plan finder, and append the discovered steps. Finder failures never
//!    unwind: they are recorded on the context, reported through the event
//!    sink, and the plan is marked failed.
//! 2. [`Engine::run`] — walk the plan step by step, preparing a working
//!    directory and marshalled input for each transformer, invoking its
//!    compute contract, and threading each output into the next step's
//!    input. On success the final rendition is uploaded to any declared
//!    target. Cleanup runs unconditionally.
//!
//! ## Failure Discipline
//!
//! Transformer errors of a known kind pass through unchanged; anything else
//! is wrapped as a generic error located at `{name}_executeTransformer`.
//! Every rendition failure is accumulated on the context and reported as
//! exactly one `rendition_failed` event; [`Engine::run`] returns the
//! accumulated errors rather than throwing.
//!
//! ## Ownership
//!
//! The engine exclusively owns its context (metrics, timers, directories,
//! temporary cloud files, errors). The plan is owned by the caller; the
//! engine advances and fails it but never consumes it. One engine instance
//! serves one plan; independent plans get independent engines and share no
//! mutable state.

use crate::application::engine_context::{filter_user_data, EngineContext, IN_DIR, OUT_DIR};
use crate::infrastructure::config::EngineConfig;
use crate::infrastructure::transfer::{is_data_uri, is_valid_https_url, materialize_data_uri, transfer_concurrency};
use rendition_pipeline_domain::entities::extension_for;
use rendition_pipeline_domain::services::{
    EventSink, MetadataProbe, MetricsSink, NullEventSink, NullMetricsSink, PlanFinder, TemporaryCloudStorage,
    Transformer, TransformerContext, TransformerRegistry, TransferPolicy, TransferService,
};
use rendition_pipeline_domain::{
    AssetDescriptor, Plan, PlanState, Rendition, RenditionError, RenditionEvent, SourceType,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Outcome of one engine run.
///
/// `run` does not fail on rendition errors; they accompany the result.
#[derive(Debug)]
pub struct RunResult {
    pub request_id: String,
    pub rendition_errors: Option<Vec<RenditionError>>,
}

/// The rendition pipeline engine.
pub struct Engine {
    config: EngineConfig,
    registry: TransformerRegistry,
    context: EngineContext,
    event_sink: Arc<dyn EventSink>,
    metrics_sink: Arc<dyn MetricsSink>,
    transfer: Option<Arc<dyn TransferService>>,
    cloud_storage: Option<Arc<dyn TemporaryCloudStorage>>,
    probe: Option<Arc<dyn MetadataProbe>>,
    auth: Option<serde_json::Value>,
}

impl Engine {
    /// Creates an engine for one activation.
    ///
    /// Sinks default to no-ops; transfer, temporary cloud storage, the
    /// metadata probe, and request auth are attached through the builder
    /// methods.
    pub fn new(config: EngineConfig) -> Self {
        let activation_id = Uuid::new_v4().to_string();
        let context = EngineContext::new(activation_id, &config.base_directory);
        Self {
            config,
            registry: TransformerRegistry::new(),
            context,
            event_sink: Arc::new(NullEventSink),
            metrics_sink: Arc::new(NullMetricsSink),
            transfer: None,
            cloud_storage: None,
            probe: None,
            auth: None,
        }
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    pub fn with_metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics_sink = sink;
        self
    }

    pub fn with_transfer_service(mut self, transfer: Arc<dyn TransferService>) -> Self {
        self.transfer = Some(transfer);
        self
    }

    pub fn with_cloud_storage(mut self, storage: Arc<dyn TemporaryCloudStorage>) -> Self {
        self.cloud_storage = Some(storage);
        self
    }

    pub fn with_metadata_probe(mut self, probe: Arc<dyn MetadataProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Request-scoped auth: a generic token plus any service-specific
    /// credential bundles the request carried.
    pub fn with_auth(mut self, auth: serde_json::Value) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn activation_id(&self) -> &str {
        self.context.activation_id()
    }

    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    /// Registers a transformer; a name collision replaces the prior entry
    pub fn register_transformer(&mut self, transformer: Arc<dyn Transformer>) {
        self.registry.register(transformer);
    }

    /// Transfer sizing for this activation: retry discipline from config,
    /// concurrency derived from the memory limit and preferred chunk size
    /// so concurrent chunks stay within the memory budget.
    fn transfer_policy(&self) -> TransferPolicy {
        TransferPolicy {
            retries_enabled: self.config.transfer_retries,
            concurrency: transfer_concurrency(self.config.memory_limit, self.config.preferred_chunk_size),
            chunk_size: self.config.preferred_chunk_size,
        }
    }

    /// Discovers the transformer chain for a request and appends it to the
    /// plan.
    ///
    /// Never unwinds: any probe or finder failure is recorded on the
    /// context, reported as a `rendition_failed` event, and marks the plan
    /// failed. The (possibly probe-augmented) source becomes the plan's
    /// original input.
    pub async fn refine_plan(&mut self, plan: &mut Plan, source: &AssetDescriptor, instructions: &AssetDescriptor) {
        self.context.metrics_mut().record_rendition_requested();

        let mut source = source.clone();
        let steps = match self.resolve_steps(&mut source, instructions).await {
            Ok(steps) => steps,
            Err(err) => {
                warn!(error = %err, "plan refinement failed");
                self.rendition_failure(instructions, &err).await;
                plan.fail();
                return;
            }
        };

        plan.update_original_input(source);
        for step in steps {
            if let Err(err) = plan.add(step.name, step.attributes) {
                self.rendition_failure(instructions, &err).await;
                plan.fail();
                return;
            }
        }
        info!(plan = %plan, "plan refined");
    }

    /// Probes the source when configured, then runs the plan finder.
    async fn resolve_steps(
        &mut self,
        source: &mut AssetDescriptor,
        instructions: &AssetDescriptor,
    ) -> Result<Vec<rendition_pipeline_domain::PlannedStep>, RenditionError> {
        if self.config.probe_metadata {
            if let Some(probe) = self.probe.clone() {
                self.localize_source(source).await?;
                let metadata = probe.probe(source, self.config.probe_timeout).await?;
                metadata.merge_into(source);
            }
        }

        let finder = PlanFinder::new(&self.registry);
        finder.find(source, instructions)
    }

    /// Downloads a remote source once into the activation base directory so
    /// the probe can read local bytes. Sources that are already local, have
    /// no usable URL, or cannot be fetched are left as-is; probing degrades
    /// gracefully.
    async fn localize_source(&mut self, source: &mut AssetDescriptor) -> Result<(), RenditionError> {
        if source.path.is_some() {
            return Ok(());
        }
        let url = match &source.url {
            Some(url) => url.clone(),
            None => return Ok(()),
        };

        self.context.ensure_base_directory().await?;
        let extension = source.media_type().map(extension_for).unwrap_or("bin");
        let file = self.context.base_directory().join(format!("source.{}", extension));

        if is_data_uri(&url) {
            materialize_data_uri(&url, &file).await?;
            source.path = Some(file);
        } else if is_valid_https_url(&url) {
            if let Some(transfer) = self.transfer.clone() {
                let policy = self.transfer_policy();
                self.context.metrics_mut().download_timer().start();
                let bytes = transfer.download(source, &file, &policy).await?;
                self.context.metrics_mut().download_timer().stop();
                self.context.metrics_mut().add_bytes_downloaded(bytes);
                source.path = Some(file);
            }
        }
        Ok(())
    }

    /// Executes the plan to completion and returns the accumulated result.
    ///
    /// Cleanup runs on every exit path; rendition failures are returned, not
    /// thrown.
    pub async fn run(&mut self, plan: &mut Plan) -> RunResult {
        let final_output = self.run_steps(plan).await;

        if plan.state() == PlanState::Succeeded {
            if let Some(output) = &final_output {
                if output.instructions.target.is_some() {
                    self.upload(output).await;
                } else {
                    self.emit_created(&output.instructions).await;
                }
            }
        }

        self.cleanup(plan).await;

        let errors = self.context.rendition_errors().to_vec();
        RunResult {
            request_id: self.context.activation_id().to_string(),
            rendition_errors: if errors.is_empty() { None } else { Some(errors) },
        }
    }

    /// Walks the plan until it leaves the in-progress states.
    async fn run_steps(&mut self, plan: &mut Plan) -> Option<Rendition> {
        let mut previous: Option<Rendition> = None;

        while plan.in_progress() {
            if plan.is_at_start() {
                plan.advance();
                continue;
            }
            if plan.current_step().is_none() {
                break;
            }

            match self.execute_transformer(plan).await {
                Ok(rendition) => {
                    if let Err(err) = self.update_next_step(plan, Some(&rendition)) {
                        plan.fail();
                        let instructions = rendition.instructions.clone();
                        self.rendition_failure(&instructions, &err).await;
                        break;
                    }
                    previous = Some(rendition);
                }
                // Already reported and recorded; the plan is failed.
                Err(_) => break,
            }
        }

        previous
    }

    /// Executes the step under the plan's cursor.
    ///
    /// On failure the error is classified (known kinds pass through,
    /// everything else wraps as a generic error located at this
    /// transformer), the plan is failed, and the failure is reported.
    async fn execute_transformer(&mut self, plan: &mut Plan) -> Result<Rendition, RenditionError> {
        let (name, step_index, step_input, step_output) = {
            let step = match plan.current_step() {
                Some(step) => step,
                None => {
                    let err = RenditionError::generic("No current step to execute", "executeTransformer");
                    plan.fail();
                    return Err(err);
                }
            };
            (
                step.name().to_string(),
                plan.current_position().unwrap_or(0),
                step.input().clone(),
                step.output().clone(),
            )
        };
        let location = format!("{}_executeTransformer", name);

        let transformer = match self.registry.get(&name) {
            Some(transformer) => transformer.clone(),
            None => {
                // A planned step naming an unregistered transformer is a
                // developer error.
                let err = RenditionError::generic(format!("Transformer '{}' is not registered", name), &location);
                plan.fail();
                self.rendition_failure(&step_output, &err).await;
                return Err(err);
            }
        };

        let original_input = plan.original_input().cloned();
        let result = self
            .execute_prepared(&transformer, step_index, &name, &step_input, &step_output, original_input)
            .await;

        match result {
            Ok(output) => {
                self.context.metrics_mut().record_step_executed();
                self.metrics_sink.add(std::collections::HashMap::from([(
                    format!("steps_{}", name),
                    serde_json::Value::from(1.0),
                )]));
                info!(transformer = %name, step = step_index, "step completed");
                Ok(output)
            }
            Err(err) => {
                let err = RenditionError::wrap(err, &location);
                error!(transformer = %name, step = step_index, error = %err, "step failed");
                plan.fail();
                self.rendition_failure(&step_output, &err).await;
                Err(err)
            }
        }
    }

    /// Prepare, compute, verify: the fallible middle of one step.
    async fn execute_prepared(
        &mut self,
        transformer: &Arc<dyn Transformer>,
        step_index: usize,
        name: &str,
        step_input: &AssetDescriptor,
        step_output: &AssetDescriptor,
        original_input: Option<AssetDescriptor>,
    ) -> Result<Rendition, RenditionError> {
        let (input, mut output, ctx) = self
            .prepare(step_index, name, step_input, step_output, original_input)
            .await?;

        transformer.compute(&input, &mut output, &ctx).await?;

        // The engine validates nothing about the content, only existence.
        if output.url.is_none() {
            let metadata = tokio::fs::metadata(&output.path).await.map_err(|_| {
                RenditionError::generic(
                    format!("No rendition generated at '{}'", output.path.display()),
                    format!("{}_executeTransformer", name),
                )
            })?;
            output.size = Some(metadata.len());
        }
        Ok(output)
    }

    /// Builds the working directory, marshalled input, rendition shell, and
    /// transformer context for one step.
    async fn prepare(
        &mut self,
        step_index: usize,
        name: &str,
        step_input: &AssetDescriptor,
        step_output: &AssetDescriptor,
        original_input: Option<AssetDescriptor>,
    ) -> Result<(AssetDescriptor, Rendition, TransformerContext), RenditionError> {
        self.context.ensure_base_directory().await?;
        let directory = self.context.create_working_directory(step_index, name).await?;

        let output = Rendition::new(step_output.clone(), &directory.join(OUT_DIR));

        let mut input = step_input.clone();
        match input.source_type.unwrap_or_default() {
            SourceType::Url => self.prepare_url_input(&mut input, &directory, name).await?,
            SourceType::Local => self.prepare_local_input(&mut input, &directory, name).await?,
        }

        let ctx = TransformerContext {
            step_index,
            transformer_name: name.to_string(),
            original_input,
            directory,
            auth: self.auth.clone(),
            user_data: filter_user_data(step_output.user_data.as_ref(), &self.config.user_data_allow_list),
        };

        Ok((input, output, ctx))
    }

    /// Marshals input for a URL-consuming transformer: HTTPS URLs pass
    /// through; data URIs and local files are staged to temporary cloud
    /// storage and replaced by a presigned URL.
    async fn prepare_url_input(
        &mut self,
        input: &mut AssetDescriptor,
        directory: &Path,
        name: &str,
    ) -> Result<(), RenditionError> {
        match input.url.clone() {
            Some(url) if is_valid_https_url(&url) => Ok(()),
            Some(url) if is_data_uri(&url) => {
                let extension = input.media_type().map(extension_for).unwrap_or("bin");
                let file = directory.join(IN_DIR).join(format!("source.{}", extension));
                materialize_data_uri(&url, &file).await?;
                let handle = self.stage_to_cloud(&file).await?;
                input.url = Some(handle.url);
                input.path = None;
                Ok(())
            }
            Some(url) => Err(RenditionError::source_unsupported(format!(
                "Source url must be a valid https url or datauri: '{}'",
                url
            ))),
            None => {
                let path = input.path.clone().ok_or_else(|| {
                    RenditionError::generic("No source file accessible", format!("{}_prepare", name))
                })?;
                let handle = self.stage_to_cloud(&path).await?;
                input.url = Some(handle.url);
                Ok(())
            }
        }
    }

    /// Marshals input for a local-file transformer: remote content is
    /// brought into the step's `in/` directory and the path is set.
    async fn prepare_local_input(
        &mut self,
        input: &mut AssetDescriptor,
        directory: &Path,
        name: &str,
    ) -> Result<(), RenditionError> {
        match input.url.clone() {
            Some(url) if is_data_uri(&url) => {
                let extension = input.media_type().map(extension_for).unwrap_or("bin");
                let file = directory.join(IN_DIR).join(format!("source.{}", extension));
                materialize_data_uri(&url, &file).await?;
                input.path = Some(file);
                Ok(())
            }
            Some(url) if is_valid_https_url(&url) => {
                let transfer = self.transfer.clone().ok_or_else(|| {
                    RenditionError::invalid_config("No transfer service configured for remote source".to_string())
                })?;
                let extension = input.media_type().map(extension_for).unwrap_or("bin");
                let file = directory.join(IN_DIR).join(format!("source.{}", extension));
                let policy = self.transfer_policy();

                self.context.metrics_mut().download_timer().start();
                let bytes = transfer.download(input, &file, &policy).await?;
                self.context.metrics_mut().download_timer().stop();
                self.context.metrics_mut().add_bytes_downloaded(bytes);

                input.path = Some(file);
                Ok(())
            }
            Some(url) => Err(RenditionError::source_unsupported(format!(
                "Source url must be a valid https url or datauri: '{}'",
                url
            ))),
            None if input.path.is_some() => Ok(()),
            None => Err(RenditionError::generic(
                "No source file accessible",
                format!("{}_prepare", name),
            )),
        }
    }

    /// Stages a local file to temporary cloud storage and registers the
    /// handle for release during cleanup.
    async fn stage_to_cloud(
        &mut self,
        file: &std::path::Path,
    ) -> Result<rendition_pipeline_domain::PresignedHandle, RenditionError> {
        let storage = self.cloud_storage.clone().ok_or_else(|| {
            RenditionError::invalid_config("No temporary cloud storage configured for URL transformer".to_string())
        })?;
        let handle = storage.upload(file).await?;
        self.context.register_cloud_file(handle.clone());
        Ok(handle)
    }

    /// Advances the plan and threads the previous output into the next
    /// step's input (`path`, `url`, and `size` when reported).
    fn update_next_step(&mut self, plan: &mut Plan, previous: Option<&Rendition>) -> Result<(), RenditionError> {
        plan.advance();
        let step = match plan.current_step_mut() {
            Some(step) => step,
            None => return Ok(()),
        };
        // A next step with nothing to consume is a developer error.
        let previous = previous.ok_or_else(|| {
            RenditionError::generic("Missing previous output for next step", "updateNextStep")
        })?;

        let input = step.input_mut();
        input.path = Some(previous.path.clone());
        if previous.url.is_some() {
            input.url = previous.url.clone();
        }
        if let Some(size) = previous.size {
            input.size = Some(size);
        }
        Ok(())
    }

    /// Uploads the final rendition to its declared target and emits the
    /// success event; an upload failure fails only this rendition.
    async fn upload(&mut self, output: &Rendition) {
        let transfer = match self.transfer.clone() {
            Some(transfer) => transfer,
            None => {
                let err = RenditionError::invalid_config("No transfer service configured for upload".to_string());
                self.rendition_failure(&output.instructions, &err).await;
                return;
            }
        };

        let policy = self.transfer_policy();
        self.context.metrics_mut().upload_timer().start();
        let result = transfer.upload(output, &policy).await;
        self.context.metrics_mut().upload_timer().stop();

        match result {
            Ok(()) => {
                if let Some(size) = output.size {
                    self.context.metrics_mut().add_bytes_uploaded(size);
                }
                self.emit_created(&output.instructions).await;
            }
            Err(err) => {
                self.rendition_failure(&output.instructions, &err).await;
            }
        }
    }

    /// Emits the rendition-created event
    async fn emit_created(&mut self, instructions: &AssetDescriptor) {
        self.context.metrics_mut().record_rendition_created();
        let event = RenditionEvent::created(self.context.activation_id(), instructions);
        if let Err(err) = self.event_sink.emit(&event).await {
            warn!(error = %err, "failed to emit rendition_created");
        }
        self.context.mark_final_event_emitted();
    }

    /// Records a rendition failure exactly once per error: the error joins
    /// the context's accumulator, one `rendition_failed` event is emitted,
    /// the metrics sink is notified, and the processing timer stops.
    async fn rendition_failure(&mut self, instructions: &AssetDescriptor, err: &RenditionError) {
        self.context.record_error(err.clone());
        self.context.metrics_mut().record_rendition_failed();
        self.context.metrics_mut().stop_processing_timer();
        self.metrics_sink.handle_error(err, "rendition_failure");

        let event = RenditionEvent::failed(self.context.activation_id(), instructions, err.reason(), err.to_string());
        if let Err(emit_err) = self.event_sink.emit(&event).await {
            warn!(error = %emit_err, "failed to emit rendition_failed");
        }
        self.context.mark_final_event_emitted();
    }

    /// Releases every activation resource. Runs unconditionally after the
    /// step loop: working directories are removed (the base directory
    /// itself survives for reuse), temporary cloud files are released,
    /// timers stop, final metrics are flushed, and a synthetic failure
    /// event covers any rendition that ended without one. A directory leak
    /// terminates the process when the kill-on-leak policy is enabled.
    async fn cleanup(&mut self, plan: &Plan) {
        let mut leaked = false;

        // Sweep every working directory under the activation base; stray
        // directories a transformer created are removed along with the
        // registered ones.
        match tokio::fs::read_dir(self.context.base_directory()).await {
            Ok(mut entries) => loop {
                match entries.next_entry().await {
                    Ok(Some(entry)) => {
                        let path = entry.path();
                        if path.is_dir() {
                            if let Err(err) = tokio::fs::remove_dir_all(&path).await {
                                error!(directory = %path.display(), error = %err, "working directory leak");
                                leaked = true;
                            }
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        error!(error = %err, "cannot enumerate working directories");
                        leaked = true;
                        break;
                    }
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                error!(error = %err, "cannot enumerate working directories");
                leaked = true;
            }
        }

        let handles = self.context.take_cloud_files();
        if let Some(storage) = &self.cloud_storage {
            let removals = handles.iter().map(|handle| storage.remove(handle));
            for (handle, result) in handles.iter().zip(futures::future::join_all(removals).await) {
                if let Err(err) = result {
                    warn!(name = %handle.name, error = %err, "temporary cloud file not released");
                    self.metrics_sink.handle_error(&err, "cleanup");
                }
            }
        }

        self.context.metrics_mut().finish();
        let snapshot = self.context.metrics().snapshot();
        if let Some(fields) = snapshot.as_object() {
            let fields = fields.clone().into_iter().collect();
            if let Err(err) = self.metrics_sink.send("activation", fields).await {
                warn!(error = %err, "failed to send activation metrics");
            }
        }

        if !self.context.final_event_emitted() && plan.state() != PlanState::Initial {
            let instructions = plan.original_input().cloned().unwrap_or_default();
            let err = RenditionError::generic(
                "Rendition lifecycle ended without an event",
                "cleanup",
            );
            self.context.record_error(err.clone());
            let event =
                RenditionEvent::failed(self.context.activation_id(), &instructions, err.reason(), err.to_string());
            if let Err(emit_err) = self.event_sink.emit(&event).await {
                warn!(error = %emit_err, "failed to emit synthetic rendition_failed");
            }
            self.context.mark_final_event_emitted();
        }

        if leaked {
            let err = RenditionError::io_error("Working directory removal failed during cleanup".to_string());
            self.context.record_error(err.clone());
            self.metrics_sink.handle_error(&err, "cleanup");
            if self.config.kill_on_cleanup_failure {
                // Stale working directories must not leak into the next
                // activation.
                error!(exit_code = self.config.leak_exit_code, "terminating on cleanup leak");
                std::process::exit(self.config.leak_exit_code);
            }
        }
    }
}
