// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Transformer Contract and Registry
//!
//! A transformer is an opaque content-conversion unit: a unique name, a
//! capability [`Manifest`], and an async compute contract. The engine never
//! inspects what a transformer does to bytes; it only schedules transformers
//! whose declared surfaces chain from source to target.
//!
//! ## Compute Contract
//!
//! `compute(input, output, ctx)` must write the output artifact to
//! `output.path` (or set `output.url` for URL-type outputs). Errors of a
//! known kind pass through the engine unchanged; anything else is wrapped as
//! a generic error naming the transformer.
//!
//! ## Registry
//!
//! Registration is keyed by name with last-writer-wins semantics: a later
//! registration under the same name replaces the earlier transformer.

use crate::entities::{AssetDescriptor, Manifest, Rendition};
use crate::RenditionError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Name prefix selecting the orientation-normalizing transformer prepended
/// to single-step plans targeting metadata-consuming services.
pub const ORIENTATION_NORMALIZER_PREFIX: &str = "normalize-orientation";

/// Request-scoped execution context handed to a transformer's compute call.
///
/// Carries everything a transformer may need beyond its own input/output:
/// the engine's original source descriptor, the step's working directory
/// (with `in/` and `out/` subdirectories), request-scoped auth, and the
/// filtered user-data bag.
#[derive(Debug, Clone)]
pub struct TransformerContext {
    /// Zero-based position of the step in the plan
    pub step_index: usize,
    /// Name of the executing transformer
    pub transformer_name: String,
    /// The engine's original source descriptor, before per-step marshalling
    pub original_input: Option<AssetDescriptor>,
    /// The step's working directory
    pub directory: PathBuf,
    /// Request-scoped auth: generic token plus service-specific bundles
    pub auth: Option<serde_json::Value>,
    /// Caller user data, filtered to the allow-listed field names
    pub user_data: Option<serde_json::Value>,
}

impl TransformerContext {
    /// The `in/` subdirectory of the working directory
    pub fn in_dir(&self) -> PathBuf {
        self.directory.join("in")
    }

    /// The `out/` subdirectory of the working directory
    pub fn out_dir(&self) -> PathBuf {
        self.directory.join("out")
    }
}

/// An opaque content-transformation unit.
///
/// Implementations are instantiated by the caller, registered once on the
/// engine, and treated as immutable thereafter.
#[async_trait]
pub trait Transformer: Send + Sync {
    /// Unique name within a registry
    fn name(&self) -> &str;

    /// Declared capability surface
    fn manifest(&self) -> &Manifest;

    /// Whether this transformer is a metadata-consuming service. Plans whose
    /// sole step is such a service get orientation normalization prepended
    /// when the probed source warrants it.
    fn consumes_metadata(&self) -> bool {
        false
    }

    /// Produces the instructed output from the prepared input.
    ///
    /// Must write the artifact to `output.path`, or set `output.url` for
    /// URL-type outputs.
    async fn compute(
        &self,
        input: &AssetDescriptor,
        output: &mut Rendition,
        ctx: &TransformerContext,
    ) -> Result<(), RenditionError>;
}

/// Mapping from transformer name to transformer.
///
/// Insertion order is irrelevant; lookups are by exact name plus one prefix
/// scan used for the orientation-normalizer convention.
#[derive(Default, Clone)]
pub struct TransformerRegistry {
    transformers: HashMap<String, Arc<dyn Transformer>>,
}

impl TransformerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a transformer; a name collision replaces the prior entry
    pub fn register(&mut self, transformer: Arc<dyn Transformer>) {
        self.transformers.insert(transformer.name().to_string(), transformer);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Transformer>> {
        self.transformers.get(name)
    }

    /// First registered transformer whose name starts with `prefix`.
    ///
    /// Ties are broken by lexicographic name order so the selection is
    /// deterministic across runs.
    pub fn find_by_prefix(&self, prefix: &str) -> Option<&Arc<dyn Transformer>> {
        self.transformers
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .min_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, transformer)| transformer)
    }

    pub fn names(&self) -> Vec<&str> {
        self.transformers.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Arc<dyn Transformer>)> {
        self.transformers.iter()
    }
}

impl std::fmt::Debug for TransformerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformerRegistry")
            .field("names", &self.names())
            .finish()
    }
}
