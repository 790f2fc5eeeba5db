// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Transformer Manifest
//!
//! A manifest declares a transformer's capability surface: the attribute
//! expressions it accepts on input and produces on output. Manifests are the
//! only thing the plan finder knows about a transformer; the compute contract
//! itself is opaque.
//!
//! ## Wire Format
//!
//! A manifest is a nested structure with `inputs` and `outputs`, each a
//! mapping from attribute name to expression:
//!
//! ```json
//! {
//!   "inputs": {
//!     "type": ["image/png", "image/jpeg"],
//!     "width": { "min": 1, "max": 2000 },
//!     "sourceType": "LOCAL"
//!   },
//!   "outputs": {
//!     "type": ["image/jpeg"],
//!     "quality": { "min": 1, "max": 100 }
//!   }
//! }
//! ```
//!
//! Missing attributes are wildcards; an empty list means "supports nothing".
//!
//! ## Reserved Attributes
//!
//! - `type` — MIME-like media type; mandatory for a capability edge to form
//!   between two transformers
//! - `sourceType` — `URL` or `LOCAL`; declares how the transformer wants its
//!   input delivered and is honored by step preparation
//! - `feature:<name>` — service-feature sentinel checked against the
//!   instance's feature flags during matching

use crate::value_objects::{AttributeExpr, AttributeSet, ATTR_TYPE};
use crate::RenditionError;
use serde::{Deserialize, Serialize};

/// Reserved attribute: input delivery mode requested by a transformer.
pub const ATTR_SOURCE_TYPE: &str = "sourceType";

/// How a transformer wants its input delivered.
///
/// `Url` transformers consume a presigned or public HTTPS URL and never see
/// the local filesystem; `Local` transformers consume a file path inside
/// their working directory. `Local` is the default when a manifest is
/// silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    #[serde(rename = "URL")]
    Url,
    #[serde(rename = "LOCAL")]
    Local,
}

impl Default for SourceType {
    fn default() -> Self {
        SourceType::Local
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::Url => write!(f, "URL"),
            SourceType::Local => write!(f, "LOCAL"),
        }
    }
}

impl std::str::FromStr for SourceType {
    type Err = RenditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "URL" => Ok(SourceType::Url),
            "LOCAL" => Ok(SourceType::Local),
            _ => Err(RenditionError::invalid_config(format!(
                "Unknown sourceType: {}",
                s
            ))),
        }
    }
}

/// A transformer's declared capability surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub inputs: AttributeSet,
    #[serde(default)]
    pub outputs: AttributeSet,
}

impl Manifest {
    /// Creates a manifest from input and output surfaces
    pub fn new(inputs: AttributeSet, outputs: AttributeSet) -> Self {
        Self { inputs, outputs }
    }

    /// Parses a manifest from its JSON wire format
    pub fn from_json(value: serde_json::Value) -> Result<Self, RenditionError> {
        Ok(serde_json::from_value(value)?)
    }

    /// The `sourceType` delivery mode declared on the input surface, if any.
    ///
    /// A priority list collapses to its first entry; unparseable values are
    /// treated as undeclared.
    pub fn declared_source_type(&self) -> Option<SourceType> {
        let expr = self.inputs.get(ATTR_SOURCE_TYPE)?;
        let value = expr.collapse()?;
        value.as_str().and_then(|s| s.parse().ok())
    }

    /// Validates the manifest for registration.
    ///
    /// A transformer without a `type` on either surface can never form a
    /// capability edge or match an instruction, which always indicates a
    /// registration mistake.
    pub fn validate(&self) -> Result<(), RenditionError> {
        if !self.inputs.contains(ATTR_TYPE) {
            return Err(RenditionError::invalid_config(
                "Manifest inputs must declare a type attribute".to_string(),
            ));
        }
        if !self.outputs.contains(ATTR_TYPE) {
            return Err(RenditionError::invalid_config(
                "Manifest outputs must declare a type attribute".to_string(),
            ));
        }
        Ok(())
    }

    /// Builder: declares the accepted input types
    pub fn with_input_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.insert(
            ATTR_TYPE,
            AttributeExpr::list(types.into_iter().map(Into::into)),
        );
        self
    }

    /// Builder: declares the produced output types
    pub fn with_output_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs.insert(
            ATTR_TYPE,
            AttributeExpr::list(types.into_iter().map(Into::into)),
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        let manifest = Manifest::from_json(json!({
            "inputs": {
                "type": ["image/png", "image/jpeg"],
                "width": { "min": 1, "max": 2000 },
                "sourceType": "LOCAL"
            },
            "outputs": {
                "type": ["image/jpeg"]
            }
        }))
        .unwrap();

        assert_eq!(
            manifest.inputs.get("type"),
            Some(&AttributeExpr::list(["image/png", "image/jpeg"]))
        );
        assert_eq!(
            manifest.inputs.get("width"),
            Some(&AttributeExpr::range(1.0, 2000.0))
        );
        assert_eq!(manifest.declared_source_type(), Some(SourceType::Local));
        manifest.validate().unwrap();
    }

    #[test]
    fn test_missing_surfaces_default_to_wildcards() {
        let manifest = Manifest::from_json(json!({})).unwrap();
        assert!(manifest.inputs.is_empty());
        assert!(manifest.outputs.is_empty());
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_declared_source_type_from_list() {
        let manifest = Manifest::from_json(json!({
            "inputs": { "type": ["image/png"], "sourceType": ["URL", "LOCAL"] },
            "outputs": { "type": ["image/png"] }
        }))
        .unwrap();
        assert_eq!(manifest.declared_source_type(), Some(SourceType::Url));
    }

    #[test]
    fn test_undeclared_source_type() {
        let manifest = Manifest::default().with_input_types(["image/png"]);
        assert_eq!(manifest.declared_source_type(), None);
    }
}
