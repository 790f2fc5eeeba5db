// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Metadata Probe Port
//!
//! Infrastructure port for inspecting a source asset's intrinsic metadata
//! before planning. The probed values are merged into the source descriptor
//! so the plan finder can cap dimensions, keep formats, and decide whether
//! orientation normalization is needed.

use crate::entities::AssetDescriptor;
use crate::value_objects::{ATTR_HEIGHT, ATTR_ORIENTATION, ATTR_WIDTH};
use crate::RenditionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Intrinsic metadata of a source asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub width: Option<f64>,
    pub height: Option<f64>,
    /// EXIF orientation, 1-8; values above 1 are non-trivial
    pub orientation: Option<f64>,
    /// Container format as reported by the probe (e.g. `PNG`, `JPEG`)
    pub file_type: Option<String>,
    /// Playback duration in seconds, for timeline media
    pub duration: Option<f64>,
}

impl AssetMetadata {
    /// Merges the probed values into a source descriptor's attributes.
    ///
    /// Values already present on the descriptor win: the caller's knowledge
    /// of the asset takes precedence over the probe.
    pub fn merge_into(&self, source: &mut AssetDescriptor) {
        let pairs = [
            (ATTR_WIDTH, self.width),
            (ATTR_HEIGHT, self.height),
            (ATTR_ORIENTATION, self.orientation),
        ];
        for (name, value) in pairs {
            if let Some(value) = value {
                if !source.attributes.contains(name) {
                    source.attributes.insert(name, value);
                }
            }
        }
        if let Some(file_type) = &self.file_type {
            if !source.attributes.contains("fileType") {
                source.attributes.insert("fileType", file_type.clone());
            }
        }
    }
}

/// Source metadata inspection port.
#[async_trait]
pub trait MetadataProbe: Send + Sync {
    /// Probes the (locally materialized) source asset. One probe invocation
    /// may not exceed `timeout`; the engine supplies the configured cap.
    ///
    /// # Errors
    ///
    /// * `SourceCorrupt` - the bytes could not be identified by any probe
    /// * `TimeoutError` - a probe tool exceeded the cap
    async fn probe(
        &self,
        source: &AssetDescriptor,
        timeout: std::time::Duration,
    ) -> Result<AssetMetadata, RenditionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_prefers_existing_values() {
        let mut source = AssetDescriptor::of_type("image/png").with_attribute(ATTR_WIDTH, 100.0);
        let metadata = AssetMetadata {
            width: Some(4000.0),
            height: Some(3000.0),
            orientation: Some(6.0),
            file_type: Some("PNG".to_string()),
            duration: None,
        };
        metadata.merge_into(&mut source);

        assert_eq!(source.width(), Some(100.0));
        assert_eq!(source.height(), Some(3000.0));
        assert_eq!(source.orientation(), Some(6.0));
        assert_eq!(source.attributes.number("fileType"), None);
        assert_eq!(
            source.attributes.get("fileType").and_then(|e| e.collapse()).and_then(|v| v.as_str().map(String::from)),
            Some("PNG".to_string())
        );
    }
}
