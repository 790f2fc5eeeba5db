// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Asset Descriptors and Renditions
//!
//! This module defines the concrete payloads that flow through a plan:
//!
//! - [`AssetDescriptor`] — the shared shape of a source descriptor, a
//!   requested output instruction, and a realized step input/output: a bag of
//!   concrete attributes (`type`, `width`, ...) plus transport fields
//!   (`path`, `url`, `size`), delivery mode, user data, and upload targets
//! - [`Rendition`] — the output artifact of one executed step, rooted under
//!   that step's working directory
//! - [`UploadTarget`] — a single presigned URL or a multi-part `{urls[]}`
//!   target for the final rendition
//!
//! ## Serialization
//!
//! Attribute entries are spread as sibling keys of the transport fields, so
//! a descriptor reads naturally on the wire:
//!
//! ```json
//! { "type": "image/png", "width": 500, "path": "/tmp/in.png" }
//! ```

use crate::entities::manifest::SourceType;
use crate::value_objects::{
    AttributeSet, AttributeValue, Features, ATTR_HEIGHT, ATTR_ORIENTATION, ATTR_TYPE, ATTR_WIDTH,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Upload destination for a final rendition.
///
/// Either a single presigned URL or a multi-part target whose parts are
/// uploaded in order and assembled by the storage provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UploadTarget {
    Single(String),
    MultiPart {
        urls: Vec<String>,
        #[serde(rename = "maxPartSize", skip_serializing_if = "Option::is_none")]
        max_part_size: Option<u64>,
    },
}

impl UploadTarget {
    /// All URLs of this target, in upload order
    pub fn urls(&self) -> Vec<&str> {
        match self {
            UploadTarget::Single(url) => vec![url.as_str()],
            UploadTarget::MultiPart { urls, .. } => urls.iter().map(String::as_str).collect(),
        }
    }
}

/// Concrete description of an asset or of the rendition wanted from it.
///
/// The same shape serves as the engine's source descriptor, the caller's
/// output instructions, and the realized input/output of every plan step.
/// Attribute entries are concrete singletons; multi-valued expressions
/// belong to manifests, never to descriptors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// Concrete attributes: `type`, `width`, `height`, `quality`, ...
    #[serde(flatten)]
    pub attributes: AttributeSet,

    /// Local filesystem location, when materialized
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// HTTPS URL or data URI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Known size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// Delivery mode stamped from the consuming transformer's manifest
    #[serde(rename = "sourceType", skip_serializing_if = "Option::is_none")]
    pub source_type: Option<SourceType>,

    /// Opaque caller payload carried onto every step's output
    #[serde(rename = "userData", skip_serializing_if = "Option::is_none")]
    pub user_data: Option<serde_json::Value>,

    /// Upload destination(s) for a final rendition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<UploadTarget>,

    /// Service feature flags advertised for this asset
    #[serde(default, skip_serializing_if = "Features::is_empty")]
    pub features: Features,
}

impl AssetDescriptor {
    /// Creates a descriptor with only a media type
    pub fn of_type(media_type: impl Into<String>) -> Self {
        let mut descriptor = Self::default();
        descriptor
            .attributes
            .insert(ATTR_TYPE, AttributeValue::from(media_type.into()));
        descriptor
    }

    /// Builder: sets a concrete attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name, value.into());
        self
    }

    /// Builder: sets the local path
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Builder: sets the URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Builder: sets the upload target
    pub fn with_target(mut self, target: UploadTarget) -> Self {
        self.target = Some(target);
        self
    }

    /// The concrete media type, when present
    pub fn media_type(&self) -> Option<&str> {
        self.attributes.media_type()
    }

    pub fn width(&self) -> Option<f64> {
        self.attributes.number(ATTR_WIDTH)
    }

    pub fn height(&self) -> Option<f64> {
        self.attributes.number(ATTR_HEIGHT)
    }

    /// EXIF orientation merged by the metadata probe. Values 2-8 indicate a
    /// non-trivial rotation or mirroring; 1 (or absence) is the identity.
    pub fn orientation(&self) -> Option<f64> {
        self.attributes.number(ATTR_ORIENTATION)
    }

    /// Whether the probed orientation requires normalization
    pub fn has_nontrivial_orientation(&self) -> bool {
        self.orientation().map(|o| o > 1.0).unwrap_or(false)
    }

    /// Whether any local or remote content location is known
    pub fn has_content_location(&self) -> bool {
        self.path.is_some() || self.url.is_some()
    }
}

/// The original input descriptor submitted to the engine.
pub type Source = AssetDescriptor;

/// Well-known file extensions by media type, for naming rendition and
/// source files.
pub fn extension_for(media_type: &str) -> &str {
    match media_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/tiff" => "tif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "video/mp4" => "mp4",
        "video/quicktime" => "mov",
        "audio/mpeg" => "mp3",
        "audio/wav" => "wav",
        "application/pdf" => "pdf",
        "text/plain" => "txt",
        "text/html" => "html",
        "machine-json" | "machine-metadata-json" | "application/json" => "json",
        _ => "bin",
    }
}

/// The output artifact of one executed plan step.
///
/// Constructed by step preparation before `compute` runs: `path` names the
/// file the transformer must produce under the step's `out/` directory.
/// URL-type outputs set `url` instead. `size` is reported after compute for
/// forwarding into the next step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rendition {
    /// The step's output instructions (attributes, target, user data)
    pub instructions: AssetDescriptor,

    /// Where the transformer must write the artifact
    pub path: PathBuf,

    /// Set by transformers producing URL renditions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Artifact size in bytes, filled in after compute
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl Rendition {
    /// Creates a rendition rooted under a step's output directory.
    ///
    /// The file name is derived from the instructed media type
    /// (`rendition.png`, `rendition.json`, ...).
    pub fn new(instructions: AssetDescriptor, out_dir: &Path) -> Self {
        let extension = instructions.media_type().map(extension_for).unwrap_or("bin");
        let path = out_dir.join(format!("rendition.{}", extension));
        Self {
            instructions,
            path,
            url: None,
            size: None,
        }
    }

    /// The media type this rendition was instructed to produce
    pub fn media_type(&self) -> Option<&str> {
        self.instructions.media_type()
    }
}
