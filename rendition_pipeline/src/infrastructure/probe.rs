// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Metadata Probe Adapter
//!
//! Concrete [`MetadataProbe`] implementation over the host's media
//! inspection tools, selected by file extension:
//!
//! - **Image formats** — EXIF-style probe (`exiftool -json`); when the
//!   format is unknown to exiftool, fall back to raster introspection
//!   (ImageMagick `identify`); when both fail, the source is corrupt
//! - **Video/audio formats** — `mediainfo --Output=JSON` under the
//!   engine's hard probe timeout (30 seconds by default)
//! - **3D formats** — skipped, no metadata is extracted
//!
//! Dimension values reported in layout units (`pt`, `cm`, `mm`, `in`, `pc`)
//! are normalized to pixels at 96 dpi, and SVG sources that exiftool
//! misidentifies as XMP are corrected.

use async_trait::async_trait;
use rendition_pipeline_domain::services::{AssetMetadata, MetadataProbe};
use rendition_pipeline_domain::{AssetDescriptor, RenditionError};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

const IMAGE_EXTENSIONS: [&str; 12] = [
    "png", "jpg", "jpeg", "gif", "tif", "tiff", "webp", "bmp", "svg", "psd", "heic", "dng",
];
const TIMELINE_EXTENSIONS: [&str; 10] = ["mp4", "mov", "avi", "mkv", "webm", "m4v", "mp3", "wav", "aac", "flac"];
const MODEL_EXTENSIONS: [&str; 5] = ["obj", "stl", "fbx", "glb", "gltf"];

/// Media kind a source is probed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeKind {
    Image,
    Timeline,
    Model,
    Unknown,
}

fn classify(extension: &str) -> ProbeKind {
    let lowered = extension.to_lowercase();
    if IMAGE_EXTENSIONS.contains(&lowered.as_str()) {
        ProbeKind::Image
    } else if TIMELINE_EXTENSIONS.contains(&lowered.as_str()) {
        ProbeKind::Timeline
    } else if MODEL_EXTENSIONS.contains(&lowered.as_str()) {
        ProbeKind::Model
    } else {
        ProbeKind::Unknown
    }
}

/// Converts a dimension reported in layout units to pixels at 96 dpi.
///
/// Returns the value unchanged for bare numbers and unknown units.
fn to_pixels(value: f64, unit: &str) -> f64 {
    match unit {
        "pt" => value * 96.0 / 72.0,
        "pc" => value * 16.0,
        "in" => value * 96.0,
        "cm" => value * 96.0 / 2.54,
        "mm" => value * 96.0 / 25.4,
        _ => value,
    }
}

/// Parses a probe dimension value: a bare number, or a number with a unit
/// suffix (`"210 mm"`, `"612pt"`).
fn parse_dimension(value: &Value) -> Option<f64> {
    if let Some(n) = value.as_f64() {
        return Some(n);
    }
    let text = value.as_str()?.trim();
    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .unwrap_or(text.len());
    let number: f64 = text[..split].parse().ok()?;
    let unit = text[split..].trim();
    Some(to_pixels(number, unit))
}

/// Extracts metadata from an exiftool `-json` record.
fn parse_exiftool_record(record: &Value, extension: &str) -> AssetMetadata {
    let mut file_type = record
        .get("FileType")
        .and_then(Value::as_str)
        .map(|s| s.to_string());

    // exiftool reports standalone-SVG files as XMP; the extension knows
    // better.
    if extension.eq_ignore_ascii_case("svg") && file_type.as_deref() == Some("XMP") {
        file_type = Some("SVG".to_string());
    }

    AssetMetadata {
        width: record.get("ImageWidth").and_then(parse_dimension),
        height: record.get("ImageHeight").and_then(parse_dimension),
        orientation: record.get("Orientation").and_then(Value::as_f64),
        file_type,
        duration: record.get("Duration").and_then(parse_dimension),
    }
}

/// Extracts metadata from a mediainfo `--Output=JSON` report.
fn parse_mediainfo_report(report: &Value) -> AssetMetadata {
    let mut metadata = AssetMetadata::default();
    let tracks = report
        .get("media")
        .and_then(|m| m.get("track"))
        .and_then(Value::as_array);
    for track in tracks.into_iter().flatten() {
        let kind = track.get("@type").and_then(Value::as_str).unwrap_or("");
        match kind {
            "General" => {
                metadata.duration = metadata.duration.or_else(|| track.get("Duration").and_then(parse_dimension));
                metadata.file_type = metadata
                    .file_type
                    .take()
                    .or_else(|| track.get("Format").and_then(Value::as_str).map(String::from));
            }
            "Video" | "Image" => {
                metadata.width = metadata.width.or_else(|| track.get("Width").and_then(parse_dimension));
                metadata.height = metadata.height.or_else(|| track.get("Height").and_then(parse_dimension));
            }
            _ => {}
        }
    }
    metadata
}

/// Parses ImageMagick `identify -format "%w %h %[orientation]"` output.
fn parse_identify_output(output: &str) -> Option<AssetMetadata> {
    let mut parts = output.split_whitespace();
    let width: f64 = parts.next()?.parse().ok()?;
    let height: f64 = parts.next()?.parse().ok()?;
    let orientation = parts.next().and_then(|o| match o {
        "TopLeft" | "Undefined" => Some(1.0),
        "TopRight" => Some(2.0),
        "BottomRight" => Some(3.0),
        "BottomLeft" => Some(4.0),
        "LeftTop" => Some(5.0),
        "RightTop" => Some(6.0),
        "RightBottom" => Some(7.0),
        "LeftBottom" => Some(8.0),
        _ => None,
    });
    Some(AssetMetadata {
        width: Some(width),
        height: Some(height),
        orientation,
        file_type: None,
        duration: None,
    })
}

/// Shell-tool-backed metadata probe.
///
/// Stateless; the per-invocation timeout comes from the engine through the
/// probe port.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataProbeAdapter;

impl MetadataProbeAdapter {
    pub fn new() -> Self {
        Self
    }

    async fn run_tool(&self, program: &str, args: &[&str], timeout: Duration) -> Result<String, RenditionError> {
        let invocation = Command::new(program).args(args).output();
        let output = tokio::time::timeout(timeout, invocation)
            .await
            .map_err(|_| RenditionError::TimeoutError(format!("{} exceeded {:?}", program, timeout)))??;
        if !output.status.success() {
            return Err(RenditionError::io_error(format!(
                "{} exited with {}",
                program, output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn probe_image(
        &self,
        path: &Path,
        extension: &str,
        timeout: Duration,
    ) -> Result<AssetMetadata, RenditionError> {
        let path_str = path.to_string_lossy();

        match self
            .run_tool("exiftool", &["-json", "-n", path_str.as_ref()], timeout)
            .await
        {
            Ok(stdout) => {
                let records: Value = serde_json::from_str(&stdout)?;
                if let Some(record) = records.as_array().and_then(|a| a.first()) {
                    return Ok(parse_exiftool_record(record, extension));
                }
                debug!(path = %path_str, "exiftool returned no records");
            }
            Err(err) => {
                debug!(path = %path_str, error = %err, "exiftool probe failed, trying raster introspection");
            }
        }

        match self
            .run_tool("identify", &["-format", "%w %h %[orientation]", path_str.as_ref()], timeout)
            .await
        {
            Ok(stdout) => parse_identify_output(&stdout).ok_or_else(|| {
                RenditionError::source_corrupt(format!("Unreadable raster introspection for '{}'", path_str))
            }),
            Err(err) => {
                warn!(path = %path_str, error = %err, "all image probes failed");
                Err(RenditionError::source_corrupt(format!(
                    "Cannot extract metadata from '{}'",
                    path_str
                )))
            }
        }
    }

    async fn probe_timeline(&self, path: &Path, timeout: Duration) -> Result<AssetMetadata, RenditionError> {
        let path_str = path.to_string_lossy();
        let stdout = self
            .run_tool("mediainfo", &["--Output=JSON", path_str.as_ref()], timeout)
            .await
            .map_err(|err| match err {
                timeout @ RenditionError::TimeoutError(_) => timeout,
                other => RenditionError::source_corrupt(format!("mediainfo failed for '{}': {}", path_str, other)),
            })?;
        let report: Value = serde_json::from_str(&stdout)?;
        Ok(parse_mediainfo_report(&report))
    }
}

#[async_trait]
impl MetadataProbe for MetadataProbeAdapter {
    async fn probe(&self, source: &AssetDescriptor, timeout: Duration) -> Result<AssetMetadata, RenditionError> {
        let path = match &source.path {
            Some(path) => path.as_path(),
            None => return Ok(AssetMetadata::default()),
        };
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_string();

        match classify(&extension) {
            ProbeKind::Image => self.probe_image(path, &extension, timeout).await,
            ProbeKind::Timeline => self.probe_timeline(path, timeout).await,
            // 3D models carry no probeable metadata.
            ProbeKind::Model => Ok(AssetMetadata::default()),
            ProbeKind::Unknown => Ok(AssetMetadata::default()),
        }
    }
}
