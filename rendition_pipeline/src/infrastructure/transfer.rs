// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Transfer Glue
//!
//! Validation and materialization helpers between the engine and the
//! injected transfer layer:
//!
//! - HTTPS URL and data-URI well-formedness checks backing the
//!   `SourceUnsupported` failure path
//! - data-URI decoding and materialization into a working directory
//! - transfer concurrency sizing from the process memory limit
//!
//! The HTTPS client itself is an external collaborator behind the
//! [`TransferService`](rendition_pipeline_domain::TransferService) port.

use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;
use rendition_pipeline_domain::RenditionError;
use std::path::Path;

/// Default transfer concurrency when the memory limit is unknown.
pub const DEFAULT_TRANSFER_CONCURRENCY: usize = 8;
/// Share of available memory transfers may occupy.
const MEMORY_SHARE: f64 = 0.8;

static HTTPS_URL_RE: Lazy<Regex> = Lazy::new(|| {
    // Scheme, host token, optional port, optional path/query without
    // whitespace or angle brackets.
    Regex::new(r"^https://[A-Za-z0-9][A-Za-z0-9.-]*(:[0-9]+)?(/[^\s<>]*)?$").expect("https pattern is valid")
});

/// Whether a URL is a well-formed HTTPS URL.
pub fn is_valid_https_url(url: &str) -> bool {
    HTTPS_URL_RE.is_match(url)
}

/// Whether a URL is a data URI.
pub fn is_data_uri(url: &str) -> bool {
    url.starts_with("data:")
}

/// A decoded data URI.
#[derive(Debug, Clone, PartialEq)]
pub struct DataUri {
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Parses and decodes a data URI (`data:[<mediatype>][;base64],<data>`).
pub fn parse_data_uri(url: &str) -> Result<DataUri, RenditionError> {
    let invalid = || RenditionError::source_unsupported(format!("Source url must be a valid https url or datauri: '{}'", url));

    let rest = url.strip_prefix("data:").ok_or_else(invalid)?;
    let (header, payload) = rest.split_once(',').ok_or_else(invalid)?;

    let mut media_type = None;
    let mut base64_encoded = false;
    for (i, part) in header.split(';').enumerate() {
        if part.eq_ignore_ascii_case("base64") {
            base64_encoded = true;
        } else if i == 0 && !part.is_empty() {
            media_type = Some(part.to_string());
        }
    }

    let bytes = if base64_encoded {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|_| invalid())?
    } else {
        percent_decode(payload)
    };

    Ok(DataUri { media_type, bytes })
}

fn percent_decode(payload: &str) -> Vec<u8> {
    let raw = payload.as_bytes();
    let mut bytes = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%' {
            let hex = raw.get(i + 1..i + 3).and_then(|h| std::str::from_utf8(h).ok());
            if let Some(decoded) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                bytes.push(decoded);
                i += 3;
                continue;
            }
        }
        bytes.push(raw[i]);
        i += 1;
    }
    bytes
}

/// Writes a data URI's payload to a local file.
pub async fn materialize_data_uri(url: &str, file: &Path) -> Result<DataUri, RenditionError> {
    let parsed = parse_data_uri(url)?;
    tokio::fs::write(file, &parsed.bytes).await?;
    Ok(parsed)
}

/// Sizes chunked-transfer concurrency from the process memory limit.
///
/// With an unknown limit the default of 8 applies; otherwise concurrency is
/// the largest count keeping `concurrency × chunk_size` within 80% of
/// available memory, and never below 1.
pub fn transfer_concurrency(memory_limit: Option<u64>, chunk_size: u64) -> usize {
    match memory_limit {
        None => DEFAULT_TRANSFER_CONCURRENCY,
        Some(limit) => {
            let budget = (limit as f64 * MEMORY_SHARE) as u64;
            ((budget / chunk_size.max(1)) as usize).max(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_validation() {
        assert!(is_valid_https_url("https://example.com/asset.png"));
        assert!(is_valid_https_url("https://cdn.example.com:8443/a/b?sig=abc"));
        assert!(!is_valid_https_url("https://notvalid<"));
        assert!(!is_valid_https_url("http://example.com/asset.png"));
        assert!(!is_valid_https_url("ftp://example.com/asset.png"));
        assert!(!is_valid_https_url("https://"));
    }

    #[test]
    fn test_data_uri_base64() {
        let uri = parse_data_uri("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(uri.media_type.as_deref(), Some("image/png"));
        assert_eq!(uri.bytes, b"hello");
    }

    #[test]
    fn test_data_uri_plain() {
        let uri = parse_data_uri("data:text/plain,hello%20world").unwrap();
        assert_eq!(uri.media_type.as_deref(), Some("text/plain"));
        assert_eq!(uri.bytes, b"hello world");
    }

    #[test]
    fn test_data_uri_without_media_type() {
        let uri = parse_data_uri("data:,payload").unwrap();
        assert_eq!(uri.media_type, None);
        assert_eq!(uri.bytes, b"payload");
    }

    #[test]
    fn test_malformed_data_uri() {
        let err = parse_data_uri("data:image/png;base64").unwrap_err();
        assert!(err.to_string().contains("must be a valid https url or datauri"));
    }

    #[test]
    fn test_concurrency_sizing() {
        // Unknown memory: default.
        assert_eq!(transfer_concurrency(None, 10 * 1024 * 1024), 8);

        // 1 GiB limit, 10 MiB chunks: 80% budget fits 81 chunks.
        let concurrency = transfer_concurrency(Some(1024 * 1024 * 1024), 10 * 1024 * 1024);
        assert_eq!(concurrency, 81);
        assert!(concurrency as u64 * 10 * 1024 * 1024 <= (1024f64 * 1024.0 * 1024.0 * 0.8) as u64);

        // Tiny limits never drop below one lane.
        assert_eq!(transfer_concurrency(Some(1024), 10 * 1024 * 1024), 1);
    }
}
