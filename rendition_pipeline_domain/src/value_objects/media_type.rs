// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Media Type Value Object
//!
//! Well-formedness validation for the MIME-like tokens that drive graph
//! edges and plan-finder input validation. A media type is either a
//! `top/subtype` pair in the restricted token character set, or a bare
//! service token (`machine-json` and friends) used by tagging services whose
//! output is not a byte format.
//!
//! Validation failures are classified by the caller: a malformed source type
//! indicates corrupt input (`SourceCorrupt`), a malformed requested type an
//! unreachable rendition (`RenditionFormatUnsupported`).

use once_cell::sync::Lazy;
use regex::Regex;

// RFC 2045 token characters, with an optional single "/" separating top-level
// type and subtype. Bare tokens are accepted for service output types.
static MEDIA_TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9!#$&^_.+-]*(/[A-Za-z0-9][A-Za-z0-9!#$&^_.+-]*)?$")
        .expect("media type pattern is valid")
});

/// Whether a string is a well-formed MIME-like token.
pub fn is_well_formed(token: &str) -> bool {
    MEDIA_TYPE_RE.is_match(token)
}

/// Splits a media type into its top-level type, when present.
///
/// `"image/png"` yields `"image"`; a bare service token yields itself.
pub fn top_level(token: &str) -> &str {
    token.split('/').next().unwrap_or(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_media_types() {
        assert!(is_well_formed("image/png"));
        assert!(is_well_formed("video/quicktime"));
        assert!(is_well_formed("application/vnd.adobe.photoshop"));
        assert!(is_well_formed("model/gltf+json"));
    }

    #[test]
    fn test_accepts_bare_service_tokens() {
        assert!(is_well_formed("machine-json"));
        assert!(is_well_formed("machine-metadata-json"));
    }

    #[test]
    fn test_rejects_malformed_tokens() {
        assert!(!is_well_formed(""));
        assert!(!is_well_formed("image/"));
        assert!(!is_well_formed("/png"));
        assert!(!is_well_formed("image/png/extra"));
        assert!(!is_well_formed("image png"));
        assert!(!is_well_formed("image/<png>"));
    }

    #[test]
    fn test_top_level() {
        assert_eq!(top_level("image/png"), "image");
        assert_eq!(top_level("machine-json"), "machine-json");
    }
}
