// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Rendition Domain Events
//!
//! Events the engine emits about rendition outcomes. Exactly two kinds exist
//! on the wire:
//!
//! - `rendition_created` — the requested rendition was produced (and, when
//!   targets were declared, uploaded)
//! - `rendition_failed` — the rendition could not be produced; the payload
//!   carries the stable `errorReason` and a human-readable `errorMessage`
//!
//! Payloads embed the rendition instructions with secrets redacted: upload
//! targets are presigned URLs and never leave the engine, and any key that
//! smells like a credential is masked.

use crate::entities::AssetDescriptor;
use crate::error::ErrorReason;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire name of the success event.
pub const EVENT_RENDITION_CREATED: &str = "rendition_created";
/// Wire name of the failure event.
pub const EVENT_RENDITION_FAILED: &str = "rendition_failed";

/// Keys masked during redaction, matched case-insensitively as substrings.
const SECRET_KEY_MARKERS: [&str; 5] = ["auth", "token", "credential", "secret", "key"];

/// Replaces secret-bearing values in an instructions payload.
///
/// The upload `target` is removed outright (presigned URLs grant write
/// access); any other key containing a credential marker is masked. Objects
/// are scrubbed recursively so nested user data cannot leak.
pub fn redact_instructions(instructions: &AssetDescriptor) -> Value {
    let mut value = serde_json::to_value(instructions).unwrap_or(Value::Null);
    if let Some(map) = value.as_object_mut() {
        map.remove("target");
    }
    redact_value(&mut value);
    value
}

fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, entry) in map.iter_mut() {
                let lowered = key.to_lowercase();
                if SECRET_KEY_MARKERS.iter().any(|marker| lowered.contains(marker)) {
                    *entry = Value::String("<redacted>".to_string());
                } else {
                    redact_value(entry);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                redact_value(item);
            }
        }
        _ => {}
    }
}

/// Payload of a `rendition_created` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenditionCreatedEvent {
    /// Activation this rendition belongs to
    pub activation_id: String,
    /// Redacted rendition instructions
    pub rendition: Value,
    /// Optional probe metadata snapshot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Optional embedded artifact as a data URI, for small renditions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    pub occurred_at: chrono::DateTime<chrono::Utc>,
}

/// Payload of a `rendition_failed` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenditionFailedEvent {
    pub activation_id: String,
    /// Redacted rendition instructions
    pub rendition: Value,
    #[serde(rename = "errorReason")]
    pub error_reason: ErrorReason,
    #[serde(rename = "errorMessage")]
    pub error_message: String,
    pub occurred_at: chrono::DateTime<chrono::Utc>,
}

/// A rendition outcome event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RenditionEvent {
    Created(RenditionCreatedEvent),
    Failed(RenditionFailedEvent),
}

impl RenditionEvent {
    /// Builds a success event from redacted instructions
    pub fn created(activation_id: impl Into<String>, instructions: &AssetDescriptor) -> Self {
        RenditionEvent::Created(RenditionCreatedEvent {
            activation_id: activation_id.into(),
            rendition: redact_instructions(instructions),
            metadata: None,
            data: None,
            occurred_at: chrono::Utc::now(),
        })
    }

    /// Builds a failure event carrying the error's stable reason
    pub fn failed(
        activation_id: impl Into<String>,
        instructions: &AssetDescriptor,
        reason: ErrorReason,
        message: impl Into<String>,
    ) -> Self {
        RenditionEvent::Failed(RenditionFailedEvent {
            activation_id: activation_id.into(),
            rendition: redact_instructions(instructions),
            error_reason: reason,
            error_message: message.into(),
            occurred_at: chrono::Utc::now(),
        })
    }

    /// Wire name of the event
    pub fn event_type(&self) -> &'static str {
        match self {
            RenditionEvent::Created(_) => EVENT_RENDITION_CREATED,
            RenditionEvent::Failed(_) => EVENT_RENDITION_FAILED,
        }
    }

    pub fn occurred_at(&self) -> chrono::DateTime<chrono::Utc> {
        match self {
            RenditionEvent::Created(e) => e.occurred_at,
            RenditionEvent::Failed(e) => e.occurred_at,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RenditionEvent::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::UploadTarget;
    use serde_json::json;

    #[test]
    fn test_redaction_removes_target_and_masks_credentials() {
        let mut instructions = AssetDescriptor::of_type("image/png")
            .with_target(UploadTarget::Single("https://signed.example/put?sig=abc".to_string()));
        instructions.user_data = Some(json!({
            "uploadToken": "tok-123",
            "label": "thumbnail",
            "nested": { "apiKey": "k" }
        }));

        let redacted = redact_instructions(&instructions);
        assert!(redacted.get("target").is_none());
        assert_eq!(redacted["userData"]["uploadToken"], "<redacted>");
        assert_eq!(redacted["userData"]["nested"]["apiKey"], "<redacted>");
        assert_eq!(redacted["userData"]["label"], "thumbnail");
        assert_eq!(redacted["type"], "image/png");
    }

    #[test]
    fn test_failure_event_carries_reason() {
        let event = RenditionEvent::failed(
            "act-1",
            &AssetDescriptor::of_type("image/png"),
            ErrorReason::RenditionTooLarge,
            "413 from target",
        );
        assert_eq!(event.event_type(), EVENT_RENDITION_FAILED);
        match event {
            RenditionEvent::Failed(payload) => {
                assert_eq!(payload.error_reason, ErrorReason::RenditionTooLarge);
                assert_eq!(payload.error_message, "413 from target");
            }
            _ => unreachable!(),
        }
    }
}
