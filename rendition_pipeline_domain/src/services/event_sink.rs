// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Event Sink Port
//!
//! Infrastructure port for delivering rendition outcome events to an
//! external event service. The engine treats emission as best-effort: a sink
//! failure is logged and never fails the activation.

use crate::events::RenditionEvent;
use crate::RenditionError;
use async_trait::async_trait;

/// Destination for rendition outcome events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Delivers one event. Implementations decide batching and retries.
    async fn emit(&self, event: &RenditionEvent) -> Result<(), RenditionError>;
}

/// Sink that drops every event, for callers without an event service.
#[derive(Debug, Default)]
pub struct NullEventSink;

#[async_trait]
impl EventSink for NullEventSink {
    async fn emit(&self, _event: &RenditionEvent) -> Result<(), RenditionError> {
        Ok(())
    }
}
