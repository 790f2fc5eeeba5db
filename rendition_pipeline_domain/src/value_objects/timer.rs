// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Duration Timer
//!
//! A small start/stop timer backing the duration fields of activation
//! metrics (processing time, download time, upload time). High-resolution
//! timing uses `Instant`; serialized snapshots carry elapsed seconds only.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Wall-clock timer with start/stop semantics.
///
/// A timer may be stopped more than once; only the first stop freezes the
/// reading. Reading an unstopped timer reports the elapsed time so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timer {
    #[serde(skip)]
    started_at: Option<Instant>,
    #[serde(skip)]
    stopped_at: Option<Instant>,
    /// Frozen elapsed seconds, populated on stop for serialization.
    elapsed_seconds: f64,
}

impl Timer {
    /// Creates a timer that has not started
    pub fn new() -> Self {
        Self {
            started_at: None,
            stopped_at: None,
            elapsed_seconds: 0.0,
        }
    }

    /// Creates and starts a timer
    pub fn started() -> Self {
        let mut timer = Self::new();
        timer.start();
        timer
    }

    /// Starts (or restarts) the timer
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
        self.stopped_at = None;
        self.elapsed_seconds = 0.0;
    }

    /// Stops the timer; subsequent stops are no-ops
    pub fn stop(&mut self) {
        if self.stopped_at.is_none() && self.started_at.is_some() {
            self.stopped_at = Some(Instant::now());
            self.elapsed_seconds = self.elapsed().as_secs_f64();
        }
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some() && self.stopped_at.is_none()
    }

    /// Elapsed duration: frozen if stopped, live otherwise
    pub fn elapsed(&self) -> Duration {
        match (self.started_at, self.stopped_at) {
            (Some(start), Some(stop)) => stop.duration_since(start),
            (Some(start), None) => start.elapsed(),
            (None, _) => Duration::ZERO,
        }
    }

    /// Elapsed time in fractional seconds
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
