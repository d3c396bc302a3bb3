// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Initialization progress reports.

use std::time::Instant;

/// One progress report emitted while the local model loads.
#[derive(Debug, Clone, PartialEq)]
pub struct InitProgress {
    /// Fraction complete, in `0.0..=1.0`.
    pub progress: f64,
    /// Seconds since loading began.
    pub time_elapsed: f64,
    /// Human-readable status line.
    pub text: String,
}

/// Builds [`InitProgress`] values relative to a fixed start time and keeps
/// the reported fraction from moving backwards.
pub(crate) struct ProgressClock {
    started: Instant,
    last: f64,
}

impl ProgressClock {
    pub(crate) fn start() -> Self {
        Self {
            started: Instant::now(),
            last: 0.0,
        }
    }

    /// Report `fraction`, or the last reported value when `None`.
    pub(crate) fn report(&mut self, fraction: Option<f64>, text: impl Into<String>) -> InitProgress {
        if let Some(f) = fraction {
            self.last = self.last.max(f.clamp(0.0, 1.0));
        }
        InitProgress {
            progress: self.last,
            time_elapsed: self.started.elapsed().as_secs_f64(),
            text: text.into(),
        }
    }
}
