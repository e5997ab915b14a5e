//! Upstream 5xx rate over the sliding window, and the alert condition
//! driven by it.

use logwatch_core::LogRecord;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::window::SlidingWindow;

/// Samples required before the rate may drive an alert. Below this a single
/// request moves the percentage too far and the alert flaps.
pub const MIN_SAMPLES: usize = 50;

/// Error rate over the current window contents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorRate {
    /// Records whose upstream status is a 5xx.
    pub errors: usize,
    /// Records in the window, including those without an upstream status.
    pub samples: usize,
    /// `errors * 100 / samples`, or `0.0` for an empty window.
    pub percent: f64,
}

impl ErrorRate {
    pub fn is_significant(&self) -> bool {
        self.samples >= MIN_SAMPLES
    }
}

/// Compute the upstream 5xx percentage of the window.
pub fn error_rate(window: &SlidingWindow<LogRecord>) -> ErrorRate {
    let samples = window.len();
    let errors = window
        .snapshot()
        .filter(|record| record.upstream_status.is_server_error())
        .count();
    let percent = if samples == 0 {
        0.0
    } else {
        errors as f64 * 100.0 / samples as f64
    };
    ErrorRate {
        errors,
        samples,
        percent,
    }
}

/// Whether the error-rate alert is currently considered ongoing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorRateState {
    Normal,
    Elevated,
}

/// Result of checking a fresh rate against the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateTransition {
    Unchanged,
    /// NORMAL and the rate crossed the threshold with enough samples.
    Breached,
    /// ELEVATED and the rate is back at or under the threshold.
    Cleared,
}

/// Two-state machine for the error-rate alert.
///
/// The same threshold is used to enter and leave `Elevated`. `check` never
/// mutates: the engine commits `Elevated` once the alert is settled, so a
/// cooldown or a failed dispatch is retried on the next breaching line.
#[derive(Debug, Clone)]
pub struct ErrorRateCondition {
    threshold: f64,
    state: ErrorRateState,
}

impl ErrorRateCondition {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            state: ErrorRateState::Normal,
        }
    }

    pub fn check(&self, rate: &ErrorRate) -> RateTransition {
        match self.state {
            ErrorRateState::Normal if rate.is_significant() && rate.percent > self.threshold => {
                RateTransition::Breached
            }
            ErrorRateState::Elevated if rate.percent <= self.threshold => RateTransition::Cleared,
            _ => RateTransition::Unchanged,
        }
    }

    pub fn mark_elevated(&mut self) {
        self.state = ErrorRateState::Elevated;
    }

    pub fn mark_normal(&mut self) {
        if self.state == ErrorRateState::Elevated {
            debug!(threshold = self.threshold, "error-rate condition reset");
        }
        self.state = ErrorRateState::Normal;
    }

    pub fn state(&self) -> ErrorRateState {
        self.state
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}
