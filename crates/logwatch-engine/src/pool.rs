//! Pool transition detection (failover / recovery).

use serde::{Deserialize, Serialize};

/// Classification of a newly observed pool against the last alerted one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolTransition {
    None,
    /// Traffic moved away from the primary, or between secondaries.
    Failover,
    /// Traffic returned to the primary.
    Recovery,
}

/// Classify `observed` against `last_alerted`, where `primary` is the
/// initial pool.
pub fn classify(observed: &str, last_alerted: &str, primary: &str) -> PoolTransition {
    if observed == last_alerted {
        PoolTransition::None
    } else if observed == primary {
        PoolTransition::Recovery
    } else {
        PoolTransition::Failover
    }
}

/// Pool bookkeeping for one watched target.
///
/// `current` follows every record carrying a pool. `last_alerted` only moves
/// when a failover/recovery alert was actually delivered, so an undelivered
/// switch keeps being classified on later lines.
#[derive(Debug, Clone)]
pub struct PoolTracker {
    primary: String,
    current: String,
    last_alerted: String,
}

impl PoolTracker {
    pub fn new(primary: &str) -> Self {
        Self {
            primary: primary.to_string(),
            current: primary.to_string(),
            last_alerted: primary.to_string(),
        }
    }

    /// Record an observed pool. Returns `true` if it differs from the
    /// previously observed one. Empty labels are ignored.
    pub fn observe(&mut self, pool: &str) -> bool {
        if pool.is_empty() || pool == self.current {
            return false;
        }
        self.current = pool.to_string();
        true
    }

    /// Classify the current pool against the last alerted one.
    pub fn transition(&self) -> PoolTransition {
        classify(&self.current, &self.last_alerted, &self.primary)
    }

    /// Commit the current pool as alerted.
    pub fn mark_alerted(&mut self) {
        self.last_alerted = self.current.clone();
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn last_alerted(&self) -> &str {
        &self.last_alerted
    }
}
