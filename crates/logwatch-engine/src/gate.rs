//! Cooldown and maintenance gating for alert dispatch.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::alert::AlertKind;

/// Why an alert was not handed to the notifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    /// Maintenance mode is on.
    Maintenance,
    /// No notifier is configured; alerts are logged only.
    NoNotifier,
    /// The same kind fired less than the cooldown ago.
    Cooldown { remaining: Duration },
}

/// Per-kind cooldown tracking plus global suppression switches.
///
/// Checks apply in order: maintenance, missing notifier, cooldown.
#[derive(Debug, Clone)]
pub struct AlertGate {
    cooldown: Duration,
    maintenance_mode: bool,
    notifier_configured: bool,
    /// Last successful dispatch per kind. Absent means never.
    last_fired: HashMap<AlertKind, Instant>,
}

impl AlertGate {
    pub fn new(cooldown: Duration, maintenance_mode: bool) -> Self {
        Self {
            cooldown,
            maintenance_mode,
            notifier_configured: false,
            last_fired: HashMap::new(),
        }
    }

    pub fn set_notifier_configured(&mut self, configured: bool) {
        self.notifier_configured = configured;
    }

    pub fn set_maintenance_mode(&mut self, enabled: bool) {
        self.maintenance_mode = enabled;
    }

    /// Whether an alert of `kind` may be dispatched at `now`.
    pub fn check(&self, kind: AlertKind, now: Instant) -> Result<(), Suppression> {
        if self.maintenance_mode {
            return Err(Suppression::Maintenance);
        }
        if !self.notifier_configured {
            return Err(Suppression::NoNotifier);
        }
        if let Some(last) = self.last_fired.get(&kind) {
            let elapsed = now.saturating_duration_since(*last);
            if elapsed < self.cooldown {
                return Err(Suppression::Cooldown {
                    remaining: self.cooldown - elapsed,
                });
            }
        }
        Ok(())
    }

    pub fn may_fire(&self, kind: AlertKind, now: Instant) -> bool {
        self.check(kind, now).is_ok()
    }

    /// Start the cooldown for `kind`. Only call after a successful dispatch.
    pub fn record_fired(&mut self, kind: AlertKind, now: Instant) {
        self.last_fired.insert(kind, now);
    }

    pub fn last_fired(&self, kind: AlertKind) -> Option<Instant> {
        self.last_fired.get(&kind).copied()
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn maintenance_mode(&self) -> bool {
        self.maintenance_mode
    }
}
