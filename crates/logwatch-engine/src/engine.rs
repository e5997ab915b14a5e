//! Alerting engine: turns access-log lines into dispatched alerts.
//!
//! One engine owns all state for one watched log. Lines must be fed one at
//! a time in arrival order; a multi-threaded host serializes calls itself.

use std::time::{Duration, Instant};

use logwatch_core::{AlertConfig, LineParser, LogRecord};
use tracing::{debug, info, warn};

use crate::alert::Alert;
use crate::error::{EngineResult, NotifyError};
use crate::estimator::{ErrorRate, ErrorRateCondition, ErrorRateState, RateTransition, error_rate};
use crate::gate::{AlertGate, Suppression};
use crate::notifier::Notifier;
use crate::pool::{PoolTracker, PoolTransition};
use crate::window::SlidingWindow;

/// Accepted records between two parse progress logs.
const PARSE_LOG_EVERY: u64 = 50;
/// Window sizes at which the current rate is logged.
const RATE_LOG_EVERY: usize = 25;

/// What happened to one alert on its way to the notifier.
#[derive(Debug)]
pub enum DispatchResult {
    Sent,
    Suppressed(Suppression),
    Failed(NotifyError),
}

impl DispatchResult {
    /// Whether the condition behind the alert is done with. Maintenance and
    /// a missing notifier swallow alerts for good; a cooldown or a failed
    /// send leaves it pending for the next line.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            Self::Sent | Self::Suppressed(Suppression::Maintenance | Suppression::NoNotifier)
        )
    }
}

#[derive(Debug)]
pub struct DispatchOutcome {
    pub alert: Alert,
    pub result: DispatchResult,
}

impl DispatchOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self.result, DispatchResult::Sent)
    }

    pub fn is_settled(&self) -> bool {
        self.result.is_settled()
    }
}

/// Result of feeding one line to the engine.
#[derive(Debug)]
pub enum LineOutcome {
    /// The line did not match the access-log shape. Nothing changed.
    Skipped,
    /// The record entered the window. Dispatch attempts in evaluation order:
    /// error rate first, then pool transition.
    Processed(Vec<DispatchOutcome>),
}

impl LineOutcome {
    pub fn dispatches(&self) -> &[DispatchOutcome] {
        match self {
            Self::Skipped => &[],
            Self::Processed(outcomes) => outcomes,
        }
    }

    /// Alerts that reached the notifier on this line.
    pub fn sent(&self) -> impl Iterator<Item = &Alert> {
        self.dispatches()
            .iter()
            .filter(|o| o.is_sent())
            .map(|o| &o.alert)
    }
}

/// Counters over the engine's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub lines_seen: u64,
    pub records_accepted: u64,
    pub lines_skipped: u64,
    pub alerts_sent: u64,
    pub dispatch_failures: u64,
}

/// The alerting engine for one watched log.
pub struct AlertEngine {
    config: AlertConfig,
    parser: LineParser,
    window: SlidingWindow<LogRecord>,
    condition: ErrorRateCondition,
    pools: PoolTracker,
    gate: AlertGate,
    notifier: Option<Box<dyn Notifier>>,
    stats: EngineStats,
}

impl AlertEngine {
    /// Create an engine without a notifier. Alerts are logged only until
    /// [`with_notifier`](Self::with_notifier) is called.
    pub fn new(config: AlertConfig) -> EngineResult<Self> {
        config.validate()?;
        let parser = LineParser::new()?;
        Ok(Self {
            parser,
            window: SlidingWindow::new(config.window_size),
            condition: ErrorRateCondition::new(config.error_threshold),
            pools: PoolTracker::new(&config.initial_pool),
            gate: AlertGate::new(
                Duration::from_secs(config.cooldown_secs),
                config.maintenance_mode,
            ),
            notifier: None,
            stats: EngineStats::default(),
            config,
        })
    }

    /// Set the notifier alerts are dispatched through.
    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Some(Box::new(notifier));
        self.gate.set_notifier_configured(true);
        self
    }

    /// Feed one raw line, timestamped now.
    pub fn ingest_line(&mut self, line: &str) -> LineOutcome {
        self.ingest_line_at(line, Instant::now())
    }

    /// Feed one raw line observed at `now`.
    pub fn ingest_line_at(&mut self, line: &str, now: Instant) -> LineOutcome {
        self.stats.lines_seen += 1;
        match self.parser.parse(line) {
            Some(record) => LineOutcome::Processed(self.ingest_record_at(record, now)),
            None => {
                self.stats.lines_skipped += 1;
                LineOutcome::Skipped
            }
        }
    }

    /// Feed an already parsed record observed at `now`.
    ///
    /// Order per record: window push, current pool update, error-rate
    /// condition, pool transition.
    pub fn ingest_record_at(&mut self, record: LogRecord, now: Instant) -> Vec<DispatchOutcome> {
        self.stats.records_accepted += 1;
        if self.stats.records_accepted % PARSE_LOG_EVERY == 0 {
            debug!(
                pool = %record.pool,
                upstream_status = %record.upstream_status,
                request_time = record.request_time,
                upstream_addr = %record.upstream_addr,
                accepted = self.stats.records_accepted,
                "log line parsed"
            );
        }

        let pool = record.pool.clone();
        let observed_at = record.timestamp.clone();
        self.window.push(record);

        let pool_changed = self.pools.observe(&pool);
        if pool_changed {
            info!(
                pool = %pool,
                last_alerted = %self.pools.last_alerted(),
                "serving pool changed"
            );
        }

        let rate = self.current_error_rate();
        if rate.samples % RATE_LOG_EVERY == 0 {
            debug!(
                rate_pct = rate.percent,
                errors = rate.errors,
                samples = rate.samples,
                "error rate"
            );
        }

        let mut outcomes = Vec::new();
        if let Some(outcome) = self.evaluate_error_rate(rate, &observed_at, now) {
            outcomes.push(outcome);
        }
        if !pool.is_empty()
            && let Some(outcome) = self.evaluate_pool(&observed_at, now)
        {
            outcomes.push(outcome);
        }
        outcomes
    }

    fn evaluate_error_rate(
        &mut self,
        rate: ErrorRate,
        observed_at: &str,
        now: Instant,
    ) -> Option<DispatchOutcome> {
        match self.condition.check(&rate) {
            RateTransition::Unchanged => None,
            RateTransition::Breached => {
                warn!(
                    rate_pct = rate.percent,
                    errors = rate.errors,
                    samples = rate.samples,
                    threshold = self.config.error_threshold,
                    "error rate above threshold"
                );
                let alert = Alert::ErrorRate {
                    rate,
                    threshold: self.config.error_threshold,
                    window_size: self.config.window_size,
                    pool: self.pools.current().to_string(),
                    observed_at: observed_at.to_string(),
                };
                let outcome = self.dispatch(alert, now);
                if outcome.is_settled() {
                    self.condition.mark_elevated();
                }
                Some(outcome)
            }
            RateTransition::Cleared => {
                info!(
                    rate_pct = rate.percent,
                    threshold = self.config.error_threshold,
                    "error rate returned to normal"
                );
                self.condition.mark_normal();
                if !self.config.notify_error_rate_recovery {
                    return None;
                }
                let alert = Alert::ErrorRateResolved {
                    rate,
                    threshold: self.config.error_threshold,
                    pool: self.pools.current().to_string(),
                    observed_at: observed_at.to_string(),
                };
                Some(self.dispatch(alert, now))
            }
        }
    }

    fn evaluate_pool(&mut self, observed_at: &str, now: Instant) -> Option<DispatchOutcome> {
        let from = self.pools.last_alerted().to_string();
        let to = self.pools.current().to_string();
        let alert = match self.pools.transition() {
            PoolTransition::None => return None,
            PoolTransition::Failover => Alert::Failover {
                from,
                to,
                observed_at: observed_at.to_string(),
                window_size: self.config.window_size,
            },
            PoolTransition::Recovery => Alert::Recovery {
                from,
                to,
                observed_at: observed_at.to_string(),
            },
        };

        let outcome = self.dispatch(alert, now);
        if outcome.is_settled() {
            self.pools.mark_alerted();
        }
        Some(outcome)
    }

    /// Pass an alert through the gate to the notifier.
    ///
    /// Only a successful send starts the cooldown. Failures are logged and
    /// reported, never propagated.
    fn dispatch(&mut self, alert: Alert, now: Instant) -> DispatchOutcome {
        let kind = alert.kind();

        if let Err(suppression) = self.gate.check(kind, now) {
            match suppression {
                Suppression::Maintenance => {
                    debug!(%kind, "maintenance mode: alert suppressed");
                }
                Suppression::NoNotifier => {
                    info!(%kind, alert = %alert.render(), "no notifier configured: alert logged only");
                }
                Suppression::Cooldown { remaining } => {
                    debug!(%kind, remaining_secs = remaining.as_secs(), "cooldown active: alert suppressed");
                }
            }
            return DispatchOutcome {
                alert,
                result: DispatchResult::Suppressed(suppression),
            };
        }

        let Some(notifier) = self.notifier.as_ref() else {
            return DispatchOutcome {
                alert,
                result: DispatchResult::Suppressed(Suppression::NoNotifier),
            };
        };

        debug!(%kind, "sending alert");
        let result = match notifier.send(&alert) {
            Ok(()) => {
                self.gate.record_fired(kind, now);
                self.stats.alerts_sent += 1;
                info!(%kind, "alert sent");
                DispatchResult::Sent
            }
            Err(e) => {
                self.stats.dispatch_failures += 1;
                warn!(%kind, error = %e, "alert dispatch failed");
                DispatchResult::Failed(e)
            }
        };
        DispatchOutcome { alert, result }
    }

    /// Error rate over the current window.
    pub fn current_error_rate(&self) -> ErrorRate {
        error_rate(&self.window)
    }

    pub fn window(&self) -> &SlidingWindow<LogRecord> {
        &self.window
    }

    pub fn current_pool(&self) -> &str {
        self.pools.current()
    }

    pub fn last_alerted_pool(&self) -> &str {
        self.pools.last_alerted()
    }

    pub fn error_rate_state(&self) -> ErrorRateState {
        self.condition.state()
    }

    pub fn gate(&self) -> &AlertGate {
        &self.gate
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    pub fn has_notifier(&self) -> bool {
        self.notifier.is_some()
    }
}
