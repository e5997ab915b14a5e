//! End-to-end alerting behaviour of `AlertEngine`.
//!
//! Drives the engine with realistic access-log lines and explicit clock
//! values, and checks what reaches the notifier.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use logwatch_core::AlertConfig;
use logwatch_engine::*;

// ── Helpers ───────────────────────────────────────────────────────

fn line(pool: &str, upstream_status: &str) -> String {
    format!(
        r#"[19/Oct/2026:10:00:00 +0000] 172.18.0.1 "GET /version HTTP/1.1" 200 pool="{pool}" release="{pool}-v1" upstream_status={upstream_status} upstream_addr=172.18.0.3:3000 request_time=0.004 upstream_response_time=0.003"#
    )
}

fn small_window() -> AlertConfig {
    AlertConfig {
        window_size: 50,
        ..Default::default()
    }
}

fn engine_with(config: AlertConfig) -> (AlertEngine, MemoryNotifier) {
    let notifier = MemoryNotifier::new();
    let engine = AlertEngine::new(config).unwrap().with_notifier(notifier.clone());
    (engine, notifier)
}

fn sent_kinds(outcome: &LineOutcome) -> Vec<AlertKind> {
    outcome.sent().map(Alert::kind).collect()
}

/// Fails every send and counts the attempts.
#[derive(Clone, Default)]
struct FailingNotifier {
    attempts: Arc<AtomicUsize>,
}

impl Notifier for FailingNotifier {
    fn send(&self, _alert: &Alert) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(NotifyError::Status {
            status: 500,
            body: "internal_error".to_string(),
        })
    }
}

/// Fails the first `failures` sends, then delivers.
#[derive(Clone)]
struct FlakyNotifier {
    failures: usize,
    attempts: Arc<AtomicUsize>,
    inner: MemoryNotifier,
}

impl Notifier for FlakyNotifier {
    fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(NotifyError::Transport("connection refused".to_string()));
        }
        self.inner.send(alert)
    }
}

// ── Window ────────────────────────────────────────────────────────

#[test]
fn window_stays_bounded() {
    let (mut engine, _) = engine_with(AlertConfig::default());
    for _ in 0..500 {
        engine.ingest_line(&line("blue", "200"));
        assert!(engine.window().len() <= 200);
    }
    assert_eq!(engine.window().len(), 200);
    assert_eq!(engine.stats().records_accepted, 500);
}

#[test]
fn malformed_line_leaves_state_unchanged() {
    let (mut engine, notifier) = engine_with(AlertConfig::default());
    engine.ingest_line(&line("blue", "502"));

    let malformed = r#"[19/Oct/2026:10:00:00 +0000] 172.18.0.1 GET /version 200 pool="green""#;
    let outcome = engine.ingest_line(malformed);

    assert!(matches!(outcome, LineOutcome::Skipped));
    assert_eq!(engine.window().len(), 1);
    assert_eq!(engine.current_pool(), "blue");
    assert!(notifier.sent().is_empty());
}

// ── Error rate ────────────────────────────────────────────────────

#[test]
fn error_rate_needs_fifty_samples() {
    let (mut engine, notifier) = engine_with(AlertConfig::default());
    let now = Instant::now();

    for _ in 0..49 {
        let outcome = engine.ingest_line_at(&line("blue", "502"), now);
        assert!(outcome.dispatches().is_empty());
    }
    assert_eq!(engine.current_error_rate().percent, 100.0);
    assert!(notifier.sent().is_empty());

    let outcome = engine.ingest_line_at(&line("blue", "502"), now);
    assert_eq!(sent_kinds(&outcome), vec![AlertKind::ErrorRate]);
    assert_eq!(engine.error_rate_state(), ErrorRateState::Elevated);

    // Still elevated: no further alerts.
    for _ in 0..20 {
        let outcome = engine.ingest_line_at(&line("blue", "502"), now);
        assert!(outcome.dispatches().is_empty());
    }
    assert_eq!(notifier.sent().len(), 1);
}

#[test]
fn error_rate_alert_carries_counts() {
    let (mut engine, notifier) = engine_with(AlertConfig::default());
    for _ in 0..25 {
        engine.ingest_line(&line("blue", "200"));
    }
    for _ in 0..25 {
        engine.ingest_line(&line("blue", "503"));
    }

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        Alert::ErrorRate {
            rate,
            threshold,
            window_size,
            pool,
            ..
        } => {
            assert_eq!(rate.errors, 25);
            assert_eq!(rate.samples, 50);
            assert_eq!(rate.percent, 50.0);
            assert_eq!(*threshold, 2.0);
            assert_eq!(*window_size, 200);
            assert_eq!(pool, "blue");
        }
        other => panic!("unexpected alert: {other:?}"),
    }
}

#[test]
fn no_upstream_lines_dilute_the_rate() {
    let (mut engine, notifier) = engine_with(AlertConfig::default());
    // 1 error in 50 samples is exactly 2%: not above the threshold.
    engine.ingest_line(&line("blue", "502"));
    for _ in 0..49 {
        engine.ingest_line(&line("blue", "-"));
    }
    assert_eq!(engine.current_error_rate().percent, 2.0);
    assert!(notifier.sent().is_empty());
}

#[test]
fn error_rate_clears_at_trigger_threshold_silently_by_default() {
    let (mut engine, notifier) = engine_with(small_window());
    for _ in 0..50 {
        engine.ingest_line(&line("blue", "502"));
    }
    assert_eq!(engine.error_rate_state(), ErrorRateState::Elevated);

    // Each OK evicts one error. After 48 OKs: 2/50 = 4%, still elevated.
    for _ in 0..48 {
        engine.ingest_line(&line("blue", "200"));
    }
    assert_eq!(engine.error_rate_state(), ErrorRateState::Elevated);

    // 1/50 = 2% is at the threshold: cleared.
    let outcome = engine.ingest_line(&line("blue", "200"));
    assert!(outcome.dispatches().is_empty());
    assert_eq!(engine.error_rate_state(), ErrorRateState::Normal);
    assert_eq!(notifier.sent().len(), 1);
}

#[test]
fn error_rate_recovery_notification_when_enabled() {
    let config = AlertConfig {
        notify_error_rate_recovery: true,
        ..small_window()
    };
    let (mut engine, notifier) = engine_with(config);
    for _ in 0..50 {
        engine.ingest_line(&line("blue", "502"));
    }
    for _ in 0..48 {
        engine.ingest_line(&line("blue", "200"));
    }
    let outcome = engine.ingest_line(&line("blue", "200"));
    assert_eq!(sent_kinds(&outcome), vec![AlertKind::ErrorRateResolved]);

    let kinds: Vec<_> = notifier.sent().iter().map(Alert::kind).collect();
    assert_eq!(kinds, vec![AlertKind::ErrorRate, AlertKind::ErrorRateResolved]);
}

// ── Cooldown ──────────────────────────────────────────────────────

#[test]
fn cooldown_suppresses_then_allows() {
    let (mut engine, notifier) = engine_with(small_window());
    let t0 = Instant::now();

    // First fire.
    for _ in 0..50 {
        engine.ingest_line_at(&line("blue", "502"), t0);
    }
    // Clear: 49 OKs leave 1/50 = 2%.
    for _ in 0..49 {
        engine.ingest_line_at(&line("blue", "200"), t0);
    }
    assert_eq!(engine.error_rate_state(), ErrorRateState::Normal);

    // The first new error only evicts the last old one (still 2%); the
    // second breaches inside the cooldown: suppressed, stays normal.
    let t1 = t0 + Duration::from_secs(10);
    let outcome = engine.ingest_line_at(&line("blue", "502"), t1);
    assert!(outcome.dispatches().is_empty());
    let outcome = engine.ingest_line_at(&line("blue", "502"), t1);
    match &outcome.dispatches()[0].result {
        DispatchResult::Suppressed(Suppression::Cooldown { remaining }) => {
            assert_eq!(*remaining, Duration::from_secs(290));
        }
        other => panic!("expected cooldown suppression, got {other:?}"),
    }
    assert_eq!(engine.error_rate_state(), ErrorRateState::Normal);

    // Third attempt after the cooldown: sent.
    let t2 = t0 + Duration::from_secs(300);
    let outcome = engine.ingest_line_at(&line("blue", "502"), t2);
    assert_eq!(sent_kinds(&outcome), vec![AlertKind::ErrorRate]);
    assert_eq!(notifier.sent().len(), 2);
    assert_eq!(engine.gate().last_fired(AlertKind::ErrorRate), Some(t2));
}

#[test]
fn suppressed_failover_fires_once_cooldown_elapses() {
    let (mut engine, notifier) = engine_with(AlertConfig::default());
    let t0 = Instant::now();

    engine.ingest_line_at(&line("green", "200"), t0);
    engine.ingest_line_at(&line("blue", "200"), t0);
    assert_eq!(notifier.sent().len(), 2);

    // Failover again within the cooldown.
    let outcome = engine.ingest_line_at(&line("green", "200"), t0 + Duration::from_secs(10));
    assert!(matches!(
        outcome.dispatches()[0].result,
        DispatchResult::Suppressed(Suppression::Cooldown { .. })
    ));
    assert_eq!(engine.last_alerted_pool(), "blue");

    let outcome = engine.ingest_line_at(&line("green", "200"), t0 + Duration::from_secs(301));
    assert_eq!(sent_kinds(&outcome), vec![AlertKind::Failover]);
    assert_eq!(engine.last_alerted_pool(), "green");
}

// ── Pool transitions ──────────────────────────────────────────────

#[test]
fn blue_green_blue_is_failover_then_recovery() {
    let (mut engine, notifier) = engine_with(AlertConfig::default());
    engine.ingest_line(&line("blue", "200"));
    engine.ingest_line(&line("green", "200"));
    engine.ingest_line(&line("green", "200"));
    engine.ingest_line(&line("blue", "200"));

    let sent = notifier.sent();
    assert_eq!(sent.len(), 2);
    assert!(matches!(
        &sent[0],
        Alert::Failover { from, to, .. } if from == "blue" && to == "green"
    ));
    assert!(matches!(
        &sent[1],
        Alert::Recovery { from, to, .. } if from == "green" && to == "blue"
    ));
}

#[test]
fn non_primary_initial_pool() {
    let config = AlertConfig {
        initial_pool: "green".to_string(),
        ..Default::default()
    };
    let (mut engine, notifier) = engine_with(config);
    engine.ingest_line(&line("blue", "200"));
    engine.ingest_line(&line("green", "200"));

    let kinds: Vec<_> = notifier.sent().iter().map(Alert::kind).collect();
    assert_eq!(kinds, vec![AlertKind::Failover, AlertKind::Recovery]);
}

#[test]
fn error_rate_is_evaluated_before_pool_transition() {
    let (mut engine, _) = engine_with(AlertConfig::default());
    for _ in 0..49 {
        engine.ingest_line(&line("blue", "502"));
    }

    // The 50th line both breaches the rate and switches pool.
    let outcome = engine.ingest_line(&line("green", "502"));
    assert_eq!(
        sent_kinds(&outcome),
        vec![AlertKind::ErrorRate, AlertKind::Failover]
    );

    // The rate alert already reports the pool that served the line.
    match &outcome.dispatches()[0].alert {
        Alert::ErrorRate { pool, .. } => assert_eq!(pool, "green"),
        other => panic!("unexpected alert: {other:?}"),
    }
}

// ── Suppression and failures ──────────────────────────────────────

#[test]
fn maintenance_mode_suppresses_everything() {
    let config = AlertConfig {
        maintenance_mode: true,
        ..Default::default()
    };
    let (mut engine, notifier) = engine_with(config);

    for i in 0..120 {
        let pool = if i % 2 == 0 { "green" } else { "blue" };
        let outcome = engine.ingest_line(&line(pool, "502"));
        for dispatch in outcome.dispatches() {
            assert!(matches!(
                dispatch.result,
                DispatchResult::Suppressed(Suppression::Maintenance)
            ));
        }
    }
    assert!(notifier.sent().is_empty());
    assert_eq!(engine.stats().alerts_sent, 0);
}

#[test]
fn unconfigured_notifier_settles_failover_once() {
    let mut engine = AlertEngine::new(AlertConfig::default()).unwrap();

    let attempts: usize = (0..1000)
        .map(|_| engine.ingest_line(&line("green", "200")).dispatches().len())
        .sum();

    assert_eq!(attempts, 1);
    assert_eq!(engine.last_alerted_pool(), "green");

    // A later change is still detected.
    let outcome = engine.ingest_line(&line("blue", "200"));
    assert_eq!(outcome.dispatches().len(), 1);
    assert_eq!(outcome.dispatches()[0].alert.kind(), AlertKind::Recovery);
}

#[test]
fn maintenance_settles_failover_once() {
    let config = AlertConfig {
        maintenance_mode: true,
        ..Default::default()
    };
    let (mut engine, notifier) = engine_with(config);

    let attempts: usize = (0..1000)
        .map(|_| engine.ingest_line(&line("green", "200")).dispatches().len())
        .sum();

    assert_eq!(attempts, 1);
    assert_eq!(engine.last_alerted_pool(), "green");
    assert!(notifier.sent().is_empty());
}

#[test]
fn unconfigured_notifier_settles_error_rate_once() {
    let mut engine = AlertEngine::new(small_window()).unwrap();

    let error_rate_attempts = (0..500)
        .flat_map(|_| {
            engine
                .ingest_line(&line("blue", "502"))
                .dispatches()
                .iter()
                .map(|d| d.alert.kind())
                .collect::<Vec<_>>()
        })
        .filter(|kind| *kind == AlertKind::ErrorRate)
        .count();

    assert_eq!(error_rate_attempts, 1);
    assert_eq!(engine.error_rate_state(), ErrorRateState::Elevated);
}

#[test]
fn failing_notifier_never_consumes_cooldown() {
    let notifier = FailingNotifier::default();
    let mut engine = AlertEngine::new(AlertConfig::default())
        .unwrap()
        .with_notifier(notifier.clone());
    let now = Instant::now();

    // Three lines on green: three failover attempts.
    for _ in 0..3 {
        let outcome = engine.ingest_line_at(&line("green", "200"), now);
        assert!(matches!(outcome.dispatches()[0].result, DispatchResult::Failed(_)));
    }
    assert_eq!(notifier.attempts.load(Ordering::SeqCst), 3);
    assert_eq!(engine.last_alerted_pool(), "blue");
    assert!(engine.gate().last_fired(AlertKind::Failover).is_none());

    // Error rate: attempted on every breaching line once significant.
    let mut engine = AlertEngine::new(AlertConfig::default())
        .unwrap()
        .with_notifier(notifier.clone());
    for _ in 0..52 {
        engine.ingest_line_at(&line("blue", "502"), now);
    }
    assert_eq!(notifier.attempts.load(Ordering::SeqCst), 3 + 3);
    assert_eq!(engine.error_rate_state(), ErrorRateState::Normal);
    assert!(engine.gate().last_fired(AlertKind::ErrorRate).is_none());
    assert_eq!(engine.stats().dispatch_failures, 3);
}

#[test]
fn failed_failover_is_retried_on_next_line() {
    let notifier = FlakyNotifier {
        failures: 1,
        attempts: Arc::new(AtomicUsize::new(0)),
        inner: MemoryNotifier::new(),
    };
    let mut engine = AlertEngine::new(AlertConfig::default())
        .unwrap()
        .with_notifier(notifier.clone());

    let outcome = engine.ingest_line(&line("green", "200"));
    assert!(matches!(outcome.dispatches()[0].result, DispatchResult::Failed(_)));
    assert_eq!(engine.current_pool(), "green");
    assert_eq!(engine.last_alerted_pool(), "blue");

    let outcome = engine.ingest_line(&line("green", "200"));
    assert_eq!(sent_kinds(&outcome), vec![AlertKind::Failover]);
    assert_eq!(engine.last_alerted_pool(), "green");
    assert_eq!(notifier.inner.sent().len(), 1);
}
