//! logwatchd: tails an nginx access log and raises blue/green failover,
//! recovery and upstream error-rate alerts.
//!
//! # Usage
//!
//! ```text
//! logwatchd --config /etc/logwatch.toml
//! SLACK_WEBHOOK_URL=https://hooks.slack.com/... LOG_PATH=/var/log/nginx/access.log logwatchd
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::anyhow;
use clap::{Parser, ValueEnum};
use tokio::sync::{mpsc, watch};
use tracing::info;

use logwatchd::{LINE_CHANNEL_CAPACITY, LogTailer, Overrides, ShutdownSignal};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "logwatchd", about = "Access-log failover and error-rate alerter")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(flatten)]
    overrides: Overrides,
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,logwatchd=debug,logwatch=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = logwatchd::resolve(cli.config.as_deref(), cli.overrides)?;

    info!(
        log_path = %config.log_path.display(),
        threshold_pct = config.alerts.error_threshold,
        window_size = config.alerts.window_size,
        cooldown_secs = config.alerts.cooldown_secs,
        maintenance_mode = config.alerts.maintenance_mode,
        initial_pool = %config.alerts.initial_pool,
        notifier = config.webhook_url.is_some(),
        "logwatchd starting"
    );

    let shutdown = ShutdownSignal::install()?;
    let engine = logwatchd::build_engine(&config, tokio::runtime::Handle::current())?;

    // ── Pipeline ───────────────────────────────────────────────

    let (line_tx, line_rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
    let engine_thread = logwatchd::spawn_engine_thread(engine, line_rx)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let tailer = LogTailer::new(
        config.log_path.clone(),
        Duration::from_millis(config.poll_interval_ms),
        config.read_from_start,
    );
    let tailer_handle = tokio::spawn(tailer.run(line_tx, shutdown_rx));

    // ── Shutdown ───────────────────────────────────────────────

    shutdown.recv().await?;
    let _ = shutdown_tx.send(true);

    // The tailer drops its sender on exit, which ends the engine loop.
    let _ = tailer_handle.await;
    let stats = tokio::task::spawn_blocking(move || engine_thread.join())
        .await?
        .map_err(|_| anyhow!("engine thread panicked"))?;

    info!(
        lines = stats.lines_seen,
        accepted = stats.records_accepted,
        skipped = stats.lines_skipped,
        alerts_sent = stats.alerts_sent,
        dispatch_failures = stats.dispatch_failures,
        "logwatchd stopped"
    );
    Ok(())
}
