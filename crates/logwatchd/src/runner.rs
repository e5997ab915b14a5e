//! Engine construction and the thread that owns it.
//!
//! The engine and its notifier are synchronous. They run on a dedicated
//! OS thread fed by a bounded channel, which keeps webhook round-trips off
//! the runtime's worker threads and preserves line order.

use std::thread::JoinHandle;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{info, warn};

use logwatch_core::WatchConfig;
use logwatch_engine::{AlertEngine, EngineStats};
use logwatch_notify::WebhookNotifier;

/// Lines buffered between the tailer and the engine.
pub const LINE_CHANNEL_CAPACITY: usize = 1024;

/// Build the engine for `config`, with a webhook notifier when a URL is set.
pub fn build_engine(config: &WatchConfig, runtime: Handle) -> anyhow::Result<AlertEngine> {
    let engine = AlertEngine::new(config.alerts.clone())?;
    match &config.webhook_url {
        Some(url) => {
            let notifier = WebhookNotifier::new(
                url,
                Duration::from_secs(config.webhook_timeout_secs),
                runtime,
            )?;
            info!(endpoint = %notifier.authority(), "webhook notifier configured");
            Ok(engine.with_notifier(notifier))
        }
        None => {
            warn!("no webhook URL configured, alerts will only be logged");
            Ok(engine)
        }
    }
}

/// Run `engine` on its own thread until `lines` closes.
pub fn spawn_engine_thread(
    mut engine: AlertEngine,
    mut lines: mpsc::Receiver<String>,
) -> std::io::Result<JoinHandle<EngineStats>> {
    std::thread::Builder::new()
        .name("logwatch-engine".to_string())
        .spawn(move || {
            while let Some(line) = lines.blocking_recv() {
                engine.ingest_line(&line);
            }
            engine.stats()
        })
}
