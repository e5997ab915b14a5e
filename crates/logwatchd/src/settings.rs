//! Configuration resolution: defaults, then the TOML file, then flags and
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::builder::BoolishValueParser;

use logwatch_core::WatchConfig;

/// Per-setting overrides. Each flag also reads the environment variable
/// deployments already use for it.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct Overrides {
    /// Access log to tail.
    #[arg(long, env = "LOG_PATH")]
    pub log_path: Option<PathBuf>,

    /// Incoming-webhook URL. An empty value disables notifications.
    #[arg(long, env = "SLACK_WEBHOOK_URL", hide_env_values = true)]
    pub webhook_url: Option<String>,

    /// Upstream 5xx percentage that triggers the error-rate alert.
    #[arg(long, env = "ERROR_RATE_THRESHOLD")]
    pub error_threshold: Option<f64>,

    /// Number of recent requests the error rate is computed over.
    #[arg(long, env = "WINDOW_SIZE")]
    pub window_size: Option<usize>,

    /// Minimum seconds between alerts of the same kind.
    #[arg(long, env = "ALERT_COOLDOWN_SEC")]
    pub cooldown_secs: Option<u64>,

    /// Suppress all alerts (true/false, yes/no, 1/0).
    #[arg(long, env = "MAINTENANCE_MODE", value_parser = BoolishValueParser::new())]
    pub maintenance_mode: Option<bool>,

    /// The primary pool; switching back to it is reported as a recovery.
    #[arg(long, env = "INITIAL_ACTIVE_POOL")]
    pub initial_pool: Option<String>,

    /// Also notify when the error rate returns under the threshold.
    #[arg(long, value_parser = BoolishValueParser::new())]
    pub notify_error_rate_recovery: Option<bool>,

    /// Milliseconds between log file polls.
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Only process lines appended after startup.
    #[arg(long)]
    pub from_end: bool,
}

impl Overrides {
    /// Apply every set override on top of `config`.
    pub fn apply(self, config: &mut WatchConfig) {
        if let Some(path) = self.log_path {
            config.log_path = path;
        }
        if let Some(url) = self.webhook_url {
            let url = url.trim();
            config.webhook_url = (!url.is_empty()).then(|| url.to_string());
        }
        if let Some(threshold) = self.error_threshold {
            config.alerts.error_threshold = threshold;
        }
        if let Some(size) = self.window_size {
            config.alerts.window_size = size;
        }
        if let Some(secs) = self.cooldown_secs {
            config.alerts.cooldown_secs = secs;
        }
        if let Some(maintenance) = self.maintenance_mode {
            config.alerts.maintenance_mode = maintenance;
        }
        if let Some(pool) = self.initial_pool {
            config.alerts.initial_pool = pool.trim().to_string();
        }
        if let Some(notify) = self.notify_error_rate_recovery {
            config.alerts.notify_error_rate_recovery = notify;
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval_ms = ms;
        }
        if self.from_end {
            config.read_from_start = false;
        }
    }
}

/// Build the effective configuration and validate it.
pub fn resolve(config_path: Option<&Path>, overrides: Overrides) -> anyhow::Result<WatchConfig> {
    let mut config = match config_path {
        Some(path) => WatchConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => WatchConfig::default(),
    };
    overrides.apply(&mut config);
    config.validate().context("invalid configuration")?;
    Ok(config)
}
