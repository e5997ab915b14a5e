//! logwatch.toml configuration parser.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

pub const DEFAULT_ERROR_THRESHOLD: f64 = 2.0;
pub const DEFAULT_WINDOW_SIZE: usize = 200;
pub const DEFAULT_COOLDOWN_SECS: u64 = 300;
pub const DEFAULT_INITIAL_POOL: &str = "blue";
pub const DEFAULT_LOG_PATH: &str = "/var/log/nginx/access.log";

/// Alerting parameters consumed by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Upstream 5xx percentage above which the error-rate alert fires.
    pub error_threshold: f64,
    /// Number of most recent records kept in the sliding window.
    pub window_size: usize,
    /// Minimum seconds between two dispatched alerts of the same kind.
    pub cooldown_secs: u64,
    /// Suppress every alert while set.
    pub maintenance_mode: bool,
    /// The primary pool. Switching back to it is a recovery.
    pub initial_pool: String,
    /// Also notify when the error rate drops back under the threshold.
    pub notify_error_rate_recovery: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            window_size: DEFAULT_WINDOW_SIZE,
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            maintenance_mode: false,
            initial_pool: DEFAULT_INITIAL_POOL.to_string(),
            notify_error_rate_recovery: false,
        }
    }
}

impl AlertConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.error_threshold.is_finite() || !(0.0..=100.0).contains(&self.error_threshold) {
            return Err(ConfigError::Threshold(self.error_threshold));
        }
        if self.window_size == 0 {
            return Err(ConfigError::WindowSize);
        }
        if self.initial_pool.trim().is_empty() {
            return Err(ConfigError::InitialPool);
        }
        Ok(())
    }
}

/// Daemon configuration: where to read from, where to send to, and the
/// `[alerts]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Access log to tail.
    pub log_path: PathBuf,
    /// Incoming-webhook endpoint. Alerts are only logged when unset.
    pub webhook_url: Option<String>,
    pub webhook_timeout_secs: u64,
    pub poll_interval_ms: u64,
    /// Process the existing file contents on startup instead of only new lines.
    pub read_from_start: bool,
    pub alerts: AlertConfig,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            webhook_url: None,
            webhook_timeout_secs: 10,
            poll_interval_ms: 1000,
            read_from_start: true,
            alerts: AlertConfig::default(),
        }
    }
}

impl WatchConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.alerts.validate()?;
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::PollInterval);
        }
        if let Some(url) = &self.webhook_url {
            validate_webhook_url(url)?;
        }
        Ok(())
    }
}

/// The notifier speaks plain HTTP/1.1 or HTTPS to an absolute URL.
fn validate_webhook_url(url: &str) -> ConfigResult<()> {
    let invalid = |reason: &str| ConfigError::WebhookUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let uri: http::Uri = url.parse().map_err(|e: http::uri::InvalidUri| invalid(&e.to_string()))?;
    match uri.scheme_str() {
        Some("http") | Some("https") => {}
        Some(other) => return Err(invalid(&format!("unsupported scheme {other}"))),
        None => return Err(invalid("missing scheme")),
    }
    if uri.host().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(())
}
