//! Error types for configuration loading and validation.

use thiserror::Error;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating a watcher configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid error threshold: {0} (expected a percentage between 0 and 100)")]
    Threshold(f64),

    #[error("window size must be at least 1")]
    WindowSize,

    #[error("initial pool must not be empty")]
    InitialPool,

    #[error("poll interval must be at least 1ms")]
    PollInterval,

    #[error("invalid webhook url {url}: {reason}")]
    WebhookUrl { url: String, reason: String },
}
