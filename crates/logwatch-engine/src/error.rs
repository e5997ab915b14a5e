//! Error types for the alerting engine.

use logwatch_core::ConfigError;
use thiserror::Error;

/// Result type alias for engine construction.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that prevent an engine from being built.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid alert config: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to compile line pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// A notifier could not deliver an alert.
///
/// Never fatal: the engine logs it and leaves the cooldown untouched.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid endpoint: {0}")]
    Endpoint(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("endpoint responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}
