//! Shared types used across logwatch crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Upstream status as reported by the proxy for one request.
///
/// `NotReported` covers the `-` sentinel, a missing attribute and any value
/// that does not start with a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamStatus {
    Code(u16),
    NotReported,
}

impl UpstreamStatus {
    /// Parse the raw attribute value.
    ///
    /// Multi-upstream values such as `502, 200` keep the first code, which is
    /// the attempt that decided whether the request was retried.
    pub fn parse(raw: &str) -> Self {
        let first = raw.split(',').next().unwrap_or_default().trim();
        match first.parse::<u16>() {
            Ok(code) => Self::Code(code),
            Err(_) => Self::NotReported,
        }
    }

    /// Whether this is an upstream 5xx.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Code(code) if (500..600).contains(code))
    }

    pub fn code(&self) -> Option<u16> {
        match self {
            Self::Code(code) => Some(*code),
            Self::NotReported => None,
        }
    }
}

impl fmt::Display for UpstreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "{code}"),
            Self::NotReported => f.write_str("-"),
        }
    }
}

/// One parsed access-log line.
///
/// Records are built once by the parser and only ever read afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Timestamp exactly as logged.
    pub timestamp: String,
    pub remote_addr: String,
    pub request_line: String,
    /// Client-facing status.
    pub status: u16,
    /// Pool that served the request. Empty means unknown.
    pub pool: String,
    pub release: String,
    pub upstream_status: UpstreamStatus,
    pub upstream_addr: String,
    /// Total request time in seconds.
    pub request_time: f64,
    /// Upstream response time in seconds, `None` for `-` or `-1`.
    pub upstream_response_time: Option<f64>,
}

impl LogRecord {
    /// Whether the record carries a known pool label.
    pub fn has_pool(&self) -> bool {
        !self.pool.is_empty()
    }
}
