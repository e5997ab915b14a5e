//! Access-log line parser.
//!
//! Expected shape (nginx `log_format` used by the blue/green proxy):
//!
//! ```text
//! [19/Oct/2026:10:00:00 +0000] 10.0.0.1 "GET /v1/ping HTTP/1.1" 200 pool="blue" release="blue-1" upstream_status=200 upstream_addr=10.0.0.2:3000 request_time=0.003 upstream_response_time=0.002
//! ```
//!
//! The timestamp, remote address, quoted request line and numeric status are
//! structural and must appear in that order at the start of the line. The
//! trailing `key=value` / `key="value"` attributes may appear in any order
//! and any of them may be missing.

use std::collections::HashMap;

use regex::Regex;

use crate::types::{LogRecord, UpstreamStatus};

/// Compiled patterns for parsing access-log lines.
#[derive(Debug, Clone)]
pub struct LineParser {
    head: Regex,
    attribute: Regex,
}

impl LineParser {
    pub fn new() -> Result<Self, regex::Error> {
        let head = Regex::new(
            r#"^\[(?P<timestamp>[^\]]+)\] (?P<remote_addr>\S+) "(?P<request>[^"]*)" (?P<status>\d+)(?:\s+(?P<rest>.*))?$"#,
        )?;
        let attribute =
            Regex::new(r#"(?P<key>[A-Za-z_][A-Za-z0-9_]*)=(?:"(?P<quoted>[^"]*)"|(?P<bare>\S*))"#)?;
        Ok(Self { head, attribute })
    }

    /// Parse one line into a record.
    ///
    /// Returns `None` when the structural prefix does not match. This is
    /// routine (blank lines, other log formats) and not an error.
    pub fn parse(&self, line: &str) -> Option<LogRecord> {
        let caps = self.head.captures(line.trim_end())?;
        let status = caps["status"].parse::<u16>().ok()?;

        let attrs = caps
            .name("rest")
            .map(|rest| self.attributes(rest.as_str()))
            .unwrap_or_default();
        let attr = |key: &str| attrs.get(key).copied().unwrap_or_default();

        Some(LogRecord {
            timestamp: caps["timestamp"].to_string(),
            remote_addr: caps["remote_addr"].to_string(),
            request_line: caps["request"].to_string(),
            status,
            pool: attr("pool").to_string(),
            release: attr("release").to_string(),
            upstream_status: UpstreamStatus::parse(attr("upstream_status")),
            upstream_addr: attr("upstream_addr").to_string(),
            request_time: parse_seconds(attr("request_time")).unwrap_or(0.0),
            upstream_response_time: parse_seconds(attr("upstream_response_time")),
        })
    }

    fn attributes<'a>(&self, rest: &'a str) -> HashMap<&'a str, &'a str> {
        self.attribute
            .captures_iter(rest)
            .filter_map(|caps| {
                let key = caps.name("key")?.as_str();
                let value = caps.name("quoted").or_else(|| caps.name("bare"))?.as_str();
                Some((key, value))
            })
            .collect()
    }
}

/// Parse a seconds value. `-`, negative values and garbage yield `None`.
///
/// Comma-separated values (one per upstream attempt) keep the first.
fn parse_seconds(raw: &str) -> Option<f64> {
    let first = raw.split(',').next()?.trim();
    first
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
}
