//! Structured alerts and their chat-message rendering.
//!
//! Detection builds an [`Alert`] from plain data; [`Alert::render`] turns it
//! into the mrkdwn text posted to the webhook.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::estimator::ErrorRate;

/// Alert category. Each kind has its own cooldown slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Failover,
    Recovery,
    ErrorRate,
    ErrorRateResolved,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Failover => "failover",
            Self::Recovery => "recovery",
            Self::ErrorRate => "error_rate",
            Self::ErrorRateResolved => "error_rate_resolved",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected condition, ready to be rendered and dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Alert {
    /// Traffic left the last alerted pool for a non-primary one.
    Failover {
        from: String,
        to: String,
        observed_at: String,
        window_size: usize,
    },
    /// Traffic returned to the primary pool.
    Recovery {
        from: String,
        to: String,
        observed_at: String,
    },
    /// Upstream 5xx rate above the threshold.
    ErrorRate {
        rate: ErrorRate,
        threshold: f64,
        window_size: usize,
        pool: String,
        observed_at: String,
    },
    /// Upstream 5xx rate back at or under the threshold.
    ErrorRateResolved {
        rate: ErrorRate,
        threshold: f64,
        pool: String,
        observed_at: String,
    },
}

impl Alert {
    pub fn kind(&self) -> AlertKind {
        match self {
            Self::Failover { .. } => AlertKind::Failover,
            Self::Recovery { .. } => AlertKind::Recovery,
            Self::ErrorRate { .. } => AlertKind::ErrorRate,
            Self::ErrorRateResolved { .. } => AlertKind::ErrorRateResolved,
        }
    }

    /// Render the alert as Slack-flavoured markdown.
    pub fn render(&self) -> String {
        match self {
            Self::Failover {
                from,
                to,
                observed_at,
                window_size,
            } => format!(
                "⚠️ *Failover Event Detected*\n\
                 Traffic automatically switched pools:\n\
                 • From: *{}* pool\n\
                 • To: *{}* pool\n\
                 • Time: {observed_at}\n\
                 • Window: {window_size} requests",
                from.to_uppercase(),
                to.to_uppercase(),
            ),
            Self::Recovery {
                from,
                to,
                observed_at,
            } => format!(
                "✅ *Recovery: Primary Pool Restored*\n\
                 Traffic switched back to the primary pool:\n\
                 • From: *{}* pool\n\
                 • To: *{}* pool (primary)\n\
                 • Time: {observed_at}",
                from.to_uppercase(),
                to.to_uppercase(),
            ),
            Self::ErrorRate {
                rate,
                threshold,
                window_size,
                pool,
                observed_at,
            } => format!(
                "🚨 *High Error Rate Detected*\n\
                 Upstream 5xx errors exceed configured threshold:\n\
                 • Current Rate: `{:.1}%`\n\
                 • Threshold: `{threshold:.1}%`\n\
                 • Errors: `{}/{}` requests\n\
                 • Window: Last `{window_size}` requests\n\
                 • Pool: `{}`\n\
                 • Time: `{observed_at}`",
                rate.percent,
                rate.errors,
                rate.samples,
                pool.to_uppercase(),
            ),
            Self::ErrorRateResolved {
                rate,
                threshold,
                pool,
                observed_at,
            } => format!(
                "📉 *Error Rate Back to Normal*\n\
                 Upstream 5xx errors are at or under the threshold again:\n\
                 • Current Rate: `{:.1}%`\n\
                 • Threshold: `{threshold:.1}%`\n\
                 • Errors: `{}/{}` requests\n\
                 • Pool: `{}`\n\
                 • Time: `{observed_at}`",
                rate.percent,
                rate.errors,
                rate.samples,
                pool.to_uppercase(),
            ),
        }
    }
}
