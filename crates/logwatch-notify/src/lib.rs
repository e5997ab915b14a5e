//! logwatch-notify: delivery transports for logwatch alerts.
//!
//! [`WebhookNotifier`] implements the engine's synchronous
//! [`Notifier`](logwatch_engine::Notifier) seam by blocking on a tokio
//! runtime handle while it posts to an incoming-webhook URL.

pub mod webhook;

pub use webhook::{WebhookNotifier, webhook_payload};
