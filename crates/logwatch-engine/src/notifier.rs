//! The notification seam between the engine and a delivery transport.

use std::sync::{Arc, Mutex};

use crate::alert::Alert;
use crate::error::NotifyError;

/// Delivers an alert somewhere an operator will see it.
///
/// `send` is synchronous from the engine's point of view. Transports that
/// need I/O block the calling thread until delivery succeeds or fails.
pub trait Notifier: Send {
    fn send(&self, alert: &Alert) -> Result<(), NotifyError>;
}

impl<N: Notifier + Sync + ?Sized> Notifier for Arc<N> {
    fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        (**self).send(alert)
    }
}

/// Keeps every alert in memory. Used by tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryNotifier {
    sent: Arc<Mutex<Vec<Alert>>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alerts delivered so far, oldest first.
    pub fn sent(&self) -> Vec<Alert> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        let mut sent = self
            .sent
            .lock()
            .map_err(|e| NotifyError::Transport(format!("memory notifier poisoned: {e}")))?;
        sent.push(alert.clone());
        Ok(())
    }
}
