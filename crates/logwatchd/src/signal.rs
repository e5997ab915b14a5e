//! Termination signals that trigger a graceful shutdown.

use tracing::info;

/// Ctrl-C, plus SIGTERM on unix (`docker stop`, systemd).
///
/// The SIGTERM handler is registered by [`install`](Self::install), so a
/// signal arriving before [`recv`](Self::recv) is awaited is not lost.
pub struct ShutdownSignal {
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownSignal {
    /// Register the handlers. Must be called inside a tokio runtime.
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            terminate: tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?,
        })
    }

    /// Wait for the first signal and return its name.
    pub async fn recv(mut self) -> std::io::Result<&'static str> {
        #[cfg(unix)]
        let name = tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                "SIGINT"
            }
            _ = self.terminate.recv() => "SIGTERM",
        };
        #[cfg(not(unix))]
        let name = {
            tokio::signal::ctrl_c().await?;
            "SIGINT"
        };

        info!(signal = name, "shutdown signal received");
        Ok(name)
    }
}
