//! logwatchd: the access-log watcher daemon.
//!
//! ```text
//! LogTailer (tokio task) ── mpsc<String> ──► engine thread
//!                                              AlertEngine::ingest_line()
//!                                              └── WebhookNotifier (block_on)
//! ```

pub mod runner;
pub mod settings;
pub mod signal;
pub mod tail;

pub use runner::{LINE_CHANNEL_CAPACITY, build_engine, spawn_engine_thread};
pub use settings::{Overrides, resolve};
pub use signal::ShutdownSignal;
pub use tail::{LineBuffer, LogTailer};
