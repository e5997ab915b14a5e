//! logwatch-engine: the alerting core of the access-log watcher.
//!
//! Parses access-log lines, keeps a bounded window of recent requests,
//! and raises failover/recovery and upstream error-rate alerts through a
//! cooldown-gated [`Notifier`].
//!
//! # Architecture
//!
//! ```text
//! AlertEngine::ingest_line()
//!   ├── LineParser → LogRecord (or skip)
//!   ├── SlidingWindow::push()
//!   ├── PoolTracker::observe()           (current pool)
//!   ├── ErrorRateCondition::check()      (error_rate, error_rate_resolved)
//!   ├── PoolTracker::transition()        (failover, recovery)
//!   └── AlertGate::check() → Notifier::send()
//! ```
//!
//! # Suppression
//!
//! Maintenance mode and a missing notifier silence every alert; the
//! condition behind a silenced alert counts as handled and is not
//! re-attempted on every following line. Otherwise each alert kind may
//! fire at most once per cooldown. Only a successful send consumes the
//! cooldown, so a failed delivery is retried on the next line that still
//! meets the condition.

pub mod alert;
pub mod engine;
pub mod error;
pub mod estimator;
pub mod gate;
pub mod notifier;
pub mod pool;
pub mod window;

pub use alert::{Alert, AlertKind};
pub use engine::{AlertEngine, DispatchOutcome, DispatchResult, EngineStats, LineOutcome};
pub use error::{EngineError, EngineResult, NotifyError};
pub use estimator::{ErrorRate, ErrorRateState, MIN_SAMPLES, error_rate};
pub use gate::{AlertGate, Suppression};
pub use notifier::{MemoryNotifier, Notifier};
pub use pool::{PoolTransition, classify};
pub use window::SlidingWindow;
