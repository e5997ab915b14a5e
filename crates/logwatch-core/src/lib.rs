pub mod config;
pub mod error;
pub mod parser;
pub mod types;

pub use config::{AlertConfig, WatchConfig};
pub use error::{ConfigError, ConfigResult};
pub use parser::LineParser;
pub use types::*;
