//! # courier-common
//!
//! Shared utilities including configuration, the listen error taxonomy, and
//! telemetry.

pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use config::{ConfigError, ListenConfig};
pub use error::{ListenError, ListenResult};
pub use telemetry::{init_tracing, try_init_tracing, TracingConfig, TracingError};
