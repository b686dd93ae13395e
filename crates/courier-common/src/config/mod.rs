//! Configuration loading

mod listen_config;

pub use listen_config::{ConfigError, ListenConfig};
