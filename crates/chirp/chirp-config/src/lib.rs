pub mod config;

pub use config::{ChirpConfig, ConfigError};
