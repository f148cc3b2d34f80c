//! Configuration module for the exporter.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Logging settings (level, optional log directory)
//! - HTTP settings (listen address, metrics path)
//! - Flussonic targets (address, credentials, interval, timeout)

mod app;
mod target;
mod validation;

pub use app::AppConfig;
pub use target::{Target, TargetConfig};
pub use validation::{ConfigError, expand_env_vars, parse_duration};

// Re-export constants
pub use app::{
    DEFAULT_CONFIG_PATHS, DEFAULT_LISTEN_ADDRESS, DEFAULT_METRICS_PATH, DEFAULT_REQUEST_TIMEOUT,
};
pub use target::DEFAULT_SCRAPE_INTERVAL;
