//! Configuration management for the call-screening engine
//!
//! Supports loading configuration from:
//! - TOML/YAML files
//! - Environment variables (DIALER_ prefix)
//! - Runtime overrides
//!
//! Keyword sets for transcript classification live in [`KeywordConfig`]:
//! an immutable object injected into the classifier at construction, so
//! per-deployment tuning never requires mutable global state.

pub mod keywords;
pub mod settings;

pub use keywords::KeywordConfig;
pub use settings::{
    load_settings, DetectionSettings, DispatchSettings, ObservabilityConfig,
    PersistenceConfig, RuntimeEnvironment, Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment error: {0}")]
    Environment(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
