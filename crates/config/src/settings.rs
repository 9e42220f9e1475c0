//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::{ConfigError, KeywordConfig};

/// Runtime environment enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - relaxed validation, warnings only
    #[default]
    Development,
    /// Staging mode - stricter validation
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Detection window and classifier configuration
    #[serde(default)]
    pub detection: DetectionSettings,

    /// Action dispatch configuration
    #[serde(default)]
    pub dispatch: DispatchSettings,

    /// Classifier keyword sets
    #[serde(default)]
    pub keywords: KeywordConfig,

    /// Persistence configuration (ScyllaDB)
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Detection window and signal configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSettings {
    /// Bounded decision window after call connect (seconds)
    #[serde(default = "default_detection_window_seconds")]
    pub detection_window_seconds: u64,

    /// Target beep-tone frequency (Hz)
    #[serde(default = "default_tone_target_hz")]
    pub tone_target_hz: f32,

    /// Accepted deviation from the target frequency (Hz)
    #[serde(default = "default_tone_tolerance_hz")]
    pub tone_tolerance_hz: f32,

    /// Minimum normalized peak amplitude for a beep (0.0 - 1.0)
    #[serde(default = "default_tone_amplitude_threshold")]
    pub tone_amplitude_threshold: f32,

    /// Enable IVR menu classification
    #[serde(default = "default_true")]
    pub ivr_detection_enabled: bool,

    /// Inter-segment gap counted as a speech pause (milliseconds)
    #[serde(default = "default_pause_gap_ms")]
    pub pause_gap_ms: u64,
}

fn default_detection_window_seconds() -> u64 {
    8
}

fn default_tone_target_hz() -> f32 {
    900.0
}

fn default_tone_tolerance_hz() -> f32 {
    100.0
}

fn default_tone_amplitude_threshold() -> f32 {
    0.3
}

fn default_true() -> bool {
    true
}

fn default_pause_gap_ms() -> u64 {
    800
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            detection_window_seconds: default_detection_window_seconds(),
            tone_target_hz: default_tone_target_hz(),
            tone_tolerance_hz: default_tone_tolerance_hz(),
            tone_amplitude_threshold: default_tone_amplitude_threshold(),
            ivr_detection_enabled: true,
            pause_gap_ms: default_pause_gap_ms(),
        }
    }
}

impl DetectionSettings {
    pub fn detection_window(&self) -> Duration {
        Duration::from_secs(self.detection_window_seconds)
    }

    pub fn pause_gap(&self) -> Duration {
        Duration::from_millis(self.pause_gap_ms)
    }
}

/// Action dispatch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSettings {
    /// Callback delay for answering-machine outcomes (hours)
    #[serde(default = "default_callback_delay_hours")]
    pub callback_delay_hours: u32,

    /// Maximum IVR navigation attempts before hanging up
    #[serde(default = "default_max_navigation_attempts")]
    pub max_navigation_attempts: u32,

    /// Per-attempt navigation timeout (milliseconds)
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    /// Grace period before termination, letting in-flight agent speech
    /// finish (milliseconds)
    #[serde(default = "default_hangup_grace_ms")]
    pub hangup_grace_ms: u64,

    /// How long a terminated call id is remembered for hangup dedup (seconds)
    #[serde(default = "default_processed_retention_secs")]
    pub processed_retention_secs: u64,

    /// Queue capacity for each event-bus channel
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_callback_delay_hours() -> u32 {
    3
}

fn default_max_navigation_attempts() -> u32 {
    2
}

fn default_navigation_timeout_ms() -> u64 {
    2000
}

fn default_hangup_grace_ms() -> u64 {
    3000
}

fn default_processed_retention_secs() -> u64 {
    600
}

fn default_queue_capacity() -> usize {
    64
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            callback_delay_hours: default_callback_delay_hours(),
            max_navigation_attempts: default_max_navigation_attempts(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            hangup_grace_ms: default_hangup_grace_ms(),
            processed_retention_secs: default_processed_retention_secs(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl DispatchSettings {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn hangup_grace(&self) -> Duration {
        Duration::from_millis(self.hangup_grace_ms)
    }

    pub fn processed_retention(&self) -> Duration {
        Duration::from_secs(self.processed_retention_secs)
    }

    pub fn callback_delay(&self) -> chrono::Duration {
        chrono::Duration::hours(self.callback_delay_hours as i64)
    }
}

/// Persistence configuration for ScyllaDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Enable ScyllaDB persistence (false = in-memory only)
    #[serde(default)]
    pub enabled: bool,

    /// ScyllaDB host addresses
    #[serde(default = "default_scylla_hosts")]
    pub scylla_hosts: Vec<String>,

    /// ScyllaDB keyspace name
    #[serde(default = "default_scylla_keyspace")]
    pub keyspace: String,

    /// ScyllaDB replication factor
    #[serde(default = "default_replication_factor")]
    pub replication_factor: u8,
}

fn default_scylla_hosts() -> Vec<String> {
    std::env::var("SCYLLA_HOSTS")
        .map(|s| s.split(',').map(|h| h.trim().to_string()).collect())
        .unwrap_or_else(|_| vec!["127.0.0.1:9042".to_string()])
}

fn default_scylla_keyspace() -> String {
    std::env::var("SCYLLA_KEYSPACE").unwrap_or_else(|_| "outbound_dialer".to_string())
}

fn default_replication_factor() -> u8 {
    1
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scylla_hosts: default_scylla_hosts(),
            keyspace: default_scylla_keyspace(),
            replication_factor: default_replication_factor(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level filter directive (e.g. "info", "dialer_detection=debug")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON (production) instead of human-readable text
    #[serde(default)]
    pub json_logs: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

impl Settings {
    /// Load settings from an optional file plus DIALER_ environment overrides
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.display().to_string()));
            }
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("DIALER")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;

        tracing::info!(
            environment = ?settings.environment,
            window_s = settings.detection.detection_window_seconds,
            ivr_enabled = settings.detection.ivr_detection_enabled,
            persistence = settings.persistence.enabled,
            "Settings loaded"
        );

        Ok(settings)
    }

    /// Validate settings, strictly in staging/production
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.detection.detection_window_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "detection.detection_window_seconds".into(),
                message: "must be greater than zero".into(),
            });
        }

        if !(0.0..=1.0).contains(&self.detection.tone_amplitude_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "detection.tone_amplitude_threshold".into(),
                message: "must be within [0.0, 1.0]".into(),
            });
        }

        if self.detection.tone_target_hz <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "detection.tone_target_hz".into(),
                message: "must be positive".into(),
            });
        }

        if self.dispatch.max_navigation_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "dispatch.max_navigation_attempts".into(),
                message: "must be at least 1".into(),
            });
        }

        if self.keywords.is_empty() {
            if self.environment.is_strict() {
                return Err(ConfigError::InvalidValue {
                    field: "keywords".into(),
                    message: "all keyword sets are empty".into(),
                });
            }
            tracing::warn!("All keyword sets are empty; keyword classification disabled");
        }

        Ok(())
    }
}

/// Convenience loader using defaults when no file is given
pub fn load_settings(config_path: Option<&Path>) -> Result<Settings, ConfigError> {
    match config_path {
        Some(path) => Settings::load(Some(path)),
        None => {
            let settings = Settings::default();
            settings.validate()?;
            Ok(settings)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_contract() {
        let settings = Settings::default();
        assert_eq!(settings.detection.detection_window_seconds, 8);
        assert_eq!(settings.detection.tone_target_hz, 900.0);
        assert_eq!(settings.detection.tone_tolerance_hz, 100.0);
        assert_eq!(settings.detection.tone_amplitude_threshold, 0.3);
        assert!(settings.detection.ivr_detection_enabled);
        assert_eq!(settings.dispatch.callback_delay_hours, 3);
        assert_eq!(settings.dispatch.max_navigation_attempts, 2);
        assert_eq!(settings.dispatch.navigation_timeout_ms, 2000);
        assert_eq!(settings.dispatch.hangup_grace_ms, 3000);
        assert_eq!(settings.dispatch.processed_retention_secs, 600);
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let mut settings = Settings::default();
        settings.detection.detection_window_seconds = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let mut settings = Settings::default();
        settings.detection.tone_amplitude_threshold = 1.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Settings::load(Some(Path::new("/nonexistent/dialer.toml")));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_default_settings_pass_validation() {
        assert!(load_settings(None).is_ok());
    }
}
