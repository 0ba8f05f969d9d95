//! Pipeline configuration.
//!
//! ```yaml
//! max_attempts: 3
//! attempt_timeout: 30s
//! store_timeout: 5s
//! agent: content
//! audit_retries: 2
//! completion:
//!   model: claude-sonnet-4-5-20250514
//!   temperature: 0.7
//! default_safety:
//!   safety_mode: safe
//!   banned_phrases: ["risk-free"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use brandgate_core::{BrandSafetyConfig, MAX_REGENERATION_ATTEMPTS};

use crate::providers::CompletionConfig;

/// Upper bound on the configurable attempt budget.
pub const MAX_CONFIGURABLE_ATTEMPTS: u32 = 10;

/// Errors from loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for one [`crate::ContentPipeline`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Generator calls allowed per request
    pub max_attempts: u32,

    /// Per-attempt generator timeout; a timeout consumes the attempt
    #[serde(with = "duration_str")]
    pub attempt_timeout: Duration,

    /// Timeout for config loads and log writes
    #[serde(with = "duration_str")]
    pub store_timeout: Duration,

    /// Agent name recorded on log entries
    pub agent: String,

    /// Extra tries for a failed audit write
    pub audit_retries: usize,

    /// Policy used when a brand has none or storage is degraded
    pub default_safety: BrandSafetyConfig,

    pub completion: CompletionConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_REGENERATION_ATTEMPTS,
            attempt_timeout: Duration::from_secs(30),
            store_timeout: Duration::from_secs(5),
            agent: "content".to_string(),
            audit_retries: 2,
            default_safety: BrandSafetyConfig::system_default(),
            completion: CompletionConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse and validate YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.max_attempts > MAX_CONFIGURABLE_ATTEMPTS {
            return Err(ConfigError::Invalid(format!(
                "max_attempts must not exceed {}",
                MAX_CONFIGURABLE_ATTEMPTS
            )));
        }
        if self.attempt_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "attempt_timeout must be greater than zero".to_string(),
            ));
        }
        if self.store_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "store_timeout must be greater than zero".to_string(),
            ));
        }
        if self.agent.trim().is_empty() {
            return Err(ConfigError::Invalid("agent must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }
}

/// Durations as human-readable strings ("30s", "1m 30s").
mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brandgate_core::SafetyMode;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.attempt_timeout, Duration::from_secs(30));
        assert_eq!(config.agent, "content");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = PipelineConfig::from_yaml(
            "max_attempts: 5\nattempt_timeout: 1m 30s\ndefault_safety:\n  safety_mode: relaxed\n",
        )
        .unwrap();

        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.attempt_timeout, Duration::from_secs(90));
        assert_eq!(config.store_timeout, Duration::from_secs(5));
        assert_eq!(config.default_safety.safety_mode, SafetyMode::Relaxed);
        assert!(config.default_safety.banned_phrases.is_empty());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            PipelineConfig::from_yaml("max_attempts: 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PipelineConfig::from_yaml("max_attempts: 11"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PipelineConfig::from_yaml("store_timeout: 0s"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PipelineConfig::from_yaml("attempt_timeout: soon"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_yaml_roundtrip_uses_readable_durations() {
        let yaml = serde_yaml::to_string(&PipelineConfig::default()).unwrap();
        assert!(yaml.contains("attempt_timeout: 30s"));
        assert_eq!(PipelineConfig::from_yaml(&yaml).unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_missing_file() {
        let err = PipelineConfig::from_yaml_file("/nonexistent/pipeline.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
