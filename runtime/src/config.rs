//! Pipeline configuration.
//!
//! Defaults cover every field, so an empty TOML document is a valid
//! configuration. Environment variables override individual values:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `PIPELINE_IDEMPOTENCY_TTL_SECS` | `idempotency.default_ttl_secs` |
//! | `PIPELINE_IDEMPOTENCY_CONTENT_TYPE` | `idempotency.content_type` |
//! | `PIPELINE_SLOW_THRESHOLD_MS` | `performance.slow_threshold_ms` |
//!
//! # Example
//!
//! ```
//! use request_pipeline_runtime::config::PipelineConfig;
//!
//! # fn main() -> Result<(), request_pipeline_runtime::config::ConfigError> {
//! let config = PipelineConfig::from_toml_str(
//!     r#"
//!     [performance]
//!     slow_threshold_ms = 250
//!     "#,
//! )?;
//!
//! assert_eq!(config.performance.slow_threshold().as_millis(), 250);
//! assert_eq!(config.idempotency.default_ttl().as_secs(), 86_400);
//! # Ok(())
//! # }
//! ```

use request_pipeline_core::ContextConfig;
use request_pipeline_core::wire::CONTENT_TYPE_JSON;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding the idempotency record TTL.
pub const ENV_IDEMPOTENCY_TTL_SECS: &str = "PIPELINE_IDEMPOTENCY_TTL_SECS";
/// Environment variable overriding the idempotency content type.
pub const ENV_IDEMPOTENCY_CONTENT_TYPE: &str = "PIPELINE_IDEMPOTENCY_CONTENT_TYPE";
/// Environment variable overriding the slow-request threshold.
pub const ENV_SLOW_THRESHOLD_MS: &str = "PIPELINE_SLOW_THRESHOLD_MS";

/// Configuration error
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Environment variable holds an unusable value
    #[error("Invalid value for {name}: {value}")]
    InvalidEnvVar {
        /// Variable name
        name: &'static str,
        /// Raw value
        value: String,
    },

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Idempotency behavior configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdempotencyConfig {
    /// Record lifetime when the request does not override it
    pub default_ttl_secs: u64,
    /// Content type stored with each record
    pub content_type: String,
}

impl IdempotencyConfig {
    /// Validate idempotency configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "idempotency.default_ttl_secs must be > 0".to_string(),
            ));
        }
        if self.content_type.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "idempotency.content_type cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Get default TTL as Duration
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 24 * 60 * 60,
            content_type: CONTENT_TYPE_JSON.to_string(),
        }
    }
}

/// Performance behavior configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Requests slower than this are reported as slow
    pub slow_threshold_ms: u64,
}

impl PerformanceConfig {
    /// Validate performance configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slow_threshold_ms == 0 {
            return Err(ConfigError::ValidationError(
                "performance.slow_threshold_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Get slow threshold as Duration
    #[must_use]
    pub const fn slow_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_threshold_ms)
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            slow_threshold_ms: 500,
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Idempotency behavior
    pub idempotency: IdempotencyConfig,
    /// Performance behavior
    pub performance: PerformanceConfig,
    /// Header extraction for [`RequestContext`](request_pipeline_core::RequestContext)
    pub context: ContextConfig,
}

impl PipelineConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns error if the document cannot be parsed or is invalid
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by the process environment.
    ///
    /// # Errors
    ///
    /// Returns error if a variable cannot be parsed or the result is invalid
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, then validate.
    ///
    /// # Errors
    ///
    /// Returns error if a value cannot be parsed or the result is invalid
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_IDEMPOTENCY_TTL_SECS) {
            self.idempotency.default_ttl_secs = parse_u64(ENV_IDEMPOTENCY_TTL_SECS, value)?;
        }
        if let Some(value) = lookup(ENV_IDEMPOTENCY_CONTENT_TYPE) {
            self.idempotency.content_type = value;
        }
        if let Some(value) = lookup(ENV_SLOW_THRESHOLD_MS) {
            self.performance.slow_threshold_ms = parse_u64(ENV_SLOW_THRESHOLD_MS, value)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate all configuration
    ///
    /// # Errors
    ///
    /// Returns error if any configuration is invalid
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.idempotency.validate()?;
        self.performance.validate()?;
        if self.context.correlation_header.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "context.correlation_header cannot be empty".to_string(),
            ));
        }
        if self.context.idempotency_header.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "context.idempotency_header cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_u64(name: &'static str, value: String) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvVar { name, value })
}
