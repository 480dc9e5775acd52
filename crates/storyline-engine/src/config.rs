//! Engine configuration
//!
//! One TOML document with three sections:
//! - `[synthesis]` attempt budget, backoff, deadline
//! - `[validation]` repair limits
//! - `[backend]` HTTP backend connection
//!
//! Every field has a default, so an empty document is a valid config.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use storyline_backend::BackendConfig;
use storyline_core::ValidationConfig;

/// Description used when no event survives normalization
pub const DEFAULT_EMPTY_TIMELINE_DESCRIPTION: &str =
    "No creation events were recorded for this project yet.";

/// Errors raised while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("invalid config {path}: {message}")]
    Parse { path: String, message: String },

    /// A value is out of range
    #[error("invalid value for {field}: {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    fn invalid(field: &str, message: &str) -> Self {
        Self::Invalid {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// Orchestrator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Backend attempts per request, including the first
    pub max_attempts: u32,
    /// Pause before retrying after `Unavailable`
    pub retry_backoff_ms: u64,
    /// Deadline for a single backend call
    pub backend_timeout_secs: u64,
    /// Narrative returned when there is nothing to narrate
    pub empty_timeline_description: String,
}

impl SynthesisConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    #[inline]
    #[must_use]
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            retry_backoff_ms: 500,
            backend_timeout_secs: 30,
            empty_timeline_description: DEFAULT_EMPTY_TIMELINE_DESCRIPTION.to_string(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorylineConfig {
    pub synthesis: SynthesisConfig,
    pub validation: ValidationConfig,
    pub backend: BackendConfig,
}

impl StorylineConfig {
    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// - `ConfigError::Parse` on malformed TOML or mistyped fields
    /// - `ConfigError::Invalid` if a value is out of range
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Self::parse(text, "<string>")
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file cannot be read
    /// - `ConfigError::Parse` on malformed TOML or mistyped fields
    /// - `ConfigError::Invalid` if a value is out of range
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let shown = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: shown.clone(),
            source,
        })?;
        let config = Self::parse(&text, &shown)?;
        tracing::debug!(path = %shown, "configuration loaded");
        Ok(config)
    }

    fn parse(text: &str, path: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// `ConfigError::Invalid` naming the first offending field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.synthesis.max_attempts == 0 {
            return Err(ConfigError::invalid(
                "synthesis.max_attempts",
                "must be at least 1",
            ));
        }
        if self.synthesis.backend_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "synthesis.backend_timeout_secs",
                "must be greater than 0",
            ));
        }
        if self.synthesis.empty_timeline_description.trim().is_empty() {
            return Err(ConfigError::invalid(
                "synthesis.empty_timeline_description",
                "must not be blank",
            ));
        }
        if self.validation.max_description_chars == 0 {
            return Err(ConfigError::invalid(
                "validation.max_description_chars",
                "must be greater than 0",
            ));
        }
        if self.backend.endpoint.trim().is_empty() {
            return Err(ConfigError::invalid("backend.endpoint", "must not be empty"));
        }
        if self.backend.model.trim().is_empty() {
            return Err(ConfigError::invalid("backend.model", "must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.backend.temperature) {
            return Err(ConfigError::invalid(
                "backend.temperature",
                "must be between 0.0 and 2.0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_uses_defaults() {
        let config = StorylineConfig::from_toml_str("").unwrap();
        assert_eq!(config, StorylineConfig::default());
        assert_eq!(config.synthesis.max_attempts, 2);
        assert_eq!(config.synthesis.retry_backoff(), Duration::from_millis(500));
        assert_eq!(config.synthesis.backend_timeout(), Duration::from_secs(30));
        assert_eq!(config.validation.max_description_chars, 500);
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let config = StorylineConfig::from_toml_str(
            r#"
            [synthesis]
            retry_backoff_ms = 50

            [backend]
            model = "local-llama"
            "#,
        )
        .unwrap();

        assert_eq!(config.synthesis.retry_backoff_ms, 50);
        assert_eq!(config.synthesis.max_attempts, 2);
        assert_eq!(config.backend.model, "local-llama");
        assert_eq!(config.backend.endpoint, "https://api.openai.com/v1");
    }

    #[test]
    fn api_key_is_never_read_from_toml() {
        let config = StorylineConfig::from_toml_str(
            r#"
            [backend]
            api_key = "sk-in-file"
            "#,
        )
        .unwrap();
        assert_eq!(config.backend.api_key, None);
    }

    #[test]
    fn out_of_range_values_rejected() {
        let err = StorylineConfig::from_toml_str("[synthesis]\nmax_attempts = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { ref field, .. } if field == "synthesis.max_attempts"
        ));

        let err = StorylineConfig::from_toml_str("[backend]\ntemperature = 3.5").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { ref field, .. } if field == "backend.temperature"
        ));
    }

    #[test]
    fn mistyped_field_is_parse_error() {
        let err =
            StorylineConfig::from_toml_str("[synthesis]\nmax_attempts = \"two\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_reads_file_and_reports_missing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[validation]\nchronology_tolerance_secs = 60").unwrap();

        let config = StorylineConfig::load(file.path()).unwrap();
        assert_eq!(config.validation.chronology_tolerance_secs, 60);

        let err = StorylineConfig::load(Path::new("/nonexistent/storyline.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
