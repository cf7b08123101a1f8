//! Pipeline configuration
//!
//! Every field defaults to the crate constant, so a config file only needs
//! the values it changes.

use std::path::Path;
use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::types::ConfigError;
use crate::{DEBOUNCE_MS, DEFAULT_CLASSIFIER_ENDPOINT, DEFAULT_REQUEST_NAME, PREVIEW_CHARS};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Classification endpoint (POST)
    pub classifier_endpoint: String,
    /// `name` field sent with every classification request
    pub request_name: String,
    /// Mutation quiet period before extraction
    pub debounce_ms: u64,
    /// Body preview length in characters
    pub preview_chars: usize,
    /// Allow the identity provider to prompt the user
    pub interactive_consent: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            classifier_endpoint: DEFAULT_CLASSIFIER_ENDPOINT.to_string(),
            request_name: DEFAULT_REQUEST_NAME.to_string(),
            debounce_ms: DEBOUNCE_MS,
            preview_chars: PREVIEW_CHARS,
            interactive_consent: true,
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.classifier_endpoint.starts_with("http://")
            || self.classifier_endpoint.starts_with("https://"))
        {
            return Err(ConfigError::Invalid {
                field: "classifier_endpoint",
                detail: format!("expected an http(s) URL, got {:?}", self.classifier_endpoint),
            });
        }
        if self.preview_chars == 0 {
            return Err(ConfigError::Invalid {
                field: "preview_chars",
                detail: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(500));
        assert_eq!(config.preview_chars, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"classifier_endpoint": "http://localhost:8080/predict"}"#).unwrap();
        assert_eq!(config.classifier_endpoint, "http://localhost:8080/predict");
        assert_eq!(config.debounce_ms, DEBOUNCE_MS);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(serde_json::from_str::<PipelineConfig>(r#"{"debounce": 5}"#).is_err());
    }

    #[test]
    fn test_bad_endpoint_rejected() {
        let config = PipelineConfig { classifier_endpoint: "ftp://x".into(), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field: "classifier_endpoint", .. })));
    }

    #[test]
    fn test_missing_file() {
        let err = PipelineConfig::from_json_file("/nonexistent/phishguard.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
