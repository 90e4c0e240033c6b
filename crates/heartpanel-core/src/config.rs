//! Panel configuration as data.
//!
//! ```toml
//! [service]
//! base_url = "http://127.0.0.1:5000"
//! request_timeout_ms = 15000
//!
//! [storage]
//! key = "heart_inputs_v2"
//! ```
//!
//! Every field has a default equal to the constant the panel shipped with,
//! so `PanelConfig::default()` reproduces the stock behavior and a partial
//! file only overrides what it names.

use std::path::Path;

use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::error::ConfigError;
use crate::storage::DEFAULT_STORAGE_KEY;

/// Download name offered for generated reports.
pub const DEFAULT_REPORT_FILENAME: &str = "heart_report.pdf";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub report: ReportConfig,
}

/// Remote prediction service endpoints and timeouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub predict_path: String,
    pub report_path: String,
    pub connect_timeout_ms: u64,
    /// Total time allowed per request, including the body download.
    pub request_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            predict_path: "/predict".to_string(),
            report_path: "/report".to_string(),
            connect_timeout_ms: 2_000,
            request_timeout_ms: 15_000,
        }
    }
}

impl ServiceConfig {
    #[must_use]
    pub fn predict_url(&self) -> String {
        join_url(&self.base_url, &self.predict_path)
    }

    #[must_use]
    pub fn report_url(&self) -> String {
        join_url(&self.base_url, &self.report_path)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Versioned key of the snapshot slot.
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub filename: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            filename: DEFAULT_REPORT_FILENAME.to_string(),
        }
    }
}

impl PanelConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the panel unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let service = &self.service;
        if service.base_url.trim().is_empty() {
            return Err(ConfigError::invalid("service.base_url is empty"));
        }
        for (field, path) in [
            ("service.predict_path", &service.predict_path),
            ("service.report_path", &service.report_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::invalid(format!(
                    "{field} must start with '/': {path:?}"
                )));
            }
        }
        if service.request_timeout_ms == 0 {
            return Err(ConfigError::invalid("service.request_timeout_ms must be > 0"));
        }
        if self.storage.key.trim().is_empty() {
            return Err(ConfigError::invalid("storage.key is empty"));
        }
        if self.report.filename.trim().is_empty() {
            return Err(ConfigError::invalid("report.filename is empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_constants() {
        let config = PanelConfig::default();
        assert_eq!(config.storage.key, "heart_inputs_v2");
        assert_eq!(config.report.filename, "heart_report.pdf");
        assert_eq!(config.service.predict_url(), "http://127.0.0.1:5000/predict");
        assert_eq!(config.service.report_url(), "http://127.0.0.1:5000/report");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config = PanelConfig::from_toml_str(
            r#"
            [service]
            base_url = "https://risk.example.org/api/"
            request_timeout_ms = 500
            "#,
        )
        .unwrap();
        assert_eq!(
            config.service.predict_url(),
            "https://risk.example.org/api/predict"
        );
        assert_eq!(config.service.request_timeout(), Duration::from_millis(500));
        assert_eq!(config.service.connect_timeout_ms, 2_000);
        assert_eq!(config.storage, StorageConfig::default());
    }

    #[test]
    fn json_config_is_accepted() {
        let config =
            PanelConfig::from_json_str(r#"{"storage": {"key": "heart_inputs_v3"}}"#).unwrap();
        assert_eq!(config.storage.key, "heart_inputs_v3");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = PanelConfig::from_toml_str("[service]\nrequest_timeout_ms = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = PanelConfig::from_toml_str("[service]\npredict_path = \"predict\"\n").unwrap_err();
        assert!(err.to_string().contains("predict_path"));

        let err = PanelConfig::from_toml_str("[storage]\nkey = \"\"\n").unwrap_err();
        assert!(err.to_string().contains("storage.key"));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = PanelConfig::from_toml_str("[service\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heartpanel.toml");
        std::fs::write(&path, "[report]\nfilename = \"risk.pdf\"\n").unwrap();
        let config = PanelConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.report.filename, "risk.pdf");
    }
}
