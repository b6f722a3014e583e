//! Application configuration, loaded from camelCase JSON.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::policy::ShortcutPolicy;
use crate::templates::TemplateKind;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub shortcut_policy: ShortcutPolicy,
    pub default_template: TemplateKind,
    pub currency_symbol: String,
    pub payment_terms_days: u32,
    pub log: LogConfig,
    pub themes_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            shortcut_policy: ShortcutPolicy::default(),
            default_template: TemplateKind::Corporate,
            currency_symbol: "₹".to_string(),
            payment_terms_days: 30,
            log: LogConfig::default(),
            themes_dir: None,
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.payment_terms_days == 0 {
            return Err(ConfigError::Invalid("paymentTermsDays must be at least 1".into()));
        }
        if self.currency_symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("currencySymbol must not be empty".into()));
        }
        if !LEVELS.contains(&self.log.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "unknown log level '{}'",
                self.log.level
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{Combo, EventTarget};

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.currency_symbol, "₹");
        assert_eq!(config.payment_terms_days, 30);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("billmaker.json");
        fs::write(
            &path,
            r#"{
                "defaultTemplate": "creative",
                "shortcutPolicy": {"allowedInInputs": ["Escape", "ctrl+p"]},
                "log": {"json": true}
            }"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.default_template, TemplateKind::Creative);
        assert_eq!(config.log.level, "info");
        assert!(config.log.json);
        let print = Combo::parse("Ctrl+P").unwrap();
        assert!(config.shortcut_policy.permits(&print, EventTarget::TextInput, false));
        let save = Combo::parse("Ctrl+S").unwrap();
        assert!(!config.shortcut_policy.permits(&save, EventTarget::TextInput, false));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = AppConfig::load(Path::new("/nonexistent/billmaker.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn bad_combo_is_parse_error() {
        let err = AppConfig::from_json(r#"{"shortcutPolicy": {"allowedInModals": ["Ctrl+"]}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_terms_rejected() {
        let err = AppConfig::from_json(r#"{"paymentTermsDays": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
