//! Configuration loading and validation for promptloom.
//!
//! Loads render settings from `promptloom.toml` (or the file named by
//! `PROMPTLOOM_CONFIG`) with environment variable overrides. Validates all
//! settings before they reach the renderer.

use promptloom_core::ErrorAttachment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `promptloom.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Model id passed to the token estimator
    #[serde(default = "default_model")]
    pub model: String,

    /// Where resolution failures are recorded
    #[serde(default)]
    pub error_attachment: ErrorAttachment,

    /// Characters per token for the heuristic estimator
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: usize,

    /// Fence markers used when rendering Def nodes
    #[serde(default)]
    pub fences: FenceConfig,
}

fn default_model() -> String {
    "gpt-4o".into()
}
fn default_chars_per_token() -> usize {
    4
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FenceConfig {
    #[serde(default = "default_fence")]
    pub default: String,

    #[serde(default = "default_markdown_fence")]
    pub markdown: String,
}

fn default_fence() -> String {
    "```".into()
}
fn default_markdown_fence() -> String {
    "`````".into()
}

impl Default for FenceConfig {
    fn default() -> Self {
        Self {
            default: default_fence(),
            markdown: default_markdown_fence(),
        }
    }
}

impl RenderConfig {
    /// Load configuration from the default location.
    ///
    /// Priority:
    /// 1. `PROMPTLOOM_CONFIG` environment variable (explicit path)
    /// 2. `./promptloom.toml`
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("PROMPTLOOM_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_path());
        let mut config = Self::load_from(&path)?;

        // Allow env var to override the model
        if let Ok(model) = std::env::var("PROMPTLOOM_MODEL") {
            config.model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Path used when `PROMPTLOOM_CONFIG` is unset.
    pub fn default_path() -> PathBuf {
        PathBuf::from("promptloom.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationError("model must not be empty".into()));
        }

        if self.chars_per_token == 0 {
            return Err(ConfigError::ValidationError(
                "chars_per_token must be > 0".into(),
            ));
        }

        if self.fences.default.is_empty() || self.fences.markdown.is_empty() {
            return Err(ConfigError::ValidationError(
                "fence markers must not be empty".into(),
            ));
        }

        if self.fences.default == self.fences.markdown {
            return Err(ConfigError::ValidationError(
                "default and markdown fences must differ".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            error_attachment: ErrorAttachment::default(),
            chars_per_token: default_chars_per_token(),
            fences: FenceConfig::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = RenderConfig::default();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.error_attachment, ErrorAttachment::Leaf);
        assert_eq!(config.fences.default, "```");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = RenderConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: RenderConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn zero_chars_per_token_rejected() {
        let config = RenderConfig {
            chars_per_token: 0,
            ..RenderConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn identical_fences_rejected() {
        let config = RenderConfig {
            fences: FenceConfig {
                default: "~~~".into(),
                markdown: "~~~".into(),
            },
            ..RenderConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = RenderConfig::load_from(Path::new("/nonexistent/promptloom.toml"));
        assert_eq!(result.unwrap(), RenderConfig::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("promptloom.toml");
        std::fs::write(&path, "model = \"claude\"\nerror_attachment = \"root\"\n").unwrap();

        let config = RenderConfig::load_from(&path).unwrap();
        assert_eq!(config.model, "claude");
        assert_eq!(config.error_attachment, ErrorAttachment::Root);
        assert_eq!(config.chars_per_token, 4);
        assert_eq!(config.fences, FenceConfig::default());
    }

    #[test]
    fn invalid_file_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("promptloom.toml");
        std::fs::write(&path, "chars_per_token = \"many\"").unwrap();

        let err = RenderConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn invalid_values_in_file_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("promptloom.toml");
        std::fs::write(&path, "[fences]\ndefault = \"\"\n").unwrap();

        let err = RenderConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = RenderConfig::default_toml();
        assert!(toml_str.contains("gpt-4o"));
        assert!(toml_str.contains("leaf"));
    }

    #[test]
    fn config_serializes_to_json() {
        let json = serde_json::to_value(RenderConfig::default()).unwrap();
        assert_eq!(json["error_attachment"], "leaf");
        assert_eq!(json["fences"]["markdown"], "`````");
    }
}
