//! Configuration management for the CLI
//!
//! This module handles loading and merging configuration from:
//! - Default values
//! - Configuration files (YAML/JSON)
//! - Environment variables
//! - Command-line arguments

use crate::error::{Error, Result};
use reshape_core::TransformerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the plugin folder
pub const ENV_PLUGIN_FOLDER: &str = "RESHAPE_PLUGIN_FOLDER";

/// Environment variable overriding strict path resolution
pub const ENV_FAIL_ON_UNRESOLVED_PATH: &str = "RESHAPE_FAIL_ON_UNRESOLVED_PATH";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Interpreter options
    pub transformer: TransformerConfig,

    /// Output settings
    pub output: OutputConfig,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Emit single-line JSON for target documents
    pub compact: bool,

    /// Use colored output when the terminal supports it
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            compact: false,
            color: true,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read {}: {}", path.display(), e))
        })?;

        let config = if is_properties(path) {
            let transformer = TransformerConfig::from_properties(&content)
                .map_err(|e| Error::config(format!("invalid properties in {}: {}", path.display(), e)))?;
            Config {
                transformer,
                ..Config::default()
            }
        } else if is_yaml(path) {
            serde_yaml::from_str(&content)
                .map_err(|e| Error::config(format!("invalid YAML in {}: {}", path.display(), e)))?
        } else {
            serde_json::from_str(&content)
                .map_err(|e| Error::config(format!("invalid JSON in {}: {}", path.display(), e)))?
        };

        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        for path in Self::default_config_paths() {
            if path.exists() {
                match Self::from_file(&path) {
                    Ok(config) => {
                        tracing::debug!(path = %path.display(), "Loaded configuration");
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Skipping config file");
                    }
                }
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file or default locations
    pub fn load_with_file(file: Option<&Path>) -> Result<Self> {
        if let Some(path) = file {
            Self::from_file(path)
        } else {
            Self::load()
        }
    }

    /// Get default configuration file paths to check
    fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from(".reshape.yaml"),
            PathBuf::from(".reshape.json"),
            PathBuf::from("reshape.yaml"),
            PathBuf::from("reshape.json"),
        ];

        if let Some(config_dir) = dirs::config_dir() {
            let reshape_dir = config_dir.join("reshape");
            paths.push(reshape_dir.join("config.yaml"));
            paths.push(reshape_dir.join("config.json"));
        }

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".reshape.yaml"));
            paths.push(home_dir.join(".reshape.json"));
        }

        paths
    }

    /// Path of the user configuration file for the given extension
    pub fn user_config_path(extension: &str) -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("reshape").join(format!("config.{extension}")))
    }

    /// Path of the project configuration file for the given extension
    pub fn project_config_path(extension: &str) -> PathBuf {
        PathBuf::from(format!(".reshape.{extension}"))
    }

    /// Apply `RESHAPE_*` environment overrides
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides read through `lookup`
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(folder) = lookup(ENV_PLUGIN_FOLDER) {
            self.transformer.plugin_folder = PathBuf::from(folder);
        }

        if let Some(flag) = lookup(ENV_FAIL_ON_UNRESOLVED_PATH) {
            self.transformer.fail_on_unresolved_path = match flag.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                other => {
                    return Err(Error::config(format!(
                        "{ENV_FAIL_ON_UNRESOLVED_PATH} must be a boolean, got '{other}'"
                    )))
                }
            };
        }

        Ok(())
    }

    /// Apply command-line overrides, which take precedence over everything else
    pub fn apply_cli(&mut self, plugin_folder: Option<&Path>, strict_paths: bool) {
        if let Some(folder) = plugin_folder {
            self.transformer.plugin_folder = folder.to_path_buf();
        }
        if strict_paths {
            self.transformer.fail_on_unresolved_path = true;
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = if is_yaml(path) {
            serde_yaml::to_string(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Whether `path` names a YAML file
pub fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|s| s.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Whether a path names a legacy `key=value` properties file
fn is_properties(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("properties")
}
