//! Interpreter configuration
//!
//! Recognized options are the plugin folder and the strict path flag. Both
//! accept their camelCase names as well as the dotted property names used by
//! older deployments (`plugin.folder`, `exception.on.path.resolution`).
//! Those deployments keep their settings in `key=value` properties files,
//! which [`TransformerConfig::from_properties`] reads.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Options controlling a [`crate::Transformer`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransformerConfig {
    /// Directory scanned for plugin bundles
    #[serde(alias = "plugin.folder", alias = "plugin_folder")]
    pub plugin_folder: PathBuf,

    /// Fail instead of yielding the missing sentinel when a path cannot resolve
    #[serde(
        alias = "exception.on.path.resolution",
        alias = "fail_on_unresolved_path"
    )]
    pub fail_on_unresolved_path: bool,
}

impl Default for TransformerConfig {
    fn default() -> Self {
        Self {
            plugin_folder: PathBuf::from("."),
            fail_on_unresolved_path: false,
        }
    }
}

impl TransformerConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the plugin folder
    pub fn with_plugin_folder(mut self, folder: impl AsRef<Path>) -> Self {
        self.plugin_folder = folder.as_ref().to_path_buf();
        self
    }

    /// Enable or disable strict path resolution
    pub fn with_fail_on_unresolved_path(mut self, strict: bool) -> Self {
        self.fail_on_unresolved_path = strict;
        self
    }

    /// Parse `key=value` (or `key: value`) properties text
    ///
    /// Blank lines and lines starting with `#` or `!` are skipped, as are
    /// keys this crate does not use.
    pub fn from_properties(text: &str) -> Result<Self> {
        let mut config = Self::default();
        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let (key, value) = match line.find(['=', ':']) {
                Some(at) => (line[..at].trim(), line[at + 1..].trim()),
                None => (line, ""),
            };

            match key {
                "plugin.folder" | "pluginFolder" => config.plugin_folder = PathBuf::from(value),
                "exception.on.path.resolution" | "failOnUnresolvedPath" => {
                    config.fail_on_unresolved_path =
                        value.to_ascii_lowercase().parse::<bool>().map_err(|e| {
                            Error::configuration(
                                format!("line {}: '{}' expects true or false, got '{}'", number + 1, key, value),
                                Some(e.into()),
                            )
                        })?;
                }
                other => log::debug!("ignoring unknown property '{}'", other),
            }
        }
        Ok(config)
    }

    /// Read a properties file, see [`TransformerConfig::from_properties`]
    pub fn from_properties_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::Io {
            message: format!("cannot read {}", path.display()),
            source: e,
        })?;
        Self::from_properties(&text)
    }
}
