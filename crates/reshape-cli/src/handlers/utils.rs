//! Shared utilities for command handlers

use crate::config::is_yaml;
use crate::error::{Error, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Read a JSON or YAML document, picking the parser from the file extension
pub fn read_document(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(path)?;

    if is_yaml(path) {
        serde_yaml::from_str(&content).map_err(|e| Error::InvalidFormat {
            path: path.to_path_buf(),
            expected: "YAML".to_string(),
            message: e.to_string(),
        })
    } else {
        serde_json::from_str(&content).map_err(|e| Error::InvalidFormat {
            path: path.to_path_buf(),
            expected: "JSON".to_string(),
            message: e.to_string(),
        })
    }
}

/// Serialize a document for writing to `path`
pub fn render_document(value: &Value, path: &Path, compact: bool) -> Result<String> {
    if is_yaml(path) {
        Ok(serde_yaml::to_string(value)?)
    } else if compact {
        Ok(serde_json::to_string(value)?)
    } else {
        Ok(serde_json::to_string_pretty(value)?)
    }
}
