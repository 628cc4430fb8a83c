//! Error types and handling for the CLI
//!
//! This module provides error types and utilities for handling
//! various failure modes in the CLI application.

use std::io;
use std::path::PathBuf;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for CLI operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error from reshape-core library
    #[error("{0}")]
    Core(#[from] reshape_core::Error),

    /// File not found
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Invalid file format
    #[error("Invalid file format for {}: expected {}: {}", path.display(), expected, message)]
    InvalidFormat {
        path: PathBuf,
        expected: String,
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Extension references that could not be bound
    #[error("{count} extension reference(s) could not be resolved")]
    Unresolved { count: usize },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error with context
    #[error("{message}")]
    Other { message: String },
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a generic error with message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Get the exit code for this error
    ///
    /// Interpreter failures get one code per error kind so scripts can tell
    /// a bad specification from a failed constraint.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io(_) => 1,
            Self::Core(core) => match core.cause() {
                reshape_core::Error::PathResolution { .. } => 20,
                reshape_core::Error::ConstraintViolation { .. } => 21,
                reshape_core::Error::UnknownExtension { .. } => 22,
                reshape_core::Error::PluginLoad { .. } => 23,
                reshape_core::Error::MalformedSpec { .. } => 24,
                _ => 2,
            },
            Self::FileNotFound { .. } => 3,
            Self::InvalidFormat { .. } => 4,
            Self::Config(_) => 5,
            Self::Unresolved { .. } => 6,
            Self::Json(_) => 12,
            Self::Yaml(_) => 13,
            Self::Other { .. } => 99,
        }
    }
}

/// Format an error for display to the user
pub fn format_error(error: &Error, use_color: bool) -> String {
    use colored::Colorize;

    let (headline, location) = match error {
        Error::Core(core) => {
            let location = match core {
                reshape_core::Error::Transform { field, path, .. } => {
                    Some(format!("at field '{field}', source path '{path}'"))
                }
                _ => None,
            };
            (core.cause().to_string(), location)
        }
        other => (other.to_string(), None),
    };

    let mut out = if use_color {
        format!("{} {}", "Error:".red().bold(), headline)
    } else {
        format!("Error: {}", headline)
    };

    if let Some(location) = location {
        out.push('\n');
        if use_color {
            out.push_str(&format!("  {}", location.dimmed()));
        } else {
            out.push_str(&format!("  {location}"));
        }
    }
    out
}
