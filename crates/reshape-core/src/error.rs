//! Error types for the Reshape core library
//!
//! Every variant is fatal to the enclosing `transform()` call. Errors raised
//! while a specification field is being produced are wrapped once in
//! [`Error::Transform`], which records the field name and the diagnostic
//! source path at the point of failure.
//!
//! Copyright (c) 2025 Reshape Team
//! Licensed under the Apache-2.0 license

use std::fmt;
use thiserror::Error;
use serde::{Deserialize, Serialize};

/// Main error type for Reshape operations
#[derive(Error, Debug)]
pub enum Error {
    /// A path segment could not be resolved while strict path mode is on
    #[error("Cannot resolve path '{path}': {message}")]
    PathResolution {
        path: String,
        message: String,
    },

    /// A computed value failed one of its `$constraints`
    #[error("Constraint violation [{constraint}] on transform node {field}")]
    ConstraintViolation {
        field: String,
        constraint: String,
    },

    /// A strategy name matched neither a built-in nor a plugin capability
    #[error("Unknown {kind} '{name}': not a built-in and no plugin provides it")]
    UnknownExtension {
        kind: ExtensionKind,
        name: String,
    },

    /// Plugin bundles could not be loaded, or a plugin capability misbehaved
    #[error("Plugin error from '{plugin}': {message}")]
    PluginLoad {
        plugin: String,
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// A directive combination is structurally invalid
    #[error("Malformed transform specification at '{field}': {message}")]
    MalformedSpec {
        field: String,
        message: String,
    },

    /// Failure while producing a specification field, with location context
    #[error("{source} (field '{field}', source path '{path}')")]
    Transform {
        field: String,
        path: String,
        #[source]
        source: Box<Error>,
    },

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// The extension families resolved through the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionKind {
    /// Expression pipeline step
    Function,
    /// Array element predicate
    Filter,
    /// Post-hoc value validation
    Constraint,
    /// Produced array ordering
    Sorter,
}

impl ExtensionKind {
    /// Name of the method a plugin capability of this kind must expose
    pub fn entry_point(self) -> &'static str {
        match self {
            ExtensionKind::Function | ExtensionKind::Filter => "evaluate",
            ExtensionKind::Constraint => "validate",
            ExtensionKind::Sorter => "sort",
        }
    }
}

impl fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionKind::Function => write!(f, "function"),
            ExtensionKind::Filter => write!(f, "filter"),
            ExtensionKind::Constraint => write!(f, "constraint"),
            ExtensionKind::Sorter => write!(f, "sorter"),
        }
    }
}

impl Error {
    /// Create a malformed-specification error
    pub fn malformed(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::MalformedSpec {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a constraint violation for the given output field
    pub fn constraint_violation(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Error::ConstraintViolation {
            field: field.into(),
            constraint: constraint.into(),
        }
    }

    /// Create a plugin error
    pub fn plugin(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Error::PluginLoad {
            plugin: plugin.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a plugin error that keeps its underlying cause
    pub fn plugin_with<E>(plugin: impl Into<String>, message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::PluginLoad {
            plugin: plugin.into(),
            message: message.into(),
            source: Some(anyhow::Error::new(source)),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Error::Configuration {
            message: message.into(),
            source,
        }
    }

    /// Attach field and source path context, unless a deeper frame already did
    pub fn at_path(self, field: &str, path: &str) -> Self {
        match self {
            located @ Error::Transform { .. } => located,
            other => Error::Transform {
                field: field.to_string(),
                path: path.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The underlying error, looking through location wrappers
    pub fn cause(&self) -> &Error {
        match self {
            Error::Transform { source, .. } => source.cause(),
            other => other,
        }
    }
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::constraint_violation("total", "range");
        assert_eq!(err.to_string(), "Constraint violation [range] on transform node total");
    }

    #[test]
    fn test_at_path_wraps_once() {
        let err = Error::malformed("items", "bad structure")
            .at_path("items", "|orders")
            .at_path("root", "");

        match &err {
            Error::Transform { field, path, .. } => {
                assert_eq!(field, "items");
                assert_eq!(path, "|orders");
            }
            other => panic!("expected located error, got {other:?}"),
        }
        assert!(matches!(err.cause(), Error::MalformedSpec { .. }));
        assert!(err.to_string().contains("source path '|orders'"));
    }

    #[test]
    fn test_plugin_error_keeps_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::plugin_with("bundle.lua", "cannot read bundle", io);

        let cause = std::error::Error::source(&err).expect("source kept");
        assert_eq!(cause.to_string(), "gone");
        assert!(std::error::Error::source(&Error::plugin("x", "y")).is_none());
    }

    #[test]
    fn test_extension_kind_entry_points() {
        assert_eq!(ExtensionKind::Function.entry_point(), "evaluate");
        assert_eq!(ExtensionKind::Filter.entry_point(), "evaluate");
        assert_eq!(ExtensionKind::Constraint.entry_point(), "validate");
        assert_eq!(ExtensionKind::Sorter.entry_point(), "sort");
        assert_eq!(ExtensionKind::Sorter.to_string(), "sorter");
    }
}
