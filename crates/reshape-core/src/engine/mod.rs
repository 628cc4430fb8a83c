//! The transform interpreter
//!
//! [`Transformer`] walks a transform specification object field by field and
//! builds the target document, pulling values from the source document
//! through a per-call [`TransformContext`].
//!
//! # Module Organization
//!
//! - [`context`] - traversal state and its scope guard
//! - [`directive`] - reserved keys and specification node classification
//! - `path` - pipe-separated path resolution
//! - `expression` - `$value`, `$expression` and `$constraints`
//! - `array` - array mapping, filters and `$sort`
//!
//! # Example
//!
//! ```
//! use reshape_core::Transformer;
//! use serde_json::json;
//!
//! let transformer = Transformer::default();
//! let source = json!({"a": 1, "b": 2});
//! let spec = json!({
//!     "total": {
//!         "$value": ".",
//!         "$expression": [{"sum": {"$what": [{"$value": "a"}, {"$value": "b"}]}}]
//!     }
//! });
//!
//! let target = transformer.transform(&source, &spec).unwrap();
//! assert_eq!(target, json!({"total": 3}));
//! ```
//!
//! Copyright (c) 2025 Reshape Team
//! Licensed under the Apache-2.0 license

mod array;
pub mod context;
pub mod directive;
mod expression;
mod path;


pub use context::TransformContext;

use crate::config::TransformerConfig;
use crate::extensions::{Constraint, ExtensionRegistry, Filter, Function, Sorter};
use crate::node::{text_of, Cursor};
use crate::{Error, Result};
use directive::{SpecNode, APPEND, PATH};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Declarative JSON-to-JSON transformer
///
/// Traversal state lives in a [`TransformContext`] created per call, so a
/// single instance can serve concurrent `transform` calls. The plugin cache
/// is the only state shared between calls.
#[derive(Debug)]
pub struct Transformer {
    config: TransformerConfig,
    extensions: ExtensionRegistry,
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new(TransformerConfig::default())
    }
}

impl Transformer {
    /// Create a transformer with the given configuration
    pub fn new(config: TransformerConfig) -> Self {
        let extensions = ExtensionRegistry::new(&config);
        Self { config, extensions }
    }

    /// The configuration in effect
    pub fn config(&self) -> &TransformerConfig {
        &self.config
    }

    /// The extension registry used for strategy lookups
    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    /// Register a host function, reachable under `name` when no built-in matches
    pub fn register_function(&self, name: impl Into<String>, function: Arc<dyn Function>) {
        self.extensions.plugins().register_function(name, function);
    }

    /// Register a host filter
    pub fn register_filter(&self, name: impl Into<String>, filter: Arc<dyn Filter>) {
        self.extensions.plugins().register_filter(name, filter);
    }

    /// Register a host constraint
    pub fn register_constraint(&self, name: impl Into<String>, constraint: Arc<dyn Constraint>) {
        self.extensions.plugins().register_constraint(name, constraint);
    }

    /// Register a host sorter
    pub fn register_sorter(&self, name: impl Into<String>, sorter: Arc<dyn Sorter>) {
        self.extensions.plugins().register_sorter(name, sorter);
    }

    /// Transform `source` into a new document described by `spec`
    ///
    /// The first fatal error aborts the call; no partial output is returned.
    pub fn transform(&self, source: &Value, spec: &Value) -> Result<Value> {
        let spec = spec.as_object().ok_or_else(|| {
            Error::malformed("", "transform specification must be a JSON object")
        })?;

        let mut ctx = TransformContext::new(&self.config, &self.extensions, source);
        let mut target = Map::new();
        ctx.transform_object(Some(source), spec, &mut target)?;
        Ok(Value::Object(target))
    }

    /// Transform JSON text, returning pretty-printed JSON text
    pub fn transform_str(&self, source: &str, spec: &str) -> Result<String> {
        let source: Value = serde_json::from_str(source).map_err(|e| Error::Json {
            message: format!("invalid source document: {e}"),
            source: e,
        })?;
        let spec: Value = serde_json::from_str(spec).map_err(|e| Error::Json {
            message: format!("invalid transform specification: {e}"),
            source: e,
        })?;

        let target = self.transform(&source, &spec)?;
        Ok(serde_json::to_string_pretty(&target)?)
    }
}

impl<'a> TransformContext<'a> {
    /// Produce the fields of `spec` into `target`
    ///
    /// A `$path` on the object moves the current source node for all of its
    /// fields; the ancestors it pushed are popped when the object is done.
    pub(crate) fn transform_object(
        &mut self,
        source: Cursor<'a>,
        spec: &Map<String, Value>,
        target: &mut Map<String, Value>,
    ) -> Result<()> {
        let mut scope = self.scope();
        let source = scope.enter_path(source, spec)?;

        log::debug!(
            "transform object at '{}' (field '{}', depth {})",
            scope.path(),
            scope.field(),
            scope.ancestors().len()
        );

        for (key, value) in spec {
            scope.set_field(key);
            scope
                .transform_field(source, key, value, target)
                .map_err(|e| e.at_path(key, scope.path()))?;
        }
        Ok(())
    }

    fn transform_field(
        &mut self,
        source: Cursor<'a>,
        key: &str,
        value: &Value,
        target: &mut Map<String, Value>,
    ) -> Result<()> {
        match SpecNode::classify(key, value)? {
            SpecNode::Comment | SpecNode::Ignored => {}
            SpecNode::Value(spec) => {
                let result = self.evaluate(source, spec)?;
                target.insert(key.to_string(), result.into_value());
            }
            SpecNode::Structure {
                directive,
                template,
            } => self.transform_structure(source, key, directive, template, target)?,
            SpecNode::PlainObject(fields) => {
                let mut child = Map::new();
                self.transform_object(source, fields, &mut child)?;
                target.insert(key.to_string(), Value::Object(child));
            }
            SpecNode::PlainArray(spec) => {
                let template = spec.as_array().map(Vec::as_slice).unwrap_or_default();
                let mut items = Vec::new();
                self.process_array(source, template, None, &mut items)?;
                target.insert(key.to_string(), Value::Array(items));
            }
            SpecNode::Literal(literal) => {
                target.insert(key.to_string(), literal.clone());
            }
        }
        Ok(())
    }

    /// `$structure` sub-mapping, writing into the `$append` sibling when it exists
    fn transform_structure(
        &mut self,
        source: Cursor<'a>,
        key: &str,
        directive: &Map<String, Value>,
        template: &Value,
        target: &mut Map<String, Value>,
    ) -> Result<()> {
        let mut scope = self.scope();
        let source = scope.enter_path(source, directive)?;

        let append = directive.get(APPEND).map(text_of);
        let slot = match append {
            Some(name) if same_shape(target.get(&name), template) => name,
            _ => {
                let fresh = match template {
                    Value::Array(_) => Value::Array(Vec::new()),
                    _ => Value::Object(Map::new()),
                };
                target.insert(key.to_string(), fresh);
                key.to_string()
            }
        };

        match (template, target.get_mut(&slot)) {
            (Value::Object(fields), Some(Value::Object(child))) => {
                scope.transform_object(source, fields, child)
            }
            (Value::Array(elements), Some(Value::Array(items))) => {
                scope.process_array(source, elements, Some(directive), items)
            }
            _ => Err(Error::malformed(key, "$structure must be an object or an array")),
        }
    }

    /// Resolve the `$path` of `spec`, if any, and make the result the current node
    fn enter_path(&mut self, source: Cursor<'a>, spec: &Map<String, Value>) -> Result<Cursor<'a>> {
        let source = match spec.get(PATH) {
            Some(path) => self.resolve_path(source, &text_of(path))?,
            None => source,
        };
        self.set_current(source);
        Ok(source)
    }
}

fn same_shape(existing: Option<&Value>, template: &Value) -> bool {
    matches!(
        (existing, template),
        (Some(Value::Object(_)), Value::Object(_)) | (Some(Value::Array(_)), Value::Array(_))
    )
}
