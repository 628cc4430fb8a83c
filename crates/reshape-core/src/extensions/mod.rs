//! Extension capabilities and two-tier name resolution
//!
//! Functions, filters, constraints and sorters share one contract shape: a
//! trait per kind, looked up by strategy name in the built-in table first
//! and in the [`PluginLoader`] second.
//!
//! Copyright (c) 2025 Reshape Team
//! Licensed under the Apache-2.0 license

pub mod constraints;
pub mod filters;
pub mod functions;
pub mod sorters;

use crate::config::TransformerConfig;
use crate::engine::directive::{canonical_name, plugin_name};
use crate::engine::TransformContext;
use crate::error::ExtensionKind;
use crate::node::Node;
use crate::plugin::PluginLoader;
use crate::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A step of an `$expression` pipeline
pub trait Function: Send + Sync {
    /// Compute a new value from the previous pipeline value
    fn evaluate(&self, args: &Value, value: Node, ctx: &mut TransformContext<'_>) -> Result<Node>;
}

/// An `$include` / `$exclude` predicate over source array elements
pub trait Filter: Send + Sync {
    /// Whether `element` matches the filter described by `args`
    fn evaluate<'a>(
        &self,
        args: &Value,
        element: &'a Value,
        ctx: &mut TransformContext<'a>,
    ) -> Result<bool>;
}

/// A `$constraints` entry
pub trait Constraint: Send + Sync {
    /// Fail with [`crate::Error::ConstraintViolation`] when `value` does not satisfy `args`
    fn validate(&self, args: &Value, value: &Node, ctx: &mut TransformContext<'_>) -> Result<()>;
}

/// A `$sort` strategy over a produced target array
pub trait Sorter: Send + Sync {
    /// Return `items` reordered
    fn sort(
        &self,
        args: &Value,
        items: Vec<Value>,
        ctx: &mut TransformContext<'_>,
    ) -> Result<Vec<Value>>;
}

type Table<T> = HashMap<&'static str, Arc<T>>;

/// Name to capability resolution for every extension kind
pub struct ExtensionRegistry {
    functions: Table<dyn Function>,
    filters: Table<dyn Filter>,
    constraints: Table<dyn Constraint>,
    sorters: Table<dyn Sorter>,
    plugins: PluginLoader,
}

impl ExtensionRegistry {
    /// Create a registry holding the built-ins, with plugins loaded from the configured folder
    pub fn new(config: &TransformerConfig) -> Self {
        let mut functions: Table<dyn Function> = HashMap::new();
        functions.insert("append", Arc::new(functions::Append));
        functions.insert("append-array-index", Arc::new(functions::AppendArrayIndex));
        functions.insert("random-uuid", Arc::new(functions::RandomUuid));
        functions.insert("replace", Arc::new(functions::Replace));
        functions.insert("set", Arc::new(functions::Set));
        functions.insert("sum", Arc::new(functions::Sum));

        let mut filters: Table<dyn Filter> = HashMap::new();
        filters.insert("contains", Arc::new(filters::Contains));
        filters.insert("equals", Arc::new(filters::Equals));

        let mut constraints: Table<dyn Constraint> = HashMap::new();
        constraints.insert("required", Arc::new(constraints::Required));
        constraints.insert("type", Arc::new(constraints::Type));
        constraints.insert("values", Arc::new(constraints::Values));
        constraints.insert("range", Arc::new(constraints::Range));

        let mut sorters: Table<dyn Sorter> = HashMap::new();
        sorters.insert("ascending", Arc::new(sorters::Ascending));
        sorters.insert("descending", Arc::new(sorters::Descending));

        Self {
            functions,
            filters,
            constraints,
            sorters,
            plugins: PluginLoader::new(&config.plugin_folder),
        }
    }

    pub fn function(&self, name: &str) -> Result<Arc<dyn Function>> {
        match builtin(&self.functions, name) {
            Some(function) => Ok(function),
            None => self.plugins.function(plugin_name(name)),
        }
    }

    pub fn filter(&self, name: &str) -> Result<Arc<dyn Filter>> {
        match builtin(&self.filters, name) {
            Some(filter) => Ok(filter),
            None => self.plugins.filter(plugin_name(name)),
        }
    }

    pub fn constraint(&self, name: &str) -> Result<Arc<dyn Constraint>> {
        match builtin(&self.constraints, name) {
            Some(constraint) => Ok(constraint),
            None => self.plugins.constraint(plugin_name(name)),
        }
    }

    pub fn sorter(&self, name: &str) -> Result<Arc<dyn Sorter>> {
        match builtin(&self.sorters, name) {
            Some(sorter) => Ok(sorter),
            None => self.plugins.sorter(plugin_name(name)),
        }
    }

    /// Whether `name` resolves to a built-in of the given kind
    pub fn is_builtin(&self, kind: ExtensionKind, name: &str) -> bool {
        let key = canonical_name(name);
        match kind {
            ExtensionKind::Function => self.functions.contains_key(key.as_str()),
            ExtensionKind::Filter => self.filters.contains_key(key.as_str()),
            ExtensionKind::Constraint => self.constraints.contains_key(key.as_str()),
            ExtensionKind::Sorter => self.sorters.contains_key(key.as_str()),
        }
    }

    /// Names of the built-ins of the given kind, sorted
    pub fn builtin_names(&self, kind: ExtensionKind) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = match kind {
            ExtensionKind::Function => self.functions.keys().copied().collect(),
            ExtensionKind::Filter => self.filters.keys().copied().collect(),
            ExtensionKind::Constraint => self.constraints.keys().copied().collect(),
            ExtensionKind::Sorter => self.sorters.keys().copied().collect(),
        };
        names.sort_unstable();
        names
    }

    /// The plugin fallback
    pub fn plugins(&self) -> &PluginLoader {
        &self.plugins
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("functions", &self.builtin_names(ExtensionKind::Function))
            .field("filters", &self.builtin_names(ExtensionKind::Filter))
            .field("constraints", &self.builtin_names(ExtensionKind::Constraint))
            .field("sorters", &self.builtin_names(ExtensionKind::Sorter))
            .field("plugins", &self.plugins)
            .finish()
    }
}

fn builtin<T: ?Sized>(table: &Table<T>, name: &str) -> Option<Arc<T>> {
    table.get(canonical_name(name).as_str()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_builtin_lookup_is_case_insensitive() {
        let registry = ExtensionRegistry::new(&TransformerConfig::default());
        assert!(registry.function("$APPEND").is_ok());
        assert!(registry.function("Random-UUID").is_ok());
        assert!(registry.filter("$contains").is_ok());
        assert!(registry.constraint("REQUIRED").is_ok());
        assert!(registry.sorter("$descending").is_ok());
        assert!(registry.is_builtin(ExtensionKind::Function, "append_array_index"));
        assert!(!registry.is_builtin(ExtensionKind::Filter, "append"));
    }

    #[test]
    fn test_miss_falls_back_to_plugins() {
        let dir = tempfile::tempdir().unwrap();
        let config = TransformerConfig::default().with_plugin_folder(dir.path());
        let registry = ExtensionRegistry::new(&config);

        // empty plugin folder
        let err = registry.sorter("$shuffle").err().unwrap();
        assert!(matches!(err, Error::PluginLoad { .. }));
    }

    #[test]
    fn test_builtin_names() {
        let registry = ExtensionRegistry::new(&TransformerConfig::default());
        assert_eq!(
            registry.builtin_names(ExtensionKind::Constraint),
            vec!["range", "required", "type", "values"]
        );
    }
}
