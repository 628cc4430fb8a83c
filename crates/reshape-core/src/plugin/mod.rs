//! Plugin fallback for extension names the built-in tables do not know
//!
//! Two sources feed the loader. Host applications register Rust
//! implementations directly; those are consulted first and never trigger a
//! folder scan. Otherwise the configured plugin folder is scanned once for
//! Lua bundles (see [`lua`]), and each resolved capability is cached by kind
//! and name for the lifetime of the loader.
//!
//! Copyright (c) 2025 Reshape Team
//! Licensed under the Apache-2.0 license

mod lua;

use crate::error::ExtensionKind;
use crate::extensions::{Constraint, Filter, Function, Sorter};
use crate::{Error, Result};
use lua::{LuaBundle, LuaCapability};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const BUNDLE_EXTENSION: &str = "lua";

type Cache<T> = HashMap<String, Arc<T>>;

#[derive(Default)]
struct LoaderState {
    functions: Cache<dyn Function>,
    filters: Cache<dyn Filter>,
    constraints: Cache<dyn Constraint>,
    sorters: Cache<dyn Sorter>,
    /// Bundles found by the folder scan; `None` until a scan succeeds
    bundles: Option<Vec<Arc<Mutex<LuaBundle>>>>,
}

/// Resolves extension names to plugin capabilities
pub struct PluginLoader {
    folder: PathBuf,
    state: Mutex<LoaderState>,
}

impl PluginLoader {
    /// Create a loader over `folder`; nothing is read until the first lookup
    pub fn new(folder: impl AsRef<Path>) -> Self {
        Self {
            folder: folder.as_ref().to_path_buf(),
            state: Mutex::new(LoaderState::default()),
        }
    }

    /// The folder scanned for bundles
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn register_function(&self, name: impl Into<String>, function: Arc<dyn Function>) {
        self.with_state(|state| state.functions.insert(name.into(), function));
    }

    pub fn register_filter(&self, name: impl Into<String>, filter: Arc<dyn Filter>) {
        self.with_state(|state| state.filters.insert(name.into(), filter));
    }

    pub fn register_constraint(&self, name: impl Into<String>, constraint: Arc<dyn Constraint>) {
        self.with_state(|state| state.constraints.insert(name.into(), constraint));
    }

    pub fn register_sorter(&self, name: impl Into<String>, sorter: Arc<dyn Sorter>) {
        self.with_state(|state| state.sorters.insert(name.into(), sorter));
    }

    pub fn function(&self, name: &str) -> Result<Arc<dyn Function>> {
        self.load(ExtensionKind::Function, name, |s| &mut s.functions, |c| {
            Arc::new(c) as Arc<dyn Function>
        })
    }

    pub fn filter(&self, name: &str) -> Result<Arc<dyn Filter>> {
        self.load(ExtensionKind::Filter, name, |s| &mut s.filters, |c| {
            Arc::new(c) as Arc<dyn Filter>
        })
    }

    pub fn constraint(&self, name: &str) -> Result<Arc<dyn Constraint>> {
        self.load(ExtensionKind::Constraint, name, |s| &mut s.constraints, |c| {
            Arc::new(c) as Arc<dyn Constraint>
        })
    }

    pub fn sorter(&self, name: &str) -> Result<Arc<dyn Sorter>> {
        self.load(ExtensionKind::Sorter, name, |s| &mut s.sorters, |c| {
            Arc::new(c) as Arc<dyn Sorter>
        })
    }

    /// Names of the capabilities resolved or registered so far, per kind
    pub fn loaded(&self) -> Vec<(ExtensionKind, String)> {
        let Ok(state) = self.state.lock() else {
            return Vec::new();
        };
        let mut names: Vec<(ExtensionKind, String)> = state
            .functions
            .keys()
            .map(|n| (ExtensionKind::Function, n.clone()))
            .chain(state.filters.keys().map(|n| (ExtensionKind::Filter, n.clone())))
            .chain(state.constraints.keys().map(|n| (ExtensionKind::Constraint, n.clone())))
            .chain(state.sorters.keys().map(|n| (ExtensionKind::Sorter, n.clone())))
            .collect();
        names.sort_by(|a, b| a.1.cmp(&b.1));
        names
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut LoaderState) -> R) -> R {
        match self.state.lock() {
            Ok(mut state) => f(&mut state),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    fn load<T: ?Sized>(
        &self,
        kind: ExtensionKind,
        name: &str,
        cache: fn(&mut LoaderState) -> &mut Cache<T>,
        adapt: fn(LuaCapability) -> Arc<T>,
    ) -> Result<Arc<T>> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| Error::plugin(name, "plugin loader lock poisoned"))?;

        if let Some(unit) = cache(&mut state).get(name) {
            return Ok(Arc::clone(unit));
        }

        if state.bundles.is_none() {
            state.bundles = Some(self.scan()?);
        }
        let bundles = state.bundles.clone().unwrap_or_default();

        // prefer a bundle with the right entry point; otherwise bind the first
        // one that merely exports the name so the missing method is reported
        let bundle = bundles
            .iter()
            .find(|bundle| bundle.lock().map(|b| b.provides(name, kind)).unwrap_or(false))
            .or_else(|| {
                bundles
                    .iter()
                    .find(|bundle| bundle.lock().map(|b| b.exports(name)).unwrap_or(false))
            })
            .cloned()
            .ok_or_else(|| Error::UnknownExtension {
                kind,
                name: name.to_string(),
            })?;

        let unit = adapt(LuaCapability::bind(bundle, kind, name)?);
        cache(&mut state).insert(name.to_string(), Arc::clone(&unit));
        log::debug!("resolved {} '{}' from plugin bundle", kind, name);
        Ok(unit)
    }

    /// Load every bundle in the plugin folder, in file name order
    fn scan(&self) -> Result<Vec<Arc<Mutex<LuaBundle>>>> {
        let folder = self.folder.display().to_string();
        let entries = std::fs::read_dir(&self.folder)
            .map_err(|e| Error::plugin(&folder, format!("cannot read plugin folder: {e}")))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case(BUNDLE_EXTENSION))
            })
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(Error::plugin(&folder, "no plugin bundles found in folder"));
        }

        let bundles = paths
            .iter()
            .map(|path| LuaBundle::load(path).map(|bundle| Arc::new(Mutex::new(bundle))))
            .collect::<Result<Vec<_>>>()?;
        log::info!("loaded {} plugin bundle(s) from {}", bundles.len(), folder);
        Ok(bundles)
    }
}

impl fmt::Debug for PluginLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginLoader")
            .field("folder", &self.folder)
            .field("loaded", &self.loaded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransformerConfig;
    use crate::engine::TransformContext;
    use crate::extensions::ExtensionRegistry;
    use crate::node::Node;
    use serde_json::{json, Value};
    use std::fs;

    const BUNDLE: &str = r#"
        local M = {}

        M.shout = {
            evaluate = function(args, value, ctx)
                return string.upper(value) .. (args.suffix or "")
            end,
        }

        M.even = {
            evaluate = function(args, element, ctx)
                return element % 2 == 0
            end,
        }

        M.positive = {
            validate = function(args, value, ctx)
                if value == nil or value <= 0 then
                    return "must be positive"
                end
                return true
            end,
        }

        M.reverse = {
            sort = function(items, args, ctx)
                local out = {}
                for i = #items, 1, -1 do
                    out[#out + 1] = items[i]
                end
                return out
            end,
        }

        M.where_am_i = {
            evaluate = function(args, value, ctx)
                return ctx.field .. "@" .. tostring(ctx.index)
            end,
        }

        M.broken = {}

        return M
    "#;

    fn plugin_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bundle.lua"), BUNDLE).unwrap();
        dir
    }

    #[test]
    fn test_lua_function() {
        let dir = plugin_dir();
        let config = TransformerConfig::default().with_plugin_folder(dir.path());
        let registry = ExtensionRegistry::new(&config);
        let root = json!({});
        let mut ctx = TransformContext::new(&config, &registry, &root);

        let shout = registry.plugins().function("shout").unwrap();
        let out = shout
            .evaluate(&json!({"suffix": "!"}), Node::Value(json!("hey")), &mut ctx)
            .unwrap();
        assert_eq!(out, Node::Value(json!("HEY!")));
    }

    #[test]
    fn test_lua_filter_constraint_and_sorter() {
        let dir = plugin_dir();
        let config = TransformerConfig::default().with_plugin_folder(dir.path());
        let registry = ExtensionRegistry::new(&config);
        let root = json!({});
        let four = json!(4);
        let mut ctx = TransformContext::new(&config, &registry, &root);
        ctx.set_field("n");

        let even = registry.plugins().filter("even").unwrap();
        assert!(even.evaluate(&json!({}), &four, &mut ctx).unwrap());

        let positive = registry.plugins().constraint("positive").unwrap();
        assert!(positive.validate(&json!(true), &Node::Value(json!(3)), &mut ctx).is_ok());
        let err = positive
            .validate(&json!(true), &Node::Value(json!(-3)), &mut ctx)
            .unwrap_err();
        assert!(matches!(err, Error::ConstraintViolation { ref constraint, .. } if constraint == "positive"));

        let reverse = registry.plugins().sorter("reverse").unwrap();
        let out = reverse
            .sort(&json!({}), vec![json!(1), json!(2), json!(3)], &mut ctx)
            .unwrap();
        assert_eq!(out, vec![json!(3), json!(2), json!(1)]);
        assert!(reverse.sort(&json!({}), Vec::new(), &mut ctx).unwrap().is_empty());
    }

    #[test]
    fn test_context_is_visible_to_lua() {
        let dir = plugin_dir();
        let config = TransformerConfig::default().with_plugin_folder(dir.path());
        let registry = ExtensionRegistry::new(&config);
        let root = json!({});
        let mut ctx = TransformContext::new(&config, &registry, &root);
        ctx.set_field("label");
        ctx.open_array();
        ctx.advance_index();

        let f = registry.plugins().function("where_am_i").unwrap();
        let out = f.evaluate(&json!({}), Node::Missing, &mut ctx).unwrap();
        assert_eq!(out, Node::Value(json!("label@0")));
    }

    #[test]
    fn test_missing_capability_and_method() {
        let dir = plugin_dir();
        let loader = PluginLoader::new(dir.path());

        let err = loader.function("nothing").err().unwrap();
        assert!(matches!(
            err,
            Error::UnknownExtension { kind: ExtensionKind::Function, ref name } if name == "nothing"
        ));

        let err = loader.sorter("broken").err().unwrap();
        assert!(matches!(err, Error::PluginLoad { .. }));

        // a capability of one kind is not usable as another
        assert!(loader.sorter("shout").is_err());
    }

    #[test]
    fn test_empty_or_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "not a bundle").unwrap();
        let err = PluginLoader::new(dir.path()).function("x").err().unwrap();
        assert!(matches!(err, Error::PluginLoad { .. }));

        let err = PluginLoader::new(dir.path().join("absent")).function("x").err().unwrap();
        assert!(matches!(err, Error::PluginLoad { .. }));
    }

    #[test]
    fn test_bundle_that_does_not_return_a_table() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.lua"), "return 42").unwrap();
        let err = PluginLoader::new(dir.path()).function("x").err().unwrap();
        assert!(matches!(err, Error::PluginLoad { .. }));
    }

    #[test]
    fn test_lua_runtime_error_is_plugin_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("boom.lua"),
            "return { boom = { evaluate = function() error('kaboom') end } }",
        )
        .unwrap();
        let config = TransformerConfig::default().with_plugin_folder(dir.path());
        let registry = ExtensionRegistry::new(&config);
        let root = json!({});
        let mut ctx = TransformContext::new(&config, &registry, &root);

        let boom = registry.function("$boom").unwrap();
        let err = boom.evaluate(&Value::Null, Node::Missing, &mut ctx).unwrap_err();
        assert!(matches!(err, Error::PluginLoad { ref message, .. } if message.contains("kaboom")));
    }

    const PASSTHROUGH: &str = r#"
        return {
            same = {
                evaluate = function(args, value, ctx) return value end,
                sort = function(items, args, ctx) return items end,
            },
            is_null = {
                evaluate = function(args, value, ctx) return value == null end,
            },
            cycle = {
                evaluate = function(args, value, ctx)
                    local t = {}
                    t.me = t
                    return t
                end,
            },
        }
    "#;

    fn passthrough_config(dir: &tempfile::TempDir) -> (TransformerConfig, Value) {
        fs::write(dir.path().join("same.lua"), PASSTHROUGH).unwrap();
        (
            TransformerConfig::default().with_plugin_folder(dir.path()),
            json!({}),
        )
    }

    #[test]
    fn test_nulls_and_empty_arrays_cross_the_lua_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let (config, root) = passthrough_config(&dir);
        let registry = ExtensionRegistry::new(&config);
        let mut ctx = TransformContext::new(&config, &registry, &root);

        let same = registry.plugins().function("same").unwrap();
        let value = json!({"a": null, "b": [], "c": [1, null, 3], "d": {}});
        let out = same.evaluate(&json!({}), Node::Value(value.clone()), &mut ctx).unwrap();
        assert_eq!(out, Node::Value(value));

        let sorter = registry.plugins().sorter("same").unwrap();
        let out = sorter
            .sort(&json!({}), vec![json!(1), Value::Null, json!(3)], &mut ctx)
            .unwrap();
        assert_eq!(out, vec![json!(1), Value::Null, json!(3)]);

        let is_null = registry.plugins().function("is_null").unwrap();
        assert_eq!(
            is_null.evaluate(&json!({}), Node::Value(Value::Null), &mut ctx).unwrap(),
            Node::Value(json!(true))
        );
        assert_eq!(
            is_null.evaluate(&json!({}), Node::Missing, &mut ctx).unwrap(),
            Node::Value(json!(false))
        );
    }

    #[test]
    fn test_cyclic_lua_result_is_plugin_error() {
        let dir = tempfile::tempdir().unwrap();
        let (config, root) = passthrough_config(&dir);
        let registry = ExtensionRegistry::new(&config);
        let mut ctx = TransformContext::new(&config, &registry, &root);

        let cycle = registry.plugins().function("cycle").unwrap();
        let err = cycle.evaluate(&json!({}), Node::Missing, &mut ctx).unwrap_err();
        assert!(matches!(err, Error::PluginLoad { ref plugin, source: Some(_), .. } if plugin == "cycle"));
    }

    #[test]
    fn test_lookup_skips_bundles_of_another_kind() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a_functions.lua"),
            "return { order = { evaluate = function(args, value, ctx) return value end } }",
        )
        .unwrap();
        fs::write(
            dir.path().join("b_sorters.lua"),
            "return { order = { sort = function(items, args, ctx) return { items[2], items[1] } end } }",
        )
        .unwrap();
        let config = TransformerConfig::default().with_plugin_folder(dir.path());
        let registry = ExtensionRegistry::new(&config);
        let root = json!({});
        let mut ctx = TransformContext::new(&config, &registry, &root);

        let sorter = registry.plugins().sorter("order").unwrap();
        let out = sorter.sort(&json!({}), vec![json!("x"), json!("y")], &mut ctx).unwrap();
        assert_eq!(out, vec![json!("y"), json!("x")]);
        assert!(registry.plugins().function("order").is_ok());
    }

    #[test]
    fn test_registered_units_skip_the_scan() {
        struct Upper;
        impl Function for Upper {
            fn evaluate(
                &self,
                _args: &Value,
                value: Node,
                _ctx: &mut TransformContext<'_>,
            ) -> Result<Node> {
                Ok(Node::Value(Value::String(value.text().to_uppercase())))
            }
        }

        // folder does not exist, but the scan never happens
        let loader = PluginLoader::new("/nonexistent/reshape/plugins");
        loader.register_function("com.acme.Upper", Arc::new(Upper));
        assert!(loader.function("com.acme.Upper").is_ok());
        assert_eq!(
            loader.loaded(),
            vec![(ExtensionKind::Function, "com.acme.Upper".to_string())]
        );
    }
}
