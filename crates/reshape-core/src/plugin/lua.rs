//! Lua plugin bundles
//!
//! A bundle is a `*.lua` file in the plugin folder that returns a table
//! mapping capability names to tables of methods:
//!
//! ```lua
//! local M = {}
//! M.shout = {
//!   evaluate = function(args, value, ctx) return string.upper(value) end,
//! }
//! return M
//! ```
//!
//! Each bundle runs in its own sandboxed interpreter with only the table,
//! string, math and utf8 libraries opened. JSON crosses the boundary through
//! mlua's serde support: JSON `null` is the global `null` light userdata,
//! arrays carry the array metatable so `[]` stays an array, and the missing
//! sentinel is `nil`.

use crate::engine::TransformContext;
use crate::error::ExtensionKind;
use crate::extensions::{Constraint, Filter, Function, Sorter};
use crate::node::Node;
use crate::{Error, Result};
use mlua::{DeserializeOptions, Lua, LuaOptions, LuaSerdeExt, SerializeOptions, StdLib, Table};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Upper bound on the memory one bundle interpreter may allocate
const MEMORY_LIMIT: usize = 256 * 1024 * 1024;

/// One loaded `*.lua` file and its exported capability table
pub(crate) struct LuaBundle {
    path: PathBuf,
    lua: Lua,
    exports: Table,
}

impl LuaBundle {
    /// Evaluate the bundle at `path`
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let display = path.display().to_string();
        let source = std::fs::read_to_string(path)
            .map_err(|e| Error::plugin_with(&display, "cannot read bundle", e))?;

        let lua = Lua::new_with(
            StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::UTF8,
            LuaOptions::default(),
        )
        .map_err(|e| Error::plugin_with(&display, "cannot create Lua runtime", e))?;
        lua.set_memory_limit(MEMORY_LIMIT)
            .map_err(|e| Error::plugin_with(&display, "cannot limit Lua memory", e))?;
        lua.globals()
            .set("null", lua.null())
            .map_err(|e| Error::plugin_with(&display, "cannot prepare Lua globals", e))?;

        let exports: Table = lua
            .load(source.as_str())
            .set_name(display.as_str())
            .eval()
            .map_err(|e| {
                Error::plugin_with(
                    &display,
                    format!("bundle must return a table of capabilities: {e}"),
                    e,
                )
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            lua,
            exports,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the bundle exports a capability called `name`
    pub(crate) fn exports(&self, name: &str) -> bool {
        self.exports.contains_key(name).unwrap_or(false)
    }

    /// Whether `name` is exported with the entry point `kind` calls
    pub(crate) fn provides(&self, name: &str, kind: ExtensionKind) -> bool {
        self.entry(name, kind).is_ok()
    }

    fn entry(&self, name: &str, kind: ExtensionKind) -> mlua::Result<mlua::Function> {
        let capability: Table = self.exports.get(name)?;
        capability.get(kind.entry_point())
    }
}

/// A capability exported by a Lua bundle, adapted to one extension trait
pub(crate) struct LuaCapability {
    name: String,
    kind: ExtensionKind,
    bundle: Arc<Mutex<LuaBundle>>,
}

impl LuaCapability {
    /// Bind `name` from `bundle`, checking that it exposes the entry point for `kind`
    pub(crate) fn bind(
        bundle: Arc<Mutex<LuaBundle>>,
        kind: ExtensionKind,
        name: &str,
    ) -> Result<Self> {
        {
            let guard = bundle
                .lock()
                .map_err(|_| Error::plugin(name, "Lua bundle lock poisoned"))?;
            guard.entry(name, kind).map_err(|e| {
                Error::plugin_with(
                    name,
                    format!(
                        "{} does not expose a {} '{}' method",
                        guard.path().display(),
                        kind,
                        kind.entry_point()
                    ),
                    e,
                )
            })?;
        }

        Ok(Self {
            name: name.to_string(),
            kind,
            bundle,
        })
    }

    /// Call the entry point with `(first, second, ctx)` and return its result as JSON
    fn call(
        &self,
        first: Option<&Value>,
        second: Option<&Value>,
        ctx: &TransformContext<'_>,
    ) -> Result<Option<Value>> {
        let bundle = self
            .bundle
            .lock()
            .map_err(|_| Error::plugin(&self.name, "Lua bundle lock poisoned"))?;
        let lua = &bundle.lua;

        let outcome = (|| -> mlua::Result<mlua::Value> {
            let entry = bundle.entry(&self.name, self.kind)?;
            let context = lua.create_table()?;
            context.set("field", ctx.field())?;
            context.set("path", ctx.path())?;
            context.set("index", ctx.array_index())?;
            context.set("source", to_lua(lua, ctx.current())?)?;
            entry.call((to_lua(lua, first)?, to_lua(lua, second)?, context))
        })();

        let result = outcome.map_err(|e| {
            Error::plugin_with(
                &self.name,
                format!("{} '{}' failed: {e}", self.kind, self.name),
                e,
            )
        })?;
        from_lua(lua, result).map_err(|e| {
            Error::plugin_with(
                &self.name,
                format!("{} '{}' returned a value that is not JSON: {e}", self.kind, self.name),
                e,
            )
        })
    }
}

impl Function for LuaCapability {
    fn evaluate(&self, args: &Value, value: Node, ctx: &mut TransformContext<'_>) -> Result<Node> {
        Ok(match self.call(Some(args), value.as_value(), ctx)? {
            Some(result) => Node::Value(result),
            None => Node::Missing,
        })
    }
}

impl Filter for LuaCapability {
    fn evaluate<'a>(
        &self,
        args: &Value,
        element: &'a Value,
        ctx: &mut TransformContext<'a>,
    ) -> Result<bool> {
        Ok(match self.call(Some(args), Some(element), ctx)? {
            None | Some(Value::Bool(false)) => false,
            Some(_) => true,
        })
    }
}

impl Constraint for LuaCapability {
    fn validate(&self, args: &Value, value: &Node, ctx: &mut TransformContext<'_>) -> Result<()> {
        match self.call(Some(args), value.as_value(), ctx)? {
            Some(Value::Bool(false)) | Some(Value::String(_)) => {
                Err(Error::constraint_violation(ctx.field(), &self.name))
            }
            _ => Ok(()),
        }
    }
}

impl Sorter for LuaCapability {
    fn sort(
        &self,
        args: &Value,
        items: Vec<Value>,
        ctx: &mut TransformContext<'_>,
    ) -> Result<Vec<Value>> {
        let was_empty = items.is_empty();
        match self.call(Some(&Value::Array(items)), Some(args), ctx)? {
            Some(Value::Array(sorted)) => Ok(sorted),
            // an empty Lua table reads back as an object
            Some(Value::Object(map)) if map.is_empty() && was_empty => Ok(Vec::new()),
            other => Err(Error::plugin(
                &self.name,
                format!("sorter must return an array, got {}", describe(other.as_ref())),
            )),
        }
    }
}

fn describe(value: Option<&Value>) -> &'static str {
    value.map_or("nil", crate::node::kind_name)
}

/// Convert JSON to a Lua value; the missing sentinel becomes `nil`
fn to_lua(lua: &Lua, value: Option<&Value>) -> mlua::Result<mlua::Value> {
    match value {
        Some(value) => lua.to_value_with(
            value,
            SerializeOptions::new()
                .serialize_none_to_null(true)
                .serialize_unit_to_null(true)
                .set_array_metatable(true),
        ),
        None => Ok(mlua::Value::Nil),
    }
}

/// Convert a Lua value back to JSON; `nil` reads as the missing sentinel
fn from_lua(lua: &Lua, value: mlua::Value) -> mlua::Result<Option<Value>> {
    match value {
        mlua::Value::Nil => Ok(None),
        other => lua
            .from_value_with(other, DeserializeOptions::new().deny_recursive_tables(true))
            .map(Some),
    }
}
