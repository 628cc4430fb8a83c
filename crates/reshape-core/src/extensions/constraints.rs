//! Built-in `$constraints`
//!
//! Copyright (c) 2025 Reshape Team
//! Licensed under the Apache-2.0 license

use super::Constraint;
use crate::engine::TransformContext;
use crate::node::{kind_name, Node};
use crate::{Error, Result};
use serde_json::Value;
use std::cmp::Ordering;

pub const LESS_THAN: &str = "less-than";
pub const GREATER_THAN: &str = "greater-than";

const KINDS: [&str; 5] = ["number", "string", "boolean", "object", "array"];

fn violation(constraint: &str, ctx: &TransformContext<'_>) -> Error {
    Error::constraint_violation(ctx.field(), constraint)
}

/// Boolean reading of a flag argument: `true`, `"true"` or a non-zero number
fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

/// `required`: the value must have resolved when the flag is set
pub struct Required;

impl Constraint for Required {
    fn validate(&self, args: &Value, value: &Node, ctx: &mut TransformContext<'_>) -> Result<()> {
        if flag(args) && value.is_missing() {
            return Err(violation("required", ctx));
        }
        Ok(())
    }
}

/// `type`: the value's runtime kind must match
pub struct Type;

impl Constraint for Type {
    fn validate(&self, args: &Value, value: &Node, ctx: &mut TransformContext<'_>) -> Result<()> {
        let expected = args.as_str().map(str::to_ascii_lowercase).unwrap_or_default();
        if !KINDS.contains(&expected.as_str()) {
            return Err(Error::malformed(
                ctx.field(),
                format!("type constraint expects one of {KINDS:?}, found {args}"),
            ));
        }

        match value.as_value() {
            Some(v) if kind_name(v) == expected => Ok(()),
            _ => Err(violation("type", ctx)),
        }
    }
}

/// `values`: the value must structurally equal one of the listed entries
pub struct Values;

impl Constraint for Values {
    fn validate(&self, args: &Value, value: &Node, ctx: &mut TransformContext<'_>) -> Result<()> {
        let allowed = args.as_array().map(Vec::as_slice).unwrap_or_default();
        match value.as_value() {
            Some(v) if allowed.contains(v) => Ok(()),
            _ => Err(violation("values", ctx)),
        }
    }
}

/// `range`: optional `less-than` / `greater-than` bounds
///
/// A bound of a different kind than the value (anything other than
/// number-number or string-string) is not checked.
pub struct Range;

impl Constraint for Range {
    fn validate(&self, args: &Value, value: &Node, ctx: &mut TransformContext<'_>) -> Result<()> {
        let Some(value) = value.as_value() else {
            return Ok(());
        };

        let holds = |bound: &str, wanted: Ordering| {
            args.get(bound)
                .and_then(|limit| compare(value, limit))
                .map_or(true, |ordering| ordering == wanted)
        };

        if holds(LESS_THAN, Ordering::Less) && holds(GREATER_THAN, Ordering::Greater) {
            Ok(())
        } else {
            Err(violation("range", ctx))
        }
    }
}

/// Numeric or lexicographic comparison; `None` for other pairs
pub(crate) fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
