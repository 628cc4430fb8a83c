//! Built-in `$expression` functions
//!
//! Copyright (c) 2025 Reshape Team
//! Licensed under the Apache-2.0 license

use super::Function;
use crate::engine::directive::{ARG_WHAT, ARG_WITH};
use crate::engine::TransformContext;
use crate::node::Node;
use crate::{Error, Result};
use serde_json::{Number, Value};

/// Look up a mandatory argument of `function`
fn required<'v>(
    args: &'v Value,
    key: &str,
    function: &str,
    ctx: &TransformContext<'_>,
) -> Result<&'v Value> {
    args.get(key).ok_or_else(|| {
        Error::malformed(
            ctx.field(),
            format!("function '{function}' requires the {key} argument"),
        )
    })
}

/// `append`: concatenate `$what` after the text form of the value
pub struct Append;

impl Function for Append {
    fn evaluate(&self, args: &Value, value: Node, ctx: &mut TransformContext<'_>) -> Result<Node> {
        let what = ctx.argument(required(args, ARG_WHAT, "append", ctx)?)?;
        Ok(Node::Value(Value::String(value.text() + &what.text())))
    }
}

/// `append-array-index`: concatenate the innermost array index after the value
pub struct AppendArrayIndex;

impl Function for AppendArrayIndex {
    fn evaluate(&self, _args: &Value, value: Node, ctx: &mut TransformContext<'_>) -> Result<Node> {
        let index = ctx.array_index().ok_or_else(|| {
            Error::malformed(
                ctx.field(),
                "append-array-index used outside of an array iteration",
            )
        })?;
        Ok(Node::Value(Value::String(format!("{}{index}", value.text()))))
    }
}

/// `random-uuid`: a fresh v4 identifier, ignoring the value
pub struct RandomUuid;

impl Function for RandomUuid {
    fn evaluate(&self, _args: &Value, _value: Node, _ctx: &mut TransformContext<'_>) -> Result<Node> {
        Ok(Node::Value(Value::String(uuid::Uuid::new_v4().to_string())))
    }
}

/// `replace`: replace every occurrence of `$what` with `$with` in the text form
pub struct Replace;

impl Function for Replace {
    fn evaluate(&self, args: &Value, value: Node, ctx: &mut TransformContext<'_>) -> Result<Node> {
        let what = ctx.argument(required(args, ARG_WHAT, "replace", ctx)?)?.text();
        let with = ctx.argument(required(args, ARG_WITH, "replace", ctx)?)?.text();
        Ok(Node::Value(Value::String(value.text().replace(&what, &with))))
    }
}

/// `set`: replace the value with `$what`
pub struct Set;

impl Function for Set {
    fn evaluate(&self, args: &Value, _value: Node, ctx: &mut TransformContext<'_>) -> Result<Node> {
        ctx.argument(required(args, ARG_WHAT, "set", ctx)?)
    }
}

/// `sum`: add the numbers selected by each `$what` entry, plus the value when numeric
pub struct Sum;

impl Function for Sum {
    fn evaluate(&self, args: &Value, value: Node, ctx: &mut TransformContext<'_>) -> Result<Node> {
        let entries = required(args, ARG_WHAT, "sum", ctx)?
            .as_array()
            .ok_or_else(|| Error::malformed(ctx.field(), "sum expects $what to be an array"))?;

        let mut total = Total::default();
        for entry in entries {
            let current = ctx.current();
            if let Some(Value::Number(n)) = ctx.resolve_value(current, entry)? {
                total.add(n);
            }
        }
        if let Some(Value::Number(n)) = value.as_value() {
            total.add(n);
        }

        Ok(Node::Value(total.into_value()))
    }
}

/// Running sum that stays integral while every operand is an integer
#[derive(Default)]
struct Total {
    float: f64,
    integer: Option<i64>,
    fractional: bool,
}

impl Total {
    fn add(&mut self, n: &Number) {
        self.float += n.as_f64().unwrap_or(0.0);
        match n.as_i64() {
            Some(i) if !self.fractional => {
                self.integer = self.integer.unwrap_or(0).checked_add(i);
                if self.integer.is_none() {
                    self.fractional = true;
                }
            }
            _ => self.fractional = true,
        }
    }

    fn into_value(self) -> Value {
        match (self.fractional, self.integer) {
            (false, Some(i)) => Value::from(i),
            (false, None) => Value::from(0),
            _ => Number::from_f64(self.float)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        }
    }
}
