//! Built-in array filters
//!
//! Both filters select the compared value the same way: for object elements
//! the filter's `$value` path is resolved against the element, any other
//! element is compared as is.

use super::Filter;
use crate::engine::directive::ARG_WHAT;
use crate::engine::TransformContext;
use crate::node::{text_of, Cursor};
use crate::{Error, Result};
use serde_json::Value;

fn selected<'a>(
    args: &Value,
    element: &'a Value,
    ctx: &mut TransformContext<'a>,
) -> Result<Cursor<'a>> {
    if element.is_object() {
        ctx.resolve_value(Some(element), args)
    } else {
        Ok(Some(element))
    }
}

fn what<'v>(args: &'v Value, filter: &str, ctx: &TransformContext<'_>) -> Result<&'v Value> {
    args.get(ARG_WHAT).ok_or_else(|| {
        Error::malformed(ctx.field(), format!("filter '{filter}' requires the $what argument"))
    })
}

/// `contains`: substring test on the text form
pub struct Contains;

impl Filter for Contains {
    fn evaluate<'a>(
        &self,
        args: &Value,
        element: &'a Value,
        ctx: &mut TransformContext<'a>,
    ) -> Result<bool> {
        let needle = text_of(what(args, "contains", ctx)?);
        let haystack = selected(args, element, ctx)?.map(text_of).unwrap_or_default();
        Ok(haystack.contains(&needle))
    }
}

/// `equals`: structural equality test
pub struct Equals;

impl Filter for Equals {
    fn evaluate<'a>(
        &self,
        args: &Value,
        element: &'a Value,
        ctx: &mut TransformContext<'a>,
    ) -> Result<bool> {
        let expected = what(args, "equals", ctx)?;
        Ok(selected(args, element, ctx)? == Some(expected))
    }
}
