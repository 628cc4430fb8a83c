//! Built-in `$sort` strategies
//!
//! Sort keys are computed once per element by evaluating `$by` against the
//! element. A key that fails to evaluate is logged and compares equal to
//! everything, so one bad element never aborts the transform. The comparator
//! is therefore not a total order, which rules out `slice::sort_by`; a plain
//! stable merge sort is used instead.

use super::constraints::compare;
use super::Sorter;
use crate::engine::directive::ARG_BY;
use crate::engine::TransformContext;
use crate::node::Node;
use crate::{Error, Result};
use serde_json::Value;
use std::cmp::Ordering;

/// `ascending`: non-decreasing by `$by`
pub struct Ascending;

/// `descending`: non-increasing by `$by`
pub struct Descending;

impl Sorter for Ascending {
    fn sort(
        &self,
        args: &Value,
        items: Vec<Value>,
        ctx: &mut TransformContext<'_>,
    ) -> Result<Vec<Value>> {
        sort_by_key(args, items, ctx, false)
    }
}

impl Sorter for Descending {
    fn sort(
        &self,
        args: &Value,
        items: Vec<Value>,
        ctx: &mut TransformContext<'_>,
    ) -> Result<Vec<Value>> {
        sort_by_key(args, items, ctx, true)
    }
}

fn sort_by_key(
    args: &Value,
    items: Vec<Value>,
    ctx: &mut TransformContext<'_>,
    descending: bool,
) -> Result<Vec<Value>> {
    let by = args.get(ARG_BY).ok_or_else(|| {
        Error::malformed(ctx.field(), format!("missing argument {ARG_BY} in sort directive {args}"))
    })?;

    let keys: Vec<Node> = {
        let mut fork: TransformContext<'_> = ctx.clone();
        items
            .iter()
            .map(|item| match fork.evaluate(Some(item), by) {
                Ok(key) => key,
                Err(e) => {
                    log::warn!("sort key evaluation failed, element treated as equal: {}", e);
                    Node::Missing
                }
            })
            .collect()
    };

    let keyed: Vec<(Node, Value)> = keys.into_iter().zip(items).collect();
    let sorted = merge_sort(keyed, &|(a, _): &(Node, Value), (b, _): &(Node, Value)| {
        let ordering = compare_keys(a, b);
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });

    Ok(sorted.into_iter().map(|(_, item)| item).collect())
}

fn compare_keys(a: &Node, b: &Node) -> Ordering {
    match (a.as_value(), b.as_value()) {
        (Some(a), Some(b)) => compare(a, b).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}

/// Stable top-down merge sort that tolerates inconsistent comparators
pub(crate) fn merge_sort<T, F>(mut items: Vec<T>, cmp: &F) -> Vec<T>
where
    F: Fn(&T, &T) -> Ordering,
{
    if items.len() <= 1 {
        return items;
    }

    let right = items.split_off(items.len() / 2);
    let mut left = merge_sort(items, cmp).into_iter().peekable();
    let mut right = merge_sort(right, cmp).into_iter().peekable();

    let mut merged = Vec::with_capacity(left.len() + right.len());
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => cmp(r, l) == Ordering::Less,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        let next = if take_right { right.next() } else { left.next() };
        merged.extend(next);
    }
    merged
}
