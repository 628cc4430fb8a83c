//! Path resolution against the source tree
//!
//! Paths are pipe-separated segments evaluated left to right from the current
//! source node:
//!
//! - `..` moves to the parent, relative to the last concrete jump
//! - an empty segment (in paths of two or more segments) jumps to the root
//! - an integer selects an array element; out of range yields the missing sentinel
//! - `field=literal` selects the first array element whose field text contains `literal`
//! - anything else is an object field name, after `$i` substitution
//!
//! Every resolved node is pushed onto the ancestor stack. Callers resolve
//! inside a [`super::context::Scope`] so those pushes are unwound with the
//! enclosing directive.
//!
//! Copyright (c) 2025 Reshape Team
//! Licensed under the Apache-2.0 license

use super::context::TransformContext;
use super::directive::{PARENT_PATH, PATH_SEPARATOR};
use crate::node::Cursor;
use crate::{Error, Result};
use serde_json::Value;

impl<'a> TransformContext<'a> {
    /// Resolve `path` starting at `source`, pushing each visited node as an ancestor
    pub fn resolve_path(&mut self, source: Cursor<'a>, path: &str) -> Result<Cursor<'a>> {
        let segments = split_path(path);
        let absolute_allowed = segments.len() > 1;
        let mut result = source;
        let mut parent_index = self.ancestors().len() as isize - 1;

        for raw in &segments {
            if *raw != PARENT_PATH {
                // `..` chains count from the latest concrete jump
                parent_index = self.ancestors().len() as isize - 1;
            }
            let segment = self.substitute_index(raw);

            if segment == PARENT_PATH {
                parent_index -= 1;
                if parent_index >= 0 {
                    result = self.ancestors()[parent_index as usize];
                }
            } else if segment.is_empty() && absolute_allowed {
                result = Some(self.root());
            } else {
                result = match result {
                    Some(Value::Array(elements)) => select_element(result, elements, &segment),
                    Some(Value::Object(fields)) => fields.get(segment.as_str()),
                    other => {
                        if self.config().fail_on_unresolved_path {
                            return Err(Error::PathResolution {
                                path: path.to_string(),
                                message: format!(
                                    "segment '{segment}' cannot be applied to {}",
                                    describe(other)
                                ),
                            });
                        }
                        None
                    }
                };
            }

            self.push_ancestor(result);
        }

        self.push_path(path);
        log::trace!("resolved path '{}' to {}", path, describe(result));
        Ok(result)
    }
}

/// Split on the separator, dropping trailing empty segments
fn split_path(path: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
    if segments.len() > 1 {
        while segments.last().is_some_and(|s| s.is_empty()) {
            segments.pop();
        }
    }
    segments
}

fn select_element<'a>(array: Cursor<'a>, elements: &'a [Value], segment: &str) -> Cursor<'a> {
    if let Ok(index) = segment.parse::<i64>() {
        return usize::try_from(index).ok().and_then(|i| elements.get(i));
    }

    if let Some((field, literal)) = segment.split_once('=') {
        if let Some(found) = elements.iter().find(|element| {
            element
                .get(field)
                .map(crate::node::text_of)
                .unwrap_or_default()
                .contains(literal)
        }) {
            return Some(found);
        }
    }

    // no match leaves the array selected
    array
}

fn describe(cursor: Cursor<'_>) -> &'static str {
    match cursor {
        None => "a missing node",
        Some(value) => crate::node::kind_name(value),
    }
}
