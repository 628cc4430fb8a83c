//! Per-call traversal state
//!
//! A [`TransformContext`] is created for every `transform()` call and passed
//! down the recursion explicitly. Frames are opened with [`TransformContext::scope`],
//! which returns a guard that truncates the ancestor and array-index stacks and
//! restores the diagnostic path, field name and current node when dropped, so
//! every push is paired with a pop on early and erroring returns alike.
//!
//! Copyright (c) 2025 Reshape Team
//! Licensed under the Apache-2.0 license

use crate::config::TransformerConfig;
use crate::extensions::ExtensionRegistry;
use crate::node::Cursor;
use serde_json::Value;
use std::ops::{Deref, DerefMut};

/// Traversal state for one `transform()` call
#[derive(Debug, Clone)]
pub struct TransformContext<'a> {
    pub(crate) config: &'a TransformerConfig,
    pub(crate) extensions: &'a ExtensionRegistry,
    root: &'a Value,
    /// Source nodes visited to reach the current position; root is always at 0
    ancestors: Vec<Cursor<'a>>,
    /// One entry per open array iteration, innermost last
    indexes: Vec<i64>,
    /// Pipe-joined diagnostic path of the current position
    path: String,
    /// Specification field currently being produced
    field: String,
    /// Source node expressions are currently evaluated against
    current: Cursor<'a>,
}

impl<'a> TransformContext<'a> {
    pub(crate) fn new(
        config: &'a TransformerConfig,
        extensions: &'a ExtensionRegistry,
        root: &'a Value,
    ) -> Self {
        Self {
            config,
            extensions,
            root,
            ancestors: vec![Some(root)],
            indexes: Vec::new(),
            path: String::new(),
            field: String::new(),
            current: Some(root),
        }
    }

    /// The source document root
    pub fn root(&self) -> &'a Value {
        self.root
    }

    /// The ancestor stack, root first
    pub fn ancestors(&self) -> &[Cursor<'a>] {
        &self.ancestors
    }

    /// The deepest active ancestor
    pub fn parent(&self) -> Cursor<'a> {
        self.ancestors.last().copied().flatten()
    }

    /// Index of the innermost open array iteration
    pub fn array_index(&self) -> Option<i64> {
        self.indexes.last().copied()
    }

    /// All open array indexes, outermost first
    pub fn array_indexes(&self) -> &[i64] {
        &self.indexes
    }

    /// Diagnostic path of the current position
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Name of the specification field being produced
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The current source node
    pub fn current(&self) -> Cursor<'a> {
        self.current
    }

    /// Interpreter configuration in effect
    pub fn config(&self) -> &'a TransformerConfig {
        self.config
    }

    /// Open a frame that is unwound when the returned guard drops
    pub(crate) fn scope(&mut self) -> Scope<'_, 'a> {
        Scope {
            ancestors: self.ancestors.len(),
            indexes: self.indexes.len(),
            path: self.path.len(),
            field: self.field.clone(),
            current: self.current,
            ctx: self,
        }
    }

    pub(crate) fn push_ancestor(&mut self, node: Cursor<'a>) {
        self.ancestors.push(node);
    }

    pub(crate) fn push_path(&mut self, segment: &str) {
        self.path.push('|');
        self.path.push_str(segment);
    }

    pub(crate) fn set_field(&mut self, field: &str) {
        self.field.clear();
        self.field.push_str(field);
    }

    pub(crate) fn set_current(&mut self, current: Cursor<'a>) {
        self.current = current;
    }

    /// Open a new array iteration; its index starts before the first element
    pub(crate) fn open_array(&mut self) {
        self.indexes.push(-1);
    }

    /// Advance the innermost array index to the next produced element
    pub(crate) fn advance_index(&mut self) -> i64 {
        match self.indexes.last_mut() {
            Some(index) => {
                *index += 1;
                *index
            }
            None => -1,
        }
    }

    /// Replace the array-index placeholder with the innermost index, if any array is open
    pub(crate) fn substitute_index(&self, text: &str) -> String {
        match self.array_index() {
            Some(index) if text.contains(super::directive::INDEX_PLACEHOLDER) => {
                text.replace(super::directive::INDEX_PLACEHOLDER, &index.to_string())
            }
            _ => text.to_string(),
        }
    }
}

/// Guard restoring the traversal state captured by [`TransformContext::scope`]
pub(crate) struct Scope<'c, 'a> {
    ctx: &'c mut TransformContext<'a>,
    ancestors: usize,
    indexes: usize,
    path: usize,
    field: String,
    current: Cursor<'a>,
}

impl<'a> Deref for Scope<'_, 'a> {
    type Target = TransformContext<'a>;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}

impl DerefMut for Scope<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx
    }
}

impl Drop for Scope<'_, '_> {
    fn drop(&mut self) {
        self.ctx.ancestors.truncate(self.ancestors);
        self.ctx.indexes.truncate(self.indexes);
        self.ctx.path.truncate(self.path);
        self.ctx.field = std::mem::take(&mut self.field);
        self.ctx.current = self.current;
    }
}
