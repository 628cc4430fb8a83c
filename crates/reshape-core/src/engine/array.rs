//! Array mapping, filtering and sorting
//!
//! When the source node is an array, every element that passes the
//! `$include` / `$exclude` filters is mapped through the first template
//! element, and the produced array is then reordered by `$sort`. When the
//! source node is anything else, each template element produces one output
//! element against that single node.
//!
//! Copyright (c) 2025 Reshape Team
//! Licensed under the Apache-2.0 license

use super::context::TransformContext;
use super::directive::{self, is_value_directive, EXCLUDE, INCLUDE, SORT};
use crate::node::Cursor;
use crate::Result;
use serde_json::{Map, Value};

impl<'a> TransformContext<'a> {
    /// Map `source` through `template`, appending the produced elements to `target`
    ///
    /// `directive` is the `$structure` object carrying the filter and sort
    /// directives, if any.
    pub(crate) fn process_array(
        &mut self,
        source: Cursor<'a>,
        template: &[Value],
        directive: Option<&Map<String, Value>>,
        target: &mut Vec<Value>,
    ) -> Result<()> {
        let mut scope = self.scope();
        scope.open_array();

        let Some(Value::Array(elements)) = source else {
            return scope.map_template(source, template, target);
        };

        // nothing to map: a template of plain literals is copied as written
        let literal = template.iter().all(is_literal) && (directive.is_none() || !template.is_empty());
        if literal {
            target.extend(template.iter().cloned());
            return Ok(());
        }

        let model = template.first();
        for element in elements {
            if !scope.include_element(element, directive)? {
                continue;
            }
            let index = scope.advance_index();

            let mut frame = scope.scope();
            frame.push_ancestor(Some(element));
            frame.push_path(&index.to_string());
            frame.set_current(Some(element));

            let produced = match model {
                Some(spec) if is_value_directive(spec) => {
                    frame.evaluate(Some(element), spec)?.into_value()
                }
                Some(Value::Object(fields)) => {
                    let mut child = Map::new();
                    frame.transform_object(Some(element), fields, &mut child)?;
                    Value::Object(child)
                }
                Some(other) => {
                    log::debug!(
                        "array model {} under '{}' has no fields, producing an empty object",
                        other,
                        frame.field()
                    );
                    Value::Object(Map::new())
                }
                None => Value::Object(Map::new()),
            };
            target.push(produced);
        }

        if let Some(sort) = directive.and_then(|d| d.get(SORT)) {
            scope.sort_array(sort, target)?;
        }
        Ok(())
    }

    /// Non-array source: every template element yields one output element
    fn map_template(
        &mut self,
        source: Cursor<'a>,
        template: &[Value],
        target: &mut Vec<Value>,
    ) -> Result<()> {
        for spec in template {
            match spec {
                _ if is_value_directive(spec) => {
                    target.push(self.evaluate(source, spec)?.into_value());
                }
                Value::Object(fields) => {
                    let mut child = Map::new();
                    self.transform_object(source, fields, &mut child)?;
                    target.push(Value::Object(child));
                }
                Value::Array(_) => {
                    log::debug!("nested template array under '{}' skipped", self.field());
                }
                literal => target.push(literal.clone()),
            }
        }
        Ok(())
    }

    /// Apply the `$include` and `$exclude` filters of `directive` to one source element
    pub(crate) fn include_element(
        &mut self,
        element: &'a Value,
        directive: Option<&Map<String, Value>>,
    ) -> Result<bool> {
        let included = match directive.and_then(|d| d.get(INCLUDE)) {
            Some(filters) => self.any_filter_matches(filters, element, INCLUDE)?,
            None => true,
        };
        let excluded = match directive.and_then(|d| d.get(EXCLUDE)) {
            Some(filters) => self.any_filter_matches(filters, element, EXCLUDE)?,
            None => false,
        };
        Ok(included && !excluded)
    }

    fn any_filter_matches(
        &mut self,
        filters: &Value,
        element: &'a Value,
        directive_key: &str,
    ) -> Result<bool> {
        let Some(entries) = filters.as_array() else {
            log::debug!("{} under '{}' is not a filter list, ignored", directive_key, self.field());
            return Ok(directive_key == INCLUDE);
        };

        let extensions = self.extensions;
        for entry in entries {
            let (name, args) = directive::single_entry(entry, directive_key)?;
            if extensions.filter(name)?.evaluate(args, element, self)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Reorder the produced `target` array with the `$sort` directive
    pub(crate) fn sort_array(&mut self, sort: &Value, target: &mut Vec<Value>) -> Result<()> {
        let (name, args) = directive::single_entry(sort, SORT)?;
        let sorter = self.extensions.sorter(name)?;
        let items = std::mem::take(target);
        *target = sorter.sort(args, items, self)?;
        Ok(())
    }
}

/// A template element that maps nothing: neither an object, an array nor a directive
fn is_literal(spec: &Value) -> bool {
    !matches!(spec, Value::Object(_) | Value::Array(_))
}
