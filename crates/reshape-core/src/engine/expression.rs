//! Expression evaluation: `$value`, `$expression` and `$constraints`
//!
//! Copyright (c) 2025 Reshape Team
//! Licensed under the Apache-2.0 license

use super::context::TransformContext;
use super::directive::{self, CONSTRAINTS, EXPRESSION, SELF_PATH, VALUE};
use crate::node::{text_of, Cursor, Node};
use crate::{Error, Result};
use serde_json::Value;

impl<'a> TransformContext<'a> {
    /// Resolve the `$value` selector of `spec` against `source`
    ///
    /// An absent selector or the self path `.` yields `source` itself. Ancestor
    /// frames pushed while resolving are popped before returning.
    pub fn resolve_value(&mut self, source: Cursor<'a>, spec: &Value) -> Result<Cursor<'a>> {
        match spec.get(VALUE) {
            Some(selector) => {
                let path = text_of(selector);
                if path.eq_ignore_ascii_case(SELF_PATH) {
                    Ok(source)
                } else {
                    self.scope().resolve_path(source, &path)
                }
            }
            None => Ok(source),
        }
    }

    /// Evaluate a value directive: base value, function pipeline, then constraints
    pub fn evaluate(&mut self, source: Cursor<'a>, spec: &Value) -> Result<Node> {
        let mut scope = self.scope();
        scope.set_current(source);

        let mut result = Node::from(scope.resolve_value(source, spec)?);

        if let Some(pipeline) = spec.get(EXPRESSION) {
            let steps = pipeline.as_array().ok_or_else(|| {
                Error::malformed(scope.field(), "$expression must be an array of functions")
            })?;
            let extensions = scope.extensions;
            for step in steps {
                let (name, args) = directive::single_entry(step, EXPRESSION)?;
                let function = extensions.function(name)?;
                result = function.evaluate(args, result, &mut scope)?;
            }
        }

        scope.validate(&result, spec)?;
        Ok(result)
    }

    /// Check `value` against every entry of the `$constraints` list of `spec`, in order
    pub fn validate(&mut self, value: &Node, spec: &Value) -> Result<()> {
        let Some(constraints) = spec.get(CONSTRAINTS) else {
            return Ok(());
        };
        let entries = constraints.as_array().ok_or_else(|| {
            Error::malformed(self.field(), "$constraints must be an array of constraints")
        })?;

        let extensions = self.extensions;
        for entry in entries {
            let (name, args) = directive::single_entry(entry, CONSTRAINTS)?;
            extensions.constraint(name)?.validate(args, value, self)?;
        }
        Ok(())
    }

    /// Evaluate a strategy argument
    ///
    /// Containers are evaluated as value directives against the current source
    /// node, strings get the array-index placeholder substituted, and other
    /// scalars are taken literally.
    pub fn argument(&mut self, argument: &Value) -> Result<Node> {
        match argument {
            Value::Object(_) | Value::Array(_) => {
                let current = self.current();
                self.evaluate(current, argument)
            }
            Value::String(text) => Ok(Node::Value(Value::String(self.substitute_index(text)))),
            other => Ok(Node::Value(other.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransformerConfig;
    use crate::extensions::ExtensionRegistry;
    use serde_json::json;

    /// Owns what a context borrows, so tests can hand it their own root
    struct Fixture {
        config: TransformerConfig,
        registry: ExtensionRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            let config = TransformerConfig::default();
            let registry = ExtensionRegistry::new(&config);
            Self { config, registry }
        }

        fn context<'a>(&'a self, root: &'a Value) -> TransformContext<'a> {
            TransformContext::new(&self.config, &self.registry, root)
        }
    }

    #[test]
    fn test_self_value_equals_omitted_value() {
        let root = json!({"a": 1});
        let fixture = Fixture::new();
        let mut ctx = fixture.context(&root);
        let explicit = ctx.evaluate(Some(&root), &json!({"$value": "."})).unwrap();
        let implicit = ctx.evaluate(Some(&root), &json!({"$expression": []})).unwrap();
        assert_eq!(explicit, Node::Value(root.clone()));
        assert_eq!(explicit, implicit);
    }

    #[test]
    fn test_pipeline_threads_results() {
        let root = json!({"first": "Chris", "last": "Smith"});
        let fixture = Fixture::new();
        let mut ctx = fixture.context(&root);
        let spec = json!({
            "$value": "first",
            "$expression": [
                {"replace": {"$what": "Chr", "$with": "Lou"}},
                {"append": {"$what": " "}},
                {"append": {"$what": {"$value": "last"}}}
            ]
        });
        let result = ctx.evaluate(Some(&root), &spec).unwrap();
        assert_eq!(result, Node::Value(json!("Louis Smith")));
    }

    #[test]
    fn test_unresolved_value_propagates_missing() {
        let root = json!({"a": 1});
        let fixture = Fixture::new();
        let mut ctx = fixture.context(&root);
        let result = ctx.evaluate(Some(&root), &json!({"$value": "nope"})).unwrap();
        assert!(result.is_missing());
        assert_eq!(ctx.ancestors().len(), 1);
    }

    #[test]
    fn test_first_failing_constraint_aborts() {
        let root = json!({"v": 5});
        let fixture = Fixture::new();
        let mut ctx = fixture.context(&root);
        ctx.set_field("score");
        let spec = json!({
            "$value": "v",
            "$constraints": [{"type": "number"}, {"range": {"greater-than": 10}}, {"type": "string"}]
        });
        let err = ctx.evaluate(Some(&root), &spec).unwrap_err();
        match err {
            Error::ConstraintViolation { field, constraint } => {
                assert_eq!(field, "score");
                assert_eq!(constraint, "range");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_unknown_function_without_plugins() {
        let root = json!({});
        let dir = tempfile::tempdir().unwrap();
        let config = TransformerConfig::default().with_plugin_folder(dir.path());
        let registry = ExtensionRegistry::new(&config);
        let mut ctx = TransformContext::new(&config, &registry, &root);

        let err = ctx
            .evaluate(Some(&root), &json!({"$expression": [{"shout": {}}]}))
            .unwrap_err();
        assert!(matches!(err, Error::PluginLoad { .. }));
    }

    #[test]
    fn test_malformed_pipeline() {
        let root = json!({});
        let fixture = Fixture::new();
        let mut ctx = fixture.context(&root);
        let err = ctx
            .evaluate(Some(&root), &json!({"$expression": {"append": {}}}))
            .unwrap_err();
        assert!(matches!(err, Error::MalformedSpec { .. }));
    }

    #[test]
    fn test_argument_forms() {
        let root = json!({"name": "x"});
        let fixture = Fixture::new();
        let mut ctx = fixture.context(&root);
        ctx.open_array();
        ctx.advance_index();
        assert_eq!(ctx.argument(&json!("row-$i")).unwrap(), Node::Value(json!("row-0")));
        assert_eq!(ctx.argument(&json!(4)).unwrap(), Node::Value(json!(4)));
        assert_eq!(
            ctx.argument(&json!({"$value": "name"})).unwrap(),
            Node::Value(json!("x"))
        );
    }
}
