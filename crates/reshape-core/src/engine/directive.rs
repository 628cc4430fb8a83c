//! Reserved directive keys and specification node classification
//!
//! A specification object field is classified once into a [`SpecNode`]
//! before dispatch, instead of probing for directive keys at every call site.
//!
//! Copyright (c) 2025 Reshape Team
//! Licensed under the Apache-2.0 license

use crate::error::ExtensionKind;
use crate::{Error, Result};
use serde_json::{Map, Value};

pub const COMMENT: &str = "$comment";
pub const PATH: &str = "$path";
pub const VALUE: &str = "$value";
pub const STRUCTURE: &str = "$structure";
pub const APPEND: &str = "$append";
pub const INCLUDE: &str = "$include";
pub const EXCLUDE: &str = "$exclude";
pub const OPERATOR: &str = "$op";
pub const EXPRESSION: &str = "$expression";
pub const INDEX_PLACEHOLDER: &str = "$i";
pub const CONSTRAINTS: &str = "$constraints";
pub const SORT: &str = "$sort";

/// Argument keys used by built-in strategies
pub const ARG_WHAT: &str = "$what";
pub const ARG_WITH: &str = "$with";
pub const ARG_BY: &str = "$by";

pub const SIGIL: char = '$';
pub const PATH_SEPARATOR: char = '|';
pub const SELF_PATH: &str = ".";
pub const PARENT_PATH: &str = "..";

/// Directive keys that never produce an output field of their own
const RESERVED: [&str; 12] = [
    COMMENT,
    PATH,
    VALUE,
    STRUCTURE,
    APPEND,
    INCLUDE,
    EXCLUDE,
    OPERATOR,
    EXPRESSION,
    INDEX_PLACEHOLDER,
    CONSTRAINTS,
    SORT,
];

/// The role of one field of a specification object
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpecNode<'s> {
    /// `$comment`, skipped entirely
    Comment,
    /// Leaf carrying `$value` and/or `$expression`
    Value(&'s Value),
    /// Sub-mapping driven by `$structure`
    Structure {
        directive: &'s Map<String, Value>,
        template: &'s Value,
    },
    /// Plain object recursed into a fresh child object
    PlainObject(&'s Map<String, Value>),
    /// Plain array mapped through the array processor
    PlainArray(&'s Value),
    /// Scalar copied verbatim
    Literal(&'s Value),
    /// Any other shape; produces nothing
    Ignored,
}

impl<'s> SpecNode<'s> {
    /// Classify the field `key` whose specification value is `value`
    pub fn classify(key: &str, value: &'s Value) -> Result<Self> {
        if key.eq_ignore_ascii_case(COMMENT) {
            return Ok(SpecNode::Comment);
        }
        if is_reserved(key) {
            return Ok(SpecNode::Ignored);
        }

        Ok(match value {
            Value::Object(_) if is_value_directive(value) => SpecNode::Value(value),
            Value::Object(map) => match map.get(STRUCTURE) {
                Some(template @ (Value::Object(_) | Value::Array(_))) => SpecNode::Structure {
                    directive: map,
                    template,
                },
                Some(_) => {
                    return Err(Error::malformed(
                        key,
                        "$structure must be an object or an array",
                    ))
                }
                None => SpecNode::PlainObject(map),
            },
            Value::Array(_) => SpecNode::PlainArray(value),
            _ if key.starts_with(SIGIL) => SpecNode::Ignored,
            _ => SpecNode::Literal(value),
        })
    }
}

/// Whether `value` is an object carrying `$value` or `$expression`
pub fn is_value_directive(value: &Value) -> bool {
    value.get(VALUE).is_some() || value.get(EXPRESSION).is_some()
}

/// Whether `key` is one of the reserved directive keys
pub fn is_reserved(key: &str) -> bool {
    RESERVED.iter().any(|reserved| reserved.eq_ignore_ascii_case(key))
}

/// Split a single-key strategy entry such as `{"sum": {...}}` into name and arguments
pub fn single_entry<'s>(entry: &'s Value, directive: &str) -> Result<(&'s str, &'s Value)> {
    entry
        .as_object()
        .and_then(|map| map.iter().next())
        .map(|(name, args)| (name.as_str(), args))
        .ok_or_else(|| {
            Error::malformed(
                directive,
                format!("expected a single-key object naming a strategy, found {entry}"),
            )
        })
}

/// Canonical built-in lookup key: leading sigil dropped, lowercase, `_` read as `-`
pub fn canonical_name(name: &str) -> String {
    plugin_name(name).to_ascii_lowercase().replace('_', "-")
}

/// Plugin identifier for a strategy name: the name without its leading sigil
pub fn plugin_name(name: &str) -> &str {
    name.strip_prefix(SIGIL).unwrap_or(name)
}

/// Every strategy name a specification refers to, in first-use order, without duplicates
///
/// Only the shape of the specification is inspected; nothing is resolved.
pub fn extension_references(spec: &Value) -> Vec<(ExtensionKind, String)> {
    let mut found = Vec::new();
    collect_references(spec, &mut found);
    found
}

fn collect_references(node: &Value, found: &mut Vec<(ExtensionKind, String)>) {
    let mut record = |kind: ExtensionKind, entry: &Value| {
        if let Some(name) = entry.as_object().and_then(|m| m.keys().next()) {
            let reference = (kind, name.clone());
            if !found.contains(&reference) {
                found.push(reference);
            }
        }
    };

    match node {
        Value::Object(map) => {
            for (key, value) in map {
                let kind = match key.to_ascii_lowercase().as_str() {
                    EXPRESSION => Some(ExtensionKind::Function),
                    INCLUDE | EXCLUDE => Some(ExtensionKind::Filter),
                    CONSTRAINTS => Some(ExtensionKind::Constraint),
                    SORT => Some(ExtensionKind::Sorter),
                    _ => None,
                };
                match (kind, value) {
                    (Some(ExtensionKind::Sorter), entry) => record(ExtensionKind::Sorter, entry),
                    (Some(kind), Value::Array(entries)) => {
                        entries.iter().for_each(|entry| record(kind, entry))
                    }
                    _ => {}
                }
            }
            for value in map.values() {
                collect_references(value, found);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_references(item, found)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_shapes() {
        let leaf = json!({"$value": "a"});
        assert_eq!(SpecNode::classify("x", &leaf).unwrap(), SpecNode::Value(&leaf));

        let expr = json!({"$expression": [{"random-uuid": {}}]});
        assert!(matches!(SpecNode::classify("id", &expr).unwrap(), SpecNode::Value(_)));

        let structure = json!({"$path": "items", "$structure": [{}]});
        assert!(matches!(
            SpecNode::classify("items", &structure).unwrap(),
            SpecNode::Structure { .. }
        ));

        let plain = json!({"a": 1});
        assert!(matches!(SpecNode::classify("o", &plain).unwrap(), SpecNode::PlainObject(_)));
        assert!(matches!(SpecNode::classify("l", &json!([1])).unwrap(), SpecNode::PlainArray(_)));
        assert!(matches!(SpecNode::classify("s", &json!("lit")).unwrap(), SpecNode::Literal(_)));
    }

    #[test]
    fn test_classify_directive_keys() {
        assert_eq!(SpecNode::classify("$comment", &json!("hi")).unwrap(), SpecNode::Comment);
        assert_eq!(SpecNode::classify("$COMMENT", &json!({})).unwrap(), SpecNode::Comment);
        assert_eq!(SpecNode::classify("$path", &json!("a|b")).unwrap(), SpecNode::Ignored);
        assert_eq!(SpecNode::classify("$op", &json!({"x": 1})).unwrap(), SpecNode::Ignored);
        assert_eq!(SpecNode::classify("$other", &json!(5)).unwrap(), SpecNode::Ignored);
    }

    #[test]
    fn test_malformed_structure() {
        let err = SpecNode::classify("bad", &json!({"$structure": "text"})).unwrap_err();
        assert!(matches!(err, Error::MalformedSpec { ref field, .. } if field == "bad"));
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!(canonical_name("$APPEND_ARRAY_INDEX"), "append-array-index");
        assert_eq!(canonical_name("Random-UUID"), "random-uuid");
        assert_eq!(plugin_name("$com.acme.Upper"), "com.acme.Upper");
        assert_eq!(plugin_name("upper"), "upper");
    }

    #[test]
    fn test_single_entry() {
        let entry = json!({"sum": {"$what": []}});
        let (name, args) = single_entry(&entry, EXPRESSION).unwrap();
        assert_eq!(name, "sum");
        assert_eq!(args, &json!({"$what": []}));
        assert!(single_entry(&json!({}), EXPRESSION).is_err());
        assert!(single_entry(&json!("sum"), EXPRESSION).is_err());
    }

    #[test]
    fn test_extension_references() {
        let spec = json!({
            "total": {"$expression": [{"sum": {"$what": [{"$value": "a"}]}}, {"$Shout": {}}]},
            "items": {
                "$path": "items",
                "$include": [{"contains": {"$value": "n", "$what": "y"}}],
                "$sort": {"descending": {"$by": {"$value": "n"}}},
                "$structure": [{"n": {"$value": "n", "$constraints": [{"required": true}, {"sum": 1}]}}]
            }
        });
        let refs = extension_references(&spec);
        assert_eq!(
            refs,
            vec![
                (ExtensionKind::Function, "sum".to_string()),
                (ExtensionKind::Function, "$Shout".to_string()),
                (ExtensionKind::Filter, "contains".to_string()),
                (ExtensionKind::Sorter, "descending".to_string()),
                (ExtensionKind::Constraint, "required".to_string()),
                (ExtensionKind::Constraint, "sum".to_string()),
            ]
        );
    }
}
