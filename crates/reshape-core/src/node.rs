//! Evaluated values and the missing sentinel
//!
//! Source-tree positions are plain borrows (`Option<&Value>`, where `None`
//! means the path did not resolve). Values computed by expressions are owned
//! [`Node`]s so that functions can build new values without touching the
//! source tree.

use serde_json::Value;

/// A position in the source tree; `None` is the missing sentinel
pub type Cursor<'a> = Option<&'a Value>;

/// An evaluated value, distinguishing "did not resolve" from JSON `null`
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// The path did not resolve
    Missing,
    /// A concrete JSON value
    Value(Value),
}

impl Node {
    /// Whether this is the missing sentinel
    pub fn is_missing(&self) -> bool {
        matches!(self, Node::Missing)
    }

    /// Borrow the JSON value, if present
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Node::Missing => None,
            Node::Value(value) => Some(value),
        }
    }

    /// Convert into a JSON value for the target tree; missing becomes `null`
    pub fn into_value(self) -> Value {
        match self {
            Node::Missing => Value::Null,
            Node::Value(value) => value,
        }
    }

    /// Text form of the value (see [`text_of`]); missing is the empty string
    pub fn text(&self) -> String {
        self.as_value().map(text_of).unwrap_or_default()
    }

    /// Numeric view of the value, if it is a JSON number
    pub fn as_f64(&self) -> Option<f64> {
        self.as_value().and_then(Value::as_f64)
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        Node::Value(value)
    }
}

impl From<Cursor<'_>> for Node {
    fn from(cursor: Cursor<'_>) -> Self {
        match cursor {
            Some(value) => Node::Value(value.clone()),
            None => Node::Missing,
        }
    }
}

/// Text form of a value: strings unquoted, scalars as JSON text, containers empty
pub fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(_) | Value::Object(_) => String::new(),
    }
}

/// Name of the runtime kind of a value, as used by the `type` constraint
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
