//! Runtime values produced by path evaluation.

use crate::node::TreeValue;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// The result of evaluating a Fusion path.
///
/// `Null` doubles as the lenient "nothing here" result; maps preserve
/// insertion order because they feed back into rendering order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// A short name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }
}

impl From<&TreeValue> for Value {
    fn from(value: &TreeValue) -> Self {
        match value {
            TreeValue::Null => Value::Null,
            TreeValue::Bool(b) => Value::Bool(*b),
            TreeValue::Int(i) => Value::Int(*i),
            TreeValue::Float(f) => Value::Float(*f),
            TreeValue::String(s) => Value::String(s.clone()),
            TreeValue::Strings(items) => {
                Value::List(items.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

impl fmt::Display for Value {
    /// Rendered output text: null renders as nothing, structured values
    /// render as JSON.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => f.write_str(s),
            Value::List(_) | Value::Map(_) => {
                f.write_str(&serde_json::to_string(self).unwrap_or_default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_renders_output_text() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Int(-3).to_string(), "-3");
        assert_eq!(Value::String("hi".into()).to_string(), "hi");
    }

    #[test]
    fn display_renders_structured_values_as_json() {
        let mut entries = IndexMap::new();
        entries.insert("a".to_string(), Value::Int(1));
        entries.insert("b".to_string(), Value::Null);
        let value = Value::Map(entries);
        assert_eq!(value.to_string(), r#"{"a":1,"b":null}"#);
        let list = Value::List(vec![Value::Int(1), Value::String("x".into())]);
        assert_eq!(list.to_string(), r#"[1,"x"]"#);
    }

    #[test]
    fn tree_values_convert() {
        assert_eq!(Value::from(&TreeValue::Null), Value::Null);
        assert_eq!(Value::from(&TreeValue::Int(7)), Value::Int(7));
        assert_eq!(
            Value::from(&TreeValue::Strings(vec!["A".into(), "B".into()])),
            Value::List(vec![Value::String("A".into()), Value::String("B".into())])
        );
    }
}
