//! Runtime values produced by expression evaluation.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value as JsonValue;

use crate::color::Color;

/// A style value at runtime.
///
/// Authored JSON converts into this model; colors are the one kind JSON
/// cannot express directly.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Color(Color),
    Array(Vec<Value>),
    /// Key-value map (BTreeMap for deterministic iteration).
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// The runtime type of this value.
    ///
    /// Arrays report a concrete item type when every element shares one,
    /// and `value` otherwise.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Null => ValueType::Null,
            Self::Bool(_) => ValueType::Boolean,
            Self::Number(_) => ValueType::Number,
            Self::String(_) => ValueType::String,
            Self::Color(_) => ValueType::Color,
            Self::Object(_) => ValueType::Object,
            Self::Array(items) => {
                let item = match items.split_first() {
                    Some((first, rest)) => {
                        let first = first.value_type();
                        if rest.iter().all(|v| v.value_type() == first) {
                            first
                        } else {
                            ValueType::Value
                        }
                    }
                    None => ValueType::Value,
                };
                ValueType::array(item, Some(items.len()))
            }
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<&Color> {
        match self {
            Self::Color(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Convert back to JSON. Colors become `rgba(...)` strings and
    /// non-finite numbers become `null`.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Self::String(s) => JsonValue::String(s.clone()),
            Self::Color(c) => JsonValue::String(c.to_string()),
            Self::Array(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Self::Object(map) => JsonValue::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }
}

/// String form used by `to-string`: `null` is empty, strings are unquoted,
/// collections are JSON.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) if n.is_infinite() => {
                write!(f, "{}Infinity", if *n < 0.0 { "-" } else { "" })
            }
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
            Self::Color(c) => write!(f, "{c}"),
            Self::Array(_) | Self::Object(_) => write_json(f, self),
        }
    }
}

/// Compact JSON with integral numbers printed without a fraction.
fn write_json(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Null => f.write_str("null"),
        Value::Bool(b) => write!(f, "{b}"),
        Value::Number(n) if n.is_finite() => write!(f, "{n}"),
        Value::Number(_) => f.write_str("null"),
        Value::String(s) => write!(f, "{}", JsonValue::from(s.as_str())),
        Value::Color(c) => write!(f, "\"{c}\""),
        Value::Array(items) => {
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write_json(f, item)?;
            }
            f.write_str("]")
        }
        Value::Object(map) => {
            f.write_str("{")?;
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}:", JsonValue::from(key.as_str()))?;
                write_json(f, item)?;
            }
            f.write_str("}")
        }
    }
}

impl From<&JsonValue> for Value {
    fn from(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(*b),
            JsonValue::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(s) => Self::String(s.clone()),
            JsonValue::Array(items) => Self::Array(items.iter().map(Value::from).collect()),
            JsonValue::Object(map) => Self::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Color> for Value {
    fn from(c: Color) -> Self {
        Self::Color(c)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

/// Static type of an expression result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    Null,
    Number,
    String,
    Boolean,
    Color,
    Object,
    /// Any type; resolved at runtime.
    Value,
    Array {
        item: Box<ValueType>,
        length: Option<usize>,
    },
}

impl ValueType {
    pub fn array(item: ValueType, length: Option<usize>) -> Self {
        Self::Array {
            item: Box::new(item),
            length,
        }
    }

    /// Whether a result of type `actual` satisfies this expected type.
    pub fn accepts(&self, actual: &ValueType) -> bool {
        match (self, actual) {
            (Self::Value, _) => true,
            (
                Self::Array { item, length },
                Self::Array {
                    item: actual_item,
                    length: actual_length,
                },
            ) => item.accepts(actual_item) && (length.is_none() || length == actual_length),
            (expected, actual) => expected == actual,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Number => f.write_str("number"),
            Self::String => f.write_str("string"),
            Self::Boolean => f.write_str("boolean"),
            Self::Color => f.write_str("color"),
            Self::Object => f.write_str("object"),
            Self::Value => f.write_str("value"),
            Self::Array { item, length } => match length {
                Some(n) => write!(f, "array<{item}, {n}>"),
                None if **item == Self::Value => f.write_str("array"),
                None => write!(f, "array<{item}>"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_preserves_structure() {
        let value = Value::from(&json!({"a": [1, "x", null], "b": true}));
        let Value::Object(map) = value else {
            panic!("expected object");
        };
        assert_eq!(
            map["a"],
            Value::Array(vec![Value::Number(1.0), Value::from("x"), Value::Null])
        );
        assert_eq!(map["b"], Value::Bool(true));
    }

    #[test]
    fn test_array_type_inference() {
        let numbers = Value::from(&json!([1, 2, 3]));
        assert_eq!(numbers.value_type(), ValueType::array(ValueType::Number, Some(3)));

        let mixed = Value::from(&json!([1, "a"]));
        assert_eq!(mixed.value_type(), ValueType::array(ValueType::Value, Some(2)));
    }

    #[test]
    fn test_accepts_handles_value_and_arrays() {
        assert!(ValueType::Value.accepts(&ValueType::Color));
        assert!(!ValueType::Number.accepts(&ValueType::String));

        let any_array = ValueType::array(ValueType::Value, None);
        let triple = ValueType::array(ValueType::Number, Some(3));
        assert!(any_array.accepts(&triple));
        assert!(ValueType::array(ValueType::Number, Some(3)).accepts(&triple));
        assert!(!ValueType::array(ValueType::Number, Some(2)).accepts(&triple));
        assert!(!ValueType::array(ValueType::String, None).accepts(&triple));
    }

    #[test]
    fn test_display_matches_to_string_semantics() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(f64::NEG_INFINITY).to_string(), "-Infinity");
        assert_eq!(Value::from("abc").to_string(), "abc");
        assert_eq!(Value::from(&json!([1, 2])).to_string(), "[1,2]");
        assert_eq!(
            Value::from(&json!({"b": [0.5, null], "a": "x"})).to_string(),
            r#"{"a":"x","b":[0.5,null]}"#
        );
    }

    #[test]
    fn test_type_display() {
        assert_eq!(ValueType::array(ValueType::Value, None).to_string(), "array");
        assert_eq!(
            ValueType::array(ValueType::Number, Some(2)).to_string(),
            "array<number, 2>"
        );
    }
}
