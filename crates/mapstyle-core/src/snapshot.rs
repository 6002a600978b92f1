//! Key-order-stable JSON serialization for change detection.

use std::fmt;

use serde_json::Value as JsonValue;

/// Serialize `value` as compact JSON with object keys sorted.
///
/// Two values produce the same string exactly when they are deep-equal,
/// regardless of the order their object keys were written in.
pub fn canonical_json(value: &JsonValue) -> String {
    Canonical(value).to_string()
}

struct Canonical<'a>(&'a JsonValue);

impl fmt::Display for Canonical<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            JsonValue::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", Canonical(item))?;
                }
                f.write_str("]")
            }
            JsonValue::Object(map) => {
                let mut entries: Vec<_> = map.iter().collect();
                entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));

                f.write_str("{")?;
                for (i, (key, value)) in entries.into_iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    // String display applies JSON escaping.
                    write!(f, "{}:{}", JsonValue::from(key.as_str()), Canonical(value))?;
                }
                f.write_str("}")
            }
            scalar => write!(f, "{scalar}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars_and_arrays() {
        assert_eq!(canonical_json(&json!(null)), "null");
        assert_eq!(canonical_json(&json!("a\"b")), r#""a\"b""#);
        assert_eq!(canonical_json(&json!([1, 2.5, true])), "[1,2.5,true]");
    }

    #[test]
    fn test_object_keys_sorted_recursively() {
        let value = json!({"stops": [[0, 1]], "base": 2, "nested": {"z": 1, "a": [{"y": 0, "b": 1}]}});
        assert_eq!(
            canonical_json(&value),
            r#"{"base":2,"nested":{"a":[{"b":1,"y":0}],"z":1},"stops":[[0,1]]}"#
        );
    }

    #[test]
    fn test_key_order_independent() {
        let a: JsonValue = serde_json::from_str(r#"{"b": 1, "a": {"d": 2, "c": 3}}"#).unwrap();
        let b: JsonValue = serde_json::from_str(r#"{"a": {"c": 3, "d": 2}, "b": 1}"#).unwrap();
        assert_eq!(canonical_json(&a), canonical_json(&b));
        assert_ne!(canonical_json(&a), canonical_json(&json!({"a": {"c": 3}, "b": 1})));
    }
}
