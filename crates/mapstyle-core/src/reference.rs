//! Property reference: the table of known style properties and their specs.
//!
//! Loaded from style reference JSON such as
//! `{"line-width": {"type": "number", "minimum": 0, "default": 1}}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::declaration::{DeclarationError, StyleDeclaration};
use crate::snapshot::canonical_json;
use mapstyle_expr::PropertySpec;

#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    #[error("failed to parse property reference: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown style property \"{0}\"")]
    UnknownProperty(String),
    #[error("{property}: invalid value {value}")]
    Declaration {
        property: String,
        /// Canonical JSON of the rejected value.
        value: String,
        #[source]
        source: DeclarationError,
    },
}

/// Property name → specification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyReference {
    properties: BTreeMap<String, PropertySpec>,
}

impl PropertyReference {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, ReferenceError> {
        let reference: Self = serde_json::from_str(json)?;
        tracing::debug!("loaded {} style property specs", reference.len());
        Ok(reference)
    }

    pub fn insert(&mut self, name: impl Into<String>, spec: PropertySpec) {
        self.properties.insert(name.into(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&PropertySpec> {
        self.properties.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Build a declaration for the named property.
    pub fn declare(&self, name: &str, value: &JsonValue) -> Result<StyleDeclaration, ReferenceError> {
        let spec = self
            .get(name)
            .ok_or_else(|| ReferenceError::UnknownProperty(name.to_string()))?;

        StyleDeclaration::new(spec, value).map_err(|source| {
            let value = canonical_json(value);
            tracing::warn!("rejected value {value} for {name}: {source}");
            ReferenceError::Declaration {
                property: name.to_string(),
                value,
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapstyle_expr::{GlobalProperties, PropertyType, Value};
    use serde_json::json;

    const REFERENCE: &str = r##"{
        "line-width": {"type": "number", "minimum": 0, "default": 1, "function": "interpolated"},
        "line-color": {"type": "color", "default": "#000000"},
        "line-cap": {"type": "enum", "default": "butt", "zoom-function": false, "property-function": false}
    }"##;

    #[test]
    fn test_load_reference() {
        let reference = PropertyReference::from_json_str(REFERENCE).unwrap();
        assert_eq!(reference.len(), 3);
        assert_eq!(
            reference.names().collect::<Vec<_>>(),
            vec!["line-cap", "line-color", "line-width"]
        );
        let width = reference.get("line-width").unwrap();
        assert_eq!(width.kind, PropertyType::Number);
        assert_eq!(width.minimum, Some(0.0));
        assert!(!reference.get("line-cap").unwrap().zoom_function);
    }

    #[test]
    fn test_declare_known_property() {
        let reference = PropertyReference::from_json_str(REFERENCE).unwrap();
        let declaration = reference.declare("line-width", &json!(-2)).unwrap();
        assert_eq!(
            declaration.calculate(&GlobalProperties::default(), None).unwrap(),
            Value::Number(0.0)
        );
    }

    #[test]
    fn test_declare_errors() {
        let reference = PropertyReference::from_json_str(REFERENCE).unwrap();
        assert!(matches!(
            reference.declare("fill-color", &json!("red")),
            Err(ReferenceError::UnknownProperty(name)) if name == "fill-color"
        ));

        let err = reference
            .declare("line-cap", &json!({"expression": ["step", ["zoom"], "butt", 10, "round"]}))
            .unwrap_err();
        let ReferenceError::Declaration { property, value, .. } = &err else {
            panic!("expected declaration error, got {err:?}");
        };
        assert_eq!(property, "line-cap");
        assert_eq!(value, r#"{"expression":["step",["zoom"],"butt",10,"round"]}"#);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            PropertyReference::from_json_str("{\"a\": {\"type\": \"bogus\"}}"),
            Err(ReferenceError::Parse(_))
        ));
    }

    #[test]
    fn test_insert() {
        let mut reference = PropertyReference::new();
        assert!(reference.is_empty());
        reference.insert("opacity", PropertySpec::new(PropertyType::Number));
        assert!(reference.declare("opacity", &json!(0.5)).is_ok());
    }
}
