//! Evaluation inputs: global render state and per-feature attributes.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::value::Value;

/// Render-wide properties shared by every feature in a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GlobalProperties {
    /// Current map zoom. `None` when evaluating outside a render pass.
    pub zoom: Option<f64>,
}

impl GlobalProperties {
    pub fn at_zoom(zoom: f64) -> Self {
        Self { zoom: Some(zoom) }
    }
}

/// A single map feature as seen by expressions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feature {
    pub id: Option<Value>,
    /// `Point`, `LineString`, `Polygon`, or `Unknown`.
    pub geometry_type: Option<String>,
    pub properties: BTreeMap<String, Value>,
}

impl Feature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a feature from a JSON object of properties. Non-object input
    /// yields a feature with no properties.
    pub fn from_properties(json: &JsonValue) -> Self {
        let properties = json
            .as_object()
            .map(|map| {
                map.iter()
                    .map(|(key, value)| (key.clone(), Value::from(value)))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            properties,
            ..Self::default()
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_geometry_type(mut self, geometry_type: impl Into<String>) -> Self {
        self.geometry_type = Some(geometry_type.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_properties_converts_json_attributes() {
        let feature = Feature::from_properties(&json!({"name": "Main St", "lanes": 4, "oneway": false}));
        assert_eq!(feature.properties.len(), 3);
        assert_eq!(feature.properties["name"], Value::from("Main St"));
        assert_eq!(feature.properties["lanes"], Value::Number(4.0));
        assert_eq!(feature.properties["oneway"], Value::Bool(false));
        assert_eq!(feature.id, None);
        assert_eq!(feature.geometry_type, None);
    }

    #[test]
    fn test_from_properties_ignores_non_objects() {
        assert!(Feature::from_properties(&json!([1, 2])).properties.is_empty());
        assert!(Feature::from_properties(&json!(null)).properties.is_empty());
    }
}
