//! Property specifications: the schema fragment describing one style
//! property's type, bounds, and default.
//!
//! Specs deserialize from the style reference JSON, e.g.
//! `{"type": "number", "minimum": 0, "default": 1, "function": "interpolated"}`.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::value::ValueType;

/// Declared value type of a style property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Number,
    String,
    Boolean,
    Color,
    /// A string restricted to a fixed set of values.
    Enum,
    Array,
}

impl PropertyType {
    /// Name as written in the style reference.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Color => "color",
            Self::Enum => "enum",
            Self::Array => "array",
        }
    }

    fn value_type(self) -> ValueType {
        match self {
            Self::Number => ValueType::Number,
            Self::String | Self::Enum => ValueType::String,
            Self::Boolean => ValueType::Boolean,
            Self::Color => ValueType::Color,
            Self::Array => ValueType::array(ValueType::Value, None),
        }
    }
}

/// How a property behaves between zoom stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FunctionKind {
    /// Values blend smoothly between stops.
    Interpolated,
    /// Values jump at each stop.
    PiecewiseConstant,
}

/// Specification of a single style property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PropertySpec {
    #[serde(rename = "type")]
    pub kind: PropertyType,
    /// Lower bound applied to numeric results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionKind>,
    /// Whether zoom-dependent expressions are allowed.
    #[serde(default = "PropertySpec::default_true")]
    pub zoom_function: bool,
    /// Whether feature-dependent expressions are allowed.
    #[serde(default = "PropertySpec::default_true")]
    pub property_function: bool,
    /// Element type for `array` properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<PropertyType>,
    /// Fixed length for `array` properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
}

impl PropertySpec {
    pub fn new(kind: PropertyType) -> Self {
        Self {
            kind,
            minimum: None,
            default: None,
            function: None,
            zoom_function: true,
            property_function: true,
            value: None,
            length: None,
        }
    }

    /// Default for serde deserialization when a capability flag is absent.
    fn default_true() -> bool {
        true
    }

    /// An `array` property with the given element type and optional length.
    pub fn array_of(item: PropertyType, length: Option<usize>) -> Self {
        Self {
            value: Some(item),
            length,
            ..Self::new(PropertyType::Array)
        }
    }

    pub fn with_minimum(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub fn with_default(mut self, default: JsonValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_function(mut self, function: FunctionKind) -> Self {
        self.function = Some(function);
        self
    }

    /// Type that compiled expressions for this property must produce.
    pub fn expected_type(&self) -> ValueType {
        match self.kind {
            PropertyType::Array => ValueType::array(
                self.value.map_or(ValueType::Value, PropertyType::value_type),
                self.length,
            ),
            kind => kind.value_type(),
        }
    }

    /// Whether values of this property blend between stops.
    ///
    /// An explicit `function` wins. Otherwise numbers, colors, and numeric
    /// arrays interpolate and everything else steps.
    pub fn is_interpolated(&self) -> bool {
        match self.function {
            Some(kind) => kind == FunctionKind::Interpolated,
            None => match self.kind {
                PropertyType::Number | PropertyType::Color => true,
                PropertyType::Array => self.value == Some(PropertyType::Number),
                _ => false,
            },
        }
    }
}
