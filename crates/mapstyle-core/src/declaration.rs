//! Style declarations: one normalized, evaluable property value.
//!
//! Construction classifies the authored value into an [`AuthoredShape`],
//! compiles it into a [`StyleExpression`] and caches it. `calculate` and
//! `interpolation_factor` are pure reads afterwards.

use mapstyle_expr::{
    ColorParseError, CompileError, CreateOptions, EvaluationError, Feature, GlobalProperties,
    PropertySpec, PropertyType, StyleExpression, Value, ZoomCurve, convert_function,
    create_expression, interpolation_factor, is_expression, parse_color,
};
use serde_json::Value as JsonValue;

use crate::snapshot::canonical_json;

/// Failure to build a declaration from an authored value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeclarationError {
    #[error(transparent)]
    Color(#[from] ColorParseError),
    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// How a property value was written by the style author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthoredShape {
    /// A color string on a color property.
    ColorLiteral,
    /// `null`, a scalar, or an array; used as-is.
    ConstantLiteral,
    /// An object with an `expression` field.
    ExpressionAuthored,
    /// Any other object: a legacy stop function.
    LegacyFunction,
}

impl AuthoredShape {
    /// Resolve the shape of `value`. Exactly one shape applies, checked in
    /// declaration order.
    pub fn classify(value: &JsonValue, spec: &PropertySpec) -> Self {
        match value {
            JsonValue::String(_) if spec.kind == PropertyType::Color => Self::ColorLiteral,
            JsonValue::Object(_) if is_expression(value) => Self::ExpressionAuthored,
            JsonValue::Object(_) => Self::LegacyFunction,
            _ => Self::ConstantLiteral,
        }
    }
}

/// An expression that always yields the same value.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantExpression(pub Value);

impl StyleExpression for ConstantExpression {
    fn evaluate(
        &self,
        _globals: &GlobalProperties,
        _feature: Option<&Feature>,
    ) -> Result<Value, EvaluationError> {
        Ok(self.0.clone())
    }

    fn is_feature_constant(&self) -> bool {
        true
    }

    fn is_zoom_constant(&self) -> bool {
        true
    }

    fn zoom_curve(&self) -> Option<&ZoomCurve> {
        None
    }
}

/// Turn an authored property value into an evaluable expression.
pub fn normalize_to_expression(
    value: &JsonValue,
    spec: &PropertySpec,
) -> Result<Box<dyn StyleExpression>, DeclarationError> {
    normalize_shape(AuthoredShape::classify(value, spec), value, spec)
}

fn normalize_shape(
    shape: AuthoredShape,
    value: &JsonValue,
    spec: &PropertySpec,
) -> Result<Box<dyn StyleExpression>, DeclarationError> {
    let expression: Box<dyn StyleExpression> = match shape {
        AuthoredShape::ColorLiteral => {
            let color = parse_color(value.as_str().unwrap_or_default())?;
            Box::new(ConstantExpression(Value::Color(color)))
        }
        AuthoredShape::ConstantLiteral => Box::new(ConstantExpression(Value::from(value))),
        AuthoredShape::ExpressionAuthored => Box::new(create_expression(
            &value["expression"],
            spec,
            CreateOptions::default(),
        )?),
        AuthoredShape::LegacyFunction => {
            let converted = convert_function(value, spec)?;
            let options = CreateOptions {
                default_value: value.get("default").cloned(),
                is_converted_function: true,
            };
            Box::new(create_expression(&converted, spec, options)?)
        }
    };

    tracing::debug!(
        ?shape,
        feature_constant = expression.is_feature_constant(),
        zoom_constant = expression.is_zoom_constant(),
        "normalized style value"
    );
    Ok(expression)
}

/// A single style property value, compiled and ready for evaluation.
#[derive(Debug)]
pub struct StyleDeclaration {
    value: JsonValue,
    is_expression: bool,
    snapshot_key: String,
    minimum: Option<f64>,
    shape: AuthoredShape,
    expression: Box<dyn StyleExpression>,
}

impl StyleDeclaration {
    /// Compile `value` for a property described by `spec`.
    ///
    /// The value is copied; later changes to the caller's JSON do not
    /// affect the declaration.
    pub fn new(spec: &PropertySpec, value: &JsonValue) -> Result<Self, DeclarationError> {
        let value = value.clone();
        let shape = AuthoredShape::classify(&value, spec);
        let expression = normalize_shape(shape, &value, spec)?;

        if spec.minimum.is_some()
            && !matches!(spec.kind, PropertyType::Number | PropertyType::Array)
        {
            tracing::warn!(
                "minimum declared on a {} property; only numeric results are clamped",
                spec.kind.label()
            );
        }

        Ok(Self {
            is_expression: is_expression(&value),
            snapshot_key: canonical_json(&value),
            minimum: spec.minimum,
            shape,
            expression,
            value,
        })
    }

    /// The authored value as supplied at construction.
    pub fn value(&self) -> &JsonValue {
        &self.value
    }

    pub fn is_expression(&self) -> bool {
        self.is_expression
    }

    /// Canonical serialization of the authored value; equal keys mean
    /// deep-equal values.
    pub fn snapshot_key(&self) -> &str {
        &self.snapshot_key
    }

    pub fn minimum(&self) -> Option<f64> {
        self.minimum
    }

    pub fn shape(&self) -> AuthoredShape {
        self.shape
    }

    pub fn expression(&self) -> &dyn StyleExpression {
        self.expression.as_ref()
    }

    pub fn is_zoom_constant(&self) -> bool {
        self.expression.is_zoom_constant()
    }

    pub fn is_feature_constant(&self) -> bool {
        self.expression.is_feature_constant()
    }

    /// Evaluate the property, raising numbers below `minimum` to it.
    pub fn calculate(
        &self,
        globals: &GlobalProperties,
        feature: Option<&Feature>,
    ) -> Result<Value, EvaluationError> {
        let value = self.expression.evaluate(globals, feature)?;
        Ok(match (value, self.minimum) {
            (Value::Number(x), Some(minimum)) if x < minimum => Value::Number(minimum),
            (value, _) => value,
        })
    }

    /// Blend weight of `zoom` between stop labels `lower` and `upper`.
    ///
    /// Always `0` for zoom-constant declarations. Bounds are not checked.
    pub fn interpolation_factor(&self, zoom: f64, lower: f64, upper: f64) -> f64 {
        if self.expression.is_zoom_constant() {
            return 0.0;
        }
        self.expression
            .zoom_curve()
            .map_or(0.0, |curve| {
                interpolation_factor(curve.interpolation, zoom, lower, upper)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapstyle_expr::{Color, EvaluationErrorKind, Interpolation};
    use serde_json::json;

    const EPSILON: f64 = 1e-9;

    fn number_spec() -> PropertySpec {
        PropertySpec::new(PropertyType::Number)
    }

    fn color_spec() -> PropertySpec {
        PropertySpec::new(PropertyType::Color)
    }

    #[test]
    fn test_classify_shapes() {
        let color = color_spec();
        let number = number_spec();
        assert_eq!(AuthoredShape::classify(&json!("red"), &color), AuthoredShape::ColorLiteral);
        assert_eq!(AuthoredShape::classify(&json!("red"), &number), AuthoredShape::ConstantLiteral);
        assert_eq!(AuthoredShape::classify(&json!(null), &color), AuthoredShape::ConstantLiteral);
        assert_eq!(AuthoredShape::classify(&json!([1, 2]), &number), AuthoredShape::ConstantLiteral);
        assert_eq!(
            AuthoredShape::classify(&json!({"expression": 1}), &number),
            AuthoredShape::ExpressionAuthored
        );
        assert_eq!(
            AuthoredShape::classify(&json!({"stops": [[0, 1]]}), &number),
            AuthoredShape::LegacyFunction
        );
    }

    #[test]
    fn test_color_literal() {
        let declaration = StyleDeclaration::new(&color_spec(), &json!("#ff0000")).unwrap();
        assert_eq!(declaration.shape(), AuthoredShape::ColorLiteral);
        assert!(!declaration.is_expression());
        assert_eq!(
            declaration.calculate(&GlobalProperties::default(), None).unwrap(),
            Value::Color(Color::new(1.0, 0.0, 0.0, 1.0))
        );
    }

    #[test]
    fn test_invalid_color_fails_construction() {
        let err = StyleDeclaration::new(&color_spec(), &json!("not a color")).unwrap_err();
        assert!(matches!(err, DeclarationError::Color(_)));
    }

    #[test]
    fn test_constant_values_pass_through() {
        let spec = PropertySpec::new(PropertyType::String);
        let declaration = StyleDeclaration::new(&spec, &json!("bold")).unwrap();
        assert_eq!(
            declaration.calculate(&GlobalProperties::default(), None).unwrap(),
            Value::from("bold")
        );

        let declaration = StyleDeclaration::new(&number_spec(), &json!(null)).unwrap();
        assert_eq!(
            declaration.calculate(&GlobalProperties::default(), None).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_minimum_clamps_numbers_only() {
        let spec = number_spec().with_minimum(0.0);
        let declaration =
            StyleDeclaration::new(&spec, &json!({"expression": ["*", -1, ["get", "x"]]})).unwrap();
        assert!(declaration.is_expression());
        let feature = Feature::new().with_property("x", 5.0);
        assert_eq!(
            declaration
                .calculate(&GlobalProperties::default(), Some(&feature))
                .unwrap(),
            Value::Number(0.0)
        );

        let above = Feature::new().with_property("x", -3.0);
        assert_eq!(
            declaration
                .calculate(&GlobalProperties::default(), Some(&above))
                .unwrap(),
            Value::Number(3.0)
        );

        let spec = PropertySpec::array_of(PropertyType::Number, None).with_minimum(0.0);
        let declaration = StyleDeclaration::new(&spec, &json!([-1, 2])).unwrap();
        assert_eq!(
            declaration.calculate(&GlobalProperties::default(), None).unwrap(),
            Value::from(vec![Value::Number(-1.0), Value::Number(2.0)])
        );
    }

    #[test]
    fn test_evaluation_errors_propagate() {
        let declaration =
            StyleDeclaration::new(&number_spec(), &json!({"expression": ["get", "x"]})).unwrap();
        let err = declaration
            .calculate(&GlobalProperties::default(), None)
            .unwrap_err();
        assert_eq!(err.kind, EvaluationErrorKind::TypeMismatch);
    }

    #[test]
    fn test_interpolation_factor_for_zoom_curves() {
        let declaration = StyleDeclaration::new(
            &number_spec(),
            &json!({"expression": ["interpolate", ["exponential", 2], ["zoom"], 0, 0, 10, 1]}),
        )
        .unwrap();
        let curve = declaration.expression().zoom_curve().unwrap();
        assert_eq!(curve.interpolation, Interpolation::Exponential { base: 2.0 });
        assert!((declaration.interpolation_factor(5.0, 0.0, 10.0) - 31.0 / 1023.0).abs() < EPSILON);

        let step = StyleDeclaration::new(
            &number_spec(),
            &json!({"expression": ["step", ["zoom"], 1, 10, 2]}),
        )
        .unwrap();
        assert!(!step.is_zoom_constant());
        assert_eq!(step.interpolation_factor(5.0, 0.0, 10.0), 0.0);
    }

    #[test]
    fn test_interpolation_factor_zero_for_constants() {
        let constant = StyleDeclaration::new(&number_spec(), &json!(3)).unwrap();
        assert_eq!(constant.interpolation_factor(5.0, 0.0, 10.0), 0.0);

        let data = StyleDeclaration::new(&number_spec(), &json!({"expression": ["get", "x"]}))
            .unwrap();
        assert!(!data.is_feature_constant());
        assert_eq!(data.interpolation_factor(5.0, 0.0, 10.0), 0.0);
    }

    #[test]
    fn test_legacy_function_uses_own_default() {
        let declaration = StyleDeclaration::new(
            &number_spec(),
            &json!({"type": "identity", "property": "height", "default": 4}),
        )
        .unwrap();
        assert_eq!(declaration.shape(), AuthoredShape::LegacyFunction);
        assert_eq!(
            declaration.calculate(&GlobalProperties::default(), None).unwrap(),
            Value::Number(4.0)
        );
        let feature = Feature::new().with_property("height", 12.0);
        assert_eq!(
            declaration
                .calculate(&GlobalProperties::default(), Some(&feature))
                .unwrap(),
            Value::Number(12.0)
        );
    }

    #[test]
    fn test_value_is_copied() {
        let mut raw = json!({"expression": ["+", 1, 2]});
        let declaration = StyleDeclaration::new(&number_spec(), &raw).unwrap();
        raw["expression"] = json!(["+", 5, 5]);
        assert_eq!(declaration.value(), &json!({"expression": ["+", 1, 2]}));
        assert_eq!(
            declaration.calculate(&GlobalProperties::default(), None).unwrap(),
            Value::Number(3.0)
        );
    }

    #[test]
    fn test_compile_errors_surface() {
        let err = StyleDeclaration::new(&number_spec(), &json!({"expression": ["nope"]}))
            .unwrap_err();
        let DeclarationError::Compile(err) = err else {
            panic!("expected compile error, got {err:?}");
        };
        assert_eq!(err.key, "$[0]");
    }
}
