//! Expression compilation — JSON expression trees to evaluable style expressions.
//!
//! Compilation runs once per declaration; the resulting
//! [`CompiledExpression`] is evaluated many times per frame.

pub mod curve;
mod evaluate;
mod expr;
mod parse;

use std::fmt;

use serde_json::Value as JsonValue;

use crate::context::{Feature, GlobalProperties};
use crate::error::{CompileError, EvaluationError};
use crate::spec::PropertySpec;
use crate::value::{Value, ValueType};
use curve::{Interpolation, ZoomCurve};
use evaluate::EvaluationContext;
use expr::Expr;
use parse::ParsingContext;

/// Anything a style declaration can evaluate.
///
/// Implemented by [`CompiledExpression`] and by constant wrappers in
/// consuming crates.
pub trait StyleExpression: fmt::Debug {
    fn evaluate(
        &self,
        globals: &GlobalProperties,
        feature: Option<&Feature>,
    ) -> Result<Value, EvaluationError>;

    /// The result does not depend on feature attributes.
    fn is_feature_constant(&self) -> bool;

    /// The result does not depend on zoom.
    fn is_zoom_constant(&self) -> bool;

    /// Interpolation metadata for zoom-dependent expressions.
    fn zoom_curve(&self) -> Option<&ZoomCurve>;
}

/// Options for [`create_expression`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateOptions {
    /// Overrides the property spec's default for `null` results.
    pub default_value: Option<JsonValue>,
    /// The expression was produced from a legacy stop function.
    pub is_converted_function: bool,
}

/// An expression compiled against a property specification.
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    expr: Expr,
    result_type: ValueType,
    default_value: Option<Value>,
    /// Evaluation errors resolve to `default_value` instead of propagating.
    recover_with_default: bool,
    is_feature_constant: bool,
    is_zoom_constant: bool,
    zoom_curve: Option<ZoomCurve>,
    is_converted_function: bool,
}

impl CompiledExpression {
    pub fn result_type(&self) -> &ValueType {
        &self.result_type
    }

    /// Value substituted for `null` results, already typed for the property.
    pub fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    pub fn is_converted_function(&self) -> bool {
        self.is_converted_function
    }
}

impl StyleExpression for CompiledExpression {
    fn evaluate(
        &self,
        globals: &GlobalProperties,
        feature: Option<&Feature>,
    ) -> Result<Value, EvaluationError> {
        let ctx = EvaluationContext { globals, feature };
        match self.expr.evaluate(&ctx) {
            Ok(Value::Null) => Ok(self.default_value.clone().unwrap_or(Value::Null)),
            Ok(value) => Ok(value),
            Err(err) => match &self.default_value {
                Some(default) if self.recover_with_default => {
                    tracing::trace!("using function default after evaluation error: {err}");
                    Ok(default.clone())
                }
                _ => Err(err),
            },
        }
    }

    fn is_feature_constant(&self) -> bool {
        self.is_feature_constant
    }

    fn is_zoom_constant(&self) -> bool {
        self.is_zoom_constant
    }

    fn zoom_curve(&self) -> Option<&ZoomCurve> {
        self.zoom_curve.as_ref()
    }
}

/// Whether a raw property value is written in the expression grammar, i.e.
/// an object carrying an `expression` field.
pub fn is_expression(value: &JsonValue) -> bool {
    value
        .as_object()
        .is_some_and(|map| map.contains_key("expression"))
}

/// Compile an expression for a property.
///
/// The expression must produce the property's type. Zoom-dependent expressions
/// must be a top-level `step` or `interpolate` on `["zoom"]`; that node
/// becomes the expression's [`ZoomCurve`].
pub fn create_expression(
    expression: &JsonValue,
    spec: &PropertySpec,
    options: CreateOptions,
) -> Result<CompiledExpression, CompileError> {
    let expected = spec.expected_type();
    let parsed = ParsingContext::root().parse(expression, Some(&expected))?;

    let is_feature_constant = parsed.expr.is_feature_constant();
    let is_zoom_constant = parsed.expr.is_zoom_constant();
    if !is_feature_constant && !spec.property_function {
        return Err(CompileError::new(
            "$",
            "Data expressions are not supported for this property.",
        ));
    }
    if !is_zoom_constant && !spec.zoom_function {
        return Err(CompileError::new(
            "$",
            "Zoom expressions are not supported for this property.",
        ));
    }

    let zoom_curve = if is_zoom_constant {
        None
    } else {
        Some(find_zoom_curve(&parsed.expr)?)
    };

    let explicit_default = options.default_value.as_ref().filter(|json| !json.is_null());
    let default_value = explicit_default
        .or(spec.default.as_ref().filter(|json| !json.is_null()))
        .map(|json| compile_default(json, &expected))
        .transpose()?;

    tracing::debug!(
        is_feature_constant,
        is_zoom_constant,
        converted = options.is_converted_function,
        "compiled style expression of type {}",
        parsed.ty
    );

    Ok(CompiledExpression {
        expr: parsed.expr,
        result_type: parsed.ty,
        default_value,
        recover_with_default: options.is_converted_function && explicit_default.is_some(),
        is_feature_constant,
        is_zoom_constant,
        zoom_curve,
        is_converted_function: options.is_converted_function,
    })
}

fn compile_default(json: &JsonValue, expected: &ValueType) -> Result<Value, CompileError> {
    let ctx = ParsingContext::new("default");
    let typed = ctx.parse_literal(Value::from(json), Some(expected))?;
    let typed = ctx.annotate(typed, Some(expected))?;
    match typed.expr {
        Expr::Literal(value) => Ok(value),
        _ => Err(CompileError::new("default", "Default value must be a literal.")),
    }
}

/// Extract the zoom curve from a zoom-dependent expression.
///
/// `zoom` may only be the input of the top-level `step` or `interpolate`.
fn find_zoom_curve(expr: &Expr) -> Result<ZoomCurve, CompileError> {
    let curve = match expr {
        Expr::Step {
            input,
            first,
            stops,
        } if matches!(**input, Expr::Zoom)
            && first.is_zoom_constant()
            && stops.iter().all(|(_, output)| output.is_zoom_constant()) =>
        {
            Some(ZoomCurve {
                interpolation: Interpolation::Step,
                labels: stops.iter().map(|(label, _)| *label).collect(),
            })
        }
        Expr::Interpolate {
            interpolation,
            input,
            stops,
        } if matches!(**input, Expr::Zoom)
            && stops.iter().all(|(_, output)| output.is_zoom_constant()) =>
        {
            Some(ZoomCurve {
                interpolation: *interpolation,
                labels: stops.iter().map(|(label, _)| *label).collect(),
            })
        }
        _ => None,
    };

    curve.ok_or_else(|| {
        CompileError::new(
            "$",
            "\"zoom\" expression may only be used as input to a top-level \"step\" or \
             \"interpolate\" expression.",
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::spec::PropertyType;
    use serde_json::json;

    fn number_spec() -> PropertySpec {
        PropertySpec::new(PropertyType::Number)
    }

    #[test]
    fn test_is_expression_requires_expression_field() {
        assert!(is_expression(&json!({"expression": ["zoom"]})));
        assert!(!is_expression(&json!({"stops": [[0, 1]]})));
        assert!(!is_expression(&json!(["zoom"])));
        assert!(!is_expression(&json!("red")));
    }

    #[test]
    fn test_constant_expression_flags() {
        let compiled = create_expression(&json!(["+", 1, 2]), &number_spec(), CreateOptions::default())
            .unwrap();
        assert!(compiled.is_feature_constant());
        assert!(compiled.is_zoom_constant());
        assert!(compiled.zoom_curve().is_none());
        assert_eq!(
            compiled.evaluate(&GlobalProperties::default(), None).unwrap(),
            Value::Number(3.0)
        );
    }

    #[test]
    fn test_zoom_curve_from_top_level_interpolate() {
        let compiled = create_expression(
            &json!(["interpolate", ["exponential", 2], ["zoom"], 0, 1, 10, 5]),
            &number_spec(),
            CreateOptions::default(),
        )
        .unwrap();
        assert!(!compiled.is_zoom_constant());
        let curve = compiled.zoom_curve().unwrap();
        assert_eq!(curve.interpolation, Interpolation::Exponential { base: 2.0 });
        assert_eq!(curve.labels, vec![0.0, 10.0]);
    }

    #[test]
    fn test_nested_zoom_rejected() {
        let err = create_expression(
            &json!(["+", 1, ["zoom"]]),
            &number_spec(),
            CreateOptions::default(),
        )
        .unwrap_err();
        assert!(err.message.contains("top-level"));

        let err = create_expression(
            &json!(["interpolate", ["linear"], ["zoom"], 0, ["zoom"], 10, 5]),
            &number_spec(),
            CreateOptions::default(),
        )
        .unwrap_err();
        assert!(err.message.contains("top-level"));
    }

    #[test]
    fn test_result_type_checked_against_spec() {
        let err = create_expression(&json!("text"), &number_spec(), CreateOptions::default())
            .unwrap_err();
        assert_eq!(err.message, "Expected number but found string instead.");

        let color = create_expression(
            &json!("#ff0000"),
            &PropertySpec::new(PropertyType::Color),
            CreateOptions::default(),
        )
        .unwrap();
        assert_eq!(color.result_type(), &ValueType::Color);
    }

    #[test]
    fn test_capability_flags_restrict_expressions() {
        let mut spec = number_spec();
        spec.property_function = false;
        assert!(create_expression(&json!(["get", "x"]), &spec, CreateOptions::default()).is_err());

        let mut spec = number_spec();
        spec.zoom_function = false;
        assert!(
            create_expression(
                &json!(["interpolate", ["linear"], ["zoom"], 0, 1, 10, 2]),
                &spec,
                CreateOptions::default()
            )
            .is_err()
        );
    }

    #[test]
    fn test_null_result_uses_spec_default() {
        let color = create_expression(
            &json!(["coalesce", ["get", "fill"]]),
            &PropertySpec::new(PropertyType::Color).with_default(json!("#000000")),
            CreateOptions::default(),
        )
        .unwrap();
        assert_eq!(color.default_value(), Some(&Value::Color(Color::BLACK)));
        assert_eq!(
            color.evaluate(&GlobalProperties::default(), None).unwrap(),
            Value::Color(Color::BLACK)
        );

        let feature = Feature::new().with_property("other", 1.0);
        let text = create_expression(
            &json!(["coalesce", ["get", "label"], ["literal", null]]),
            &PropertySpec::new(PropertyType::String).with_default(json!("none")),
            CreateOptions::default(),
        )
        .unwrap();
        assert_eq!(
            text.evaluate(&GlobalProperties::default(), Some(&feature))
                .unwrap(),
            Value::from("none")
        );
    }

    #[test]
    fn test_converted_function_default_recovers_errors() {
        let options = CreateOptions {
            default_value: Some(json!(7)),
            is_converted_function: true,
        };
        let compiled =
            create_expression(&json!(["number", ["get", "height"]]), &number_spec(), options)
                .unwrap();
        assert!(compiled.is_converted_function());
        assert_eq!(
            compiled.evaluate(&GlobalProperties::default(), None).unwrap(),
            Value::Number(7.0)
        );

        let plain = create_expression(
            &json!(["number", ["get", "height"]]),
            &number_spec().with_default(json!(7)),
            CreateOptions::default(),
        )
        .unwrap();
        assert!(plain.evaluate(&GlobalProperties::default(), None).is_err());
    }

    #[test]
    fn test_invalid_default_is_compile_error() {
        let spec = PropertySpec::new(PropertyType::Color).with_default(json!("not-a-color"));
        let err = create_expression(&json!("red"), &spec, CreateOptions::default()).unwrap_err();
        assert_eq!(err.key, "default");
    }
}
