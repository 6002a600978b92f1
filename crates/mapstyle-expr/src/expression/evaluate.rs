//! Tree-walking evaluation of parsed expressions.

use std::cmp::Ordering;

use crate::color::{Color, parse_color};
use crate::context::{Feature, GlobalProperties};
use crate::error::EvaluationError;
use crate::expression::curve::interpolation_factor;
use crate::expression::expr::{ArithmeticOp, ComparisonOp, Expr};
use crate::value::{Value, ValueType};

pub(crate) struct EvaluationContext<'a> {
    pub globals: &'a GlobalProperties,
    pub feature: Option<&'a Feature>,
}

impl Expr {
    pub(crate) fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Result<Value, EvaluationError> {
        match self {
            Self::Literal(value) => Ok(value.clone()),
            Self::Get(key) => {
                let key = expect_string(key.evaluate(ctx)?)?;
                Ok(ctx
                    .feature
                    .and_then(|feature| feature.properties.get(&key))
                    .cloned()
                    .unwrap_or(Value::Null))
            }
            Self::Has(key) => {
                let key = expect_string(key.evaluate(ctx)?)?;
                Ok(Value::Bool(
                    ctx.feature
                        .is_some_and(|feature| feature.properties.contains_key(&key)),
                ))
            }
            Self::Properties => Ok(Value::Object(
                ctx.feature
                    .map(|feature| feature.properties.clone())
                    .unwrap_or_default(),
            )),
            Self::Id => Ok(ctx
                .feature
                .and_then(|feature| feature.id.clone())
                .unwrap_or(Value::Null)),
            Self::GeometryType => Ok(ctx
                .feature
                .and_then(|feature| feature.geometry_type.clone())
                .map_or(Value::Null, Value::String)),
            Self::Zoom => ctx
                .globals
                .zoom
                .map(Value::Number)
                .ok_or_else(EvaluationError::missing_zoom),
            Self::Arithmetic { op, args } => evaluate_arithmetic(*op, args, ctx),
            Self::Comparison { op, lhs, rhs } => {
                let lhs = lhs.evaluate(ctx)?;
                let rhs = rhs.evaluate(ctx)?;
                compare(*op, &lhs, &rhs).map(Value::Bool)
            }
            Self::Not(arg) => Ok(Value::Bool(!expect_bool(arg.evaluate(ctx)?)?)),
            Self::All(args) => {
                for arg in args {
                    if !expect_bool(arg.evaluate(ctx)?)? {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            Self::Any(args) => {
                for arg in args {
                    if expect_bool(arg.evaluate(ctx)?)? {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            Self::Case {
                branches,
                otherwise,
            } => {
                for (condition, output) in branches {
                    if expect_bool(condition.evaluate(ctx)?)? {
                        return output.evaluate(ctx);
                    }
                }
                otherwise.evaluate(ctx)
            }
            Self::Match {
                input,
                branches,
                otherwise,
            } => {
                let input = input.evaluate(ctx)?;
                for (labels, output) in branches {
                    if labels.contains(&input) {
                        return output.evaluate(ctx);
                    }
                }
                otherwise.evaluate(ctx)
            }
            Self::Coalesce(args) => {
                for arg in args {
                    let value = arg.evaluate(ctx)?;
                    if !value.is_null() {
                        return Ok(value);
                    }
                }
                Ok(Value::Null)
            }
            Self::Assertion { target, args } => {
                let mut actual = ValueType::Null;
                for arg in args {
                    let value = arg.evaluate(ctx)?;
                    actual = value.value_type();
                    if target.accepts(&actual) {
                        return Ok(value);
                    }
                }
                Err(EvaluationError::type_mismatch(target, &actual))
            }
            Self::Coercion { target, args } => coerce(target, args, ctx),
            Self::Rgba(args) => {
                let channels = args
                    .iter()
                    .map(|arg| expect_number(arg.evaluate(ctx)?))
                    .collect::<Result<Vec<_>, _>>()?;
                rgba_to_color(&channels).map(Value::Color)
            }
            Self::Step {
                input,
                first,
                stops,
            } => {
                let input = stop_input("step", input.evaluate(ctx)?)?;
                match stops.partition_point(|(label, _)| *label <= input) {
                    0 => first.evaluate(ctx),
                    index => stops[index - 1].1.evaluate(ctx),
                }
            }
            Self::Interpolate {
                interpolation,
                input,
                stops,
            } => {
                let input = stop_input("interpolate", input.evaluate(ctx)?)?;
                let (Some((first_label, first)), Some((last_label, last))) =
                    (stops.first(), stops.last())
                else {
                    return Ok(Value::Null);
                };
                if input <= *first_label {
                    return first.evaluate(ctx);
                }
                if input >= *last_label {
                    return last.evaluate(ctx);
                }

                let upper = stops.partition_point(|(label, _)| *label <= input);
                let (lower_label, lower_output) = &stops[upper - 1];
                let (upper_label, upper_output) = &stops[upper];
                let t = interpolation_factor(*interpolation, input, *lower_label, *upper_label);
                let lower_value = lower_output.evaluate(ctx)?;
                let upper_value = upper_output.evaluate(ctx)?;
                interpolate_values(&lower_value, &upper_value, t)
            }
        }
    }
}

fn expect_number(value: Value) -> Result<f64, EvaluationError> {
    match value {
        Value::Number(n) => Ok(n),
        other => Err(EvaluationError::type_mismatch(
            &ValueType::Number,
            &other.value_type(),
        )),
    }
}

/// Numeric input of `step` or `interpolate`. NaN has no place among the
/// stops and is rejected.
fn stop_input(op: &str, value: Value) -> Result<f64, EvaluationError> {
    let input = expect_number(value)?;
    if input.is_nan() {
        return Err(EvaluationError::invalid_argument(format!(
            "Input to \"{op}\" must be a number, but found NaN."
        )));
    }
    Ok(input)
}

fn expect_string(value: Value) -> Result<String, EvaluationError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(EvaluationError::type_mismatch(
            &ValueType::String,
            &other.value_type(),
        )),
    }
}

fn expect_bool(value: Value) -> Result<bool, EvaluationError> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(EvaluationError::type_mismatch(
            &ValueType::Boolean,
            &other.value_type(),
        )),
    }
}

fn evaluate_arithmetic(
    op: ArithmeticOp,
    args: &[Expr],
    ctx: &EvaluationContext<'_>,
) -> Result<Value, EvaluationError> {
    let numbers = args
        .iter()
        .map(|arg| expect_number(arg.evaluate(ctx)?))
        .collect::<Result<Vec<_>, _>>()?;

    let result = match (op, numbers.as_slice()) {
        (ArithmeticOp::Add, _) => numbers.iter().sum::<f64>(),
        (ArithmeticOp::Multiply, _) => numbers.iter().product::<f64>(),
        (ArithmeticOp::Subtract, [x]) => -x,
        (ArithmeticOp::Subtract, [a, b]) => a - b,
        (ArithmeticOp::Divide, [a, b]) => a / b,
        (ArithmeticOp::Remainder, [a, b]) => a % b,
        (ArithmeticOp::Power, [a, b]) => a.powf(*b),
        _ => {
            return Err(EvaluationError::invalid_argument(format!(
                "Wrong number of arguments for {op:?}: {}",
                numbers.len()
            )));
        }
    };
    Ok(Value::Number(result))
}

fn compare(op: ComparisonOp, lhs: &Value, rhs: &Value) -> Result<bool, EvaluationError> {
    match op {
        ComparisonOp::Equal => return Ok(lhs == rhs),
        ComparisonOp::NotEqual => return Ok(lhs != rhs),
        _ => {}
    }

    let ordering = match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => {
            return Err(EvaluationError::invalid_argument(format!(
                "Expected arguments of the same comparable type, but found {} and {} instead.",
                lhs.value_type(),
                rhs.value_type()
            )));
        }
    };

    // NaN compares false against everything.
    let Some(ordering) = ordering else {
        return Ok(false);
    };
    Ok(match op {
        ComparisonOp::Less => ordering == Ordering::Less,
        ComparisonOp::LessEqual => ordering != Ordering::Greater,
        ComparisonOp::Greater => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    })
}

fn coerce(
    target: &ValueType,
    args: &[Expr],
    ctx: &EvaluationContext<'_>,
) -> Result<Value, EvaluationError> {
    match target {
        ValueType::Color => {
            let mut last = Value::Null;
            for arg in args {
                let value = arg.evaluate(ctx)?;
                let color = match &value {
                    Value::Color(color) => Some(*color),
                    Value::String(s) => parse_color(s).ok(),
                    Value::Array(items) => items
                        .iter()
                        .map(Value::as_number)
                        .collect::<Option<Vec<_>>>()
                        .and_then(|channels| rgba_to_color(&channels).ok()),
                    _ => None,
                };
                if let Some(color) = color {
                    return Ok(Value::Color(color));
                }
                last = value;
            }
            Err(EvaluationError::invalid_color(last))
        }
        ValueType::Number => {
            let mut last = Value::Null;
            for arg in args {
                let value = arg.evaluate(ctx)?;
                let number = match &value {
                    Value::Null => Some(0.0),
                    Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                    Value::Number(n) => Some(*n),
                    Value::String(s) => parse_number(s),
                    _ => None,
                };
                if let Some(number) = number {
                    return Ok(Value::Number(number));
                }
                last = value;
            }
            Err(EvaluationError::invalid_argument(format!(
                "Could not convert {} to number.",
                last.to_json()
            )))
        }
        ValueType::Boolean => {
            let value = first_arg(args, ctx)?;
            Ok(Value::Bool(match value {
                Value::Null => false,
                Value::Bool(b) => b,
                Value::Number(n) => n != 0.0 && !n.is_nan(),
                Value::String(s) => !s.is_empty(),
                _ => true,
            }))
        }
        _ => Ok(Value::String(first_arg(args, ctx)?.to_string())),
    }
}

/// Decimal number syntax only; `f64::from_str` spellings such as `inf` or
/// `NaN` are not numbers here.
fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    let digits = trimmed.trim_start_matches(['+', '-']);
    let numeric = digits
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !numeric || !digits.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    trimmed.parse().ok()
}

fn first_arg(args: &[Expr], ctx: &EvaluationContext<'_>) -> Result<Value, EvaluationError> {
    args.first()
        .map_or(Ok(Value::Null), |arg| arg.evaluate(ctx))
}

/// Build a color from `[r, g, b]` or `[r, g, b, a]` with 0–255 channels.
fn rgba_to_color(channels: &[f64]) -> Result<Color, EvaluationError> {
    let (r, g, b, a) = match channels {
        [r, g, b] => (*r, *g, *b, 1.0),
        [r, g, b, a] => (*r, *g, *b, *a),
        _ => {
            return Err(EvaluationError::invalid_argument(format!(
                "Invalid rgba value {channels:?}: expected an array containing either three or four numeric values."
            )));
        }
    };

    if [r, g, b].iter().any(|c| !(0.0..=255.0).contains(c)) {
        return Err(EvaluationError::invalid_argument(format!(
            "Invalid rgba value [{r}, {g}, {b}, {a}]: 'r', 'g', and 'b' must be between 0 and 255."
        )));
    }
    if !(0.0..=1.0).contains(&a) {
        return Err(EvaluationError::invalid_argument(format!(
            "Invalid rgba value [{r}, {g}, {b}, {a}]: 'a' must be between 0 and 1."
        )));
    }

    Ok(Color::new(
        (r / 255.0) as f32,
        (g / 255.0) as f32,
        (b / 255.0) as f32,
        a as f32,
    ))
}

/// Blend two stop outputs. Numbers, colors, and equal-length numeric arrays
/// interpolate; anything else is a type error.
fn interpolate_values(lower: &Value, upper: &Value, t: f64) -> Result<Value, EvaluationError> {
    match (lower, upper) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + (b - a) * t)),
        (Value::Color(a), Value::Color(b)) => Ok(Value::Color(a.lerp(b, t as f32))),
        (Value::Array(a), Value::Array(b)) if a.len() == b.len() => a
            .iter()
            .zip(b)
            .map(|(a, b)| interpolate_values(a, b, t))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        _ => Err(EvaluationError::type_mismatch(
            &lower.value_type(),
            &upper.value_type(),
        )),
    }
}
