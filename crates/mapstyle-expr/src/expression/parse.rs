//! JSON → typed [`Expr`] parsing with expected-type propagation.
//!
//! Every node is parsed against the type its parent expects. A node whose
//! inferred type is `value` gets a runtime assertion (or `to-color`
//! coercion) inserted; any other mismatch is a compile error. Errors carry
//! the JSON path of the offending node (`$[2][1]`).

use serde_json::Value as JsonValue;

use crate::color::parse_color;
use crate::error::CompileError;
use crate::expression::curve::Interpolation;
use crate::expression::expr::{ArithmeticOp, ComparisonOp, Expr};
use crate::value::{Value, ValueType};

/// A parsed node together with its static result type.
#[derive(Debug, Clone)]
pub(crate) struct Typed {
    pub expr: Expr,
    pub ty: ValueType,
}

impl Typed {
    fn new(expr: Expr, ty: ValueType) -> Self {
        Self { expr, ty }
    }

    fn literal(value: Value) -> Self {
        let ty = value.value_type();
        Self::new(Expr::Literal(value), ty)
    }
}

pub(crate) struct ParsingContext {
    key: String,
}

impl ParsingContext {
    pub(crate) fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub(crate) fn root() -> Self {
        Self::new("$")
    }

    fn child(&self, index: usize) -> Self {
        Self::new(format!("{}[{index}]", self.key))
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::new(self.key.clone(), message)
    }

    pub(crate) fn parse(
        &self,
        json: &JsonValue,
        expected: Option<&ValueType>,
    ) -> Result<Typed, CompileError> {
        let typed = self.parse_unannotated(json, expected)?;
        self.annotate(typed, expected)
    }

    /// Parse without inserting a runtime assertion for `value`-typed results.
    fn parse_unannotated(
        &self,
        json: &JsonValue,
        expected: Option<&ValueType>,
    ) -> Result<Typed, CompileError> {
        match json {
            JsonValue::Array(items) => self.parse_call(items, expected),
            JsonValue::Object(_) => {
                Err(self.error("Bare objects invalid. Use [\"literal\", {...}] instead."))
            }
            scalar => self.parse_literal(Value::from(scalar), expected),
        }
    }

    /// Parse a constant, turning strings into colors where a color is expected.
    pub(crate) fn parse_literal(
        &self,
        value: Value,
        expected: Option<&ValueType>,
    ) -> Result<Typed, CompileError> {
        if let (Some(ValueType::Color), Value::String(s)) = (expected, &value) {
            let color = parse_color(s).map_err(|e| self.error(e.to_string()))?;
            return Ok(Typed::literal(Value::Color(color)));
        }
        Ok(Typed::literal(value))
    }

    /// Reconcile a parsed node with the type its parent expects.
    pub(crate) fn annotate(
        &self,
        typed: Typed,
        expected: Option<&ValueType>,
    ) -> Result<Typed, CompileError> {
        let Some(expected) = expected else {
            return Ok(typed);
        };
        if expected.accepts(&typed.ty) {
            return Ok(typed);
        }
        // Null stands in for "no value" and resolves to the property default.
        if typed.ty == ValueType::Null {
            return Ok(Typed::new(typed.expr, expected.clone()));
        }
        if typed.ty == ValueType::Value {
            let expr = match expected {
                ValueType::Color => Expr::Coercion {
                    target: ValueType::Color,
                    args: vec![typed.expr],
                },
                target => Expr::Assertion {
                    target: target.clone(),
                    args: vec![typed.expr],
                },
            };
            return Ok(Typed::new(expr, expected.clone()));
        }
        Err(self.error(format!(
            "Expected {expected} but found {} instead.",
            typed.ty
        )))
    }

    fn arg(
        &self,
        args: &[JsonValue],
        index: usize,
        expected: Option<&ValueType>,
    ) -> Result<Typed, CompileError> {
        self.child(index + 1).parse(&args[index], expected)
    }

    fn args_of(
        &self,
        args: &[JsonValue],
        expected: Option<&ValueType>,
    ) -> Result<Vec<Expr>, CompileError> {
        (0..args.len())
            .map(|i| self.arg(args, i, expected).map(|typed| typed.expr))
            .collect()
    }

    fn expect_count(&self, args: &[JsonValue], count: usize) -> Result<(), CompileError> {
        if args.len() != count {
            return Err(self.error(format!(
                "Expected {count} argument{}, but found {} instead.",
                if count == 1 { "" } else { "s" },
                args.len()
            )));
        }
        Ok(())
    }

    fn expect_at_least(&self, args: &[JsonValue], count: usize) -> Result<(), CompileError> {
        if args.len() < count {
            return Err(self.error(format!(
                "Expected at least {count} arguments, but found {} instead.",
                args.len()
            )));
        }
        Ok(())
    }

    fn parse_call(
        &self,
        items: &[JsonValue],
        expected: Option<&ValueType>,
    ) -> Result<Typed, CompileError> {
        let Some((op, args)) = items.split_first() else {
            return Err(self.error(
                "Expected an array with at least one element. \
                 If you wanted a literal array, use [\"literal\", []].",
            ));
        };
        let Some(op) = op.as_str() else {
            return Err(self.child(0).error(format!(
                "Expression name must be a string, but found {} instead. \
                 If you wanted a literal array, use [\"literal\", [...]].",
                json_type_name(op)
            )));
        };

        match op {
            "literal" => {
                self.expect_count(args, 1)?;
                self.parse_literal(Value::from(&args[0]), expected)
            }
            "get" | "has" => {
                self.expect_count(args, 1)?;
                let key = Box::new(self.arg(args, 0, Some(&ValueType::String))?.expr);
                Ok(if op == "get" {
                    Typed::new(Expr::Get(key), ValueType::Value)
                } else {
                    Typed::new(Expr::Has(key), ValueType::Boolean)
                })
            }
            "properties" => {
                self.expect_count(args, 0)?;
                Ok(Typed::new(Expr::Properties, ValueType::Object))
            }
            "id" => {
                self.expect_count(args, 0)?;
                Ok(Typed::new(Expr::Id, ValueType::Value))
            }
            "geometry-type" => {
                self.expect_count(args, 0)?;
                Ok(Typed::new(Expr::GeometryType, ValueType::String))
            }
            "zoom" => {
                self.expect_count(args, 0)?;
                Ok(Typed::new(Expr::Zoom, ValueType::Number))
            }
            "+" | "*" | "-" | "/" | "%" | "^" => self.parse_arithmetic(op, args),
            "==" | "!=" | "<" | "<=" | ">" | ">=" => self.parse_comparison(op, args),
            "!" => {
                self.expect_count(args, 1)?;
                let arg = self.arg(args, 0, Some(&ValueType::Boolean))?.expr;
                Ok(Typed::new(Expr::Not(Box::new(arg)), ValueType::Boolean))
            }
            "all" | "any" => {
                let args = self.args_of(args, Some(&ValueType::Boolean))?;
                let expr = if op == "all" {
                    Expr::All(args)
                } else {
                    Expr::Any(args)
                };
                Ok(Typed::new(expr, ValueType::Boolean))
            }
            "case" => self.parse_case(args, expected),
            "match" => self.parse_match(args, expected),
            "coalesce" => {
                self.expect_at_least(args, 1)?;
                let mut output_type = expected.cloned();
                let mut outputs = Vec::with_capacity(args.len());
                // Untyped and null children stay unasserted so a null can fall through.
                for (i, arg) in args.iter().enumerate() {
                    let child = self.child(i + 1);
                    let typed = child.parse_unannotated(arg, output_type.as_ref())?;
                    let typed = match typed.ty {
                        ValueType::Value | ValueType::Null => typed,
                        _ => {
                            let typed = child.annotate(typed, output_type.as_ref())?;
                            output_type.get_or_insert(typed.ty.clone());
                            typed
                        }
                    };
                    outputs.push(typed.expr);
                }
                let ty = output_type.unwrap_or(ValueType::Value);
                Ok(Typed::new(Expr::Coalesce(outputs), ty))
            }
            "number" | "string" | "boolean" | "object" => {
                self.expect_at_least(args, 1)?;
                let target = match op {
                    "number" => ValueType::Number,
                    "string" => ValueType::String,
                    "boolean" => ValueType::Boolean,
                    _ => ValueType::Object,
                };
                let args = self.args_of(args, None)?;
                Ok(Typed::new(
                    Expr::Assertion {
                        target: target.clone(),
                        args,
                    },
                    target,
                ))
            }
            "array" => self.parse_array_assertion(args),
            "to-number" | "to-color" | "to-string" | "to-boolean" => {
                let target = match op {
                    "to-number" => ValueType::Number,
                    "to-color" => ValueType::Color,
                    "to-string" => ValueType::String,
                    _ => ValueType::Boolean,
                };
                if matches!(target, ValueType::Number | ValueType::Color) {
                    self.expect_at_least(args, 1)?;
                } else {
                    self.expect_count(args, 1)?;
                }
                let args = self.args_of(args, None)?;
                Ok(Typed::new(
                    Expr::Coercion {
                        target: target.clone(),
                        args,
                    },
                    target,
                ))
            }
            "rgb" | "rgba" => {
                self.expect_count(args, if op == "rgb" { 3 } else { 4 })?;
                let args = self.args_of(args, Some(&ValueType::Number))?;
                Ok(Typed::new(Expr::Rgba(args), ValueType::Color))
            }
            "step" => self.parse_step(args, expected),
            "interpolate" => self.parse_interpolate(args, expected),
            _ => Err(self.child(0).error(format!(
                "Unknown expression \"{op}\". If you wanted a literal array, use [\"literal\", [...]]."
            ))),
        }
    }

    fn parse_arithmetic(&self, op: &str, args: &[JsonValue]) -> Result<Typed, CompileError> {
        let op = match op {
            "+" => ArithmeticOp::Add,
            "*" => ArithmeticOp::Multiply,
            "-" => ArithmeticOp::Subtract,
            "/" => ArithmeticOp::Divide,
            "%" => ArithmeticOp::Remainder,
            _ => ArithmeticOp::Power,
        };
        match op {
            ArithmeticOp::Add | ArithmeticOp::Multiply => self.expect_at_least(args, 2)?,
            ArithmeticOp::Subtract if args.len() == 1 => {}
            _ => self.expect_count(args, 2)?,
        }
        let args = self.args_of(args, Some(&ValueType::Number))?;
        Ok(Typed::new(Expr::Arithmetic { op, args }, ValueType::Number))
    }

    fn parse_comparison(&self, op: &str, args: &[JsonValue]) -> Result<Typed, CompileError> {
        self.expect_count(args, 2)?;
        let op = match op {
            "==" => ComparisonOp::Equal,
            "!=" => ComparisonOp::NotEqual,
            "<" => ComparisonOp::Less,
            "<=" => ComparisonOp::LessEqual,
            ">" => ComparisonOp::Greater,
            _ => ComparisonOp::GreaterEqual,
        };

        let lhs = self.arg(args, 0, None)?;
        let equality = matches!(op, ComparisonOp::Equal | ComparisonOp::NotEqual);
        if !equality
            && !matches!(lhs.ty, ValueType::Number | ValueType::String | ValueType::Value)
        {
            return Err(self.child(1).error(format!(
                "Order comparisons are not supported for type {}.",
                lhs.ty
            )));
        }

        let rhs_expected = match lhs.ty {
            ValueType::Number | ValueType::String if !equality => Some(lhs.ty.clone()),
            _ => None,
        };
        let rhs = self.arg(args, 1, rhs_expected.as_ref())?;
        if equality
            && lhs.ty != ValueType::Value
            && rhs.ty != ValueType::Value
            && !lhs.ty.accepts(&rhs.ty)
            && !rhs.ty.accepts(&lhs.ty)
        {
            return Err(self.error(format!("Cannot compare {} and {}.", lhs.ty, rhs.ty)));
        }

        Ok(Typed::new(
            Expr::Comparison {
                op,
                lhs: Box::new(lhs.expr),
                rhs: Box::new(rhs.expr),
            },
            ValueType::Boolean,
        ))
    }

    fn parse_case(
        &self,
        args: &[JsonValue],
        expected: Option<&ValueType>,
    ) -> Result<Typed, CompileError> {
        if args.len() < 3 {
            return Err(self.error(format!(
                "Expected at least 3 arguments, but found only {}.",
                args.len()
            )));
        }
        if args.len() % 2 == 0 {
            return Err(self.error("Expected an odd number of arguments."));
        }

        let mut output_type = expected.cloned();
        let mut branches = Vec::with_capacity(args.len() / 2);
        for i in (0..args.len() - 1).step_by(2) {
            let condition = self.arg(args, i, Some(&ValueType::Boolean))?;
            let output = self.arg(args, i + 1, output_type.as_ref())?;
            output_type.get_or_insert(output.ty);
            branches.push((condition.expr, output.expr));
        }
        let otherwise = self.arg(args, args.len() - 1, output_type.as_ref())?;
        let ty = output_type.unwrap_or(otherwise.ty);

        Ok(Typed::new(
            Expr::Case {
                branches,
                otherwise: Box::new(otherwise.expr),
            },
            ty,
        ))
    }

    fn parse_match(
        &self,
        args: &[JsonValue],
        expected: Option<&ValueType>,
    ) -> Result<Typed, CompileError> {
        if args.len() < 4 {
            return Err(self.error(format!(
                "Expected at least 4 arguments, but found only {}.",
                args.len()
            )));
        }
        if args.len() % 2 != 0 {
            return Err(self.error("Expected an even number of arguments."));
        }

        let input = self.arg(args, 0, None)?;
        let mut output_type = expected.cloned();
        let mut seen: Vec<Value> = Vec::new();
        let mut branches = Vec::with_capacity(args.len() / 2 - 1);

        for i in (1..args.len() - 1).step_by(2) {
            let label_context = self.child(i + 1);
            let labels = match &args[i] {
                JsonValue::Array(items) if !items.is_empty() => items.clone(),
                JsonValue::Array(_) => {
                    return Err(label_context.error("Expected at least one branch label."));
                }
                label => vec![label.clone()],
            };

            let mut values = Vec::with_capacity(labels.len());
            for label in &labels {
                if !matches!(
                    label,
                    JsonValue::Number(_) | JsonValue::String(_) | JsonValue::Bool(_)
                ) {
                    return Err(label_context
                        .error("Branch labels must be numbers, strings, or booleans."));
                }
                let value = Value::from(label);
                if seen.contains(&value) {
                    return Err(label_context.error("Branch labels must be unique."));
                }
                seen.push(value.clone());
                values.push(value);
            }

            let output = self.arg(args, i + 1, output_type.as_ref())?;
            output_type.get_or_insert(output.ty);
            branches.push((values, output.expr));
        }

        let otherwise = self.arg(args, args.len() - 1, output_type.as_ref())?;
        let ty = output_type.unwrap_or(otherwise.ty);

        Ok(Typed::new(
            Expr::Match {
                input: Box::new(input.expr),
                branches,
                otherwise: Box::new(otherwise.expr),
            },
            ty,
        ))
    }

    fn parse_array_assertion(&self, args: &[JsonValue]) -> Result<Typed, CompileError> {
        if args.is_empty() || args.len() > 3 {
            return Err(self.error(format!(
                "Expected 1, 2, or 3 arguments, but found {} instead.",
                args.len()
            )));
        }

        let item = if args.len() > 1 {
            match args[0].as_str() {
                Some("number") => ValueType::Number,
                Some("string") => ValueType::String,
                Some("boolean") => ValueType::Boolean,
                _ => {
                    return Err(self.child(1).error(
                        "The item type argument of \"array\" must be one of string, number, boolean",
                    ));
                }
            }
        } else {
            ValueType::Value
        };

        let length = if args.len() == 3 {
            match args[1].as_u64() {
                Some(n) => Some(n as usize),
                None => {
                    return Err(self
                        .child(2)
                        .error("The length argument to \"array\" must be a positive integer literal"));
                }
            }
        } else {
            None
        };

        let target = ValueType::array(item, length);
        let value = self.arg(args, args.len() - 1, None)?;
        Ok(Typed::new(
            Expr::Assertion {
                target: target.clone(),
                args: vec![value.expr],
            },
            target,
        ))
    }

    /// Parse `label, output` pairs starting at `start`, checking labels are
    /// numeric literals in strictly ascending order.
    fn parse_stops(
        &self,
        op: &str,
        args: &[JsonValue],
        start: usize,
        output_type: &mut Option<ValueType>,
    ) -> Result<Vec<(f64, Expr)>, CompileError> {
        let mut stops: Vec<(f64, Expr)> = Vec::with_capacity((args.len() - start) / 2);
        for i in (start..args.len()).step_by(2) {
            let label_context = self.child(i + 1);
            let Some(label) = args[i].as_f64() else {
                return Err(label_context.error(format!(
                    "Input/output pairs for \"{op}\" expressions must be defined using literal \
                     numeric values (not computed expressions) for the input values."
                )));
            };
            if let Some((previous, _)) = stops.last() {
                if *previous >= label {
                    return Err(label_context.error(format!(
                        "Input/output pairs for \"{op}\" expressions must be arranged with input \
                         values in strictly ascending order."
                    )));
                }
            }

            let output = self.arg(args, i + 1, output_type.as_ref())?;
            output_type.get_or_insert(output.ty);
            stops.push((label, output.expr));
        }
        Ok(stops)
    }

    fn parse_step(
        &self,
        args: &[JsonValue],
        expected: Option<&ValueType>,
    ) -> Result<Typed, CompileError> {
        self.expect_at_least(args, 2)?;
        if args.len() % 2 != 0 {
            return Err(self.error("Expected an even number of arguments."));
        }

        let input = self.arg(args, 0, Some(&ValueType::Number))?;
        let mut output_type = expected.cloned();
        let first = self.arg(args, 1, output_type.as_ref())?;
        output_type.get_or_insert(first.ty);
        let stops = self.parse_stops("step", args, 2, &mut output_type)?;

        let ty = output_type.unwrap_or(ValueType::Value);
        Ok(Typed::new(
            Expr::Step {
                input: Box::new(input.expr),
                first: Box::new(first.expr),
                stops,
            },
            ty,
        ))
    }

    fn parse_interpolate(
        &self,
        args: &[JsonValue],
        expected: Option<&ValueType>,
    ) -> Result<Typed, CompileError> {
        self.expect_at_least(args, 4)?;
        if args.len() % 2 != 0 {
            return Err(self.error("Expected an even number of arguments."));
        }

        let interpolation = self.child(1).parse_interpolation(&args[0])?;
        let input = self.arg(args, 1, Some(&ValueType::Number))?;
        let mut output_type = expected.cloned();
        let stops = self.parse_stops("interpolate", args, 2, &mut output_type)?;

        let ty = output_type.unwrap_or(ValueType::Value);
        let interpolatable = match &ty {
            ValueType::Number | ValueType::Color => true,
            ValueType::Array { item, length } => **item == ValueType::Number && length.is_some(),
            _ => false,
        };
        if !interpolatable {
            return Err(self.error(format!("Type {ty} is not interpolatable.")));
        }

        Ok(Typed::new(
            Expr::Interpolate {
                interpolation,
                input: Box::new(input.expr),
                stops,
            },
            ty,
        ))
    }

    fn parse_interpolation(&self, json: &JsonValue) -> Result<Interpolation, CompileError> {
        let parts = json.as_array().map(Vec::as_slice).unwrap_or_default();
        let numbers: Option<Vec<f64>> = parts.iter().skip(1).map(JsonValue::as_f64).collect();

        match (parts.first().and_then(JsonValue::as_str), numbers.as_deref()) {
            (Some("linear"), Some([])) => Ok(Interpolation::Linear),
            (Some("exponential"), Some(&[base])) => Ok(Interpolation::Exponential { base }),
            (Some("cubic-bezier"), Some(&[x1, y1, x2, y2])) => {
                if !(0.0..=1.0).contains(&x1) || !(0.0..=1.0).contains(&x2) {
                    return Err(self.error(
                        "Cubic bezier interpolation requires four numeric arguments with values \
                         between 0 and 1.",
                    ));
                }
                Ok(Interpolation::CubicBezier { x1, y1, x2, y2 })
            }
            _ => Err(self.error(format!("Unknown interpolation type {json}"))),
        }
    }
}

fn json_type_name(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
