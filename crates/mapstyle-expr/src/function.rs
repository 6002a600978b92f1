//! Conversion of legacy stop functions into the expression grammar.
//!
//! A legacy function is an object such as
//! `{"type": "exponential", "base": 2, "property": "height", "stops": [[0, 0], [100, 20]]}`.
//! Zoom functions read `["zoom"]`, property functions read a feature
//! attribute, and zoom-and-property functions (stop inputs of the form
//! `{"zoom": z, "value": v}`) nest a property function inside a zoom curve.

use serde_json::{Map, Value as JsonValue, json};

use crate::error::CompileError;
use crate::spec::{PropertySpec, PropertyType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionType {
    Identity,
    Exponential,
    Interval,
    Categorical,
}

impl FunctionType {
    fn from_parameters(
        parameters: &Map<String, JsonValue>,
        spec: &PropertySpec,
    ) -> Result<Self, CompileError> {
        let Some(kind) = parameters.get("type") else {
            return Ok(if spec.is_interpolated() {
                Self::Exponential
            } else {
                Self::Interval
            });
        };
        match kind.as_str() {
            Some("identity") => Ok(Self::Identity),
            Some("exponential") => Ok(Self::Exponential),
            Some("interval") => Ok(Self::Interval),
            Some("categorical") => Ok(Self::Categorical),
            _ => Err(CompileError::new(
                "$.type",
                format!("Unknown function type {kind}."),
            )),
        }
    }
}

/// A `[input, output]` stop pair, borrowed from the function object.
type Stop<'a> = (&'a JsonValue, &'a JsonValue);

/// Convert a legacy function object into an equivalent expression.
///
/// The result is JSON in the expression grammar, ready for
/// [`create_expression`](crate::create_expression).
pub fn convert_function(
    function: &JsonValue,
    spec: &PropertySpec,
) -> Result<JsonValue, CompileError> {
    let Some(parameters) = function.as_object() else {
        return Err(CompileError::new("$", "Expected a function object."));
    };
    let kind = FunctionType::from_parameters(parameters, spec)?;
    let property = match parameters.get("property") {
        None => None,
        Some(JsonValue::String(property)) => Some(property.as_str()),
        Some(_) => {
            return Err(CompileError::new(
                "$.property",
                "Function property must be a string.",
            ));
        }
    };

    if kind == FunctionType::Exponential && !spec.is_interpolated() {
        return Err(CompileError::new(
            "$.type",
            format!(
                "Exponential functions are not supported for {} properties.",
                spec.kind.label()
            ),
        ));
    }

    if kind == FunctionType::Identity {
        let property = property.ok_or_else(|| {
            CompileError::new("$.property", "Identity functions require a property.")
        })?;
        return Ok(identity_expression(property, spec));
    }

    let stops = read_stops(parameters)?;
    let interpolation = match parameters.get("base") {
        None => json!(["linear"]),
        Some(base) => match base.as_f64() {
            Some(b) if b == 1.0 => json!(["linear"]),
            Some(_) => json!(["exponential", base]),
            None => {
                return Err(CompileError::new("$.base", "Function base must be a number."));
            }
        },
    };
    let fallback = parameters
        .get("default")
        .or(spec.default.as_ref())
        .map_or(JsonValue::Null, stop_output);

    let curve = Curve {
        kind,
        interpolation: &interpolation,
        fallback: &fallback,
    };
    let is_composite = stops.first().is_some_and(|(input, _)| input.is_object());
    let expression = match property {
        Some(property) if is_composite => curve.composite(property, &stops, spec)?,
        Some(property) => curve.property(property, &stops)?,
        None if is_composite => {
            return Err(CompileError::new(
                "$.property",
                "Zoom-and-property functions require a property.",
            ));
        }
        None => curve.zoom(&stops)?,
    };

    tracing::debug!("converted legacy {kind:?} function to {expression}");
    Ok(expression)
}

fn read_stops(parameters: &Map<String, JsonValue>) -> Result<Vec<Stop<'_>>, CompileError> {
    let stops = match parameters.get("stops") {
        Some(JsonValue::Array(stops)) if !stops.is_empty() => stops,
        Some(JsonValue::Array(_)) => {
            return Err(CompileError::new("$.stops", "Expected at least one stop."));
        }
        Some(_) => return Err(CompileError::new("$.stops", "Stops must be an array.")),
        None => return Err(CompileError::new("$.stops", "Function is missing stops.")),
    };

    stops
        .iter()
        .enumerate()
        .map(|(i, stop)| match stop.as_array().map(Vec::as_slice) {
            Some([input, output]) => Ok((input, output)),
            _ => Err(CompileError::new(
                format!("$.stops[{i}]"),
                "Each stop must be an [input, output] pair.",
            )),
        })
        .collect()
}

/// Array and object outputs must be quoted to stay literal.
fn stop_output(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Array(_) | JsonValue::Object(_) => json!(["literal", value]),
        _ => value.clone(),
    }
}

fn numeric_label(label: &JsonValue, index: usize) -> Result<JsonValue, CompileError> {
    if label.is_number() {
        Ok(label.clone())
    } else {
        Err(CompileError::new(
            format!("$.stops[{index}][0]"),
            format!("Stop inputs must be numbers, but found {label}."),
        ))
    }
}

fn identity_expression(property: &str, spec: &PropertySpec) -> JsonValue {
    let get = json!(["get", property]);
    match spec.kind {
        PropertyType::Color => json!(["to-color", get]),
        PropertyType::Number => json!(["number", get]),
        PropertyType::String | PropertyType::Enum => json!(["string", get]),
        PropertyType::Boolean => json!(["boolean", get]),
        PropertyType::Array => get,
    }
}

/// Shared settings for building the stop-based expression forms.
#[derive(Clone, Copy)]
struct Curve<'a> {
    kind: FunctionType,
    interpolation: &'a JsonValue,
    fallback: &'a JsonValue,
}

impl Curve<'_> {
    fn zoom(&self, stops: &[Stop<'_>]) -> Result<JsonValue, CompileError> {
        match self.kind {
            FunctionType::Categorical => Err(CompileError::new(
                "$.type",
                "Categorical functions require a property.",
            )),
            _ => {
                let stops = self.numeric_stops(stops)?;
                Ok(self.ordered(json!(["zoom"]), &stops))
            }
        }
    }

    fn property(&self, property: &str, stops: &[Stop<'_>]) -> Result<JsonValue, CompileError> {
        let get = json!(["get", property]);
        match self.kind {
            FunctionType::Categorical => {
                let stops: Vec<(JsonValue, JsonValue)> = stops
                    .iter()
                    .map(|(input, output)| ((*input).clone(), stop_output(output)))
                    .collect();
                Ok(self.categorical(get, &stops))
            }
            _ => {
                let stops = self.numeric_stops(stops)?;
                Ok(self.ordered(json!(["number", get]), &stops))
            }
        }
    }

    /// Group stops by zoom and nest a property curve under each zoom level.
    fn composite(
        &self,
        property: &str,
        stops: &[Stop<'_>],
        spec: &PropertySpec,
    ) -> Result<JsonValue, CompileError> {
        let mut groups: Vec<(&JsonValue, Vec<Stop<'_>>)> = Vec::new();
        for (i, (input, output)) in stops.iter().enumerate() {
            let (Some(zoom), Some(value)) = (input.get("zoom"), input.get("value")) else {
                return Err(CompileError::new(
                    format!("$.stops[{i}][0]"),
                    "Zoom-and-property stop inputs must have \"zoom\" and \"value\".",
                ));
            };
            numeric_label(zoom, i)?;
            if groups.last().is_none_or(|(last, _)| *last != zoom) {
                groups.push((zoom, Vec::new()));
            }
            if let Some((_, inner)) = groups.last_mut() {
                inner.push((value, output));
            }
        }

        let outer: Vec<(JsonValue, JsonValue)> = groups
            .iter()
            .map(|(zoom, inner)| Ok(((*zoom).clone(), self.property(property, inner)?)))
            .collect::<Result<_, CompileError>>()?;

        let outer_curve = Curve {
            kind: if spec.is_interpolated() && self.kind != FunctionType::Interval {
                FunctionType::Exponential
            } else {
                FunctionType::Interval
            },
            ..*self
        };
        Ok(outer_curve.ordered(json!(["zoom"]), &outer))
    }

    fn numeric_stops(&self, stops: &[Stop<'_>]) -> Result<Vec<(JsonValue, JsonValue)>, CompileError> {
        stops
            .iter()
            .enumerate()
            .map(|(i, (input, output))| Ok((numeric_label(input, i)?, stop_output(output))))
            .collect()
    }

    /// `interpolate` for exponential functions, `step` for interval ones.
    fn ordered(&self, input: JsonValue, stops: &[(JsonValue, JsonValue)]) -> JsonValue {
        let mut expression = Vec::with_capacity(stops.len() * 2 + 3);
        if self.kind == FunctionType::Exponential {
            expression.extend([json!("interpolate"), self.interpolation.clone(), input]);
            for (label, output) in stops {
                expression.extend([label.clone(), output.clone()]);
            }
        } else {
            expression.extend([json!("step"), input]);
            for (i, (label, output)) in stops.iter().enumerate() {
                if i > 0 {
                    expression.push(label.clone());
                }
                expression.push(output.clone());
            }
        }
        JsonValue::Array(expression)
    }

    /// `match` over stop inputs; repeated inputs keep their first output.
    fn categorical(&self, input: JsonValue, stops: &[(JsonValue, JsonValue)]) -> JsonValue {
        let mut expression = vec![json!("match"), input];
        let mut seen: Vec<&JsonValue> = Vec::with_capacity(stops.len());
        for (label, output) in stops {
            if seen.contains(&label) {
                continue;
            }
            seen.push(label);
            expression.extend([label.clone(), output.clone()]);
        }
        expression.push(self.fallback.clone());
        JsonValue::Array(expression)
    }
}
