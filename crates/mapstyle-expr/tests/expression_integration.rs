use mapstyle_expr::{
    Color, CreateOptions, Feature, GlobalProperties, Interpolation, PropertySpec, PropertyType,
    StyleExpression, Value, convert_function, create_expression, interpolation_factor,
};
use proptest::prelude::*;
use serde_json::json;

/// Compile a legacy function the way declarations do.
fn compile_function(
    function: serde_json::Value,
    spec: &PropertySpec,
) -> mapstyle_expr::CompiledExpression {
    let converted = convert_function(&function, spec).expect("function should convert");
    let options = CreateOptions {
        default_value: function.get("default").cloned(),
        is_converted_function: true,
    };
    create_expression(&converted, spec, options).expect("converted function should compile")
}

#[test]
fn categorical_color_function_falls_back_to_default() {
    let spec = PropertySpec::new(PropertyType::Color);
    let compiled = compile_function(
        json!({
            "type": "categorical",
            "property": "kind",
            "default": "#0000ff",
            "stops": [["park", "#00ff00"], ["water", "#00ffff"]]
        }),
        &spec,
    );
    assert!(compiled.is_converted_function());

    let park = Feature::new().with_property("kind", "park");
    let road = Feature::new().with_property("kind", "road");
    let globals = GlobalProperties::default();
    assert_eq!(
        compiled.evaluate(&globals, Some(&park)).unwrap(),
        Value::Color(Color::new(0.0, 1.0, 0.0, 1.0))
    );
    assert_eq!(
        compiled.evaluate(&globals, Some(&road)).unwrap(),
        Value::Color(Color::new(0.0, 0.0, 1.0, 1.0))
    );
}

#[test]
fn interval_zoom_function_steps() {
    let spec = PropertySpec::new(PropertyType::Number);
    let compiled = compile_function(
        json!({"type": "interval", "stops": [[0, 1], [5, 2], [10, 3]]}),
        &spec,
    );
    let curve = compiled.zoom_curve().expect("zoom curve");
    assert_eq!(curve.interpolation, Interpolation::Step);
    assert_eq!(curve.labels, vec![5.0, 10.0]);

    let at = |zoom| compiled.evaluate(&GlobalProperties::at_zoom(zoom), None).unwrap();
    assert_eq!(at(0.0), Value::Number(1.0));
    assert_eq!(at(7.0), Value::Number(2.0));
    assert_eq!(at(10.0), Value::Number(3.0));
}

#[test]
fn missing_zoom_is_an_evaluation_error() {
    let spec = PropertySpec::new(PropertyType::Number);
    let compiled = create_expression(
        &json!(["interpolate", ["linear"], ["zoom"], 0, 0, 10, 10]),
        &spec,
        CreateOptions::default(),
    )
    .unwrap();
    assert!(compiled.evaluate(&GlobalProperties::default(), None).is_err());
}

proptest! {
    #[test]
    fn linear_factor_stays_in_unit_range(
        lower in -50.0..50.0f64,
        width in 0.0..50.0f64,
        fraction in 0.0..=1.0f64,
    ) {
        let upper = lower + width;
        let t = interpolation_factor(Interpolation::Linear, lower + fraction * width, lower, upper);
        prop_assert!((-1e-9..=1.0 + 1e-9).contains(&t));
    }

    #[test]
    fn exponential_factor_is_monotonic(
        base in 1.01..4.0f64,
        a in 0.0..=1.0f64,
        b in 0.0..=1.0f64,
    ) {
        let interpolation = Interpolation::Exponential { base };
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let t_low = interpolation_factor(interpolation, low * 10.0, 0.0, 10.0);
        let t_high = interpolation_factor(interpolation, high * 10.0, 0.0, 10.0);
        prop_assert!(t_low <= t_high + 1e-12);
    }
}
