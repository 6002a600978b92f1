//! Mapstyle Expr — the evaluation machinery behind style declarations.
//!
//! This crate contains the runtime value model, color parsing, property
//! specifications, the JSON expression compiler and evaluator, zoom-curve
//! interpolation math, and the converter from legacy stop functions to
//! expressions. It has no knowledge of layers or declarations.

pub mod color;
pub mod context;
pub mod error;
pub mod expression;
pub mod function;
pub mod spec;
pub mod value;

// Re-exports for convenience.
pub use color::{Color, ColorParseError, parse_color};
pub use context::{Feature, GlobalProperties};
pub use error::{CompileError, EvaluationError, EvaluationErrorKind};
pub use expression::curve::{Interpolation, ZoomCurve, interpolation_factor};
pub use expression::{
    CompiledExpression, CreateOptions, StyleExpression, create_expression, is_expression,
};
pub use function::convert_function;
pub use spec::{FunctionKind, PropertySpec, PropertyType};
pub use value::{Value, ValueType};
