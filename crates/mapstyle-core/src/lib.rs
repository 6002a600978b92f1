//! Mapstyle Core — normalized, evaluable style-property declarations.
//!
//! A [`StyleDeclaration`] takes one author-supplied property value (a
//! constant, a color string, an expression, or a legacy stop function),
//! compiles it once against the property's [`PropertySpec`], and answers
//! renderer queries (`calculate`, `interpolation_factor`) from then on.

pub mod declaration;
pub mod reference;
pub mod snapshot;

// Re-exports for convenience.
pub use declaration::{
    AuthoredShape, ConstantExpression, DeclarationError, StyleDeclaration,
    normalize_to_expression,
};
pub use reference::{PropertyReference, ReferenceError};
pub use snapshot::canonical_json;

pub use mapstyle_expr::{
    Color, EvaluationError, Feature, GlobalProperties, PropertySpec, PropertyType, Value,
};
