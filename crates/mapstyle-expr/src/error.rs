use crate::value::ValueType;

/// An expression (or converted legacy function) failed to compile.
///
/// `key` locates the offending node in the JSON tree, e.g. `$[2][1]`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{key}: {message}")]
pub struct CompileError {
    pub key: String,
    pub message: String,
}

impl CompileError {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// The kind of evaluation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationErrorKind {
    /// A value had the wrong runtime type.
    TypeMismatch,
    /// The expression reads zoom but no zoom was supplied.
    MissingZoom,
    /// A value could not be converted to a color.
    InvalidColor,
    /// An argument was outside its valid domain.
    InvalidArgument,
}

/// A compiled expression could not produce a value for the given context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct EvaluationError {
    pub kind: EvaluationErrorKind,
    pub message: String,
}

impl EvaluationError {
    pub fn new(kind: EvaluationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn type_mismatch(expected: &ValueType, actual: &ValueType) -> Self {
        Self::new(
            EvaluationErrorKind::TypeMismatch,
            format!("Expected value to be of type {expected}, but found {actual} instead."),
        )
    }

    pub fn missing_zoom() -> Self {
        Self::new(
            EvaluationErrorKind::MissingZoom,
            "The \"zoom\" expression requires a zoom level, but none was provided.",
        )
    }

    pub fn invalid_color(value: impl std::fmt::Display) -> Self {
        Self::new(
            EvaluationErrorKind::InvalidColor,
            format!("Could not parse color from value '{value}'"),
        )
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(EvaluationErrorKind::InvalidArgument, message)
    }
}
