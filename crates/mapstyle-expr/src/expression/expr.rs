//! Typed expression tree produced by the parser.

use crate::expression::curve::Interpolation;
use crate::value::{Value, ValueType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Power,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ComparisonOp {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Value),
    /// Feature property lookup by key.
    Get(Box<Expr>),
    Has(Box<Expr>),
    Properties,
    Id,
    GeometryType,
    Zoom,
    Arithmetic {
        op: ArithmeticOp,
        args: Vec<Expr>,
    },
    Comparison {
        op: ComparisonOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Not(Box<Expr>),
    All(Vec<Expr>),
    Any(Vec<Expr>),
    Case {
        branches: Vec<(Expr, Expr)>,
        otherwise: Box<Expr>,
    },
    Match {
        input: Box<Expr>,
        branches: Vec<(Vec<Value>, Expr)>,
        otherwise: Box<Expr>,
    },
    Coalesce(Vec<Expr>),
    /// Returns the first argument whose runtime type matches `target`.
    Assertion {
        target: ValueType,
        args: Vec<Expr>,
    },
    /// Converts the first convertible argument to `target`.
    Coercion {
        target: ValueType,
        args: Vec<Expr>,
    },
    Rgba(Vec<Expr>),
    Step {
        input: Box<Expr>,
        first: Box<Expr>,
        stops: Vec<(f64, Expr)>,
    },
    Interpolate {
        interpolation: Interpolation,
        input: Box<Expr>,
        stops: Vec<(f64, Expr)>,
    },
}

impl Expr {
    fn for_each_child(&self, f: &mut dyn FnMut(&Expr)) {
        match self {
            Self::Literal(_)
            | Self::Properties
            | Self::Id
            | Self::GeometryType
            | Self::Zoom => {}
            Self::Get(key) | Self::Has(key) => f(key),
            Self::Not(arg) => f(arg),
            Self::Arithmetic { args, .. }
            | Self::Assertion { args, .. }
            | Self::Coercion { args, .. }
            | Self::All(args)
            | Self::Any(args)
            | Self::Coalesce(args)
            | Self::Rgba(args) => args.iter().for_each(|arg| f(arg)),
            Self::Comparison { lhs, rhs, .. } => {
                f(lhs);
                f(rhs);
            }
            Self::Case {
                branches,
                otherwise,
            } => {
                for (condition, output) in branches {
                    f(condition);
                    f(output);
                }
                f(otherwise);
            }
            Self::Match {
                input,
                branches,
                otherwise,
            } => {
                f(input);
                branches.iter().for_each(|(_, output)| f(output));
                f(otherwise);
            }
            Self::Step {
                input,
                first,
                stops,
            } => {
                f(input);
                f(first);
                stops.iter().for_each(|(_, output)| f(output));
            }
            Self::Interpolate { input, stops, .. } => {
                f(input);
                stops.iter().for_each(|(_, output)| f(output));
            }
        }
    }

    fn all_children(&self, predicate: fn(&Expr) -> bool) -> bool {
        let mut result = true;
        self.for_each_child(&mut |child| result = result && predicate(child));
        result
    }

    /// True when no node reads feature data.
    pub(crate) fn is_feature_constant(&self) -> bool {
        match self {
            Self::Get(_) | Self::Has(_) | Self::Properties | Self::Id | Self::GeometryType => false,
            _ => self.all_children(Expr::is_feature_constant),
        }
    }

    /// True when no node reads the zoom level.
    pub(crate) fn is_zoom_constant(&self) -> bool {
        match self {
            Self::Zoom => false,
            _ => self.all_children(Expr::is_zoom_constant),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(key: &str) -> Expr {
        Expr::Get(Box::new(Expr::Literal(Value::from(key))))
    }

    #[test]
    fn test_literal_is_constant() {
        let expr = Expr::Literal(Value::Number(1.0));
        assert!(expr.is_feature_constant());
        assert!(expr.is_zoom_constant());
    }

    #[test]
    fn test_nested_get_marks_feature_dependent() {
        let expr = Expr::Arithmetic {
            op: ArithmeticOp::Multiply,
            args: vec![Expr::Literal(Value::Number(-1.0)), get("x")],
        };
        assert!(!expr.is_feature_constant());
        assert!(expr.is_zoom_constant());
    }

    #[test]
    fn test_zoom_in_step_input_marks_zoom_dependent() {
        let expr = Expr::Step {
            input: Box::new(Expr::Zoom),
            first: Box::new(Expr::Literal(Value::Number(0.0))),
            stops: vec![(5.0, Expr::Literal(Value::Number(1.0)))],
        };
        assert!(!expr.is_zoom_constant());
        assert!(expr.is_feature_constant());
    }
}
