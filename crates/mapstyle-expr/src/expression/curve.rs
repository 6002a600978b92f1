//! Zoom-curve metadata and interpolation-factor math.
//!
//! The factor `t` returned by [`interpolation_factor`] says how far `input`
//! sits between `lower` and `upper` under a given interpolation kind:
//! ```text
//! linear:       t = (input − lower) / (upper − lower)
//! exponential:  t = (base^(input − lower) − 1) / (base^(upper − lower) − 1)
//! cubic-bezier: t = bezier_y(solve_x(linear t))
//! step:         t = 0
//! ```

/// How values blend between adjacent stops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interpolation {
    /// No blending; the lower stop's value holds until the next stop.
    Step,
    Linear,
    /// Exponential ease; `base = 1` is linear.
    Exponential { base: f64 },
    /// CSS-style cubic bezier through `(0, 0)`, `(x1, y1)`, `(x2, y2)`, `(1, 1)`.
    CubicBezier { x1: f64, y1: f64, x2: f64, y2: f64 },
}

/// Interpolation kind and stop labels of a zoom-dependent expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomCurve {
    pub interpolation: Interpolation,
    /// Zoom levels of the stops, strictly ascending.
    pub labels: Vec<f64>,
}

/// Blend weight of `input` between `lower` and `upper`.
///
/// Bounds are not validated; a zero-width range yields `0`.
pub fn interpolation_factor(interpolation: Interpolation, input: f64, lower: f64, upper: f64) -> f64 {
    match interpolation {
        Interpolation::Step => 0.0,
        Interpolation::Linear => exponential_interpolation(input, 1.0, lower, upper),
        Interpolation::Exponential { base } => exponential_interpolation(input, base, lower, upper),
        Interpolation::CubicBezier { x1, y1, x2, y2 } => {
            let t = exponential_interpolation(input, 1.0, lower, upper);
            UnitBezier::new(x1, y1, x2, y2).solve(t, 1e-6)
        }
    }
}

fn exponential_interpolation(input: f64, base: f64, lower: f64, upper: f64) -> f64 {
    let difference = upper - lower;
    let progress = input - lower;

    if difference == 0.0 {
        0.0
    } else if base == 1.0 {
        progress / difference
    } else {
        (base.powf(progress) - 1.0) / (base.powf(difference) - 1.0)
    }
}

/// Cubic bezier with fixed endpoints `(0, 0)` and `(1, 1)`, stored as
/// polynomial coefficients.
struct UnitBezier {
    ax: f64,
    bx: f64,
    cx: f64,
    ay: f64,
    by: f64,
    cy: f64,
}

impl UnitBezier {
    fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let cx = 3.0 * x1;
        let bx = 3.0 * (x2 - x1) - cx;
        let cy = 3.0 * y1;
        let by = 3.0 * (y2 - y1) - cy;
        Self {
            ax: 1.0 - cx - bx,
            bx,
            cx,
            ay: 1.0 - cy - by,
            by,
            cy,
        }
    }

    fn sample_x(&self, t: f64) -> f64 {
        ((self.ax * t + self.bx) * t + self.cx) * t
    }

    fn sample_y(&self, t: f64) -> f64 {
        ((self.ay * t + self.by) * t + self.cy) * t
    }

    fn sample_derivative_x(&self, t: f64) -> f64 {
        (3.0 * self.ax * t + 2.0 * self.bx) * t + self.cx
    }

    /// Find the curve parameter whose x equals `x`.
    ///
    /// Newton-Raphson first; bisection when the derivative vanishes or
    /// Newton does not converge.
    fn solve_x(&self, x: f64, epsilon: f64) -> f64 {
        let mut t = x;
        for _ in 0..8 {
            let error = self.sample_x(t) - x;
            if error.abs() < epsilon {
                return t;
            }
            let derivative = self.sample_derivative_x(t);
            if derivative.abs() < 1e-6 {
                break;
            }
            t -= error / derivative;
        }

        let (mut lo, mut hi) = (0.0, 1.0);
        if x <= lo {
            return lo;
        }
        if x >= hi {
            return hi;
        }

        t = x;
        for _ in 0..64 {
            let sample = self.sample_x(t);
            if (sample - x).abs() < epsilon {
                break;
            }
            if x > sample {
                lo = t;
            } else {
                hi = t;
            }
            t = lo + (hi - lo) * 0.5;
        }
        t
    }

    fn solve(&self, x: f64, epsilon: f64) -> f64 {
        self.sample_y(self.solve_x(x, epsilon))
    }
}
