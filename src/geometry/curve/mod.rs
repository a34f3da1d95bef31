pub(crate) mod bspline;
mod line;
mod nurbs;

pub use bspline::BSplineCurve;
pub use line::Line;
pub use nurbs::NurbsCurve;

use crate::error::{GeometryError, Result};
use crate::geometry::knots::{self, KNOT_TOLERANCE};
use crate::math::{Point3, Vector3};

/// Parameter domain for a curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveDomain {
    /// Start of the parameter range.
    pub t_min: f64,
    /// End of the parameter range.
    pub t_max: f64,
}

impl CurveDomain {
    /// Creates a new curve domain.
    #[must_use]
    pub fn new(t_min: f64, t_max: f64) -> Self {
        Self { t_min, t_max }
    }

    /// Length of the parameter range.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.t_max - self.t_min
    }

    /// Maps `t` into `[0, 1]`.
    #[must_use]
    pub fn normalize(&self, t: f64) -> f64 {
        (t - self.t_min) / self.length()
    }

    /// Clamps `t` into the domain, failing if it lies clearly outside.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::ParameterOutOfRange`] if `t` is further than a
    /// relative `1e-9` outside the domain.
    pub fn clamp(&self, t: f64) -> Result<f64> {
        let slack = 1e-9 * self.length().abs().max(1.0);
        if !t.is_finite() || t < self.t_min - slack || t > self.t_max + slack {
            return Err(GeometryError::ParameterOutOfRange {
                parameter: "t",
                value: t,
                min: self.t_min,
                max: self.t_max,
            }
            .into());
        }
        Ok(t.clamp(self.t_min, self.t_max))
    }
}

/// Trait for parametric curves in 3D space.
pub trait Curve {
    /// Evaluates the curve at parameter `t`, returning the 3D point.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter is out of range.
    fn evaluate(&self, t: f64) -> Result<Point3>;

    /// Position and derivatives up to `order` at `t`.
    ///
    /// Element `k` is the `k`-th derivative; element 0 holds the position.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter is out of range.
    fn derivatives(&self, t: f64, order: usize) -> Result<Vec<Vector3>>;

    /// First derivative at `t` (not normalized).
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter is out of range.
    fn tangent(&self, t: f64) -> Result<Vector3> {
        let ders = self.derivatives(t, 1)?;
        Ok(ders[1])
    }

    /// Returns the parameter domain of the curve.
    fn domain(&self) -> CurveDomain;

    /// Polynomial degree of the curve.
    fn degree(&self) -> usize;

    /// Full clamped knot vector.
    fn knot_vector(&self) -> Vec<f64>;

    /// Distinct knot values, including the domain ends.
    fn breakpoints(&self) -> Vec<f64> {
        let knots = self.knot_vector();
        let tol = KNOT_TOLERANCE * self.domain().length();
        knots::distinct(&knots, tol)
            .into_iter()
            .map(|(value, _)| value)
            .collect()
    }
}

/// The curve types a profile/guide network may contain.
#[derive(Debug, Clone)]
pub enum NetworkCurve {
    Line(Line),
    BSpline(BSplineCurve),
    Nurbs(NurbsCurve),
}

impl NetworkCurve {
    /// The same curve traversed in the opposite direction over the same domain.
    #[must_use]
    pub fn reversed(&self) -> Self {
        match self {
            Self::Line(line) => Self::Line(line.reversed()),
            Self::BSpline(curve) => Self::BSpline(curve.reversed()),
            Self::Nurbs(curve) => Self::Nurbs(curve.reversed()),
        }
    }

    /// Control points (end points for lines), used for extents.
    #[must_use]
    pub fn control_points(&self) -> Vec<Point3> {
        match self {
            Self::Line(line) => vec![*line.start(), *line.end()],
            Self::BSpline(curve) => curve.control_points().to_vec(),
            Self::Nurbs(curve) => curve.control_points().to_vec(),
        }
    }
}

impl Curve for NetworkCurve {
    fn evaluate(&self, t: f64) -> Result<Point3> {
        match self {
            Self::Line(c) => c.evaluate(t),
            Self::BSpline(c) => c.evaluate(t),
            Self::Nurbs(c) => c.evaluate(t),
        }
    }

    fn derivatives(&self, t: f64, order: usize) -> Result<Vec<Vector3>> {
        match self {
            Self::Line(c) => c.derivatives(t, order),
            Self::BSpline(c) => c.derivatives(t, order),
            Self::Nurbs(c) => c.derivatives(t, order),
        }
    }

    fn domain(&self) -> CurveDomain {
        match self {
            Self::Line(c) => c.domain(),
            Self::BSpline(c) => c.domain(),
            Self::Nurbs(c) => c.domain(),
        }
    }

    fn degree(&self) -> usize {
        match self {
            Self::Line(c) => c.degree(),
            Self::BSpline(c) => c.degree(),
            Self::Nurbs(c) => c.degree(),
        }
    }

    fn knot_vector(&self) -> Vec<f64> {
        match self {
            Self::Line(c) => c.knot_vector(),
            Self::BSpline(c) => c.knot_vector(),
            Self::Nurbs(c) => c.knot_vector(),
        }
    }
}

impl From<Line> for NetworkCurve {
    fn from(line: Line) -> Self {
        Self::Line(line)
    }
}

impl From<BSplineCurve> for NetworkCurve {
    fn from(curve: BSplineCurve) -> Self {
        Self::BSpline(curve)
    }
}

impl From<NurbsCurve> for NetworkCurve {
    fn from(curve: NurbsCurve) -> Self {
        Self::Nurbs(curve)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn domain_clamp_tolerates_round_off() {
        let domain = CurveDomain::new(0.0, 2.0);
        assert!((domain.clamp(2.0 + 1e-12).unwrap() - 2.0).abs() < f64::EPSILON);
        assert!(domain.clamp(2.1).is_err());
        assert!(domain.clamp(f64::NAN).is_err());
        assert!((domain.normalize(0.5) - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn network_curve_dispatch() {
        let line: NetworkCurve = Line::new(Point3::origin(), Point3::new(2.0, 0.0, 0.0))
            .unwrap()
            .into();
        assert_eq!(line.degree(), 1);
        assert_eq!(line.breakpoints(), vec![0.0, 1.0]);
        let p = line.evaluate(0.5).unwrap();
        assert!((p - Point3::new(1.0, 0.0, 0.0)).norm() < 1e-12);
        let reversed = line.reversed();
        let q = reversed.evaluate(0.25).unwrap();
        assert!((q - Point3::new(1.5, 0.0, 0.0)).norm() < 1e-12);
    }
}
