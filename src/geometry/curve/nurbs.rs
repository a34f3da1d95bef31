use crate::error::{GeometryError, Result};
use crate::geometry::basis::{basis_function_derivatives, find_span};
use crate::geometry::knots;
use crate::math::{binomial, Point3, Vector3, Vector4};

use super::{Curve, CurveDomain};

/// A rational B-spline curve.
///
/// Evaluated in homogeneous space: `C(t) = Σ N_i w_i P_i / Σ N_i w_i`.
#[derive(Debug, Clone)]
pub struct NurbsCurve {
    degree: usize,
    knots: Vec<f64>,
    control_points: Vec<Point3>,
    weights: Vec<f64>,
}

impl NurbsCurve {
    /// Creates a new NURBS curve.
    ///
    /// # Errors
    ///
    /// Returns an error if the knot vector is invalid, the weight count does
    /// not match the control points, or a weight is not strictly positive.
    pub fn new(
        degree: usize,
        knots: Vec<f64>,
        control_points: Vec<Point3>,
        weights: Vec<f64>,
    ) -> Result<Self> {
        knots::validate(degree, &knots, control_points.len())?;
        if weights.len() != control_points.len() {
            return Err(GeometryError::InvalidControlPoints(format!(
                "{} weights for {} control points",
                weights.len(),
                control_points.len()
            ))
            .into());
        }
        if weights.iter().any(|w| !w.is_finite() || *w <= 0.0) {
            return Err(
                GeometryError::InvalidControlPoints("weights must be positive".into()).into(),
            );
        }
        Ok(Self {
            degree,
            knots,
            control_points,
            weights,
        })
    }

    /// Returns the polynomial degree.
    #[must_use]
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Returns the knot vector.
    #[must_use]
    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    /// Returns the control points.
    #[must_use]
    pub fn control_points(&self) -> &[Point3] {
        &self.control_points
    }

    /// Returns the control point weights.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// The same curve traversed in the opposite direction over the same domain.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            degree: self.degree,
            knots: knots::reversed(&self.knots),
            control_points: self.control_points.iter().rev().copied().collect(),
            weights: self.weights.iter().rev().copied().collect(),
        }
    }

    fn homogeneous(&self, index: usize) -> Vector4 {
        let w = self.weights[index];
        let p = self.control_points[index];
        Vector4::new(p.x * w, p.y * w, p.z * w, w)
    }
}

impl Curve for NurbsCurve {
    fn evaluate(&self, t: f64) -> Result<Point3> {
        let ders = self.derivatives(t, 0)?;
        Ok(Point3::from(ders[0]))
    }

    fn derivatives(&self, t: f64, order: usize) -> Result<Vec<Vector3>> {
        let t = self.domain().clamp(t)?;
        let n = self.control_points.len();
        let span = find_span(self.degree, &self.knots, n, t);
        let basis = basis_function_derivatives(self.degree, &self.knots, span, t, order);

        let homogeneous: Vec<Vector4> = basis
            .iter()
            .map(|row| {
                row.iter().enumerate().fold(Vector4::zeros(), |acc, (j, b)| {
                    acc + self.homogeneous(span - self.degree + j) * *b
                })
            })
            .collect();

        let w0 = homogeneous[0].w;
        let mut ders: Vec<Vector3> = Vec::with_capacity(order + 1);
        for k in 0..=order {
            let mut v = homogeneous[k].xyz();
            for i in 1..=k {
                v -= ders[k - i] * (binomial(k, i) * homogeneous[i].w);
            }
            ders.push(v / w0);
        }
        Ok(ders)
    }

    fn domain(&self) -> CurveDomain {
        let (start, end) = knots::domain(self.degree, &self.knots);
        CurveDomain::new(start, end)
    }

    fn degree(&self) -> usize {
        self.degree
    }

    fn knot_vector(&self) -> Vec<f64> {
        self.knots.clone()
    }
}
