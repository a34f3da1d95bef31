use crate::error::{InterpolationError, Result};
use crate::geometry::basis::basis_matrix;
use crate::geometry::BSplineCurve;
use crate::math::{linalg, Point3, Vector3};

/// Least-squares B-spline fit with hard interpolation constraints.
///
/// The degree and knot vector are fixed by the caller; the fit minimises the
/// squared distance to the samples while passing exactly through every
/// constraint point. With seam continuity the first derivatives at both
/// domain ends are forced equal.
pub struct FitCurve<'a> {
    degree: usize,
    knots: &'a [f64],
    samples: Vec<(f64, Point3)>,
    constraints: Vec<(f64, Point3)>,
    seam_continuity: bool,
}

impl<'a> FitCurve<'a> {
    /// Creates a fit of `degree` over `knots` to the `(parameter, point)` samples.
    #[must_use]
    pub fn new(degree: usize, knots: &'a [f64], samples: Vec<(f64, Point3)>) -> Self {
        Self {
            degree,
            knots,
            samples,
            constraints: Vec::new(),
            seam_continuity: false,
        }
    }

    /// Requires the curve to pass through the `(parameter, point)` pairs.
    #[must_use]
    pub fn interpolating(mut self, constraints: Vec<(f64, Point3)>) -> Self {
        self.constraints = constraints;
        self
    }

    /// Requires equal first derivatives at both domain ends.
    #[must_use]
    pub fn seam_continuity(mut self, enabled: bool) -> Self {
        self.seam_continuity = enabled;
        self
    }

    /// Executes the fit.
    ///
    /// # Errors
    ///
    /// Returns [`InterpolationError::SingularSystem`] if the constrained
    /// system has no unique solution, or a geometry error if the knot vector
    /// is invalid for the degree.
    pub fn execute(&self) -> Result<BSplineCurve> {
        let degree = self.degree;
        let n_ctrl = self.knots.len().saturating_sub(degree + 1);
        if n_ctrl < degree + 1 {
            return Err(InterpolationError::SingularSystem(format!(
                "{} knots are too few for degree {degree}",
                self.knots.len()
            ))
            .into());
        }

        let (sample_params, sample_points): (Vec<f64>, Vec<Vector3>) =
            self.samples.iter().map(|(t, p)| (*t, p.coords)).unzip();
        let a = basis_matrix(degree, self.knots, n_ctrl, &sample_params, 0);

        let (mut params, mut rhs): (Vec<f64>, Vec<Vector3>) =
            self.constraints.iter().map(|(t, p)| (*t, p.coords)).unzip();
        let mut c = basis_matrix(degree, self.knots, n_ctrl, &params, 0);
        if self.seam_continuity && degree >= 2 {
            let start = self.knots[degree];
            let end = self.knots[n_ctrl];
            let row = basis_matrix(degree, self.knots, n_ctrl, &[start], 1)
                - basis_matrix(degree, self.knots, n_ctrl, &[end], 1);
            c = c.insert_row(params.len(), 0.0);
            c.view_mut((params.len(), 0), (1, n_ctrl)).copy_from(&row);
            params.push(end);
            rhs.push(Vector3::zeros());
        }

        let solution = linalg::solve_constrained_least_squares(&a, &sample_points, &c, &rhs)
            .ok_or_else(|| {
                InterpolationError::SingularSystem(format!(
                    "fit of {} samples with {} constraints over {n_ctrl} control points",
                    self.samples.len(),
                    params.len()
                ))
            })?;
        BSplineCurve::new(
            degree,
            self.knots.to_vec(),
            solution.into_iter().map(Point3::from).collect(),
        )
    }
}
