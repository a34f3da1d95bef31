use crate::error::{InterpolationError, Result};
use crate::geometry::{BSplineCurve, BSplineSurface};
use crate::math::Point3;

use super::interpolate_curve::{transversal_degree, InterpolateCurve};
use super::skin::SkinCurves;

/// Tensor-product interpolation of a point grid.
///
/// `points[i][j]` is matched at `(params_u[j], params_v[i])`: each row is
/// interpolated along `u`, then the row curves are skinned along `v`.
pub struct InterpolateGrid<'a> {
    points: &'a [Vec<Point3>],
    params_u: &'a [f64],
    params_v: &'a [f64],
    closed_u: bool,
    closed_v: bool,
    max_degree: usize,
}

impl<'a> InterpolateGrid<'a> {
    /// Creates a new `InterpolateGrid` operation.
    #[must_use]
    pub fn new(
        points: &'a [Vec<Point3>],
        params_u: &'a [f64],
        params_v: &'a [f64],
        max_degree: usize,
    ) -> Self {
        Self {
            points,
            params_u,
            params_v,
            closed_u: false,
            closed_v: false,
            max_degree,
        }
    }

    /// Sets which directions are closed.
    #[must_use]
    pub fn closed(mut self, closed_u: bool, closed_v: bool) -> Self {
        self.closed_u = closed_u;
        self.closed_v = closed_v;
        self
    }

    /// Executes the interpolation.
    ///
    /// # Errors
    ///
    /// Returns [`InterpolationError::SingularSystem`] if the grid shape does
    /// not match the parameters or an interpolation system is singular.
    pub fn execute(&self) -> Result<BSplineSurface> {
        let rows = self.points.len();
        let cols = self.params_u.len();
        if rows != self.params_v.len() || self.points.iter().any(|row| row.len() != cols) {
            return Err(InterpolationError::SingularSystem(format!(
                "grid does not match {cols} x {} parameters",
                self.params_v.len()
            ))
            .into());
        }

        let degree_u = transversal_degree(cols, self.closed_u, self.max_degree);
        let curves = self
            .points
            .iter()
            .map(|row| {
                InterpolateCurve::new(row, self.params_u, degree_u)
                    .closed(self.closed_u)
                    .execute()
            })
            .collect::<Result<Vec<BSplineCurve>>>()?;

        SkinCurves::new(&curves, self.params_v, self.max_degree)
            .closed(self.closed_v)
            .execute()
    }
}
