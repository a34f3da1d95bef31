use tracing::debug;

use crate::error::{InterpolationError, Result};
use crate::geometry::{BSplineCurve, BSplineSurface};
use crate::math::Point3;
use crate::operations::modification::MakeCurvesCompatible;

use super::interpolate_curve::{transversal_degree, InterpolateCurve};

/// Skins a surface through a family of curves.
///
/// The curves are made compatible and each control point index is
/// interpolated across the family at `params`. The resulting surface runs
/// along the curves in `u` and across them in `v`, with `S(·, params[k])`
/// equal to curve `k`.
pub struct SkinCurves<'a> {
    curves: &'a [BSplineCurve],
    params: &'a [f64],
    closed: bool,
    max_degree: usize,
}

impl<'a> SkinCurves<'a> {
    /// Creates a new `SkinCurves` operation.
    #[must_use]
    pub fn new(curves: &'a [BSplineCurve], params: &'a [f64], max_degree: usize) -> Self {
        Self {
            curves,
            params,
            closed: false,
            max_degree,
        }
    }

    /// Marks the family as closed: the first and last curves coincide and
    /// the surface is made seam-continuous across them.
    #[must_use]
    pub fn closed(mut self, closed: bool) -> Self {
        self.closed = closed;
        self
    }

    /// Executes the skinning.
    ///
    /// # Errors
    ///
    /// Returns [`InterpolationError::SingularSystem`] if there are fewer than
    /// two curves or the parameters do not match them, and
    /// [`InterpolationError::IncompatibleBasis`] if the curves cannot share a
    /// basis.
    pub fn execute(&self) -> Result<BSplineSurface> {
        let count = self.curves.len();
        if count < 2 || count != self.params.len() {
            return Err(InterpolationError::SingularSystem(format!(
                "cannot skin {count} curves at {} parameters",
                self.params.len()
            ))
            .into());
        }

        let curves = MakeCurvesCompatible::new(self.curves).execute()?;
        let degree_v = transversal_degree(count, self.closed, self.max_degree);
        let n_ctrl = curves[0].control_points().len();
        debug!(
            curves = count,
            degree_u = curves[0].degree(),
            degree_v,
            control_points = n_ctrl,
            closed = self.closed,
            "skinning curve family"
        );

        let mut knots_v = Vec::new();
        let mut grid: Vec<Vec<Point3>> = Vec::with_capacity(n_ctrl);
        for k in 0..n_ctrl {
            let column: Vec<Point3> = curves.iter().map(|c| c.control_points()[k]).collect();
            let section = InterpolateCurve::new(&column, self.params, degree_v)
                .closed(self.closed)
                .execute()?;
            knots_v = section.knots().to_vec();
            grid.push(section.control_points().to_vec());
        }

        BSplineSurface::new(
            curves[0].degree(),
            degree_v,
            curves[0].knots().to_vec(),
            knots_v,
            grid,
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::knots;
    use crate::geometry::{Curve, Surface};
    use crate::math::linspace;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn arch(y: f64, height: f64) -> BSplineCurve {
        BSplineCurve::new(
            2,
            knots::clamped(2, &[], 0.0, 1.0),
            vec![p(0.0, y, 0.0), p(0.5, y, height), p(1.0, y, 0.0)],
        )
        .unwrap()
    }

    #[test]
    fn surface_contains_every_section() {
        let curves = [arch(0.0, 1.0), arch(1.0, 2.0), arch(2.5, 0.5), arch(3.0, 1.0)];
        let params = [0.0, 0.3, 0.8, 1.0];
        let surface = SkinCurves::new(&curves, &params, 3).execute().unwrap();
        assert_eq!(surface.degree_u(), 2);
        assert_eq!(surface.degree_v(), 3);
        for (curve, v) in curves.iter().zip(params) {
            for u in linspace(0.0, 1.0, 9) {
                let d = surface.evaluate(u, v).unwrap() - curve.evaluate(u).unwrap();
                assert!(d.norm() < 1e-10);
            }
        }
    }

    #[test]
    fn mixed_degrees_are_unified() {
        let line = BSplineCurve::new(1, vec![0.0, 0.0, 1.0, 1.0], vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0)])
            .unwrap();
        let curves = [line, arch(1.0, 1.0)];
        let surface = SkinCurves::new(&curves, &[0.0, 1.0], 3).execute().unwrap();
        assert_eq!(surface.degree_u(), 2);
        assert_eq!(surface.degree_v(), 1);
        let mid = surface.evaluate(0.5, 1.0).unwrap();
        assert!((mid - p(0.5, 1.0, 0.5)).norm() < 1e-12);
    }

    #[test]
    fn single_curve_is_rejected() {
        let curves = [arch(0.0, 1.0)];
        assert!(SkinCurves::new(&curves, &[0.0], 3).execute().is_err());
    }
}
