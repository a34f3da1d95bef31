use crate::error::{InterpolationError, Result};
use crate::geometry::basis::basis_matrix;
use crate::geometry::knots;
use crate::geometry::BSplineCurve;
use crate::math::{linalg, Point3, Vector3};

/// Degree used to interpolate across `count` curves or points.
///
/// Open families use `min(max_degree, count - 1)`. Closed families (whose
/// first and last entries coincide) need an odd degree for the periodic
/// system and round down.
#[must_use]
pub fn transversal_degree(count: usize, closed: bool, max_degree: usize) -> usize {
    let degree = max_degree.min(count.saturating_sub(1)).max(1);
    if closed && degree % 2 == 0 {
        degree - 1
    } else {
        degree
    }
}

/// Global B-spline interpolation of points at given parameters.
///
/// Open curves use knots by averaging. Closed curves (first and last points
/// equal) place the interior knots at the interior parameters and add
/// derivative continuity rows `C⁽ᵏ⁾(start) = C⁽ᵏ⁾(end)` for `k < degree`.
pub struct InterpolateCurve<'a> {
    points: &'a [Point3],
    params: &'a [f64],
    degree: usize,
    closed: bool,
}

impl<'a> InterpolateCurve<'a> {
    /// Creates a new `InterpolateCurve` operation.
    ///
    /// The degree is lowered to `points.len() - 1` when there are too few points.
    #[must_use]
    pub fn new(points: &'a [Point3], params: &'a [f64], degree: usize) -> Self {
        Self {
            points,
            params,
            degree,
            closed: false,
        }
    }

    /// Requests a closed (seam-continuous) interpolant.
    #[must_use]
    pub fn closed(mut self, closed: bool) -> Self {
        self.closed = closed;
        self
    }

    /// Executes the interpolation.
    ///
    /// # Errors
    ///
    /// Returns [`InterpolationError::SingularSystem`] if points and parameters
    /// disagree in count, the parameters are not strictly increasing, there
    /// are too few points, or the linear system is singular.
    pub fn execute(&self) -> Result<BSplineCurve> {
        let n = self.points.len();
        if n != self.params.len() {
            return Err(InterpolationError::SingularSystem(format!(
                "{n} points but {} parameters",
                self.params.len()
            ))
            .into());
        }
        if n < 2 || (self.closed && n < 3) {
            return Err(InterpolationError::SingularSystem(format!(
                "cannot interpolate {n} points"
            ))
            .into());
        }
        if let Some(k) = self.params.windows(2).position(|w| w[1] <= w[0]) {
            return Err(InterpolationError::SingularSystem(format!(
                "interpolation parameters not strictly increasing at position {}",
                k + 1
            ))
            .into());
        }

        let degree = self.degree.min(n - 1).max(1);
        if self.closed {
            self.closed_interpolation(degree)
        } else {
            self.open_interpolation(degree)
        }
    }

    fn open_interpolation(&self, degree: usize) -> Result<BSplineCurve> {
        let n = self.points.len();
        let knot_vector = knots::averaged(self.params, degree);
        let matrix = basis_matrix(degree, &knot_vector, n, self.params, 0);
        let rhs: Vec<Vector3> = self.points.iter().map(|p| p.coords).collect();
        let solution = linalg::solve(matrix, &rhs).ok_or_else(|| {
            InterpolationError::SingularSystem(format!("open interpolation of {n} points"))
        })?;
        BSplineCurve::new(degree, knot_vector, solution.into_iter().map(Point3::from).collect())
    }

    fn closed_interpolation(&self, degree: usize) -> Result<BSplineCurve> {
        let degree = if degree % 2 == 0 { degree - 1 } else { degree };
        let n = self.points.len();
        let start = self.params[0];
        let end = self.params[n - 1];
        let knot_vector = knots::clamped(degree, &self.params[1..n - 1], start, end);
        let n_ctrl = n + degree - 1;

        let mut matrix = nalgebra::DMatrix::<f64>::zeros(n_ctrl, n_ctrl);
        matrix
            .view_mut((0, 0), (n, n_ctrl))
            .copy_from(&basis_matrix(degree, &knot_vector, n_ctrl, self.params, 0));
        for k in 1..degree {
            let at_start = basis_matrix(degree, &knot_vector, n_ctrl, &[start], k);
            let at_end = basis_matrix(degree, &knot_vector, n_ctrl, &[end], k);
            matrix
                .view_mut((n + k - 1, 0), (1, n_ctrl))
                .copy_from(&(at_start - at_end));
        }

        let mut rhs: Vec<Vector3> = self.points.iter().map(|p| p.coords).collect();
        rhs.resize(n_ctrl, Vector3::zeros());
        let solution = linalg::solve(matrix, &rhs).ok_or_else(|| {
            InterpolationError::SingularSystem(format!("closed interpolation of {n} points"))
        })?;
        BSplineCurve::new(degree, knot_vector, solution.into_iter().map(Point3::from).collect())
    }
}
