use crate::error::{GeometryError, Result};
use crate::geometry::basis::{basis_functions, find_span};
use crate::geometry::curve::bspline::{elevate_points, insert_knot_points};
use crate::geometry::curve::{BSplineCurve, CurveDomain};
use crate::geometry::knots::{self, KNOT_TOLERANCE};
use crate::math::{Point3, Vector3};

use super::{Surface, SurfaceDomain};

/// A tensor-product B-spline surface.
///
/// The control grid is indexed `[i][j]` with `i` running along `u` and `j`
/// along `v`, so `control_points.len()` matches the `u` knot vector.
#[derive(Debug, Clone)]
pub struct BSplineSurface {
    degree_u: usize,
    degree_v: usize,
    knots_u: Vec<f64>,
    knots_v: Vec<f64>,
    control_points: Vec<Vec<Point3>>,
}

impl BSplineSurface {
    /// Creates a new B-spline surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the control grid is empty or ragged, or if either
    /// knot vector does not match its degree and grid dimension.
    pub fn new(
        degree_u: usize,
        degree_v: usize,
        knots_u: Vec<f64>,
        knots_v: Vec<f64>,
        control_points: Vec<Vec<Point3>>,
    ) -> Result<Self> {
        let rows = control_points.len();
        let cols = control_points.first().map_or(0, Vec::len);
        if rows == 0 || cols == 0 {
            return Err(GeometryError::InvalidControlPoints("empty control grid".into()).into());
        }
        if control_points.iter().any(|row| row.len() != cols) {
            return Err(GeometryError::InvalidControlPoints(
                "control grid rows have different lengths".into(),
            )
            .into());
        }
        knots::validate(degree_u, &knots_u, rows)?;
        knots::validate(degree_v, &knots_v, cols)?;
        Ok(Self {
            degree_u,
            degree_v,
            knots_u,
            knots_v,
            control_points,
        })
    }

    /// Returns the degree in `u`.
    #[must_use]
    pub fn degree_u(&self) -> usize {
        self.degree_u
    }

    /// Returns the degree in `v`.
    #[must_use]
    pub fn degree_v(&self) -> usize {
        self.degree_v
    }

    /// Returns the knot vector in `u`.
    #[must_use]
    pub fn knots_u(&self) -> &[f64] {
        &self.knots_u
    }

    /// Returns the knot vector in `v`.
    #[must_use]
    pub fn knots_v(&self) -> &[f64] {
        &self.knots_v
    }

    /// Returns the control grid.
    #[must_use]
    pub fn control_points(&self) -> &[Vec<Point3>] {
        &self.control_points
    }

    /// The surface with `u` and `v` swapped.
    #[must_use]
    pub fn transposed(&self) -> Self {
        let rows = self.control_points.len();
        let cols = self.control_points[0].len();
        let control_points = (0..cols)
            .map(|j| (0..rows).map(|i| self.control_points[i][j]).collect())
            .collect();
        Self {
            degree_u: self.degree_v,
            degree_v: self.degree_u,
            knots_u: self.knots_v.clone(),
            knots_v: self.knots_u.clone(),
            control_points,
        }
    }

    /// Inserts the `u` knot `t` up to `times` times, saturating at multiplicity
    /// `degree_u`. Returns the number of insertions.
    ///
    /// # Errors
    ///
    /// Returns an error if `t` lies outside the `u` domain.
    pub fn insert_knot_u(&mut self, t: f64, times: usize) -> Result<usize> {
        let domain = self.domain().u;
        let t = domain.clamp(t)?;
        let tol = KNOT_TOLERANCE * domain.length();
        if t <= domain.t_min + tol || t >= domain.t_max - tol {
            return Ok(0);
        }
        let t = self
            .knots_u
            .iter()
            .copied()
            .find(|k| (k - t).abs() <= tol)
            .unwrap_or(t);
        let current = knots::multiplicity(&self.knots_u, t, tol);
        let count = times.min(self.degree_u.saturating_sub(current));
        for _ in 0..count {
            let degree = self.degree_u;
            let (knots, grid) = self.map_columns(|k, column| {
                Ok(insert_knot_points(degree, k, column, t))
            })?;
            self.knots_u = knots;
            self.control_points = grid;
        }
        Ok(count)
    }

    /// Returns an equivalent surface of degree `target` in `u`.
    ///
    /// # Errors
    ///
    /// Returns an error if `target` is below the current `u` degree.
    pub fn elevate_degree_u(&self, target: usize) -> Result<Self> {
        if target < self.degree_u {
            return Err(GeometryError::Degenerate(format!(
                "cannot lower u degree {} to {target}",
                self.degree_u
            ))
            .into());
        }
        let degree = self.degree_u;
        let (knots_u, grid) =
            self.map_columns(|k, column| elevate_points(degree, k, column, target - degree))?;
        Self::new(target, self.degree_v, knots_u, self.knots_v.clone(), grid)
    }

    /// Returns an equivalent surface of degree `target` in `v`.
    ///
    /// # Errors
    ///
    /// Returns an error if `target` is below the current `v` degree.
    pub fn elevate_degree_v(&self, target: usize) -> Result<Self> {
        Ok(self.transposed().elevate_degree_u(target)?.transposed())
    }

    /// The curve `v ↦ S(u, v)` at fixed `u`.
    ///
    /// # Errors
    ///
    /// Returns an error if `u` is out of range.
    pub fn isocurve_u(&self, u: f64) -> Result<BSplineCurve> {
        let u = self.domain().u.clamp(u)?;
        let rows = self.control_points.len();
        let span = find_span(self.degree_u, &self.knots_u, rows, u);
        let basis = basis_functions(self.degree_u, &self.knots_u, span, u);
        let cols = self.control_points[0].len();
        let points = (0..cols)
            .map(|j| {
                let sum = basis.iter().enumerate().fold(Vector3::zeros(), |acc, (a, b)| {
                    acc + self.control_points[span - self.degree_u + a][j].coords * *b
                });
                Point3::from(sum)
            })
            .collect();
        BSplineCurve::new(self.degree_v, self.knots_v.clone(), points)
    }

    /// The curve `u ↦ S(u, v)` at fixed `v`.
    ///
    /// # Errors
    ///
    /// Returns an error if `v` is out of range.
    pub fn isocurve_v(&self, v: f64) -> Result<BSplineCurve> {
        self.transposed().isocurve_u(v)
    }

    /// Applies a control-polygon operation to every `u` column.
    fn map_columns<F>(&self, op: F) -> Result<(Vec<f64>, Vec<Vec<Point3>>)>
    where
        F: Fn(&[f64], &[Point3]) -> Result<(Vec<f64>, Vec<Point3>)>,
    {
        let rows = self.control_points.len();
        let cols = self.control_points[0].len();
        let mut knots_out = Vec::new();
        let mut columns = Vec::with_capacity(cols);
        for j in 0..cols {
            let column: Vec<Point3> = (0..rows).map(|i| self.control_points[i][j]).collect();
            let (k, points) = op(&self.knots_u, &column)?;
            knots_out = k;
            columns.push(points);
        }
        let new_rows = columns.first().map_or(0, Vec::len);
        let grid = (0..new_rows)
            .map(|i| columns.iter().map(|column| column[i]).collect())
            .collect();
        Ok((knots_out, grid))
    }
}

impl Surface for BSplineSurface {
    fn evaluate(&self, u: f64, v: f64) -> Result<Point3> {
        let (u, v) = self.domain().clamp(u, v)?;
        let rows = self.control_points.len();
        let cols = self.control_points[0].len();
        let span_u = find_span(self.degree_u, &self.knots_u, rows, u);
        let span_v = find_span(self.degree_v, &self.knots_v, cols, v);
        let nu = basis_functions(self.degree_u, &self.knots_u, span_u, u);
        let nv = basis_functions(self.degree_v, &self.knots_v, span_v, v);

        let mut sum = Vector3::zeros();
        for (a, bu) in nu.iter().enumerate() {
            let row = &self.control_points[span_u - self.degree_u + a];
            for (b, bv) in nv.iter().enumerate() {
                sum += row[span_v - self.degree_v + b].coords * (bu * bv);
            }
        }
        Ok(Point3::from(sum))
    }

    fn domain(&self) -> SurfaceDomain {
        let (u_min, u_max) = knots::domain(self.degree_u, &self.knots_u);
        let (v_min, v_max) = knots::domain(self.degree_v, &self.knots_v);
        SurfaceDomain::new(CurveDomain::new(u_min, u_max), CurveDomain::new(v_min, v_max))
    }
}
