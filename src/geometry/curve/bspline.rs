use crate::error::{GeometryError, Result};
use crate::geometry::basis::{basis_function_derivatives, basis_functions, find_span};
use crate::geometry::knots::{self, KNOT_TOLERANCE};
use crate::math::{binomial, Point3, Vector3};

use super::{Curve, CurveDomain};

/// A non-rational B-spline curve with a clamped knot vector.
///
/// `C(t) = Σ N_i,p(t) P_i` for `t` in `[knots[p], knots[n]]`.
#[derive(Debug, Clone)]
pub struct BSplineCurve {
    degree: usize,
    knots: Vec<f64>,
    control_points: Vec<Point3>,
}

impl BSplineCurve {
    /// Creates a new B-spline curve.
    ///
    /// # Errors
    ///
    /// Returns an error if the knot vector does not match the degree and
    /// control point count, is not clamped, or is decreasing.
    pub fn new(degree: usize, knots: Vec<f64>, control_points: Vec<Point3>) -> Result<Self> {
        knots::validate(degree, &knots, control_points.len())?;
        Ok(Self {
            degree,
            knots,
            control_points,
        })
    }

    /// Clamped curve with uniformly spaced interior knots on `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns an error if there are fewer than `degree + 1` control points.
    pub fn uniform(degree: usize, control_points: Vec<Point3>) -> Result<Self> {
        let n = control_points.len();
        if degree == 0 || n < degree + 1 {
            return Err(GeometryError::InvalidControlPoints(format!(
                "degree {degree} needs at least {} control points, got {n}",
                degree + 1
            ))
            .into());
        }
        let spans = n - degree;
        let interior: Vec<f64> = (1..spans)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let t = i as f64 / spans as f64;
                t
            })
            .collect();
        Self::new(degree, knots::clamped(degree, &interior, 0.0, 1.0), control_points)
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

    /// Inserts `t` up to `times` times without changing the shape.
    ///
    /// Insertion stops once the knot reaches multiplicity `degree`. Knots at the
    /// domain ends are already saturated and are ignored. Returns how many
    /// knots were inserted.
    ///
    /// # Errors
    ///
    /// Returns an error if `t` lies outside the domain.
    pub fn insert_knot(&mut self, t: f64, times: usize) -> Result<usize> {
        let domain = self.domain();
        let t = domain.clamp(t)?;
        let tol = KNOT_TOLERANCE * domain.length();
        if t <= domain.t_min + tol || t >= domain.t_max - tol {
            return Ok(0);
        }
        // Snap onto an existing knot so near-duplicates do not create slivers.
        let t = self
            .knots
            .iter()
            .copied()
            .find(|k| (k - t).abs() <= tol)
            .unwrap_or(t);
        let current = knots::multiplicity(&self.knots, t, tol);
        let count = times.min(self.degree.saturating_sub(current));
        for _ in 0..count {
            let (k, p) = insert_knot_points(self.degree, &self.knots, &self.control_points, t);
            self.knots = k;
            self.control_points = p;
        }
        Ok(count)
    }

    /// Returns an equivalent curve of degree `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if `target` is below the current degree or the curve
    /// is discontinuous at an interior knot.
    pub fn elevate_degree(&self, target: usize) -> Result<Self> {
        if target < self.degree {
            return Err(GeometryError::Degenerate(format!(
                "cannot lower degree {} to {target}",
                self.degree
            ))
            .into());
        }
        let (knots, points) = elevate_points(
            self.degree,
            &self.knots,
            &self.control_points,
            target - self.degree,
        )?;
        Self::new(target, knots, points)
    }

    /// The same curve traversed in the opposite direction over the same domain.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            degree: self.degree,
            knots: knots::reversed(&self.knots),
            control_points: self.control_points.iter().rev().copied().collect(),
        }
    }
}

impl Curve for BSplineCurve {
    fn evaluate(&self, t: f64) -> Result<Point3> {
        let t = self.domain().clamp(t)?;
        let n = self.control_points.len();
        let span = find_span(self.degree, &self.knots, n, t);
        let basis = basis_functions(self.degree, &self.knots, span, t);
        let mut point = Vector3::zeros();
        for (j, b) in basis.iter().enumerate() {
            point += self.control_points[span - self.degree + j].coords * *b;
        }
        Ok(Point3::from(point))
    }

    fn derivatives(&self, t: f64, order: usize) -> Result<Vec<Vector3>> {
        let t = self.domain().clamp(t)?;
        let n = self.control_points.len();
        let span = find_span(self.degree, &self.knots, n, t);
        let ders = basis_function_derivatives(self.degree, &self.knots, span, t, order);
        Ok(ders
            .iter()
            .map(|row| {
                row.iter().enumerate().fold(Vector3::zeros(), |acc, (j, b)| {
                    acc + self.control_points[span - self.degree + j].coords * *b
                })
            })
            .collect())
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

/// Inserts `t` once into a control polygon (Boehm's algorithm).
pub(crate) fn insert_knot_points(
    degree: usize,
    knots: &[f64],
    points: &[Point3],
    t: f64,
) -> (Vec<f64>, Vec<Point3>) {
    let n = points.len();
    let span = find_span(degree, knots, n, t);

    let mut new_knots = Vec::with_capacity(knots.len() + 1);
    new_knots.extend_from_slice(&knots[..=span]);
    new_knots.push(t);
    new_knots.extend_from_slice(&knots[span + 1..]);

    let new_points = (0..=n)
        .map(|i| {
            if i + degree <= span {
                points[i]
            } else if i > span {
                points[i - 1]
            } else {
                let alpha = (t - knots[i]) / (knots[i + degree] - knots[i]);
                Point3::from(points[i - 1].coords * (1.0 - alpha) + points[i].coords * alpha)
            }
        })
        .collect();
    (new_knots, new_points)
}

/// Raises the degree of a control polygon by `by` through Bezier decomposition.
pub(crate) fn elevate_points(
    degree: usize,
    knots: &[f64],
    points: &[Point3],
    by: usize,
) -> Result<(Vec<f64>, Vec<Point3>)> {
    if by == 0 {
        return Ok((knots.to_vec(), points.to_vec()));
    }
    let (start, end) = knots::domain(degree, knots);
    let interior = knots::interior(degree, knots);
    if let Some((value, _)) = interior.iter().find(|(_, mult)| *mult > degree) {
        return Err(GeometryError::Degenerate(format!(
            "cannot elevate a curve that is discontinuous at {value}"
        ))
        .into());
    }

    let mut k = knots.to_vec();
    let mut p = points.to_vec();
    for &(value, mult) in &interior {
        for _ in mult..degree {
            (k, p) = insert_knot_points(degree, &k, &p, value);
        }
    }

    let segments = (p.len() - 1) / degree;
    let target = degree + by;
    let mut elevated = Vec::with_capacity(segments * target + 1);
    for s in 0..segments {
        let bezier = elevate_bezier(&p[s * degree..=(s + 1) * degree], by);
        let skip = usize::from(s > 0);
        elevated.extend_from_slice(&bezier[skip..]);
    }

    let mut inner = Vec::with_capacity(interior.len() * target);
    for &(value, _) in &interior {
        inner.extend(std::iter::repeat_n(value, target));
    }
    Ok((knots::clamped(target, &inner, start, end), elevated))
}

/// Raises the degree of a single Bezier segment by `by`.
fn elevate_bezier(points: &[Point3], by: usize) -> Vec<Point3> {
    let p = points.len() - 1;
    let q = p + by;
    (0..=q)
        .map(|i| {
            let lo = i.saturating_sub(by);
            let hi = p.min(i);
            let denom = binomial(q, i);
            let sum = (lo..=hi).fold(Vector3::zeros(), |acc, j| {
                acc + points[j].coords * (binomial(p, j) * binomial(by, i - j) / denom)
            });
            Point3::from(sum)
        })
        .collect()
}
