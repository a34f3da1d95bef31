use crate::error::Result;
use crate::geometry::Curve;
use crate::math::{Point3, Vector3};

/// Samples per knot span used to seed the local solver.
const SAMPLES_PER_SPAN: usize = 8;
/// Lower bound on the total samples per curve.
const MIN_SAMPLES: usize = 32;
const MAX_ITERATIONS: usize = 60;
const MAX_LINE_SEARCH: usize = 30;
/// Parameter steps below this fraction of the domain count as converged.
const STEP_TOLERANCE: f64 = 1e-13;

/// Closest approach between two curves.
#[derive(Debug, Clone, Copy)]
pub struct CurveIntersection {
    /// Midpoint of the two closest points.
    pub point: Point3,
    /// Parameter on the first curve.
    pub t1: f64,
    /// Parameter on the second curve.
    pub t2: f64,
    /// Distance between the two closest points.
    pub gap: f64,
    /// Set when the local solver did not converge and the result is the best
    /// sampled pair.
    pub approximate: bool,
}

/// Finds the closest approach (or crossing) of two curves.
///
/// The curves are sampled per knot span; the nearest sample pair seeds a
/// projected Newton iteration on `½|C₁(s) − C₂(t)|²` that stays inside both
/// parameter domains.
pub struct CurveCurveIntersect<'a, A, B> {
    first: &'a A,
    second: &'a B,
    samples_per_span: usize,
}

impl<'a, A: Curve, B: Curve> CurveCurveIntersect<'a, A, B> {
    /// Creates a new `CurveCurveIntersect` query.
    #[must_use]
    pub fn new(first: &'a A, second: &'a B) -> Self {
        Self {
            first,
            second,
            samples_per_span: SAMPLES_PER_SPAN,
        }
    }

    /// Overrides the number of seed samples per knot span.
    #[must_use]
    pub fn with_samples_per_span(mut self, samples: usize) -> Self {
        self.samples_per_span = samples.max(1);
        self
    }

    /// Executes the query, returning the closest approach.
    ///
    /// # Errors
    ///
    /// Returns an error if curve evaluation fails.
    pub fn execute(&self) -> Result<CurveIntersection> {
        let first = sample(self.first, self.samples_per_span)?;
        let second = sample(self.second, self.samples_per_span)?;

        let mut best = (first[0].0, second[0].0, f64::INFINITY);
        let mut best_points = (first[0].1, second[0].1);
        for (s, p) in &first {
            for (t, q) in &second {
                let d = (p - q).norm_squared();
                if d < best.2 {
                    best = (*s, *t, d);
                    best_points = (*p, *q);
                }
            }
        }

        if let Some((t1, t2)) = refine(self.first, self.second, best.0, best.1)? {
            let p = self.first.evaluate(t1)?;
            let q = self.second.evaluate(t2)?;
            return Ok(CurveIntersection {
                point: nalgebra::center(&p, &q),
                t1,
                t2,
                gap: (p - q).norm(),
                approximate: false,
            });
        }

        let (p, q) = best_points;
        Ok(CurveIntersection {
            point: nalgebra::center(&p, &q),
            t1: best.0,
            t2: best.1,
            gap: (p - q).norm(),
            approximate: true,
        })
    }
}

fn sample<C: Curve>(curve: &C, per_span: usize) -> Result<Vec<(f64, Point3)>> {
    let breaks = curve.breakpoints();
    let spans = breaks.len().saturating_sub(1).max(1);
    let per_span = per_span.max(MIN_SAMPLES.div_ceil(spans));
    let mut samples = Vec::with_capacity(spans * per_span + 1);
    for window in breaks.windows(2) {
        let (a, b) = (window[0], window[1]);
        for k in 0..per_span {
            #[allow(clippy::cast_precision_loss)]
            let t = a + (b - a) * k as f64 / per_span as f64;
            samples.push((t, curve.evaluate(t)?));
        }
    }
    let end = curve.domain().t_max;
    samples.push((end, curve.evaluate(end)?));
    Ok(samples)
}

/// Projected Newton refinement of a sampled closest pair.
///
/// Returns `None` when the iteration does not converge.
fn refine<A: Curve, B: Curve>(
    first: &A,
    second: &B,
    s0: f64,
    t0: f64,
) -> Result<Option<(f64, f64)>> {
    let d1 = first.domain();
    let d2 = second.domain();
    let (mut s, mut t) = (s0, t0);

    for _ in 0..MAX_ITERATIONS {
        let c1 = first.derivatives(s, 2)?;
        let c2 = second.derivatives(t, 2)?;
        let diff = c1[0] - c2[0];
        let f0 = 0.5 * diff.norm_squared();
        let g = (diff.dot(&c1[1]), -diff.dot(&c2[1]));

        // Coordinates pinned at a bound with the gradient pointing outwards
        // stay fixed.
        let free_s = !((s <= d1.t_min && g.0 > 0.0) || (s >= d1.t_max && g.0 < 0.0));
        let free_t = !((t <= d2.t_min && g.1 > 0.0) || (t >= d2.t_max && g.1 < 0.0));

        let (ds, dt) = match newton_step(&c1, &c2, &diff, g, free_s, free_t) {
            Some(step) => step,
            None => return Ok(None),
        };
        if ds.abs() <= STEP_TOLERANCE * d1.length() && dt.abs() <= STEP_TOLERANCE * d2.length() {
            return Ok(Some((s, t)));
        }

        let mut alpha = 1.0;
        let mut accepted = None;
        for _ in 0..MAX_LINE_SEARCH {
            let sn = (s + alpha * ds).clamp(d1.t_min, d1.t_max);
            let tn = (t + alpha * dt).clamp(d2.t_min, d2.t_max);
            let f = 0.5 * (first.evaluate(sn)? - second.evaluate(tn)?).norm_squared();
            if f <= f0 {
                accepted = Some((sn, tn));
                break;
            }
            alpha *= 0.5;
        }
        match accepted {
            Some((sn, tn)) => {
                let moved_s = (sn - s).abs() <= STEP_TOLERANCE * d1.length();
                let moved_t = (tn - t).abs() <= STEP_TOLERANCE * d2.length();
                s = sn;
                t = tn;
                if moved_s && moved_t {
                    return Ok(Some((s, t)));
                }
            }
            // No descent along the Newton direction: already at the minimum
            // to working precision.
            None => return Ok(Some((s, t))),
        }
    }
    Ok(None)
}

/// Newton (or Gauss–Newton when the Hessian is indefinite) step on the free
/// coordinates.
fn newton_step(
    c1: &[Vector3],
    c2: &[Vector3],
    diff: &Vector3,
    g: (f64, f64),
    free_s: bool,
    free_t: bool,
) -> Option<(f64, f64)> {
    let gn11 = c1[1].norm_squared();
    let gn22 = c2[1].norm_squared();
    let h12 = -c1[1].dot(&c2[1]);
    let mut h11 = gn11 + diff.dot(&c1[2]);
    let mut h22 = gn22 - diff.dot(&c2[2]);
    if h11 <= 0.0 || h22 <= 0.0 || h11 * h22 - h12 * h12 <= 0.0 {
        h11 = gn11;
        h22 = gn22;
    }

    match (free_s, free_t) {
        (true, true) => {
            let mut det = h11 * h22 - h12 * h12;
            // Parallel tangents: damp the system.
            if det <= 1e-12 * h11 * h22 {
                let damping = 1e-6 * (h11 + h22);
                h11 += damping;
                h22 += damping;
                det = h11 * h22 - h12 * h12;
            }
            if !det.is_finite() || det <= 0.0 {
                return None;
            }
            let ds = -(h22 * g.0 - h12 * g.1) / det;
            let dt = -(h11 * g.1 - h12 * g.0) / det;
            Some((ds, dt))
        }
        (true, false) if h11 > 0.0 => Some((-g.0 / h11, 0.0)),
        (false, true) if h22 > 0.0 => Some((0.0, -g.1 / h22)),
        (false, false) => Some((0.0, 0.0)),
        _ => None,
    }
}
