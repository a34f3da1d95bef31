use crate::error::{InterpolationError, Result};

use super::CurveId;

/// Monotone map between a curve's new and old parameters.
///
/// Built from strictly increasing `(old, new)` pairs and evaluated as a C¹
/// piecewise cubic Hermite spline `old = h(new)`. Interior slopes are
/// harmonic means of the neighbouring secants (Fritsch–Butland), which keeps
/// the map strictly monotone. Identity pairs give the identity map.
#[derive(Debug, Clone)]
pub struct ParameterMap {
    new: Vec<f64>,
    old: Vec<f64>,
    slopes: Vec<f64>,
}

impl ParameterMap {
    /// Creates the map sending each `new[k]` to `old[k]`.
    ///
    /// # Errors
    ///
    /// Returns [`InterpolationError::SingularReparametrization`] if the lists
    /// differ in length, hold fewer than two pairs, or are not strictly
    /// increasing.
    pub fn new(curve: CurveId, old: Vec<f64>, new: Vec<f64>) -> Result<Self> {
        let singular = |reason: String| -> crate::error::GordonError {
            InterpolationError::SingularReparametrization { curve, reason }.into()
        };
        if old.len() != new.len() || old.len() < 2 {
            return Err(singular(format!(
                "need at least two matching pairs, got {} old and {} new parameters",
                old.len(),
                new.len()
            )));
        }
        if let Some(k) = old.windows(2).position(|w| w[1] <= w[0] || !w[1].is_finite()) {
            return Err(singular(format!(
                "curve parameters are not strictly increasing at position {}",
                k + 1
            )));
        }
        if let Some(k) = new.windows(2).position(|w| w[1] <= w[0] || !w[1].is_finite()) {
            return Err(singular(format!(
                "target parameters are not strictly increasing at position {}",
                k + 1
            )));
        }

        let secants: Vec<f64> = old
            .windows(2)
            .zip(new.windows(2))
            .map(|(o, n)| (o[1] - o[0]) / (n[1] - n[0]))
            .collect();
        let last = secants.len() - 1;
        let slopes = (0..old.len())
            .map(|k| {
                if k == 0 {
                    secants[0]
                } else if k > last {
                    secants[last]
                } else {
                    let (a, b) = (secants[k - 1], secants[k]);
                    2.0 * a * b / (a + b)
                }
            })
            .collect();

        Ok(Self { new, old, slopes })
    }

    /// Range of new parameters.
    #[must_use]
    pub fn new_range(&self) -> (f64, f64) {
        (self.new[0], self.new[self.new.len() - 1])
    }

    /// Range of old parameters.
    #[must_use]
    pub fn old_range(&self) -> (f64, f64) {
        (self.old[0], self.old[self.old.len() - 1])
    }

    /// Old parameter for the new parameter `t` (clamped to the range).
    #[must_use]
    pub fn old_parameter(&self, t: f64) -> f64 {
        let (k, s, h) = self.locate(t);
        let (s2, s3) = (s * s, s * s * s);
        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;
        let value = h00 * self.old[k]
            + h10 * h * self.slopes[k]
            + h01 * self.old[k + 1]
            + h11 * h * self.slopes[k + 1];
        value.clamp(self.old[k], self.old[k + 1])
    }

    /// New parameter for the old parameter `t` (inverse map, by bisection).
    #[must_use]
    pub fn new_parameter(&self, t: f64) -> f64 {
        let last = self.old.len() - 1;
        let t = t.clamp(self.old[0], self.old[last]);
        let k = self
            .old
            .partition_point(|&v| v <= t)
            .saturating_sub(1)
            .min(last - 1);
        let (mut lo, mut hi) = (self.new[k], self.new[k + 1]);
        if t <= self.old[k] {
            return lo;
        }
        if t >= self.old[k + 1] {
            return hi;
        }
        for _ in 0..200 {
            let mid = 0.5 * (lo + hi);
            if mid <= lo || mid >= hi {
                break;
            }
            if self.old_parameter(mid) < t {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        0.5 * (lo + hi)
    }

    /// Interval index, local coordinate and interval width for `t`.
    fn locate(&self, t: f64) -> (usize, f64, f64) {
        let last = self.new.len() - 1;
        let t = t.clamp(self.new[0], self.new[last]);
        let k = self
            .new
            .partition_point(|&v| v <= t)
            .saturating_sub(1)
            .min(last - 1);
        let h = self.new[k + 1] - self.new[k];
        (k, (t - self.new[k]) / h, h)
    }
}
