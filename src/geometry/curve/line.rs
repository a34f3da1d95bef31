use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::{Curve, CurveDomain};

/// A straight line segment between two points.
///
/// The parametric form is: `P(t) = start + t * (end - start)` with `t` in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct Line {
    start: Point3,
    end: Point3,
}

impl Line {
    /// Creates a new line segment from its end points.
    ///
    /// # Errors
    ///
    /// Returns an error if the end points coincide.
    pub fn new(start: Point3, end: Point3) -> Result<Self> {
        if (end - start).norm() < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(Self { start, end })
    }

    /// Returns the start point of the segment.
    #[must_use]
    pub fn start(&self) -> &Point3 {
        &self.start
    }

    /// Returns the end point of the segment.
    #[must_use]
    pub fn end(&self) -> &Point3 {
        &self.end
    }

    /// Returns the (non-normalized) direction `end - start`.
    #[must_use]
    pub fn direction(&self) -> Vector3 {
        self.end - self.start
    }

    /// The segment traversed from `end` to `start`.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            start: self.end,
            end: self.start,
        }
    }
}

impl Curve for Line {
    fn evaluate(&self, t: f64) -> Result<Point3> {
        let t = self.domain().clamp(t)?;
        Ok(self.start + self.direction() * t)
    }

    fn derivatives(&self, t: f64, order: usize) -> Result<Vec<Vector3>> {
        let point = self.evaluate(t)?;
        let mut ders = vec![Vector3::zeros(); order + 1];
        ders[0] = point.coords;
        if order >= 1 {
            ders[1] = self.direction();
        }
        Ok(ders)
    }

    fn domain(&self) -> CurveDomain {
        CurveDomain::new(0.0, 1.0)
    }

    fn degree(&self) -> usize {
        1
    }

    fn knot_vector(&self) -> Vec<f64> {
        vec![0.0, 0.0, 1.0, 1.0]
    }
}
