mod bspline;

pub use bspline::BSplineSurface;

use crate::error::Result;
use crate::geometry::curve::CurveDomain;
use crate::math::Point3;

/// Rectangular parameter domain of a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceDomain {
    /// Parameter range along `u`.
    pub u: CurveDomain,
    /// Parameter range along `v`.
    pub v: CurveDomain,
}

impl SurfaceDomain {
    /// Creates a new surface domain from its two parameter ranges.
    #[must_use]
    pub fn new(u: CurveDomain, v: CurveDomain) -> Self {
        Self { u, v }
    }

    /// Clamps `(u, v)` into the domain.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::ParameterOutOfRange`](crate::error::GeometryError::ParameterOutOfRange)
    /// if either parameter lies clearly outside its range.
    pub fn clamp(&self, u: f64, v: f64) -> Result<(f64, f64)> {
        Ok((self.u.clamp(u)?, self.v.clamp(v)?))
    }
}

/// A parametric surface `(u, v) ↦ S(u, v)`.
pub trait Surface {
    /// Point at `(u, v)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are out of range.
    fn evaluate(&self, u: f64, v: f64) -> Result<Point3>;

    /// Returns the parameter domain of the surface.
    fn domain(&self) -> SurfaceDomain;
}
