//! Tunable parameters and the per-call numerical context.

use crate::error::{NetworkError, Result};
use crate::geometry::{Curve, NetworkCurve};
use crate::operations::query::BoundingBox;

/// Closedness tolerance relative to the diagonal of the network.
const REL_TOL_CLOSED: f64 = 1e-8;

/// Parameters controlling the network interpolation.
#[derive(Debug, Clone, Copy)]
pub struct InterpolationParams {
    /// Largest accepted distance between a profile and a guide at their
    /// intersection. Also bounds the shape deviation of reparametrized curves.
    pub tolerance: f64,
    /// Highest degree used across a curve family when skinning.
    pub max_skin_degree: usize,
    /// Number of times knot spans may be halved while refitting a curve.
    pub max_refinements: usize,
    /// Tangent angle (radians) above which a curve break counts as a kink.
    pub kink_angle: f64,
}

impl Default for InterpolationParams {
    fn default() -> Self {
        Self {
            tolerance: 1e-4,
            max_skin_degree: 3,
            max_refinements: 6,
            kink_angle: 6.0_f64.to_radians(),
        }
    }
}

/// Tolerances derived from [`InterpolationParams`] and the size of one network.
///
/// Built once per interpolation call and passed to every stage.
#[derive(Debug, Clone, Copy)]
pub struct InterpolationContext {
    /// The user parameters.
    pub params: InterpolationParams,
    /// Distance below which the ends of a curve count as one point. Scales
    /// with the diagonal of the network's bounding box.
    pub closed_tolerance: f64,
    /// Relative parameter distance used to snap to domain ends and seams.
    pub parameter_tolerance: f64,
    /// Largest accepted deviation of a refitted curve from its source.
    pub shape_tolerance: f64,
}

impl InterpolationContext {
    /// Derives the context for a network of `profiles` and `guides`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InvalidTolerance`] if the tolerance is not a
    /// positive finite number.
    pub fn new(
        params: InterpolationParams,
        profiles: &[NetworkCurve],
        guides: &[NetworkCurve],
    ) -> Result<Self> {
        if !params.tolerance.is_finite() || params.tolerance <= 0.0 {
            return Err(NetworkError::InvalidTolerance(params.tolerance).into());
        }
        let bounds = BoundingBox::new(profiles)
            .execute()?
            .union(&BoundingBox::new(guides).execute()?);
        Ok(Self {
            params,
            closed_tolerance: REL_TOL_CLOSED * bounds.diagonal().max(1.0),
            parameter_tolerance: 1e-5,
            shape_tolerance: params.tolerance,
        })
    }

    /// Interpolation tolerance.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.params.tolerance
    }

    /// Whether `curve` ends where it starts, within the closedness tolerance
    /// of this network.
    ///
    /// # Errors
    ///
    /// Returns an error if the curve cannot be evaluated at its domain ends.
    pub fn is_closed<C: Curve>(&self, curve: &C) -> Result<bool> {
        let domain = curve.domain();
        let gap = (curve.evaluate(domain.t_max)? - curve.evaluate(domain.t_min)?).norm();
        Ok(gap <= self.closed_tolerance)
    }

    /// Whether every curve of a family is closed.
    ///
    /// # Errors
    ///
    /// Returns an error if a curve cannot be evaluated at its domain ends.
    pub fn all_closed(&self, curves: &[NetworkCurve]) -> Result<bool> {
        for curve in curves {
            if !self.is_closed(curve)? {
                return Ok(false);
            }
        }
        Ok(!curves.is_empty())
    }
}
