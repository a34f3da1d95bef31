use tracing::debug;

use crate::error::{Incompatibility, NetworkError, Result};

use super::{CurveId, IntersectionGrid};

/// Checks that an intersection grid describes a consistent network.
///
/// Gaps are checked before ordering, so a network that both misses and is
/// misordered reports the gap.
pub struct ValidateNetwork<'a> {
    grid: &'a IntersectionGrid,
    tolerance: f64,
}

impl<'a> ValidateNetwork<'a> {
    /// Creates a new `ValidateNetwork` check.
    #[must_use]
    pub fn new(grid: &'a IntersectionGrid, tolerance: f64) -> Self {
        Self { grid, tolerance }
    }

    /// Executes the check.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::IncompatibleNetwork`] naming the pair with the
    /// largest gap if any gap exceeds the tolerance, or the first curve whose
    /// intersection parameters are not strictly increasing.
    pub fn execute(&self) -> Result<()> {
        let grid = self.grid;
        if grid.n_profiles() < 2 || grid.n_guides() < 2 {
            return Err(NetworkError::InsufficientInput {
                profiles: grid.n_profiles(),
                guides: grid.n_guides(),
            }
            .into());
        }

        let (profile, guide, gap) = grid.max_gap();
        if gap.is_nan() || gap > self.tolerance {
            return Err(NetworkError::from(Incompatibility::Gap {
                profile,
                guide,
                gap,
                tolerance: self.tolerance,
            })
            .into());
        }

        for i in 0..grid.n_profiles() {
            check_increasing(&grid.profile_parameters(i), CurveId::Profile(i))?;
        }
        for j in 0..grid.n_guides() {
            check_increasing(&grid.guide_parameters(j), CurveId::Guide(j))?;
        }

        debug!(max_gap = gap, "curve network is consistent");
        Ok(())
    }
}

fn check_increasing(params: &[f64], curve: CurveId) -> Result<()> {
    match params.windows(2).position(|w| w[1] <= w[0]) {
        Some(position) => Err(NetworkError::from(Incompatibility::Ordering {
            curve,
            position: position + 1,
        })
        .into()),
        None => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::GordonError;
    use crate::math::Point3;
    use crate::operations::query::CurveIntersection;

    fn entry(t1: f64, t2: f64, gap: f64) -> CurveIntersection {
        CurveIntersection {
            point: Point3::origin(),
            t1,
            t2,
            gap,
            approximate: false,
        }
    }

    fn grid(t1: [[f64; 2]; 2], t2: [[f64; 2]; 2], gaps: [[f64; 2]; 2]) -> IntersectionGrid {
        let rows = (0..2)
            .map(|i| (0..2).map(|j| entry(t1[i][j], t2[i][j], gaps[i][j])).collect())
            .collect();
        IntersectionGrid::from_rows(rows, false, false)
    }

    #[test]
    fn accepts_consistent_grid() {
        let g = grid([[0.0, 1.0], [0.0, 1.0]], [[0.0, 0.0], [1.0, 1.0]], [[0.0; 2]; 2]);
        assert!(ValidateNetwork::new(&g, 1e-4).execute().is_ok());
    }

    #[test]
    fn rejects_gap_above_tolerance() {
        let g = grid(
            [[0.0, 1.0], [0.0, 1.0]],
            [[0.0, 0.0], [1.0, 1.0]],
            [[0.0, 0.0], [0.0, 0.070_711]],
        );
        assert!(ValidateNetwork::new(&g, 0.070_72).execute().is_ok());
        let err = ValidateNetwork::new(&g, 0.070_71).execute().unwrap_err();
        assert!(matches!(
            err,
            GordonError::Network(NetworkError::IncompatibleNetwork(Incompatibility::Gap {
                profile: 1,
                guide: 1,
                ..
            }))
        ));
    }

    #[test]
    fn rejects_undefined_gap() {
        let g = grid(
            [[0.0, 1.0], [0.0, 1.0]],
            [[0.0, 0.0], [1.0, 1.0]],
            [[0.0, f64::NAN], [0.3, 0.0]],
        );
        assert_eq!(g.max_gap().0, 0);
        assert_eq!(g.max_gap().1, 1);
        let err = ValidateNetwork::new(&g, 1.0).execute().unwrap_err();
        assert!(matches!(
            err,
            GordonError::Network(NetworkError::IncompatibleNetwork(Incompatibility::Gap {
                profile: 0,
                guide: 1,
                ..
            }))
        ));
    }

    #[test]
    fn rejects_decreasing_profile_parameters() {
        let g = grid([[0.0, 1.0], [1.0, 0.0]], [[0.0, 0.0], [1.0, 1.0]], [[0.0; 2]; 2]);
        let err = ValidateNetwork::new(&g, 1e-4).execute().unwrap_err();
        assert!(matches!(
            err,
            GordonError::Network(NetworkError::IncompatibleNetwork(Incompatibility::Ordering {
                curve: CurveId::Profile(1),
                position: 1,
            }))
        ));
    }

    #[test]
    fn rejects_repeated_guide_parameters() {
        let g = grid([[0.0, 1.0], [0.0, 1.0]], [[0.0, 0.5], [1.0, 0.5]], [[0.0; 2]; 2]);
        let err = ValidateNetwork::new(&g, 1e-4).execute().unwrap_err();
        assert!(matches!(
            err,
            GordonError::Network(NetworkError::IncompatibleNetwork(Incompatibility::Ordering {
                curve: CurveId::Guide(1),
                ..
            }))
        ));
    }

    #[test]
    fn gap_is_reported_before_ordering() {
        let g = grid([[0.0, 1.0], [1.0, 0.0]], [[0.0, 0.0], [1.0, 1.0]], [[0.5, 0.0], [0.0, 0.0]]);
        let err = ValidateNetwork::new(&g, 1e-4).execute().unwrap_err();
        assert!(matches!(
            err,
            GordonError::Network(NetworkError::IncompatibleNetwork(Incompatibility::Gap { .. }))
        ));
    }
}
