use tracing::{debug, warn};

use crate::context::InterpolationContext;
use crate::error::Result;
use crate::geometry::{Curve, CurveDomain, NetworkCurve};
use crate::math::Point3;
use crate::operations::query::{CurveCurveIntersect, CurveIntersection};

use super::CurveNetwork;

/// Pairwise intersections of a network, indexed `[profile][guide]`.
///
/// `t1` of each entry is the parameter on the profile, `t2` the parameter on
/// the guide.
#[derive(Debug, Clone)]
pub struct IntersectionGrid {
    n_profiles: usize,
    n_guides: usize,
    entries: Vec<CurveIntersection>,
    closed_u: bool,
    closed_v: bool,
}

impl IntersectionGrid {
    pub(crate) fn from_rows(
        rows: Vec<Vec<CurveIntersection>>,
        closed_u: bool,
        closed_v: bool,
    ) -> Self {
        let n_profiles = rows.len();
        let n_guides = rows.first().map_or(0, Vec::len);
        Self {
            n_profiles,
            n_guides,
            entries: rows.into_iter().flatten().collect(),
            closed_u,
            closed_v,
        }
    }

    /// Number of profiles (rows).
    #[must_use]
    pub fn n_profiles(&self) -> usize {
        self.n_profiles
    }

    /// Number of guides (columns).
    #[must_use]
    pub fn n_guides(&self) -> usize {
        self.n_guides
    }

    /// The intersection of `profile` and `guide`.
    #[must_use]
    pub fn get(&self, profile: usize, guide: usize) -> &CurveIntersection {
        &self.entries[profile * self.n_guides + guide]
    }

    /// Parameters along `profile` at each guide.
    #[must_use]
    pub fn profile_parameters(&self, profile: usize) -> Vec<f64> {
        (0..self.n_guides).map(|j| self.get(profile, j).t1).collect()
    }

    /// Parameters along `guide` at each profile.
    #[must_use]
    pub fn guide_parameters(&self, guide: usize) -> Vec<f64> {
        (0..self.n_profiles).map(|i| self.get(i, guide).t2).collect()
    }

    /// Reconciled intersection points, indexed `[profile][guide]`.
    #[must_use]
    pub fn points(&self) -> Vec<Vec<Point3>> {
        (0..self.n_profiles)
            .map(|i| (0..self.n_guides).map(|j| self.get(i, j).point).collect())
            .collect()
    }

    /// Whether the profiles are closed and the first and last guides meet
    /// them at their seam.
    #[must_use]
    pub fn is_closed_u(&self) -> bool {
        self.closed_u
    }

    /// Whether the guides are closed and the first and last profiles meet
    /// them at their seam.
    #[must_use]
    pub fn is_closed_v(&self) -> bool {
        self.closed_v
    }

    /// The pair with the largest gap as `(profile, guide, gap)`.
    ///
    /// A NaN gap outranks every finite one.
    pub fn max_gap(&self) -> (usize, usize, f64) {
        self.entries
            .iter()
            .enumerate()
            .fold((0, 0, 0.0), |best, (k, entry)| {
                if (entry.gap.is_nan() && !best.2.is_nan()) || entry.gap > best.2 {
                    (k / self.n_guides, k % self.n_guides, entry.gap)
                } else {
                    best
                }
            })
    }

    /// Pairs whose closest approach could only be sampled.
    pub fn approximate_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.approximate)
            .map(|(k, _)| (k / self.n_guides, k % self.n_guides))
    }
}

/// Intersects every profile with every guide.
///
/// Closed families whose first (or last) transversal curve lies on the seam
/// get the seam curve on both sides: the returned network then carries a
/// duplicate of that curve and the grid an extra row or column.
pub struct FindIntersections<'a> {
    network: &'a CurveNetwork,
}

impl<'a> FindIntersections<'a> {
    /// Creates a new `FindIntersections` operation.
    #[must_use]
    pub fn new(network: &'a CurveNetwork) -> Self {
        Self { network }
    }

    /// Executes the operation, returning the (possibly seam-extended) network
    /// and its intersection grid.
    ///
    /// # Errors
    ///
    /// Returns an error if curve evaluation fails.
    pub fn execute(&self, ctx: &InterpolationContext) -> Result<(CurveNetwork, IntersectionGrid)> {
        let profiles = self.network.profiles();
        let guides = self.network.guides();
        debug!(
            profiles = profiles.len(),
            guides = guides.len(),
            "intersecting curve network"
        );

        let flat = intersect_all(profiles, guides)?;
        let mut rows: Vec<Vec<CurveIntersection>> =
            flat.chunks(guides.len()).map(<[_]>::to_vec).collect();

        let mut profiles = profiles.to_vec();
        let mut guides = guides.to_vec();

        let mut closed_u = false;
        if ctx.all_closed(&profiles)? {
            let domains: Vec<CurveDomain> = profiles.iter().map(Curve::domain).collect();
            let fix = close_seam(&mut rows, &domains, Along::First, ctx.parameter_tolerance);
            apply_seam_fix(fix, &mut guides);
            closed_u = fix != SeamFix::None;
        }

        let mut closed_v = false;
        if ctx.all_closed(&guides)? {
            let domains: Vec<CurveDomain> = guides.iter().map(Curve::domain).collect();
            let mut columns = transpose(&rows);
            let fix = close_seam(&mut columns, &domains, Along::Second, ctx.parameter_tolerance);
            rows = transpose(&columns);
            apply_seam_fix(fix, &mut profiles);
            closed_v = fix != SeamFix::None;
        }
        if closed_u || closed_v {
            debug!(closed_u, closed_v, "closed curve family detected");
        }

        let grid = IntersectionGrid::from_rows(rows, closed_u, closed_v);
        for (i, j) in grid.approximate_pairs() {
            warn!(
                profile = i,
                guide = j,
                gap = grid.get(i, j).gap,
                "intersection solver did not converge, using sampled closest pair"
            );
        }
        Ok((CurveNetwork { profiles, guides }, grid))
    }
}

#[cfg(feature = "parallel")]
pub(super) fn intersect_all(
    profiles: &[NetworkCurve],
    guides: &[NetworkCurve],
) -> Result<Vec<CurveIntersection>> {
    use rayon::prelude::*;

    let n = guides.len();
    (0..profiles.len() * n)
        .into_par_iter()
        .map(|k| CurveCurveIntersect::new(&profiles[k / n], &guides[k % n]).execute())
        .collect()
}

#[cfg(not(feature = "parallel"))]
pub(super) fn intersect_all(
    profiles: &[NetworkCurve],
    guides: &[NetworkCurve],
) -> Result<Vec<CurveIntersection>> {
    let n = guides.len();
    (0..profiles.len() * n)
        .map(|k| CurveCurveIntersect::new(&profiles[k / n], &guides[k % n]).execute())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeamFix {
    None,
    Snapped,
    Appended,
    Prepended,
}

/// Which parameter of an entry runs along the closed curves.
#[derive(Debug, Clone, Copy)]
enum Along {
    First,
    Second,
}

impl Along {
    fn get(self, entry: &CurveIntersection) -> f64 {
        match self {
            Self::First => entry.t1,
            Self::Second => entry.t2,
        }
    }

    fn set(self, entry: &mut CurveIntersection, value: f64) {
        match self {
            Self::First => entry.t1 = value,
            Self::Second => entry.t2 = value,
        }
    }
}

/// Snaps seam intersections of closed curves onto the domain ends.
///
/// `rows[r]` holds the intersections along closed curve `r`.
fn close_seam(
    rows: &mut [Vec<CurveIntersection>],
    domains: &[CurveDomain],
    along: Along,
    tol: f64,
) -> SeamFix {
    let count = rows.first().map_or(0, Vec::len);
    if count < 2 {
        return SeamFix::None;
    }
    let on_seam = |rows: &[Vec<CurveIntersection>], c: usize| {
        rows.iter().zip(domains).all(|(row, domain)| {
            let s = domain.normalize(along.get(&row[c]));
            s <= tol || s >= 1.0 - tol
        })
    };
    let first = on_seam(rows, 0);
    let last = on_seam(rows, count - 1);

    let fix = match (first, last) {
        (true, true) => SeamFix::Snapped,
        (true, false) => SeamFix::Appended,
        (false, true) => SeamFix::Prepended,
        (false, false) => return SeamFix::None,
    };
    for (row, domain) in rows.iter_mut().zip(domains) {
        match fix {
            SeamFix::Snapped => {
                along.set(&mut row[0], domain.t_min);
                along.set(&mut row[count - 1], domain.t_max);
            }
            SeamFix::Appended => {
                along.set(&mut row[0], domain.t_min);
                let mut copy = row[0];
                along.set(&mut copy, domain.t_max);
                row.push(copy);
            }
            SeamFix::Prepended => {
                along.set(&mut row[count - 1], domain.t_max);
                let mut copy = row[count - 1];
                along.set(&mut copy, domain.t_min);
                row.insert(0, copy);
            }
            SeamFix::None => {}
        }
    }
    fix
}

fn apply_seam_fix(fix: SeamFix, transversal: &mut Vec<NetworkCurve>) {
    match fix {
        SeamFix::Appended => transversal.push(transversal[0].clone()),
        SeamFix::Prepended => transversal.insert(0, transversal[transversal.len() - 1].clone()),
        SeamFix::None | SeamFix::Snapped => {}
    }
}

fn transpose(rows: &[Vec<CurveIntersection>]) -> Vec<Vec<CurveIntersection>> {
    let cols = rows.first().map_or(0, Vec::len);
    (0..cols)
        .map(|c| rows.iter().map(|row| row[c]).collect())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::context::InterpolationParams;
    use crate::geometry::{BSplineCurve, NurbsCurve};
    use crate::error::{GordonError, Incompatibility, NetworkError};
    use crate::operations::network::tests::{line, square};
    use crate::operations::network::{CurveId, ValidateNetwork};
    use std::f64::consts::{FRAC_1_SQRT_2, TAU};

    fn context(network: &CurveNetwork) -> InterpolationContext {
        InterpolationContext::new(
            InterpolationParams::default(),
            network.profiles(),
            network.guides(),
        )
        .unwrap()
    }

    /// Full circle of `radius` at height `z`, starting on the +x axis.
    fn circle(radius: f64, z: f64) -> NetworkCurve {
        let w = FRAC_1_SQRT_2;
        let r = radius;
        let points = vec![
            Point3::new(r, 0.0, z),
            Point3::new(r, r, z),
            Point3::new(0.0, r, z),
            Point3::new(-r, r, z),
            Point3::new(-r, 0.0, z),
            Point3::new(-r, -r, z),
            Point3::new(0.0, -r, z),
            Point3::new(r, -r, z),
            Point3::new(r, 0.0, z),
        ];
        let knots = vec![0.0, 0.0, 0.0, 0.25, 0.25, 0.5, 0.5, 0.75, 0.75, 1.0, 1.0, 1.0];
        NurbsCurve::new(2, knots, points, vec![1.0, w, 1.0, w, 1.0, w, 1.0, w, 1.0])
            .unwrap()
            .into()
    }

    #[test]
    fn square_grid() {
        let network = square();
        let (extended, grid) = FindIntersections::new(&network).execute(&context(&network)).unwrap();
        assert_eq!(extended.guides().len(), 2);
        assert_eq!(grid.n_profiles(), 2);
        assert_eq!(grid.n_guides(), 2);
        assert!(!grid.is_closed_u());
        let corner = grid.get(1, 1);
        assert!((corner.point - Point3::new(1.0, 1.0, 0.0)).norm() < 1e-10);
        assert!((corner.t1 - 1.0).abs() < 1e-10);
        assert!((corner.t2 - 1.0).abs() < 1e-10);
        assert_eq!(grid.profile_parameters(0).len(), 2);
        assert!(grid.max_gap().2 < 1e-10);
        assert_eq!(grid.approximate_pairs().count(), 0);
    }

    #[test]
    fn reports_largest_gap() {
        let network = CurveNetwork::new(
            vec![line((0.0, 0.0, 0.0), (1.0, 0.0, 0.0)), line((0.0, 1.0, 0.3), (1.0, 1.0, 0.3))],
            vec![line((0.0, 0.0, 0.0), (0.0, 1.0, 0.0)), line((1.0, 0.0, 0.0), (1.0, 1.0, 0.1))],
        )
        .unwrap();
        let (_, grid) = FindIntersections::new(&network).execute(&context(&network)).unwrap();
        let (i, j, gap) = grid.max_gap();
        assert_eq!((i, j), (1, 0));
        assert!((gap - 0.3).abs() < 1e-9);
    }

    /// Vertical unit segment on the unit cylinder at `angle`.
    fn ruling(angle: f64) -> NetworkCurve {
        let (s, c) = angle.sin_cos();
        BSplineCurve::new(
            1,
            vec![0.0, 0.0, 1.0, 1.0],
            vec![Point3::new(c, s, 0.0), Point3::new(c, s, 1.0)],
        )
        .unwrap()
        .into()
    }

    #[test]
    fn unconverged_pairs_still_build_the_grid() {
        let collapsed = |x: f64, y: f64| -> NetworkCurve {
            let q = Point3::new(x, y, 0.0);
            BSplineCurve::uniform(1, vec![q, q]).unwrap().into()
        };
        let network = CurveNetwork::new(
            vec![line((0.0, 0.0, 0.0), (1.0, 0.0, 0.0)), collapsed(1.0, 1.0)],
            vec![line((0.0, 0.0, 0.0), (0.0, 1.0, 0.0)), collapsed(1.0, 1.0)],
        )
        .unwrap();
        let ctx = context(&network);
        let (extended, grid) = FindIntersections::new(&network).execute(&ctx).unwrap();

        assert_eq!(extended.guides().len(), 2);
        assert!(!grid.is_closed_u());
        assert!(!grid.is_closed_v());
        assert_eq!(grid.approximate_pairs().collect::<Vec<_>>(), vec![(1, 1)]);
        assert!(grid.get(1, 1).gap < f64::EPSILON);
        assert!((grid.get(0, 1).gap - 1.0).abs() < 1e-12);

        let err = ValidateNetwork::new(&grid, 0.5).execute().unwrap_err();
        assert!(matches!(
            err,
            GordonError::Network(NetworkError::IncompatibleNetwork(Incompatibility::Gap {
                profile: 0,
                guide: 1,
                ..
            }))
        ));
        let err = ValidateNetwork::new(&grid, 2.0).execute().unwrap_err();
        assert!(matches!(
            err,
            GordonError::Network(NetworkError::IncompatibleNetwork(Incompatibility::Ordering {
                curve: CurveId::Profile(1),
                position: 1,
            }))
        ));
    }

    #[test]
    fn closed_guides_get_a_seam_profile() {
        let profiles = vec![ruling(0.0), ruling(2.0), ruling(4.0)];
        let guides = vec![circle(1.0, 0.0), circle(1.0, 1.0)];
        let network = CurveNetwork::new(profiles, guides).unwrap();
        let (extended, grid) = FindIntersections::new(&network).execute(&context(&network)).unwrap();

        assert!(!grid.is_closed_u());
        assert!(grid.is_closed_v());
        assert_eq!(extended.profiles().len(), 4);
        assert_eq!(extended.guides().len(), 2);
        assert_eq!(grid.n_profiles(), 4);
        for j in 0..2 {
            let params = grid.guide_parameters(j);
            assert!(params[0].abs() < f64::EPSILON);
            assert!((params[3] - 1.0).abs() < f64::EPSILON);
            assert!(params.windows(2).all(|w| w[0] < w[1]));
            assert!((grid.get(0, j).point - grid.get(3, j).point).norm() < f64::EPSILON);
        }
    }

    #[test]
    fn seam_guides_at_both_ends_are_snapped() {
        let profiles = vec![circle(1.0, 0.0), circle(1.0, 1.0)];
        let guides = vec![ruling(0.0), ruling(2.0), ruling(4.0), ruling(TAU)];
        let network = CurveNetwork::new(profiles, guides).unwrap();
        let (extended, grid) = FindIntersections::new(&network).execute(&context(&network)).unwrap();

        assert!(grid.is_closed_u());
        assert_eq!(extended.guides().len(), 4);
        assert_eq!(grid.n_guides(), 4);
        for i in 0..2 {
            let params = grid.profile_parameters(i);
            assert!(params[0].abs() < f64::EPSILON);
            assert!((params[3] - 1.0).abs() < f64::EPSILON);
            assert!(params.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn seam_guide_last_is_prepended() {
        let profiles = vec![circle(1.0, 0.0), circle(1.0, 1.0)];
        let guides = vec![ruling(2.0), ruling(4.0), ruling(TAU)];
        let network = CurveNetwork::new(profiles, guides).unwrap();
        let (extended, grid) = FindIntersections::new(&network).execute(&context(&network)).unwrap();

        assert!(grid.is_closed_u());
        assert_eq!(extended.guides().len(), 4);
        assert_eq!(grid.n_guides(), 4);
        let seam = extended.guides()[0].evaluate(0.5).unwrap();
        assert!((seam - Point3::new(1.0, 0.0, 0.5)).norm() < 1e-12);
        for i in 0..2 {
            let params = grid.profile_parameters(i);
            assert!(params[0].abs() < f64::EPSILON);
            assert!((params[3] - 1.0).abs() < f64::EPSILON);
            assert!(params.windows(2).all(|w| w[0] < w[1]));
            assert!((grid.get(i, 0).point - grid.get(i, 3).point).norm() < f64::EPSILON);
        }
    }

    #[test]
    fn closed_profiles_get_a_seam_guide() {
        let profiles = vec![circle(1.0, 0.0), circle(1.0, 1.0)];
        let guides = vec![ruling(0.0), ruling(2.0), ruling(4.0)];
        let network = CurveNetwork::new(profiles, guides).unwrap();
        let (extended, grid) = FindIntersections::new(&network).execute(&context(&network)).unwrap();

        assert!(grid.is_closed_u());
        assert!(!grid.is_closed_v());
        assert_eq!(extended.guides().len(), 4);
        assert_eq!(grid.n_guides(), 4);
        for i in 0..2 {
            let params = grid.profile_parameters(i);
            assert!(params[0].abs() < f64::EPSILON);
            assert!((params[3] - 1.0).abs() < f64::EPSILON);
            assert!(params.windows(2).all(|w| w[0] < w[1]));
            assert!((grid.get(i, 0).point - grid.get(i, 3).point).norm() < f64::EPSILON);
        }
    }
}
