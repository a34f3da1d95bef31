use tracing::info;

use crate::context::{InterpolationContext, InterpolationParams};
use crate::error::Result;
use crate::geometry::{BSplineSurface, NetworkCurve};
use crate::operations::creation::{InterpolateGrid, SkinCurves};
use crate::operations::network::{
    CurveNetwork, FindIntersections, IntersectionGrid, ReparametrizeNetwork, ReparametrizedNetwork,
    ValidateNetwork,
};

use super::combine::CombineGordon;

/// A Gordon surface together with the surfaces it was built from.
#[derive(Debug, Clone)]
pub struct GordonSurface {
    surface: BSplineSurface,
    profile_skin: BSplineSurface,
    guide_skin: BSplineSurface,
    intersection_surface: BSplineSurface,
    params_u: Vec<f64>,
    params_v: Vec<f64>,
    max_reparametrization_error: f64,
}

impl GordonSurface {
    /// The interpolating surface.
    #[must_use]
    pub fn surface(&self) -> &BSplineSurface {
        &self.surface
    }

    /// Skin through the reparametrized profiles.
    #[must_use]
    pub fn profile_skin(&self) -> &BSplineSurface {
        &self.profile_skin
    }

    /// Skin through the reparametrized guides, with `u` along the profiles.
    #[must_use]
    pub fn guide_skin(&self) -> &BSplineSurface {
        &self.guide_skin
    }

    /// Tensor-product interpolant of the intersection points.
    #[must_use]
    pub fn intersection_surface(&self) -> &BSplineSurface {
        &self.intersection_surface
    }

    /// `u` parameter of each guide on the surface.
    #[must_use]
    pub fn params_u(&self) -> &[f64] {
        &self.params_u
    }

    /// `v` parameter of each profile on the surface.
    #[must_use]
    pub fn params_v(&self) -> &[f64] {
        &self.params_v
    }

    /// Largest distance between a reparametrized curve and its input.
    #[must_use]
    pub fn max_reparametrization_error(&self) -> f64 {
        self.max_reparametrization_error
    }

    /// Consumes the result, returning only the surface.
    #[must_use]
    pub fn into_surface(self) -> BSplineSurface {
        self.surface
    }
}

/// Interpolates a network of profile and guide curves with a Gordon surface.
///
/// Profiles run along `u` and guides along `v`. Each profile must cross each
/// guide (within the tolerance) and the crossings must be ordered
/// consistently; see [`SortCurveNetwork`](crate::operations::network::SortCurveNetwork)
/// for networks that are not.
pub struct InterpolateCurveNetwork<'a> {
    profiles: &'a [NetworkCurve],
    guides: &'a [NetworkCurve],
    params: InterpolationParams,
}

impl<'a> InterpolateCurveNetwork<'a> {
    /// Creates a new `InterpolateCurveNetwork` operation with default parameters.
    #[must_use]
    pub fn new(profiles: &'a [NetworkCurve], guides: &'a [NetworkCurve]) -> Self {
        Self {
            profiles,
            guides,
            params: InterpolationParams::default(),
        }
    }

    /// Sets the interpolation parameters.
    #[must_use]
    pub fn with_params(mut self, params: InterpolationParams) -> Self {
        self.params = params;
        self
    }

    /// Executes the interpolation.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::InsufficientInput`](crate::error::NetworkError::InsufficientInput)
    ///   for fewer than two profiles or guides.
    /// - [`NetworkError::InvalidTolerance`](crate::error::NetworkError::InvalidTolerance)
    ///   for a non-positive tolerance.
    /// - [`NetworkError::IncompatibleNetwork`](crate::error::NetworkError::IncompatibleNetwork)
    ///   if curves miss each other or cross out of order.
    /// - An [`InterpolationError`](crate::error::InterpolationError) if a
    ///   refit, skin or combination fails.
    pub fn execute(&self) -> Result<GordonSurface> {
        let network = CurveNetwork::new(self.profiles.to_vec(), self.guides.to_vec())?;
        let ctx = InterpolationContext::new(self.params, network.profiles(), network.guides())?;
        info!(
            profiles = network.profiles().len(),
            guides = network.guides().len(),
            tolerance = ctx.tolerance(),
            "interpolating curve network"
        );

        let (network, grid) = FindIntersections::new(&network).execute(&ctx)?;
        ValidateNetwork::new(&grid, ctx.tolerance()).execute()?;
        let reparametrized = ReparametrizeNetwork::new(&network, &grid).execute(&ctx)?;

        let (profile_skin, guide_skin, intersection_surface) =
            build_surfaces(&reparametrized, &grid, self.params.max_skin_degree)?;
        let surface = CombineGordon::new(&profile_skin, &guide_skin, &intersection_surface).execute()?;

        info!(
            degree_u = surface.degree_u(),
            degree_v = surface.degree_v(),
            control_points_u = surface.control_points().len(),
            control_points_v = surface.control_points()[0].len(),
            max_reparametrization_error = reparametrized.max_error,
            "gordon surface built"
        );

        let ReparametrizedNetwork { targets, max_error, .. } = reparametrized;
        Ok(GordonSurface {
            surface,
            profile_skin,
            guide_skin,
            intersection_surface,
            params_u: targets.u().to_vec(),
            params_v: targets.v().to_vec(),
            max_reparametrization_error: max_error,
        })
    }
}

/// Interpolates `profiles` and `guides` with default parameters and the
/// given tolerance, returning only the surface.
///
/// # Errors
///
/// See [`InterpolateCurveNetwork::execute`].
pub fn interpolate_curve_network(
    profiles: &[NetworkCurve],
    guides: &[NetworkCurve],
    tolerance: f64,
) -> Result<BSplineSurface> {
    let params = InterpolationParams {
        tolerance,
        ..InterpolationParams::default()
    };
    Ok(InterpolateCurveNetwork::new(profiles, guides)
        .with_params(params)
        .execute()?
        .into_surface())
}

fn skin_profiles(
    network: &ReparametrizedNetwork,
    grid: &IntersectionGrid,
    max_degree: usize,
) -> Result<BSplineSurface> {
    SkinCurves::new(&network.profiles, network.targets.v(), max_degree)
        .closed(grid.is_closed_v())
        .execute()
}

fn skin_guides(
    network: &ReparametrizedNetwork,
    grid: &IntersectionGrid,
    max_degree: usize,
) -> Result<BSplineSurface> {
    Ok(SkinCurves::new(&network.guides, network.targets.u(), max_degree)
        .closed(grid.is_closed_u())
        .execute()?
        .transposed())
}

fn interpolate_intersections(
    network: &ReparametrizedNetwork,
    grid: &IntersectionGrid,
    max_degree: usize,
) -> Result<BSplineSurface> {
    InterpolateGrid::new(&grid.points(), network.targets.u(), network.targets.v(), max_degree)
        .closed(grid.is_closed_u(), grid.is_closed_v())
        .execute()
}

#[cfg(feature = "parallel")]
fn build_surfaces(
    network: &ReparametrizedNetwork,
    grid: &IntersectionGrid,
    max_degree: usize,
) -> Result<(BSplineSurface, BSplineSurface, BSplineSurface)> {
    let (profiles, (guides, intersections)) = rayon::join(
        || skin_profiles(network, grid, max_degree),
        || {
            rayon::join(
                || skin_guides(network, grid, max_degree),
                || interpolate_intersections(network, grid, max_degree),
            )
        },
    );
    Ok((profiles?, guides?, intersections?))
}

#[cfg(not(feature = "parallel"))]
fn build_surfaces(
    network: &ReparametrizedNetwork,
    grid: &IntersectionGrid,
    max_degree: usize,
) -> Result<(BSplineSurface, BSplineSurface, BSplineSurface)> {
    Ok((
        skin_profiles(network, grid, max_degree)?,
        skin_guides(network, grid, max_degree)?,
        interpolate_intersections(network, grid, max_degree)?,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::{GordonError, Incompatibility, NetworkError};
    use crate::geometry::knots;
    use crate::geometry::{BSplineCurve, Curve, NurbsCurve, Surface};
    use crate::math::{linspace, Point3};
    use crate::operations::network::tests::line;
    use std::f64::consts::{FRAC_1_SQRT_2, TAU};

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn four_lines_give_the_bilinear_patch() {
        let profiles = [line((0.0, 0.0, 0.0), (1.0, 0.0, 0.0)), line((0.0, 1.0, 0.0), (1.0, 1.0, 1.0))];
        let guides = [line((0.0, 0.0, 0.0), (0.0, 1.0, 0.0)), line((1.0, 0.0, 0.0), (1.0, 1.0, 1.0))];
        let result = InterpolateCurveNetwork::new(&profiles, &guides).execute().unwrap();
        let surface = result.surface();
        assert_eq!((surface.degree_u(), surface.degree_v()), (1, 1));
        for u in linspace(0.0, 1.0, 5) {
            for v in linspace(0.0, 1.0, 5) {
                let expected = p(u, v, u * v);
                assert!((surface.evaluate(u, v).unwrap() - expected).norm() < 1e-10);
            }
        }
        assert!(result.max_reparametrization_error() < 1e-12);
    }

    /// Bicubic patch whose isocurves form an exactly consistent network.
    fn patch() -> BSplineSurface {
        let grid: Vec<Vec<Point3>> = (0..5)
            .map(|i| {
                (0..4)
                    .map(|j| {
                        let (x, y) = (f64::from(i), f64::from(j));
                        p(x, y, 0.3 * ((x + 1.0) * (y + 0.5)).sin())
                    })
                    .collect()
            })
            .collect();
        BSplineSurface::new(
            3,
            3,
            knots::clamped(3, &[0.5], 0.0, 1.0),
            knots::clamped(3, &[], 0.0, 1.0),
            grid,
        )
        .unwrap()
    }

    #[test]
    fn interpolates_curved_network_exactly() {
        let source = patch();
        let vs = [0.0, 0.35, 0.7, 1.0];
        let us = [0.0, 0.3, 0.6, 1.0];
        let profiles: Vec<NetworkCurve> = vs.iter().map(|&v| source.isocurve_v(v).unwrap().into()).collect();
        let guides: Vec<NetworkCurve> = us.iter().map(|&u| source.isocurve_u(u).unwrap().into()).collect();

        let result = InterpolateCurveNetwork::new(&profiles, &guides).execute().unwrap();
        let surface = result.surface();
        for (k, &v) in result.params_v().iter().enumerate() {
            assert!((v - vs[k]).abs() < 1e-8);
            for t in linspace(0.0, 1.0, 11) {
                let d = surface.evaluate(t, v).unwrap() - profiles[k].evaluate(t).unwrap();
                assert!(d.norm() < 1e-7);
            }
        }
        for (k, &u) in result.params_u().iter().enumerate() {
            for t in linspace(0.0, 1.0, 11) {
                let d = surface.evaluate(u, t).unwrap() - guides[k].evaluate(t).unwrap();
                assert!(d.norm() < 1e-7);
            }
        }
    }

    #[test]
    fn misaligned_parameters_are_reconciled() {
        let skewed: NetworkCurve =
            BSplineCurve::new(2, knots::clamped(2, &[], 0.0, 1.0), vec![p(0.0, 1.0, 0.0), p(0.8, 1.0, 0.0), p(1.0, 1.0, 0.0)])
                .unwrap()
                .into();
        let profiles = [line((0.0, 0.0, 0.0), (1.0, 0.0, 0.0)), skewed];
        let guides = [
            line((0.0, 0.0, 0.0), (0.0, 1.0, 0.0)),
            line((0.5, 0.0, 0.0), (0.5, 1.0, 0.0)),
            line((1.0, 0.0, 0.0), (1.0, 1.0, 0.0)),
        ];
        let result = InterpolateCurveNetwork::new(&profiles, &guides).execute().unwrap();
        let u = result.params_u()[1];
        assert!(u > 0.36 && u < 0.5);
        for v in linspace(0.0, 1.0, 7) {
            let point = result.surface().evaluate(u, v).unwrap();
            assert!((point - p(0.5, v, 0.0)).norm() < 1e-9);
        }
        assert!(result.max_reparametrization_error() <= 1e-4);
    }

    #[test]
    fn gap_threshold_decides_acceptance() {
        let profiles = [line((0.0, 0.0, 0.0), (10.0, 0.0, 0.0)), line((0.0, 10.0, 0.0), (10.0, 10.0, 0.0))];
        let guides = [line((0.0, 0.0, 0.0), (0.0, 10.0, 0.0)), line((10.0, 0.0, 0.05), (10.0, 10.0, 0.05))];

        let surface = interpolate_curve_network(&profiles, &guides, 0.0501).unwrap();
        let corner = surface.evaluate(1.0, 1.0).unwrap();
        assert!((corner - p(10.0, 10.0, 0.025)).norm() < 1e-9);

        let err = interpolate_curve_network(&profiles, &guides, 0.0499).unwrap_err();
        assert!(matches!(
            err,
            GordonError::Network(NetworkError::IncompatibleNetwork(Incompatibility::Gap { guide: 1, .. }))
        ));
    }

    #[test]
    fn cardinality_is_checked_first() {
        let profiles = [line((0.0, 0.0, 0.0), (1.0, 0.0, 0.0))];
        let guides = [line((0.0, 0.0, 0.0), (0.0, 1.0, 0.0)), line((1.0, 0.0, 0.0), (1.0, 1.0, 0.0))];
        let err = interpolate_curve_network(&profiles, &guides, -1.0).unwrap_err();
        assert!(matches!(
            err,
            GordonError::Network(NetworkError::InsufficientInput { profiles: 1, guides: 2 })
        ));
        let err = interpolate_curve_network(&guides, &guides, f64::NAN).unwrap_err();
        assert!(matches!(err, GordonError::Network(NetworkError::InvalidTolerance(_))));
    }

    fn circle(z: f64) -> NetworkCurve {
        let w = FRAC_1_SQRT_2;
        let points = vec![
            p(1.0, 0.0, z),
            p(1.0, 1.0, z),
            p(0.0, 1.0, z),
            p(-1.0, 1.0, z),
            p(-1.0, 0.0, z),
            p(-1.0, -1.0, z),
            p(0.0, -1.0, z),
            p(1.0, -1.0, z),
            p(1.0, 0.0, z),
        ];
        let knots = vec![0.0, 0.0, 0.0, 0.25, 0.25, 0.5, 0.5, 0.75, 0.75, 1.0, 1.0, 1.0];
        NurbsCurve::new(2, knots, points, vec![1.0, w, 1.0, w, 1.0, w, 1.0, w, 1.0])
            .unwrap()
            .into()
    }

    /// Vertical segments on the unit cylinder from `z = 0` to `z = 2`.
    fn rulings(angles: &[f64]) -> Vec<NetworkCurve> {
        angles
            .iter()
            .map(|a| {
                let (s, c) = a.sin_cos();
                line((c, s, 0.0), (c, s, 2.0))
            })
            .collect()
    }

    #[test]
    fn closed_profiles_give_a_closed_surface() {
        let profiles = [circle(0.0), circle(1.0), circle(2.0)];
        let guides = rulings(&[0.0, 2.0, 4.0]);
        let result = InterpolateCurveNetwork::new(&profiles, &guides).execute().unwrap();
        let surface = result.surface();
        assert_eq!(result.params_u().len(), 4);

        for (k, &v) in result.params_v().iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let z = k as f64;
            for u in linspace(0.0, 1.0, 17) {
                let point = surface.evaluate(u, v).unwrap();
                assert!((point.coords.xy().norm() - 1.0).abs() < 1e-3);
                assert!((point.z - z).abs() < 1e-6);
            }
        }
        for v in linspace(0.0, 1.0, 5) {
            let start = surface.evaluate(0.0, v).unwrap();
            let end = surface.evaluate(1.0, v).unwrap();
            assert!((start - end).norm() < 1e-9);
        }
    }

    #[test]
    fn seam_guide_last_closes_the_surface() {
        let profiles = [circle(0.0), circle(1.0), circle(2.0)];
        let guides = rulings(&[2.0, 4.0, TAU]);
        let result = InterpolateCurveNetwork::new(&profiles, &guides).execute().unwrap();
        let surface = result.surface();
        assert_eq!(result.params_u().len(), 4);
        for v in linspace(0.0, 1.0, 5) {
            let start = surface.evaluate(0.0, v).unwrap();
            let end = surface.evaluate(1.0, v).unwrap();
            assert!((start - end).norm() < 1e-9);
            assert!((start.coords.xy() - p(1.0, 0.0, 0.0).coords.xy()).norm() < 1e-9);
        }
    }

    #[test]
    fn closed_guides_give_a_closed_surface() {
        let profiles = rulings(&[0.0, 2.0, 4.0]);
        let guides = [circle(0.0), circle(1.0), circle(2.0)];
        let result = InterpolateCurveNetwork::new(&profiles, &guides).execute().unwrap();
        let surface = result.surface();
        assert_eq!(result.params_v().len(), 4);
        assert_eq!(result.params_u().len(), 3);

        for (k, &u) in result.params_u().iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let z = k as f64;
            for v in linspace(0.0, 1.0, 17) {
                let point = surface.evaluate(u, v).unwrap();
                assert!((point.coords.xy().norm() - 1.0).abs() < 1e-3);
                assert!((point.z - z).abs() < 1e-6);
            }
        }
        for u in linspace(0.0, 1.0, 5) {
            let start = surface.evaluate(u, 0.0).unwrap();
            let end = surface.evaluate(u, 1.0).unwrap();
            assert!((start - end).norm() < 1e-9);
        }
    }
}
