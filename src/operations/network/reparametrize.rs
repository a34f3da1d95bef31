use tracing::{debug, warn};

use crate::context::InterpolationContext;
use crate::error::{GordonError, InterpolationError, Result};
use crate::geometry::knots::{self, KNOT_TOLERANCE};
use crate::geometry::{BSplineCurve, Curve, NetworkCurve};
use crate::math::{angle_between, linspace, Point3};
use crate::operations::creation::FitCurve;

use super::{CurveId, CurveNetwork, IntersectionGrid, ParameterMap};

/// Shared parameters at which every curve crosses its transversal curves.
///
/// `u[j]` is where each profile meets guide `j`; `v[i]` is where each guide
/// meets profile `i`. Both run from exactly 0 to exactly 1.
#[derive(Debug, Clone)]
pub struct TargetParameters {
    u: Vec<f64>,
    v: Vec<f64>,
}

impl TargetParameters {
    /// Averages the normalised intersection parameters of the grid.
    ///
    /// Each curve's parameters are normalised over the trimmed domain between
    /// its first and last intersection before averaging across the family.
    ///
    /// # Errors
    ///
    /// Returns [`InterpolationError::SingularReparametrization`] if a curve's
    /// trimmed domain is empty or the averaged targets are not strictly
    /// increasing.
    pub fn from_grid(grid: &IntersectionGrid) -> Result<Self> {
        let rows: Vec<Vec<f64>> = (0..grid.n_profiles()).map(|i| grid.profile_parameters(i)).collect();
        let columns: Vec<Vec<f64>> = (0..grid.n_guides()).map(|j| grid.guide_parameters(j)).collect();
        Ok(Self {
            u: averaged_targets(&rows, CurveId::Profile)?,
            v: averaged_targets(&columns, CurveId::Guide)?,
        })
    }

    /// Target parameters along the profiles, one per guide.
    #[must_use]
    pub fn u(&self) -> &[f64] {
        &self.u
    }

    /// Target parameters along the guides, one per profile.
    #[must_use]
    pub fn v(&self) -> &[f64] {
        &self.v
    }
}

fn averaged_targets(family: &[Vec<f64>], id: fn(usize) -> CurveId) -> Result<Vec<f64>> {
    let count = family.first().map_or(0, Vec::len);
    if count < 2 {
        return Err(InterpolationError::SingularReparametrization {
            curve: id(0),
            reason: format!("{count} intersections are too few to reparametrize"),
        }
        .into());
    }

    let mut normalized = Vec::with_capacity(family.len());
    for (k, params) in family.iter().enumerate() {
        let (start, end) = (params[0], params[count - 1]);
        if end - start <= 0.0 {
            return Err(InterpolationError::SingularReparametrization {
                curve: id(k),
                reason: format!("empty trimmed domain [{start}, {end}]"),
            }
            .into());
        }
        normalized.push(params.iter().map(|t| (t - start) / (end - start)).collect::<Vec<f64>>());
    }

    #[allow(clippy::cast_precision_loss)]
    let n = family.len() as f64;
    let mut targets: Vec<f64> = (0..count)
        .map(|c| normalized.iter().map(|s| s[c]).sum::<f64>() / n)
        .collect();
    targets[0] = 0.0;
    targets[count - 1] = 1.0;

    if let Some(c) = targets.windows(2).position(|w| w[1] <= w[0]) {
        // Blame the curve whose crossings are closest together there.
        let culprit = normalized
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (a[c + 1] - a[c]).total_cmp(&(b[c + 1] - b[c])))
            .map_or(0, |(k, _)| k);
        return Err(InterpolationError::SingularReparametrization {
            curve: id(culprit),
            reason: format!("averaged targets are not strictly increasing at position {}", c + 1),
        }
        .into());
    }
    Ok(targets)
}

/// A curve refitted onto its target parametrization.
#[derive(Debug, Clone)]
pub struct ReparametrizedCurve {
    /// The refitted curve.
    pub curve: BSplineCurve,
    /// Largest sampled distance from the source curve.
    pub max_error: f64,
}

/// Refits one curve so that its intersections sit at the target parameters.
///
/// The curve is restricted to the trimmed domain between its first and last
/// intersection, moved onto `[first target, last target]` by a monotone
/// [`ParameterMap`] and refitted with the source degree. The fit passes
/// exactly through the intersection points and through kinks, and knot spans
/// are halved until the deviation is within the shape tolerance.
pub struct ReparametrizeCurve<'a> {
    curve: &'a NetworkCurve,
    id: CurveId,
    params: Vec<f64>,
    targets: &'a [f64],
    points: Vec<Point3>,
}

impl<'a> ReparametrizeCurve<'a> {
    /// Creates a new `ReparametrizeCurve` operation.
    ///
    /// `params[k]` is the current parameter of the `k`-th intersection,
    /// `targets[k]` its new parameter and `points[k]` the point to pass
    /// through there.
    #[must_use]
    pub fn new(
        curve: &'a NetworkCurve,
        id: CurveId,
        params: Vec<f64>,
        targets: &'a [f64],
        points: Vec<Point3>,
    ) -> Self {
        Self {
            curve,
            id,
            params,
            targets,
            points,
        }
    }

    /// Executes the refit.
    ///
    /// # Errors
    ///
    /// Returns [`InterpolationError::SingularReparametrization`] if the
    /// parameters or targets are not strictly increasing, and
    /// [`InterpolationError::SingularSystem`] if no refinement level gives a
    /// solvable fit.
    pub fn execute(&self, ctx: &InterpolationContext) -> Result<ReparametrizedCurve> {
        if self.points.len() != self.targets.len() {
            return Err(InterpolationError::SingularReparametrization {
                curve: self.id,
                reason: format!(
                    "{} points for {} targets",
                    self.points.len(),
                    self.targets.len()
                ),
            }
            .into());
        }
        let map = ParameterMap::new(self.id, self.params.clone(), self.targets.to_vec())?;
        let degree = self.curve.degree();
        let (old_start, old_end) = map.old_range();
        let (start, end) = map.new_range();
        let knot_tol = KNOT_TOLERANCE * (end - start);

        let mut constraints: Vec<(f64, Point3)> = self
            .targets
            .iter()
            .copied()
            .zip(self.points.iter().copied())
            .collect();
        for kink in self.kinks(old_start, old_end, ctx)? {
            let t = map.new_parameter(kink);
            let taken = constraints
                .iter()
                .any(|(c, _)| (c - t).abs() <= ctx.parameter_tolerance * (end - start));
            if !taken {
                constraints.push((t, self.curve.evaluate(kink)?));
            }
        }
        constraints.sort_by(|a, b| a.0.total_cmp(&b.0));
        let seam = self.has_smooth_seam(old_start, old_end, ctx)?;

        let source_tol = KNOT_TOLERANCE * self.curve.domain().length();
        let mut interior: Vec<f64> = Vec::new();
        for (value, mult) in knots::interior(degree, &self.curve.knot_vector()) {
            if value > old_start + source_tol && value < old_end - source_tol {
                let t = map.new_parameter(value);
                interior.extend(std::iter::repeat_n(t, mult.min(degree)));
            }
        }
        while interior.len() + degree + 1 < constraints.len() + usize::from(seam) {
            interior = halved(&interior, start, end, knot_tol);
        }

        let max_refinements = ctx.params.max_refinements;
        let mut best: Option<(BSplineCurve, f64)> = None;
        for round in 0..=max_refinements {
            let knot_vector = knots::clamped(degree, &interior, start, end);
            let samples = sample_parameters(&knot_vector, degree, knot_tol)
                .into_iter()
                .map(|t| Ok((t, self.curve.evaluate(map.old_parameter(t))?)))
                .collect::<Result<Vec<_>>>()?;
            let fit = FitCurve::new(degree, &knot_vector, samples)
                .interpolating(constraints.clone())
                .seam_continuity(seam)
                .execute();
            match fit {
                Ok(fitted) => {
                    let error = self.deviation(&map, &fitted, knot_tol)?;
                    if error <= ctx.shape_tolerance {
                        debug!(curve = %self.id, refinements = round, max_error = error, "curve reparametrized");
                        return Ok(ReparametrizedCurve {
                            curve: fitted,
                            max_error: error,
                        });
                    }
                    if best.as_ref().is_none_or(|(_, e)| error < *e) {
                        best = Some((fitted, error));
                    }
                }
                Err(GordonError::Interpolation(InterpolationError::SingularSystem(reason))) => {
                    debug!(curve = %self.id, refinements = round, %reason, "refit is singular, refining");
                }
                Err(err) => return Err(err),
            }
            if round < max_refinements {
                interior = halved(&interior, start, end, knot_tol);
            }
        }

        match best {
            Some((curve, max_error)) => {
                warn!(
                    curve = %self.id,
                    max_error,
                    tolerance = ctx.shape_tolerance,
                    "reparametrized curve exceeds the shape tolerance after {max_refinements} refinements"
                );
                Ok(ReparametrizedCurve { curve, max_error })
            }
            None => Err(InterpolationError::SingularSystem(format!(
                "{} could not be refitted after {max_refinements} refinements",
                self.id
            ))
            .into()),
        }
    }

    /// Interior breakpoints of `(start, end)` where the tangent turns by more
    /// than the kink angle.
    fn kinks(&self, start: f64, end: f64, ctx: &InterpolationContext) -> Result<Vec<f64>> {
        let step = 1e-9 * self.curve.domain().length();
        let mut kinks = Vec::new();
        for t in self.curve.breakpoints() {
            if t <= start + step || t >= end - step {
                continue;
            }
            let before = self.curve.tangent(t - step)?;
            let after = self.curve.tangent(t)?;
            if angle_between(&before, &after) > ctx.params.kink_angle {
                kinks.push(t);
            }
        }
        Ok(kinks)
    }

    /// Whether the curve is closed over the full trimmed domain with matching
    /// end tangents.
    fn has_smooth_seam(&self, start: f64, end: f64, ctx: &InterpolationContext) -> Result<bool> {
        let domain = self.curve.domain();
        let tol = ctx.parameter_tolerance * domain.length();
        if self.curve.degree() < 2
            || !ctx.is_closed(self.curve)?
            || (start - domain.t_min).abs() > tol
            || (end - domain.t_max).abs() > tol
        {
            return Ok(false);
        }
        let first = self.curve.tangent(domain.t_min)?;
        let last = self.curve.tangent(domain.t_max)?;
        Ok(angle_between(&first, &last) < ctx.params.kink_angle)
    }

    /// Largest distance between `fitted(t)` and the source at `map(t)`.
    fn deviation(&self, map: &ParameterMap, fitted: &BSplineCurve, tol: f64) -> Result<f64> {
        let samples = sample_parameters(fitted.knots(), fitted.degree(), tol);
        let mut checks = samples.clone();
        checks.extend(samples.windows(2).map(|w| 0.5 * (w[0] + w[1])));
        checks.into_iter().try_fold(0.0_f64, |worst, t| {
            let expected = self.curve.evaluate(map.old_parameter(t))?;
            Ok(worst.max((fitted.evaluate(t)? - expected).norm()))
        })
    }
}

/// Sample parameters: every breakpoint plus `degree + 2` interior points per span.
fn sample_parameters(knot_vector: &[f64], degree: usize, tol: f64) -> Vec<f64> {
    let breaks: Vec<f64> = knots::distinct(knot_vector, tol)
        .into_iter()
        .map(|(value, _)| value)
        .collect();
    let mut params = vec![breaks[0]];
    for w in breaks.windows(2) {
        params.extend(linspace(w[0], w[1], degree + 4).into_iter().skip(1));
    }
    params
}

/// Interior knots with every span between distinct breakpoints halved.
fn halved(interior: &[f64], start: f64, end: f64, tol: f64) -> Vec<f64> {
    let mut breaks = vec![start];
    breaks.extend(knots::distinct(interior, tol).into_iter().map(|(value, _)| value));
    breaks.push(end);
    let mut result = interior.to_vec();
    result.extend(breaks.windows(2).map(|w| 0.5 * (w[0] + w[1])));
    result.sort_by(f64::total_cmp);
    result
}

/// Every curve of a network refitted onto shared target parameters.
#[derive(Debug, Clone)]
pub struct ReparametrizedNetwork {
    /// Refitted profiles on `[0, 1]`, crossing guide `j` at `targets.u()[j]`.
    pub profiles: Vec<BSplineCurve>,
    /// Refitted guides on `[0, 1]`, crossing profile `i` at `targets.v()[i]`.
    pub guides: Vec<BSplineCurve>,
    /// The shared target parameters.
    pub targets: TargetParameters,
    /// Largest deviation of any refitted curve from its source.
    pub max_error: f64,
}

/// Reparametrizes every curve of a validated network.
///
/// All targets are computed from the full grid before any curve is refitted.
pub struct ReparametrizeNetwork<'a> {
    network: &'a CurveNetwork,
    grid: &'a IntersectionGrid,
}

impl<'a> ReparametrizeNetwork<'a> {
    /// Creates a new `ReparametrizeNetwork` operation.
    #[must_use]
    pub fn new(network: &'a CurveNetwork, grid: &'a IntersectionGrid) -> Self {
        Self { network, grid }
    }

    /// Executes the operation.
    ///
    /// # Errors
    ///
    /// Returns the first error of [`TargetParameters::from_grid`] or of any
    /// curve refit.
    pub fn execute(&self, ctx: &InterpolationContext) -> Result<ReparametrizedNetwork> {
        let targets = TargetParameters::from_grid(self.grid)?;
        let points = self.grid.points();

        let mut jobs: Vec<ReparametrizeCurve<'_>> = Vec::new();
        for (i, curve) in self.network.profiles().iter().enumerate() {
            jobs.push(ReparametrizeCurve::new(
                curve,
                CurveId::Profile(i),
                self.grid.profile_parameters(i),
                targets.u(),
                points[i].clone(),
            ));
        }
        for (j, curve) in self.network.guides().iter().enumerate() {
            jobs.push(ReparametrizeCurve::new(
                curve,
                CurveId::Guide(j),
                self.grid.guide_parameters(j),
                targets.v(),
                points.iter().map(|row| row[j]).collect(),
            ));
        }

        let mut refitted = refit_all(&jobs, ctx)?;
        let max_error = refitted.iter().map(|r| r.max_error).fold(0.0, f64::max);
        let guides = refitted
            .split_off(self.network.profiles().len())
            .into_iter()
            .map(|r| r.curve)
            .collect();
        let profiles = refitted.into_iter().map(|r| r.curve).collect();
        debug!(max_error, "network reparametrized");

        Ok(ReparametrizedNetwork {
            profiles,
            guides,
            targets,
            max_error,
        })
    }
}

#[cfg(feature = "parallel")]
fn refit_all(
    jobs: &[ReparametrizeCurve<'_>],
    ctx: &InterpolationContext,
) -> Result<Vec<ReparametrizedCurve>> {
    use rayon::prelude::*;

    jobs.par_iter().map(|job| job.execute(ctx)).collect()
}

#[cfg(not(feature = "parallel"))]
fn refit_all(
    jobs: &[ReparametrizeCurve<'_>],
    ctx: &InterpolationContext,
) -> Result<Vec<ReparametrizedCurve>> {
    jobs.iter().map(|job| job.execute(ctx)).collect()
}
