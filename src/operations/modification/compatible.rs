use crate::error::{InterpolationError, Result};
use crate::geometry::knots::{self, KNOT_TOLERANCE};
use crate::geometry::{BSplineCurve, BSplineSurface, Curve, Surface};

/// Brings B-spline curves onto a common degree and knot vector.
///
/// Every curve is elevated to the highest degree in the family, then each
/// receives the union of all interior knots. Shapes are unchanged.
pub struct MakeCurvesCompatible<'a> {
    curves: &'a [BSplineCurve],
}

impl<'a> MakeCurvesCompatible<'a> {
    /// Creates a new `MakeCurvesCompatible` operation.
    #[must_use]
    pub fn new(curves: &'a [BSplineCurve]) -> Self {
        Self { curves }
    }

    /// Executes the operation.
    ///
    /// # Errors
    ///
    /// Returns [`InterpolationError::IncompatibleBasis`] if the curves have
    /// different parameter domains, or a geometry error if elevation fails.
    pub fn execute(&self) -> Result<Vec<BSplineCurve>> {
        let Some(first) = self.curves.first() else {
            return Ok(Vec::new());
        };
        let domain = first.domain();
        let tol = KNOT_TOLERANCE * domain.length().max(1.0);
        for (k, curve) in self.curves.iter().enumerate() {
            let other = curve.domain();
            if (other.t_min - domain.t_min).abs() > tol || (other.t_max - domain.t_max).abs() > tol {
                return Err(InterpolationError::IncompatibleBasis(format!(
                    "curve {k} has domain [{}, {}], expected [{}, {}]",
                    other.t_min, other.t_max, domain.t_min, domain.t_max
                ))
                .into());
            }
        }

        let degree = self.curves.iter().map(BSplineCurve::degree).max().unwrap_or(1);
        let mut curves = self
            .curves
            .iter()
            .map(|c| {
                if c.degree() < degree {
                    c.elevate_degree(degree)
                } else {
                    Ok(c.clone())
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let sets: Vec<Vec<(f64, usize)>> = curves
            .iter()
            .map(|c| knots::interior(degree, c.knots()))
            .collect();
        let merged = knots::union(&sets, tol);
        for curve in &mut curves {
            for &(value, mult) in &merged {
                let current = knots::multiplicity(curve.knots(), value, tol);
                if mult > current {
                    curve.insert_knot(value, mult - current)?;
                }
            }
        }

        let curves = unify_knots(curves, |c| c.knots().len(), "curve")?;
        let common = curves[0].knots().to_vec();
        curves
            .into_iter()
            .map(|c| BSplineCurve::new(degree, common.clone(), c.control_points().to_vec()))
            .collect()
    }
}

/// Brings B-spline surfaces onto common degrees and knot vectors in both
/// directions.
pub struct MakeSurfacesCompatible<'a> {
    surfaces: &'a [BSplineSurface],
}

impl<'a> MakeSurfacesCompatible<'a> {
    /// Creates a new `MakeSurfacesCompatible` operation.
    #[must_use]
    pub fn new(surfaces: &'a [BSplineSurface]) -> Self {
        Self { surfaces }
    }

    /// Executes the operation.
    ///
    /// # Errors
    ///
    /// Returns [`InterpolationError::IncompatibleBasis`] if the surfaces have
    /// different parameter domains.
    pub fn execute(&self) -> Result<Vec<BSplineSurface>> {
        let along_u = align_u(self.surfaces.to_vec())?;
        let flipped: Vec<BSplineSurface> = along_u.iter().map(BSplineSurface::transposed).collect();
        Ok(align_u(flipped)?.iter().map(BSplineSurface::transposed).collect())
    }
}

/// Aligns degree and knots in `u` only.
fn align_u(surfaces: Vec<BSplineSurface>) -> Result<Vec<BSplineSurface>> {
    let Some(first) = surfaces.first() else {
        return Ok(surfaces);
    };
    let expected = first.domain().u;
    let tol = KNOT_TOLERANCE * expected.length().max(1.0);
    for (k, surface) in surfaces.iter().enumerate() {
        let found = surface.domain().u;
        if (found.t_min - expected.t_min).abs() > tol || (found.t_max - expected.t_max).abs() > tol {
            return Err(InterpolationError::IncompatibleBasis(format!(
                "surface {k} has u domain [{}, {}], expected [{}, {}]",
                found.t_min, found.t_max, expected.t_min, expected.t_max
            ))
            .into());
        }
    }

    let degree = surfaces.iter().map(BSplineSurface::degree_u).max().unwrap_or(1);
    let mut surfaces = surfaces
        .into_iter()
        .map(|s| {
            if s.degree_u() < degree {
                s.elevate_degree_u(degree)
            } else {
                Ok(s)
            }
        })
        .collect::<Result<Vec<_>>>()?;

    let sets: Vec<Vec<(f64, usize)>> = surfaces
        .iter()
        .map(|s| knots::interior(degree, s.knots_u()))
        .collect();
    let merged = knots::union(&sets, tol);
    for surface in &mut surfaces {
        for &(value, mult) in &merged {
            let current = knots::multiplicity(surface.knots_u(), value, tol);
            if mult > current {
                surface.insert_knot_u(value, mult - current)?;
            }
        }
    }

    let surfaces = unify_knots(surfaces, |s| s.knots_u().len(), "surface")?;
    let common = surfaces[0].knots_u().to_vec();
    surfaces
        .into_iter()
        .map(|s| {
            BSplineSurface::new(
                degree,
                s.degree_v(),
                common.clone(),
                s.knots_v().to_vec(),
                s.control_points().to_vec(),
            )
        })
        .collect()
}

/// Checks that every entry ended up with the same number of knots.
fn unify_knots<T>(items: Vec<T>, len: impl Fn(&T) -> usize, what: &str) -> Result<Vec<T>> {
    let expected = items.first().map_or(0, &len);
    if let Some(k) = items.iter().position(|item| len(item) != expected) {
        return Err(InterpolationError::IncompatibleBasis(format!(
            "{what} {k} has {} knots after refinement, expected {expected}",
            len(&items[k])
        ))
        .into());
    }
    Ok(items)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::{linspace, Point3};

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn curves_share_degree_and_knots() {
        let line = BSplineCurve::new(1, vec![0.0, 0.0, 1.0, 1.0], vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0)])
            .unwrap();
        let cubic = BSplineCurve::new(
            3,
            knots::clamped(3, &[0.3, 0.6], 0.0, 1.0),
            vec![
                p(0.0, 1.0, 0.0),
                p(0.2, 1.5, 0.0),
                p(0.4, 0.8, 0.3),
                p(0.6, 1.2, 0.0),
                p(0.8, 1.0, 0.1),
                p(1.0, 1.0, 0.0),
            ],
        )
        .unwrap();
        let originals = [line, cubic];
        let compatible = MakeCurvesCompatible::new(&originals).execute().unwrap();
        assert_eq!(compatible[0].degree(), 3);
        assert_eq!(compatible[0].knots(), compatible[1].knots());
        assert_eq!(compatible[0].control_points().len(), compatible[1].control_points().len());
        for (a, b) in originals.iter().zip(&compatible) {
            for t in linspace(0.0, 1.0, 13) {
                assert!((a.evaluate(t).unwrap() - b.evaluate(t).unwrap()).norm() < 1e-10);
            }
        }
    }

    #[test]
    fn curves_on_different_domains_are_rejected() {
        let a = BSplineCurve::new(1, vec![0.0, 0.0, 1.0, 1.0], vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0)])
            .unwrap();
        let b = BSplineCurve::new(1, vec![0.0, 0.0, 2.0, 2.0], vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0)])
            .unwrap();
        assert!(MakeCurvesCompatible::new(&[a, b]).execute().is_err());
    }

    #[test]
    fn surfaces_share_bases() {
        let bilinear = BSplineSurface::new(
            1,
            1,
            vec![0.0, 0.0, 1.0, 1.0],
            vec![0.0, 0.0, 1.0, 1.0],
            vec![
                vec![p(0.0, 0.0, 0.0), p(0.0, 1.0, 0.0)],
                vec![p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0)],
            ],
        )
        .unwrap();
        let curved = BSplineSurface::new(
            2,
            1,
            knots::clamped(2, &[0.5], 0.0, 1.0),
            vec![0.0, 0.0, 1.0, 1.0],
            vec![
                vec![p(0.0, 0.0, 0.0), p(0.0, 1.0, 0.0)],
                vec![p(0.3, 0.0, 0.5), p(0.3, 1.0, 0.5)],
                vec![p(0.7, 0.0, 0.5), p(0.7, 1.0, 0.5)],
                vec![p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0)],
            ],
        )
        .unwrap()
        .elevate_degree_v(2)
        .unwrap();
        let originals = [bilinear, curved];
        let compatible = MakeSurfacesCompatible::new(&originals).execute().unwrap();
        assert_eq!(compatible[0].degree_u(), 2);
        assert_eq!(compatible[0].degree_v(), 2);
        assert_eq!(compatible[0].knots_u(), compatible[1].knots_u());
        assert_eq!(compatible[0].knots_v(), compatible[1].knots_v());
        for (a, b) in originals.iter().zip(&compatible) {
            for u in linspace(0.0, 1.0, 5) {
                for v in linspace(0.0, 1.0, 5) {
                    let d = a.evaluate(u, v).unwrap() - b.evaluate(u, v).unwrap();
                    assert!(d.norm() < 1e-10);
                }
            }
        }
    }
}
