use crate::error::{InterpolationError, Result};
use crate::geometry::knots::KNOT_TOLERANCE;
use crate::geometry::BSplineSurface;
use crate::math::Point3;
use crate::operations::modification::MakeSurfacesCompatible;

/// Boolean sum of the two skins and the intersection surface.
///
/// `S = S_profiles + S_guides − S_intersections`, combined control point by
/// control point once all three share degrees and knot vectors.
pub struct CombineGordon<'a> {
    profiles: &'a BSplineSurface,
    guides: &'a BSplineSurface,
    intersections: &'a BSplineSurface,
}

impl<'a> CombineGordon<'a> {
    /// Creates a new `CombineGordon` operation.
    #[must_use]
    pub fn new(
        profiles: &'a BSplineSurface,
        guides: &'a BSplineSurface,
        intersections: &'a BSplineSurface,
    ) -> Self {
        Self {
            profiles,
            guides,
            intersections,
        }
    }

    /// Executes the combination.
    ///
    /// # Errors
    ///
    /// Returns [`InterpolationError::IncompatibleBasis`] if the surfaces have
    /// different domains or cannot be brought onto identical knot vectors.
    pub fn execute(&self) -> Result<BSplineSurface> {
        let aligned = MakeSurfacesCompatible::new(&[
            self.profiles.clone(),
            self.guides.clone(),
            self.intersections.clone(),
        ])
        .execute()?;
        let [profiles, guides, intersections] = aligned.as_slice() else {
            return Err(InterpolationError::IncompatibleBasis("expected three surfaces".into()).into());
        };
        check_same_basis(profiles, guides)?;
        check_same_basis(profiles, intersections)?;

        let control_points: Vec<Vec<Point3>> = profiles
            .control_points()
            .iter()
            .zip(guides.control_points())
            .zip(intersections.control_points())
            .map(|((p, g), s)| {
                p.iter()
                    .zip(g)
                    .zip(s)
                    .map(|((p, g), s)| Point3::from(p.coords + g.coords - s.coords))
                    .collect()
            })
            .collect();

        BSplineSurface::new(
            profiles.degree_u(),
            profiles.degree_v(),
            profiles.knots_u().to_vec(),
            profiles.knots_v().to_vec(),
            control_points,
        )
    }
}

fn check_same_basis(a: &BSplineSurface, b: &BSplineSurface) -> Result<()> {
    let same = |x: &[f64], y: &[f64]| {
        x.len() == y.len() && x.iter().zip(y).all(|(p, q)| (p - q).abs() <= KNOT_TOLERANCE)
    };
    if a.degree_u() != b.degree_u()
        || a.degree_v() != b.degree_v()
        || !same(a.knots_u(), b.knots_u())
        || !same(a.knots_v(), b.knots_v())
    {
        return Err(InterpolationError::IncompatibleBasis(format!(
            "degrees ({}, {}) and ({}, {}) with {} x {} and {} x {} knots",
            a.degree_u(),
            a.degree_v(),
            b.degree_u(),
            b.degree_v(),
            a.knots_u().len(),
            a.knots_v().len(),
            b.knots_u().len(),
            b.knots_v().len()
        ))
        .into());
    }
    Ok(())
}
