use crate::error::{GeometryError, Result};
use crate::geometry::NetworkCurve;
use crate::math::Point3;

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point3,
    /// Maximum corner of the bounding box.
    pub max: Point3,
}

impl Aabb {
    /// Smallest box containing all `points`, or `None` if there are none.
    #[must_use]
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| {
            (min.inf(p), max.sup(p))
        });
        Some(Self { min, max })
    }

    /// Smallest box containing both boxes.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Length of the box diagonal.
    #[must_use]
    pub fn diagonal(&self) -> f64 {
        (self.max - self.min).norm()
    }
}

/// Computes the bounding box of a set of curves from their control points.
///
/// Control polygons enclose their curves, so the box is conservative.
pub struct BoundingBox<'a> {
    curves: &'a [NetworkCurve],
}

impl<'a> BoundingBox<'a> {
    /// Creates a new `BoundingBox` query.
    #[must_use]
    pub fn new(curves: &'a [NetworkCurve]) -> Self {
        Self { curves }
    }

    /// Executes the query, returning the AABB.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no curves.
    pub fn execute(&self) -> Result<Aabb> {
        let points: Vec<Point3> = self
            .curves
            .iter()
            .flat_map(NetworkCurve::control_points)
            .collect();
        Aabb::from_points(&points)
            .ok_or_else(|| GeometryError::Degenerate("no curves to bound".into()).into())
    }
}
