mod bounding_box;
mod intersect;

pub use bounding_box::{Aabb, BoundingBox};
pub use intersect::{CurveCurveIntersect, CurveIntersection};
