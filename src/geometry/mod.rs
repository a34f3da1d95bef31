pub mod basis;
pub mod curve;
pub mod knots;
pub mod surface;

pub use curve::{BSplineCurve, Curve, CurveDomain, Line, NetworkCurve, NurbsCurve};
pub use surface::{BSplineSurface, Surface, SurfaceDomain};
