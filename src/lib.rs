pub mod context;
pub mod error;
pub mod geometry;
pub mod math;
pub mod operations;

pub use context::InterpolationParams;
pub use error::{GordonError, Result};
pub use operations::gordon::{interpolate_curve_network, GordonSurface, InterpolateCurveNetwork};
