mod fit_curve;
mod interpolate_curve;
mod interpolate_grid;
mod skin;

pub use fit_curve::FitCurve;
pub use interpolate_curve::{transversal_degree, InterpolateCurve};
pub use interpolate_grid::InterpolateGrid;
pub use skin::SkinCurves;
