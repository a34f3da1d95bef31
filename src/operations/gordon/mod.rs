//! Boolean-sum (Gordon) interpolation of a curve network.

mod combine;
mod interpolate_network;

pub use combine::CombineGordon;
pub use interpolate_network::{interpolate_curve_network, GordonSurface, InterpolateCurveNetwork};
