use thiserror::Error;

use crate::operations::network::CurveId;

/// Top-level error type for the Gordon surface interpolation.
#[derive(Debug, Error)]
pub enum GordonError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Interpolation(#[from] InterpolationError),
}

/// Errors related to geometric computations.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("parameter {parameter} = {value} is out of range [{min}, {max}]")]
    ParameterOutOfRange {
        parameter: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("zero-length vector")]
    ZeroVector,

    #[error("invalid knot vector: {0}")]
    InvalidKnotVector(String),

    #[error("invalid control points: {0}")]
    InvalidControlPoints(String),
}

/// Errors raised while checking the profile/guide network.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("a curve network needs at least 2 profiles and 2 guides, got {profiles} profiles and {guides} guides")]
    InsufficientInput { profiles: usize, guides: usize },

    #[error("tolerance must be positive and finite, got {0}")]
    InvalidTolerance(f64),

    #[error("incompatible curve network: {0}")]
    IncompatibleNetwork(#[from] Incompatibility),
}

/// Why a curve network cannot be interpolated.
#[derive(Debug, Error)]
pub enum Incompatibility {
    #[error("profile {profile} and guide {guide} are {gap:e} apart (tolerance {tolerance:e})")]
    Gap {
        profile: usize,
        guide: usize,
        gap: f64,
        tolerance: f64,
    },

    #[error("intersection parameters along {curve} are not strictly increasing at position {position}")]
    Ordering { curve: CurveId, position: usize },

    #[error("no profile and guide start at a common corner")]
    NoStartCorner,
}

/// Errors from the interpolation and fitting stages.
#[derive(Debug, Error)]
pub enum InterpolationError {
    #[error("cannot reparametrize {curve}: {reason}")]
    SingularReparametrization { curve: CurveId, reason: String },

    #[error("singular linear system: {0}")]
    SingularSystem(String),

    #[error("incompatible surface bases: {0}")]
    IncompatibleBasis(String),
}

/// Convenience type alias for results using [`GordonError`].
pub type Result<T> = std::result::Result<T, GordonError>;
