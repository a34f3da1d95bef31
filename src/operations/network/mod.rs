//! The profile/guide curve network and the stages that make it consistent.

mod grid;
mod parameter_map;
mod reparametrize;
mod sort;
mod validate;

pub use grid::{FindIntersections, IntersectionGrid};
pub use parameter_map::ParameterMap;
pub use reparametrize::{
    ReparametrizeCurve, ReparametrizeNetwork, ReparametrizedCurve, ReparametrizedNetwork,
    TargetParameters,
};
pub use sort::{CurveOrder, NetworkOrdering, SortCurveNetwork};
pub use validate::ValidateNetwork;

use std::fmt;

use crate::error::{NetworkError, Result};
use crate::geometry::NetworkCurve;

/// Identifies one curve of a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveId {
    Profile(usize),
    Guide(usize),
}

impl fmt::Display for CurveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Profile(i) => write!(f, "profile {i}"),
            Self::Guide(j) => write!(f, "guide {j}"),
        }
    }
}

/// Two transversal curve families: profiles run along `u`, guides along `v`.
#[derive(Debug, Clone)]
pub struct CurveNetwork {
    profiles: Vec<NetworkCurve>,
    guides: Vec<NetworkCurve>,
}

impl CurveNetwork {
    /// Creates a network, checking the minimum cardinality.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InsufficientInput`] unless there are at least
    /// two profiles and two guides.
    pub fn new(profiles: Vec<NetworkCurve>, guides: Vec<NetworkCurve>) -> Result<Self> {
        if profiles.len() < 2 || guides.len() < 2 {
            return Err(NetworkError::InsufficientInput {
                profiles: profiles.len(),
                guides: guides.len(),
            }
            .into());
        }
        Ok(Self { profiles, guides })
    }

    /// Returns the profile curves.
    #[must_use]
    pub fn profiles(&self) -> &[NetworkCurve] {
        &self.profiles
    }

    /// Returns the guide curves.
    #[must_use]
    pub fn guides(&self) -> &[NetworkCurve] {
        &self.guides
    }

    pub(crate) fn into_parts(self) -> (Vec<NetworkCurve>, Vec<NetworkCurve>) {
        (self.profiles, self.guides)
    }
}
