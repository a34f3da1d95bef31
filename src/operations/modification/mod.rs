mod compatible;

pub use compatible::{MakeCurvesCompatible, MakeSurfacesCompatible};
