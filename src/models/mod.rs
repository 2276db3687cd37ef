//! Domain types shared across the catalog and the resolution engine.

pub mod orbit;
pub mod satellite;

pub use orbit::{CutWindow, OrbitKey, OrbitResolution, OrbitSpan};
pub use satellite::Satellite;
