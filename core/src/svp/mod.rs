//! Layered sound-velocity model and the ray tracer built on it.

pub mod profile;
pub mod raytrace;

pub use profile::VelocityProfile;
pub use raytrace::{RayResult, RayStatus, RayTracer};
