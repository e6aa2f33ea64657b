#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic)]

//! Spherical geometry shared by the plate engine: unit vectors, lat/lon
//! conversion, rotation matrices and great-circle distances.

mod coord;
mod math;

pub use coord::{arc_distance, to_cartesian, to_spherical, Authority, GeoCoordinate, Spherical};
pub use math::{
    add, chord_distance, cross, dot, norm, normalize, scale, sub, Rotation, Vec3, EPS_NORM,
};

/// Golden ratio φ = (1 + √5) / 2.
pub const PHI: f64 = 1.618_033_988_749_895;

#[cfg(test)]
mod tests;
