//! Plate tectonics on a sphere.
//!
//! Rigid plates of crust sit on a shared Fibonacci-spiral lattice, each in
//! its own rotating frame. [`World::update`] drifts the plates, settles
//! isostasy, subducts and docks where they overlap, rifts new ocean floor
//! into the gaps and eliminates exhausted plates.
#![deny(missing_docs)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::dbg_macro, clippy::large_enum_variant)]

pub mod config;
pub mod continent;
pub mod crust;
pub mod grid;
pub mod hotspot;
pub mod plate;
pub mod world;

mod docking;
mod isostasy;
mod rifting;
mod subduction;
mod util;

pub use config::{PhysicalConstants, WorldConfig, WorldError};
pub use crust::{Crust, CrustKind, CrustRef, Load};
pub use grid::{CellId, CollisionMode, FibLattice, GridError, Lattice, SphereGrid};
pub use hotspot::Hotspot;
pub use plate::{CellSet, Plate, PlateId, PlateSpec};
pub use world::{CrustView, StepStats, World};

/// Returns the engine version string from Cargo metadata.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_semver_like() {
        assert!(version().split('.').count() >= 3);
    }
}
