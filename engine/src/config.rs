//! World configuration, physical constants and construction errors.
//!
//! Lengths on the sphere are in kilometres, crust columns in metres,
//! densities in kg/m³ and time in Myr.

use crate::crust::CrustRef;
use crate::grid::{CellId, GridError};
use crate::plate::PlateId;

/// Errors raised while building a world or seeding it by hand.
#[derive(thiserror::Error, Debug)]
pub enum WorldError {
    /// A configuration value is non-finite or out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// The cell lattice could not be built.
    #[error("grid: {0}")]
    Grid(#[from] GridError),
    /// No plate with this id exists.
    #[error("unknown plate {0}")]
    UnknownPlate(PlateId),
    /// Cell id past the end of the lattice.
    #[error("cell {cell} out of range (capacity {capacity})")]
    CellOutOfRange {
        /// Offending cell.
        cell: CellId,
        /// Number of cells in the lattice.
        capacity: usize,
    },
    /// The target cell already holds crust.
    #[error("cell already occupied: {0:?}")]
    CellOccupied(CrustRef),
    /// No crust at the referenced cell.
    #[error("no crust at {0:?}")]
    MissingCrust(CrustRef),
}

/// Densities, reference thicknesses and sea level shared by every crust.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicalConstants {
    /// Mantle density (kg/m³).
    pub mantle_density: f64,
    /// Sea water density (kg/m³).
    pub water_density: f64,
    /// Fresh oceanic crust density before the plate offset (kg/m³).
    pub ocean_crust_density: f64,
    /// Continental crust density before the plate offset; also the melt density for eruptions.
    pub continent_crust_density: f64,
    /// Sea level measured as isostatic displacement above the mantle (m).
    pub sea_level_m: f64,
    /// Initial continental shield thickness (m).
    pub continent_thickness_m: f64,
    /// Initial oceanic crust thickness (m).
    pub ocean_thickness_m: f64,
    /// Columns thicker than this count as continental (m).
    pub continental_threshold_m: f64,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            mantle_density: 3300.0,
            water_density: 1026.0,
            ocean_crust_density: 2890.0,
            continent_crust_density: 2700.0,
            sea_level_m: 3790.0,
            continent_thickness_m: 36_900.0,
            ocean_thickness_m: 7_100.0,
            continental_threshold_m: 17_000.0,
        }
    }
}

/// Parameters for [`crate::world::World::new`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldConfig {
    /// Planet radius (km).
    pub radius_km: f64,
    /// Cells per great circle; average cell spacing is `2π / resolution` radians.
    pub resolution: u32,
    /// Number of plates seeded at random centres.
    pub plate_count: u32,
    /// Number of fixed hotspots.
    pub hotspot_count: u32,
    /// Upper bound of a hotspot's eruption rate (eruptions per Myr).
    pub hotspot_heat: f64,
    /// Number of continental shields.
    pub continent_count: u32,
    /// Shield radius (km).
    pub continent_size_km: f64,
    /// Distance a crust may travel under its first overrider before detaching (km).
    pub max_mountain_width_km: f64,
    /// Seed for every random draw made while building the world.
    pub seed: u64,
    /// Densities and reference columns.
    pub physics: PhysicalConstants,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            radius_km: 6367.0,
            resolution: 72,
            plate_count: 7,
            hotspot_count: 0,
            hotspot_heat: 0.0,
            continent_count: 3,
            continent_size_km: 1250.0,
            max_mountain_width_km: 300.0,
            seed: 0,
            physics: PhysicalConstants::default(),
        }
    }
}

impl WorldConfig {
    /// Earth-sized defaults with the given seed.
    pub fn earth_like(seed: u64) -> Self {
        Self { seed, ..Self::default() }
    }

    /// Average angular spacing between neighbouring cells (radians).
    pub fn spacing_rad(&self) -> f64 {
        std::f64::consts::TAU / f64::from(self.resolution.max(1))
    }

    /// Reject non-finite or out-of-range values.
    pub fn validate(&self) -> Result<(), WorldError> {
        fn check(name: &str, v: f64, ok: bool) -> Result<(), WorldError> {
            if v.is_finite() && ok {
                Ok(())
            } else {
                Err(WorldError::InvalidConfig(format!("{name} = {v}")))
            }
        }
        check("radius_km", self.radius_km, self.radius_km > 0.0)?;
        if self.resolution == 0 {
            return Err(WorldError::InvalidConfig("resolution = 0".into()));
        }
        check("hotspot_heat", self.hotspot_heat, self.hotspot_heat >= 0.0)?;
        check("continent_size_km", self.continent_size_km, self.continent_size_km >= 0.0)?;
        check(
            "max_mountain_width_km",
            self.max_mountain_width_km,
            self.max_mountain_width_km >= 0.0,
        )?;
        let p = &self.physics;
        for (name, v) in [
            ("water_density", p.water_density),
            ("ocean_crust_density", p.ocean_crust_density),
            ("continent_crust_density", p.continent_crust_density),
            ("continent_thickness_m", p.continent_thickness_m),
            ("ocean_thickness_m", p.ocean_thickness_m),
            ("continental_threshold_m", p.continental_threshold_m),
        ] {
            check(name, v, v > 0.0)?;
        }
        check("sea_level_m", p.sea_level_m, true)?;
        check(
            "mantle_density",
            p.mantle_density,
            p.mantle_density > p.ocean_crust_density && p.mantle_density > p.continent_crust_density,
        )?;
        Ok(())
    }
}
