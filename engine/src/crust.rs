//! A single crust column: thickness, density, isostatic displacement and
//! the subduction links it takes part in.
//!
//! Links are plain [`CrustRef`] handles into the owning plates' grids. They
//! are only ever written through the link functions in the subduction
//! stage, which keep `A.subducts == B` and `B.subducted_by == A` in step.
//! A crust that subducts another caches the partner's own thickness and
//! density as its [`Load`], so column quantities never need a world lookup.

use tecto_geo::{cross, norm, Vec3};

use crate::config::PhysicalConstants;
use crate::grid::CellId;
use crate::plate::PlateId;

/// Handle to the crust at `cell` on plate `plate`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CrustRef {
    /// Owning plate.
    pub plate: PlateId,
    /// Cell in that plate's grid.
    pub cell: CellId,
}

impl CrustRef {
    /// Handle for `cell` on `plate`.
    pub fn new(plate: PlateId, cell: CellId) -> Self {
        Self { plate, cell }
    }
}

/// Origin of freshly created crust.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrustKind {
    /// Thin, dense crust created at rifts.
    Oceanic,
    /// Thick, light shield crust.
    Continental,
}

/// Own thickness and density of a subducted partner, carried by the crust above it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Load {
    /// Partner thickness (m).
    pub thickness_m: f64,
    /// Partner density (kg/m³).
    pub density: f64,
}

/// One occupied grid cell.
#[derive(Clone, Debug, PartialEq)]
pub struct Crust {
    thickness_m: f64,
    density: f64,
    displacement_m: f64,
    subducts: Option<CrustRef>,
    subducted_by: Option<CrustRef>,
    first_subducted_by: Option<CrustRef>,
    first_overrider_at: Option<Vec3>,
    load: Option<Load>,
}

/// Isostatic displacement: `T − T·ρ/ρ_mantle`.
pub fn airy_displacement(thickness_m: f64, density: f64, mantle_density: f64) -> f64 {
    thickness_m - thickness_m * density / mantle_density
}

impl Crust {
    /// Baseline column of `kind`, shifted by the plate's density offset.
    pub fn new(kind: CrustKind, density_offset: f64, phys: &PhysicalConstants) -> Self {
        let (thickness_m, base) = match kind {
            CrustKind::Continental => (phys.continent_thickness_m, phys.continent_crust_density),
            CrustKind::Oceanic => (phys.ocean_thickness_m, phys.ocean_crust_density),
        };
        Self::with_column(thickness_m, base + density_offset, phys)
    }

    /// Column with explicit thickness and density.
    pub fn with_column(thickness_m: f64, density: f64, phys: &PhysicalConstants) -> Self {
        Self {
            thickness_m,
            density,
            displacement_m: airy_displacement(thickness_m, density, phys.mantle_density),
            subducts: None,
            subducted_by: None,
            first_subducted_by: None,
            first_overrider_at: None,
            load: None,
        }
    }

    /// Copy for a docking transfer: same column, no links, no subduction history.
    pub fn transferred(&self) -> Self {
        Self {
            thickness_m: self.thickness_m,
            density: self.density,
            displacement_m: self.displacement_m,
            subducts: None,
            subducted_by: None,
            first_subducted_by: None,
            first_overrider_at: None,
            load: None,
        }
    }

    /// Own thickness, excluding any subducted partner (m).
    pub fn own_thickness_m(&self) -> f64 {
        self.thickness_m
    }

    /// Own density (kg/m³).
    pub fn own_density(&self) -> f64 {
        self.density
    }

    /// Column thickness including a subducted partner (m).
    pub fn thickness_m(&self) -> f64 {
        self.thickness_m + self.load.map_or(0.0, |l| l.thickness_m)
    }

    /// Column weight per unit area, `Σ thickness·density`.
    pub fn pressure(&self) -> f64 {
        self.thickness_m * self.density + self.load.map_or(0.0, |l| l.thickness_m * l.density)
    }

    /// Mean column density, `pressure / thickness`.
    pub fn density(&self) -> f64 {
        let t = self.thickness_m();
        if t > 0.0 {
            self.pressure() / t
        } else {
            self.density
        }
    }

    /// Displacement above the mantle from the last [`Crust::isostacy`] (m).
    pub fn displacement_m(&self) -> f64 {
        self.displacement_m
    }

    /// Height above sea level (m).
    pub fn elevation_m(&self, phys: &PhysicalConstants) -> f64 {
        self.displacement_m - phys.sea_level_m
    }

    /// Recompute the Airy displacement from the current column.
    pub fn isostacy(&mut self, phys: &PhysicalConstants) {
        self.displacement_m = airy_displacement(self.thickness_m(), self.density(), phys.mantle_density);
    }

    /// Whether the column is thick enough to count as continent.
    pub fn is_continent(&self, phys: &PhysicalConstants) -> bool {
        self.thickness_m() > phys.continental_threshold_m
    }

    /// Rotational inertia about `pole` at world position `position`:
    /// `pressure · r²` with `r` the distance to the axis.
    pub fn inertial_moment(&self, position: Vec3, pole: Vec3) -> f64 {
        let pole_len = norm(pole);
        if pole_len <= 0.0 {
            return 0.0;
        }
        let r = norm(cross(position, pole)) / pole_len;
        self.pressure() * r * r
    }

    /// Volcanic thickening where a subducting slab detaches below this crust.
    ///
    /// Melt is taken to have continental density. Returns the thickness
    /// added (m); nothing changes when the column is no denser than melt.
    pub fn erupt(&mut self, phys: &PhysicalConstants) -> f64 {
        let melt = phys.continent_crust_density;
        let rho = self.density();
        if !rho.is_finite() || rho <= melt {
            return 0.0;
        }
        let elevation = self.elevation_m(phys);
        let buoyancy = (rho - melt) / melt;
        let height = if elevation < 0.0 {
            let depth = elevation.abs();
            let column = self.thickness_m() - (melt - phys.water_density) / (rho - melt) * depth;
            column * buoyancy + depth
        } else {
            self.thickness_m() * buoyancy
        };
        if !height.is_finite() || height <= 0.0 {
            return 0.0;
        }
        self.density = (self.thickness_m * self.density + height * melt) / (self.thickness_m + height);
        self.thickness_m += height;
        height
    }

    /// Crust this one overrides.
    pub fn subducts(&self) -> Option<CrustRef> {
        self.subducts
    }

    /// Crust overriding this one.
    pub fn subducted_by(&self) -> Option<CrustRef> {
        self.subducted_by
    }

    /// First crust that ever overrode this one; never cleared.
    pub fn first_subducted_by(&self) -> Option<CrustRef> {
        self.first_subducted_by
    }

    /// World position of the first overrider when the first link formed.
    pub fn first_overrider_at(&self) -> Option<Vec3> {
        self.first_overrider_at
    }

    /// Cached column of the crust this one overrides.
    pub fn load(&self) -> Option<Load> {
        self.load
    }

    /// Add thickness of a consumed oceanic slab.
    pub(crate) fn absorb(&mut self, thickness_m: f64) {
        self.thickness_m += thickness_m;
    }

    pub(crate) fn set_subducts(&mut self, bottom: Option<CrustRef>, load: Option<Load>) {
        self.subducts = bottom;
        self.load = load;
    }

    /// `top_at` is only kept when this is the first overrider.
    pub(crate) fn set_subducted_by(&mut self, top: Option<CrustRef>, top_at: Option<Vec3>) {
        self.subducted_by = top;
        if top.is_some() && self.first_subducted_by.is_none() {
            self.first_subducted_by = top;
            self.first_overrider_at = top_at;
        }
    }

    pub(crate) fn set_load(&mut self, load: Option<Load>) {
        self.load = load;
    }

    pub(crate) fn own_load(&self) -> Load {
        Load { thickness_m: self.thickness_m, density: self.density }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phys() -> PhysicalConstants {
        PhysicalConstants::default()
    }

    #[test]
    fn baseline_columns() {
        let p = phys();
        let ocean = Crust::new(CrustKind::Oceanic, 10.0, &p);
        assert_eq!(ocean.own_thickness_m(), 7_100.0);
        assert_eq!(ocean.own_density(), 2_900.0);
        assert!(!ocean.is_continent(&p));
        let land = Crust::new(CrustKind::Continental, -5.0, &p);
        assert!(land.is_continent(&p));
        assert!(land.elevation_m(&p) > ocean.elevation_m(&p));
        let expected = 36_900.0 - 36_900.0 * 2_695.0 / 3_300.0 - 3_790.0;
        assert!((land.elevation_m(&p) - expected).abs() < 1e-9);
    }

    #[test]
    fn isostacy_is_idempotent() {
        let p = phys();
        let mut c = Crust::new(CrustKind::Oceanic, 0.0, &p);
        c.set_load(Some(Load { thickness_m: 5_000.0, density: 2_950.0 }));
        c.isostacy(&p);
        let first = c.displacement_m();
        c.isostacy(&p);
        assert_eq!(c.displacement_m(), first);
        assert!(first > airy_displacement(7_100.0, 2_890.0, 3_300.0));
    }

    #[test]
    fn load_adds_to_column() {
        let p = phys();
        let mut c = Crust::with_column(10_000.0, 2_800.0, &p);
        c.set_load(Some(Load { thickness_m: 10_000.0, density: 3_000.0 }));
        assert_eq!(c.thickness_m(), 20_000.0);
        assert!((c.density() - 2_900.0).abs() < 1e-9);
        assert!(c.is_continent(&p));
        assert_eq!(c.own_thickness_m(), 10_000.0);
    }

    #[test]
    fn inertial_moment_scales_with_axis_distance() {
        let p = phys();
        let c = Crust::with_column(1_000.0, 3_000.0, &p);
        let pole = [0.0, 2.0, 0.0];
        assert!(c.inertial_moment([0.0, 1.0, 0.0], pole).abs() < 1e-9);
        assert!((c.inertial_moment([1.0, 0.0, 0.0], pole) - 3_000_000.0).abs() < 1e-6);
    }

    #[test]
    fn erupt_thickens_and_lightens_oceanic_crust() {
        let p = phys();
        let mut c = Crust::new(CrustKind::Oceanic, 0.0, &p);
        let before = c.own_thickness_m();
        let added = c.erupt(&p);
        assert!(added > 0.0);
        assert!((c.own_thickness_m() - before - added).abs() < 1e-9);
        assert!(c.own_density() < 2_890.0 && c.own_density() > 2_700.0);
    }

    #[test]
    fn erupt_skips_light_columns() {
        let p = phys();
        let mut c = Crust::new(CrustKind::Continental, -20.0, &p);
        assert_eq!(c.erupt(&p), 0.0);
        assert_eq!(c.own_thickness_m(), 36_900.0);
    }

    #[test]
    fn transfer_drops_links() {
        let p = phys();
        let mut c = Crust::new(CrustKind::Continental, 0.0, &p);
        c.set_subducted_by(Some(CrustRef::new(1, 2)), None);
        c.set_subducts(Some(CrustRef::new(3, 4)), Some(Load { thickness_m: 1.0, density: 1.0 }));
        assert_eq!(c.first_subducted_by(), Some(CrustRef::new(1, 2)));
        let t = c.transferred();
        assert_eq!(t.subducts(), None);
        assert_eq!(t.subducted_by(), None);
        assert_eq!(t.first_subducted_by(), None);
        assert_eq!(t.own_thickness_m(), c.own_thickness_m());
    }
}
