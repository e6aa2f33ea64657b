//! Rigid plates: a grid of crust turning about an Euler pole, plus the
//! derived cell sets the collide and rift stages walk each tick.
//!
//! The collidable and riftable sets are rebuilt wholesale only after an
//! [`Plate::invalidate`]; otherwise every grid mutation goes through
//! [`Plate::add`], [`Plate::update`] or [`Plate::remove`], which re-evaluate
//! the touched cell and its lattice neighbours in place.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use tecto_geo::{cross, norm, normalize, scale, GeoCoordinate, Rotation, Vec3, EPS_NORM};

use crate::crust::{Crust, CrustRef};
use crate::grid::{CellId, Lattice, SphereGrid};

/// Stable plate id, never reused within a world.
pub type PlateId = u32;

/// Cell set with an explicit freshness flag.
#[derive(Clone, Debug, Default)]
pub struct CellSet {
    cells: BTreeSet<CellId>,
    fresh: bool,
}

impl CellSet {
    /// Members, or `None` while the set awaits a rebuild.
    pub fn cells(&self) -> Option<&BTreeSet<CellId>> {
        self.fresh.then_some(&self.cells)
    }

    /// Whether the set reflects the grid.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    fn invalidate(&mut self) {
        self.cells.clear();
        self.fresh = false;
    }

    fn set(&mut self, cell: CellId, member: bool) {
        if member {
            self.cells.insert(cell);
        } else {
            self.cells.remove(&cell);
        }
    }
}

/// Initial state of a plate built by hand.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlateSpec {
    /// Plate centre (world space, need not be unit length).
    pub center: Vec3,
    /// Rotation axis.
    pub euler_pole: Vec3,
    /// Surface speed at the centre (km/Myr); negative turns the other way.
    pub speed_km_myr: f64,
    /// Added to the density of every crust the plate creates (kg/m³).
    pub density_offset: f64,
}

/// A rigid plate.
#[derive(Clone, Debug)]
pub struct Plate {
    id: PlateId,
    center: GeoCoordinate,
    euler_pole: Vec3,
    speed_km_myr: f64,
    density_offset: f64,
    grid: SphereGrid<Crust>,
    collidable: CellSet,
    riftable: CellSet,
    collisions: Vec<Option<PlateId>>,
    docking: BTreeSet<CrustRef>,
}

impl Plate {
    /// Empty plate over `lattice`.
    pub fn new(id: PlateId, spec: PlateSpec, lattice: Arc<dyn Lattice>) -> Self {
        let grid = SphereGrid::new(lattice);
        let collisions = vec![None; grid.capacity()];
        Self {
            id,
            center: GeoCoordinate::from_cartesian(normalize(spec.center)),
            euler_pole: normalize(spec.euler_pole),
            speed_km_myr: spec.speed_km_myr,
            density_offset: spec.density_offset,
            grid,
            collidable: CellSet::default(),
            riftable: CellSet::default(),
            collisions,
            docking: BTreeSet::new(),
        }
    }

    /// Plate id.
    pub fn id(&self) -> PlateId {
        self.id
    }

    /// Plate centre; moves with the plate.
    pub fn center(&self) -> &GeoCoordinate {
        &self.center
    }

    /// Unit rotation axis.
    pub fn euler_pole(&self) -> Vec3 {
        self.euler_pole
    }

    /// Surface speed at the centre (km/Myr).
    pub fn speed_km_myr(&self) -> f64 {
        self.speed_km_myr
    }

    /// Density offset applied to crust created on this plate.
    pub fn density_offset(&self) -> f64 {
        self.density_offset
    }

    /// The plate's crust grid.
    pub fn grid(&self) -> &SphereGrid<Crust> {
        &self.grid
    }

    /// Crust at `cell`.
    pub fn crust(&self, cell: CellId) -> Option<&Crust> {
        self.grid.get(cell)
    }

    /// Handle for `cell` on this plate.
    pub fn crust_ref(&self, cell: CellId) -> CrustRef {
        CrustRef::new(self.id, cell)
    }

    /// World position of `cell`.
    pub fn position(&self, cell: CellId) -> Vec3 {
        self.grid.position(cell)
    }

    /// Angular velocity vector `pole · speed`.
    pub fn velocity(&self) -> Vec3 {
        scale(self.euler_pole, self.speed_km_myr)
    }

    /// Set pole and speed from a velocity vector; a zero vector stops the plate.
    pub fn set_velocity(&mut self, velocity: Vec3) {
        let speed = norm(velocity);
        if speed > EPS_NORM {
            self.euler_pole = scale(velocity, 1.0 / speed);
            self.speed_km_myr = speed;
        } else {
            self.speed_km_myr = 0.0;
        }
    }

    /// Distance from the centre to the rotation axis on the unit sphere.
    pub fn small_circle_radius(&self) -> f64 {
        norm(cross(self.center.cartesian(), self.euler_pole))
    }

    /// Rotation angle (radians) covered in `dt_myr` on a planet of `radius_km`.
    /// Zero when the centre sits on the pole.
    pub fn angular_speed(&self, dt_myr: f64, radius_km: f64) -> f64 {
        let r = self.small_circle_radius() * radius_km;
        if r <= EPS_NORM {
            return 0.0;
        }
        self.speed_km_myr * dt_myr / r
    }

    /// Rotate the centre and grid frame about the pole; returns the angle.
    pub fn move_by(&mut self, dt_myr: f64, radius_km: f64) -> f64 {
        let angle = self.angular_speed(dt_myr, radius_km);
        let r = Rotation::about_axis(self.euler_pole, angle);
        self.center.transform(&r);
        self.center.refresh();
        self.grid.rotate(&r);
        angle
    }

    /// Great-circle distance between plate centres (radians).
    pub fn center_distance(&self, other: &Plate) -> f64 {
        self.center.arc_distance(&other.center)
    }

    /// Summed inertial moment of `cells` about this plate's pole.
    pub fn mass(&self, cells: impl IntoIterator<Item = CellId>) -> f64 {
        cells
            .into_iter()
            .filter_map(|c| self.grid.get(c).map(|crust| crust.inertial_moment(self.position(c), self.euler_pole)))
            .sum()
    }

    /// Angular momentum of `cells`: `velocity · mass`.
    pub fn momentum(&self, cells: impl IntoIterator<Item = CellId>) -> Vec3 {
        scale(self.velocity(), self.mass(cells))
    }

    fn is_collidable_cell(&self, cell: CellId) -> bool {
        self.grid.is_occupied(cell)
            && self
                .grid
                .neighbor_ids(cell)
                .into_iter()
                .any(|n| self.grid.get(n).map_or(true, |c| c.subducted_by().is_some()))
    }

    fn is_riftable_cell(&self, cell: CellId) -> bool {
        !self.grid.is_occupied(cell)
            && self.grid.neighbors(cell).any(|(_, c)| c.subducted_by().is_none())
    }

    /// Rebuild whichever derived sets are stale.
    pub fn refresh(&mut self) {
        if !self.collidable.fresh {
            let cells = self.grid.cells().filter(|&c| self.is_collidable_cell(c)).collect();
            self.collidable = CellSet { cells, fresh: true };
        }
        if !self.riftable.fresh {
            let cells = (0..self.grid.capacity() as CellId).filter(|&c| self.is_riftable_cell(c)).collect();
            self.riftable = CellSet { cells, fresh: true };
        }
    }

    /// Mark both derived sets stale.
    pub fn invalidate(&mut self) {
        self.collidable.invalidate();
        self.riftable.invalidate();
    }

    /// Boundary cells: occupied, with an empty or subducted neighbour.
    pub fn collidable(&self) -> &CellSet {
        &self.collidable
    }

    /// Empty cells next to non-subducted crust.
    pub fn riftable(&self) -> &CellSet {
        &self.riftable
    }

    pub(crate) fn collidable_snapshot(&mut self) -> Vec<CellId> {
        self.refresh();
        self.collidable.cells.iter().copied().collect()
    }

    pub(crate) fn riftable_snapshot(&mut self) -> Vec<CellId> {
        self.refresh();
        self.riftable.cells.iter().copied().collect()
    }

    fn touch(&mut self, cell: CellId) {
        if !self.collidable.fresh && !self.riftable.fresh {
            return;
        }
        // Membership of a cell depends on its own neighbour list, so the
        // cells to re-check are the ones whose lists name `cell`.
        let around: Vec<CellId> = std::iter::once(cell).chain(self.grid.reverse_neighbor_ids(cell)).collect();
        for x in around {
            if self.collidable.fresh {
                let m = self.is_collidable_cell(x);
                self.collidable.set(x, m);
            }
            if self.riftable.fresh {
                let m = self.is_riftable_cell(x);
                self.riftable.set(x, m);
            }
        }
    }

    /// Place `crust` at `cell`, returning any previous occupant.
    pub fn add(&mut self, cell: CellId, crust: Crust) -> Option<Crust> {
        let prev = self.grid.insert(cell, crust);
        self.touch(cell);
        prev
    }

    /// Re-evaluate `cell` after its subduction state changed.
    pub fn update(&mut self, cell: CellId) {
        self.touch(cell);
    }

    /// Take the crust out of `cell`. Links are left as they are.
    pub fn remove(&mut self, cell: CellId) -> Option<Crust> {
        let prev = self.grid.remove(cell);
        if prev.is_some() {
            self.touch(cell);
        }
        prev
    }

    pub(crate) fn crust_mut(&mut self, cell: CellId) -> Option<&mut Crust> {
        self.grid.get_mut(cell)
    }

    pub(crate) fn crusts_mut(&mut self) -> impl Iterator<Item = (CellId, &mut Crust)> + '_ {
        self.grid.iter_mut()
    }

    /// Last plate seen colliding near `cell`.
    pub fn collision_memo(&self, cell: CellId) -> Option<PlateId> {
        self.collisions.get(cell as usize).copied().flatten()
    }

    /// Remember `other` for `cell` and its neighbours.
    pub(crate) fn track_collisions(&mut self, cell: CellId, other: PlateId) {
        for c in std::iter::once(cell).chain(self.grid.neighbor_ids(cell)) {
            if let Some(slot) = self.collisions.get_mut(c as usize) {
                *slot = Some(other);
            }
        }
    }

    pub(crate) fn clear_collision(&mut self, cell: CellId) {
        if let Some(slot) = self.collisions.get_mut(cell as usize) {
            *slot = None;
        }
    }

    pub(crate) fn reset_collisions(&mut self) {
        self.collisions.iter_mut().for_each(|s| *s = None);
    }

    /// Whether `crust` is queued to dock onto this plate.
    pub fn is_dock_requested(&self, crust: CrustRef) -> bool {
        self.docking.contains(&crust)
    }

    /// Foreign crust queued to dock onto this plate.
    pub fn pending_docks(&self) -> &BTreeSet<CrustRef> {
        &self.docking
    }

    pub(crate) fn queue_dock(&mut self, crust: CrustRef) {
        self.docking.insert(crust);
    }

    pub(crate) fn take_docking(&mut self) -> BTreeSet<CrustRef> {
        std::mem::take(&mut self.docking)
    }

    /// Drop every reference to plate `gone` from the memo and dock queue.
    pub(crate) fn forget_plate(&mut self, gone: PlateId) {
        self.docking.retain(|r| r.plate != gone);
        for slot in &mut self.collisions {
            if *slot == Some(gone) {
                *slot = None;
            }
        }
    }

    /// Occupied cells reachable from `start` by stepping to occupied
    /// neighbours `b` of `a` with `connects(a, b)`. Includes `start`.
    pub fn group(&self, start: CellId, connects: impl Fn(&Crust, &Crust) -> bool) -> BTreeSet<CellId> {
        let mut seen = BTreeSet::new();
        if !self.grid.is_occupied(start) {
            return seen;
        }
        seen.insert(start);
        let mut queue = VecDeque::from([start]);
        while let Some(a) = queue.pop_front() {
            let Some(ca) = self.grid.get(a) else { continue };
            for (b, cb) in self.grid.neighbors(a) {
                if !seen.contains(&b) && connects(ca, cb) {
                    seen.insert(b);
                    queue.push_back(b);
                }
            }
        }
        seen
    }

    /// Partition `cells` into connected components under `connects`,
    /// walking only through members of `cells`. Components come out in
    /// order of their smallest cell.
    pub fn groups(
        &self,
        cells: &BTreeSet<CellId>,
        connects: impl Fn(&Crust, &Crust) -> bool,
    ) -> Vec<BTreeSet<CellId>> {
        let mut unassigned: BTreeSet<CellId> =
            cells.iter().copied().filter(|&c| self.grid.is_occupied(c)).collect();
        let mut out = Vec::new();
        while let Some(start) = unassigned.pop_first() {
            let mut group = BTreeSet::from([start]);
            let mut queue = VecDeque::from([start]);
            while let Some(a) = queue.pop_front() {
                let Some(ca) = self.grid.get(a) else { continue };
                for (b, cb) in self.grid.neighbors(a) {
                    if unassigned.contains(&b) && connects(ca, cb) {
                        unassigned.remove(&b);
                        group.insert(b);
                        queue.push_back(b);
                    }
                }
            }
            out.push(group);
        }
        out
    }
}
