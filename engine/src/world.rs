//! World state container, constructors and the per-tick pipeline.
//!
//! `update` runs `move → isostacy → collide → dock → rift → clean`, then the
//! hotspot stage, then advances the clock. It is the only mutating entry
//! point once a world is built and is not reentrant.

use std::collections::BTreeSet;
use std::ops::AddAssign;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tecto_geo::{dot, to_cartesian, to_spherical, Spherical, Vec3};
use tracing::{debug, info, warn};

use crate::config::{WorldConfig, WorldError};
use crate::continent::Shields;
use crate::crust::{Crust, CrustKind, CrustRef};
use crate::grid::{CellId, FibLattice, GridError, Lattice};
use crate::hotspot::Hotspot;
use crate::plate::{Plate, PlateId, PlateSpec};
use crate::util::{gauss, random_point};

/// Seed namespace for plate placement and motion.
const PLATE_NS: u64 = 0x0070_6c61_7465;
/// Plate speed distribution (km/Myr): mean, standard deviation.
const PLATE_SPEED_KM_MYR: (f64, f64) = (42.8, 27.7);
/// Standard deviation of the per-plate density offset (kg/m³).
const DENSITY_OFFSET_SD: f64 = 40.0;

fn fib_lattice(spacing: f64) -> Result<Arc<dyn Lattice>, GridError> {
    Ok(Arc::new(FibLattice::new(spacing)?))
}

/// Counters for one tick, or accumulated over many.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepStats {
    /// Overlaps found by the collide stage.
    pub collisions: usize,
    /// Subduction links established.
    pub subductions: usize,
    /// Slabs found past the mountain width.
    pub detachments: usize,
    /// Eruptions over detached slabs.
    pub eruptions: usize,
    /// Dock requests queued, including hand-offs from eliminated plates.
    pub dock_requests: usize,
    /// Crusts moved between plates.
    pub docked: usize,
    /// Docked crusts that had to overwrite an occupied cell.
    pub dock_overwrites: usize,
    /// Oceanic crusts created by rifting.
    pub rifted: usize,
    /// Plates eliminated.
    pub plates_destroyed: usize,
    /// Hotspot eruptions.
    pub hotspot_eruptions: usize,
    /// World age after the step (Myr).
    pub age_myr: f64,
}

impl AddAssign for StepStats {
    fn add_assign(&mut self, rhs: Self) {
        self.collisions += rhs.collisions;
        self.subductions += rhs.subductions;
        self.detachments += rhs.detachments;
        self.eruptions += rhs.eruptions;
        self.dock_requests += rhs.dock_requests;
        self.docked += rhs.docked;
        self.dock_overwrites += rhs.dock_overwrites;
        self.rifted += rhs.rifted;
        self.plates_destroyed += rhs.plates_destroyed;
        self.hotspot_eruptions += rhs.hotspot_eruptions;
        self.age_myr = rhs.age_myr;
    }
}

/// Read-only snapshot of one crust for renderers and probes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CrustView {
    /// Handle of the crust.
    pub crust: CrustRef,
    /// World position on the unit sphere.
    pub position: Vec3,
    /// Same position as latitude/longitude.
    pub spherical: Spherical,
    /// Height above sea level (m).
    pub elevation_m: f64,
    /// Column thickness (m).
    pub thickness_m: f64,
    /// Column density (kg/m³).
    pub density: f64,
    /// Whether the column counts as continent.
    pub is_continent: bool,
    /// Whether another crust overrides this one.
    pub subducted: bool,
}

/// The complete simulation state.
#[derive(Clone, Debug)]
pub struct World {
    pub(crate) config: WorldConfig,
    pub(crate) lattice: Arc<dyn Lattice>,
    pub(crate) plates: Vec<Plate>,
    pub(crate) hotspots: Vec<Hotspot>,
    pub(crate) age_myr: f64,
    pub(crate) next_plate_id: PlateId,
    pub(crate) totals: StepStats,
}

impl World {
    /// Seeded world on a Fibonacci lattice.
    pub fn new(config: WorldConfig) -> Result<Self, WorldError> {
        Self::with_lattice(config, fib_lattice)
    }

    /// Seeded world on the lattice built by `factory` from the cell spacing (radians).
    pub fn with_lattice<F>(config: WorldConfig, factory: F) -> Result<Self, WorldError>
    where
        F: FnOnce(f64) -> Result<Arc<dyn Lattice>, GridError>,
    {
        let mut world = Self::bare(config, factory)?;
        world.hotspots = Hotspot::random(config.seed, config.hotspot_count, config.hotspot_heat);
        world.seed_plates();
        Ok(world)
    }

    /// World with no plates and no hotspots, for building scenarios by hand.
    pub fn empty(config: WorldConfig) -> Result<Self, WorldError> {
        Self::bare(config, fib_lattice)
    }

    fn bare<F>(config: WorldConfig, factory: F) -> Result<Self, WorldError>
    where
        F: FnOnce(f64) -> Result<Arc<dyn Lattice>, GridError>,
    {
        config.validate()?;
        let lattice = factory(config.spacing_rad())?;
        if lattice.len() == 0 {
            return Err(GridError::Degenerate { spacing: config.spacing_rad() }.into());
        }
        Ok(Self {
            config,
            lattice,
            plates: Vec::new(),
            hotspots: Vec::new(),
            age_myr: 0.0,
            next_plate_id: 0,
            totals: StepStats::default(),
        })
    }

    /// Random plates; every cell goes to the plate with the nearest centre,
    /// continental inside a shield and oceanic elsewhere.
    fn seed_plates(&mut self) {
        let cfg = self.config;
        let mut rng = StdRng::seed_from_u64(cfg.seed ^ PLATE_NS);
        let specs: Vec<PlateSpec> = (0..cfg.plate_count)
            .map(|_| PlateSpec {
                center: to_cartesian(random_point(&mut rng)),
                euler_pole: to_cartesian(random_point(&mut rng)),
                speed_km_myr: gauss(&mut rng, PLATE_SPEED_KM_MYR.0, PLATE_SPEED_KM_MYR.1),
                density_offset: gauss(&mut rng, 0.0, DENSITY_OFFSET_SD),
            })
            .collect();
        for spec in specs {
            self.add_plate(spec);
        }
        if self.plates.is_empty() {
            return;
        }
        let shields =
            Shields::random(cfg.seed, cfg.continent_count, self.km_to_radians(cfg.continent_size_km));
        let phys = cfg.physics;
        let mut continental = 0usize;
        for cell in 0..self.lattice.len() as CellId {
            let p = self.lattice.point(cell);
            let Some(idx) = self.nearest_plate_index(p) else { continue };
            let kind = if shields.contains(p) {
                continental += 1;
                CrustKind::Continental
            } else {
                CrustKind::Oceanic
            };
            let plate = &mut self.plates[idx];
            let crust = Crust::new(kind, plate.density_offset(), &phys);
            plate.add(cell, crust);
        }
        info!(
            plates = self.plates.len(),
            cells = self.lattice.len(),
            continental,
            seed = cfg.seed,
            "seeded world"
        );
    }

    fn nearest_plate_index(&self, p: Vec3) -> Option<usize> {
        self.plates
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| {
                dot(a.center().cartesian(), p).total_cmp(&dot(b.center().cartesian(), p)).then(ib.cmp(ia))
            })
            .map(|(i, _)| i)
    }

    /// Add an empty plate; returns its id.
    pub fn add_plate(&mut self, spec: PlateSpec) -> PlateId {
        let id = self.next_plate_id;
        self.next_plate_id += 1;
        self.plates.push(Plate::new(id, spec, Arc::clone(&self.lattice)));
        id
    }

    /// Place a fresh crust of `kind` at `cell` on `plate`.
    pub fn seed_crust(&mut self, plate: PlateId, cell: CellId, kind: CrustKind) -> Result<CrustRef, WorldError> {
        let phys = self.config.physics;
        let capacity = self.lattice.len();
        let p = self.plate_mut(plate).ok_or(WorldError::UnknownPlate(plate))?;
        if cell as usize >= capacity {
            return Err(WorldError::CellOutOfRange { cell, capacity });
        }
        let r = p.crust_ref(cell);
        if p.grid().is_occupied(cell) {
            return Err(WorldError::CellOccupied(r));
        }
        let crust = Crust::new(kind, p.density_offset(), &phys);
        p.add(cell, crust);
        Ok(r)
    }

    /// Add a hotspot.
    pub fn add_hotspot(&mut self, hotspot: Hotspot) {
        self.hotspots.push(hotspot);
    }

    /// Configuration the world was built with.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// The shared cell lattice.
    pub fn lattice(&self) -> &Arc<dyn Lattice> {
        &self.lattice
    }

    /// Live plates in creation order.
    pub fn plates(&self) -> &[Plate] {
        &self.plates
    }

    /// Hotspots.
    pub fn hotspots(&self) -> &[Hotspot] {
        &self.hotspots
    }

    /// Simulated time (Myr).
    pub fn age_myr(&self) -> f64 {
        self.age_myr
    }

    /// Counters accumulated over every update.
    pub fn totals(&self) -> &StepStats {
        &self.totals
    }

    /// Plate by id.
    pub fn plate(&self, id: PlateId) -> Option<&Plate> {
        self.plates.iter().find(|p| p.id() == id)
    }

    pub(crate) fn plate_mut(&mut self, id: PlateId) -> Option<&mut Plate> {
        self.plates.iter_mut().find(|p| p.id() == id)
    }

    pub(crate) fn plate_index(&self, id: PlateId) -> Option<usize> {
        self.plates.iter().position(|p| p.id() == id)
    }

    pub(crate) fn plate_ids(&self) -> Vec<PlateId> {
        self.plates.iter().map(Plate::id).collect()
    }

    /// Ids of every plate but `self.plates[idx]`, nearest centre first.
    pub(crate) fn others_by_distance(&self, idx: usize) -> Vec<PlateId> {
        let me = &self.plates[idx];
        let mut others: Vec<(f64, PlateId)> = self
            .plates
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != idx)
            .map(|(_, p)| (me.center_distance(p), p.id()))
            .collect();
        others.sort_by(|a, b| a.0.total_cmp(&b.0));
        others.into_iter().map(|(_, id)| id).collect()
    }

    /// Crust behind a handle.
    pub fn crust(&self, r: CrustRef) -> Option<&Crust> {
        self.plate(r.plate)?.crust(r.cell)
    }

    pub(crate) fn crust_mut(&mut self, r: CrustRef) -> Option<&mut Crust> {
        self.plate_mut(r.plate)?.crust_mut(r.cell)
    }

    /// World position of the cell behind a handle, occupied or not.
    pub fn position(&self, r: CrustRef) -> Option<Vec3> {
        let p = self.plate(r.plate)?;
        ((r.cell as usize) < p.grid().capacity()).then(|| p.position(r.cell))
    }

    /// Arc length on the planet (km) for an angle in radians.
    pub fn radians_to_km(&self, radians: f64) -> f64 {
        radians * self.config.radius_km
    }

    /// Angle (radians) for an arc length on the planet in km.
    pub fn km_to_radians(&self, km: f64) -> f64 {
        km / self.config.radius_km
    }

    /// Every crust on every plate.
    pub fn crusts(&self) -> impl Iterator<Item = CrustView> + '_ {
        let phys = self.config.physics;
        self.plates.iter().flat_map(move |p| {
            p.grid().iter().map(move |(cell, c)| {
                let position = p.position(cell);
                CrustView {
                    crust: p.crust_ref(cell),
                    position,
                    spherical: to_spherical(position),
                    elevation_m: c.elevation_m(&phys),
                    thickness_m: c.thickness_m(),
                    density: c.density(),
                    is_continent: c.is_continent(&phys),
                    subducted: c.subducted_by().is_some(),
                }
            })
        })
    }

    /// Occupied cells over all plates.
    pub fn occupied_count(&self) -> usize {
        self.plates.iter().map(|p| p.grid().len()).sum()
    }

    /// The move stage.
    pub(crate) fn move_plates(&mut self, dt_myr: f64) {
        let radius_km = self.config.radius_km;
        for p in &mut self.plates {
            p.move_by(dt_myr, radius_km);
        }
    }

    /// The clean stage: eliminate plates left with no oceanic surface crust.
    /// The last plate is never eliminated.
    pub(crate) fn clean(&mut self, stats: &mut StepStats) {
        let phys = self.config.physics;
        while self.plates.len() > 1 {
            let doomed = self
                .plates
                .iter()
                .position(|p| !p.grid().iter().any(|(_, c)| !c.is_continent(&phys) && c.subducted_by().is_none()));
            let Some(idx) = doomed else { return };
            self.eliminate(idx, stats);
        }
    }

    /// Remove `self.plates[idx]`: continents go to the nearest plate, oceanic
    /// slabs feed their overrider, everything else is destroyed.
    fn eliminate(&mut self, idx: usize, stats: &mut StepStats) {
        let id = self.plates[idx].id();
        let phys = self.config.physics;
        let continental: BTreeSet<CellId> = self.plates[idx]
            .grid()
            .iter()
            .filter(|(_, c)| c.is_continent(&phys))
            .map(|(cell, _)| cell)
            .collect();
        let mut handed = 0;
        if !continental.is_empty() {
            if let Some(&to) = self.others_by_distance(idx).first() {
                let own: BTreeSet<CellId> = self.plate(to).map(|p| p.grid().cells().collect()).unwrap_or_default();
                self.merge_momentum(to, &own, id, &continental);
                if let Some(dst) = self.plate_mut(to) {
                    for &cell in &continental {
                        dst.queue_dock(CrustRef::new(id, cell));
                    }
                }
                stats.dock_requests += 1;
                handed = self.dock_plate(to, &mut BTreeSet::new(), stats);
            }
        }
        let rest: Vec<CellId> = self.plates[idx].grid().cells().collect();
        for cell in rest {
            let r = CrustRef::new(id, cell);
            let Some(c) = self.crust(r) else { continue };
            let feed = (!c.is_continent(&phys)).then(|| (c.subducted_by(), c.own_thickness_m()));
            if let Some((Some(top), thickness_m)) = feed {
                if let Some(t) = self.crust_mut(top) {
                    t.absorb(thickness_m);
                }
            }
            self.destroy_crust(r);
        }
        if let Some(idx) = self.plate_index(id) {
            self.plates.remove(idx);
        }
        for p in &mut self.plates {
            p.forget_plate(id);
            p.invalidate();
            p.reset_collisions();
        }
        stats.plates_destroyed += 1;
        info!(plate = id, handed, remaining = self.plates.len(), "plate eliminated");
    }

    /// Advance the simulation by `dt_myr`.
    pub fn update(&mut self, dt_myr: f64) -> StepStats {
        let mut stats = StepStats { age_myr: self.age_myr, ..StepStats::default() };
        if !dt_myr.is_finite() {
            warn!(dt_myr, "ignoring non-finite timestep");
            return stats;
        }
        self.move_plates(dt_myr);
        self.isostacy();
        self.collide(&mut stats);
        self.dock(&mut stats);
        self.rift(&mut stats);
        self.clean(&mut stats);
        self.erupt_hotspots(dt_myr, &mut stats);
        self.age_myr += dt_myr;
        stats.age_myr = self.age_myr;
        self.totals += stats;
        debug!(
            age_myr = self.age_myr,
            plates = self.plates.len(),
            cells = self.occupied_count(),
            collisions = stats.collisions,
            subductions = stats.subductions,
            detachments = stats.detachments,
            docked = stats.docked,
            rifted = stats.rifted,
            destroyed = stats.plates_destroyed,
            "tick"
        );
        debug_assert!(self.links_consistent(), "asymmetric subduction link after update");
        stats
    }
}
