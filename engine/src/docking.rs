//! Continental docking: merging one plate's landmass into another.
//!
//! Modeling notes
//! - A request compares the two continental groups touching the collision
//!   and queues the smaller one onto the other plate. On equal sizes the
//!   bottom group moves.
//! - The receiving plate takes the combined angular momentum of both
//!   groups divided by their combined inertial mass.
//! - A queued crust lands in the cell under it, else the nearest
//!   neighbour cell, else the nearest empty neighbour. If all of those are
//!   taken it overwrites the occupant; that is counted and logged.
//! - Crust that landed earlier in the same dock stage is never picked up
//!   again by a request queued before it arrived.
//! - Former subduction partners on other plates are relinked when they are
//!   still free; links into the receiving plate itself are dropped.

use std::collections::BTreeSet;

use tecto_geo::{add, scale, Vec3};
use tracing::warn;

use crate::crust::{Crust, CrustRef};
use crate::grid::CellId;
use crate::plate::PlateId;
use crate::world::{StepStats, World};

impl World {
    /// Queue the smaller continental group around `top`/`bottom` onto the other plate.
    /// Returns false when a request between the two is already pending.
    pub(crate) fn request_dock(&mut self, top: CrustRef, bottom: CrustRef) -> bool {
        if top.plate == bottom.plate {
            return false;
        }
        let (Some(tp), Some(bp)) = (self.plate(top.plate), self.plate(bottom.plate)) else {
            return false;
        };
        if tp.is_dock_requested(bottom) || bp.is_dock_requested(top) {
            return false;
        }
        let phys = self.config.physics;
        let continental = |_: &Crust, next: &Crust| next.is_continent(&phys);
        let bottom_group = bp.group(bottom.cell, continental);
        let top_group = tp.group(top.cell, continental);
        let (smaller, larger, from, to) = if bottom_group.len() <= top_group.len() {
            (bottom_group, top_group, bottom.plate, top.plate)
        } else {
            (top_group, bottom_group, top.plate, bottom.plate)
        };
        self.merge_momentum(to, &larger, from, &smaller);
        if let Some(dst) = self.plate_mut(to) {
            for cell in smaller {
                dst.queue_dock(CrustRef::new(from, cell));
            }
        }
        true
    }

    /// Give plate `to` the combined angular momentum of its `own` cells and `from`'s `incoming` cells.
    pub(crate) fn merge_momentum(
        &mut self,
        to: PlateId,
        own: &BTreeSet<CellId>,
        from: PlateId,
        incoming: &BTreeSet<CellId>,
    ) {
        let (Some(dst), Some(src)) = (self.plate(to), self.plate(from)) else { return };
        let momentum: Vec3 =
            add(dst.momentum(own.iter().copied()), src.momentum(incoming.iter().copied()));
        let mass = dst.mass(own.iter().copied()) + src.mass(incoming.iter().copied());
        if mass > 0.0 && mass.is_finite() {
            if let Some(dst) = self.plate_mut(to) {
                dst.set_velocity(scale(momentum, 1.0 / mass));
            }
        }
    }

    /// The dock stage: every plate pulls in its queued crust.
    pub(crate) fn dock(&mut self, stats: &mut StepStats) {
        let mut moved = false;
        let mut arrived = BTreeSet::new();
        for id in self.plate_ids() {
            moved |= self.dock_plate(id, &mut arrived, stats) > 0;
        }
        if moved {
            for p in &mut self.plates {
                p.invalidate();
                p.reset_collisions();
            }
        }
    }

    /// Transfer everything queued on plate `id`; returns how many crusts moved.
    ///
    /// Queued handles found in `arrived` are skipped, and every landing
    /// cell is added to it.
    pub(crate) fn dock_plate(
        &mut self,
        id: PlateId,
        arrived: &mut BTreeSet<CrustRef>,
        stats: &mut StepStats,
    ) -> usize {
        let Some(queue) = self.plate_mut(id).map(|p| p.take_docking()) else { return 0 };
        let mut moved = 0;
        for src in queue {
            if src.plate == id || arrived.contains(&src) {
                continue;
            }
            if let Some(landed) = self.transfer(src, id, stats) {
                arrived.insert(landed);
                moved += 1;
            }
        }
        moved
    }

    /// Move crust `src` onto plate `dst`, returning where it landed.
    fn transfer(&mut self, src: CrustRef, dst: PlateId, stats: &mut StepStats) -> Option<CrustRef> {
        let crust = self.crust(src)?;
        let pos = self.position(src)?;
        self.plate(dst)?;
        let (down, up) = (crust.subducts(), crust.subducted_by());
        let crust = self.destroy_crust(src)?;
        let cell = self.choose_dock_cell(dst, pos, stats)?;
        let here = CrustRef::new(dst, cell);
        if let Some(p) = self.plate_mut(dst) {
            p.add(cell, crust.transferred());
        }
        stats.docked += 1;
        if let Some(bottom) = down.filter(|b| b.plate != dst) {
            if self.crust(bottom).is_some_and(|c| c.subducted_by().is_none()) {
                self.link(here, bottom);
            }
        }
        if let Some(top) = up.filter(|t| t.plate != dst) {
            if self.crust(top).is_some_and(|c| c.subducts().is_none()) {
                self.link(top, here);
            }
        }
        Some(here)
    }

    /// Cell on plate `dst` that will receive crust arriving at `pos`, freeing it if needed.
    fn choose_dock_cell(&mut self, dst: PlateId, pos: Vec3, stats: &mut StepStats) -> Option<CellId> {
        let plate = self.plate(dst)?;
        let grid = plate.grid();
        let mut cell = grid.index_of(pos);
        if grid.is_occupied(cell) {
            if let Some(n) = grid.nearest_of(pos, grid.neighbor_ids(cell)) {
                cell = n;
            }
        }
        if grid.is_occupied(cell) {
            let empty = grid.neighbor_ids(cell).into_iter().filter(|&n| !grid.is_occupied(n));
            if let Some(n) = grid.nearest_of(pos, empty) {
                cell = n;
            }
        }
        if grid.is_occupied(cell) {
            stats.dock_overwrites += 1;
            warn!(plate = dst, cell, "docking overwrites existing crust");
            self.destroy_crust(CrustRef::new(dst, cell));
        }
        Some(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::crust::CrustKind;
    use crate::plate::PlateSpec;

    fn world() -> World {
        let config = WorldConfig { resolution: 24, plate_count: 0, continent_count: 0, ..WorldConfig::default() };
        World::empty(config).unwrap()
    }

    fn spec(pole: Vec3, speed_km_myr: f64) -> PlateSpec {
        PlateSpec { center: [1.0, 0.0, 0.0], euler_pole: pole, speed_km_myr, density_offset: 0.0 }
    }

    fn close(a: Vec3, b: Vec3) -> bool {
        (0..3).all(|k| (a[k] - b[k]).abs() < 1e-9 * (1.0 + b[k].abs()))
    }

    #[test]
    fn dock_conserves_angular_momentum() {
        let mut w = world();
        let a = w.add_plate(spec([0.0, 1.0, 0.0], 40.0));
        let b = w.add_plate(spec([0.0, 0.0, 1.0], 25.0));
        let big = 120;
        w.seed_crust(a, big, CrustKind::Continental).unwrap();
        let ring: Vec<CellId> = w.plate(a).unwrap().grid().neighbor_ids(big).into_iter().collect();
        for c in ring {
            if w.crust(CrustRef::new(a, c)).is_none() {
                w.seed_crust(a, c, CrustKind::Continental).unwrap();
            }
        }
        let small = 330;
        let top = w.seed_crust(b, small, CrustKind::Continental).unwrap();
        let bottom = CrustRef::new(a, big);

        let pa = w.plate(a).unwrap();
        let pb = w.plate(b).unwrap();
        let a_cells: Vec<CellId> = pa.grid().cells().collect();
        let momentum = add(pa.momentum(a_cells.iter().copied()), pb.momentum([small]));
        let mass = pa.mass(a_cells.iter().copied()) + pb.mass([small]);
        let expected = scale(momentum, 1.0 / mass);

        assert!(w.request_dock(top, bottom));
        assert!(!w.request_dock(top, bottom), "second request is ignored");
        assert!(close(w.plate(a).unwrap().velocity(), expected));
        assert!(w.plate(a).unwrap().is_dock_requested(top));

        let mut stats = StepStats::default();
        w.dock(&mut stats);
        assert_eq!(stats.docked, 1);
        assert!(w.plate(b).unwrap().grid().is_empty());
        assert_eq!(w.plate(a).unwrap().grid().len(), a_cells.len() + 1);
        assert!(close(w.plate(a).unwrap().velocity(), expected));
        assert!(w.plate(a).unwrap().pending_docks().is_empty());
        assert!(w.links_consistent());
    }

    #[test]
    fn equal_groups_move_the_bottom_one() {
        let mut w = world();
        let a = w.add_plate(spec([0.0, 1.0, 0.0], 10.0));
        let b = w.add_plate(spec([0.0, 1.0, 0.0], 10.0));
        let top = w.seed_crust(a, 50, CrustKind::Continental).unwrap();
        let bottom = w.seed_crust(b, 350, CrustKind::Continental).unwrap();
        assert!(w.request_dock(top, bottom));
        assert!(w.plate(a).unwrap().is_dock_requested(bottom));
        assert!(w.plate(b).unwrap().pending_docks().is_empty());
    }

    #[test]
    fn transfer_relinks_foreign_partner() {
        let mut w = world();
        let a = w.add_plate(spec([0.0, 1.0, 0.0], 10.0));
        let b = w.add_plate(spec([0.0, 1.0, 0.0], 10.0));
        let c = w.add_plate(spec([0.0, 1.0, 0.0], 10.0));
        let land = w.seed_crust(b, 200, CrustKind::Continental).unwrap();
        let slab = w.seed_crust(c, 200, CrustKind::Oceanic).unwrap();
        w.subduct(land, slab).unwrap();
        w.plate_mut(a).unwrap().queue_dock(land);
        let mut stats = StepStats::default();
        w.dock(&mut stats);
        assert_eq!(stats.docked, 1);
        assert!(w.crust(land).is_none());
        let top = w.crust(slab).unwrap().subducted_by().unwrap();
        assert_eq!(top.plate, a);
        assert!(w.links_consistent());
    }

    #[test]
    fn full_neighbourhood_is_overwritten_and_counted() {
        let mut w = world();
        let a = w.add_plate(spec([0.0, 1.0, 0.0], 10.0));
        let b = w.add_plate(spec([0.0, 1.0, 0.0], 10.0));
        let n = w.plate(a).unwrap().grid().capacity() as CellId;
        for cell in 0..n {
            w.seed_crust(a, cell, CrustKind::Oceanic).unwrap();
        }
        let land = w.seed_crust(b, 210, CrustKind::Continental).unwrap();
        w.plate_mut(a).unwrap().queue_dock(land);
        let mut stats = StepStats::default();
        w.dock(&mut stats);
        assert_eq!(stats.docked, 1);
        assert_eq!(stats.dock_overwrites, 1);
        assert_eq!(w.plate(a).unwrap().grid().len(), n as usize);
        let continents = w.crusts().filter(|v| v.is_continent).count();
        assert_eq!(continents, 1);
    }

    #[test]
    fn crust_landing_in_a_vacated_cell_is_not_picked_up_again() {
        let mut w = world();
        let a = w.add_plate(spec([0.0, 1.0, 0.0], 10.0));
        let b = w.add_plate(spec([0.0, 1.0, 0.0], 10.0));
        let c = w.add_plate(spec([0.0, 1.0, 0.0], 10.0));
        let cell = 200;
        let stale = w.seed_crust(a, cell, CrustKind::Continental).unwrap();
        w.plate_mut(c).unwrap().queue_dock(stale);
        w.destroy_crust(stale);
        let incoming = w.seed_crust(b, cell, CrustKind::Continental).unwrap();
        w.plate_mut(a).unwrap().queue_dock(incoming);

        let mut stats = StepStats::default();
        w.dock(&mut stats);
        assert_eq!(stats.docked, 1);
        assert_eq!(w.plate(a).unwrap().grid().len(), 1);
        assert!(w.plate(b).unwrap().grid().is_empty());
        assert!(w.plate(c).unwrap().grid().is_empty());
        assert!(w.plate(c).unwrap().pending_docks().is_empty());
    }
}
