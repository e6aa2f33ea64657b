//! Subduction links and the collide stage.
//!
//! Modeling notes
//! - A collidable crust is tested against the other plates, nearest centre
//!   first, or only against the plate remembered for its cell. Only the
//!   exact cell under the point counts as an overlap here.
//! - The pair is ordered by any existing link, else the lighter column
//!   rides on top. Ties go to the lower crust handle.
//! - A crust that has travelled more than the mountain width beneath its
//!   first overrider detaches: two continents request a dock, anything
//!   else erupts on the top crust and the slab is destroyed.
//! - A collidable crust with no overlap left is released from its
//!   overrider.

use std::cmp::Ordering;

use tecto_geo::{GeoCoordinate, Vec3};

use crate::config::WorldError;
use crate::crust::{Crust, CrustRef};
use crate::grid::CollisionMode;
use crate::plate::PlateId;
use crate::world::{StepStats, World};

impl World {
    /// Make `top` override `bottom`, clearing any other link either side held.
    pub(crate) fn link(&mut self, top: CrustRef, bottom: CrustRef) -> bool {
        if top == bottom {
            return false;
        }
        let (Some(t), Some(b)) = (self.crust(top), self.crust(bottom)) else {
            return false;
        };
        let old_down = t.subducts().filter(|&r| r != bottom);
        let old_up = b.subducted_by().filter(|&r| r != top);
        if let Some(old) = old_down {
            self.unlink(top, old);
        }
        if let Some(old) = old_up {
            self.unlink(old, bottom);
        }
        let Some(load) = self.crust(bottom).map(Crust::own_load) else {
            return false;
        };
        let top_at = self.position(top);
        if let Some(t) = self.crust_mut(top) {
            t.set_subducts(Some(bottom), Some(load));
        }
        if let Some(b) = self.crust_mut(bottom) {
            b.set_subducted_by(Some(top), top_at);
        }
        self.touch(top);
        self.touch(bottom);
        true
    }

    /// Remove the `top` over `bottom` link from whichever side still holds it.
    pub(crate) fn unlink(&mut self, top: CrustRef, bottom: CrustRef) {
        if let Some(t) = self.crust_mut(top) {
            if t.subducts() == Some(bottom) {
                t.set_subducts(None, None);
            }
        }
        if let Some(b) = self.crust_mut(bottom) {
            if b.subducted_by() == Some(top) {
                b.set_subducted_by(None, None);
            }
        }
        self.touch(top);
        self.touch(bottom);
    }

    /// Drop every link `crust` takes part in.
    pub(crate) fn sever(&mut self, crust: CrustRef) {
        let Some(c) = self.crust(crust) else { return };
        let (down, up) = (c.subducts(), c.subducted_by());
        if let Some(bottom) = down {
            self.unlink(crust, bottom);
        }
        if let Some(top) = up {
            self.unlink(top, crust);
        }
    }

    /// Sever and remove `crust` from its plate.
    pub(crate) fn destroy_crust(&mut self, crust: CrustRef) -> Option<Crust> {
        self.sever(crust);
        self.plate_mut(crust.plate)?.remove(crust.cell)
    }

    fn touch(&mut self, crust: CrustRef) {
        if let Some(p) = self.plate_mut(crust.plate) {
            p.update(crust.cell);
        }
    }

    /// Link `top` over `bottom` by hand.
    pub fn subduct(&mut self, top: CrustRef, bottom: CrustRef) -> Result<(), WorldError> {
        for r in [top, bottom] {
            if self.crust(r).is_none() {
                return Err(WorldError::MissingCrust(r));
            }
        }
        self.link(top, bottom);
        Ok(())
    }

    /// Whether every link is mirrored on its partner.
    pub fn links_consistent(&self) -> bool {
        self.plates.iter().all(|p| {
            p.grid().iter().all(|(cell, c)| {
                let me = p.crust_ref(cell);
                let down_ok = c
                    .subducts()
                    .map_or(true, |b| self.crust(b).and_then(Crust::subducted_by) == Some(me));
                let up_ok = c
                    .subducted_by()
                    .map_or(true, |t| self.crust(t).and_then(Crust::subducts) == Some(me));
                down_ok && up_ok
            })
        })
    }

    /// Whether `bottom` has moved past the mountain width since it first went under.
    ///
    /// Distance is taken to the first overrider's cell while its plate lives,
    /// else to where that overrider stood when the link formed.
    pub(crate) fn is_detaching(&self, bottom: CrustRef) -> bool {
        let Some(c) = self.crust(bottom) else { return false };
        let Some(first) = c.first_subducted_by() else { return false };
        let Some(there) = self.position(first).or(c.first_overrider_at()) else {
            return false;
        };
        let Some(here) = self.position(bottom) else { return false };
        let travelled = GeoCoordinate::from_cartesian(here).arc_distance(&GeoCoordinate::from_cartesian(there));
        self.radians_to_km(travelled) > self.config.max_mountain_width_km
    }

    /// Settle an overlap between `a` and `b`.
    pub(crate) fn resolve_collision(&mut self, a: CrustRef, b: CrustRef, stats: &mut StepStats) {
        let (Some(ca), Some(cb)) = (self.crust(a), self.crust(b)) else { return };
        let (top, bottom) = if ca.subducted_by().is_some() {
            (b, a)
        } else if cb.subducted_by().is_some() {
            (a, b)
        } else {
            match ca.density().total_cmp(&cb.density()).then(a.cmp(&b)) {
                Ordering::Greater => (b, a),
                _ => (a, b),
            }
        };
        let (Some(ct), Some(cb)) = (self.crust(top), self.crust(bottom)) else { return };
        if ct.subducts() == Some(bottom) && cb.subducted_by() == Some(top) {
            return;
        }
        if !self.is_detaching(bottom) {
            if self.link(top, bottom) {
                stats.subductions += 1;
            }
            return;
        }
        stats.detachments += 1;
        let phys = self.config.physics;
        if ct.is_continent(&phys) && cb.is_continent(&phys) {
            if self.request_dock(top, bottom) {
                stats.dock_requests += 1;
            }
            return;
        }
        if let Some(t) = self.crust_mut(top) {
            if t.erupt(&phys) > 0.0 {
                stats.eruptions += 1;
            }
        }
        self.destroy_crust(bottom);
        self.touch(top);
    }

    /// First crust among `candidates` overlapping world point `p`.
    pub(crate) fn find_collision(
        &self,
        p: Vec3,
        candidates: &[PlateId],
        mode: CollisionMode,
    ) -> Option<CrustRef> {
        candidates.iter().find_map(|&id| {
            let plate = self.plate(id)?;
            plate.grid().collision(p, mode).map(|cell| plate.crust_ref(cell))
        })
    }

    /// Remember the overlap on both plates.
    pub(crate) fn track_pair(&mut self, here: CrustRef, there: CrustRef) {
        if let Some(p) = self.plate_mut(here.plate) {
            p.track_collisions(here.cell, there.plate);
        }
        if let Some(p) = self.plate_mut(there.plate) {
            p.track_collisions(there.cell, here.plate);
        }
    }

    /// The collide stage.
    pub(crate) fn collide(&mut self, stats: &mut StepStats) {
        for id in self.plate_ids() {
            let Some(idx) = self.plate_index(id) else { continue };
            let others = self.others_by_distance(idx);
            let cells = self.plates[idx].collidable_snapshot();
            for cell in cells {
                let me = CrustRef::new(id, cell);
                if self.crust(me).is_none() {
                    continue;
                }
                let pos = self.plates[idx].position(cell);
                let memo = self.plates[idx].collision_memo(cell).filter(|&m| self.plate_index(m).is_some());
                let candidates = match &memo {
                    Some(m) => std::slice::from_ref(m),
                    None => others.as_slice(),
                };
                match self.find_collision(pos, candidates, CollisionMode::Exact) {
                    Some(hit) => {
                        stats.collisions += 1;
                        self.track_pair(me, hit);
                        self.resolve_collision(me, hit, stats);
                    }
                    None => {
                        self.plates[idx].clear_collision(cell);
                        if let Some(top) = self.crust(me).and_then(Crust::subducted_by) {
                            self.unlink(top, me);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::crust::CrustKind;
    use crate::plate::PlateSpec;

    fn two_plates() -> (World, PlateId, PlateId) {
        let config = WorldConfig { resolution: 24, plate_count: 0, continent_count: 0, ..WorldConfig::default() };
        let mut w = World::empty(config).unwrap();
        let spec = |offset| PlateSpec {
            center: [1.0, 0.0, 0.0],
            euler_pole: [0.0, 1.0, 0.0],
            speed_km_myr: 0.0,
            density_offset: offset,
        };
        let a = w.add_plate(spec(-10.0));
        let b = w.add_plate(spec(10.0));
        (w, a, b)
    }

    #[test]
    fn link_replaces_previous_partners() {
        let (mut w, a, b) = two_plates();
        let top = w.seed_crust(a, 10, CrustKind::Oceanic).unwrap();
        let first = w.seed_crust(b, 10, CrustKind::Oceanic).unwrap();
        let second = w.seed_crust(b, 40, CrustKind::Oceanic).unwrap();
        w.subduct(top, first).unwrap();
        assert!(w.links_consistent());
        assert_eq!(w.crust(top).unwrap().load().unwrap().thickness_m, 7_100.0);
        w.subduct(top, second).unwrap();
        assert!(w.links_consistent());
        assert_eq!(w.crust(first).unwrap().subducted_by(), None);
        assert_eq!(w.crust(first).unwrap().first_subducted_by(), Some(top));
        assert_eq!(w.crust(second).unwrap().subducted_by(), Some(top));
        w.destroy_crust(second);
        assert!(w.links_consistent());
        assert_eq!(w.crust(top).unwrap().subducts(), None);
        assert_eq!(w.crust(top).unwrap().load(), None);
    }

    #[test]
    fn lighter_crust_rides_on_top() {
        let (mut w, a, b) = two_plates();
        let light = w.seed_crust(a, 10, CrustKind::Oceanic).unwrap();
        let dense = w.seed_crust(b, 10, CrustKind::Oceanic).unwrap();
        let mut stats = StepStats::default();
        w.resolve_collision(dense, light, &mut stats);
        assert_eq!(stats.subductions, 1);
        assert_eq!(w.crust(light).unwrap().subducts(), Some(dense));
        assert_eq!(w.crust(dense).unwrap().subducted_by(), Some(light));

        // Settled pairs are left alone.
        w.resolve_collision(light, dense, &mut stats);
        assert_eq!(stats.subductions, 1);
    }

    #[test]
    fn detached_oceanic_slab_erupts_and_is_destroyed() {
        let (mut w, a, b) = two_plates();
        let far_top = w.seed_crust(a, 5, CrustKind::Oceanic).unwrap();
        let top = w.seed_crust(a, 300, CrustKind::Oceanic).unwrap();
        let slab = w.seed_crust(b, 300, CrustKind::Oceanic).unwrap();
        w.subduct(far_top, slab).unwrap();
        assert!(w.is_detaching(slab));
        let before = w.crust(top).unwrap().own_thickness_m();
        let mut stats = StepStats::default();
        w.resolve_collision(top, slab, &mut stats);
        assert_eq!(stats.detachments, 1);
        assert_eq!(stats.eruptions, 1);
        assert!(w.crust(slab).is_none());
        assert!(w.crust(top).unwrap().own_thickness_m() > before);
        assert_eq!(w.crust(far_top).unwrap().subducts(), None);
        assert!(w.links_consistent());
    }

    #[test]
    fn nearby_first_overrider_is_not_detaching() {
        let (mut w, a, b) = two_plates();
        let top = w.seed_crust(a, 300, CrustKind::Oceanic).unwrap();
        let slab = w.seed_crust(b, 300, CrustKind::Oceanic).unwrap();
        assert!(!w.is_detaching(slab));
        w.subduct(top, slab).unwrap();
        assert!(!w.is_detaching(slab));
    }

    #[test]
    fn slab_outlives_its_first_overriders_plate() {
        let (mut w, a, b) = two_plates();
        let far_top = w.seed_crust(a, 5, CrustKind::Continental).unwrap();
        let slab = w.seed_crust(b, 300, CrustKind::Oceanic).unwrap();
        let top_at = w.position(far_top).unwrap();
        w.subduct(far_top, slab).unwrap();
        assert_eq!(w.crust(slab).unwrap().first_overrider_at(), Some(top_at));

        let mut stats = StepStats::default();
        w.clean(&mut stats);
        assert!(w.plate(a).is_none());
        assert_eq!(stats.plates_destroyed, 1);
        let c = w.crust(slab).unwrap();
        assert_eq!(c.first_subducted_by(), Some(far_top));
        assert_eq!(c.subducted_by(), None);
        assert!(w.is_detaching(slab));
    }
}
