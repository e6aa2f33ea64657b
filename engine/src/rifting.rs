//! Rifting: new oceanic crust in empty cells along plate edges.
//!
//! Modeling notes
//! - Candidates are the plate's riftable cells: empty, next to crust that
//!   is not being subducted.
//! - A candidate is filled only if no other plate already covers that
//!   position, counting a nearby occupied neighbour as cover. Checks go to
//!   the plate remembered for the cell when there is one, else to every
//!   other plate nearest centre first.
//! - A blocked candidate records the blocking plate on both sides so the
//!   next tick only rechecks that plate.

use crate::crust::{Crust, CrustKind, CrustRef};
use crate::grid::CollisionMode;
use crate::world::{StepStats, World};

impl World {
    /// The rift stage.
    pub(crate) fn rift(&mut self, stats: &mut StepStats) {
        let phys = self.config.physics;
        for id in self.plate_ids() {
            let Some(idx) = self.plate_index(id) else { continue };
            let others = self.others_by_distance(idx);
            let cells = self.plates[idx].riftable_snapshot();
            for cell in cells {
                if self.plates[idx].grid().is_occupied(cell) {
                    continue;
                }
                let pos = self.plates[idx].position(cell);
                let memo = self.plates[idx].collision_memo(cell).filter(|&m| self.plate_index(m).is_some());
                let candidates = match &memo {
                    Some(m) => std::slice::from_ref(m),
                    None => others.as_slice(),
                };
                match self.find_collision(pos, candidates, CollisionMode::Nearest) {
                    None => {
                        let plate = &mut self.plates[idx];
                        let crust = Crust::new(CrustKind::Oceanic, plate.density_offset(), &phys);
                        plate.add(cell, crust);
                        plate.clear_collision(cell);
                        stats.rifted += 1;
                    }
                    Some(hit) => self.track_pair(CrustRef::new(id, cell), hit),
                }
            }
        }
    }
}
