//! Isostasy stage: refresh subducted loads, then Airy displacement for every crust.

use crate::crust::{Crust, CrustRef, Load};
use crate::world::World;

impl World {
    /// The isostacy stage.
    pub(crate) fn isostacy(&mut self) {
        let loads: Vec<(CrustRef, Option<Load>)> = self
            .plates
            .iter()
            .flat_map(|p| {
                p.grid().iter().filter_map(move |(cell, c)| {
                    c.subducts().map(|bottom| (p.crust_ref(cell), bottom))
                })
            })
            .map(|(top, bottom)| (top, self.crust(bottom).map(Crust::own_load)))
            .collect();
        for (top, load) in loads {
            if let Some(c) = self.crust_mut(top) {
                c.set_load(load);
            }
        }
        let phys = self.config.physics;
        for plate in &mut self.plates {
            for (_, crust) in plate.crusts_mut() {
                crust.isostacy(&phys);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::WorldConfig;
    use crate::crust::{CrustKind, CrustRef};
    use crate::plate::PlateSpec;
    use crate::world::World;

    #[test]
    fn loads_follow_partner_thickness() {
        let config = WorldConfig { resolution: 24, plate_count: 0, continent_count: 0, ..WorldConfig::default() };
        let mut w = World::empty(config).unwrap();
        let spec = PlateSpec { center: [1.0, 0.0, 0.0], euler_pole: [0.0, 1.0, 0.0], speed_km_myr: 0.0, density_offset: 0.0 };
        let a = w.add_plate(spec);
        let b = w.add_plate(spec);
        let top = w.seed_crust(a, 30, CrustKind::Oceanic).unwrap();
        let bottom = w.seed_crust(b, 30, CrustKind::Oceanic).unwrap();
        w.subduct(top, bottom).unwrap();
        w.crust_mut(bottom).unwrap().absorb(900.0);
        w.isostacy();
        let load = w.crust(top).unwrap().load().unwrap();
        assert_eq!(load.thickness_m, 8_000.0);
        let d1 = w.crust(top).unwrap().displacement_m();
        w.isostacy();
        assert_eq!(w.crust(top).unwrap().displacement_m(), d1);
        assert!(w.crust(CrustRef::new(a, 31)).is_none());
    }
}
