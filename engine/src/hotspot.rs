//! Hotspots: fixed points in world space that erupt on whatever crust
//! drifts over them.
//!
//! Each hotspot erupts at a steady rate (eruptions per Myr). Fractional
//! eruptions carry over between ticks, so a rate of 0.5 erupts every
//! second Myr regardless of step size.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tecto_geo::{to_cartesian, Vec3};

use crate::crust::CrustRef;
use crate::grid::CollisionMode;
use crate::util::random_point;
use crate::world::{StepStats, World};

/// Seed namespace for hotspot placement.
const NS: u64 = 0x0068_6f74_7370_6f74;

/// A fixed eruption point.
#[derive(Clone, Debug, PartialEq)]
pub struct Hotspot {
    position: Vec3,
    rate_per_myr: f64,
    pending: f64,
}

impl Hotspot {
    /// Hotspot at `position` erupting `rate_per_myr` times per Myr.
    pub fn new(position: Vec3, rate_per_myr: f64) -> Self {
        let rate_per_myr = if rate_per_myr.is_finite() { rate_per_myr.max(0.0) } else { 0.0 };
        Self { position, rate_per_myr, pending: 0.0 }
    }

    /// `count` hotspots with rates uniform in `[0, heat]`.
    pub fn random(seed: u64, count: u32, heat: f64) -> Vec<Self> {
        let mut rng = StdRng::seed_from_u64(seed ^ NS);
        (0..count)
            .map(|_| {
                let position = to_cartesian(random_point(&mut rng));
                let rate = if heat > 0.0 { rng.gen_range(0.0..=heat) } else { 0.0 };
                Self::new(position, rate)
            })
            .collect()
    }

    /// World position.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Eruptions per Myr.
    pub fn rate_per_myr(&self) -> f64 {
        self.rate_per_myr
    }

    /// Advance by `dt_myr`; returns the whole eruptions now due.
    pub fn advance(&mut self, dt_myr: f64) -> u32 {
        if !(dt_myr > 0.0) {
            return 0;
        }
        self.pending += self.rate_per_myr * dt_myr;
        let due = self.pending.floor();
        self.pending -= due;
        due as u32
    }
}

impl World {
    /// Topmost crust under world point `p`, preferring crust nobody overrides.
    pub(crate) fn surface_crust_at(&self, p: Vec3) -> Option<CrustRef> {
        let hits: Vec<CrustRef> = self
            .plates
            .iter()
            .filter_map(|plate| plate.grid().collision(p, CollisionMode::Exact).map(|c| plate.crust_ref(c)))
            .collect();
        hits.iter()
            .copied()
            .find(|&r| self.crust(r).is_some_and(|c| c.subducted_by().is_none()))
            .or_else(|| hits.first().copied())
    }

    /// The hotspot stage.
    pub(crate) fn erupt_hotspots(&mut self, dt_myr: f64, stats: &mut StepStats) {
        let phys = self.config.physics;
        for i in 0..self.hotspots.len() {
            let due = self.hotspots[i].advance(dt_myr);
            if due == 0 {
                continue;
            }
            let Some(target) = self.surface_crust_at(self.hotspots[i].position()) else { continue };
            let Some(crust) = self.crust_mut(target) else { continue };
            for _ in 0..due {
                if crust.erupt(&phys) > 0.0 {
                    stats.hotspot_eruptions += 1;
                }
            }
        }
    }
}
