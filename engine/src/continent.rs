//! Continental shields placed at random on the sphere.
//! Deterministic given seed; every cell within a shield's radius starts as continent.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tecto_geo::{GeoCoordinate, Vec3};

use crate::util::random_point;

/// Seed namespace for shield placement.
const NS: u64 = 0x636f_6e74_696e_65;

/// Shield centres on the sphere.
#[derive(Clone, Debug, Default)]
pub struct Shields {
    centers: Vec<GeoCoordinate>,
    /// Angular radius of each shield (radians).
    radius_rad: f64,
}

impl Shields {
    /// `count` shields of angular radius `radius_rad`, placed from `seed`.
    pub fn random(seed: u64, count: u32, radius_rad: f64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed ^ NS);
        let centers = (0..count).map(|_| GeoCoordinate::from_spherical(random_point(&mut rng))).collect();
        Self { centers, radius_rad }
    }

    /// Shields at the given centres.
    pub fn at(centers: &[Vec3], radius_rad: f64) -> Self {
        Self { centers: centers.iter().map(|&c| GeoCoordinate::from_cartesian(c)).collect(), radius_rad }
    }

    /// Shield centres.
    pub fn centers(&self) -> &[GeoCoordinate] {
        &self.centers
    }

    /// Whether `p` lies strictly inside any shield.
    pub fn contains(&self, p: Vec3) -> bool {
        let p = GeoCoordinate::from_cartesian(p);
        self.centers.iter().any(|c| c.arc_distance(&p) < self.radius_rad)
    }
}
