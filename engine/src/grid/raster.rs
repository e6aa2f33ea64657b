//! Coarse lat/lon lookup table over a lattice.
//!
//! Each bucket stores the cell found by the slow search at the bucket's
//! centre, so a lookup is one rounding and one array read. A table is
//! built once per lattice and shared by every plate using it.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use tecto_geo::Spherical;

use super::CellId;

/// Buckets per cell spacing along each axis.
pub const OVERSAMPLE: f64 = 5.0;

/// Regular lat/lon table of precomputed cell ids.
#[derive(Clone, Debug)]
pub struct Raster {
    num_lat: usize,
    num_lon: usize,
    cells: Vec<CellId>,
}

impl Raster {
    /// Build a table for cells `spacing` radians apart, filling each bucket with `search`.
    pub fn build(spacing: f64, mut search: impl FnMut(Spherical) -> CellId) -> Self {
        let num_lat = ((PI / spacing * OVERSAMPLE) as usize).max(1);
        let num_lon = ((TAU / spacing * OVERSAMPLE) as usize).max(1);
        let mut cells = Vec::with_capacity(num_lat * num_lon);
        for i in 0..num_lat {
            for j in 0..num_lon {
                cells.push(search(Self::bucket_center(num_lat, num_lon, i, j)));
            }
        }
        Self { num_lat, num_lon, cells }
    }

    pub(crate) fn empty() -> Self {
        Self { num_lat: 0, num_lon: 0, cells: Vec::new() }
    }

    fn bucket_center(num_lat: usize, num_lon: usize, i: usize, j: usize) -> Spherical {
        Spherical {
            lat: i as f64 / num_lat as f64 * PI - FRAC_PI_2,
            lon: j as f64 / num_lon as f64 * TAU,
        }
    }

    /// Table dimensions `(lat, lon)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.num_lat, self.num_lon)
    }

    /// Cell stored for the bucket nearest `s`. Latitude clamps at the poles,
    /// longitude wraps.
    pub fn lookup(&self, s: Spherical) -> CellId {
        if self.cells.is_empty() {
            return 0;
        }
        let i = ((s.lat + FRAC_PI_2) / PI * self.num_lat as f64).round();
        let i = (i.max(0.0) as usize).min(self.num_lat - 1);
        let j = (s.lon.rem_euclid(TAU) / TAU * self.num_lon as f64).round() as usize % self.num_lon;
        self.cells.get(i * self.num_lon + j).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_wraps_longitude() {
        let r = Raster::build(TAU / 8.0, |s| (s.lon * 1000.0) as CellId);
        let (nlat, nlon) = r.shape();
        assert_eq!(nlat, 20);
        assert_eq!(nlon, 40);
        let near_full_turn = Spherical { lat: 0.0, lon: TAU - 1e-6 };
        assert_eq!(r.lookup(near_full_turn), r.lookup(Spherical { lat: 0.0, lon: 0.0 }));
    }

    #[test]
    fn lookup_clamps_latitude() {
        let r = Raster::build(TAU / 8.0, |s| ((s.lat + FRAC_PI_2) * 1000.0) as CellId);
        let top = r.lookup(Spherical { lat: FRAC_PI_2, lon: 1.0 });
        let below = r.lookup(Spherical { lat: FRAC_PI_2 - 0.05, lon: 1.0 });
        assert!(top >= below);
        assert_eq!(Raster::empty().lookup(Spherical::default()), 0);
    }
}
