//! Point lattices on the unit sphere and the Fibonacci-spiral lattice.
//!
//! A lattice fixes `len()` template points and answers three queries:
//! position of a cell, an approximate cell for a position, and a short
//! neighbour list. Lookups are allowed to land one cell off the true
//! nearest point; [`Lattice::nearest`] walks the neighbour graph to fix that
//! when a caller needs the exact answer.
//!
//! The spiral lattice places point `i` (for `i` in `-n..=n`) at
//! `z = i · 2/(2n+1)` and longitude `i · 2π/φ`. Neighbours sit at spiral
//! offsets `±F(k)` for three consecutive Fibonacci numbers picked by the
//! latitude "zone", which is also what drives the base-φ longitude search.

use std::f64::consts::{PI, TAU};
use std::fmt::Debug;

use smallvec::SmallVec;
use tecto_geo::{chord_distance, to_cartesian, to_spherical, Spherical, Vec3, PHI};

use super::raster::Raster;
use super::CellId;

/// Neighbour list; up to six entries, duplicates possible.
pub type Neighbors = SmallVec<[CellId; 6]>;

const SQRT5: f64 = 2.236_067_977_499_79;
/// Smallest zone used for lookups and neighbours; keeps offsets at least `F(1)`.
const MIN_ZONE: i32 = 2;
/// Upper bound on hill-climbing steps in [`Lattice::nearest`].
const MAX_REFINE_STEPS: usize = 32;

/// Errors building a lattice.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GridError {
    /// Spacing must be finite and positive.
    #[error("invalid spacing {0}")]
    InvalidSpacing(f64),
    /// The spacing is too coarse to place any points besides the centre one.
    #[error("spacing {spacing} yields no grid points")]
    Degenerate {
        /// Requested spacing in radians.
        spacing: f64,
    },
    /// The spacing is so fine that cell ids would overflow.
    #[error("spacing {spacing} yields {points} points")]
    TooManyPoints {
        /// Requested spacing in radians.
        spacing: f64,
        /// Point count that would have been needed.
        points: f64,
    },
}

/// Fixed set of template points on the unit sphere.
pub trait Lattice: Debug + Send + Sync {
    /// Number of cells; ids run `0..len()`.
    fn len(&self) -> usize;

    /// Average angular distance between neighbouring points (radians).
    fn spacing(&self) -> f64;

    /// Unit vector of `cell`. Out-of-range ids are clamped.
    fn point(&self, cell: CellId) -> Vec3;

    /// Cell at or next to the one nearest `p` (lattice-local coordinates).
    fn index_of(&self, p: Vec3) -> CellId;

    /// Neighbouring cells of `cell`, unfiltered.
    fn neighbors(&self, cell: CellId) -> Neighbors;

    /// Cells that list `cell` among their [`Lattice::neighbors`].
    ///
    /// Neighbour lists are not symmetric, so this can differ from
    /// `neighbors(cell)`. The default scans every cell.
    fn reverse_neighbors(&self, cell: CellId) -> Neighbors {
        (0..self.len() as CellId).filter(|&c| c != cell && self.neighbors(c).contains(&cell)).collect()
    }

    /// Exact nearest cell to `p`, found by walking neighbours from [`Lattice::index_of`].
    fn nearest(&self, p: Vec3) -> CellId {
        refine(self, self.index_of(p), p)
    }
}

// Steps over the two-ring: near the poles the clamped one-ring can trap the walk.
fn refine<L: Lattice + ?Sized>(lattice: &L, mut cell: CellId, p: Vec3) -> CellId {
    let mut best = chord_distance(lattice.point(cell), p);
    for _ in 0..MAX_REFINE_STEPS {
        let mut moved = false;
        for n in lattice.neighbors(cell) {
            for m in std::iter::once(n).chain(lattice.neighbors(n)) {
                let d = chord_distance(lattice.point(m), p);
                if d < best {
                    best = d;
                    cell = m;
                    moved = true;
                }
            }
        }
        if !moved {
            break;
        }
    }
    cell
}

/// `F(n)` from Binet's formula, rounded.
pub fn fib(n: i32) -> i64 {
    (PHI.powi(n) / SQRT5).round() as i64
}

/// Golden-spiral lattice with a shared coarse lookup table.
#[derive(Debug, Clone)]
pub struct FibLattice {
    spacing: f64,
    /// Spiral indices run `-point_num..=point_num`.
    point_num: i64,
    z_increment: f64,
    points: Vec<Vec3>,
    zones: Vec<i32>,
    reverse: Vec<Neighbors>,
    raster: Raster,
}

impl FibLattice {
    /// Build a lattice whose points are about `spacing` radians apart.
    ///
    /// The point count treats the sphere as tiled by equilateral triangles
    /// with edge `spacing`.
    pub fn new(spacing: f64) -> Result<Self, GridError> {
        if !spacing.is_finite() || spacing <= 0.0 {
            return Err(GridError::InvalidSpacing(spacing));
        }
        let face_area = 3f64.sqrt() / 4.0 * spacing * spacing;
        let total = 4.0 * PI / face_area;
        let point_num = ((total - 1.0) / 2.0).floor();
        if point_num < 1.0 {
            return Err(GridError::Degenerate { spacing });
        }
        if 2.0 * point_num + 1.0 > f64::from(u32::MAX) {
            return Err(GridError::TooManyPoints { spacing, points: 2.0 * point_num + 1.0 });
        }
        let point_num = point_num as i64;
        let count = (2 * point_num + 1) as usize;
        let mut lattice = Self {
            spacing,
            point_num,
            z_increment: 2.0 / count as f64,
            points: Vec::with_capacity(count),
            zones: Vec::with_capacity(count),
            reverse: vec![Neighbors::new(); count],
            raster: Raster::empty(),
        };
        for cell in 0..count {
            let s = lattice.spiral_spherical(cell as i64 - point_num);
            lattice.points.push(to_cartesian(s));
            lattice.zones.push(lattice.zone(s.lat));
        }
        for cell in 0..count as CellId {
            for n in lattice.neighbors(cell) {
                let back = &mut lattice.reverse[n as usize];
                if n != cell && !back.contains(&cell) {
                    back.push(cell);
                }
            }
        }
        let raster = Raster::build(spacing, |s| lattice.spiral_nearest(s));
        lattice.raster = raster;
        Ok(lattice)
    }

    /// Largest spiral index; the lattice holds `2 · point_num + 1` points.
    pub fn point_num(&self) -> i64 {
        self.point_num
    }

    /// The shared lookup table.
    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    fn spiral_z(&self, index: i64) -> f64 {
        (index as f64 * self.z_increment).clamp(-1.0, 1.0)
    }

    fn spiral_lon(index: i64) -> f64 {
        (index as f64 * TAU / PHI).rem_euclid(TAU)
    }

    fn spiral_spherical(&self, index: i64) -> Spherical {
        let index = index.clamp(-self.point_num, self.point_num);
        Spherical { lat: self.spiral_z(index).asin(), lon: Self::spiral_lon(index) }
    }

    /// Latitude zone: `round(log_φ(N·π·√5·cos²φ) / 2)`, never below 2.
    pub fn zone(&self, lat: f64) -> i32 {
        let n = (2 * self.point_num + 1) as f64;
        let a = n * PI * SQRT5 * lat.cos().powi(2);
        if a <= 1.0 {
            return MIN_ZONE;
        }
        ((a.ln() / PHI.ln() / 2.0).round() as i32).max(MIN_ZONE)
    }

    fn clamp_cell(&self, index: i64) -> CellId {
        (index.clamp(-self.point_num, self.point_num) + self.point_num) as CellId
    }

    /// Base-φ longitude search from the latitude-only guess, clamped to the
    /// valid range. Exact on lattice points; elsewhere it can land a few
    /// cells away from the nearest one.
    pub fn spiral_search(&self, s: Spherical) -> CellId {
        let mut index = (s.lat.sin() / self.z_increment).round() as i64;
        let zone = self.zone(s.lat);
        let mut remainder = (Self::spiral_lon(index) - s.lon).rem_euclid(TAU) / TAU;
        for k in 1..=zone {
            let scaled = remainder * PHI;
            remainder = scaled % 1.0;
            if scaled.abs() > 1.0 {
                index += if k % 2 == 0 { fib(k) } else { -fib(k) };
            }
        }
        self.clamp_cell(index)
    }

    /// [`FibLattice::spiral_search`] settled onto the nearest point by a
    /// neighbour walk. Fills the raster.
    pub fn spiral_nearest(&self, s: Spherical) -> CellId {
        refine(self, self.spiral_search(s), to_cartesian(s))
    }
}

impl Lattice for FibLattice {
    fn len(&self) -> usize {
        self.points.len()
    }

    fn spacing(&self) -> f64 {
        self.spacing
    }

    fn point(&self, cell: CellId) -> Vec3 {
        let i = (cell as usize).min(self.points.len() - 1);
        self.points[i]
    }

    fn index_of(&self, p: Vec3) -> CellId {
        self.raster.lookup(to_spherical(p))
    }

    fn neighbors(&self, cell: CellId) -> Neighbors {
        let last = (self.points.len() - 1) as i64;
        let c = i64::from(cell).min(last);
        let zone = self.zones[c as usize];
        let mut out = Neighbors::new();
        for sign in [-1i64, 1] {
            for k in [zone - 1, zone, zone + 1] {
                out.push((c + sign * fib(k)).clamp(0, last) as CellId);
            }
        }
        out
    }

    fn reverse_neighbors(&self, cell: CellId) -> Neighbors {
        self.reverse.get(cell as usize).cloned().unwrap_or_default()
    }
}
