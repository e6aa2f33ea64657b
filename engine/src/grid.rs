//! Per-plate spatial index over a shared sphere lattice.
//!
//! A [`SphereGrid`] is a fixed-capacity slot array indexed by lattice cell,
//! plus a rotation frame. Cells keep their template positions; world
//! positions are the template rotated by the frame, and lookups un-rotate
//! the query point first. Rotating a plate therefore never re-indexes.

pub mod lattice;
pub mod raster;

use std::sync::Arc;

use tecto_geo::{chord_distance, Rotation, Vec3};

pub use lattice::{fib, FibLattice, GridError, Lattice, Neighbors};

/// Dense cell id in `0..lattice.len()`.
pub type CellId = u32;

/// How [`SphereGrid::collision`] treats an empty target cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollisionMode {
    /// Only the cell the point maps to.
    Exact,
    /// Fall back to the nearest occupied neighbour of that cell.
    Nearest,
}

/// Slot array over a lattice, in a rotating frame.
#[derive(Debug, Clone)]
pub struct SphereGrid<T> {
    lattice: Arc<dyn Lattice>,
    frame: Rotation,
    slots: Vec<Option<T>>,
    occupied: usize,
}

impl<T> SphereGrid<T> {
    /// Empty grid with an identity frame.
    pub fn new(lattice: Arc<dyn Lattice>) -> Self {
        let mut slots = Vec::with_capacity(lattice.len());
        slots.resize_with(lattice.len(), || None);
        Self { lattice, frame: Rotation::IDENTITY, slots, occupied: 0 }
    }

    /// The shared lattice.
    pub fn lattice(&self) -> &Arc<dyn Lattice> {
        &self.lattice
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.occupied
    }

    /// True when no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Occupant of `cell`, if any.
    pub fn get(&self, cell: CellId) -> Option<&T> {
        self.slots.get(cell as usize).and_then(Option::as_ref)
    }

    /// Mutable occupant of `cell`, if any.
    pub fn get_mut(&mut self, cell: CellId) -> Option<&mut T> {
        self.slots.get_mut(cell as usize).and_then(Option::as_mut)
    }

    /// Whether `cell` holds a value.
    pub fn is_occupied(&self, cell: CellId) -> bool {
        self.get(cell).is_some()
    }

    /// Put `value` in `cell`, returning the previous occupant.
    /// Out-of-range cells hand `value` straight back.
    pub fn insert(&mut self, cell: CellId, value: T) -> Option<T> {
        let Some(slot) = self.slots.get_mut(cell as usize) else {
            return Some(value);
        };
        let prev = slot.replace(value);
        if prev.is_none() {
            self.occupied += 1;
        }
        prev
    }

    /// Empty `cell`, returning what was there.
    pub fn remove(&mut self, cell: CellId) -> Option<T> {
        let prev = self.slots.get_mut(cell as usize).and_then(Option::take);
        if prev.is_some() {
            self.occupied -= 1;
        }
        prev
    }

    /// Occupied cells in id order.
    pub fn iter(&self) -> impl Iterator<Item = (CellId, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, s)| s.as_ref().map(|v| (i as CellId, v)))
    }

    /// Mutable occupied cells in id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (CellId, &mut T)> + '_ {
        self.slots.iter_mut().enumerate().filter_map(|(i, s)| s.as_mut().map(|v| (i as CellId, v)))
    }

    /// Ids of occupied cells.
    pub fn cells(&self) -> impl Iterator<Item = CellId> + '_ {
        self.iter().map(|(c, _)| c)
    }

    /// Current frame: world = frame · template.
    pub fn frame(&self) -> &Rotation {
        &self.frame
    }

    /// Rotate the whole grid by `r` in world space.
    pub fn rotate(&mut self, r: &Rotation) {
        self.frame = self.frame.then(r);
    }

    /// World position of `cell`, occupied or not.
    pub fn position(&self, cell: CellId) -> Vec3 {
        self.frame.apply(self.lattice.point(cell))
    }

    /// Approximate cell under world point `p` (may be one cell off).
    pub fn index_of(&self, p: Vec3) -> CellId {
        self.lattice.index_of(self.frame.apply_inverse(p))
    }

    /// Exact nearest cell under world point `p`.
    pub fn nearest_cell(&self, p: Vec3) -> CellId {
        self.lattice.nearest(self.frame.apply_inverse(p))
    }

    /// Lattice neighbours of `cell`; may contain duplicates and empty cells.
    pub fn neighbor_ids(&self, cell: CellId) -> Neighbors {
        self.lattice.neighbors(cell)
    }

    /// Cells whose neighbour lists contain `cell`.
    pub fn reverse_neighbor_ids(&self, cell: CellId) -> Neighbors {
        self.lattice.reverse_neighbors(cell)
    }

    /// Occupied neighbours of `cell`.
    pub fn neighbors(&self, cell: CellId) -> impl Iterator<Item = (CellId, &T)> + '_ {
        self.neighbor_ids(cell).into_iter().filter_map(move |n| self.get(n).map(|v| (n, v)))
    }

    /// Candidate closest to `p` by straight-line distance; first one wins ties.
    pub fn nearest_of(&self, p: Vec3, candidates: impl IntoIterator<Item = CellId>) -> Option<CellId> {
        let mut best: Option<(CellId, f64)> = None;
        for c in candidates {
            let d = chord_distance(self.position(c), p);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((c, d));
            }
        }
        best.map(|(c, _)| c)
    }

    /// Occupied candidate closest to `p`, or `None` if all are empty.
    pub fn nearest_occupied(
        &self,
        p: Vec3,
        candidates: impl IntoIterator<Item = CellId>,
    ) -> Option<CellId> {
        self.nearest_of(p, candidates.into_iter().filter(|&c| self.is_occupied(c)))
    }

    /// Occupied cell that world point `p` overlaps, per `mode`.
    pub fn collision(&self, p: Vec3, mode: CollisionMode) -> Option<CellId> {
        let cell = self.index_of(p);
        if self.is_occupied(cell) {
            return Some(cell);
        }
        match mode {
            CollisionMode::Exact => None,
            CollisionMode::Nearest => self.nearest_occupied(p, self.neighbor_ids(cell)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, TAU};

    fn grid() -> SphereGrid<u8> {
        SphereGrid::new(Arc::new(FibLattice::new(TAU / 24.0).unwrap()))
    }

    #[test]
    fn insert_remove_track_occupancy() {
        let mut g = grid();
        assert!(g.is_empty());
        assert_eq!(g.insert(3, 1), None);
        assert_eq!(g.insert(3, 2), Some(1));
        assert_eq!(g.len(), 1);
        assert_eq!(g.remove(3), Some(2));
        assert_eq!(g.remove(3), None);
        assert!(g.is_empty());
        let cap = g.capacity() as CellId;
        assert_eq!(g.insert(cap, 9), Some(9));
        assert!(g.is_empty());
    }

    #[test]
    fn frame_rotation_moves_positions_not_ids() {
        let mut g = grid();
        let cell = 100;
        let before = g.position(cell);
        g.rotate(&Rotation::about_axis([0.0, 1.0, 0.0], FRAC_PI_2));
        let after = g.position(cell);
        assert!(chord_distance(before, after) > 0.1);
        assert_eq!(g.nearest_cell(after), cell);
    }

    #[test]
    fn collision_modes() {
        let mut g = grid();
        let cell = 200;
        let n = g.neighbor_ids(cell)[1];
        g.insert(n, 7);
        let p = g.position(cell);
        let exact = g.collision(p, CollisionMode::Exact);
        let near = g.collision(p, CollisionMode::Nearest);
        if g.index_of(p) == n {
            assert_eq!(exact, Some(n));
        } else {
            assert_eq!(exact, None);
        }
        assert!(near.is_none() || near == Some(n));
        assert_eq!(g.nearest_occupied(p, [cell, n]), Some(n));
    }
}
