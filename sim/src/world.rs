//! Broad-phase spatial partitioning: a dynamic grid, queried directly by
//! every per-avatar collision check (`candidates_near`/`get_body`/
//! `get_bodies`), plus an `Island` union-find closure over bodies that
//! co-inhabit any grid cell.
//!
//! The grid alone already keeps a single query at O(cell occupancy) instead
//! of O(N) over the whole world, which matters once trail bodies number in
//! the thousands; islands are a coarser grouping of the same grid data,
//! built on demand (e.g. for the "every overlapping pair shares an Island"
//! invariant) rather than recomputed every tick on the simulation's hot
//! path.

use crate::body::{Body, BodyData};
use std::collections::{HashMap, HashSet};

type Cell = (i64, i64);

pub struct World {
    cell_size: f64,
    bodies: HashMap<u64, Body>,
    grid: HashMap<Cell, Vec<u64>>,
    next_id: u64,
    /// Union-find parent pointers, populated on demand by
    /// [`World::rebuild_islands`] — not kept current automatically as
    /// bodies move.
    islands: HashMap<u64, u64>,
}

impl World {
    pub fn new(cell_size: f64) -> Self {
        World {
            cell_size,
            bodies: HashMap::new(),
            grid: HashMap::new(),
            next_id: 1,
            islands: HashMap::new(),
        }
    }

    fn cells_for_bbox(&self, bbox: [f64; 4]) -> Vec<Cell> {
        let [min_x, min_y, max_x, max_y] = bbox;
        let cx0 = (min_x / self.cell_size).floor() as i64;
        let cy0 = (min_y / self.cell_size).floor() as i64;
        let cx1 = (max_x / self.cell_size).floor() as i64;
        let cy1 = (max_y / self.cell_size).floor() as i64;
        let mut cells = Vec::with_capacity(((cx1 - cx0 + 1) * (cy1 - cy0 + 1)) as usize);
        for cx in cx0..=cx1 {
            for cy in cy0..=cy1 {
                cells.push((cx, cy));
            }
        }
        cells
    }

    /// Inserts a new body and returns its allocated id.
    pub fn insert(&mut self, x: f64, y: f64, radius: f64, data: BodyData) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let body = Body::new(id, x, y, radius, data);
        for cell in self.cells_for_bbox(body.bbox()) {
            self.grid.entry(cell).or_default().push(id);
        }
        self.bodies.insert(id, body);
        id
    }

    pub fn remove(&mut self, id: u64) -> Option<Body> {
        let body = self.bodies.remove(&id)?;
        for cell in self.cells_for_bbox(body.bbox()) {
            if let Some(list) = self.grid.get_mut(&cell) {
                list.retain(|&existing| existing != id);
                if list.is_empty() {
                    self.grid.remove(&cell);
                }
            }
        }
        Some(body)
    }

    /// Re-indexes a dynamic body at a new position; call once per tick for
    /// anything that moves.
    pub fn reposition(&mut self, id: u64, x: f64, y: f64) -> bool {
        let Some(radius) = self.bodies.get(&id).map(|b| b.radius) else { return false };
        self.reposition_with_radius(id, x, y, radius)
    }

    /// Re-indexes a dynamic body at a new position and radius, for bodies
    /// whose size can change tick to tick (an avatar under a size bonus).
    pub fn reposition_with_radius(&mut self, id: u64, x: f64, y: f64, radius: f64) -> bool {
        let Some(mut body) = self.remove(id) else { return false };
        body.x = x;
        body.y = y;
        body.radius = radius;
        for cell in self.cells_for_bbox(body.bbox()) {
            self.grid.entry(cell).or_default().push(id);
        }
        self.bodies.insert(id, body);
        true
    }

    pub fn body(&self, id: u64) -> Option<&Body> {
        self.bodies.get(&id)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Ids of bodies sharing any grid cell with the given circle. Does not
    /// filter by actual circle overlap.
    pub fn candidates_near(&self, x: f64, y: f64, radius: f64) -> Vec<u64> {
        let bbox = [x - radius, y - radius, x + radius, y + radius];
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for cell in self.cells_for_bbox(bbox) {
            if let Some(list) = self.grid.get(&cell) {
                for &id in list {
                    if seen.insert(id) {
                        result.push(id);
                    }
                }
            }
        }
        result
    }

    /// First body actually overlapping the given circle, excluding `exclude`.
    pub fn get_body(&self, x: f64, y: f64, radius: f64, exclude: &HashSet<u64>) -> Option<&Body> {
        let probe = Body::new(0, x, y, radius, BodyData::Bonus);
        self.candidates_near(x, y, radius)
            .into_iter()
            .filter(|id| !exclude.contains(id))
            .filter_map(|id| self.bodies.get(&id))
            .find(|candidate| candidate.overlaps(&probe))
    }

    /// All bodies actually overlapping the given circle, excluding `exclude`.
    pub fn get_bodies(&self, x: f64, y: f64, radius: f64, exclude: &HashSet<u64>) -> Vec<&Body> {
        let probe = Body::new(0, x, y, radius, BodyData::Bonus);
        self.candidates_near(x, y, radius)
            .into_iter()
            .filter(|id| !exclude.contains(id))
            .filter_map(|id| self.bodies.get(&id))
            .filter(|candidate| candidate.overlaps(&probe))
            .collect()
    }

    // --- Island union-find -------------------------------------------------

    fn find(parents: &mut HashMap<u64, u64>, id: u64) -> u64 {
        let parent = *parents.entry(id).or_insert(id);
        if parent == id {
            id
        } else {
            let root = Self::find(parents, parent);
            parents.insert(id, root);
            root
        }
    }

    fn union(parents: &mut HashMap<u64, u64>, a: u64, b: u64) {
        let ra = Self::find(parents, a);
        let rb = Self::find(parents, b);
        if ra != rb {
            parents.insert(ra, rb);
        }
    }

    /// Recomputes the Island partition from the current grid contents.
    /// Bodies sharing a grid cell are unioned into the same island.
    pub fn rebuild_islands(&mut self) {
        let mut parents: HashMap<u64, u64> = self.bodies.keys().map(|&id| (id, id)).collect();
        for list in self.grid.values() {
            if list.len() < 2 {
                continue;
            }
            let first = list[0];
            for &other in &list[1..] {
                Self::union(&mut parents, first, other);
            }
        }
        // Path-compress every entry so island_of is O(1) after rebuild.
        let ids: Vec<u64> = parents.keys().copied().collect();
        for id in ids {
            Self::find(&mut parents, id);
        }
        self.islands = parents;
    }

    /// The island root id for a body, after [`World::rebuild_islands`] has
    /// been called this tick.
    pub fn island_of(&self, id: u64) -> Option<u64> {
        self.islands.get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bonus() -> BodyData {
        BodyData::Bonus
    }

    #[test]
    fn overlapping_bodies_end_up_in_same_island() {
        let mut world = World::new(5.0);
        let a = world.insert(0.0, 0.0, 1.0, bonus());
        let b = world.insert(0.5, 0.0, 1.0, bonus());
        let c = world.insert(90.0, 90.0, 1.0, bonus());
        world.rebuild_islands();
        assert_eq!(world.island_of(a), world.island_of(b));
        assert_ne!(world.island_of(a), world.island_of(c));
    }

    #[test]
    fn candidates_near_returns_same_cell_occupants() {
        let mut world = World::new(5.0);
        let a = world.insert(1.0, 1.0, 0.5, bonus());
        let candidates = world.candidates_near(1.1, 1.1, 0.5);
        assert!(candidates.contains(&a));
    }

    #[test]
    fn reposition_moves_body_out_of_old_cells() {
        let mut world = World::new(5.0);
        let a = world.insert(1.0, 1.0, 0.5, bonus());
        world.reposition(a, 50.0, 50.0);
        let candidates = world.candidates_near(1.0, 1.0, 0.5);
        assert!(!candidates.contains(&a));
        let candidates = world.candidates_near(50.0, 50.0, 0.5);
        assert!(candidates.contains(&a));
    }

    #[test]
    fn get_body_excludes_requested_ids() {
        let mut world = World::new(5.0);
        let a = world.insert(0.0, 0.0, 1.0, bonus());
        let mut exclude = HashSet::new();
        exclude.insert(a);
        assert!(world.get_body(0.0, 0.0, 1.0, &exclude).is_none());
        assert!(world.get_body(0.0, 0.0, 1.0, &HashSet::new()).is_some());
    }
}
