//! Uniform-cell spatial index over entity positions (spec §4.2).
//!
//! Grounded in the teacher's chunk-keyed caching pattern
//! (`HeightmapTerrain`'s `(cx, cy, lod) -> Arc<HeightChunk>` cache in
//! `terrain.rs`), generalized from a 2D terrain chunk cache to a 3D
//! GUID-bucketed grid.

use std::collections::{HashMap, HashSet};

use crate::error::SpatialError;
use crate::types::Vec3;

pub type CellKey = (i32, i32, i32);

pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<CellKey, HashSet<u64>>,
    positions: HashMap<u64, Vec3>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
            positions: HashMap::new(),
        }
    }

    pub fn cell_key(&self, pos: &Vec3) -> CellKey {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
            (pos.z / self.cell_size).floor() as i32,
        )
    }

    pub fn insert(&mut self, guid: u64, position: Vec3) -> Result<(), SpatialError> {
        if self.positions.contains_key(&guid) {
            return Err(SpatialError::AlreadyPresent(guid));
        }
        let key = self.cell_key(&position);
        self.cells.entry(key).or_default().insert(guid);
        self.positions.insert(guid, position);
        Ok(())
    }

    pub fn update(&mut self, guid: u64, new_position: Vec3) -> Result<(), SpatialError> {
        let old_position = self
            .positions
            .get(&guid)
            .copied()
            .ok_or(SpatialError::NotPresent(guid))?;
        let old_key = self.cell_key(&old_position);
        let new_key = self.cell_key(&new_position);
        if old_key != new_key {
            if let Some(set) = self.cells.get_mut(&old_key) {
                set.remove(&guid);
                if set.is_empty() {
                    self.cells.remove(&old_key);
                }
            }
            self.cells.entry(new_key).or_default().insert(guid);
        }
        self.positions.insert(guid, new_position);
        Ok(())
    }

    pub fn remove(&mut self, guid: u64) -> Result<Vec3, SpatialError> {
        let position = self
            .positions
            .remove(&guid)
            .ok_or(SpatialError::NotPresent(guid))?;
        let key = self.cell_key(&position);
        if let Some(set) = self.cells.get_mut(&key) {
            set.remove(&guid);
            if set.is_empty() {
                self.cells.remove(&key);
            }
        }
        Ok(position)
    }

    pub fn position_of(&self, guid: u64) -> Option<Vec3> {
        self.positions.get(&guid).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Every GUID within `radius` of `center`. May also return GUIDs up to
    /// `radius + sqrt(3) * cell_size` away (candidates from neighboring
    /// cells that fall outside the exact sphere are filtered out, but the
    /// cell-box sweep itself is conservative by that much, per spec §4.2).
    pub fn entities_in_range(&self, center: &Vec3, radius: f32) -> HashSet<u64> {
        let mut result = HashSet::new();
        let cell_radius = (radius / self.cell_size).ceil() as i32;
        let center_key = self.cell_key(center);
        let radius_sq = radius * radius;

        for dx in -cell_radius..=cell_radius {
            for dy in -cell_radius..=cell_radius {
                for dz in -cell_radius..=cell_radius {
                    let key = (
                        center_key.0 + dx,
                        center_key.1 + dy,
                        center_key.2 + dz,
                    );
                    let Some(set) = self.cells.get(&key) else {
                        continue;
                    };
                    for &guid in set {
                        if let Some(pos) = self.positions.get(&guid) {
                            if pos.distance_squared(center) <= radius_sq {
                                result.insert(guid);
                            }
                        }
                    }
                }
            }
        }
        result
    }

    /// Verifies the grid invariant: every GUID's recorded cell equals the
    /// cell derived from its recorded position (spec §8 invariant 2).
    #[cfg(test)]
    fn check_invariant(&self) -> bool {
        for (&guid, pos) in &self.positions {
            let expected_key = self.cell_key(pos);
            match self.cells.get(&expected_key) {
                Some(set) if set.contains(&guid) => {}
                _ => return false,
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_update_remove_returns_grid_to_pre_state() {
        let mut grid = SpatialGrid::new(50.0);
        assert!(grid.is_empty());
        grid.insert(1, Vec3::new(10.0, 10.0, 0.0)).unwrap();
        grid.update(1, Vec3::new(200.0, 5.0, 0.0)).unwrap();
        grid.remove(1).unwrap();
        assert!(grid.is_empty());
        assert!(grid.cells.is_empty());
    }

    #[test]
    fn range_query_radius_zero_returns_only_exact_center() {
        let mut grid = SpatialGrid::new(50.0);
        grid.insert(1, Vec3::new(0.0, 0.0, 0.0)).unwrap();
        grid.insert(2, Vec3::new(0.001, 0.0, 0.0)).unwrap();
        let hits = grid.entities_in_range(&Vec3::zero(), 0.0);
        assert_eq!(hits, [1].into_iter().collect());
    }

    #[test]
    fn range_query_finds_everything_within_radius() {
        let mut grid = SpatialGrid::new(50.0);
        grid.insert(1, Vec3::new(10.0, 0.0, 0.0)).unwrap();
        grid.insert(2, Vec3::new(90.0, 0.0, 0.0)).unwrap();
        grid.insert(3, Vec3::new(1000.0, 0.0, 0.0)).unwrap();
        let hits = grid.entities_in_range(&Vec3::zero(), 100.0);
        assert!(hits.contains(&1));
        assert!(hits.contains(&2));
        assert!(!hits.contains(&3));
    }

    #[test]
    fn invariant_holds_after_many_updates() {
        let mut grid = SpatialGrid::new(10.0);
        for i in 0..50u64 {
            grid.insert(i, Vec3::new(i as f32, 0.0, 0.0)).unwrap();
        }
        for i in 0..50u64 {
            grid.update(i, Vec3::new(0.0, i as f32 * 3.0, 0.0)).unwrap();
        }
        assert!(grid.check_invariant());
    }

    #[test]
    fn moving_within_same_cell_does_not_touch_other_cells() {
        let mut grid = SpatialGrid::new(50.0);
        grid.insert(1, Vec3::new(1.0, 1.0, 0.0)).unwrap();
        let key_before = grid.cell_key(&Vec3::new(1.0, 1.0, 0.0));
        grid.update(1, Vec3::new(2.0, 2.0, 0.0)).unwrap();
        let key_after = grid.cell_key(&Vec3::new(2.0, 2.0, 0.0));
        assert_eq!(key_before, key_after);
        assert_eq!(grid.cells.len(), 1);
    }

    #[test]
    fn double_insert_is_rejected() {
        let mut grid = SpatialGrid::new(50.0);
        grid.insert(1, Vec3::zero()).unwrap();
        assert!(grid.insert(1, Vec3::zero()).is_err());
    }
}
