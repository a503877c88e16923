use std::collections::HashMap;

use macroquad::prelude::*;

use crate::entity::{EntityId, Located};

/// Uniform grid over an unbounded plane. Entities live in a flat list in insertion
/// order; `cells` maps a grid coordinate to indices into that list.
///
/// `add` only appends to the flat list. Call `refresh` before querying if the new
/// entity must be visible. Queries filter candidates by their live position, so an
/// entity that moved since the last refresh can still be missed if it left its bucket's
/// neighbourhood.
pub struct SpatialIndex<T> {
    scale: f32,
    items: Vec<T>,
    cells: HashMap<(i32, i32), Vec<usize>>,
}

impl<T: Located> SpatialIndex<T> {
    pub fn new(scale: f32) -> Self {
        Self {
            scale: scale.max(f32::EPSILON),
            items: Vec::new(),
            cells: HashMap::new(),
        }
    }

    fn cell_of(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x / self.scale).round() as i32,
            (pos.y / self.scale).round() as i32,
        )
    }

    pub fn add(&mut self, item: T) {
        self.items.push(item);
    }

    /// Remove the entity with `id` from the flat list and from whichever bucket holds it.
    pub fn remove(&mut self, id: EntityId) -> Option<T> {
        let idx = self.position_of(id)?;
        let item = self.items.remove(idx);
        for bucket in self.cells.values_mut() {
            bucket.retain(|&i| i != idx);
            for i in bucket.iter_mut() {
                if *i > idx {
                    *i -= 1;
                }
            }
        }
        Some(item)
    }

    /// Rebuild every bucket from the flat list.
    pub fn refresh(&mut self) {
        for bucket in self.cells.values_mut() {
            bucket.clear();
        }
        for idx in 0..self.items.len() {
            let cell = self.cell_of(self.items[idx].pos());
            self.cells.entry(cell).or_default().push(idx);
        }
        self.cells.retain(|_, bucket| !bucket.is_empty());
    }

    /// Indices of every bucketed entity within `radius` of `point`, unsorted.
    pub fn query_indices(&self, point: Vec2, radius: f32) -> Vec<usize> {
        let mut result = Vec::new();
        if radius < 0.0 || self.items.is_empty() {
            return result;
        }
        let radius_sq = radius * radius;
        // One extra ring covers rounding at exact half-cell boundaries.
        let reach = (radius / self.scale).floor() as i32 + 1;
        let (cx, cy) = self.cell_of(point);

        for gy in cy - reach..=cy + reach {
            for gx in cx - reach..=cx + reach {
                let Some(bucket) = self.cells.get(&(gx, gy)) else {
                    continue;
                };
                for &idx in bucket {
                    if self.items[idx].pos().distance_squared(point) <= radius_sq {
                        result.push(idx);
                    }
                }
            }
        }
        result
    }

    pub fn query(&self, point: Vec2, radius: f32) -> Vec<&T> {
        self.query_indices(point, radius)
            .into_iter()
            .map(|idx| &self.items[idx])
            .collect()
    }

    pub fn position_of(&self, id: EntityId) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    pub fn get(&self, idx: usize) -> Option<&T> {
        self.items.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut T> {
        self.items.get_mut(idx)
    }

    pub fn find(&self, id: EntityId) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn find_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.items.iter_mut().find(|item| item.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.cells.clear();
    }

    pub fn retain(&mut self, keep: impl FnMut(&T) -> bool) {
        self.items.retain(keep);
        self.refresh();
    }

    #[cfg(test)]
    fn bucket_contents(&self) -> Vec<usize> {
        let mut all: Vec<usize> = self.cells.values().flatten().copied().collect();
        all.sort_unstable();
        all
    }
}
