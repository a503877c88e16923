use macroquad::prelude::*;
use serde::{Deserialize, Serialize};

/// Stable handle assigned when an entity is created. Never reused within a run,
/// so equality does not depend on where the entity currently is.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct EntityId(pub u64);

/// Monotonic source of `EntityId`s shared by creatures, food and plants.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IdCounter {
    next: u64,
}

impl IdCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }

    /// Advance past `id` so freshly allocated ids never collide with it.
    #[cfg(test)]
    pub fn observe(&mut self, id: EntityId) {
        self.next = self.next.max(id.0 + 1);
    }
}

/// Anything a `SpatialIndex` can hold: a stable identity and a current position.
pub trait Located {
    fn id(&self) -> EntityId;
    fn pos(&self) -> Vec2;
}
