use macroquad::prelude::*;

use crate::entity::{EntityId, Located};

#[derive(Clone, Debug)]
pub struct Food {
    pub id: EntityId,
    pub pos: Vec2,
    pub heading: f32,
    /// Grown on a plant or scattered, as opposed to left behind by a dead creature.
    pub is_plant_origin: bool,
    pub energy: f32,
}

impl Food {
    pub fn new(id: EntityId, pos: Vec2, heading: f32, energy: f32, is_plant_origin: bool) -> Self {
        Self {
            id,
            pos,
            heading,
            is_plant_origin,
            energy,
        }
    }

    /// Shrinks continuously as the food is eaten.
    pub fn radius(&self) -> f32 {
        self.energy.max(0.0).cbrt()
    }
}

impl Located for Food {
    fn id(&self) -> EntityId {
        self.id
    }

    fn pos(&self) -> Vec2 {
        self.pos
    }
}

/// Static vegetation. Slows creatures that overlap it and periodically grows food.
#[derive(Clone, Debug)]
pub struct Plant {
    pub id: EntityId,
    pub pos: Vec2,
    pub radius: f32,
    pub heading: f32,
    /// In [0, 1]; scales the energy of food grown here.
    pub fertility: f32,
}

impl Located for Plant {
    fn id(&self) -> EntityId {
        self.id
    }

    fn pos(&self) -> Vec2 {
        self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn food_radius_is_cube_root_of_energy() {
        let mut food = Food::new(EntityId(0), Vec2::ZERO, 0.0, 8.0, true);
        assert!((food.radius() - 2.0).abs() < 1e-5);

        food.energy = -1.0;
        assert_eq!(food.radius(), 0.0);
    }
}
