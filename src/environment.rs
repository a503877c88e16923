use ::rand::Rng;
use macroquad::prelude::*;
use noise::{Fbm, NoiseFn, Perlin};

use crate::config;
use crate::creature::Creature;
use crate::entity::IdCounter;
use crate::food::{Food, Plant};
use crate::params::MapParams;
use crate::spatial_hash::SpatialIndex;

/// Square wall grid covering world coordinates `[-radius, radius]` on both axes.
/// Anything outside the grid counts as wall.
#[derive(Clone, Debug)]
pub struct Terrain {
    radius: usize,
    walls: Vec<bool>,
}

impl Terrain {
    /// Open core, noisy cave band, solid outer ring.
    pub fn generate(radius: usize, seed: u32) -> Self {
        let side = radius * 2;
        let r = radius as f32;
        let fbm: Fbm<Perlin> = Fbm::new(seed);
        let mut walls = Vec::with_capacity(side * side);

        for j in 0..side {
            for i in 0..side {
                let d = Self::cell_center_for(radius, i as i32, j as i32).length();
                let noise = || {
                    fbm.get([
                        i as f64 / config::TERRAIN_NOISE_SCALE,
                        j as f64 / config::TERRAIN_NOISE_SCALE,
                    ])
                };
                let wall = if d < 0.25 * r {
                    false
                } else if d < 0.5 * r {
                    noise() > 0.3
                } else if d < 0.75 * r {
                    noise() > 0.1
                } else if d < r - config::SOLID_RING_WIDTH {
                    noise() > 0.0
                } else {
                    true
                };
                walls.push(wall);
            }
        }

        Self { radius, walls }
    }

    /// Rebuild a grid from stored cells. None when the cell count does not fit the radius.
    pub fn from_walls(radius: usize, walls: Vec<bool>) -> Option<Self> {
        (walls.len() == radius * 2 * radius * 2).then_some(Self { radius, walls })
    }

    pub fn walls(&self) -> &[bool] {
        &self.walls
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn side(&self) -> usize {
        self.radius * 2
    }

    fn cell_center_for(radius: usize, i: i32, j: i32) -> Vec2 {
        let r = radius as i32;
        vec2((i - r + 1) as f32, (j - r + 1) as f32)
    }

    /// World position at the centre of grid cell `(i, j)`.
    pub fn cell_center(&self, i: i32, j: i32) -> Vec2 {
        Self::cell_center_for(self.radius, i, j)
    }

    /// Grid cell holding `p`. May lie outside the grid.
    pub fn cell_of(&self, p: Vec2) -> (i32, i32) {
        let r = self.radius as i32;
        (
            (p.x - 0.5).floor() as i32 + r,
            (p.y - 0.5).floor() as i32 + r,
        )
    }

    pub fn is_wall_cell(&self, i: i32, j: i32) -> bool {
        let side = self.side() as i32;
        if i < 0 || j < 0 || i >= side || j >= side {
            return true;
        }
        self.walls[j as usize * self.side() + i as usize]
    }

    /// Exact lookup for physics and sensors; `smooth` ORs the 3x3 neighbourhood.
    pub fn sample_wall_at(&self, p: Vec2, smooth: bool) -> bool {
        let (i, j) = self.cell_of(p);
        if !smooth {
            return self.is_wall_cell(i, j);
        }
        (-1..=1).any(|dj| (-1..=1).any(|di| self.is_wall_cell(i + di, j + dj)))
    }

    pub fn wall_count(&self) -> usize {
        self.walls.iter().filter(|&&w| w).count()
    }
}

/// Everything a creature lives in: terrain plus the three entity indices.
pub struct Environment {
    pub terrain: Terrain,
    pub plants: SpatialIndex<Plant>,
    pub food: SpatialIndex<Food>,
    pub creatures: SpatialIndex<Creature>,
}

impl Environment {
    /// Fresh terrain and plants; no food or creatures yet.
    pub fn generate(map: &MapParams, ids: &mut IdCounter, rng: &mut impl Rng) -> Self {
        let terrain = Terrain::generate(map.map_radius, rng.gen());
        let mut env = Self::with_terrain(terrain);
        env.grow_plants(map.plant_density, ids, rng);
        log::debug!(
            "Generated terrain radius {} with {} wall cells and {} plants",
            map.map_radius,
            env.terrain.wall_count(),
            env.plants.len()
        );
        env
    }

    pub fn with_terrain(terrain: Terrain) -> Self {
        Self {
            terrain,
            plants: SpatialIndex::new(config::PLANT_CELL_SCALE),
            food: SpatialIndex::new(config::FOOD_CELL_SCALE),
            creatures: SpatialIndex::new(config::CREATURE_CELL_SCALE),
        }
    }

    pub fn radius(&self) -> f32 {
        self.terrain.radius() as f32
    }

    /// One pass over every integer point of the map. Free points get a plant when an
    /// independent noise field beats a random draw scaled by `1 / density`.
    pub fn grow_plants(&mut self, density: f32, ids: &mut IdCounter, rng: &mut impl Rng) {
        self.plants.clear();
        if density <= 0.0 {
            return;
        }
        let fbm: Fbm<Perlin> = Fbm::new(rng.gen());
        let r = self.terrain.radius() as i32;
        for y in -r..r {
            for x in -r..r {
                let pos = vec2(x as f32, y as f32);
                if self.terrain.sample_wall_at(pos, true) {
                    continue;
                }
                let noise = fbm.get([
                    x as f64 / config::PLANT_NOISE_SCALE,
                    y as f64 / config::PLANT_NOISE_SCALE,
                ]) as f32;
                if noise > rng.gen::<f32>() / density {
                    self.plants.add(Plant {
                        id: ids.next_id(),
                        pos,
                        radius: 3.0 + rng.gen::<f32>() * 2.0,
                        heading: rng.gen_range(0.0..std::f32::consts::TAU),
                        fertility: rng.gen(),
                    });
                }
            }
        }
        self.plants.refresh();
    }

    /// Drop `density * R^2 * pi` food attempts uniformly over the map disk, skipping walls.
    pub fn scatter_food(&mut self, density: f32, ids: &mut IdCounter, rng: &mut impl Rng) -> usize {
        let r = self.radius();
        let attempts = (density.max(0.0) * r * r * std::f32::consts::PI) as usize;
        let mut placed = 0;
        for _ in 0..attempts {
            let dist = r * rng.gen::<f32>().sqrt();
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let pos = vec2(angle.cos(), angle.sin()) * dist;
            if self.terrain.sample_wall_at(pos, true) {
                continue;
            }
            let mut energy = rng.gen::<f32>() * 2.0 + 1.0;
            if rng.gen_bool(config::SCATTER_RICH_CHANCE) {
                energy *= config::SCATTER_RICH_MULT;
            }
            let heading = rng.gen_range(0.0..std::f32::consts::TAU);
            self.food
                .add(Food::new(ids.next_id(), pos, heading, energy, true));
            placed += 1;
        }
        placed
    }

    /// Each plant grows food on average once every `delay` seconds, unless food
    /// already sits on it.
    pub fn grow_food_from_plants(
        &mut self,
        dt: f32,
        delay: f32,
        energy_scale: f32,
        ids: &mut IdCounter,
        rng: &mut impl Rng,
    ) -> usize {
        let chance = if delay > 0.0 {
            (dt / delay).clamp(0.0, 1.0) as f64
        } else {
            1.0
        };
        let mut grown = 0;
        for plant in self.plants.iter() {
            if !rng.gen_bool(chance) {
                continue;
            }
            if !self
                .food
                .query(plant.pos, config::PLANT_OCCUPIED_RADIUS)
                .is_empty()
            {
                continue;
            }
            let energy = plant.fertility.powi(3) * energy_scale;
            if energy <= 0.0 {
                continue;
            }
            self.food.add(Food::new(
                ids.next_id(),
                plant.pos,
                plant.heading,
                energy,
                true,
            ));
            grown += 1;
        }
        grown
    }

    /// Every food item loses `rate * dt`; anything left with no energy is removed.
    pub fn decay_food(&mut self, rate: f32, dt: f32) {
        for food in self.food.iter_mut() {
            food.energy -= rate * dt;
        }
        self.food.retain(|f| f.energy > 0.0);
    }

    pub fn refresh_indices(&mut self) {
        self.creatures.refresh();
        self.food.refresh();
    }
}
