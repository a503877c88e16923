use macroquad::prelude::*;

use crate::brain::Phenotype;
use crate::combat::{forward, resolve_attack, targets_in_mouth};
use crate::config;
use crate::energy::{deduct_metabolism, feed};
use crate::entity::{EntityId, Located};
use crate::environment::Terrain;
use crate::food::{Food, Plant};
use crate::genome::Dna;
use crate::params::SimParams;
use crate::physics::{self, Body};
use crate::sensory::{self, Observer, SensorReadings};
use crate::spatial_hash::SpatialIndex;

/// Read-only copy of another creature, taken before the update so the food index
/// and the creature being updated can be borrowed mutably at the same time.
#[derive(Clone, Copy, Debug)]
pub struct NeighbourView {
    pub id: EntityId,
    pub pos: Vec2,
    pub radius: f32,
}

/// The parts of the world one creature touches during its update.
pub struct Surroundings<'a> {
    pub terrain: &'a Terrain,
    pub plants: &'a SpatialIndex<Plant>,
    pub food: &'a mut SpatialIndex<Food>,
    pub neighbours: &'a [NeighbourView],
}

#[derive(Clone, Debug, PartialEq)]
pub enum UpdateOutcome {
    Alive { kills: Vec<EntityId> },
    Died,
}

#[derive(Clone, Debug)]
pub struct Creature {
    pub id: EntityId,
    pub pos: Vec2,
    pub velocity: Vec2,
    pub heading: f32,
    pub angular_velocity: f32,
    pub energy: f32,
    pub dna: Dna,
    pub brain: Phenotype,
    pub sensor_angles: [f32; config::NUM_SENSORS],
    /// `[turn, power, attack]` from the last brain evaluation.
    pub brain_output: [f32; config::BRAIN_OUTPUTS],
    /// Seconds accumulated towards the next brain evaluation.
    pub brain_timer: f32,
    pub readings: SensorReadings,
    pub age: f32,
    pub generation: u32,
}

impl Located for Creature {
    fn id(&self) -> EntityId {
        self.id
    }

    fn pos(&self) -> Vec2 {
        self.pos
    }
}

impl Creature {
    /// Starts at full energy, at rest, with an idle brain output.
    pub fn new(id: EntityId, dna: Dna, pos: Vec2, heading: f32, params: &SimParams) -> Self {
        let brain = Phenotype::compile(&dna.brain);
        Self {
            id,
            pos,
            velocity: Vec2::ZERO,
            heading,
            angular_velocity: 0.0,
            energy: dna.max_energy(params),
            dna,
            brain,
            sensor_angles: sensory::sensor_angles(),
            brain_output: [0.0, -1.0, 0.0],
            brain_timer: 0.0,
            readings: SensorReadings::default(),
            age: 0.0,
            generation: 0,
        }
    }

    pub fn radius(&self) -> f32 {
        self.dna.size
    }

    pub fn forward(&self) -> Vec2 {
        forward(self.heading)
    }

    pub fn view(&self) -> NeighbourView {
        NeighbourView {
            id: self.id,
            pos: self.pos,
            radius: self.radius(),
        }
    }

    /// Advance the evaluation clock; true when the brain should run this tick.
    pub fn advance_brain_timer(&mut self, dt: f32, delay: f32) -> bool {
        self.brain_timer += dt;
        if self.brain_timer >= delay {
            self.brain_timer -= delay.max(0.0);
            true
        } else {
            false
        }
    }

    /// Neighbour lookups use at least a fixed radius so contact works with tiny vision.
    pub fn query_radius(&self, params: &SimParams) -> f32 {
        self.dna
            .vision_range(params)
            .max(config::MIN_QUERY_RADIUS)
            .max(self.radius() * 2.0)
    }

    fn power(&self) -> f32 {
        (self.brain_output[1] * 0.5 + 0.5).clamp(0.0, 1.0)
    }

    fn turn(&self) -> f32 {
        self.brain_output[0] * std::f32::consts::FRAC_PI_2
    }

    /// One tick: metabolism, feeding, perception and decisions when the brain is due,
    /// then physics and the attack. Kills are reported, not applied; the caller owns
    /// the population.
    pub fn update(
        &mut self,
        dt: f32,
        world: &mut Surroundings,
        evaluate_brain: bool,
        params: &SimParams,
    ) -> UpdateOutcome {
        let base = &params.creature_base;
        self.age += dt;

        let nearby_food = world.food.query_indices(self.pos, self.query_radius(params));

        if !deduct_metabolism(self, dt, params) {
            return UpdateOutcome::Died;
        }

        feed(self, world.food, &nearby_food, dt, params);

        // Sense from where the creature stands before it moves.
        if evaluate_brain {
            self.think(world, params);
        }

        let (wall, touching_wall) =
            physics::wall_force(self.pos, self.radius(), world.terrain, base.wall_bounce_force);
        let push = physics::neighbour_push(
            self.pos,
            self.radius(),
            world.neighbours,
            base.neighbor_push_force,
        );
        let biteable = targets_in_mouth(self.pos, self.heading, self.radius(), world.neighbours);

        let mut drag = base.drag;
        if touching_wall {
            drag += base.wall_contact_drag;
        }
        if physics::touches_plant(self.pos, self.radius(), world.plants) {
            drag += self.dna.plant_drag(params);
        }

        let propulsion = self.forward() * self.dna.push_force(params) * self.power();
        let torque = self.turn() * base.rotate_force;
        physics::integrate(
            Body {
                pos: &mut self.pos,
                velocity: &mut self.velocity,
                heading: &mut self.heading,
                angular_velocity: &mut self.angular_velocity,
            },
            wall + push + propulsion,
            torque,
            drag,
            base.angular_drag,
            dt,
        );

        UpdateOutcome::Alive {
            kills: resolve_attack(self.brain_output[2], biteable),
        }
    }

    fn think(&mut self, world: &Surroundings, params: &SimParams) {
        let vision = self.dna.vision_range(params);
        let observer = Observer {
            pos: self.pos,
            heading: self.heading,
            vision,
            plant_efficiency: self.dna.plant_efficiency(params),
            meat_efficiency: self.dna.meat_efficiency(params),
            max_energy: self.dna.max_energy(params),
        };
        let visible_food = world.food.query(self.pos, vision);
        self.readings = sensory::sense(
            &observer,
            &self.sensor_angles,
            world.terrain,
            visible_food.iter().copied(),
            world.neighbours,
        );

        let inputs = sensory::brain_inputs(
            &self.readings,
            self.pos,
            self.heading,
            world.terrain.radius() as f32,
        );
        let outputs = self.brain.forward(&inputs);
        for (slot, value) in self.brain_output.iter_mut().enumerate() {
            *value = outputs.get(slot).copied().unwrap_or(0.0);
        }
    }

    /// The food left behind on death. Nothing is left when the creature ran dry.
    pub fn into_corpse(self, food_id: EntityId) -> Option<Food> {
        (self.energy > 0.0).then(|| Food::new(food_id, self.pos, self.heading, self.energy, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::{Genotype, IdAllocator, SynapseGene};
    use crate::genome::ColorHsv;

    fn test_creature(params: &SimParams) -> Creature {
        let mut ids = IdAllocator::new();
        let brain = Genotype::new(config::BRAIN_INPUTS, config::BRAIN_OUTPUTS, &mut ids);
        let dna = Dna::new(1.0, 1.0, 1.0, 0.5, brain, ColorHsv { h: 0.0, s: 1.0, v: 1.0 });
        Creature::new(EntityId(0), dna, Vec2::ZERO, 0.0, params)
    }

    struct World {
        terrain: Terrain,
        plants: SpatialIndex<Plant>,
        food: SpatialIndex<Food>,
    }

    impl World {
        fn open() -> Self {
            Self {
                terrain: Terrain::generate(50, 1),
                plants: SpatialIndex::new(config::PLANT_CELL_SCALE),
                food: SpatialIndex::new(config::FOOD_CELL_SCALE),
            }
        }

        fn run(
            &mut self,
            c: &mut Creature,
            neighbours: &[NeighbourView],
            evaluate: bool,
            params: &SimParams,
        ) -> UpdateOutcome {
            let mut around = Surroundings {
                terrain: &self.terrain,
                plants: &self.plants,
                food: &mut self.food,
                neighbours,
            };
            c.update(config::FIXED_DT, &mut around, evaluate, params)
        }
    }

    #[test]
    fn resting_creature_only_pays_metabolism() {
        let params = SimParams::default();
        let mut world = World::open();
        let mut c = test_creature(&params);
        let max = c.dna.max_energy(&params);

        let outcome = world.run(&mut c, &[], false, &params);
        assert_eq!(outcome, UpdateOutcome::Alive { kills: vec![] });
        let expected = max - config::FIXED_DT * c.dna.metabolism(&params);
        assert!((c.energy - expected).abs() < 1e-6);
        assert_eq!(c.pos, Vec2::ZERO);
    }

    #[test]
    fn starving_creature_dies_before_moving() {
        let params = SimParams::default();
        let mut world = World::open();
        let mut c = test_creature(&params);
        c.energy = c.dna.death_energy(&params);
        c.velocity = vec2(1.0, 0.0);

        assert_eq!(world.run(&mut c, &[], true, &params), UpdateOutcome::Died);
        assert_eq!(c.pos, Vec2::ZERO);
    }

    #[test]
    fn full_power_moves_forward() {
        let params = SimParams::default();
        let mut world = World::open();
        let mut c = test_creature(&params);
        c.brain_output = [0.0, 1.0, 0.0];
        world.run(&mut c, &[], false, &params);
        assert!(c.pos.y > 0.0);
        assert!(c.pos.x.abs() < 1e-6);
    }

    #[test]
    fn attack_output_kills_what_is_in_the_mouth() {
        let params = SimParams::default();
        let mut world = World::open();
        let mut c = test_creature(&params);
        let prey = NeighbourView {
            id: EntityId(7),
            pos: vec2(0.0, 0.6),
            radius: 1.0,
        };
        c.brain_output = [0.0, -1.0, 1.0];
        let outcome = world.run(&mut c, &[prey], false, &params);
        assert_eq!(
            outcome,
            UpdateOutcome::Alive {
                kills: vec![EntityId(7)]
            }
        );
    }

    #[test]
    fn brain_evaluation_drives_movement_in_the_same_tick() {
        let params = SimParams::default();
        let mut world = World::open();
        let mut c = test_creature(&params);
        // Bias input drives the power output fully on.
        let bias = c.dna.brain.neurons[config::BRAIN_INPUTS - 1].id;
        let power = c.dna.brain.neurons[config::BRAIN_INPUTS + 1].id;
        c.dna.brain.synapses.push(SynapseGene {
            id: 1000,
            from: bias,
            to: power,
            weight: 10.0,
        });
        c.brain = Phenotype::compile(&c.dna.brain);

        world.run(&mut c, &[], false, &params);
        assert_eq!(c.brain_output, [0.0, -1.0, 0.0]);
        assert_eq!(c.pos, Vec2::ZERO);

        // The fresh output drives movement in the same tick.
        world.run(&mut c, &[], true, &params);
        assert!(c.brain_output[1] > 0.99);
        assert_eq!(c.brain_output[0], 0.0);
        assert!(c.pos.y > 0.0);
        assert!(c.pos.x.abs() < 1e-6);
    }

    #[test]
    fn brain_timer_keeps_remainder() {
        let params = SimParams::default();
        let mut c = test_creature(&params);
        c.brain_timer = 0.09;
        assert!(c.advance_brain_timer(0.02, 0.1));
        assert!((c.brain_timer - 0.01).abs() < 1e-6);
        assert!(!c.advance_brain_timer(0.02, 0.1));
    }

    #[test]
    fn corpse_keeps_energy_and_place() {
        let params = SimParams::default();
        let mut c = test_creature(&params);
        c.pos = vec2(3.0, -2.0);
        c.energy = 0.15;
        let food = c.clone().into_corpse(EntityId(99)).unwrap();
        assert!(!food.is_plant_origin);
        assert_eq!(food.pos, vec2(3.0, -2.0));
        assert!((food.energy - 0.15).abs() < 1e-6);

        c.energy = -0.1;
        assert!(c.into_corpse(EntityId(100)).is_none());
    }
}
