use std::collections::HashSet;
use std::path::Path;

use ::rand::{Rng, SeedableRng};
use macroquad::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::brain::{Genotype, IdAllocator};
use crate::config;
use crate::creature::{Creature, NeighbourView, Surroundings, UpdateOutcome};
use crate::entity::{EntityId, IdCounter};
use crate::environment::Environment;
use crate::food::Food;
use crate::genome::{ColorHsv, Dna};
use crate::params::SimParams;
use crate::reproduction;
use crate::save_load::{self, PersistenceError};
use crate::spatial_hash::SpatialIndex;
use crate::stats::{PopulationSample, SimStats};

/// Owns the whole world and advances it one fixed tick at a time.
///
/// Creatures update strictly in population order. A creature updated later in a tick
/// sees the already-moved positions of earlier ones, and kills or deaths take effect
/// before the next creature runs.
pub struct SimState {
    pub params: SimParams,
    pub env: Environment,
    pub rng: ChaCha8Rng,
    pub entity_ids: IdCounter,
    pub brain_ids: IdAllocator,
    /// Disconnected network every initial creature starts from.
    pub template: Genotype,
    pub tick_count: u64,
    pub stats: SimStats,
    pub paused: bool,
    pub speed_multiplier: f32,
}

impl SimState {
    /// Generate terrain, plants, initial food and the starting population.
    pub fn new(params: SimParams, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut entity_ids = IdCounter::new();
        let env = Environment::generate(&params.map, &mut entity_ids, &mut rng);
        let mut sim = Self::assemble(params, env, rng, entity_ids);
        sim.populate();
        log::info!(
            "World seeded with {seed}: radius {}, {} plants, {} food, {} creatures",
            sim.params.map.map_radius,
            sim.env.plants.len(),
            sim.env.food.len(),
            sim.env.creatures.len()
        );
        sim
    }

    /// Wrap an existing environment without adding anything to it.
    #[cfg(test)]
    pub fn with_environment(params: SimParams, env: Environment, seed: u64) -> Self {
        let mut entity_ids = IdCounter::new();
        for id in env
            .plants
            .iter()
            .map(|p| p.id)
            .chain(env.food.iter().map(|f| f.id))
            .chain(env.creatures.iter().map(|c| c.id))
        {
            entity_ids.observe(id);
        }
        Self::assemble(params, env, ChaCha8Rng::seed_from_u64(seed), entity_ids)
    }

    fn assemble(params: SimParams, env: Environment, rng: ChaCha8Rng, entity_ids: IdCounter) -> Self {
        let mut brain_ids = IdAllocator::new();
        let template = Genotype::new(config::BRAIN_INPUTS, config::BRAIN_OUTPUTS, &mut brain_ids);
        Self {
            params,
            env,
            rng,
            entity_ids,
            brain_ids,
            template,
            tick_count: 0,
            stats: SimStats::new(600),
            paused: false,
            speed_multiplier: 1.0,
        }
    }

    fn populate(&mut self) {
        let density = self.params.map.initial_food_density;
        self.env
            .scatter_food(density, &mut self.entity_ids, &mut self.rng);

        let r = self.env.radius() * config::SPAWN_AREA_FRACTION;
        for _ in 0..self.params.map.initial_creatures {
            let dist = r * self.rng.gen::<f32>().sqrt();
            let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
            let pos = vec2(angle.cos(), angle.sin()) * dist;
            let dna = self.random_dna();
            self.spawn_creature(dna, pos);
        }
        self.env.refresh_indices();
    }

    /// Starting genome: body traits around 1, random diet, template brain with a few
    /// random synapses.
    pub fn random_dna(&mut self) -> Dna {
        let mut brain = self.template.clone();
        for _ in 0..config::INITIAL_SYNAPSES {
            brain.add_random_synapse(
                self.params.mutation.synapse_growth_size,
                &mut self.brain_ids,
                &mut self.rng,
            );
        }
        let size = 1.0 + self.rng.gen_range(-1.0f32..1.0);
        let speed = 1.0 + self.rng.gen_range(-1.0f32..1.0);
        let diet = self.rng.gen::<f32>();
        let color = ColorHsv::random(&mut self.rng);
        Dna::new(size, speed, 1.0, diet, brain, color)
    }

    pub fn tick(&mut self) {
        let dt = config::FIXED_DT;
        let newborn = self.reproduce_population(dt);
        self.step_environment(dt);
        let deaths = self.update_creatures(dt, &newborn);
        self.tick_count += 1;

        let sample = self.sample();
        self.stats.record(sample, newborn.len() as u32, deaths);
        if self.tick_count % config::STATS_LOG_INTERVAL == 0 {
            log::info!("tick {}: {}", self.tick_count, self.stats.summary());
        }
    }

    /// Roll every live creature first, then add the children. Returns the newborn ids,
    /// which sit out the rest of this tick.
    pub(crate) fn reproduce_population(&mut self, dt: f32) -> HashSet<EntityId> {
        let children = reproduction::breed_population(
            self.env.creatures.iter_mut(),
            dt,
            &mut self.entity_ids,
            &mut self.brain_ids,
            &self.params,
            &mut self.rng,
        );
        let ids = children.iter().map(|c| c.id).collect();
        for child in children {
            self.env.creatures.add(child);
        }
        ids
    }

    /// Food growth and decay, then fresh creature and food buckets.
    pub(crate) fn step_environment(&mut self, dt: f32) {
        let p = &self.params;
        self.env.grow_food_from_plants(
            dt,
            p.plants.food_growth_delay,
            p.plants.grown_food_energy,
            &mut self.entity_ids,
            &mut self.rng,
        );
        self.env.decay_food(p.environment.food_decay_rate, dt);
        self.env.refresh_indices();
    }

    /// Update every creature in population order, skipping `skip`. Returns the death count.
    pub(crate) fn update_creatures(&mut self, dt: f32, skip: &HashSet<EntityId>) -> u32 {
        let params = &self.params;
        let delay = params.environment.brain_update_delay;
        let ids = &mut self.entity_ids;
        let Environment {
            terrain,
            plants,
            food,
            creatures,
        } = &mut self.env;

        let mut deaths = 0;
        let mut i = 0;
        while let Some(creature) = creatures.get(i) {
            let id = creature.id;
            if skip.contains(&id) {
                i += 1;
                continue;
            }
            let neighbours: Vec<NeighbourView> = creatures
                .query(creature.pos, creature.query_radius(params))
                .into_iter()
                .filter(|other| other.id != id)
                .map(Creature::view)
                .collect();

            let Some(creature) = creatures.get_mut(i) else {
                break;
            };
            let evaluate = creature.advance_brain_timer(dt, delay);
            let mut around = Surroundings {
                terrain: &*terrain,
                plants: &*plants,
                food: &mut *food,
                neighbours: &neighbours,
            };

            match creature.update(dt, &mut around, evaluate, params) {
                UpdateOutcome::Died => {
                    if let Some(dead) = creatures.remove(id) {
                        bury(dead, food, ids);
                        deaths += 1;
                    }
                }
                UpdateOutcome::Alive { kills } => {
                    for victim in kills {
                        let Some(k) = creatures.position_of(victim) else {
                            continue;
                        };
                        if let Some(dead) = creatures.remove(victim) {
                            bury(dead, food, ids);
                            deaths += 1;
                        }
                        if k < i {
                            i -= 1;
                        }
                    }
                    i += 1;
                }
            }
        }
        deaths
    }

    fn sample(&self) -> PopulationSample {
        let creatures = &self.env.creatures;
        PopulationSample {
            population: creatures.len(),
            food_count: self.env.food.len(),
            mean_diet: mean_of(creatures, |c| c.dna.diet),
            mean_size: mean_of(creatures, |c| c.dna.size),
            mean_generation: mean_of(creatures, |c| c.generation as f32),
        }
    }

    // User commands

    pub fn spawn_creature(&mut self, dna: Dna, pos: Vec2) -> EntityId {
        let id = self.entity_ids.next_id();
        let heading = self.rng.gen_range(0.0..std::f32::consts::TAU);
        let mut creature = Creature::new(id, dna, pos, heading, &self.params);
        creature.brain_timer = self.rng.gen::<f32>() * self.params.environment.brain_update_delay;
        self.env.creatures.add(creature);
        self.env.creatures.refresh();
        id
    }

    pub fn kill(&mut self, id: EntityId) -> bool {
        let Some(dead) = self.env.creatures.remove(id) else {
            return false;
        };
        bury(dead, &mut self.env.food, &mut self.entity_ids);
        self.env.food.refresh();
        true
    }

    /// Unmutated copy at full energy, on top of the original.
    pub fn clone_creature(&mut self, id: EntityId) -> Option<EntityId> {
        let (dna, pos) = self
            .env
            .creatures
            .find(id)
            .map(|c| (c.dna.clone(), c.pos))?;
        Some(self.spawn_creature(dna, pos))
    }

    pub fn feed(&mut self, id: EntityId) -> bool {
        let params = &self.params;
        match self.env.creatures.find_mut(id) {
            Some(c) => {
                c.energy = c.dna.max_energy(params);
                true
            }
            None => false,
        }
    }

    pub fn reposition(&mut self, id: EntityId, pos: Vec2) -> bool {
        let Some(c) = self.env.creatures.find_mut(id) else {
            return false;
        };
        c.pos = pos;
        c.velocity = Vec2::ZERO;
        self.env.creatures.refresh();
        true
    }

    pub fn randomize_color(&mut self, id: EntityId) -> bool {
        let color = ColorHsv::random(&mut self.rng);
        match self.env.creatures.find_mut(id) {
            Some(c) => {
                c.dna.color = color;
                true
            }
            None => false,
        }
    }

    pub fn scatter_food(&mut self, density: f32) -> usize {
        let placed = self
            .env
            .scatter_food(density, &mut self.entity_ids, &mut self.rng);
        self.env.food.refresh();
        placed
    }

    /// Write one creature's genome to `path`. Returns false when the creature is gone.
    pub fn export_creature(&self, id: EntityId, path: &Path) -> Result<bool, PersistenceError> {
        let Some(c) = self.env.creatures.find(id) else {
            return Ok(false);
        };
        save_load::save_dna(path, &c.dna)?;
        log::info!("Exported creature {} to {}", id.0, path.display());
        Ok(true)
    }

    /// Spawn a creature from a saved genome. The world is untouched on failure.
    pub fn import_creature(&mut self, path: &Path, pos: Vec2) -> Result<EntityId, PersistenceError> {
        let dna = save_load::load_dna(path)?;
        self.brain_ids.sync_with(&dna.brain);
        let id = self.spawn_creature(dna, pos);
        log::info!("Imported {} as creature {}", path.display(), id.0);
        Ok(id)
    }

    /// Swap in a freshly loaded parameter set. Falls back to defaults on failure.
    pub fn reload_params(&mut self, path: &Path) {
        self.params = save_load::load_params_or_default(path);
        log::info!("Reloaded parameters from {}", path.display());
    }

    /// Throw away terrain, plants, food and creatures and build a new world.
    pub fn regenerate_world(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self.env = Environment::generate(&self.params.map, &mut self.entity_ids, &mut self.rng);
        self.populate();
        log::info!(
            "Regenerated world with seed {seed}: {} plants, {} creatures",
            self.env.plants.len(),
            self.env.creatures.len()
        );
    }

    /// Closest creature whose body lies within `radius` of `point`.
    pub fn creature_at(&self, point: Vec2, radius: f32) -> Option<EntityId> {
        self.env
            .creatures
            .iter()
            .map(|c| (c.pos.distance(point) - c.radius(), c.id))
            .filter(|(d, _)| *d <= radius)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, id)| id)
    }
}

fn mean_of(creatures: &SpatialIndex<Creature>, f: impl Fn(&Creature) -> f32) -> f32 {
    if creatures.is_empty() {
        return 0.0;
    }
    creatures.iter().map(f).sum::<f32>() / creatures.len() as f32
}

/// Turn a dead creature into meat where it fell.
fn bury(dead: Creature, food: &mut SpatialIndex<Food>, ids: &mut IdCounter) {
    if let Some(corpse) = dead.into_corpse(ids.next_id()) {
        food.add(corpse);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Terrain;

    fn quiet_params(radius: usize) -> SimParams {
        let mut params = SimParams::default();
        params.map.map_radius = radius;
        params
    }

    fn empty_world(radius: usize) -> SimState {
        let env = Environment::with_terrain(Terrain::generate(radius, 42));
        SimState::with_environment(quiet_params(radius), env, 42)
    }

    fn standard_dna(sim: &SimState) -> Dna {
        let brain = sim.template.clone();
        Dna::new(1.0, 1.0, 1.0, 0.5, brain, ColorHsv { h: 10.0, s: 0.8, v: 0.8 })
    }

    #[test]
    fn lone_creature_only_pays_metabolism_for_one_tick() {
        let mut sim = empty_world(50);
        let dna = standard_dna(&mut sim);
        let id = sim.spawn_creature(dna, Vec2::ZERO);
        {
            let c = sim.env.creatures.find_mut(id).unwrap();
            c.velocity = Vec2::ZERO;
            c.brain_timer = 0.0;
        }
        let max = sim.env.creatures.find(id).unwrap().dna.max_energy(&sim.params);
        let metabolism = sim.env.creatures.find(id).unwrap().dna.metabolism(&sim.params);

        // Everything a tick does except the reproduction roll.
        sim.step_environment(config::FIXED_DT);
        sim.update_creatures(config::FIXED_DT, &HashSet::new());

        let c = sim.env.creatures.find(id).unwrap();
        assert!((c.energy - (max - config::FIXED_DT * metabolism)).abs() < 1e-6);
        assert_eq!(c.pos, Vec2::ZERO);
    }

    #[test]
    fn starved_creature_becomes_meat_once() {
        let mut sim = empty_world(50);
        let dna = standard_dna(&mut sim);
        let id = sim.spawn_creature(dna, vec2(3.0, 4.0));
        {
            let params = sim.params.clone();
            let c = sim.env.creatures.find_mut(id).unwrap();
            c.energy = c.dna.death_energy(&params) + 1e-4;
        }

        sim.step_environment(config::FIXED_DT);
        let deaths = sim.update_creatures(config::FIXED_DT, &HashSet::new());

        assert_eq!(deaths, 1);
        assert!(sim.env.creatures.find(id).is_none());
        let meat: Vec<&Food> = sim.env.food.iter().filter(|f| !f.is_plant_origin).collect();
        assert_eq!(meat.len(), 1);
        assert!(meat[0].energy > 0.0);
        assert_eq!(meat[0].pos, vec2(3.0, 4.0));

        sim.step_environment(config::FIXED_DT);
        assert_eq!(sim.update_creatures(config::FIXED_DT, &HashSet::new()), 0);
    }

    #[test]
    fn attacker_kills_prey_in_its_mouth() {
        let mut sim = empty_world(50);
        let hunter_dna = standard_dna(&mut sim);
        let prey_dna = standard_dna(&mut sim);
        let prey = sim.spawn_creature(prey_dna, vec2(0.0, 0.6));
        let hunter = sim.spawn_creature(hunter_dna, Vec2::ZERO);
        {
            let c = sim.env.creatures.find_mut(hunter).unwrap();
            c.heading = 0.0;
            c.brain_output = [0.0, -1.0, 1.0];
            c.brain_timer = 0.0;
        }
        {
            let c = sim.env.creatures.find_mut(prey).unwrap();
            c.brain_timer = 0.0;
        }

        sim.step_environment(config::FIXED_DT);
        let deaths = sim.update_creatures(config::FIXED_DT, &HashSet::new());

        assert_eq!(deaths, 1);
        assert!(sim.env.creatures.find(prey).is_none());
        assert!(sim.env.creatures.find(hunter).is_some());
        assert_eq!(sim.env.food.iter().filter(|f| !f.is_plant_origin).count(), 1);
    }

    #[test]
    fn newborns_sit_out_their_first_tick() {
        let mut sim = empty_world(50);
        let dna = standard_dna(&mut sim);
        let id = sim.spawn_creature(dna, Vec2::ZERO);
        let energy_before = sim.env.creatures.find(id).unwrap().energy;

        sim.step_environment(config::FIXED_DT);
        sim.update_creatures(config::FIXED_DT, &HashSet::from([id]));
        assert_eq!(sim.env.creatures.find(id).unwrap().energy, energy_before);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let mut a = SimState::new(quiet_params(40), 7);
        let mut b = SimState::new(quiet_params(40), 7);
        for _ in 0..30 {
            a.tick();
            b.tick();
        }
        assert_eq!(a.env.creatures.len(), b.env.creatures.len());
        assert_eq!(a.env.food.len(), b.env.food.len());
        for (x, y) in a.env.creatures.iter().zip(b.env.creatures.iter()) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.pos, y.pos);
            assert_eq!(x.energy, y.energy);
        }
    }

    #[test]
    fn initial_population_starts_in_the_core() {
        let sim = SimState::new(quiet_params(40), 3);
        assert_eq!(sim.env.creatures.len(), sim.params.map.initial_creatures);
        let core = sim.env.radius() * config::SPAWN_AREA_FRACTION;
        for c in sim.env.creatures.iter() {
            assert!(c.pos.length() <= core + 1e-4);
            assert!(c.dna.brain.synapses.len() <= config::INITIAL_SYNAPSES);
            assert!(c.dna.size >= config::MIN_BODY_TRAIT);
        }
    }

    #[test]
    fn commands_act_on_the_named_creature() {
        let mut sim = empty_world(50);
        let dna = standard_dna(&mut sim);
        let id = sim.spawn_creature(dna, vec2(1.0, 1.0));

        sim.env.creatures.find_mut(id).unwrap().energy = 0.3;
        assert!(sim.feed(id));
        let max = sim.env.creatures.find(id).unwrap().dna.max_energy(&sim.params);
        assert!((sim.env.creatures.find(id).unwrap().energy - max).abs() < 1e-6);

        assert!(sim.reposition(id, vec2(-5.0, 2.0)));
        assert_eq!(sim.creature_at(vec2(-5.0, 2.0), 0.5), Some(id));
        assert_eq!(sim.creature_at(vec2(20.0, 20.0), 0.5), None);

        let copy = sim.clone_creature(id).unwrap();
        assert_ne!(copy, id);
        assert_eq!(
            sim.env.creatures.find(copy).unwrap().dna.size,
            sim.env.creatures.find(id).unwrap().dna.size
        );

        assert!(sim.randomize_color(id));
        assert!(sim.kill(id));
        assert!(!sim.kill(id));
        assert!(!sim.feed(id));
        assert_eq!(sim.env.creatures.len(), 1);
        assert_eq!(sim.env.food.len(), 1);
    }

    #[test]
    fn genome_export_and_import_through_a_file() {
        let mut sim = empty_world(50);
        let dna = sim.random_dna();
        let id = sim.spawn_creature(dna, Vec2::ZERO);
        let path = std::env::temp_dir().join(format!("terrarium_export_{}.json", std::process::id()));

        assert!(sim.export_creature(id, &path).unwrap());
        let imported = sim.import_creature(&path, vec2(2.0, 0.0)).unwrap();
        assert_eq!(
            sim.env.creatures.find(imported).unwrap().dna,
            sim.env.creatures.find(id).unwrap().dna
        );
        assert!(!sim.export_creature(EntityId(9999), &path).unwrap());
        let _ = std::fs::remove_file(&path);

        let before = sim.env.creatures.len();
        assert!(sim.import_creature(&path, Vec2::ZERO).is_err());
        assert_eq!(sim.env.creatures.len(), before);
    }
}
