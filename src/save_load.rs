use std::fs;
use std::path::{Path, PathBuf};

use macroquad::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::brain::{Genotype, IdAllocator, Phenotype};
use crate::config;
use crate::creature::Creature;
use crate::entity::{EntityId, IdCounter};
use crate::environment::{Environment, Terrain};
use crate::food::{Food, Plant};
use crate::genome::Dna;
use crate::params::SimParams;
use crate::sensory::{self, SensorReadings};
use crate::simulation::SimState;
use crate::stats::SimStats;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("{} does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("{} is malformed: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("snapshot {} could not be encoded or decoded: {source}", .path.display())]
    Snapshot {
        path: PathBuf,
        source: bincode::Error,
    },
    #[error("snapshot {} has version {found}, expected {expected}", .path.display(), expected = SNAPSHOT_VERSION)]
    Version { path: PathBuf, found: u32 },
    #[error("snapshot {} has a wall grid that does not match radius {radius}", .path.display())]
    Terrain { path: PathBuf, radius: usize },
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, PersistenceError> {
    fs::read(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            PersistenceError::NotFound(path.to_path_buf())
        } else {
            PersistenceError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    let io_err = |source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(io_err)?;
    }
    fs::write(path, bytes).map_err(io_err)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    let text = serde_json::to_vec_pretty(value).map_err(|source| PersistenceError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    write_bytes(path, &text)
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, PersistenceError> {
    let bytes = read_bytes(path)?;
    serde_json::from_slice(&bytes).map_err(|source| PersistenceError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Where genome slot `slot` lives on disk.
pub fn genome_slot_path(slot: u8) -> PathBuf {
    Path::new(config::DATA_DIR).join(format!("creature_dna_{slot}.json"))
}

pub fn save_dna(path: &Path, dna: &Dna) -> Result<(), PersistenceError> {
    write_json(path, dna)
}

/// Load a genome and normalise its traits. The brain ids it carries are not yet
/// reserved; callers sync their allocator before mutating it.
pub fn load_dna(path: &Path) -> Result<Dna, PersistenceError> {
    let mut dna: Dna = read_json(path)?;
    dna.validate();
    Ok(dna)
}

pub fn save_params(path: &Path, params: &SimParams) -> Result<(), PersistenceError> {
    write_json(path, params)
}

pub fn load_params(path: &Path) -> Result<SimParams, PersistenceError> {
    read_json(path)
}

/// Never fails: a missing or broken file is replaced by the defaults.
pub fn load_params_or_default(path: &Path) -> SimParams {
    match load_params(path) {
        Ok(params) => params,
        Err(e) => {
            log::warn!("Falling back to default parameters: {e}");
            let params = SimParams::default();
            if let Err(e) = save_params(path, &params) {
                log::warn!("Could not write default parameters: {e}");
            }
            params
        }
    }
}

// Serde-friendly mirrors of the runtime types.

#[derive(Clone, Serialize, Deserialize)]
struct SerdVec2 {
    x: f32,
    y: f32,
}

impl From<Vec2> for SerdVec2 {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<SerdVec2> for Vec2 {
    fn from(v: SerdVec2) -> Self {
        vec2(v.x, v.y)
    }
}

#[derive(Clone, Serialize, Deserialize)]
struct SerdFood {
    id: EntityId,
    pos: SerdVec2,
    heading: f32,
    is_plant_origin: bool,
    energy: f32,
}

impl From<&Food> for SerdFood {
    fn from(f: &Food) -> Self {
        Self {
            id: f.id,
            pos: f.pos.into(),
            heading: f.heading,
            is_plant_origin: f.is_plant_origin,
            energy: f.energy,
        }
    }
}

impl From<SerdFood> for Food {
    fn from(f: SerdFood) -> Self {
        Food::new(f.id, f.pos.into(), f.heading, f.energy, f.is_plant_origin)
    }
}

#[derive(Clone, Serialize, Deserialize)]
struct SerdPlant {
    id: EntityId,
    pos: SerdVec2,
    radius: f32,
    heading: f32,
    fertility: f32,
}

impl From<&Plant> for SerdPlant {
    fn from(p: &Plant) -> Self {
        Self {
            id: p.id,
            pos: p.pos.into(),
            radius: p.radius,
            heading: p.heading,
            fertility: p.fertility,
        }
    }
}

impl From<SerdPlant> for Plant {
    fn from(p: SerdPlant) -> Self {
        Plant {
            id: p.id,
            pos: p.pos.into(),
            radius: p.radius,
            heading: p.heading,
            fertility: p.fertility,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
struct SerdCreature {
    id: EntityId,
    pos: SerdVec2,
    velocity: SerdVec2,
    heading: f32,
    angular_velocity: f32,
    energy: f32,
    dna: Dna,
    brain_output: [f32; config::BRAIN_OUTPUTS],
    brain_timer: f32,
    age: f32,
    generation: u32,
}

impl From<&Creature> for SerdCreature {
    fn from(c: &Creature) -> Self {
        Self {
            id: c.id,
            pos: c.pos.into(),
            velocity: c.velocity.into(),
            heading: c.heading,
            angular_velocity: c.angular_velocity,
            energy: c.energy,
            dna: c.dna.clone(),
            brain_output: c.brain_output,
            brain_timer: c.brain_timer,
            age: c.age,
            generation: c.generation,
        }
    }
}

impl From<SerdCreature> for Creature {
    fn from(c: SerdCreature) -> Self {
        // Sensor readings are transient and refill on the next brain evaluation.
        Creature {
            id: c.id,
            pos: c.pos.into(),
            velocity: c.velocity.into(),
            heading: c.heading,
            angular_velocity: c.angular_velocity,
            energy: c.energy,
            brain: Phenotype::compile(&c.dna.brain),
            dna: c.dna,
            sensor_angles: sensory::sensor_angles(),
            brain_output: c.brain_output,
            brain_timer: c.brain_timer,
            readings: SensorReadings::default(),
            age: c.age,
            generation: c.generation,
        }
    }
}

/// Binary image of a running world.
#[derive(Serialize, Deserialize)]
struct WorldSnapshot {
    version: u32,
    params: SimParams,
    terrain_radius: usize,
    walls: Vec<bool>,
    plants: Vec<SerdPlant>,
    food: Vec<SerdFood>,
    creatures: Vec<SerdCreature>,
    rng: ChaCha8Rng,
    entity_ids: IdCounter,
    brain_ids: IdAllocator,
    template: Genotype,
    tick_count: u64,
    speed_multiplier: f32,
}

impl WorldSnapshot {
    fn from_sim(sim: &SimState) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            params: sim.params.clone(),
            terrain_radius: sim.env.terrain.radius(),
            walls: sim.env.terrain.walls().to_vec(),
            plants: sim.env.plants.iter().map(SerdPlant::from).collect(),
            food: sim.env.food.iter().map(SerdFood::from).collect(),
            creatures: sim.env.creatures.iter().map(SerdCreature::from).collect(),
            rng: sim.rng.clone(),
            entity_ids: sim.entity_ids.clone(),
            brain_ids: sim.brain_ids.clone(),
            template: sim.template.clone(),
            tick_count: sim.tick_count,
            speed_multiplier: sim.speed_multiplier,
        }
    }

    fn restore(self, path: &Path) -> Result<SimState, PersistenceError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(PersistenceError::Version {
                path: path.to_path_buf(),
                found: self.version,
            });
        }
        let terrain = Terrain::from_walls(self.terrain_radius, self.walls).ok_or_else(|| {
            PersistenceError::Terrain {
                path: path.to_path_buf(),
                radius: self.terrain_radius,
            }
        })?;

        let mut env = Environment::with_terrain(terrain);
        for p in self.plants {
            env.plants.add(p.into());
        }
        for f in self.food {
            env.food.add(f.into());
        }
        for c in self.creatures {
            env.creatures.add(c.into());
        }
        env.plants.refresh();
        env.refresh_indices();

        Ok(SimState {
            params: self.params,
            env,
            rng: self.rng,
            entity_ids: self.entity_ids,
            brain_ids: self.brain_ids,
            template: self.template,
            tick_count: self.tick_count,
            stats: SimStats::new(600),
            paused: false,
            speed_multiplier: self.speed_multiplier,
        })
    }
}

/// Save the whole world to a bincode file.
pub fn save_world(sim: &SimState, path: &Path) -> Result<(), PersistenceError> {
    let snapshot = WorldSnapshot::from_sim(sim);
    let bytes = bincode::serialize(&snapshot).map_err(|source| PersistenceError::Snapshot {
        path: path.to_path_buf(),
        source,
    })?;
    write_bytes(path, &bytes)
}

/// Load a world saved by `save_world`. Statistics start over.
pub fn load_world(path: &Path) -> Result<SimState, PersistenceError> {
    let bytes = read_bytes(path)?;
    let snapshot: WorldSnapshot =
        bincode::deserialize(&bytes).map_err(|source| PersistenceError::Snapshot {
            path: path.to_path_buf(),
            source,
        })?;
    snapshot.restore(path)
}
