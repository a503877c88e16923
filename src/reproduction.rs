use ::rand::Rng;

use crate::brain::IdAllocator;
use crate::config;
use crate::creature::Creature;
use crate::entity::{EntityId, IdCounter};
use crate::params::SimParams;

/// Well fed creatures reproduce on average once every `REPRODUCTION_INTERVAL` seconds.
pub fn ready_to_reproduce(creature: &Creature, dt: f32, params: &SimParams, rng: &mut impl Rng) -> bool {
    let max = creature.dna.max_energy(params);
    if creature.energy < max * config::REPRODUCTION_ENERGY_FRACTION {
        return false;
    }
    let chance = (dt / config::REPRODUCTION_INTERVAL).clamp(0.0, 1.0) as f64;
    rng.gen_bool(chance)
}

/// Build a mutated child at the parent's position. Parent and child both end up
/// holding `OFFSPRING_ENERGY_FRACTION` of the parent's max energy.
pub fn reproduce(
    parent: &mut Creature,
    child_id: EntityId,
    brain_ids: &mut IdAllocator,
    params: &SimParams,
    rng: &mut impl Rng,
) -> Creature {
    let share = parent.dna.max_energy(params) * config::OFFSPRING_ENERGY_FRACTION;
    parent.energy = share;

    let mut dna = parent.dna.clone();
    dna.mutate(&params.mutation, brain_ids, rng);

    let heading = rng.gen_range(0.0..std::f32::consts::TAU);
    let mut child = Creature::new(child_id, dna, parent.pos, heading, params);
    child.energy = share.min(child.dna.max_energy(params));
    child.brain_timer = rng.gen::<f32>() * params.environment.brain_update_delay;
    child.generation = parent.generation + 1;
    child
}

/// Roll for every creature, then build the children. Returns them in parent order;
/// the caller adds them after the roll so nobody reproduces twice in one pass.
pub fn breed_population<'a>(
    creatures: impl Iterator<Item = &'a mut Creature>,
    dt: f32,
    ids: &mut IdCounter,
    brain_ids: &mut IdAllocator,
    params: &SimParams,
    rng: &mut impl Rng,
) -> Vec<Creature> {
    let mut children = Vec::new();
    for parent in creatures {
        if ready_to_reproduce(parent, dt, params, rng) {
            children.push(reproduce(parent, ids.next_id(), brain_ids, params, rng));
        }
    }
    children
}
