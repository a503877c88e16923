use crate::combat::{contact_distance, in_mouth};
use crate::creature::Creature;
use crate::entity::EntityId;
use crate::food::Food;
use crate::params::SimParams;
use crate::physics::unit_or_x;
use crate::spatial_hash::SpatialIndex;

/// What a creature got out of one feeding pass.
#[derive(Clone, Debug, Default)]
pub struct FeedingReport {
    /// Raw energy removed from food.
    pub taken: f32,
    /// Energy the creature kept after conversion losses.
    pub gained: f32,
    pub eaten: Vec<EntityId>,
}

/// Burn `metabolism * dt`. Returns false once the creature is at or below its death energy.
pub fn deduct_metabolism(creature: &mut Creature, dt: f32, params: &SimParams) -> bool {
    creature.energy -= creature.dna.metabolism(params) * dt;
    creature.energy > creature.dna.death_energy(params)
}

/// Eat every touching food in the mouth cone at up to `food_eat_rate * dt` each, push
/// the rest out of the body, and drop exhausted food from the index.
pub fn feed(
    creature: &mut Creature,
    food: &mut SpatialIndex<Food>,
    candidates: &[usize],
    dt: f32,
    params: &SimParams,
) -> FeedingReport {
    let mut report = FeedingReport::default();
    let bite = creature.dna.food_eat_rate(params) * dt;
    let plant_eff = creature.dna.plant_efficiency(params);
    let meat_eff = creature.dna.meat_efficiency(params);
    let push_rate = params.creature_base.food_push_rate;
    let (pos, heading, radius) = (creature.pos, creature.heading, creature.radius());

    for &idx in candidates {
        let Some(item) = food.get_mut(idx) else {
            continue;
        };
        let offset = item.pos - pos;
        let contact = contact_distance(radius, item.radius());
        let dist = offset.length();
        if dist >= contact {
            continue;
        }

        if in_mouth(pos, heading, radius, item.pos, item.radius()) {
            let taken = bite.min(item.energy).max(0.0);
            let eff = if item.is_plant_origin { plant_eff } else { meat_eff };
            item.energy -= taken;
            creature.energy += taken * eff;
            report.taken += taken;
            report.gained += taken * eff;
            if item.energy <= 0.0 {
                report.eaten.push(item.id);
                continue;
            }
        }

        // Shrinking food may no longer overlap.
        let overlap = contact_distance(radius, item.radius()) - dist;
        if overlap > 0.0 {
            item.pos += unit_or_x(offset) * push_rate * dt * overlap;
        }
    }

    for id in &report.eaten {
        food.remove(*id);
    }
    creature.energy = creature.energy.min(creature.dna.max_energy(params));
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::{Genotype, IdAllocator};
    use crate::config;
    use crate::genome::{ColorHsv, Dna};
    use macroquad::prelude::*;

    fn test_creature(diet: f32) -> Creature {
        let params = SimParams::default();
        let mut ids = IdAllocator::new();
        let brain = Genotype::new(config::BRAIN_INPUTS, config::BRAIN_OUTPUTS, &mut ids);
        let dna = Dna::new(1.0, 1.0, 1.0, diet, brain, ColorHsv { h: 0.0, s: 1.0, v: 1.0 });
        Creature::new(EntityId(0), dna, Vec2::ZERO, 0.0, &params)
    }

    fn index_with(items: Vec<Food>) -> SpatialIndex<Food> {
        let mut index = SpatialIndex::new(config::FOOD_CELL_SCALE);
        for item in items {
            index.add(item);
        }
        index.refresh();
        index
    }

    #[test]
    fn metabolism_kills_at_threshold() {
        let params = SimParams::default();
        let mut c = test_creature(0.5);
        assert!(deduct_metabolism(&mut c, config::FIXED_DT, &params));

        c.energy = c.dna.death_energy(&params) + 1e-4;
        assert!(!deduct_metabolism(&mut c, 1.0, &params));
    }

    #[test]
    fn feeding_transfers_capped_energy() {
        let params = SimParams::default();
        let dt = config::FIXED_DT;
        let mut c = test_creature(0.5);
        c.energy = 0.5;
        let mut food = index_with(vec![Food::new(EntityId(1), vec2(0.0, 0.4), 0.0, 10.0, true)]);

        let candidates = food.query_indices(c.pos, 10.0);
        let report = feed(&mut c, &mut food, &candidates, dt, &params);

        let expected_take = (10.0f32).min(c.dna.food_eat_rate(&params) * dt);
        let eff = c.dna.plant_efficiency(&params);
        assert!((report.taken - expected_take).abs() < 1e-6);
        assert!((c.energy - (0.5 + expected_take * eff)).abs() < 1e-6);
        assert!((food.get(0).unwrap().energy - (10.0 - expected_take)).abs() < 1e-5);
    }

    #[test]
    fn gained_never_exceeds_taken() {
        let params = SimParams::default();
        let dt = config::FIXED_DT;
        for diet in [0.0, 0.3, 0.7, 1.0] {
            for plant in [true, false] {
                let mut c = test_creature(diet);
                c.energy = 0.3;
                let start = 0.04;
                let mut food =
                    index_with(vec![Food::new(EntityId(1), vec2(0.0, 0.2), 0.0, start, plant)]);
                let candidates = food.query_indices(c.pos, 10.0);
                let report = feed(&mut c, &mut food, &candidates, dt, &params);

                assert!(report.gained <= report.taken + 1e-7);
                assert!(report.taken <= start.min(c.dna.food_eat_rate(&params) * dt) + 1e-7);
                let left = food.get(0).map(|f| f.energy).unwrap_or(0.0);
                assert!((start - left - report.taken).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn exhausted_food_is_removed_immediately() {
        let params = SimParams::default();
        let mut c = test_creature(0.0);
        c.energy = 0.3;
        let mut food = index_with(vec![Food::new(EntityId(4), vec2(0.0, 0.3), 0.0, 0.01, true)]);
        let candidates = food.query_indices(c.pos, 10.0);
        let report = feed(&mut c, &mut food, &candidates, config::FIXED_DT, &params);

        assert_eq!(report.eaten, vec![EntityId(4)]);
        assert!(food.is_empty());
    }

    #[test]
    fn food_behind_is_pushed_not_eaten() {
        let params = SimParams::default();
        let mut c = test_creature(0.0);
        c.energy = 0.5;
        let mut food = index_with(vec![Food::new(EntityId(1), vec2(0.0, -0.3), 0.0, 1.0, true)]);
        let candidates = food.query_indices(c.pos, 10.0);
        let report = feed(&mut c, &mut food, &candidates, config::FIXED_DT, &params);

        assert_eq!(report.taken, 0.0);
        let item = food.get(0).unwrap();
        assert!((item.energy - 1.0).abs() < 1e-6);
        assert!(item.pos.y < -0.3);
    }

    #[test]
    fn energy_is_clamped_to_max() {
        let params = SimParams::default();
        let mut c = test_creature(0.0);
        let mut food = index_with(vec![Food::new(EntityId(1), vec2(0.0, 0.2), 0.0, 5.0, true)]);
        let candidates = food.query_indices(c.pos, 10.0);
        feed(&mut c, &mut food, &candidates, 1.0, &params);
        assert!((c.energy - c.dna.max_energy(&params)).abs() < 1e-6);
    }
}
