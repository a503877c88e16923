use ::rand::Rng;
use macroquad::prelude::*;
use serde::{Deserialize, Serialize};

use crate::brain::{Genotype, IdAllocator};
use crate::config;
use crate::params::{curve_exponent, MutationParams, SimParams};

/// Cosmetic body colour. Hue in degrees, saturation and value kept bright enough to see.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorHsv {
    pub h: f32,
    pub s: f32,
    pub v: f32,
}

impl ColorHsv {
    pub fn random(rng: &mut impl Rng) -> Self {
        Self {
            h: rng.gen_range(0.0..360.0),
            s: rng.gen_range(0.5..1.0),
            v: rng.gen_range(0.5..1.0),
        }
    }

    /// Jittered copy, each channel moved by up to `diff`. Hue is in degrees and wraps;
    /// saturation and value stay in [0.5, 1].
    pub fn randomised(&self, diff: f32, rng: &mut impl Rng) -> Self {
        let mut jitter = || rng.gen_range(-1.0f32..1.0) * diff;
        Self {
            h: (self.h + jitter()).rem_euclid(360.0),
            s: (self.s + jitter()).clamp(0.5, 1.0),
            v: (self.v + jitter()).clamp(0.5, 1.0),
        }
    }

    pub fn to_rgb(&self) -> Color {
        let c = self.v * self.s;
        let hp = self.h.rem_euclid(360.0) / 60.0;
        let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
        let (r, g, b) = match hp as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = self.v - c;
        Color::new(r + m, g + m, b + m, 1.0)
    }
}

/// Heritable part of a creature. Every energetic or behavioural constant is derived
/// from these traits and the current `SimParams`; none of it is stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dna {
    pub size: f32,
    pub speed: f32,
    pub vision: f32,
    /// 0 is a pure herbivore, 1 a pure carnivore.
    pub diet: f32,
    pub brain: Genotype,
    pub color: ColorHsv,
}

impl Dna {
    pub fn new(size: f32, speed: f32, vision: f32, diet: f32, brain: Genotype, color: ColorHsv) -> Self {
        let mut dna = Self {
            size,
            speed,
            vision,
            diet,
            brain,
            color,
        };
        dna.validate();
        dna
    }

    /// Clamp traits into their legal ranges. Idempotent.
    pub fn validate(&mut self) {
        self.diet = self.diet.clamp(0.0, 1.0);
        self.size = self.size.max(config::MIN_BODY_TRAIT);
        self.speed = self.speed.max(config::MIN_BODY_TRAIT);
        self.vision = self.vision.max(0.0);
    }

    pub fn max_energy(&self, params: &SimParams) -> f32 {
        params.creature_base.max_energy * self.size * self.size
    }

    /// Metabolism discount for meat eaters: 1 for herbivores, down to
    /// `1 - predator_metabolism_percentage` for pure carnivores.
    pub fn predator_multiplier(&self, params: &SimParams) -> f32 {
        let b = &params.creature_balances;
        1.0 - b.predator_metabolism_percentage
            * self.diet.powf(curve_exponent(b.predator_efficiency_slope))
    }

    /// Energy burned per second.
    pub fn metabolism(&self, params: &SimParams) -> f32 {
        let base = &params.creature_base;
        let body = self.size * self.size + self.vision + self.speed;
        base.metabolism * body * self.predator_multiplier(params)
            + base.metabolism_per_neuron * self.brain.hidden_count() as f32
    }

    pub fn plant_efficiency(&self, params: &SimParams) -> f32 {
        let damp = params.creature_balances.conversion_efficiency_damp_plant;
        1.0 - self.diet.powf(curve_exponent(damp))
    }

    pub fn meat_efficiency(&self, params: &SimParams) -> f32 {
        let damp = params.creature_balances.conversion_efficiency_damp_meat;
        1.0 - (1.0 - self.diet).powf(curve_exponent(damp))
    }

    pub fn vision_range(&self, params: &SimParams) -> f32 {
        params.creature_base.vision * self.vision
    }

    pub fn push_force(&self, params: &SimParams) -> f32 {
        params.creature_base.push_force * self.speed
    }

    pub fn food_eat_rate(&self, params: &SimParams) -> f32 {
        params.creature_base.food_eat_rate * self.size
    }

    pub fn plant_drag(&self, params: &SimParams) -> f32 {
        params.creature_base.plant_drag * self.size
    }

    pub fn death_energy(&self, params: &SimParams) -> f32 {
        self.max_energy(params) * params.creature_balances.death_energy_threshold
    }

    /// Perturb traits and brain in place. Brain operators each get several sub-trials
    /// at a fraction of their probability so multiple changes can land at once.
    pub fn mutate(&mut self, params: &MutationParams, ids: &mut IdAllocator, rng: &mut impl Rng) {
        let rate = params.trait_mutation_rate as f64;
        let size = params.trait_mutation_size;
        for trait_value in [
            &mut self.diet,
            &mut self.size,
            &mut self.speed,
            &mut self.vision,
        ] {
            if rng.gen_bool(rate.clamp(0.0, 1.0)) {
                *trait_value += rng.gen_range(-1.0f32..1.0) * size;
            }
        }
        if rng.gen_bool(rate.clamp(0.0, 1.0)) {
            self.color = self.color.randomised(size, rng);
        }
        self.validate();

        let trials = config::MUTATION_SUB_TRIALS;
        let chance = |p: f32| (p as f64 / trials as f64).clamp(0.0, 1.0);
        for _ in 0..trials {
            if rng.gen_bool(chance(params.synapse_mutation_probability)) {
                self.brain
                    .mutate_random_synapse(params.synapse_mutation_size, rng);
            }
            if rng.gen_bool(chance(params.synapse_growth_probability)) {
                self.brain
                    .add_random_synapse(params.synapse_growth_size, ids, rng);
            }
            if rng.gen_bool(chance(params.neuron_growth_probability)) {
                self.brain.add_random_neuron(ids, rng);
            }
            if rng.gen_bool(chance(params.synapse_prune_probability)) {
                self.brain.prune_random_synapse(rng);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_dna(size: f32, speed: f32, vision: f32, diet: f32) -> Dna {
        let mut ids = IdAllocator::new();
        let brain = Genotype::new(config::BRAIN_INPUTS, config::BRAIN_OUTPUTS, &mut ids);
        let mut dna = Dna::new(1.0, 1.0, 1.0, 0.5, brain, ColorHsv { h: 0.0, s: 1.0, v: 1.0 });
        dna.size = size;
        dna.speed = speed;
        dna.vision = vision;
        dna.diet = diet;
        dna
    }

    #[test]
    fn validate_is_idempotent() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..500 {
            let mut dna = test_dna(
                rng.gen_range(-3.0..3.0),
                rng.gen_range(-3.0..3.0),
                rng.gen_range(-3.0..3.0),
                rng.gen_range(-3.0..3.0),
            );
            dna.validate();
            let once = dna.clone();
            dna.validate();
            assert_eq!(dna, once);
            assert!((0.0..=1.0).contains(&dna.diet));
            assert!(dna.size >= config::MIN_BODY_TRAIT);
            assert!(dna.speed >= config::MIN_BODY_TRAIT);
            assert!(dna.vision >= 0.0);
        }
    }

    #[test]
    fn diet_trades_plant_for_meat_efficiency() {
        let params = SimParams::default();
        let herbivore = test_dna(1.0, 1.0, 1.0, 0.0);
        let carnivore = test_dna(1.0, 1.0, 1.0, 1.0);

        assert!((herbivore.plant_efficiency(&params) - 1.0).abs() < 1e-6);
        assert!(herbivore.meat_efficiency(&params).abs() < 1e-6);
        assert!(carnivore.plant_efficiency(&params).abs() < 1e-6);
        assert!((carnivore.meat_efficiency(&params) - 1.0).abs() < 1e-6);

        let mixed = test_dna(1.0, 1.0, 1.0, 0.5);
        assert!((mixed.plant_efficiency(&params) - 0.75).abs() < 1e-6);
        assert!((mixed.meat_efficiency(&params) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn carnivores_burn_less_energy() {
        let params = SimParams::default();
        let herbivore = test_dna(1.0, 1.0, 1.0, 0.0);
        let carnivore = test_dna(1.0, 1.0, 1.0, 1.0);

        assert!((herbivore.predator_multiplier(&params) - 1.0).abs() < 1e-6);
        assert!((carnivore.predator_multiplier(&params) - 0.5).abs() < 1e-6);
        // size² + vision + speed = 3 with no hidden neurons.
        assert!((herbivore.metabolism(&params) - 0.06).abs() < 1e-6);
        assert!((carnivore.metabolism(&params) - 0.03).abs() < 1e-6);
    }

    #[test]
    fn derived_values_scale_with_traits() {
        let params = SimParams::default();
        let small = test_dna(1.0, 1.0, 1.0, 0.5);
        let big = test_dna(2.0, 2.0, 2.0, 0.5);

        assert!((big.max_energy(&params) - 4.0 * small.max_energy(&params)).abs() < 1e-5);
        assert!(big.vision_range(&params) > small.vision_range(&params));
        assert!(big.push_force(&params) > small.push_force(&params));
        assert!(big.food_eat_rate(&params) > small.food_eat_rate(&params));
        assert!(big.plant_drag(&params) > small.plant_drag(&params));
        assert!((small.death_energy(&params) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn clone_does_not_share_the_brain() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut ids = IdAllocator::new();
        let parent = test_dna(1.0, 1.0, 1.0, 0.5);
        ids.sync_with(&parent.brain);

        let mut child = parent.clone();
        for _ in 0..20 {
            child.brain.add_random_synapse(1.0, &mut ids, &mut rng);
        }
        assert!(!child.brain.synapses.is_empty());
        assert!(parent.brain.synapses.is_empty());
    }

    #[test]
    fn mutation_jitter_is_bounded() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut ids = IdAllocator::new();
        let mut params = SimParams::default().mutation;
        params.trait_mutation_rate = 1.0;
        let parent = test_dna(1.0, 1.0, 1.0, 0.5);
        ids.sync_with(&parent.brain);

        for _ in 0..100 {
            let mut child = parent.clone();
            child.mutate(&params, &mut ids, &mut rng);
            assert!((child.size - parent.size).abs() <= params.trait_mutation_size + 1e-6);
            assert!((child.speed - parent.speed).abs() <= params.trait_mutation_size + 1e-6);
            assert!((child.vision - parent.vision).abs() <= params.trait_mutation_size + 1e-6);
            assert!((child.diet - parent.diet).abs() <= params.trait_mutation_size + 1e-6);
        }
    }

    #[test]
    fn hsv_primaries_convert() {
        let red = ColorHsv { h: 0.0, s: 1.0, v: 1.0 }.to_rgb();
        assert!((red.r - 1.0).abs() < 1e-5 && red.g.abs() < 1e-5 && red.b.abs() < 1e-5);
        let blue = ColorHsv { h: 240.0, s: 1.0, v: 1.0 }.to_rgb();
        assert!(blue.r.abs() < 1e-5 && blue.g.abs() < 1e-5 && (blue.b - 1.0).abs() < 1e-5);

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let c = ColorHsv::random(&mut rng).randomised(5.0, &mut rng);
        assert!((0.0..360.0).contains(&c.h));
        assert!((0.5..=1.0).contains(&c.s) && (0.5..=1.0).contains(&c.v));
    }

    #[test]
    fn hue_moves_by_at_most_diff_degrees() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let base = ColorHsv { h: 180.0, s: 0.75, v: 0.75 };
        for _ in 0..200 {
            let c = base.randomised(0.1, &mut rng);
            assert!((c.h - 180.0).abs() <= 0.1 + 1e-4);
        }
    }
}
