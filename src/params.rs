use serde::{Deserialize, Serialize};

/// Tunable simulation knobs. Built once and handed to the formulas by reference;
/// a reload produces a fresh value that replaces the old one wholesale.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    pub map: MapParams,
    pub plants: PlantParams,
    pub environment: EnvironmentParams,
    pub creature_base: CreatureBaseMultipliers,
    pub creature_balances: CreatureBalances,
    pub mutation: MutationParams,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapParams {
    /// Half the side length of the wall grid, in world units.
    pub map_radius: usize,
    pub initial_creatures: usize,
    /// Scales how eagerly free cells receive a plant.
    pub plant_density: f32,
    /// Food items per unit area scattered at startup.
    pub initial_food_density: f32,
}

impl Default for MapParams {
    fn default() -> Self {
        Self {
            map_radius: 100,
            initial_creatures: 60,
            plant_density: 0.3,
            initial_food_density: 0.01,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantParams {
    /// Mean seconds between food growths on a single plant.
    pub food_growth_delay: f32,
    /// Energy of food grown on a plant with fertility 1.
    pub grown_food_energy: f32,
}

impl Default for PlantParams {
    fn default() -> Self {
        Self {
            food_growth_delay: 30.0,
            grown_food_energy: 5.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentParams {
    /// Energy lost by every food item per second.
    pub food_decay_rate: f32,
    /// Seconds between brain evaluations of a single creature.
    pub brain_update_delay: f32,
}

impl Default for EnvironmentParams {
    fn default() -> Self {
        Self {
            food_decay_rate: 0.02,
            brain_update_delay: 0.1,
        }
    }
}

/// Values a creature would have if the matching trait were exactly 1.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatureBaseMultipliers {
    pub max_energy: f32,
    pub push_force: f32,
    pub metabolism: f32,
    pub metabolism_per_neuron: f32,
    pub vision: f32,
    pub plant_drag: f32,
    pub food_eat_rate: f32,
    pub drag: f32,
    pub angular_drag: f32,
    pub rotate_force: f32,
    pub wall_bounce_force: f32,
    pub wall_contact_drag: f32,
    pub neighbor_push_force: f32,
    pub food_push_rate: f32,
}

impl Default for CreatureBaseMultipliers {
    fn default() -> Self {
        Self {
            max_energy: 1.0,
            push_force: 20.0,
            metabolism: 0.02,
            metabolism_per_neuron: 0.001,
            vision: 10.0,
            plant_drag: 3.0,
            food_eat_rate: 5.0,
            drag: 8.0,
            angular_drag: 7.0,
            rotate_force: 10.0,
            wall_bounce_force: 100.0,
            wall_contact_drag: 0.2,
            neighbor_push_force: 10.0,
            food_push_rate: 15.0,
        }
    }
}

/// Curve shapes, all in [0, 1).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatureBalances {
    pub conversion_efficiency_damp_plant: f32,
    pub conversion_efficiency_damp_meat: f32,
    /// Fraction of max energy below which a creature dies.
    pub death_energy_threshold: f32,
    /// 0 gives a linear predator discount; near 1 only pure carnivores get it.
    pub predator_efficiency_slope: f32,
    /// Largest metabolism discount a pure carnivore receives.
    pub predator_metabolism_percentage: f32,
}

impl Default for CreatureBalances {
    fn default() -> Self {
        Self {
            conversion_efficiency_damp_plant: 0.5,
            conversion_efficiency_damp_meat: 0.5,
            death_energy_threshold: 0.2,
            predator_efficiency_slope: 0.7,
            predator_metabolism_percentage: 0.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationParams {
    pub trait_mutation_rate: f32,
    pub trait_mutation_size: f32,
    pub synapse_mutation_probability: f32,
    pub synapse_mutation_size: f32,
    pub synapse_growth_probability: f32,
    pub synapse_growth_size: f32,
    pub neuron_growth_probability: f32,
    pub synapse_prune_probability: f32,
}

impl Default for MutationParams {
    fn default() -> Self {
        Self {
            trait_mutation_rate: 0.1,
            trait_mutation_size: 0.1,
            synapse_mutation_probability: 0.5,
            synapse_mutation_size: 0.2,
            synapse_growth_probability: 0.2,
            synapse_growth_size: 0.5,
            neuron_growth_probability: 0.05,
            synapse_prune_probability: 0.1,
        }
    }
}

/// Exponent `1 / (1 - slope)` used by the balance curves, kept finite for slopes at or above 1.
pub fn curve_exponent(slope: f32) -> f32 {
    1.0 / (1.0 - slope).max(0.01)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_group_defaults() {
        let json = r#"{ "map": { "map_radius": 40 }, "plants": { "grown_food_energy": 9.0 } }"#;
        let params: SimParams = serde_json::from_str(json).unwrap();

        assert_eq!(params.map.map_radius, 40);
        assert_eq!(params.map.initial_creatures, MapParams::default().initial_creatures);
        assert!((params.plants.grown_food_energy - 9.0).abs() < 1e-6);
        assert_eq!(params.mutation, MutationParams::default());
    }

    #[test]
    fn curve_exponent_stays_finite() {
        assert!((curve_exponent(0.0) - 1.0).abs() < 1e-6);
        assert!((curve_exponent(0.5) - 2.0).abs() < 1e-6);
        assert!(curve_exponent(1.0).is_finite());
        assert!(curve_exponent(3.0).is_finite());
    }
}
