use macroquad::prelude::*;

use crate::combat::forward;
use crate::config;
use crate::creature::NeighbourView;
use crate::environment::Terrain;
use crate::food::Food;

/// Latest perception of one creature, one slot per sensor in the fan. All values are
/// in [0, 1]; nothing detected reads as 0.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SensorReadings {
    pub food: [f32; config::NUM_SENSORS],
    pub animal: [f32; config::NUM_SENSORS],
    pub wall: [f32; config::NUM_SENSORS],
}

/// What the sensing creature brings to the calculation.
pub struct Observer {
    pub pos: Vec2,
    pub heading: f32,
    pub vision: f32,
    pub plant_efficiency: f32,
    pub meat_efficiency: f32,
    pub max_energy: f32,
}

/// Angles relative to the heading, evenly spread over the field of view.
pub fn sensor_angles() -> [f32; config::NUM_SENSORS] {
    let mut angles = [0.0; config::NUM_SENSORS];
    let n = config::NUM_SENSORS;
    for (k, angle) in angles.iter_mut().enumerate() {
        *angle = if n > 1 {
            -config::SENSOR_FOV * 0.5 + config::SENSOR_FOV * k as f32 / (n - 1) as f32
        } else {
            0.0
        };
    }
    angles
}

fn cone_tolerance_factor(angles: &[f32]) -> f32 {
    let step = if angles.len() > 1 {
        (angles[1] - angles[0]).abs()
    } else {
        config::SENSOR_FOV
    };
    step.sin().abs() * 0.5
}

/// Distance to the first wall along `dir`, sampled in fixed steps up to `vision`.
pub fn wall_distance(terrain: &Terrain, pos: Vec2, dir: Vec2, vision: f32) -> Option<f32> {
    let steps = (vision * config::WALL_SAMPLES_PER_UNIT).round() as usize;
    if steps == 0 {
        return None;
    }
    let step = vision / steps as f32;
    (0..=steps)
        .map(|k| step * k as f32)
        .find(|&d| terrain.sample_wall_at(pos + dir * d, false))
}

/// Within the sensor cone, the tolerance widens linearly with distance.
fn in_cone(dir: Vec2, offset: Vec2, dist: f32, tolerance: f32) -> bool {
    offset.dot(dir) > 0.0 && dir.perp_dot(offset).abs() <= tolerance * dist
}

/// Cast the whole sensor fan. Walls occlude food and animals behind them.
pub fn sense<'a>(
    observer: &Observer,
    angles: &[f32; config::NUM_SENSORS],
    terrain: &Terrain,
    food: impl Iterator<Item = &'a Food> + Clone,
    neighbours: &[NeighbourView],
) -> SensorReadings {
    let mut readings = SensorReadings::default();
    let vision = observer.vision;
    if vision <= 0.0 {
        return readings;
    }
    let tolerance = cone_tolerance_factor(angles);

    for (k, &angle) in angles.iter().enumerate() {
        let dir = forward(observer.heading + angle);

        let wall = wall_distance(terrain, observer.pos, dir, vision);
        if let Some(d) = wall {
            readings.wall[k] = 1.0 - d / vision;
        }
        let visible_limit = wall.map_or(f32::INFINITY, |d| d - config::SENSOR_OCCLUSION_MARGIN);
        let visible = |target: Vec2| -> Option<f32> {
            let offset = target - observer.pos;
            let dist = offset.length();
            (dist < vision && dist < visible_limit && in_cone(dir, offset, dist, tolerance))
                .then_some(dist)
        };

        let closest_food = food
            .clone()
            .filter_map(|f| visible(f.pos).map(|d| (d, f)))
            .min_by(|a, b| a.0.total_cmp(&b.0));
        if let Some((dist, item)) = closest_food {
            let eff = if item.is_plant_origin {
                observer.plant_efficiency
            } else {
                observer.meat_efficiency
            };
            let worth = if observer.max_energy > 0.0 {
                (item.energy * eff / observer.max_energy).min(1.0)
            } else {
                0.0
            };
            readings.food[k] = ((1.0 - dist / vision) * eff * worth).max(0.0);
        }

        let closest_animal = neighbours
            .iter()
            .filter_map(|n| visible(n.pos))
            .min_by(|a, b| a.total_cmp(b));
        if let Some(dist) = closest_animal {
            readings.animal[k] = 1.0 - dist / vision;
        }
    }
    readings
}

/// Sensor values followed by depth fraction, outward alignment and a bias of 1.
pub fn brain_inputs(
    readings: &SensorReadings,
    pos: Vec2,
    heading: f32,
    map_radius: f32,
) -> [f32; config::BRAIN_INPUTS] {
    let mut inputs = [0.0; config::BRAIN_INPUTS];
    let n = config::NUM_SENSORS;
    inputs[..n].copy_from_slice(&readings.food);
    inputs[n..2 * n].copy_from_slice(&readings.animal);
    inputs[2 * n..3 * n].copy_from_slice(&readings.wall);

    let depth = if map_radius > 0.0 {
        pos.length() / map_radius
    } else {
        0.0
    };
    let outward = pos.normalize_or_zero().dot(forward(heading));
    inputs[3 * n] = depth;
    inputs[3 * n + 1] = outward;
    inputs[3 * n + 2] = 1.0;
    inputs
}
