use macroquad::prelude::*;

use crate::combat::contact_distance;
use crate::config;
use crate::creature::NeighbourView;
use crate::environment::Terrain;
use crate::food::Plant;
use crate::spatial_hash::SpatialIndex;

/// Direction of `v`, or +X when `v` has no length.
pub fn unit_or_x(v: Vec2) -> Vec2 {
    let len = v.length();
    if len > 0.0 {
        v / len
    } else {
        Vec2::X
    }
}

/// Repulsion away from every solid texel within reach of the body.
/// Returns the force and whether any wall is being touched.
pub fn wall_force(pos: Vec2, radius: f32, terrain: &Terrain, bounce: f32) -> (Vec2, bool) {
    let (ci, cj) = terrain.cell_of(pos);
    let reach = (radius + 1.0) * 0.5;
    let mut force = Vec2::ZERO;
    let mut touching = false;

    let r = config::WALL_PROBE_RADIUS;
    for dj in -r..=r {
        for di in -r..=r {
            let (i, j) = (ci + di, cj + dj);
            if !terrain.is_wall_cell(i, j) {
                continue;
            }
            let center = terrain.cell_center(i, j);
            let away = pos - center;
            if away.length() < reach {
                force += unit_or_x(away) * bounce;
                touching = true;
            }
        }
    }
    (force, touching)
}

/// Soft push away from overlapping creatures, proportional to how deep the overlap is.
pub fn neighbour_push(pos: Vec2, radius: f32, neighbours: &[NeighbourView], strength: f32) -> Vec2 {
    let mut force = Vec2::ZERO;
    for other in neighbours {
        let away = pos - other.pos;
        let contact = contact_distance(radius, other.radius);
        let dist = away.length();
        if dist < contact && contact > 0.0 {
            force += unit_or_x(away) * strength * (contact - dist) / contact;
        }
    }
    force
}

pub fn touches_plant(pos: Vec2, radius: f32, plants: &SpatialIndex<Plant>) -> bool {
    let reach = config::MIN_QUERY_RADIUS.max(radius);
    plants
        .query(pos, reach)
        .iter()
        .any(|p| p.pos.distance(pos) < contact_distance(radius, p.radius))
}

/// State a rigid body needs for one integration step.
pub struct Body<'a> {
    pub pos: &'a mut Vec2,
    pub velocity: &'a mut Vec2,
    pub heading: &'a mut f32,
    pub angular_velocity: &'a mut f32,
}

/// Semi-implicit step with exponential-style drag: `v = (v + F dt)(1 - drag dt)`.
pub fn integrate(body: Body, force: Vec2, torque: f32, drag: f32, angular_drag: f32, dt: f32) {
    let damping = (1.0 - drag * dt).max(0.0);
    let angular_damping = (1.0 - angular_drag * dt).max(0.0);

    *body.velocity = (*body.velocity + force * dt) * damping;
    *body.angular_velocity = (*body.angular_velocity + torque * dt) * angular_damping;
    *body.pos += *body.velocity * dt;
    *body.heading += *body.angular_velocity * dt;
}
