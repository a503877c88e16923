use macroquad::prelude::*;

use crate::config;
use crate::creature::NeighbourView;
use crate::entity::EntityId;

/// Unit vector a creature faces. Heading 0 looks along +Y.
pub fn forward(heading: f32) -> Vec2 {
    vec2(-heading.sin(), heading.cos())
}

/// Two round bodies touch when closer than the midpoint of their radii.
pub fn contact_distance(radius_a: f32, radius_b: f32) -> f32 {
    (radius_a + radius_b) * 0.5
}

/// True when `target` touches the body at `pos` and sits inside its forward mouth cone.
pub fn in_mouth(pos: Vec2, heading: f32, radius: f32, target: Vec2, target_radius: f32) -> bool {
    let offset = target - pos;
    if offset.length() >= contact_distance(radius, target_radius) {
        return false;
    }
    offset.normalize_or_zero().dot(forward(heading)) > config::MOUTH_CONE_DOT
}

/// Neighbours the creature could bite this tick.
pub fn targets_in_mouth(
    pos: Vec2,
    heading: f32,
    radius: f32,
    neighbours: &[NeighbourView],
) -> Vec<EntityId> {
    neighbours
        .iter()
        .filter(|n| in_mouth(pos, heading, radius, n.pos, n.radius))
        .map(|n| n.id)
        .collect()
}

/// Combat is an instant kill of everything in the mouth cone once the attack output is positive.
pub fn resolve_attack(attack: f32, targets: Vec<EntityId>) -> Vec<EntityId> {
    if attack > 0.0 {
        targets
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(id: u64, pos: Vec2) -> NeighbourView {
        NeighbourView {
            id: EntityId(id),
            pos,
            radius: 1.0,
        }
    }

    #[test]
    fn heading_zero_faces_positive_y() {
        assert!((forward(0.0) - vec2(0.0, 1.0)).length() < 1e-6);
        assert!((forward(std::f32::consts::FRAC_PI_2) - vec2(-1.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn mouth_requires_contact_and_facing() {
        assert!(in_mouth(Vec2::ZERO, 0.0, 1.0, vec2(0.0, 0.5), 1.0));
        // Behind the creature.
        assert!(!in_mouth(Vec2::ZERO, 0.0, 1.0, vec2(0.0, -0.5), 1.0));
        // Ahead but out of reach.
        assert!(!in_mouth(Vec2::ZERO, 0.0, 1.0, vec2(0.0, 1.5), 1.0));
        // Touching but off to the side.
        assert!(!in_mouth(Vec2::ZERO, 0.0, 1.0, vec2(0.5, 0.5), 1.0));
    }

    #[test]
    fn attack_only_kills_when_positive() {
        let neighbours = [view(1, vec2(0.0, 0.6)), view(2, vec2(0.0, -0.6))];
        let targets = targets_in_mouth(Vec2::ZERO, 0.0, 1.0, &neighbours);
        assert_eq!(targets, vec![EntityId(1)]);

        assert!(resolve_attack(-0.2, targets.clone()).is_empty());
        assert_eq!(resolve_attack(0.3, targets), vec![EntityId(1)]);
    }
}
