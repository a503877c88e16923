use macroquad::prelude::*;

use crate::camera::CameraController;
use crate::creature::Creature;
use crate::environment::Terrain;
use crate::food::{Food, Plant};
use crate::simulation::SimState;

const BG_COLOR: Color = Color::new(0.02, 0.03, 0.08, 1.0);
const WALL_COLOR: Color = Color::new(0.22, 0.2, 0.18, 1.0);
const GROUND_COLOR: Color = Color::new(0.06, 0.08, 0.06, 1.0);

/// Wall grid baked into a texture, one pixel per cell.
pub struct TerrainTexture {
    texture: Texture2D,
    radius: f32,
}

impl TerrainTexture {
    pub fn new(terrain: &Terrain) -> Self {
        let side = terrain.side() as u16;
        let mut image = Image::gen_image_color(side, side, GROUND_COLOR);
        for j in 0..side as i32 {
            for i in 0..side as i32 {
                if terrain.is_wall_cell(i, j) {
                    image.set_pixel(i as u32, j as u32, WALL_COLOR);
                }
            }
        }
        let texture = Texture2D::from_image(&image);
        texture.set_filter(FilterMode::Nearest);
        Self {
            texture,
            radius: terrain.radius() as f32,
        }
    }

    fn draw(&self) {
        // Cell (i, j) is centred on (i - R + 1, j - R + 1).
        let origin = -self.radius + 0.5;
        draw_texture_ex(
            &self.texture,
            origin,
            origin,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(self.radius * 2.0, self.radius * 2.0)),
                ..Default::default()
            },
        );
    }
}

/// What the viewer wants on the HUD besides the world itself.
pub struct Overlay<'a> {
    pub selected: Option<crate::entity::EntityId>,
    pub status: &'a str,
}

pub fn draw(sim: &SimState, terrain: &TerrainTexture, camera: &CameraController, overlay: &Overlay) {
    clear_background(BG_COLOR);
    set_camera(&camera.to_macroquad_camera());

    terrain.draw();
    for plant in sim.env.plants.iter() {
        draw_plant(plant);
    }
    for food in sim.env.food.iter() {
        draw_food(food);
    }
    for creature in sim.env.creatures.iter() {
        let selected = overlay.selected == Some(creature.id);
        draw_creature(creature, selected, sim);
    }

    set_default_camera();
    draw_hud(sim, overlay);
}

fn draw_plant(plant: &Plant) {
    let shade = 0.3 + 0.5 * plant.fertility.clamp(0.0, 1.0);
    draw_circle(
        plant.pos.x,
        plant.pos.y,
        plant.radius,
        Color::new(0.1, shade, 0.15, 0.35),
    );
}

fn draw_food(food: &Food) {
    let color = if food.is_plant_origin {
        Color::new(0.2, 0.85, 0.2, 0.9)
    } else {
        Color::new(0.8, 0.3, 0.2, 0.9)
    };
    draw_circle(food.pos.x, food.pos.y, food.radius().max(0.1), color);
}

fn draw_creature(creature: &Creature, selected: bool, sim: &SimState) {
    let pos = creature.pos;
    let radius = creature.radius();
    let dir = creature.forward();
    let color = creature.dna.color.to_rgb();

    draw_circle(pos.x, pos.y, radius, color);
    let mouth = pos + dir * radius;
    draw_line(pos.x, pos.y, mouth.x, mouth.y, radius * 0.2, Color::new(0.05, 0.05, 0.05, 0.9));
    if creature.brain_output[2] > 0.0 {
        draw_circle(mouth.x, mouth.y, radius * 0.25, Color::new(1.0, 0.3, 0.1, 0.8));
    }

    if selected {
        draw_circle_lines(pos.x, pos.y, radius * 1.4, radius * 0.1, YELLOW);
        let max = creature.dna.max_energy(&sim.params);
        let frac = if max > 0.0 {
            (creature.energy / max).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let bar_y = pos.y + radius * 1.8;
        let half = radius;
        draw_line(pos.x - half, bar_y, pos.x + half, bar_y, radius * 0.15, Color::new(0.15, 0.15, 0.15, 0.6));
        draw_line(
            pos.x - half,
            bar_y,
            pos.x - half + 2.0 * half * frac,
            bar_y,
            radius * 0.15,
            Color::new(0.2, 0.9, 0.2, 0.8),
        );
    }
}

fn draw_shadowed(text: &str, x: f32, y: f32, color: Color) {
    draw_text(text, x + 1.0, y + 1.0, 18.0, Color::new(0.0, 0.0, 0.0, 0.5));
    draw_text(text, x, y, 18.0, color);
}

fn draw_hud(sim: &SimState, overlay: &Overlay) {
    let tc = Color::new(0.7, 0.75, 0.8, 1.0);
    let lines = [
        format!("FPS: {}", get_fps()),
        format!("Creatures: {}", sim.env.creatures.len()),
        format!("Food: {}", sim.env.food.len()),
        format!("Tick: {}  x{:.1}", sim.tick_count, sim.speed_multiplier),
    ];
    for (k, line) in lines.iter().enumerate() {
        draw_shadowed(line, 10.0, 20.0 + 20.0 * k as f32, tc);
    }

    if let Some(c) = overlay.selected.and_then(|id| sim.env.creatures.find(id)) {
        let info = format!(
            "#{} gen {}  energy {:.2}/{:.2}  size {:.2} speed {:.2} vision {:.2} diet {:.2}  neurons {}",
            c.id.0,
            c.generation,
            c.energy,
            c.dna.max_energy(&sim.params),
            c.dna.size,
            c.dna.speed,
            c.dna.vision,
            c.dna.diet,
            c.dna.brain.hidden_count(),
        );
        draw_shadowed(&info, 10.0, 110.0, YELLOW);
    }

    if !overlay.status.is_empty() {
        draw_shadowed(overlay.status, 10.0, screen_height() - 12.0, tc);
    }

    if sim.paused {
        let pause_text = "PAUSED (Space to resume)";
        let tw = measure_text(pause_text, None, 24, 1.0).width;
        let x = screen_width() * 0.5 - tw * 0.5;
        draw_text(pause_text, x + 1.0, 31.0, 24.0, Color::new(0.0, 0.0, 0.0, 0.5));
        draw_text(pause_text, x, 30.0, 24.0, Color::new(1.0, 0.8, 0.2, 0.9));
    }
}
