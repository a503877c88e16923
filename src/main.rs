use std::path::Path;

use macroquad::prelude::*;

mod brain;
mod camera;
mod combat;
mod config;
mod creature;
mod energy;
mod entity;
mod environment;
mod food;
mod genome;
mod params;
mod physics;
mod renderer;
mod reproduction;
mod save_load;
mod sensory;
mod simulation;
mod spatial_hash;
mod stats;

use camera::CameraController;
use entity::EntityId;
use renderer::{Overlay, TerrainTexture};
use simulation::SimState;

fn window_conf() -> Conf {
    Conf {
        window_title: "Terrarium".to_string(),
        window_width: 1280,
        window_height: 800,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

const DIGIT_KEYS: [KeyCode; 10] = [
    KeyCode::Key0,
    KeyCode::Key1,
    KeyCode::Key2,
    KeyCode::Key3,
    KeyCode::Key4,
    KeyCode::Key5,
    KeyCode::Key6,
    KeyCode::Key7,
    KeyCode::Key8,
    KeyCode::Key9,
];

fn pressed_digit() -> Option<u8> {
    DIGIT_KEYS
        .iter()
        .position(|&k| is_key_pressed(k))
        .map(|d| d as u8)
}

/// Viewer-side state that is not part of the simulation.
struct Viewer {
    camera: CameraController,
    terrain: TerrainTexture,
    selected: Option<EntityId>,
    status: String,
}

impl Viewer {
    fn new(sim: &SimState) -> Self {
        Self {
            camera: CameraController::new(Vec2::ZERO),
            terrain: TerrainTexture::new(&sim.env.terrain),
            selected: None,
            status: String::new(),
        }
    }

    fn report(&mut self, message: String) {
        log::info!("{message}");
        self.status = message;
    }

    fn fail(&mut self, message: String) {
        log::warn!("{message}");
        self.status = message;
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let params = save_load::load_params_or_default(Path::new(config::PARAMS_FILE));
    log::info!(
        "Starting with map radius {}, {} creatures",
        params.map.map_radius,
        params.map.initial_creatures
    );
    log::debug!("Parameters: {params:?}");

    let mut sim = SimState::new(params, config::DEFAULT_SEED);
    let mut viewer = Viewer::new(&sim);
    let mut accumulator = 0.0f64;
    let mut autosave_timer = 0.0f64;

    loop {
        let frame_time = get_frame_time() as f64;
        accumulator += frame_time.min(0.1);

        if !sim.paused {
            autosave_timer += frame_time;
            if autosave_timer >= config::AUTOSAVE_INTERVAL {
                autosave_timer = 0.0;
                match save_load::save_world(&sim, Path::new(config::AUTOSAVE_FILE)) {
                    Ok(()) => log::info!("Autosaved to {} (tick {})", config::AUTOSAVE_FILE, sim.tick_count),
                    Err(e) => log::warn!("Autosave failed: {e}"),
                }
            }
        }

        let effective_dt = config::FIXED_DT as f64 / sim.speed_multiplier as f64;
        if !sim.paused {
            while accumulator >= effective_dt {
                sim.tick();
                accumulator -= effective_dt;
            }
        } else {
            accumulator = 0.0;
        }

        viewer.camera.update(&sim.env.creatures, get_frame_time());
        if let Some(loaded) = handle_input(&mut sim, &mut viewer) {
            sim = loaded;
            viewer = Viewer::new(&sim);
        }

        let overlay = Overlay {
            selected: viewer.selected,
            status: &viewer.status,
        };
        renderer::draw(&sim, &viewer.terrain, &viewer.camera, &overlay);

        next_frame().await;
    }
}

/// Apply this frame's key and mouse commands. Returns a replacement world after a load.
fn handle_input(sim: &mut SimState, viewer: &mut Viewer) -> Option<SimState> {
    let mouse = viewer.camera.mouse_world();
    if viewer.selected.is_some_and(|id| sim.env.creatures.find(id).is_none()) {
        viewer.selected = None;
    }

    if is_mouse_button_pressed(MouseButton::Left) {
        viewer.selected = sim.creature_at(mouse, viewer.camera.pick_radius());
        viewer.camera.following = None;
    }
    if is_key_pressed(KeyCode::Escape) {
        viewer.selected = None;
        viewer.camera.following = None;
    }
    if is_key_pressed(KeyCode::Space) {
        sim.paused = !sim.paused;
    }
    if is_key_pressed(KeyCode::Equal) {
        sim.speed_multiplier = (sim.speed_multiplier * 2.0).min(16.0);
    }
    if is_key_pressed(KeyCode::Minus) {
        sim.speed_multiplier = (sim.speed_multiplier * 0.5).max(0.25);
    }

    let ctrl = is_key_down(KeyCode::LeftControl) || is_key_down(KeyCode::RightControl);
    if ctrl {
        let path = Path::new(config::SNAPSHOT_FILE);
        if is_key_pressed(KeyCode::S) {
            match save_load::save_world(sim, path) {
                Ok(()) => viewer.report(format!("Saved to {}", path.display())),
                Err(e) => viewer.fail(format!("Save failed: {e}")),
            }
        }
        if is_key_pressed(KeyCode::L) {
            match save_load::load_world(path) {
                Ok(loaded) => {
                    log::info!("Loaded {} (tick {})", path.display(), loaded.tick_count);
                    return Some(loaded);
                }
                Err(e) => viewer.fail(format!("Load failed: {e}")),
            }
        }
        return None;
    }

    if is_key_pressed(KeyCode::T) {
        let density = sim.params.map.initial_food_density;
        let placed = sim.scatter_food(density);
        viewer.report(format!("Scattered {placed} food"));
    }
    if is_key_pressed(KeyCode::B) {
        let dna = sim.random_dna();
        let id = sim.spawn_creature(dna, mouse);
        viewer.selected = Some(id);
    }
    if is_key_pressed(KeyCode::L) {
        sim.reload_params(Path::new(config::PARAMS_FILE));
        viewer.status = "Parameters reloaded".to_string();
    }
    if is_key_pressed(KeyCode::N) {
        let seed = (macroquad::miniquad::date::now() * 1000.0) as u64;
        sim.regenerate_world(seed);
        viewer.terrain = TerrainTexture::new(&sim.env.terrain);
        viewer.selected = None;
    }
    if is_key_down(KeyCode::I) {
        if let Some(slot) = pressed_digit() {
            let path = save_load::genome_slot_path(slot);
            match sim.import_creature(&path, mouse) {
                Ok(id) => {
                    viewer.selected = Some(id);
                    viewer.report(format!("Imported slot {slot}"));
                }
                Err(e) => viewer.fail(format!("Import failed: {e}")),
            }
        }
    }

    let Some(id) = viewer.selected else {
        return None;
    };
    if is_key_pressed(KeyCode::K) {
        sim.kill(id);
        viewer.selected = None;
    }
    if is_key_pressed(KeyCode::C) {
        viewer.selected = sim.clone_creature(id);
    }
    if is_key_pressed(KeyCode::F) {
        sim.feed(id);
    }
    if is_key_down(KeyCode::G) {
        sim.reposition(id, mouse);
    }
    if is_key_pressed(KeyCode::R) {
        sim.randomize_color(id);
    }
    if is_key_pressed(KeyCode::V) {
        viewer.camera.following = Some(id);
    }
    if is_key_down(KeyCode::O) {
        if let Some(slot) = pressed_digit() {
            let path = save_load::genome_slot_path(slot);
            match sim.export_creature(id, &path) {
                Ok(_) => viewer.report(format!("Exported to slot {slot}")),
                Err(e) => viewer.fail(format!("Export failed: {e}")),
            }
        }
    }
    None
}
