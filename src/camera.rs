use macroquad::prelude::*;

use crate::config;
use crate::creature::Creature;
use crate::entity::EntityId;
use crate::spatial_hash::SpatialIndex;

/// World view with y pointing up. `zoom` is pixels per world unit.
pub struct CameraController {
    pub target: Vec2,
    pub zoom: f32,
    pub following: Option<EntityId>,
    pub smooth_target: Vec2,
    pub smooth_zoom: f32,
    is_dragging: bool,
    drag_start: Vec2,
    drag_cam_start: Vec2,
}

impl CameraController {
    pub fn new(initial_target: Vec2) -> Self {
        Self {
            target: initial_target,
            zoom: config::CAMERA_INITIAL_ZOOM,
            following: None,
            smooth_target: initial_target,
            smooth_zoom: config::CAMERA_INITIAL_ZOOM,
            is_dragging: false,
            drag_start: Vec2::ZERO,
            drag_cam_start: Vec2::ZERO,
        }
    }

    pub fn update(&mut self, creatures: &SpatialIndex<Creature>, dt: f32) {
        if let Some(id) = self.following {
            match creatures.find(id) {
                Some(c) => self.target = c.pos,
                None => self.following = None,
            }
        }
        if self.following.is_none() {
            self.target += keyboard_pan() * config::CAMERA_PAN_SPEED / self.zoom * dt;
        }
        self.handle_drag();

        let (_, scroll_y) = mouse_wheel();
        self.zoom = scrolled_zoom(self.zoom, scroll_y);

        let t = 1.0 - (-config::CAMERA_SMOOTH_SPEED * dt).exp();
        self.smooth_target = self.smooth_target.lerp(self.target, t);
        self.smooth_zoom += (self.zoom - self.smooth_zoom) * t;
    }

    /// Middle button grabs the world. Screen y grows downwards, world y upwards.
    fn handle_drag(&mut self) {
        if is_mouse_button_pressed(MouseButton::Middle) {
            self.is_dragging = true;
            self.drag_start = Vec2::from(mouse_position());
            self.drag_cam_start = self.target;
            self.following = None;
        }
        if is_mouse_button_released(MouseButton::Middle) {
            self.is_dragging = false;
        }
        if self.is_dragging {
            self.target = dragged_target(
                self.drag_cam_start,
                self.drag_start,
                Vec2::from(mouse_position()),
                self.smooth_zoom,
            );
        }
    }

    pub fn to_macroquad_camera(&self) -> Camera2D {
        Camera2D {
            target: self.smooth_target,
            zoom: vec2(
                self.smooth_zoom / screen_width() * 2.0,
                self.smooth_zoom / screen_height() * 2.0,
            ),
            ..Default::default()
        }
    }

    pub fn screen_to_world(&self, screen_pos: Vec2) -> Vec2 {
        let cam = self.to_macroquad_camera();
        let ndc_x = (screen_pos.x / screen_width()) * 2.0 - 1.0;
        let ndc_y = -((screen_pos.y / screen_height()) * 2.0 - 1.0);
        vec2(
            self.smooth_target.x + ndc_x / cam.zoom.x,
            self.smooth_target.y + ndc_y / cam.zoom.y,
        )
    }

    pub fn mouse_world(&self) -> Vec2 {
        self.screen_to_world(Vec2::from(mouse_position()))
    }

    /// Picking tolerance, a fixed number of pixels.
    pub fn pick_radius(&self) -> f32 {
        12.0 / self.smooth_zoom
    }
}

fn scrolled_zoom(zoom: f32, scroll: f32) -> f32 {
    if scroll == 0.0 {
        return zoom;
    }
    let factor = 1.0 + scroll.signum() * config::CAMERA_ZOOM_SPEED;
    (zoom * factor).clamp(config::CAMERA_ZOOM_MIN, config::CAMERA_ZOOM_MAX)
}

/// Keeps the grabbed world point under the cursor.
fn dragged_target(cam_start: Vec2, mouse_start: Vec2, mouse: Vec2, zoom: f32) -> Vec2 {
    let moved = (mouse - mouse_start) / zoom;
    cam_start + vec2(-moved.x, moved.y)
}

/// Pan direction from WASD or the arrow keys, each axis -1, 0 or 1.
fn keyboard_pan() -> Vec2 {
    let axis = |pos: [KeyCode; 2], neg: [KeyCode; 2]| {
        let held = |keys: [KeyCode; 2]| keys.iter().any(|&k| is_key_down(k)) as i32 as f32;
        held(pos) - held(neg)
    };
    vec2(
        axis([KeyCode::D, KeyCode::Right], [KeyCode::A, KeyCode::Left]),
        axis([KeyCode::W, KeyCode::Up], [KeyCode::S, KeyCode::Down]),
    )
}
