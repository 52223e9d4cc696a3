use glam::Vec3;
use std::f32::consts::PI;

use super::camera::Camera;
use crate::config::rendering::RenderConfig;

const MIN_POLAR: f32 = 1e-3;

/// Orbit-style camera controller with damping.
///
/// Input only records a pending rotation/zoom. Each [`OrbitControls::update`]
/// applies `damping_factor` of what is pending and keeps the rest, so the
/// camera keeps gliding for a few frames after the pointer stops.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pending_theta: f32,
    pending_phi: f32,
    pending_scale: f32,
    dragging: bool,
    last_pointer: Option<(f64, f64)>,
}

impl OrbitControls {
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            enable_damping: true,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            pending_theta: 0.0,
            pending_phi: 0.0,
            pending_scale: 1.0,
            dragging: false,
            last_pointer: None,
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            damping_factor: config.damping_factor.clamp(0.0, 1.0),
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            ..Self::new(Vec3::ZERO)
        }
    }

    /// Queues a rotation around the vertical axis, in radians.
    pub fn rotate_left(&mut self, angle: f32) {
        self.pending_theta -= angle;
    }

    /// Queues a rotation towards the pole, in radians.
    pub fn rotate_up(&mut self, angle: f32) {
        self.pending_phi -= angle;
    }

    /// Queues a zoom. Positive steps move the camera closer.
    pub fn zoom(&mut self, steps: f32) {
        let factor = 0.95f32.powf(self.zoom_speed * steps.abs());
        if steps > 0.0 {
            self.pending_scale *= factor;
        } else if steps < 0.0 {
            self.pending_scale /= factor;
        }
    }

    pub fn pointer_down(&mut self) {
        self.dragging = true;
    }

    pub fn pointer_up(&mut self) {
        self.dragging = false;
        self.last_pointer = None;
    }

    /// Feeds a pointer position. While dragging, movement across the full
    /// viewport height turns the camera a full circle.
    pub fn pointer_moved(&mut self, x: f64, y: f64, viewport_height: u32) {
        if let (true, Some((lx, ly))) = (self.dragging, self.last_pointer) {
            let height = viewport_height.max(1) as f32;
            let dx = (x - lx) as f32;
            let dy = (y - ly) as f32;
            self.rotate_left(2.0 * PI * dx / height * self.rotate_speed);
            self.rotate_up(2.0 * PI * dy / height * self.rotate_speed);
        }
        self.last_pointer = Some((x, y));
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Moves the camera by the damped share of pending input. Returns
    /// whether the camera moved noticeably.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let offset = camera.position - self.target;
        let radius = offset.length();
        if radius < f32::EPSILON {
            return false;
        }

        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();

        let share = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };
        theta += self.pending_theta * share;
        phi = (phi + self.pending_phi * share).clamp(MIN_POLAR, PI - MIN_POLAR);

        let scale = self.pending_scale.powf(share);
        let radius = (radius * scale).clamp(self.min_distance.max(f32::EPSILON), self.max_distance);

        let new_offset = Vec3::new(
            radius * phi.sin() * theta.sin(),
            radius * phi.cos(),
            radius * phi.sin() * theta.cos(),
        );
        let moved = (new_offset - offset).length_squared() > 1e-12;
        camera.position = self.target + new_offset;
        camera.look_at(self.target);

        if self.enable_damping {
            self.pending_theta *= 1.0 - self.damping_factor;
            self.pending_phi *= 1.0 - self.damping_factor;
            self.pending_scale = self.pending_scale.powf(1.0 - self.damping_factor);
        } else {
            self.pending_theta = 0.0;
            self.pending_phi = 0.0;
            self.pending_scale = 1.0;
        }
        moved
    }
}
