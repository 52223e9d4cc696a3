use glam::{Mat4, Quat, Vec3};

use crate::config::rendering::RenderConfig;

/// Perspective camera. `fov` is the vertical field of view in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub rotation: Quat,
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(fov: f32, aspect_ratio: f32, near: f32, far: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            fov,
            aspect_ratio,
            near,
            far,
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        let aspect = config.width.max(1) as f32 / config.height.max(1) as f32;
        let mut camera = Self::new(config.fov, aspect, config.near, config.far);
        camera.position = Vec3::from(config.camera_position);
        camera.look_at(Vec3::ZERO);
        camera
    }

    /// Turns the camera so its -Z axis points at `target`.
    pub fn look_at(&mut self, target: Vec3) {
        let forward = target - self.position;
        if forward.length_squared() < f32::EPSILON {
            return;
        }
        let view = Mat4::look_at_rh(self.position, target, Vec3::Y);
        self.rotation = Quat::from_mat4(&view.inverse());
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
            self.aspect_ratio = aspect_ratio;
        }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position).inverse()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(
            self.fov.to_radians(),
            self.aspect_ratio,
            self.near,
            self.far,
        )
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_camera_looks_at_origin() {
        let camera = Camera::from_config(&RenderConfig::default());
        assert_eq!(camera.position, Vec3::ONE);
        assert!((camera.aspect_ratio - 800.0 / 600.0).abs() < 1e-6);
        let expected = (-Vec3::ONE).normalize();
        assert!(camera.forward().abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn test_view_matrix_puts_target_in_front() {
        let camera = Camera::from_config(&RenderConfig::default());
        let in_view = camera.view_matrix().transform_point3(Vec3::ZERO);
        assert!(in_view.z < 0.0);
        assert!(in_view.x.abs() < 1e-5 && in_view.y.abs() < 1e-5);
    }

    #[test]
    fn test_invalid_aspect_is_ignored() {
        let mut camera = Camera::new(75.0, 1.5, 0.1, 100.0);
        camera.set_aspect_ratio(0.0);
        camera.set_aspect_ratio(f32::NAN);
        assert_eq!(camera.aspect_ratio, 1.5);
    }
}
