use glam::{Mat4, Vec3};

use crate::config::rendering::RenderConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: [f32; 3],
    pub intensity: f32,
}

/// Orthographic volume the directional light renders its shadow map from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowCamera {
    pub map_size: u32,
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub near: f32,
    pub far: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: Vec3,
    pub target: Vec3,
    pub cast_shadow: bool,
    pub shadow: ShadowCamera,
}

impl DirectionalLight {
    /// Unit vector pointing from the surface towards the light.
    pub fn direction(&self) -> Vec3 {
        (self.position - self.target).try_normalize().unwrap_or(Vec3::Y)
    }

    pub fn light_space_matrix(&self) -> Mat4 {
        let s = &self.shadow;
        let up = if self.direction().abs_diff_eq(Vec3::Y, 1e-4) {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let view = Mat4::look_at_rh(self.position, self.target, up);
        let projection = Mat4::orthographic_rh_gl(s.left, s.right, s.bottom, s.top, s.near, s.far);
        projection * view
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lighting {
    pub ambient: AmbientLight,
    pub sun: DirectionalLight,
}

impl Lighting {
    pub fn from_config(config: &RenderConfig) -> Self {
        let extent = config.shadow_extent;
        Self {
            ambient: AmbientLight {
                color: [1.0, 1.0, 1.0],
                intensity: config.ambient_intensity,
            },
            sun: DirectionalLight {
                color: [1.0, 1.0, 1.0],
                intensity: config.sun_intensity,
                position: Vec3::from(config.sun_position),
                target: Vec3::ZERO,
                cast_shadow: true,
                shadow: ShadowCamera {
                    map_size: config.shadow_map_size,
                    left: -extent,
                    right: extent,
                    top: extent,
                    bottom: -extent,
                    near: 0.5,
                    far: config.shadow_far,
                },
            },
        }
    }
}
