use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
    pub max_pixel_ratio: f64,
    pub clear_color: String,

    // Camera
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub camera_position: [f32; 3],
    pub damping_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,

    // Floor
    pub floor_size: f32,
    pub floor_color: String,
    pub floor_roughness: f32,
    pub floor_metalness: f32,

    // Lights
    pub ambient_intensity: f32,
    pub sun_intensity: f32,
    pub sun_position: [f32; 3],
    pub shadow_map_size: u32,
    pub shadow_extent: f32,
    pub shadow_far: f32,

    pub show_debug_wireframes: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            vsync: true,
            max_pixel_ratio: 2.0,
            clear_color: "#262837".to_string(),
            fov: 75.0,
            near: 0.1,
            far: 100.0,
            camera_position: [1.0, 1.0, 1.0],
            damping_factor: 0.05,
            min_distance: 0.2,
            max_distance: 30.0,
            floor_size: 10.0,
            floor_color: "#444444".to_string(),
            floor_roughness: 0.5,
            floor_metalness: 0.0,
            ambient_intensity: 0.8,
            sun_intensity: 0.6,
            sun_position: [5.0, 5.0, 5.0],
            shadow_map_size: 1024,
            shadow_extent: 7.0,
            shadow_far: 15.0,
            show_debug_wireframes: false,
        }
    }
}
