use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Geometry of the dropped device, in model units before `scale` is applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    pub model: PathBuf,
    pub scale: f32,
    pub body_size: [f32; 3],
    pub plug_size: [f32; 3],
    pub body_offset: f32,
    pub plug_offset: f32,
    pub mass: f32,
    /// Half-width of the square the drop point is picked from.
    pub horizontal_spread: f32,
    pub min_height: f32,
    pub max_height: f32,
    pub loader_threads: usize,
    pub seed: Option<u64>,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("assets/models/obd.gltf"),
            scale: 0.01,
            body_size: [10.0, 12.0, 6.5],
            plug_size: [8.5, 2.5, 3.5],
            body_offset: -1.8,
            plug_offset: 5.5,
            mass: 1.0,
            horizontal_spread: 0.5,
            min_height: 3.0,
            max_height: 5.0,
            loader_threads: 2,
            seed: None,
        }
    }
}
