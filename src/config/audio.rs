use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub enabled: bool,
    pub hit_sound: PathBuf,
    /// Minimum impact speed along the contact normal that makes a sound.
    pub impact_threshold: f32,
    /// Exclusive upper bound of the random playback volume.
    pub max_volume: f32,
    pub seed: Option<u64>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hit_sound: PathBuf::from("assets/sounds/hit.wav"),
            impact_threshold: 1.5,
            max_volume: 0.5,
            seed: None,
        }
    }
}
