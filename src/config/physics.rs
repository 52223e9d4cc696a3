use serde::{Deserialize, Serialize};

use crate::physics::{MAX_SUBSTEPS, PHYSICS_DT};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: [f32; 3],
    /// Nominal simulation step in seconds.
    pub fixed_timestep: f32,
    /// Upper bound on fixed steps taken per frame; backlog beyond it is dropped.
    pub max_substeps: usize,
    pub allow_sleep: bool,
    pub friction: f32,
    pub restitution: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, -9.82, 0.0],
            fixed_timestep: PHYSICS_DT,
            max_substeps: MAX_SUBSTEPS,
            allow_sleep: true,
            friction: 0.1,
            restitution: 0.7,
        }
    }
}
