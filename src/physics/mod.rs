//! Rigid-body simulation on top of rapier3d
pub mod body;
pub mod events;
pub mod material;
pub mod world;

pub use body::{BodyDesc, BoxShape};
pub use events::{CollisionHandler, ImpactEvent, ListenerId};
pub use material::ContactMaterial;
pub use world::PhysicsWorld;

pub use rapier3d::prelude::RigidBodyHandle as BodyHandle;

/// Physics timestep (60Hz)
pub const PHYSICS_DT: f32 = 1.0 / 60.0;

/// Most fixed steps taken in one frame
pub const MAX_SUBSTEPS: usize = 3;
