pub mod assets;
pub mod config;
pub mod engine;
pub mod physics;
pub mod render;
pub mod ui;
pub mod utils;
pub mod world;

// Re-export commonly used types
pub use assets::{AssetLoader, GltfSource, ModelAsset, ModelSource};
pub use config::core::{AppConfig, LogLevel};
pub use engine::{Engine, EngineStats, FrameClock};
pub use physics::{
    BodyDesc, BodyHandle, BoxShape, CollisionHandler, ContactMaterial, ImpactEvent, PhysicsWorld,
};
pub use render::{Camera, GlRenderer, HeadlessRenderer, Renderer, Scene, Viewport};
pub use ui::{DebugCommand, DebugPanel};
pub use utils::audio::{HitSound, HitSoundHandler};
pub use utils::error::{EngineError, Result};
pub use world::{SceneContext, SpawnTicket, Spawner, TrackedObject};
