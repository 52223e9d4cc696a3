pub mod audio;
pub mod core;
pub mod physics;
pub mod rendering;
pub mod spawn;

pub use audio::AudioConfig;
pub use core::AppConfig;
pub use physics::PhysicsConfig;
pub use rendering::RenderConfig;
pub use spawn::SpawnConfig;
