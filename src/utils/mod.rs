pub mod audio;
pub mod error;
pub mod math;

pub use audio::{HitSound, HitSoundHandler};
pub use error::{AssetError, ConfigError, EngineError, RenderError, Result};
