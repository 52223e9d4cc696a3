//! Debug overlay drawn with egui on top of the scene.
pub mod debug;

pub use debug::{command_for_key, DebugCommand, DebugPanel, DebugState};
