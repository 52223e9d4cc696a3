//! Scene state and the operations that change it: spawning, syncing,
//! resetting and resizing.
pub mod core;
pub mod registry;
pub mod spawner;
pub mod sync;
pub mod tracked;

pub use self::core::SceneContext;
pub use registry::ResourceRegistry;
pub use spawner::{SpawnTicket, Spawner};
pub use sync::{tick, TickStats};
pub use tracked::TrackedObject;
