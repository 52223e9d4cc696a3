use crate::physics::{BodyHandle, ListenerId};
use crate::render::NodeId;

/// One dropped object: its visual, its physics body and the wireframe that
/// outlines the body's collision boxes.
///
/// After every sync step `mesh`, `body` and `debug_mesh` share the same
/// position and orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedObject {
    pub mesh: NodeId,
    pub body: BodyHandle,
    pub debug_mesh: NodeId,
    pub listener: Option<ListenerId>,
}
