//! Renderer that draws nothing and keeps a record of what it was asked to
//! draw. Used by the tests and for running without a GL context.

use glam::Mat4;

use super::{mesh::MeshId, viewport::Viewport, Frame, Renderer};
use crate::utils::error::RenderError;

#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub name: String,
    pub mesh: MeshId,
    pub world: Mat4,
    pub cast_shadow: bool,
}

#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    viewport: Option<Viewport>,
    frames: u64,
    last_draws: Vec<DrawRecord>,
    last_view_projection: Mat4,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn last_draws(&self) -> &[DrawRecord] {
        &self.last_draws
    }

    pub fn last_view_projection(&self) -> Mat4 {
        self.last_view_projection
    }
}

impl Renderer for HeadlessRenderer {
    fn set_viewport(&mut self, viewport: &Viewport) {
        self.viewport = Some(*viewport);
    }

    fn render(&mut self, frame: &Frame<'_>) -> Result<(), RenderError> {
        self.last_draws.clear();
        frame.scene.visit_visible(|node, world| {
            if let Some(mesh) = node.mesh {
                self.last_draws.push(DrawRecord {
                    name: node.name.clone(),
                    mesh,
                    world,
                    cast_shadow: node.cast_shadow,
                });
            }
        });
        self.last_view_projection = frame.camera.view_projection();
        self.frames += 1;
        Ok(())
    }
}
