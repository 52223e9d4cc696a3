pub mod camera;
pub mod controls;
pub mod gl;
pub mod headless;
pub mod light;
pub mod mesh;
pub mod scene;
pub mod shaders;
pub mod viewport;

pub use camera::Camera;
pub use controls::OrbitControls;
pub use gl::GlRenderer;
pub use headless::HeadlessRenderer;
pub use light::Lighting;
pub use mesh::{Material, MaterialId, MeshData, MeshId, MeshLibrary};
pub use scene::{Node, NodeId, Prefab, Scene, Transform};
pub use viewport::Viewport;

use crate::utils::error::RenderError;

/// Everything a renderer needs to draw one frame.
pub struct Frame<'a> {
    pub scene: &'a Scene,
    pub library: &'a MeshLibrary,
    pub camera: &'a Camera,
    pub lighting: &'a Lighting,
    pub clear_color: [f32; 3],
}

/// Draws the scene graph from a camera.
pub trait Renderer {
    /// Called whenever the output surface changes size or density.
    fn set_viewport(&mut self, viewport: &Viewport);

    fn render(&mut self, frame: &Frame<'_>) -> Result<(), RenderError>;
}
