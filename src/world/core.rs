use glam::Vec3;
use log::{debug, info};
use std::rc::Rc;

use super::{registry::ResourceRegistry, tracked::TrackedObject};
use crate::config::AppConfig;
use crate::physics::PhysicsWorld;
use crate::render::{
    camera::Camera, controls::OrbitControls, light::Lighting, mesh::MeshLibrary, scene::Scene,
    viewport::Viewport, Frame, NodeId,
};
use crate::utils::audio::HitSound;
use crate::utils::math::parse_hex_color;

const DEFAULT_CLEAR_COLOR: [f32; 3] = [0.149, 0.157, 0.216];

/// All mutable state of the running scene. Owned by the frame thread and
/// handed by `&mut` to spawning, syncing and resetting.
pub struct SceneContext {
    pub physics: PhysicsWorld,
    pub scene: Scene,
    pub library: MeshLibrary,
    pub registry: ResourceRegistry,
    pub camera: Camera,
    pub controls: OrbitControls,
    pub lighting: Lighting,
    pub clear_color: [f32; 3],
    viewport: Viewport,
    max_pixel_ratio: f64,
    fixed_timestep: f32,
    max_substeps: usize,
    tracked: Vec<TrackedObject>,
    hit_sound: Rc<HitSound>,
    generation: u64,
    show_debug: bool,
    floor: NodeId,
}

impl SceneContext {
    pub fn new(config: &AppConfig, hit_sound: Rc<HitSound>) -> Self {
        let rendering = &config.rendering;
        let mut library = MeshLibrary::new();
        let registry = ResourceRegistry::new(&config.spawn, rendering, &mut library);

        let mut scene = Scene::new();
        let floor = scene.instantiate(registry.floor_prefab());
        scene.add(floor);

        let max_pixel_ratio = rendering.max_pixel_ratio.max(1.0);
        Self {
            physics: PhysicsWorld::new(&config.physics),
            scene,
            library,
            registry,
            camera: Camera::from_config(rendering),
            controls: OrbitControls::from_config(rendering),
            lighting: Lighting::from_config(rendering),
            clear_color: parse_hex_color(&rendering.clear_color).unwrap_or(DEFAULT_CLEAR_COLOR),
            viewport: Viewport::new(rendering.width, rendering.height, 1.0),
            max_pixel_ratio,
            fixed_timestep: config.physics.fixed_timestep,
            max_substeps: config.physics.max_substeps,
            tracked: Vec::new(),
            hit_sound,
            generation: 0,
            show_debug: rendering.show_debug_wireframes,
            floor,
        }
    }

    pub fn tracked(&self) -> &[TrackedObject] {
        &self.tracked
    }

    pub(crate) fn track(&mut self, object: TrackedObject) {
        self.tracked.push(object);
    }

    /// Bumped by every reset. Loads issued under an older generation are
    /// no longer wanted.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn hit_sound(&self) -> &Rc<HitSound> {
        &self.hit_sound
    }

    pub fn floor_node(&self) -> NodeId {
        self.floor
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn debug_visible(&self) -> bool {
        self.show_debug
    }

    /// Shows or hides the collision wireframes of every tracked object and
    /// of objects spawned later.
    pub fn set_debug_visible(&mut self, visible: bool) {
        self.show_debug = visible;
        for object in &self.tracked {
            if let Some(node) = self.scene.node_mut(object.debug_mesh) {
                node.visible = visible;
            }
        }
    }

    /// Removes every tracked object from physics and from the scene. Loads
    /// still in flight are orphaned. Returns how many objects were removed.
    pub fn reset(&mut self) -> usize {
        let removed = self.tracked.len();
        for object in self.tracked.drain(..) {
            if let Some(listener) = object.listener {
                self.physics.unregister_collision_handler(object.body, listener);
            }
            self.physics.remove_body(object.body);
            self.scene.destroy(object.mesh);
            self.scene.destroy(object.debug_mesh);
        }
        self.generation += 1;
        if removed > 0 {
            info!("Reset removed {} objects", removed);
        } else {
            debug!("Reset with nothing to remove");
        }
        removed
    }

    /// Applies a new output size. Zero-sized updates (minimised window) are
    /// ignored. Returns whether anything changed.
    pub fn resize(&mut self, width: u32, height: u32, device_pixel_ratio: f64) -> bool {
        if width == 0 || height == 0 {
            debug!("Ignoring {}x{} resize", width, height);
            return false;
        }
        let pixel_ratio = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio.min(self.max_pixel_ratio)
        } else {
            1.0
        };
        let viewport = Viewport::new(width, height, pixel_ratio);
        if viewport == self.viewport {
            return false;
        }
        self.viewport = viewport;
        self.camera.set_aspect_ratio(viewport.aspect_ratio());
        debug!("Viewport {}x{} @ {:.2}", width, height, pixel_ratio);
        true
    }

    /// Advances physics by `elapsed` seconds of wall time using the
    /// configured step size and substep cap.
    pub fn step_physics(&mut self, elapsed: f32) -> usize {
        self.physics
            .step(self.fixed_timestep, elapsed, self.max_substeps)
    }

    /// Copies each body's pose onto its mesh and wireframe.
    pub fn sync_transforms(&mut self) {
        for object in &self.tracked {
            let Some((position, rotation)) = self.physics.transform(object.body) else {
                continue;
            };
            self.scene.set_pose(object.mesh, position, rotation);
            self.scene.set_pose(object.debug_mesh, position, rotation);
        }
    }

    pub fn update_controls(&mut self) -> bool {
        self.controls.update(&mut self.camera)
    }

    pub fn frame(&self) -> Frame<'_> {
        Frame {
            scene: &self.scene,
            library: &self.library,
            camera: &self.camera,
            lighting: &self.lighting,
            clear_color: self.clear_color,
        }
    }

    /// World-space position of a tracked object's body, if it is still alive.
    pub fn body_position(&self, object: &TrackedObject) -> Option<Vec3> {
        self.physics.transform(object.body).map(|(position, _)| position)
    }
}
