use glam::Vec3;
use log::{debug, error, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use super::{core::SceneContext, tracked::TrackedObject};
use crate::assets::{AssetLoader, LoadResult, ModelAsset, ModelSource};
use crate::config::SpawnConfig;
use crate::render::scene::Node;
use crate::utils::audio::HitSoundHandler;
use crate::utils::error::AssetError;

/// Receipt for a queued spawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnTicket {
    pub id: u64,
    /// Scene generation at the time of the request.
    pub generation: u64,
    /// Where the object will appear once its model has loaded.
    pub position: Vec3,
}

/// Drops new objects into the scene. Spawning only queues a model load;
/// the object is built when the load is collected on the frame thread.
pub struct Spawner {
    model: PathBuf,
    spread: f32,
    min_height: f32,
    max_height: f32,
    rng: ChaCha8Rng,
    loader: AssetLoader<SpawnTicket>,
    next_id: u64,
}

impl Spawner {
    pub fn new(config: &SpawnConfig, source: Arc<dyn ModelSource>) -> Result<Self, AssetError> {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Ok(Self {
            model: config.model.clone(),
            spread: config.horizontal_spread.abs(),
            min_height: config.min_height.min(config.max_height),
            max_height: config.max_height.max(config.min_height),
            rng,
            loader: AssetLoader::new(source, config.loader_threads)?,
            next_id: 0,
        })
    }

    /// Random drop point: `x` and `z` in `[-spread, spread)`, `y` in
    /// `[min_height, max_height)`.
    pub fn drop_position(&mut self) -> Vec3 {
        let mut horizontal = || (self.rng.gen::<f32>() * 2.0 - 1.0) * self.spread;
        let x = horizontal();
        let z = horizontal();
        let y = self.min_height + self.rng.gen::<f32>() * (self.max_height - self.min_height);
        Vec3::new(x, y, z)
    }

    /// Picks a drop point and queues the model load.
    pub fn spawn(&mut self, ctx: &SceneContext) -> SpawnTicket {
        let ticket = SpawnTicket {
            id: self.next_id,
            generation: ctx.generation(),
            position: self.drop_position(),
        };
        self.next_id += 1;
        self.loader.request(self.model.clone(), ticket);
        debug!("Spawn #{} queued at {:?}", ticket.id, ticket.position);
        ticket
    }

    /// Loads requested but not yet collected.
    pub fn pending(&self) -> usize {
        self.loader.pending()
    }

    /// Loads finished but not yet collected.
    pub fn ready(&self) -> usize {
        self.loader.ready()
    }

    /// Builds an object for every finished load. Returns how many were added.
    pub fn collect(&mut self, ctx: &mut SceneContext) -> usize {
        let done = self.loader.drain();
        Self::apply_all(ctx, done)
    }

    /// Blocks until every pending load finishes (or `timeout` passes), then
    /// builds the objects.
    pub fn collect_blocking(&mut self, ctx: &mut SceneContext, timeout: Duration) -> usize {
        let done = self.loader.wait_idle(timeout);
        Self::apply_all(ctx, done)
    }

    fn apply_all(ctx: &mut SceneContext, done: Vec<LoadResult<SpawnTicket>>) -> usize {
        let mut added = 0;
        for LoadResult { tag, path, result } in done {
            if tag.generation != ctx.generation() {
                debug!("Discarding spawn #{} issued before a reset", tag.id);
                continue;
            }
            match result {
                Ok(asset) => {
                    let object = complete(ctx, &tag, &asset);
                    info!("Spawned object #{} at {:?}", tag.id, tag.position);
                    ctx.track(object);
                    added += 1;
                }
                Err(e) => error!("Failed to load {}: {}", path.display(), e),
            }
        }
        added
    }
}

fn complete(ctx: &mut SceneContext, ticket: &SpawnTicket, asset: &ModelAsset) -> TrackedObject {
    let scale = Vec3::splat(ctx.registry.scale());
    let show_debug = ctx.debug_visible();

    let debug_mesh = ctx.scene.instantiate(ctx.registry.wireframe_prefab());
    if let Some(node) = ctx.scene.node_mut(debug_mesh) {
        node.transform.scale = scale;
        node.transform.translation = ticket.position;
        node.visible = show_debug;
    }

    let prefab = ctx.registry.model_prefab(asset, &mut ctx.library).clone();
    let mesh = ctx.scene.instantiate(&prefab);
    if let Some(node) = ctx.scene.node_mut(mesh) {
        node.transform.scale = scale;
        node.transform.translation = ticket.position;
    }
    ctx.scene.traverse_mut(mesh, &mut |node: &mut Node| {
        if node.is_renderable() {
            node.cast_shadow = true;
        }
    });

    ctx.scene.add(mesh);
    ctx.scene.add(debug_mesh);

    let desc = ctx
        .registry
        .body_template(ctx.physics.material())
        .at(ticket.position);
    let body = ctx.physics.add_body(desc);
    let handler = HitSoundHandler::new(Rc::clone(ctx.hit_sound()));
    let listener = ctx.physics.register_collision_handler(body, Box::new(handler));

    TrackedObject {
        mesh,
        body,
        debug_mesh,
        listener,
    }
}
