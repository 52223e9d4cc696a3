use log::trace;

use super::{core::SceneContext, spawner::Spawner};
use crate::render::Renderer;
use crate::utils::error::RenderError;

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub spawned: usize,
    pub substeps: usize,
    pub camera_moved: bool,
}

/// Runs one frame: apply finished loads, step physics, copy body poses onto
/// their meshes, advance the camera damping, draw.
pub fn tick(
    ctx: &mut SceneContext,
    spawner: &mut Spawner,
    renderer: &mut dyn Renderer,
    delta_time: f32,
) -> Result<TickStats, RenderError> {
    let spawned = spawner.collect(ctx);
    let substeps = ctx.step_physics(delta_time);
    ctx.sync_transforms();
    let camera_moved = ctx.update_controls();
    renderer.render(&ctx.frame())?;

    trace!(
        "tick dt={:.4} substeps={} spawned={}",
        delta_time,
        substeps,
        spawned
    );
    Ok(TickStats {
        spawned,
        substeps,
        camera_moved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::models::tests::InMemorySource;
    use crate::config::SpawnConfig;
    use crate::physics::PHYSICS_DT;
    use crate::render::HeadlessRenderer;
    use crate::world::core::tests::context;
    use glam::Vec3;
    use std::sync::Arc;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    fn spawner() -> Spawner {
        let config = SpawnConfig {
            seed: Some(9),
            ..SpawnConfig::default()
        };
        let source = InMemorySource::default().with_model(config.model.clone());
        Spawner::new(&config, Arc::new(source)).unwrap()
    }

    /// Polls until every pending load has finished without collecting it.
    fn wait_until_ready(spawner: &Spawner) {
        let start = std::time::Instant::now();
        while spawner.ready() < spawner.pending() && start.elapsed() < WAIT {
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn assert_in_sync(ctx: &SceneContext) {
        for object in ctx.tracked() {
            let (position, rotation) = ctx.physics.transform(object.body).unwrap();
            for id in [object.mesh, object.debug_mesh] {
                let t = ctx.scene.node(id).unwrap().transform;
                assert!(t.translation.abs_diff_eq(position, 1e-6));
                assert!(t.rotation.abs_diff_eq(rotation, 1e-6));
                assert_eq!(t.scale, Vec3::splat(0.01));
            }
        }
    }

    #[test]
    fn test_meshes_follow_bodies_every_tick() {
        let mut ctx = context();
        let mut spawner = spawner();
        let mut renderer = HeadlessRenderer::new();
        for _ in 0..3 {
            spawner.spawn(&ctx);
        }
        spawner.collect_blocking(&mut ctx, WAIT);

        for _ in 0..120 {
            let stats = tick(&mut ctx, &mut spawner, &mut renderer, PHYSICS_DT).unwrap();
            assert_eq!(stats.substeps, 1);
            assert_in_sync(&ctx);
        }
        assert_eq!(renderer.frames(), 120);
    }

    #[test]
    fn test_tick_collects_finished_loads() {
        let mut ctx = context();
        let mut spawner = spawner();
        let mut renderer = HeadlessRenderer::new();

        spawner.spawn(&ctx);
        wait_until_ready(&spawner);
        let stats = tick(&mut ctx, &mut spawner, &mut renderer, 0.0).unwrap();
        assert_eq!(stats.spawned, 1);
        assert_eq!(stats.substeps, 0);
        assert_eq!(ctx.tracked().len(), 1);
        assert_in_sync(&ctx);
    }

    #[test]
    fn test_spawn_count_never_drops_without_reset() {
        let mut ctx = context();
        let mut spawner = spawner();
        let mut renderer = HeadlessRenderer::new();
        let mut last = 0;
        for i in 0..30 {
            if i % 3 == 0 {
                spawner.spawn(&ctx);
            }
            tick(&mut ctx, &mut spawner, &mut renderer, 1.0 / 30.0).unwrap();
            assert!(ctx.tracked().len() >= last);
            last = ctx.tracked().len();
        }
        spawner.collect_blocking(&mut ctx, WAIT);
        assert_eq!(ctx.tracked().len(), 10);
    }

    #[test]
    fn test_reset_clears_everything_and_is_idempotent() {
        let mut ctx = context();
        let mut spawner = spawner();
        let mut renderer = HeadlessRenderer::new();
        for _ in 0..4 {
            spawner.spawn(&ctx);
        }
        spawner.collect_blocking(&mut ctx, WAIT);
        tick(&mut ctx, &mut spawner, &mut renderer, PHYSICS_DT).unwrap();

        let objects = ctx.tracked().to_vec();
        assert_eq!(ctx.reset(), 4);
        assert!(ctx.tracked().is_empty());
        assert_eq!(ctx.physics.body_count(), 0);
        for object in &objects {
            assert!(!ctx.physics.contains(object.body));
            assert_eq!(ctx.physics.listener_count(object.body), 0);
            assert!(!ctx.scene.contains(object.mesh));
            assert!(!ctx.scene.contains(object.debug_mesh));
        }
        let roots = ctx.scene.roots().to_vec();
        assert_eq!(roots, vec![ctx.floor_node()]);

        assert_eq!(ctx.reset(), 0);
        assert_eq!(ctx.scene.roots(), roots.as_slice());
        assert_eq!(ctx.physics.body_count(), 0);

        tick(&mut ctx, &mut spawner, &mut renderer, PHYSICS_DT).unwrap();
        assert_eq!(renderer.last_draws().len(), 1);
        assert_eq!(renderer.last_draws()[0].name, "floor");
    }

    #[test]
    fn test_dropped_objects_settle_on_floor() {
        let mut ctx = context();
        let mut spawner = spawner();
        let mut renderer = HeadlessRenderer::new();
        spawner.spawn(&ctx);
        spawner.collect_blocking(&mut ctx, WAIT);

        for _ in 0..600 {
            tick(&mut ctx, &mut spawner, &mut renderer, PHYSICS_DT).unwrap();
        }
        let object = ctx.tracked()[0];
        let position = ctx.body_position(&object).unwrap();
        assert!(position.y > 0.0 && position.y < 0.2, "y = {}", position.y);
        assert_in_sync(&ctx);
    }

    #[test]
    fn test_hidden_wireframes_are_not_drawn() {
        let mut ctx = context();
        let mut spawner = spawner();
        let mut renderer = HeadlessRenderer::new();
        spawner.spawn(&ctx);
        spawner.collect_blocking(&mut ctx, WAIT);

        tick(&mut ctx, &mut spawner, &mut renderer, 0.0).unwrap();
        let hidden = renderer.last_draws().len();
        ctx.set_debug_visible(true);
        tick(&mut ctx, &mut spawner, &mut renderer, 0.0).unwrap();
        assert_eq!(renderer.last_draws().len(), hidden + 2);
    }
}
