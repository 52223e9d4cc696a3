use log::info;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use crate::{
    assets::ModelSource,
    config::AppConfig,
    render::Renderer,
    ui::{DebugCommand, DebugState},
    utils::{
        audio::HitSound,
        error::{RenderError, Result},
    },
    world::{sync, SceneContext, SpawnTicket, Spawner, TickStats},
};

/// Measures wall time between frames.
#[derive(Debug, Default)]
pub struct FrameClock {
    last: Option<Instant>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous call; zero on the first call.
    pub fn delta(&mut self) -> f32 {
        let now = Instant::now();
        let delta = self
            .last
            .map_or(0.0, |last| now.duration_since(last).as_secs_f32());
        self.last = Some(now);
        delta
    }
}

/// Owns the scene, the spawner and a renderer, and exposes the operations
/// the host window drives: frames, spawns, resets, resizes.
pub struct Engine<R: Renderer> {
    ctx: SceneContext,
    spawner: Spawner,
    renderer: R,
    clock: FrameClock,
    frame_count: u64,
    fps: f32,
}

impl<R: Renderer> Engine<R> {
    pub fn new(
        config: &AppConfig,
        mut renderer: R,
        source: Arc<dyn ModelSource>,
        hit_sound: Rc<HitSound>,
    ) -> Result<Self> {
        let ctx = SceneContext::new(config, hit_sound);
        let spawner = Spawner::new(&config.spawn, source)?;
        renderer.set_viewport(&ctx.viewport());
        info!(
            "Engine ready: model {}, {} loader threads",
            config.spawn.model.display(),
            config.spawn.loader_threads.max(1)
        );
        Ok(Self {
            ctx,
            spawner,
            renderer,
            clock: FrameClock::new(),
            frame_count: 0,
            fps: 0.0,
        })
    }

    /// Runs one frame with the time elapsed since the previous frame.
    pub fn frame(&mut self) -> std::result::Result<TickStats, RenderError> {
        let delta = self.clock.delta();
        if delta > 0.0 {
            let instant = 1.0 / delta;
            self.fps = if self.fps > 0.0 {
                self.fps * 0.9 + instant * 0.1
            } else {
                instant
            };
        }
        self.tick(delta)
    }

    /// Runs one frame with an explicit time step.
    pub fn tick(&mut self, delta_time: f32) -> std::result::Result<TickStats, RenderError> {
        let stats = sync::tick(&mut self.ctx, &mut self.spawner, &mut self.renderer, delta_time)?;
        self.frame_count += 1;
        Ok(stats)
    }

    pub fn spawn(&mut self) -> SpawnTicket {
        self.spawner.spawn(&self.ctx)
    }

    pub fn reset(&mut self) -> usize {
        self.ctx.reset()
    }

    /// Forwards a new window size to the camera and the renderer.
    pub fn resize(&mut self, width: u32, height: u32, device_pixel_ratio: f64) -> bool {
        let changed = self.ctx.resize(width, height, device_pixel_ratio);
        if changed {
            self.renderer.set_viewport(&self.ctx.viewport());
        }
        changed
    }

    pub fn handle(&mut self, command: DebugCommand) {
        match command {
            DebugCommand::Spawn => {
                self.spawn();
            }
            DebugCommand::Reset => {
                self.reset();
            }
            DebugCommand::SetWireframes(visible) => self.ctx.set_debug_visible(visible),
        }
    }

    pub fn debug_state(&self) -> DebugState {
        DebugState {
            objects: self.ctx.tracked().len(),
            pending_loads: self.spawner.pending(),
            wireframes: self.ctx.debug_visible(),
            fps: self.fps,
        }
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            frame_count: self.frame_count,
            tracked_objects: self.ctx.tracked().len(),
            bodies: self.ctx.physics.body_count(),
            sleeping_bodies: self
                .ctx
                .tracked()
                .iter()
                .filter(|o| self.ctx.physics.is_sleeping(o.body))
                .count(),
            pending_loads: self.spawner.pending(),
            scene_nodes: self.ctx.scene.node_count(),
        }
    }

    pub fn context(&self) -> &SceneContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut SceneContext {
        &mut self.ctx
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EngineStats {
    pub frame_count: u64,
    pub tracked_objects: usize,
    pub bodies: usize,
    pub sleeping_bodies: usize,
    pub pending_loads: usize,
    pub scene_nodes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::models::tests::InMemorySource;
    use crate::physics::PHYSICS_DT;
    use crate::render::HeadlessRenderer;
    use crate::utils::audio::tests::recording_sound;
    use crate::utils::audio::tests::RecordingClip;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    fn engine() -> (Engine<HeadlessRenderer>, RecordingClip) {
        let mut config = AppConfig::default();
        config.spawn.seed = Some(21);
        let (sound, clip) = recording_sound(21);
        let source = Arc::new(InMemorySource::default().with_model(config.spawn.model.clone()));
        let engine = Engine::new(&config, HeadlessRenderer::new(), source, Rc::new(sound)).unwrap();
        (engine, clip)
    }

    #[test]
    fn test_renderer_gets_initial_and_resized_viewport() {
        let (mut engine, _) = engine();
        let initial = engine.renderer().viewport().unwrap();
        assert_eq!((initial.width, initial.height), (800, 600));

        assert!(engine.resize(1200, 800, 1.0));
        let resized = engine.renderer().viewport().unwrap();
        assert_eq!(resized.physical_size(), (1200, 800));
        assert!((engine.context().camera.aspect_ratio - 1.5).abs() < 1e-6);

        assert!(!engine.resize(0, 0, 1.0));
        assert_eq!(engine.renderer().viewport(), Some(resized));
    }

    #[test]
    fn test_commands_drive_the_scene() {
        let (mut engine, _) = engine();
        engine.handle(DebugCommand::Spawn);
        engine.handle(DebugCommand::Spawn);
        assert_eq!(engine.debug_state().pending_loads, 2);
        engine.spawner.collect_blocking(&mut engine.ctx, WAIT);
        assert_eq!(engine.debug_state().objects, 2);

        engine.handle(DebugCommand::SetWireframes(true));
        assert!(engine.debug_state().wireframes);

        engine.handle(DebugCommand::Reset);
        let stats = engine.stats();
        assert_eq!(stats.tracked_objects, 0);
        assert_eq!(stats.bodies, 0);
    }

    #[test]
    fn test_falling_objects_play_hit_sounds() {
        let (mut engine, clip) = engine();
        for _ in 0..3 {
            engine.spawn();
        }
        engine.spawner.collect_blocking(&mut engine.ctx, WAIT);
        for _ in 0..300 {
            engine.tick(PHYSICS_DT).unwrap();
        }

        let plays = clip.plays.lock();
        assert!(!plays.is_empty());
        assert!(plays.iter().all(|v| (0.0..0.5).contains(v)));
        assert_eq!(engine.stats().frame_count, 300);
    }

    #[test]
    fn test_resting_objects_fall_asleep() {
        let (mut engine, _) = engine();
        engine.spawn();
        engine.spawner.collect_blocking(&mut engine.ctx, WAIT);
        for _ in 0..1200 {
            engine.tick(PHYSICS_DT).unwrap();
        }
        assert_eq!(engine.stats().sleeping_bodies, 1);
    }

    #[test]
    fn test_frame_clock_starts_at_zero() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.delta(), 0.0);
        std::thread::sleep(Duration::from_millis(2));
        assert!(clock.delta() > 0.0);
    }
}
