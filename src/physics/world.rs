use glam::{Quat, Vec3};
use rapier3d::prelude::{
    CCDSolver, ColliderBuilder, ColliderSet, DefaultBroadPhase, ImpulseJointSet,
    IntegrationParameters, IslandManager, MultibodyJointSet, NarrowPhase, PhysicsPipeline,
    QueryPipeline, Real, RigidBodyBuilder, RigidBodyHandle, RigidBodySet, Vector,
};
use std::collections::HashMap;

use super::body::BodyDesc;
use super::events::{CollisionHandler, ImpactCollector, ImpactEvent, ListenerId};
use super::material::ContactMaterial;
use crate::config::physics::PhysicsConfig;
use crate::utils::math::{from_rotation, from_vector, to_vector};

type Listeners = Vec<(ListenerId, Box<dyn CollisionHandler>)>;

/// Owns every rapier set plus the static floor, and steps them with a
/// fixed timestep.
///
/// `PhysicsPipeline::step()` needs mutable access to all sets at once, so
/// they live together here rather than behind separate owners.
pub struct PhysicsWorld {
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,

    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,

    integration_parameters: IntegrationParameters,
    gravity: Vector<Real>,
    material: ContactMaterial,
    allow_sleep: bool,
    accumulator: f32,

    floor: RigidBodyHandle,
    listeners: HashMap<RigidBodyHandle, Listeners>,
    next_listener: u64,
    collector: ImpactCollector,
}

impl PhysicsWorld {
    pub fn new(config: &PhysicsConfig) -> Self {
        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();
        let material = ContactMaterial::from_config(config);

        // Ground plane through the origin, facing +Y.
        let floor = bodies.insert(RigidBodyBuilder::fixed().build());
        let floor_collider = material.apply(ColliderBuilder::halfspace(Vector::y_axis()));
        colliders.insert_with_parent(floor_collider.build(), floor, &mut bodies);

        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = config.fixed_timestep;

        Self {
            bodies,
            colliders,
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            integration_parameters,
            gravity: to_vector(Vec3::from(config.gravity)),
            material,
            allow_sleep: config.allow_sleep,
            accumulator: 0.0,
            floor,
            listeners: HashMap::new(),
            next_listener: 0,
            collector: ImpactCollector::default(),
        }
    }

    pub fn floor(&self) -> RigidBodyHandle {
        self.floor
    }

    pub fn material(&self) -> ContactMaterial {
        self.material
    }

    /// Registers a dynamic body and its shapes with the simulation.
    pub fn add_body(&mut self, desc: BodyDesc) -> RigidBodyHandle {
        let (body, colliders) = desc.build(self.allow_sleep);
        let handle = self.bodies.insert(body);
        for collider in colliders {
            self.colliders
                .insert_with_parent(collider, handle, &mut self.bodies);
        }
        handle
    }

    /// Removes a body, its shapes and its collision listeners. Returns
    /// `false` without complaint if the body is already gone. The floor is
    /// permanent and cannot be removed.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> bool {
        if handle == self.floor {
            log::warn!("Refusing to remove the floor body");
            return false;
        }
        self.listeners.remove(&handle);
        self.bodies
            .remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    pub fn contains(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.contains(handle)
    }

    /// Number of bodies registered besides the floor.
    pub fn body_count(&self) -> usize {
        self.bodies.len().saturating_sub(1)
    }

    pub fn transform(&self, handle: RigidBodyHandle) -> Option<(Vec3, Quat)> {
        self.bodies
            .get(handle)
            .map(|b| (from_vector(b.translation()), from_rotation(b.rotation())))
    }

    pub fn linear_velocity(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|b| from_vector(b.linvel()))
    }

    pub fn is_sleeping(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.get(handle).is_some_and(|b| b.is_sleeping())
    }

    /// Attaches a listener to `handle`. Returns `None` if the body is not
    /// registered with this world.
    pub fn register_collision_handler(
        &mut self,
        handle: RigidBodyHandle,
        handler: Box<dyn CollisionHandler>,
    ) -> Option<ListenerId> {
        if !self.bodies.contains(handle) {
            return None;
        }
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.entry(handle).or_default().push((id, handler));
        Some(id)
    }

    /// Detaches a listener. Unknown ids are ignored.
    pub fn unregister_collision_handler(
        &mut self,
        handle: RigidBodyHandle,
        id: ListenerId,
    ) -> bool {
        let Some(listeners) = self.listeners.get_mut(&handle) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(listener, _)| *listener != id);
        let removed = listeners.len() != before;
        if listeners.is_empty() {
            self.listeners.remove(&handle);
        }
        removed
    }

    pub fn listener_count(&self, handle: RigidBodyHandle) -> usize {
        self.listeners.get(&handle).map_or(0, Vec::len)
    }

    /// Advances the simulation by `elapsed` seconds of wall time in steps of
    /// `fixed_timestep`, taking at most `max_substeps` steps. Time left over
    /// below one step carries into the next call; backlog beyond the substep
    /// cap is dropped. Collision listeners run inside this call.
    ///
    /// Returns the number of steps taken.
    pub fn step(&mut self, fixed_timestep: f32, elapsed: f32, max_substeps: usize) -> usize {
        if !(fixed_timestep.is_finite() && fixed_timestep > 0.0) {
            return 0;
        }
        let elapsed = if elapsed.is_finite() { elapsed.max(0.0) } else { 0.0 };

        self.integration_parameters.dt = fixed_timestep;
        self.accumulator += elapsed;

        let mut substeps = 0;
        while self.accumulator >= fixed_timestep && substeps < max_substeps {
            self.internal_step();
            self.accumulator -= fixed_timestep;
            substeps += 1;
        }
        if self.accumulator >= fixed_timestep {
            self.accumulator %= fixed_timestep;
        }
        substeps
    }

    fn internal_step(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &self.collector,
        );
        self.dispatch_impacts();
    }

    fn dispatch_impacts(&mut self) {
        for impact in self.collector.drain() {
            let sides = [(impact.body1, impact.body2), (impact.body2, impact.body1)];
            for (body, other) in sides {
                let Some(body) = body else { continue };
                let Some(listeners) = self.listeners.get_mut(&body) else {
                    continue;
                };
                let event = ImpactEvent {
                    body,
                    other,
                    impact_speed: impact.speed,
                };
                for (_, handler) in listeners.iter_mut() {
                    handler.on_collide(&event);
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn inject_impact(&mut self, impact: super::events::RawImpact) {
        self.collector.push(impact);
        self.dispatch_impacts();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body::BoxShape;
    use crate::physics::events::RawImpact;
    use std::{cell::RefCell, rc::Rc};

    const DT: f32 = 1.0 / 60.0;

    fn world() -> PhysicsWorld {
        PhysicsWorld::new(&PhysicsConfig::default())
    }

    fn small_box(world: &PhysicsWorld, y: f32) -> BodyDesc {
        BodyDesc::new(
            vec![BoxShape::new(Vec3::splat(0.05), Vec3::ZERO)],
            1.0,
            world.material(),
        )
        .at(Vec3::new(0.0, y, 0.0))
    }

    fn recorder() -> (Rc<RefCell<Vec<ImpactEvent>>>, Box<dyn CollisionHandler>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let handler = move |e: &ImpactEvent| sink.borrow_mut().push(*e);
        (seen, Box::new(handler))
    }

    #[test]
    fn test_body_falls_under_gravity() {
        let mut world = world();
        let handle = world.add_body(small_box(&world, 3.0));
        assert_eq!(world.body_count(), 1);

        world.step(DT, 0.25, 60);
        let (position, _) = world.transform(handle).unwrap();
        assert!(position.y < 3.0);
        assert!(world.linear_velocity(handle).unwrap().y < 0.0);
    }

    #[test]
    fn test_step_caps_substeps_and_drops_backlog() {
        let mut world = world();
        assert_eq!(world.step(DT, 1.0, 3), 3);
        // The backlog was dropped, so a single frame worth of time is one step.
        assert_eq!(world.step(DT, DT, 3), 1);
    }

    #[test]
    fn test_step_accumulates_short_frames() {
        let mut world = world();
        assert_eq!(world.step(DT, DT * 0.5, 3), 0);
        assert_eq!(world.step(DT, DT * 0.6, 3), 1);
        assert_eq!(world.step(DT, 0.0, 3), 0);
        assert_eq!(world.step(DT, -1.0, 3), 0);
        assert_eq!(world.step(DT, f32::NAN, 3), 0);
    }

    #[test]
    fn test_remove_body_is_idempotent() {
        let mut world = world();
        let handle = world.add_body(small_box(&world, 1.0));
        assert!(world.remove_body(handle));
        assert!(!world.contains(handle));
        assert!(!world.remove_body(handle));
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn test_floor_is_permanent() {
        let mut world = world();
        let floor = world.floor();
        assert!(!world.remove_body(floor));
        assert!(world.contains(floor));
    }

    #[test]
    fn test_listener_registration() {
        let mut world = world();
        let handle = world.add_body(small_box(&world, 1.0));
        let (_, handler) = recorder();
        let id = world.register_collision_handler(handle, handler).unwrap();
        assert_eq!(world.listener_count(handle), 1);

        assert!(world.unregister_collision_handler(handle, id));
        assert!(!world.unregister_collision_handler(handle, id));
        assert_eq!(world.listener_count(handle), 0);
    }

    #[test]
    fn test_listener_rejected_for_unknown_body() {
        let mut world = world();
        let handle = world.add_body(small_box(&world, 1.0));
        world.remove_body(handle);
        let (_, handler) = recorder();
        assert!(world.register_collision_handler(handle, handler).is_none());
    }

    #[test]
    fn test_removing_body_drops_its_listeners() {
        let mut world = world();
        let handle = world.add_body(small_box(&world, 1.0));
        let (_, handler) = recorder();
        world.register_collision_handler(handle, handler);
        world.remove_body(handle);
        assert_eq!(world.listener_count(handle), 0);
    }

    #[test]
    fn test_impacts_reach_both_bodies() {
        let mut world = world();
        let a = world.add_body(small_box(&world, 1.0));
        let b = world.add_body(small_box(&world, 2.0));
        let (seen_a, handler_a) = recorder();
        let (seen_b, handler_b) = recorder();
        world.register_collision_handler(a, handler_a);
        world.register_collision_handler(b, handler_b);

        world.inject_impact(RawImpact {
            body1: Some(a),
            body2: Some(b),
            speed: 2.5,
        });

        assert_eq!(seen_a.borrow()[0].other, Some(b));
        assert_eq!(seen_b.borrow()[0].other, Some(a));
        assert_eq!(seen_b.borrow()[0].impact_speed, 2.5);
    }

    #[test]
    fn test_falling_box_hits_floor_hard() {
        let mut world = world();
        let handle = world.add_body(small_box(&world, 3.0));
        let (seen, handler) = recorder();
        world.register_collision_handler(handle, handler);

        for _ in 0..120 {
            world.step(DT, DT, 3);
        }

        let seen = seen.borrow();
        assert!(!seen.is_empty(), "box never touched the floor");
        // Falling ~3 m gives roughly 7.5 m/s at impact.
        assert!(seen[0].impact_speed > 1.5);
        assert_eq!(seen[0].other, Some(world.floor()));
    }

    #[test]
    fn test_box_comes_to_rest_on_floor() {
        let mut world = world();
        let handle = world.add_body(small_box(&world, 1.0));
        for _ in 0..(60 * 10) {
            world.step(DT, DT, 3);
        }
        let (position, _) = world.transform(handle).unwrap();
        assert!(position.y > 0.0 && position.y < 0.1, "rest height {}", position.y);
        assert!(world.linear_velocity(handle).unwrap().length() < 0.05);
    }

    #[test]
    fn test_sleeping_body_wakes_when_hit() {
        let mut world = world();
        let shapes = vec![
            BoxShape::new(Vec3::new(0.05, 0.06, 0.0325), Vec3::new(0.0, -0.018, 0.0)),
            BoxShape::new(Vec3::new(0.0425, 0.0125, 0.0175), Vec3::new(0.0, 0.055, 0.0)),
        ];
        let desc = BodyDesc::new(shapes, 1.0, world.material()).at(Vec3::new(0.0, 0.1, 0.0));
        let a = world.add_body(desc);
        let (seen, handler) = recorder();
        world.register_collision_handler(a, handler);

        for _ in 0..1200 {
            if world.is_sleeping(a) {
                break;
            }
            world.step(DT, DT, 3);
        }
        assert!(world.is_sleeping(a), "body never fell asleep");
        seen.borrow_mut().clear();

        let above = world.transform(a).unwrap().0 + Vec3::new(0.0, 1.0, 0.0);
        let b = world.add_body(small_box(&world, 0.0).at(above));
        let mut woke = false;
        for _ in 0..120 {
            world.step(DT, DT, 3);
            woke |= !world.is_sleeping(a);
            if woke && seen.borrow().iter().any(|e| e.other == Some(b)) {
                break;
            }
        }

        assert!(woke);
        let seen = seen.borrow();
        let hit = seen.iter().find(|e| e.other == Some(b)).expect("no impact from b");
        assert!(hit.impact_speed > 1.5);
    }
}
