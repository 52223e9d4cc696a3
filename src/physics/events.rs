use parking_lot::Mutex;
use rapier3d::prelude::{
    ColliderSet, CollisionEvent, ContactPair, EventHandler, Real, RigidBodyHandle, RigidBodySet,
    Vector,
};
use std::collections::HashMap;

/// One body hitting something during a physics step, as seen by that body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactEvent {
    /// The body the listener is registered on.
    pub body: RigidBodyHandle,
    /// The body it hit, if the other collider is attached to one.
    pub other: Option<RigidBodyHandle>,
    /// Relative speed along the contact normal at the moment contact started.
    pub impact_speed: f32,
}

/// Receives impacts for the body it is registered on.
pub trait CollisionHandler {
    fn on_collide(&mut self, event: &ImpactEvent);
}

impl<F: FnMut(&ImpactEvent)> CollisionHandler for F {
    fn on_collide(&mut self, event: &ImpactEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RawImpact {
    pub body1: Option<RigidBodyHandle>,
    pub body2: Option<RigidBodyHandle>,
    pub speed: f32,
}

/// Rapier event sink. Rapier may call it from its own worker threads, so
/// impacts are parked behind a lock and drained after the step returns.
#[derive(Default)]
pub(crate) struct ImpactCollector {
    impacts: Mutex<Vec<RawImpact>>,
}

impl ImpactCollector {
    /// Takes the impacts gathered since the last drain, keeping only the
    /// hardest one per pair of bodies. A compound body touching the floor
    /// with two shapes at once is still a single impact.
    pub fn drain(&self) -> Vec<RawImpact> {
        let raw = std::mem::take(&mut *self.impacts.lock());
        let mut merged: Vec<RawImpact> = Vec::with_capacity(raw.len());
        let mut index: HashMap<(Option<RigidBodyHandle>, Option<RigidBodyHandle>), usize> =
            HashMap::new();

        for impact in raw {
            let key = ordered(impact.body1, impact.body2);
            match index.get(&key) {
                Some(&i) => {
                    if impact.speed > merged[i].speed {
                        merged[i].speed = impact.speed;
                    }
                }
                None => {
                    index.insert(key, merged.len());
                    merged.push(impact);
                }
            }
        }
        merged
    }

    #[cfg(test)]
    pub fn push(&self, impact: RawImpact) {
        self.impacts.lock().push(impact);
    }
}

fn ordered(
    a: Option<RigidBodyHandle>,
    b: Option<RigidBodyHandle>,
) -> (Option<RigidBodyHandle>, Option<RigidBodyHandle>) {
    let key = |h: Option<RigidBodyHandle>| h.map(|h| h.into_raw_parts());
    if key(a) <= key(b) {
        (a, b)
    } else {
        (b, a)
    }
}

impl EventHandler for ImpactCollector {
    fn handle_collision_event(
        &self,
        bodies: &RigidBodySet,
        colliders: &ColliderSet,
        event: CollisionEvent,
        contact_pair: Option<&ContactPair>,
    ) {
        if !event.started() {
            return;
        }
        // Sensor intersections carry no contact pair and make no noise.
        let Some(pair) = contact_pair else {
            return;
        };

        let parent = |h| colliders.get(h).and_then(|c| c.parent());
        self.impacts.lock().push(RawImpact {
            body1: parent(pair.collider1),
            body2: parent(pair.collider2),
            speed: impact_speed(bodies, colliders, pair),
        });
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

/// Largest relative velocity along the contact normal over every contact
/// point of the pair.
fn impact_speed(bodies: &RigidBodySet, colliders: &ColliderSet, pair: &ContactPair) -> f32 {
    let (Some(c1), Some(c2)) = (colliders.get(pair.collider1), colliders.get(pair.collider2)) else {
        return 0.0;
    };
    let rb1 = c1.parent().and_then(|h| bodies.get(h));
    let rb2 = c2.parent().and_then(|h| bodies.get(h));

    let mut speed: f32 = 0.0;
    for manifold in &pair.manifolds {
        let normal = c1.position() * manifold.local_n1;
        for contact in &manifold.points {
            let point = c1.position() * contact.local_p1;
            let v1 = rb1.map_or_else(Vector::zeros, |b| b.velocity_at_point(&point));
            let v2 = rb2.map_or_else(Vector::zeros, |b| b.velocity_at_point(&point));
            speed = speed.max((v2 - v1).dot(&normal).abs());
        }
    }
    speed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(i: u32) -> RigidBodyHandle {
        RigidBodyHandle::from_raw_parts(i, 0)
    }

    #[test]
    fn test_drain_keeps_hardest_impact_per_pair() {
        let collector = ImpactCollector::default();
        collector.push(RawImpact {
            body1: Some(handle(1)),
            body2: Some(handle(0)),
            speed: 2.0,
        });
        collector.push(RawImpact {
            body1: Some(handle(0)),
            body2: Some(handle(1)),
            speed: 3.5,
        });
        collector.push(RawImpact {
            body1: Some(handle(2)),
            body2: Some(handle(0)),
            speed: 0.5,
        });

        let drained = collector.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].speed, 3.5);
        assert_eq!(drained[1].speed, 0.5);
        assert!(collector.drain().is_empty());
    }

    #[test]
    fn test_closures_are_handlers() {
        let mut seen = Vec::new();
        {
            let mut handler = |e: &ImpactEvent| seen.push(e.impact_speed);
            handler.on_collide(&ImpactEvent {
                body: handle(0),
                other: None,
                impact_speed: 2.0,
            });
        }
        assert_eq!(seen, vec![2.0]);
    }
}
