use glam::{Quat, Vec3};
use rapier3d::prelude::{ActiveEvents, Collider, ColliderBuilder, RigidBody, RigidBodyBuilder};

use super::material::ContactMaterial;
use crate::utils::math::{to_rotation, to_vector};

/// Axis-aligned box attached to a body at `offset` from its origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxShape {
    pub half_extents: Vec3,
    pub offset: Vec3,
}

impl BoxShape {
    pub fn new(half_extents: Vec3, offset: Vec3) -> Self {
        Self {
            half_extents,
            offset,
        }
    }

    pub fn volume(&self) -> f32 {
        8.0 * self.half_extents.x * self.half_extents.y * self.half_extents.z
    }
}

/// Everything needed to create one dynamic body. Consumed on registration,
/// so the same description can never be added to the world twice.
#[derive(Debug, Clone)]
pub struct BodyDesc {
    pub position: Vec3,
    pub rotation: Quat,
    pub mass: f32,
    pub shapes: Vec<BoxShape>,
    pub material: ContactMaterial,
}

impl BodyDesc {
    pub fn new(shapes: Vec<BoxShape>, mass: f32, material: ContactMaterial) -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            mass,
            shapes,
            material,
        }
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Splits the body's mass across its shapes by volume.
    fn shape_masses(&self) -> Vec<f32> {
        let total: f32 = self.shapes.iter().map(BoxShape::volume).sum();
        if total > 0.0 {
            self.shapes
                .iter()
                .map(|s| self.mass * s.volume() / total)
                .collect()
        } else {
            let share = self.mass / self.shapes.len().max(1) as f32;
            vec![share; self.shapes.len()]
        }
    }

    pub(crate) fn build(self, can_sleep: bool) -> (RigidBody, Vec<Collider>) {
        let body = RigidBodyBuilder::dynamic()
            .translation(to_vector(self.position))
            .rotation(to_rotation(self.rotation).scaled_axis())
            .can_sleep(can_sleep)
            .build();

        let colliders = self
            .shapes
            .iter()
            .zip(self.shape_masses())
            .map(|(shape, mass)| {
                let builder = ColliderBuilder::cuboid(
                    shape.half_extents.x,
                    shape.half_extents.y,
                    shape.half_extents.z,
                )
                .translation(to_vector(shape.offset))
                .mass(mass)
                .active_events(ActiveEvents::COLLISION_EVENTS);
                self.material.apply(builder).build()
            })
            .collect();

        (body, colliders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_boxes() -> Vec<BoxShape> {
        vec![
            BoxShape::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(0.0, -1.0, 0.0)),
            BoxShape::new(Vec3::new(0.5, 0.5, 1.0), Vec3::new(0.0, 2.0, 0.0)),
        ]
    }

    #[test]
    fn test_mass_split_by_volume() {
        let desc = BodyDesc::new(two_boxes(), 1.0, ContactMaterial::default());
        let masses = desc.shape_masses();
        assert!((masses.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!((masses[0] - 0.8).abs() < 1e-6);
        assert!((masses[1] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_build_places_body_and_shapes() {
        let desc = BodyDesc::new(two_boxes(), 1.0, ContactMaterial::default())
            .at(Vec3::new(0.1, 4.0, -0.2));
        let (body, colliders) = desc.build(true);
        assert_eq!(body.translation().y, 4.0);
        assert_eq!(colliders.len(), 2);
        assert!(colliders
            .iter()
            .all(|c| c.active_events().contains(ActiveEvents::COLLISION_EVENTS)));
        assert_eq!(colliders[1].position_wrt_parent().unwrap().translation.y, 2.0);
    }
}
