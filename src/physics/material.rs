use rapier3d::prelude::{CoefficientCombineRule, ColliderBuilder};

use crate::config::physics::PhysicsConfig;

/// Friction/restitution profile shared by every collider in the world,
/// floor included. Immutable once the world is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactMaterial {
    pub friction: f32,
    pub restitution: f32,
}

impl Default for ContactMaterial {
    fn default() -> Self {
        Self {
            friction: 0.1,
            restitution: 0.7,
        }
    }
}

impl ContactMaterial {
    pub fn new(friction: f32, restitution: f32) -> Self {
        Self {
            friction: friction.max(0.0),
            restitution: restitution.clamp(0.0, 1.0),
        }
    }

    pub fn from_config(config: &PhysicsConfig) -> Self {
        Self::new(config.friction, config.restitution)
    }

    /// Applies this profile to a collider. Both sides of every contact carry
    /// the same values, so the combine rule only has to keep them intact.
    pub fn apply(&self, builder: ColliderBuilder) -> ColliderBuilder {
        builder
            .friction(self.friction)
            .friction_combine_rule(CoefficientCombineRule::Average)
            .restitution(self.restitution)
            .restitution_combine_rule(CoefficientCombineRule::Average)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_from_config() {
        let material = ContactMaterial::from_config(&PhysicsConfig::default());
        assert_eq!(material, ContactMaterial::default());
    }

    #[test]
    fn test_material_is_clamped() {
        let material = ContactMaterial::new(-1.0, 3.0);
        assert_eq!(material.friction, 0.0);
        assert_eq!(material.restitution, 1.0);
    }

    #[test]
    fn test_apply_sets_collider_coefficients() {
        let material = ContactMaterial::new(0.3, 0.4);
        let collider = material.apply(ColliderBuilder::ball(1.0)).build();
        assert_eq!(collider.friction(), 0.3);
        assert_eq!(collider.restitution(), 0.4);
    }
}
