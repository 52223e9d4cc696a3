//! Conversions between the glam types used by the scene and the nalgebra
//! types rapier works with.

use glam::{Quat, Vec3};
use rapier3d::prelude::{Real, Rotation, Vector};

#[inline]
pub fn to_vector(v: Vec3) -> Vector<Real> {
    Vector::new(v.x, v.y, v.z)
}

#[inline]
pub fn from_vector(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

#[inline]
pub fn to_rotation(q: Quat) -> Rotation<Real> {
    Rotation::from_quaternion(rapier3d::na::Quaternion::new(q.w, q.x, q.y, q.z))
}

#[inline]
pub fn from_rotation(r: &Rotation<Real>) -> Quat {
    Quat::from_xyzw(r.i, r.j, r.k, r.w)
}

/// Parses `#rrggbb` (leading `#` optional) into linear-ish RGB floats in `[0, 1]`.
pub fn parse_hex_color(hex: &str) -> Option<[f32; 3]> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }
    let value = u32::from_str_radix(hex, 16).ok()?;
    Some([
        ((value >> 16) & 0xff) as f32 / 255.0,
        ((value >> 8) & 0xff) as f32 / 255.0,
        (value & 0xff) as f32 / 255.0,
    ])
}
