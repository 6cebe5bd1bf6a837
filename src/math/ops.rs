//! Small vector helpers

use glam::Vec3;

/// Normalize with the denominator clamped to `eps`.
///
/// A zero vector stays zero instead of turning into NaNs.
#[inline]
pub fn normalize_eps(v: Vec3, eps: f32) -> Vec3 {
    v / v.length().max(eps)
}

/// Angle from `a` to `b` measured around `axis`, in (-pi, pi].
pub fn signed_angle(a: Vec3, b: Vec3, axis: Vec3) -> f32 {
    let sin = a.cross(b).dot(axis);
    let cos = a.dot(b);
    sin.atan2(cos)
}

/// Remove the component of `v` along `normal` (normal must be unit length).
#[inline]
pub fn project_onto_plane(v: Vec3, normal: Vec3) -> Vec3 {
    v - normal * v.dot(normal)
}
