//! Bone capsule geometry derived from global joint transforms

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3};

use super::skeleton::Skeleton;
use crate::core::error::Error;
use crate::core::types::Result;
use crate::math::ops::normalize_eps;
use crate::math::rotation;

/// Oriented segment between a joint and its parent
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneSegment {
    /// Child joint index
    pub joint: usize,
    /// Parent joint index
    pub parent: usize,
    /// Parent's global position
    pub start: Vec3,
    /// Joint's global position
    pub end: Vec3,
    /// Midpoint of the segment
    pub position: Vec3,
    /// Rotation taking the up axis onto the segment direction
    pub orientation: Mat3,
    pub length: f32,
    /// Unit up axis the capsule is modelled along
    pub up: Vec3,
}

impl BoneSegment {
    /// Unit direction from parent to joint (zero for zero-length bones)
    pub fn direction(&self) -> Vec3 {
        if self.length > 0.0 {
            (self.end - self.start) / self.length
        } else {
            Vec3::ZERO
        }
    }

    /// Model matrix for a unit capsule modelled along the up axis and
    /// centered at the origin.
    ///
    /// The capsule is stretched to `length` along up and to `radius` across it.
    pub fn model_matrix(&self, radius: f32) -> Mat4 {
        let up = self.up;
        // radius * I + (length - radius) * up * up^T
        let along = Mat3::from_cols(up * up.x, up * up.y, up * up.z);
        let scale = Mat3::IDENTITY * radius + along * (self.length - radius);
        Mat4::from_translation(self.position) * Mat4::from_mat3(self.orientation * scale)
    }

    /// GPU instance data for this bone
    pub fn instance(&self, radius: f32) -> BoneInstance {
        BoneInstance {
            model: self.model_matrix(radius).to_cols_array_2d(),
            length: self.length,
            radius,
            joint: self.joint as u32,
            parent: self.parent as u32,
        }
    }
}

/// Per-bone instance data (80 bytes, matches a WGSL struct of
/// `mat4x4<f32>, f32, f32, u32, u32`)
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct BoneInstance {
    pub model: [[f32; 4]; 4],
    pub length: f32,
    pub radius: f32,
    pub joint: u32,
    pub parent: u32,
}

/// Minimal rotation taking unit `up` onto unit `dir`.
///
/// Near-parallel inputs cannot define an axis from their cross product: the
/// parallel case is the identity and the antiparallel case is a half turn
/// about a vector perpendicular to `up`.
pub fn align_up(up: Vec3, dir: Vec3, eps: f32) -> Mat3 {
    let cross = up.cross(dir);
    let cos = up.dot(dir).clamp(-1.0, 1.0);

    if cross.length() < eps {
        if cos >= 0.0 {
            return Mat3::IDENTITY;
        }
        return Mat3::from_axis_angle(up.any_orthonormal_vector(), std::f32::consts::PI);
    }

    let axis = normalize_eps(cross, eps);
    let angle = cos.acos();
    rotation::axis_angle_to_mat3(axis, angle, eps).unwrap_or(Mat3::IDENTITY)
}

/// Derive a segment for every non-root joint, in joint order.
pub fn bone_segments(skeleton: &Skeleton, global_transforms: &[Mat4]) -> Result<Vec<BoneSegment>> {
    let count = skeleton.joint_count();
    if global_transforms.len() != count {
        return Err(Error::shape("global transforms", count, global_transforms.len()));
    }

    let config = skeleton.config();
    let (up, eps) = (config.up, config.epsilon);

    let segments = skeleton
        .joints()
        .iter()
        .enumerate()
        .filter_map(|(joint, j)| j.parent_index.map(|parent| (joint, parent)))
        .map(|(joint, parent)| {
            let start = global_transforms[parent].w_axis.truncate();
            let end = global_transforms[joint].w_axis.truncate();
            let delta = end - start;
            let length = delta.length();

            let orientation = if length < eps {
                Mat3::IDENTITY
            } else {
                align_up(up, normalize_eps(delta, eps), eps)
            };

            BoneSegment {
                joint,
                parent,
                start,
                end,
                position: (start + end) * 0.5,
                orientation,
                length,
                up,
            }
        })
        .collect();

    Ok(segments)
}
