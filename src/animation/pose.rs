//! One time sample of a skeleton: per-joint local rotations plus root position

use std::sync::Arc;

use glam::{Mat3, Mat4, Quat, Vec3};

use super::bone::{bone_segments, BoneSegment};
use super::skeleton::Skeleton;
use crate::core::error::Error;
use crate::core::types::Result;
use crate::math::ops::{normalize_eps, project_onto_plane};
use crate::math::rotation::{self, AngleUnit, EulerOrder, SixD};
use crate::math::Aabb;

/// A skeleton pose.
///
/// `global[i] = global[parent[i]] * rest_offset[i] * local[i]`, where the
/// root's rest offset takes its translation from `root_position`.
///
/// Nothing derived is cached. Every transform accessor recomputes from the
/// current rotations and root position.
#[derive(Clone, Debug)]
pub struct Pose {
    skeleton: Arc<Skeleton>,
    local_rotations: Vec<Quat>,
    root_position: Vec3,
}

impl Pose {
    /// Create a pose from local joint rotations and a root position.
    ///
    /// Rotations are normalized on the way in.
    pub fn new(skeleton: Arc<Skeleton>, local_rotations: Vec<Quat>, root_position: Vec3) -> Result<Self> {
        if local_rotations.len() != skeleton.joint_count() {
            return Err(Error::shape("joint rotations", skeleton.joint_count(), local_rotations.len()));
        }

        let eps = skeleton.config().epsilon;
        let local_rotations = local_rotations
            .into_iter()
            .enumerate()
            .map(|(index, q)| normalize_quat(q, eps).map_err(|_| {
                Error::DegenerateRotation(format!("joint {index} has a zero-norm rotation"))
            }))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            skeleton,
            local_rotations,
            root_position,
        })
    }

    /// Rest pose: identity rotations, root at its rest translation.
    pub fn identity(skeleton: Arc<Skeleton>) -> Self {
        let root_position = skeleton.bone_offsets()[0];
        Self {
            local_rotations: vec![Quat::IDENTITY; skeleton.joint_count()],
            skeleton,
            root_position,
        }
    }

    /// Create from per-joint Euler triples (as found in BVH channels).
    pub fn from_euler(
        skeleton: Arc<Skeleton>,
        angles: &[Vec3],
        order: EulerOrder,
        unit: AngleUnit,
        root_position: Vec3,
    ) -> Result<Self> {
        let rotations = angles
            .iter()
            .map(|e| rotation::euler_to_quat(*e, order, unit))
            .collect();
        Self::new(skeleton, rotations, root_position)
    }

    /// Create from per-joint rotation matrices.
    pub fn from_matrices(skeleton: Arc<Skeleton>, rotations: &[Mat3], root_position: Vec3) -> Result<Self> {
        let rotations = rotations.iter().map(|m| rotation::mat3_to_quat(*m)).collect();
        Self::new(skeleton, rotations, root_position)
    }

    /// Create from per-joint 6D rotations.
    pub fn from_sixd(skeleton: Arc<Skeleton>, rotations: &[SixD], root_position: Vec3) -> Result<Self> {
        let eps = skeleton.config().epsilon;
        let rotations = rotations
            .iter()
            .map(|r| rotation::sixd_to_mat3(*r, eps).map(rotation::mat3_to_quat))
            .collect::<Result<Vec<_>>>()?;
        Self::new(skeleton, rotations, root_position)
    }

    pub fn skeleton(&self) -> &Arc<Skeleton> {
        &self.skeleton
    }

    pub fn joint_count(&self) -> usize {
        self.local_rotations.len()
    }

    pub fn local_rotations(&self) -> &[Quat] {
        &self.local_rotations
    }

    pub fn local_rotation(&self, index: usize) -> Option<Quat> {
        self.local_rotations.get(index).copied()
    }

    pub fn root_position(&self) -> Vec3 {
        self.root_position
    }

    /// Set the absolute root position
    pub fn set_root_position(&mut self, position: Vec3) {
        self.root_position = position;
    }

    /// Move the root (and with it every global joint position) by `delta`
    pub fn translate_root_position(&mut self, delta: Vec3) {
        self.root_position += delta;
    }

    /// Override one joint's local rotation
    pub fn set_local_rotation(&mut self, index: usize, rotation: Quat) -> Result<()> {
        let count = self.local_rotations.len();
        let eps = self.skeleton.config().epsilon;
        let slot = self
            .local_rotations
            .get_mut(index)
            .ok_or(Error::JointOutOfRange { index, count })?;
        *slot = normalize_quat(rotation, eps)?;
        Ok(())
    }

    /// Apply `delta` on top of the root's current rotation (in the parent frame)
    pub fn rotate_root(&mut self, delta: Quat) -> Result<()> {
        let eps = self.skeleton.config().epsilon;
        let delta = normalize_quat(delta, eps)?;
        self.local_rotations[0] = (delta * self.local_rotations[0]).normalize();
        Ok(())
    }

    /// Rotation-only local transform per joint
    pub fn local_transforms(&self) -> Vec<Mat4> {
        self.local_rotations.iter().map(|q| Mat4::from_quat(*q)).collect()
    }

    pub fn root_local_transform(&self) -> Mat4 {
        Mat4::from_quat(self.local_rotations[0])
    }

    /// Global transform of every joint, root first.
    pub fn global_transforms(&self) -> Result<Vec<Mat4>> {
        self.skeleton.global_transforms(&self.local_rotations, self.root_position)
    }

    /// Global transform of the root without walking the hierarchy
    pub fn root_global_transform(&self) -> Mat4 {
        self.skeleton.root_rest_offset(self.root_position) * self.root_local_transform()
    }

    pub fn global_positions(&self) -> Result<Vec<Vec3>> {
        Ok(self
            .global_transforms()?
            .iter()
            .map(|g| g.w_axis.truncate())
            .collect())
    }

    /// Capsule segments from every non-root joint to its parent
    pub fn bone_segments(&self) -> Result<Vec<BoneSegment>> {
        let globals = self.global_transforms()?;
        bone_segments(&self.skeleton, &globals)
    }

    /// Bounding box of all joint positions
    pub fn bounds(&self) -> Result<Aabb> {
        let positions = self.global_positions()?;
        Aabb::from_points(positions).ok_or_else(|| Error::shape("joint positions", 1, 0))
    }

    /// Root position projected onto the ground plane
    pub fn base(&self) -> Vec3 {
        project_onto_plane(self.root_position, self.skeleton.config().up)
    }

    /// Root's forward axis projected onto the ground plane, not normalized.
    ///
    /// Vanishes when the root faces along the up axis.
    pub fn facing(&self) -> Vec3 {
        let config = self.skeleton.config();
        let root_rotation = Mat3::from_mat4(self.root_global_transform());
        project_onto_plane(root_rotation * config.forward, config.up)
    }

    /// Facing direction on the ground plane
    pub fn forward(&self) -> Vec3 {
        normalize_eps(self.facing(), self.skeleton.config().epsilon)
    }

    pub fn up(&self) -> Vec3 {
        self.skeleton.config().up
    }

    /// Left of the facing direction
    pub fn left(&self) -> Vec3 {
        let config = self.skeleton.config();
        normalize_eps(self.up().cross(self.forward()), config.epsilon)
    }

    /// Blend two poses of the same skeleton: slerp rotations, lerp root.
    pub fn interpolate(a: &Pose, b: &Pose, t: f32) -> Result<Pose> {
        if !Arc::ptr_eq(&a.skeleton, &b.skeleton) {
            return Err(Error::InvalidHierarchy("cannot blend poses of different skeletons".into()));
        }

        let t = t.clamp(0.0, 1.0);
        let local_rotations = a
            .local_rotations
            .iter()
            .zip(&b.local_rotations)
            .map(|(qa, qb)| qa.slerp(*qb, t).normalize())
            .collect();

        Ok(Pose {
            skeleton: Arc::clone(&a.skeleton),
            local_rotations,
            root_position: a.root_position.lerp(b.root_position, t),
        })
    }
}

fn normalize_quat(q: Quat, eps: f32) -> Result<Quat> {
    let norm = q.length();
    if !(norm >= eps) {
        return Err(Error::DegenerateRotation(format!("quaternion norm {norm} below {eps}")));
    }
    Ok(q / norm)
}
