//! Analytic two-bone inverse kinematics on top of a pose's global transforms

use glam::{Mat4, Quat, Vec3};

use super::pose::Pose;
use crate::core::error::Error;
use crate::core::types::Result;
use crate::math::ops::project_onto_plane;

/// Result of a two-bone solve
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TwoBoneSolution {
    pub base: usize,
    pub mid: usize,
    pub effector: usize,
    /// Whether the target was out of reach and the chain was clamped
    pub clamped: bool,
}

fn rotation_of(m: &Mat4) -> Quat {
    let (_, rotation, _) = m.to_scale_rotation_translation();
    rotation.normalize()
}

/// Re-express a world-space rotation applied at a joint as a post-multiplied
/// local rotation: `local' = local * (G^-1 * world * G)`.
fn local_delta(global_rotation: Quat, world: Quat) -> Quat {
    (global_rotation.inverse() * world * global_rotation).normalize()
}

/// Bend `base -> mid -> effector` so the effector lands on `target`.
///
/// `mid` is the effector's parent and must itself be a child of `base`.
/// Only the local rotations of `base` and `mid` change. The knee stays on
/// the side it currently bends towards; a straight chain bends towards the
/// pose's forward direction.
pub fn two_bone_ik(pose: &mut Pose, base: usize, effector: usize, target: Vec3) -> Result<TwoBoneSolution> {
    let skeleton = pose.skeleton().clone();
    let count = skeleton.joint_count();
    if base >= count || effector >= count {
        return Err(Error::JointOutOfRange { index: base.max(effector), count });
    }

    let mid = skeleton
        .parent_index(effector)
        .ok_or_else(|| Error::InvalidHierarchy(format!("effector {effector} has no parent")))?;
    if skeleton.parent_index(mid) != Some(base) {
        return Err(Error::InvalidHierarchy(format!(
            "joints {base} and {effector} do not form a two-bone chain"
        )));
    }

    let eps = skeleton.config().epsilon.max(1e-6);
    let globals = pose.global_transforms()?;
    let a = globals[base].w_axis.truncate();
    let b = globals[mid].w_axis.truncate();
    let c = globals[effector].w_axis.truncate();

    let l_ab = (b - a).length();
    let l_bc = (c - b).length();
    if l_ab < eps || l_bc < eps {
        return Err(Error::InvalidHierarchy("two-bone chain has a zero-length bone".into()));
    }

    // reach direction and clamped distance
    let to_target = target - a;
    let reach = to_target.length();
    let dir = if reach >= eps {
        to_target / reach
    } else if (c - a).length() >= eps {
        (c - a).normalize()
    } else {
        skeleton.config().up
    };
    let max_reach = l_ab + l_bc - eps;
    let min_reach = (l_ab - l_bc).abs() + eps;
    let l_at = reach.clamp(min_reach, max_reach.max(min_reach));
    let clamped = (l_at - reach).abs() > eps;
    if clamped {
        log::debug!("two_bone_ik: target at {reach:.4} clamped to {l_at:.4}");
    }

    // direction the knee bends towards, perpendicular to the reach direction
    let mut bend = project_onto_plane(b - a, dir);
    if bend.length() < eps * l_ab {
        bend = project_onto_plane(pose.forward(), dir);
    }
    if bend.length() < eps {
        bend = dir.any_orthonormal_vector();
    }
    let bend = bend.normalize();

    // law of cosines for the angle at the base
    let cos_a = ((l_ab * l_ab + l_at * l_at - l_bc * l_bc) / (2.0 * l_ab * l_at)).clamp(-1.0, 1.0);
    let sin_a = (1.0 - cos_a * cos_a).max(0.0).sqrt();
    let b_goal = a + (dir * cos_a + bend * sin_a) * l_ab;
    let c_goal = a + dir * l_at;

    // world rotation at the base, then at the mid joint
    let world_a = Quat::from_rotation_arc((b - a) / l_ab, (b_goal - a).normalize());
    let c_moved = a + world_a * (c - a);
    let world_b = Quat::from_rotation_arc(
        (c_moved - b_goal).normalize(),
        (c_goal - b_goal).normalize(),
    );

    let global_a = rotation_of(&globals[base]);
    let global_b = (world_a * rotation_of(&globals[mid])).normalize();

    let local_a = pose.local_rotations()[base] * local_delta(global_a, world_a);
    let local_b = pose.local_rotations()[mid] * local_delta(global_b, world_b);
    pose.set_local_rotation(base, local_a)?;
    pose.set_local_rotation(mid, local_b)?;

    Ok(TwoBoneSolution {
        base,
        mid,
        effector,
        clamped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::skeleton::{Skeleton, SkeletonBuilder};
    use std::sync::Arc;

    /// hips -> thigh -> shin -> foot, legs hanging down
    fn leg() -> Arc<Skeleton> {
        Arc::new(
            SkeletonBuilder::new()
                .add_root("hips", Mat4::IDENTITY)
                .add_joint_at("thigh", "hips", Vec3::new(0.2, 0.0, 0.0))
                .add_joint_at("shin", "thigh", Vec3::new(0.0, -1.0, 0.0))
                .add_joint_at("foot", "shin", Vec3::new(0.0, -1.0, 0.0))
                .build()
                .unwrap(),
        )
    }

    fn bent_leg() -> Pose {
        let mut pose = Pose::new(leg(), vec![Quat::IDENTITY; 4], Vec3::new(0.0, 2.0, 0.0)).unwrap();
        pose.set_local_rotation(1, Quat::from_rotation_x(-0.3)).unwrap();
        pose.set_local_rotation(2, Quat::from_rotation_x(0.6)).unwrap();
        pose
    }

    fn lengths(pose: &Pose) -> (f32, f32) {
        let p = pose.global_positions().unwrap();
        ((p[2] - p[1]).length(), (p[3] - p[2]).length())
    }

    #[test]
    fn test_reaches_target() {
        let mut pose = bent_leg();
        let target = Vec3::new(0.5, 0.6, 0.4);
        let solution = two_bone_ik(&mut pose, 1, 3, target).unwrap();
        assert!(!solution.clamped);
        assert_eq!(solution.mid, 2);

        let positions = pose.global_positions().unwrap();
        assert!((positions[3] - target).length() < 1e-4, "{:?}", positions[3]);
    }

    #[test]
    fn test_preserves_bone_lengths_and_base() {
        let mut pose = bent_leg();
        let before = pose.global_positions().unwrap();
        two_bone_ik(&mut pose, 1, 3, Vec3::new(-0.3, 0.9, -0.2)).unwrap();
        let after = pose.global_positions().unwrap();

        assert!(after[1].abs_diff_eq(before[1], 1e-5));
        let (ab, bc) = lengths(&pose);
        assert!((ab - 1.0).abs() < 1e-4);
        assert!((bc - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_straight_chain() {
        let mut pose = Pose::new(leg(), vec![Quat::IDENTITY; 4], Vec3::new(0.0, 2.0, 0.0)).unwrap();
        let target = Vec3::new(0.2, 0.5, 0.0);
        two_bone_ik(&mut pose, 1, 3, target).unwrap();

        let positions = pose.global_positions().unwrap();
        assert!(positions.iter().all(|p| p.is_finite()));
        assert!((positions[3] - target).length() < 1e-4);
        // knee bends forward (+Z) when no bend exists yet
        assert!(positions[2].z > 0.0);
    }

    #[test]
    fn test_unreachable_target_is_clamped() {
        let mut pose = bent_leg();
        let target = Vec3::new(0.2, -5.0, 0.0);
        let solution = two_bone_ik(&mut pose, 1, 3, target).unwrap();
        assert!(solution.clamped);

        let positions = pose.global_positions().unwrap();
        let reach = positions[3] - positions[1];
        assert!((reach.length() - 2.0).abs() < 1e-3);
        assert!(reach.normalize().abs_diff_eq(-Vec3::Y, 1e-3));
    }

    #[test]
    fn test_only_chain_rotations_change() {
        let mut pose = bent_leg();
        let before = pose.local_rotations().to_vec();
        two_bone_ik(&mut pose, 1, 3, Vec3::new(0.4, 0.7, 0.3)).unwrap();
        let after = pose.local_rotations();
        assert_eq!(after[0], before[0]);
        assert_eq!(after[3], before[3]);
    }

    #[test]
    fn test_with_rotated_parent() {
        let mut pose = bent_leg();
        pose.set_local_rotation(0, Quat::from_rotation_y(0.8)).unwrap();
        let target = Vec3::new(0.3, 0.8, 0.5);
        two_bone_ik(&mut pose, 1, 3, target).unwrap();
        let positions = pose.global_positions().unwrap();
        assert!((positions[3] - target).length() < 1e-4);
    }

    #[test]
    fn test_not_a_chain() {
        let mut pose = bent_leg();
        assert!(matches!(two_bone_ik(&mut pose, 0, 3, Vec3::ZERO), Err(Error::InvalidHierarchy(_))));
        assert!(matches!(two_bone_ik(&mut pose, 1, 9, Vec3::ZERO), Err(Error::JointOutOfRange { .. })));
    }
}
