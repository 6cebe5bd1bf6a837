//! Sequences of poses sharing one skeleton

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use rayon::prelude::*;

use super::pose::Pose;
use super::skeleton::Skeleton;
use crate::core::error::Error;
use crate::core::types::Result;
use crate::math::ops::signed_angle;
use crate::math::rotation::{AngleUnit, EulerOrder};

/// An animation: one pose per frame at a fixed frame rate.
#[derive(Clone, Debug)]
pub struct Motion {
    pub name: String,
    skeleton: Arc<Skeleton>,
    poses: Vec<Pose>,
    fps: f32,
}

impl Motion {
    /// Create an empty motion. `fps` must be finite and positive.
    pub fn new(name: impl Into<String>, skeleton: Arc<Skeleton>, fps: f32) -> Result<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(Error::Config(format!("frame rate must be finite and positive, got {fps}")));
        }
        Ok(Self {
            name: name.into(),
            skeleton,
            poses: Vec::new(),
            fps,
        })
    }

    /// Build from per-frame Euler channels and root positions.
    pub fn from_euler_frames(
        name: impl Into<String>,
        skeleton: Arc<Skeleton>,
        frames: &[Vec<Vec3>],
        root_positions: &[Vec3],
        order: EulerOrder,
        unit: AngleUnit,
        fps: f32,
    ) -> Result<Self> {
        if frames.len() != root_positions.len() {
            return Err(Error::shape("root positions", frames.len(), root_positions.len()));
        }

        let mut motion = Self::new(name, skeleton, fps)?;
        for (angles, root) in frames.iter().zip(root_positions) {
            let pose = Pose::from_euler(Arc::clone(&motion.skeleton), angles, order, unit, *root)?;
            motion.poses.push(pose);
        }

        log::debug!("Motion {:?}: {} frames at {} fps", motion.name, motion.poses.len(), fps);
        Ok(motion)
    }

    /// Append a frame. The pose must be bound to this motion's skeleton.
    pub fn push_pose(&mut self, pose: Pose) -> Result<()> {
        if !Arc::ptr_eq(pose.skeleton(), &self.skeleton) {
            return Err(Error::InvalidHierarchy("pose belongs to a different skeleton".into()));
        }
        self.poses.push(pose);
        Ok(())
    }

    pub fn skeleton(&self) -> &Arc<Skeleton> {
        &self.skeleton
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn num_frames(&self) -> usize {
        self.poses.len()
    }

    /// Time of the last frame in seconds
    pub fn duration(&self) -> f32 {
        if self.poses.len() < 2 {
            return 0.0;
        }
        (self.poses.len() - 1) as f32 / self.fps
    }

    pub fn pose(&self, frame: usize) -> Option<&Pose> {
        self.poses.get(frame)
    }

    pub fn poses(&self) -> &[Pose] {
        &self.poses
    }

    pub fn poses_mut(&mut self) -> &mut [Pose] {
        &mut self.poses
    }

    /// Shift every frame's root by `delta`
    pub fn translate_root(&mut self, delta: Vec3) {
        for pose in &mut self.poses {
            pose.translate_root_position(delta);
        }
    }

    /// Re-anchor the motion so `frame` stands at the origin facing the
    /// skeleton's forward axis. The vertical component of every root is kept.
    pub fn align_by_frame(&mut self, frame: usize) -> Result<()> {
        let count = self.poses.len();
        let reference = self
            .poses
            .get(frame)
            .ok_or(Error::JointOutOfRange { index: frame, count })?;

        let config = self.skeleton.config();
        let base = reference.base();
        let facing = reference.facing();
        if facing.length() < config.epsilon.max(1e-6) {
            return Err(Error::DegenerateRotation(format!(
                "frame {frame} has no horizontal facing direction"
            )));
        }

        let angle = signed_angle(facing, config.forward, config.up);
        let turn = Quat::from_axis_angle(config.up, angle);

        for pose in &mut self.poses {
            let root = turn * (pose.root_position() - base);
            pose.set_root_position(root);
            pose.rotate_root(turn)?;
        }

        Ok(())
    }

    /// Pose at `time` seconds, blending the two neighbouring frames.
    ///
    /// Outside the clip the first or last frame is held, unless `looping`.
    pub fn sample(&self, time: f32, looping: bool) -> Option<Pose> {
        let last = self.poses.len().checked_sub(1)?;
        let duration = self.duration();

        let time = if looping && duration > 0.0 {
            time.rem_euclid(duration)
        } else {
            time.clamp(0.0, duration)
        };

        let position = time * self.fps;
        let frame = (position.floor() as usize).min(last);
        let next = (frame + 1).min(last);
        let t = position - frame as f32;

        if frame == next || t <= 0.0 {
            return Some(self.poses[frame].clone());
        }
        Pose::interpolate(&self.poses[frame], &self.poses[next], t).ok()
    }

    /// Global transforms of every frame, evaluated in parallel.
    pub fn global_transforms_par(&self) -> Result<Vec<Vec<Mat4>>> {
        let start = std::time::Instant::now();
        let result = self
            .poses
            .par_iter()
            .map(Pose::global_transforms)
            .collect::<Result<Vec<_>>>();

        log::debug!(
            "Evaluated {} frames of {:?} in {:.2}ms",
            self.poses.len(),
            self.name,
            start.elapsed().as_secs_f64() * 1000.0
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::skeleton::SkeletonBuilder;
    use std::f32::consts::FRAC_PI_2;

    fn skeleton() -> Arc<Skeleton> {
        Arc::new(
            SkeletonBuilder::new()
                .add_root("hips", Mat4::IDENTITY)
                .add_joint_at("spine", "hips", Vec3::Y)
                .add_joint_at("head", "spine", Vec3::Y)
                .build()
                .unwrap(),
        )
    }

    fn walk(skeleton: Arc<Skeleton>, frames: usize) -> Motion {
        let mut motion = Motion::new("walk", skeleton.clone(), 10.0).unwrap();
        for i in 0..frames {
            let pose = Pose::new(
                skeleton.clone(),
                vec![Quat::IDENTITY; 3],
                Vec3::new(i as f32, 1.0, 0.0),
            )
            .unwrap();
            motion.push_pose(pose).unwrap();
        }
        motion
    }

    #[test]
    fn test_from_euler_frames() {
        let skeleton = skeleton();
        let frames = vec![vec![Vec3::ZERO; 3], vec![Vec3::new(0.0, 90.0, 0.0), Vec3::ZERO, Vec3::ZERO]];
        let roots = vec![Vec3::ZERO, Vec3::X];
        let motion = Motion::from_euler_frames(
            "clip",
            skeleton,
            &frames,
            &roots,
            EulerOrder::XYZ,
            AngleUnit::Degrees,
            30.0,
        )
        .unwrap();

        assert_eq!(motion.num_frames(), 2);
        assert!((motion.duration() - 1.0 / 30.0).abs() < 1e-6);
        let q = motion.pose(1).unwrap().local_rotations()[0];
        assert!(q.abs_diff_eq(Quat::from_rotation_y(FRAC_PI_2), 1e-6));
    }

    #[test]
    fn test_from_euler_frames_mismatch() {
        let result = Motion::from_euler_frames(
            "clip",
            skeleton(),
            &[vec![Vec3::ZERO; 3]],
            &[],
            EulerOrder::XYZ,
            AngleUnit::Radians,
            30.0,
        );
        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_push_pose_wrong_skeleton() {
        let mut motion = Motion::new("m", skeleton(), 30.0).unwrap();
        let foreign = Pose::identity(skeleton());
        assert!(matches!(motion.push_pose(foreign), Err(Error::InvalidHierarchy(_))));
    }

    #[test]
    fn test_translate_root() {
        let mut motion = walk(skeleton(), 3);
        motion.translate_root(Vec3::new(0.0, 0.0, 5.0));
        for (i, pose) in motion.poses().iter().enumerate() {
            assert_eq!(pose.root_position(), Vec3::new(i as f32, 1.0, 5.0));
        }
    }

    #[test]
    fn test_sample_interpolates() {
        let motion = walk(skeleton(), 3);
        assert!((motion.duration() - 0.2).abs() < 1e-6);

        let pose = motion.sample(0.05, false).unwrap();
        assert!(pose.root_position().abs_diff_eq(Vec3::new(0.5, 1.0, 0.0), 1e-5));

        let end = motion.sample(10.0, false).unwrap();
        assert!(end.root_position().abs_diff_eq(Vec3::new(2.0, 1.0, 0.0), 1e-5));

        let start = motion.sample(-1.0, false).unwrap();
        assert!(start.root_position().abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1e-5));
    }

    #[test]
    fn test_sample_looping() {
        let motion = walk(skeleton(), 3);
        let pose = motion.sample(0.25, true).unwrap();
        assert!(pose.root_position().abs_diff_eq(Vec3::new(0.5, 1.0, 0.0), 1e-4));
    }

    #[test]
    fn test_sample_empty() {
        let motion = Motion::new("empty", skeleton(), 30.0).unwrap();
        assert!(motion.sample(0.0, false).is_none());
        assert_eq!(motion.duration(), 0.0);
    }

    #[test]
    fn test_align_by_frame() {
        let skeleton = skeleton();
        let mut motion = Motion::new("turned", skeleton.clone(), 30.0).unwrap();
        for i in 0..2 {
            // facing +X, walking along +X
            let pose = Pose::new(
                skeleton.clone(),
                vec![Quat::from_rotation_y(FRAC_PI_2), Quat::IDENTITY, Quat::IDENTITY],
                Vec3::new(3.0 + i as f32, 0.9, 2.0),
            )
            .unwrap();
            motion.push_pose(pose).unwrap();
        }

        motion.align_by_frame(0).unwrap();

        let first = motion.pose(0).unwrap();
        assert!(first.root_position().abs_diff_eq(Vec3::new(0.0, 0.9, 0.0), 1e-5));
        assert!(first.forward().abs_diff_eq(Vec3::Z, 1e-5));

        // the step along +X now points along +Z
        let second = motion.pose(1).unwrap();
        assert!(second.root_position().abs_diff_eq(Vec3::new(0.0, 0.9, 1.0), 1e-5));
        assert!(second.forward().abs_diff_eq(Vec3::Z, 1e-5));
    }

    #[test]
    fn test_invalid_frame_rate() {
        for fps in [f32::NAN, f32::INFINITY, 0.0, -24.0] {
            assert!(matches!(Motion::new("m", skeleton(), fps), Err(Error::Config(_))));
        }

        let result = Motion::from_euler_frames(
            "clip",
            skeleton(),
            &[vec![Vec3::ZERO; 3]],
            &[Vec3::ZERO],
            EulerOrder::XYZ,
            AngleUnit::Radians,
            f32::NAN,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_sample_between_frames_at_valid_rate() {
        let motion = walk(skeleton(), 2);
        let pose = motion.sample(0.1, false).unwrap();
        assert!(pose.root_position().is_finite());
    }

    #[test]
    fn test_align_by_frame_facing_up() {
        let skeleton = skeleton();
        let mut motion = Motion::new("lying", skeleton.clone(), 30.0).unwrap();
        // root pitched so forward (+Z) points straight up
        let pose = Pose::new(
            skeleton.clone(),
            vec![Quat::from_rotation_x(-FRAC_PI_2), Quat::IDENTITY, Quat::IDENTITY],
            Vec3::new(1.0, 0.2, 1.0),
        )
        .unwrap();
        motion.push_pose(pose).unwrap();

        assert!(matches!(motion.align_by_frame(0), Err(Error::DegenerateRotation(_))));
        // nothing moved
        assert_eq!(motion.pose(0).unwrap().root_position(), Vec3::new(1.0, 0.2, 1.0));
    }

    #[test]
    fn test_align_by_frame_out_of_range() {
        let mut motion = walk(skeleton(), 2);
        assert!(motion.align_by_frame(5).is_err());
    }

    #[test]
    fn test_global_transforms_par_matches_serial() {
        let mut motion = walk(skeleton(), 16);
        for (i, pose) in motion.poses_mut().iter_mut().enumerate() {
            pose.set_local_rotation(1, Quat::from_rotation_z(i as f32 * 0.1)).unwrap();
        }

        let parallel = motion.global_transforms_par().unwrap();
        assert_eq!(parallel.len(), 16);
        for (pose, globals) in motion.poses().iter().zip(&parallel) {
            let serial = pose.global_transforms().unwrap();
            assert_eq!(&serial, globals);
        }
    }
}
