//! Skeleton joint hierarchy and forward kinematics

use std::collections::HashMap;

use glam::{Mat4, Quat, Vec3, Vec4};

use crate::core::config::PoseConfig;
use crate::core::error::Error;
use crate::core::types::Result;
use crate::math::rotation;

/// A single joint in a skeletal hierarchy
#[derive(Clone, Debug)]
pub struct Joint {
    pub name: String,
    pub parent_index: Option<usize>,
    /// Rest-pose local-to-parent transform (pre-transform)
    pub rest_offset: Mat4,
}

impl Joint {
    pub fn new(name: impl Into<String>, parent_index: Option<usize>, rest_offset: Mat4) -> Self {
        Self {
            name: name.into(),
            parent_index,
            rest_offset,
        }
    }
}

/// Immutable joint hierarchy shared by every pose built on it.
///
/// Joints are stored in topological order: joint 0 is the only root and
/// every other joint's parent has a smaller index. Forward kinematics is a
/// single pass in index order.
#[derive(Clone, Debug)]
pub struct Skeleton {
    joints: Vec<Joint>,
    joint_names: HashMap<String, usize>,
    config: PoseConfig,
}

impl Skeleton {
    /// Build a skeleton from joints in topological order.
    pub fn new(joints: Vec<Joint>, config: PoseConfig) -> Result<Self> {
        config.validate()?;

        if joints.is_empty() {
            return Err(Error::InvalidHierarchy("skeleton must have at least one joint".into()));
        }

        let mut joint_names = HashMap::with_capacity(joints.len());
        for (index, joint) in joints.iter().enumerate() {
            match (index, joint.parent_index) {
                (0, None) => {}
                (0, Some(parent)) => {
                    return Err(Error::InvalidHierarchy(format!(
                        "root joint {:?} must not have a parent (got {parent})",
                        joint.name
                    )));
                }
                (_, None) => {
                    return Err(Error::InvalidHierarchy(format!(
                        "joint {index} ({:?}) has no parent, only joint 0 may be a root",
                        joint.name
                    )));
                }
                (_, Some(parent)) if parent >= index => {
                    return Err(Error::InvalidHierarchy(format!(
                        "joint {index} ({:?}) has parent {parent}, parents must precede children",
                        joint.name
                    )));
                }
                _ => {}
            }

            if joint_names.insert(joint.name.clone(), index).is_some() {
                return Err(Error::InvalidHierarchy(format!(
                    "joint name {:?} already exists",
                    joint.name
                )));
            }
        }

        log::debug!("Built skeleton with {} joints", joints.len());

        Ok(Self {
            joints,
            joint_names,
            config: config.normalized(),
        })
    }

    /// Build from parallel parent and rest offset arrays.
    ///
    /// `parents[0]` must be `None`. Joints are named `joint_<index>`.
    pub fn from_parents(
        parents: &[Option<usize>],
        rest_offsets: &[Mat4],
        config: PoseConfig,
    ) -> Result<Self> {
        if parents.len() != rest_offsets.len() {
            return Err(Error::shape("rest offsets", parents.len(), rest_offsets.len()));
        }

        let joints = parents
            .iter()
            .zip(rest_offsets)
            .enumerate()
            .map(|(i, (parent, offset))| Joint::new(format!("joint_{i}"), *parent, *offset))
            .collect();

        Self::new(joints, config)
    }

    /// Get the number of joints in the skeleton
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Get a joint by index
    pub fn joint(&self, index: usize) -> Option<&Joint> {
        self.joints.get(index)
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    /// Find a joint index by name
    pub fn find_joint(&self, name: &str) -> Option<usize> {
        self.joint_names.get(name).copied()
    }

    /// Get the parent index of a joint
    pub fn parent_index(&self, index: usize) -> Option<usize> {
        self.joints.get(index)?.parent_index
    }

    /// Get the rest offset of a joint
    pub fn rest_offset(&self, index: usize) -> Option<Mat4> {
        self.joints.get(index).map(|j| j.rest_offset)
    }

    pub fn rest_offsets(&self) -> Vec<Mat4> {
        self.joints.iter().map(|j| j.rest_offset).collect()
    }

    /// Rest translation of every joint relative to its parent
    pub fn bone_offsets(&self) -> Vec<Vec3> {
        self.joints.iter().map(|j| j.rest_offset.w_axis.truncate()).collect()
    }

    /// Conventions this skeleton was built with
    pub fn config(&self) -> &PoseConfig {
        &self.config
    }

    /// Get all children of a joint
    pub fn children(&self, index: usize) -> Vec<usize> {
        self.joints
            .iter()
            .enumerate()
            .filter_map(|(idx, joint)| {
                if joint.parent_index == Some(index) {
                    Some(idx)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Root rest offset with its translation column replaced by `root_position`
    pub fn root_rest_offset(&self, root_position: Vec3) -> Mat4 {
        let mut offset = self.joints[0].rest_offset;
        offset.w_axis = Vec4::new(root_position.x, root_position.y, root_position.z, 1.0);
        offset
    }

    /// All rest offsets, with the root's translation replaced by `root_position`
    pub fn rest_offsets_with_root(&self, root_position: Vec3) -> Vec<Mat4> {
        let mut offsets = self.rest_offsets();
        offsets[0] = self.root_rest_offset(root_position);
        offsets
    }

    /// Global transforms for the given local rotations and root position.
    ///
    /// `global[0] = root_rest(root) * R0` and
    /// `global[i] = global[parent] * rest[i] * Ri`, evaluated in index order.
    pub fn global_transforms(&self, local_rotations: &[Quat], root_position: Vec3) -> Result<Vec<Mat4>> {
        if local_rotations.len() != self.joints.len() {
            return Err(Error::shape("joint rotations", self.joints.len(), local_rotations.len()));
        }

        let eps = self.config.epsilon;
        let mut globals: Vec<Mat4> = Vec::with_capacity(self.joints.len());

        for (index, (joint, rotation)) in self.joints.iter().zip(local_rotations).enumerate() {
            let local = Mat4::from_mat3(rotation::quat_to_mat3(*rotation, eps)?);
            let global = match joint.parent_index {
                Some(parent) => globals[parent] * joint.rest_offset * local,
                None => self.root_rest_offset(root_position) * local,
            };
            debug_assert_eq!(globals.len(), index);
            globals.push(global);
        }

        Ok(globals)
    }

    /// Global transforms of the rest pose (identity rotations, rest root translation)
    pub fn rest_global_transforms(&self) -> Vec<Mat4> {
        let mut globals: Vec<Mat4> = Vec::with_capacity(self.joints.len());
        for joint in &self.joints {
            let global = match joint.parent_index {
                Some(parent) => globals[parent] * joint.rest_offset,
                None => joint.rest_offset,
            };
            globals.push(global);
        }
        globals
    }
}

/// Builder for easier skeleton construction
pub struct SkeletonBuilder {
    joints: Vec<Joint>,
    config: PoseConfig,
    last_error: Option<Error>,
}

impl SkeletonBuilder {
    /// Create a new skeleton builder
    pub fn new() -> Self {
        Self {
            joints: Vec::new(),
            config: PoseConfig::default(),
            last_error: None,
        }
    }

    /// Use the given conventions instead of the defaults
    pub fn config(mut self, config: PoseConfig) -> Self {
        self.config = config;
        self
    }

    /// Add the root joint (no parent)
    pub fn add_root(mut self, name: &str, rest_offset: Mat4) -> Self {
        if self.last_error.is_some() {
            return self;
        }

        if !self.joints.is_empty() {
            self.last_error = Some(Error::InvalidHierarchy(format!(
                "root {name:?} must be the first joint"
            )));
            return self;
        }

        self.joints.push(Joint::new(name, None, rest_offset));
        self
    }

    /// Add a joint with a parent
    pub fn add_joint(mut self, name: &str, parent: &str, rest_offset: Mat4) -> Self {
        if self.last_error.is_some() {
            return self;
        }

        let parent_index = match self.joints.iter().position(|j| j.name == parent) {
            Some(idx) => idx,
            None => {
                self.last_error = Some(Error::InvalidHierarchy(format!(
                    "parent joint {parent:?} not found for {name:?}"
                )));
                return self;
            }
        };

        self.joints.push(Joint::new(name, Some(parent_index), rest_offset));
        self
    }

    /// Add a joint offset from its parent by a pure translation
    pub fn add_joint_at(self, name: &str, parent: &str, offset: Vec3) -> Self {
        self.add_joint(name, parent, Mat4::from_translation(offset))
    }

    /// Build the final skeleton
    pub fn build(self) -> Result<Skeleton> {
        if let Some(error) = self.last_error {
            return Err(error);
        }
        Skeleton::new(self.joints, self.config)
    }
}

impl Default for SkeletonBuilder {
    fn default() -> Self {
        Self::new()
    }
}
