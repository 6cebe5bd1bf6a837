//! Posekit - skeletal pose engine
//!
//! Forward kinematics over parent-indexed joint hierarchies, conversions
//! between rotation representations, and bone geometry for rendering.

pub mod core;
pub mod math;
pub mod animation;

pub use crate::animation::{Motion, Pose, Skeleton, SkeletonBuilder};
pub use crate::core::{Error, PoseConfig, Result};
