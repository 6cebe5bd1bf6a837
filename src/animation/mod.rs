//! Skeletal pose system
pub mod skeleton;
pub mod pose;
pub mod bone;
pub mod motion;
pub mod ik;

pub use skeleton::{Joint, Skeleton, SkeletonBuilder};
pub use pose::Pose;
pub use bone::{bone_segments, BoneInstance, BoneSegment};
pub use motion::Motion;
pub use ik::{two_bone_ik, TwoBoneSolution};
