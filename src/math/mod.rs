//! Mathematical utilities

pub mod aabb;
pub mod ops;
pub mod rotation;

pub use aabb::Aabb;
pub use rotation::{AngleUnit, Axis, EulerOrder, SixD};
