//! Error types for the pose engine

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid hierarchy: {0}")]
    InvalidHierarchy(String),

    #[error("Shape mismatch: expected {expected} {what}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Degenerate rotation: {0}")]
    DegenerateRotation(String),

    #[error("Joint index {index} out of range (skeleton has {count} joints)")]
    JointOutOfRange { index: usize, count: usize },

    #[error("Invalid Euler order: {0:?}")]
    InvalidEulerOrder(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn shape(what: &'static str, expected: usize, actual: usize) -> Self {
        Error::ShapeMismatch { what, expected, actual }
    }
}
