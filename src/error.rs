//! Error types for keypoint selection and reconstruction.
//!
//! Errors fall into two families:
//!
//! - **Configuration** errors reject a single [`InterpolationConfig`] and leave
//!   the other configurations of a batch untouched.
//! - **Degenerate input** errors reject the trajectory itself and are fatal for
//!   the whole call.
//!
//! [`InterpolationConfig`]: crate::config::InterpolationConfig

use thiserror::Error;

/// Main error type for keypoint interpolation operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterpolationError {
    /// Keypoint method name not recognized.
    #[error("Unknown keypoint method: {0}")]
    UnknownMethod(String),

    /// Configuration parameters are out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Trajectory has too few frames for the derived profiles.
    #[error("Trajectory too short: need at least {min} frames, got {actual}")]
    TrajectoryTooShort { min: usize, actual: usize },

    /// A sequence or matrix does not match the configured channel layout.
    #[error("Shape mismatch in {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: String,
        expected: String,
        actual: String,
    },

    /// Channel layout is inconsistent with itself.
    #[error("Invalid channel layout: {0}")]
    InvalidLayout(String),

    /// Keypoint indices violate the sequence invariants.
    #[error("Invalid keypoints: {0}")]
    InvalidKeypoints(String),
}

/// Coarse classification of an [`InterpolationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejects one configuration only.
    Configuration,
    /// Rejects the trajectory; fatal for the whole call.
    DegenerateInput,
}

/// Result type alias for keypoint interpolation operations.
pub type Result<T> = std::result::Result<T, InterpolationError>;

impl InterpolationError {
    /// Create an unknown method error.
    #[must_use]
    pub fn unknown_method(name: impl Into<String>) -> Self {
        Self::UnknownMethod(name.into())
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a trajectory too short error.
    #[must_use]
    pub const fn trajectory_too_short(min: usize, actual: usize) -> Self {
        Self::TrajectoryTooShort { min, actual }
    }

    /// Create a shape mismatch error.
    #[must_use]
    pub fn shape_mismatch(
        what: impl Into<String>,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        Self::ShapeMismatch {
            what: what.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create an invalid layout error.
    #[must_use]
    pub fn invalid_layout(msg: impl Into<String>) -> Self {
        Self::InvalidLayout(msg.into())
    }

    /// Create an invalid keypoints error.
    #[must_use]
    pub fn invalid_keypoints(msg: impl Into<String>) -> Self {
        Self::InvalidKeypoints(msg.into())
    }

    /// Which error family this belongs to.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownMethod(_) | Self::InvalidConfig(_) => ErrorKind::Configuration,
            Self::TrajectoryTooShort { .. }
            | Self::ShapeMismatch { .. }
            | Self::InvalidLayout(_)
            | Self::InvalidKeypoints(_) => ErrorKind::DegenerateInput,
        }
    }

    /// Whether this error only invalidates a single configuration.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self.kind(), ErrorKind::Configuration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = InterpolationError::trajectory_too_short(3, 2);
        assert!(err.to_string().contains('3'));
        assert!(err.to_string().contains('2'));

        let err = InterpolationError::shape_mismatch("A[4]", "14x14", "14x13");
        assert!(err.to_string().contains("A[4]"));
        assert!(err.to_string().contains("14x13"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            InterpolationError::unknown_method("spline").kind(),
            ErrorKind::Configuration
        );
        assert!(InterpolationError::invalid_config("minN must be >= 1").is_configuration());
        assert_eq!(
            InterpolationError::trajectory_too_short(3, 1).kind(),
            ErrorKind::DegenerateInput
        );
        assert!(!InterpolationError::invalid_layout("dof_vel is zero").is_configuration());
    }
}
