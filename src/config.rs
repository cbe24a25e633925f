//! Configuration for keypoint selection and reconstruction.
//!
//! This module provides the [`InterpolationConfig`] struct which selects one
//! keypoint strategy together with its numeric parameters, plus presets tuned
//! for common manipulation tasks.
//!
//! # Example
//!
//! ```
//! use dynamics_keypoints::{InterpolationConfig, KeypointMethod};
//!
//! // Fixed spacing of 5 frames
//! let config = InterpolationConfig::set_interval(5);
//! assert!(config.validate().is_ok());
//!
//! // Method names can be parsed from strings
//! let method: KeypointMethod = "adaptiveJerk".parse()?;
//! assert_eq!(method, KeypointMethod::AdaptiveJerk);
//! # Ok::<(), dynamics_keypoints::InterpolationError>(())
//! ```

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{InterpolationError, Result};

/// Keypoint selection strategy.
///
/// Serialized under its camelCase name; deserialization goes through
/// [`FromStr`], so unknown names are [`InterpolationError::UnknownMethod`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(rename_all = "camelCase", try_from = "String")
)]
pub enum KeypointMethod {
    /// Every `min_n`-th frame, identical for all channels.
    #[default]
    SetInterval,
    /// Threshold on the acceleration profile with min/max spacing.
    AdaptiveAccel,
    /// Threshold on the jerk profile with min/max spacing.
    AdaptiveJerk,
    /// Breadth-first interval bisection driven by midpoint error.
    IterativeError,
    /// Velocity magnitude change and direction reversal.
    MagVelChange,
}

impl KeypointMethod {
    /// All methods, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::SetInterval,
        Self::AdaptiveAccel,
        Self::AdaptiveJerk,
        Self::IterativeError,
        Self::MagVelChange,
    ];

    /// Canonical camelCase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SetInterval => "setInterval",
            Self::AdaptiveAccel => "adaptiveAccel",
            Self::AdaptiveJerk => "adaptiveJerk",
            Self::IterativeError => "iterativeError",
            Self::MagVelChange => "magVelChange",
        }
    }

    /// Whether the method runs the min/max spacing controller.
    #[must_use]
    pub const fn uses_max_spacing(self) -> bool {
        matches!(
            self,
            Self::AdaptiveAccel | Self::AdaptiveJerk | Self::MagVelChange
        )
    }
}

impl fmt::Display for KeypointMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KeypointMethod {
    type Err = InterpolationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "setInterval" | "set_interval" => Ok(Self::SetInterval),
            "adaptiveAccel" | "adaptive_accel" => Ok(Self::AdaptiveAccel),
            "adaptiveJerk" | "adaptive_jerk" => Ok(Self::AdaptiveJerk),
            "iterativeError" | "iterative_error" => Ok(Self::IterativeError),
            "magVelChange" | "mag_vel_change" => Ok(Self::MagVelChange),
            other => Err(InterpolationError::unknown_method(other)),
        }
    }
}

impl TryFrom<String> for KeypointMethod {
    type Error = InterpolationError;

    fn try_from(name: String) -> Result<Self> {
        name.parse()
    }
}

/// Polynomial order used between keypoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum InterpolationOrder {
    /// Straight line between consecutive keypoints.
    #[default]
    Linear,
    /// Parabola through three consecutive keypoints.
    Quadratic,
    /// Cubic through four consecutive keypoints.
    Cubic,
}

impl InterpolationOrder {
    /// Polynomial degree.
    #[must_use]
    pub const fn degree(self) -> usize {
        match self {
            Self::Linear => 1,
            Self::Quadratic => 2,
            Self::Cubic => 3,
        }
    }
}

/// How the last reconstructed frame is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FinalFrame {
    /// Last frame repeats frame `T-2`.
    #[default]
    MirrorPrevious,
    /// Last frame takes the ground truth at `T-1`.
    Exact,
}

/// Reconstruction settings carried alongside the keypoint strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReconstructionSettings {
    /// Interpolant between keypoints.
    pub order: InterpolationOrder,
    /// Boundary convention for frame `T-1`.
    pub final_frame: FinalFrame,
}

/// Configuration for keypoint selection.
///
/// Only the parameters relevant to `method` are read; the others are kept so a
/// configuration can be switched between methods with the builders.
///
/// # Spacing Parameters
///
/// - `min_n`: Fixed spacing for `setInterval`, minimum spacing for the
///   controller strategies, acceptance width for `iterativeError`.
/// - `max_n`: Forced re-evaluation ceiling for the controller strategies.
///
/// # Thresholds
///
/// - `accel_threshold`: `|accel|` above which `adaptiveAccel` emits.
/// - `jerk_threshold`: `|jerk|` above which `adaptiveJerk` emits.
/// - `iterative_error_threshold`: Midpoint MSE below which an interval is accepted.
/// - `vel_change_required`: Velocity drift from the last keypoint that triggers `magVelChange`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InterpolationConfig {
    /// Keypoint strategy.
    pub method: KeypointMethod,

    /// Minimum (or fixed) keypoint spacing in frames.
    pub min_n: usize,

    /// Maximum keypoint spacing in frames.
    pub max_n: usize,

    /// Acceleration threshold for `adaptiveAccel`.
    pub accel_threshold: f64,

    /// Jerk threshold for `adaptiveJerk`.
    pub jerk_threshold: f64,

    /// Midpoint mean-squared-error threshold for `iterativeError`.
    /// - 0.05: reaching and pushing
    /// - 0.001: pendulum
    pub iterative_error_threshold: f64,

    /// Velocity change threshold for `magVelChange`.
    pub vel_change_required: f64,

    /// Reconstruction settings.
    pub reconstruction: ReconstructionSettings,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            method: KeypointMethod::SetInterval,
            min_n: 5,
            max_n: 200,
            accel_threshold: 0.0005,
            jerk_threshold: 0.0005,
            iterative_error_threshold: 0.002,
            vel_change_required: 0.1,
            reconstruction: ReconstructionSettings::default(),
        }
    }
}

impl InterpolationConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`InterpolationError::InvalidConfig`] if:
    /// - `min_n` is zero
    /// - a controller strategy has `max_n == 0` or `min_n >= max_n`
    /// - the threshold read by `method` is negative or not finite
    pub fn validate(&self) -> Result<()> {
        if self.min_n == 0 {
            return Err(InterpolationError::invalid_config(format!(
                "{}: min_n must be at least 1",
                self.method
            )));
        }

        if self.method.uses_max_spacing() {
            if self.max_n == 0 {
                return Err(InterpolationError::invalid_config(format!(
                    "{}: max_n must be at least 1",
                    self.method
                )));
            }
            if self.min_n >= self.max_n {
                return Err(InterpolationError::invalid_config(format!(
                    "{}: min_n ({}) must be less than max_n ({})",
                    self.method, self.min_n, self.max_n
                )));
            }
        }

        let (name, threshold) = match self.method {
            KeypointMethod::SetInterval => return Ok(()),
            KeypointMethod::AdaptiveAccel => ("accel_threshold", self.accel_threshold),
            KeypointMethod::AdaptiveJerk => ("jerk_threshold", self.jerk_threshold),
            KeypointMethod::IterativeError => {
                ("iterative_error_threshold", self.iterative_error_threshold)
            }
            KeypointMethod::MagVelChange => ("vel_change_required", self.vel_change_required),
        };
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(InterpolationError::invalid_config(format!(
                "{}: {name} must be finite and non-negative, got {threshold}",
                self.method
            )));
        }

        Ok(())
    }

    /// Fixed spacing of `min_n` frames.
    #[must_use]
    pub fn set_interval(min_n: usize) -> Self {
        Self {
            method: KeypointMethod::SetInterval,
            min_n,
            ..Self::default()
        }
    }

    /// Acceleration-triggered keypoints.
    #[must_use]
    pub fn adaptive_accel(min_n: usize, max_n: usize, accel_threshold: f64) -> Self {
        Self {
            method: KeypointMethod::AdaptiveAccel,
            min_n,
            max_n,
            accel_threshold,
            ..Self::default()
        }
    }

    /// Jerk-triggered keypoints.
    #[must_use]
    pub fn adaptive_jerk(min_n: usize, max_n: usize, jerk_threshold: f64) -> Self {
        Self {
            method: KeypointMethod::AdaptiveJerk,
            min_n,
            max_n,
            jerk_threshold,
            ..Self::default()
        }
    }

    /// Error-driven interval bisection.
    #[must_use]
    pub fn iterative_error(min_n: usize, iterative_error_threshold: f64) -> Self {
        Self {
            method: KeypointMethod::IterativeError,
            min_n,
            iterative_error_threshold,
            ..Self::default()
        }
    }

    /// Velocity-change-triggered keypoints.
    #[must_use]
    pub fn mag_vel_change(min_n: usize, max_n: usize, vel_change_required: f64) -> Self {
        Self {
            method: KeypointMethod::MagVelChange,
            min_n,
            max_n,
            vel_change_required,
            ..Self::default()
        }
    }

    /// Preset for reaching tasks.
    #[must_use]
    pub fn reaching() -> Self {
        Self::iterative_error(5, 0.05)
    }

    /// Preset for pushing tasks.
    #[must_use]
    pub fn pushing() -> Self {
        Self::iterative_error(5, 0.05)
    }

    /// Preset for pendulum swing-up.
    #[must_use]
    pub fn pendulum() -> Self {
        Self::iterative_error(5, 0.001)
    }

    /// The four strategies compared side by side from one parameter set.
    ///
    /// `threshold` is shared by the acceleration and jerk controllers; the
    /// iterative strategy keeps its default error threshold.
    #[must_use]
    pub fn standard_suite(min_n: usize, max_n: usize, threshold: f64) -> Vec<Self> {
        vec![
            Self::set_interval(min_n),
            Self::adaptive_jerk(min_n, max_n, threshold),
            Self::adaptive_accel(min_n, max_n, threshold),
            Self::iterative_error(min_n, Self::default().iterative_error_threshold),
        ]
    }

    /// Set the keypoint method.
    #[must_use]
    pub const fn with_method(mut self, method: KeypointMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the spacing bounds.
    #[must_use]
    pub const fn with_spacing(mut self, min_n: usize, max_n: usize) -> Self {
        self.min_n = min_n;
        self.max_n = max_n;
        self
    }

    /// Set the iterative error threshold.
    #[must_use]
    pub const fn with_iterative_error_threshold(mut self, threshold: f64) -> Self {
        self.iterative_error_threshold = threshold;
        self
    }

    /// Set the interpolation order.
    #[must_use]
    pub const fn with_order(mut self, order: InterpolationOrder) -> Self {
        self.reconstruction.order = order;
        self
    }

    /// Set the final frame convention.
    #[must_use]
    pub const fn with_final_frame(mut self, final_frame: FinalFrame) -> Self {
        self.reconstruction.final_frame = final_frame;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InterpolationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_n, 5);
        assert_eq!(config.max_n, 200);
        assert_eq!(config.reconstruction.order, InterpolationOrder::Linear);
        assert_eq!(config.reconstruction.final_frame, FinalFrame::MirrorPrevious);
    }

    #[test]
    fn test_method_parsing() {
        for method in KeypointMethod::ALL {
            assert_eq!(method.name().parse::<KeypointMethod>().unwrap(), method);
        }
        assert_eq!(
            "iterative_error".parse::<KeypointMethod>().unwrap(),
            KeypointMethod::IterativeError
        );

        let err = "quadraticFit".parse::<KeypointMethod>().unwrap_err();
        assert_eq!(err, InterpolationError::unknown_method("quadraticFit"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_validation() {
        assert!(InterpolationConfig::set_interval(0).validate().is_err());
        assert!(InterpolationConfig::iterative_error(0, 0.1).validate().is_err());

        // min_n >= max_n only matters for the controller strategies
        assert!(InterpolationConfig::adaptive_accel(10, 10, 0.1).validate().is_err());
        assert!(InterpolationConfig::adaptive_jerk(3, 0, 0.1).validate().is_err());
        assert!(InterpolationConfig::mag_vel_change(20, 5, 0.1).validate().is_err());
        assert!(InterpolationConfig::set_interval(5).with_spacing(5, 1).validate().is_ok());

        assert!(InterpolationConfig::adaptive_accel(2, 10, -0.1).validate().is_err());
        assert!(InterpolationConfig::iterative_error(1, f64::NAN).validate().is_err());
        assert!(InterpolationConfig::iterative_error(1, 0.0).validate().is_ok());
    }

    #[test]
    fn test_presets() {
        assert_eq!(InterpolationConfig::reaching().iterative_error_threshold, 0.05);
        assert_eq!(InterpolationConfig::pendulum().iterative_error_threshold, 0.001);
        assert!(InterpolationConfig::pushing().validate().is_ok());

        let suite = InterpolationConfig::standard_suite(5, 200, 0.0005);
        let methods: Vec<_> = suite.iter().map(|c| c.method).collect();
        assert_eq!(
            methods,
            vec![
                KeypointMethod::SetInterval,
                KeypointMethod::AdaptiveJerk,
                KeypointMethod::AdaptiveAccel,
                KeypointMethod::IterativeError,
            ]
        );
        assert!(suite.iter().all(|c| c.validate().is_ok()));
    }

    #[test]
    fn test_builder_pattern() {
        let config = InterpolationConfig::set_interval(3)
            .with_method(KeypointMethod::AdaptiveAccel)
            .with_spacing(2, 8)
            .with_order(InterpolationOrder::Cubic)
            .with_final_frame(FinalFrame::Exact);
        assert_eq!(config.method, KeypointMethod::AdaptiveAccel);
        assert_eq!((config.min_n, config.max_n), (2, 8));
        assert_eq!(config.reconstruction.order.degree(), 3);
        assert_eq!(config.reconstruction.final_frame, FinalFrame::Exact);
    }
}
