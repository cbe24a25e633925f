//! Dynamics Keypoints Library
//!
//! Keypoint compression of linearized-dynamics trajectories.
//!
//! A rollout of a robot or system yields per-timestep Jacobians `A_t`
//! (state-to-state) and `B_t` (control-to-state). This library keeps the exact
//! matrices only at a sparse set of keypoint frames per state channel,
//! rebuilds the dense sequence by interpolation, and scores the result against
//! the ground truth so keypoint strategies can be compared.
//!
//! # Features
//!
//! - **Five strategies**: fixed interval, acceleration / jerk thresholds,
//!   velocity change, and error-driven interval bisection
//! - **Per-channel keypoints**: each velocity channel is compressed
//!   independently; quaternion scalars share a periodic schedule
//! - **Linear, quadratic or cubic** reconstruction between keypoints
//! - **Parallel batches**: configurations evaluated side by side with `rayon`
//!
//! # Quick Start
//!
//! ```
//! use dynamics_keypoints::{evaluate, ChannelLayout, InterpolationConfig, Trajectory};
//! use nalgebra::DMatrix;
//!
//! let t = 50;
//! let layout = ChannelLayout::actuated(2);
//! let trajectory = Trajectory::new(
//!     DMatrix::from_fn(t, 4, |f, c| (f as f64 * 0.1 + c as f64).sin()),
//!     DMatrix::zeros(t, 2),
//!     (0..t).map(|f| DMatrix::from_element(4, 4, f as f64 * 0.01)).collect(),
//!     (0..t).map(|_| DMatrix::identity(4, 2)).collect(),
//!     layout,
//! )?;
//!
//! let result = evaluate(&trajectory, &InterpolationConfig::iterative_error(2, 1e-4))?;
//! println!("kept {} keypoints, MAE {}", result.total_keypoints(), result.error.total());
//! # Ok::<(), dynamics_keypoints::InterpolationError>(())
//! ```
//!
//! # Pipeline
//!
//! | Stage | Function |
//! |-------|----------|
//! | Derived profiles | [`Trajectory::profiles`] |
//! | Keypoint selection | [`select_keypoints`] |
//! | Interval refinement | [`refine_channel`] |
//! | Reconstruction | [`reconstruct`] |
//! | Scoring | [`score`] |

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

pub mod config;
pub mod error;
pub mod evaluation;
pub mod keypoints;
pub mod profile;
pub mod reconstruction;
pub mod refinement;
pub mod scoring;
pub mod trajectory;

// Re-exports for convenient access
pub use config::{
    FinalFrame, InterpolationConfig, InterpolationOrder, KeypointMethod, ReconstructionSettings,
};
pub use error::{ErrorKind, InterpolationError, Result};
pub use evaluation::{best, evaluate, evaluate_all, Evaluation};
pub use keypoints::{
    periodic_keypoints, select_keypoints, set_interval_keypoints, KeypointSequence,
    QUAT_W_SAMPLE_PERIOD,
};
pub use profile::{acceleration_profile, jerk_profile, DerivedProfiles};
pub use reconstruction::{quat_keypoints, reconstruct, ReconstructedTrajectory};
pub use refinement::{
    midpoint_error, refine_channel, refine_channel_detailed, AcceptedInterval, Interval,
    Refinement,
};
pub use scoring::{mean_absolute_error, score, ErrorScore};
pub use trajectory::{ChannelLayout, Trajectory};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
