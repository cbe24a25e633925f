//! End-to-end evaluation of keypoint configurations.
//!
//! For each [`InterpolationConfig`]: select keypoints, reconstruct the dense
//! `A`/`B` sequences, and score them against the ground truth. Batches run
//! their configurations in parallel; a configuration that fails validation
//! yields its own error without affecting the rest.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::InterpolationConfig;
use crate::error::Result;
use crate::keypoints::{select_keypoints, KeypointSequence};
use crate::reconstruction::{quat_keypoints, reconstruct, ReconstructedTrajectory};
use crate::scoring::{score, ErrorScore};
use crate::trajectory::Trajectory;

/// Outcome of one configuration.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Configuration that produced this result.
    pub config: InterpolationConfig,
    /// Keypoints per channel.
    pub keypoints: Vec<KeypointSequence>,
    /// Shared keypoints of the periodic columns, if any.
    pub quat_keypoints: Option<KeypointSequence>,
    /// Dense reconstruction.
    pub reconstruction: ReconstructedTrajectory,
    /// Fidelity against the ground truth.
    pub error: ErrorScore,
}

impl Evaluation {
    /// Total number of channel keypoints.
    #[must_use]
    pub fn total_keypoints(&self) -> usize {
        self.keypoints.iter().map(KeypointSequence::len).sum()
    }

    /// Fraction of channel frames kept as keypoints, in `(0, 1]`.
    #[must_use]
    pub fn compression_ratio(&self) -> f64 {
        let n_frames = self.reconstruction.n_frames();
        let slots = n_frames * self.keypoints.len();
        if slots == 0 {
            0.0
        } else {
            self.total_keypoints() as f64 / slots as f64
        }
    }
}

/// Run one configuration end to end.
///
/// # Errors
///
/// Returns a configuration error if `config` is invalid.
pub fn evaluate(trajectory: &Trajectory, config: &InterpolationConfig) -> Result<Evaluation> {
    let keypoints = select_keypoints(trajectory, config)?;
    let quat_keypoints = quat_keypoints(trajectory);
    let reconstruction = reconstruct(
        trajectory,
        &keypoints,
        quat_keypoints.as_ref(),
        &config.reconstruction,
    )?;
    let error = score(trajectory, &reconstruction)?;

    debug!(
        method = %config.method,
        error_a = error.a,
        error_b = error.b,
        "evaluated configuration"
    );

    Ok(Evaluation {
        config: config.clone(),
        keypoints,
        quat_keypoints,
        reconstruction,
        error,
    })
}

/// Run several configurations independently, in parallel.
///
/// Results are returned in the order of `configs`.
#[must_use]
pub fn evaluate_all(
    trajectory: &Trajectory,
    configs: &[InterpolationConfig],
) -> Vec<Result<Evaluation>> {
    configs
        .par_iter()
        .map(|config| {
            let result = evaluate(trajectory, config);
            if let Err(err) = &result {
                warn!(method = %config.method, error = %err, "configuration failed");
            }
            result
        })
        .collect()
}

/// The successful evaluation with the lowest total error.
#[must_use]
pub fn best(results: &[Result<Evaluation>]) -> Option<&Evaluation> {
    results
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .min_by(|x, y| x.error.total().total_cmp(&y.error.total()))
}
