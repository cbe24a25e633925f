//! Reconstruction fidelity scoring.
//!
//! The score of one sequence pair is the mean absolute error per entry and per
//! frame: absolute differences are accumulated into an `R x C` matrix over all
//! `T` frames, divided by `T`, and the accumulator's sum is divided by `R * C`.
//! Large discrepancies are not clipped.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use nalgebra::DMatrix;

use crate::error::{InterpolationError, Result};
use crate::reconstruction::ReconstructedTrajectory;
use crate::trajectory::Trajectory;

/// Error of one reconstruction against its ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ErrorScore {
    /// Mean absolute error of `A`.
    pub a: f64,
    /// Mean absolute error of `B`.
    pub b: f64,
}

impl ErrorScore {
    /// Combined score, `a + b`.
    #[inline]
    #[must_use]
    pub fn total(&self) -> f64 {
        self.a + self.b
    }
}

/// Score a reconstruction against the trajectory it was built from.
///
/// # Errors
///
/// Returns a shape mismatch error if the sequences disagree in length or
/// matrix shape.
pub fn score(trajectory: &Trajectory, reconstruction: &ReconstructedTrajectory) -> Result<ErrorScore> {
    Ok(ErrorScore {
        a: mean_absolute_error(trajectory.a(), &reconstruction.a)?,
        b: mean_absolute_error(trajectory.b(), &reconstruction.b)?,
    })
}

/// Mean absolute error between two matrix sequences of shape `(T, R, C)`.
///
/// Returns `0.0` for empty sequences or zero-sized matrices.
///
/// # Errors
///
/// Returns a shape mismatch error if lengths or matrix shapes differ.
pub fn mean_absolute_error(truth: &[DMatrix<f64>], prediction: &[DMatrix<f64>]) -> Result<f64> {
    if truth.len() != prediction.len() {
        return Err(InterpolationError::shape_mismatch(
            "scored sequence",
            format!("{} frames", truth.len()),
            format!("{} frames", prediction.len()),
        ));
    }
    let Some(first) = truth.first() else {
        return Ok(0.0);
    };

    let (rows, cols) = first.shape();
    let mut accumulator = DMatrix::<f64>::zeros(rows, cols);
    for (frame, (t, p)) in truth.iter().zip(prediction).enumerate() {
        if t.shape() != (rows, cols) || p.shape() != (rows, cols) {
            return Err(InterpolationError::shape_mismatch(
                format!("scored frame {frame}"),
                format!("{rows}x{cols}"),
                format!("{}x{} vs {}x{}", t.nrows(), t.ncols(), p.nrows(), p.ncols()),
            ));
        }
        accumulator += (t - p).abs();
    }
    accumulator /= truth.len() as f64;

    let entries = rows * cols;
    if entries == 0 {
        Ok(0.0)
    } else {
        Ok(accumulator.sum() / entries as f64)
    }
}
