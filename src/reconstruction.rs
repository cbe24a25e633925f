//! Dense reconstruction of `A`/`B` sequences from keypoints.
//!
//! Ground truth is read only at keypoint frames. Each channel column is
//! rebuilt segment by segment from its own keypoints; the quaternion scalar
//! columns (and any column no channel owns) share one periodic sequence.
//!
//! ## Interpolants
//!
//! - **Linear**: `v(s + k) = v(s) + (v(e) - v(s)) * k / (e - s)`.
//! - **Quadratic / cubic**: a polynomial through 3 or 4 consecutive
//!   keypoints, solved as a Vandermonde system in frame offsets relative to
//!   the first keypoint of the window. Segment `j` uses the window starting
//!   at keypoint `min(j, K - degree - 1)`.
//!
//! Keypoint frames are always copied, never re-evaluated.

use nalgebra::linalg::LU;
use nalgebra::{DMatrix, DVector, Dyn};
use tracing::debug;

use crate::config::{FinalFrame, InterpolationOrder, ReconstructionSettings};
use crate::error::{InterpolationError, Result};
use crate::keypoints::{periodic_keypoints, KeypointSequence, QUAT_W_SAMPLE_PERIOD};
use crate::trajectory::Trajectory;

/// Reconstructed sensitivity sequences, same shapes as the ground truth.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructedTrajectory {
    /// Reconstructed `A_t`.
    pub a: Vec<DMatrix<f64>>,
    /// Reconstructed `B_t`.
    pub b: Vec<DMatrix<f64>>,
}

impl ReconstructedTrajectory {
    /// Number of frames.
    #[must_use]
    pub fn n_frames(&self) -> usize {
        self.a.len()
    }
}

/// Shared keypoints for the periodic columns, if the layout has any.
#[must_use]
pub fn quat_keypoints(trajectory: &Trajectory) -> Option<KeypointSequence> {
    let layout = trajectory.layout();
    let needed = !layout.periodic_state_columns().is_empty()
        || !layout.periodic_control_columns().is_empty();
    // a validated trajectory has at least two frames
    needed
        .then(|| periodic_keypoints(trajectory.n_frames(), QUAT_W_SAMPLE_PERIOD).ok())
        .flatten()
}

/// Reconstruct `A` and `B` from per-channel keypoints.
///
/// # Arguments
///
/// * `trajectory` - Ground truth, consulted at keypoint frames only
/// * `keypoints` - One sequence per channel
/// * `quat_keypoints` - Shared sequence for the periodic columns; generated
///   with [`QUAT_W_SAMPLE_PERIOD`] if `None` and needed
/// * `settings` - Interpolation order and final frame convention
///
/// # Errors
///
/// Returns a degenerate input error if the number of sequences differs from
/// the channel count, or a sequence does not run strictly increasing from
/// `0` to `T-1`.
pub fn reconstruct(
    trajectory: &Trajectory,
    keypoints: &[KeypointSequence],
    quat_keypoints: Option<&KeypointSequence>,
    settings: &ReconstructionSettings,
) -> Result<ReconstructedTrajectory> {
    let layout = trajectory.layout();
    let n_frames = trajectory.n_frames();

    if keypoints.len() != layout.num_channels() {
        return Err(InterpolationError::shape_mismatch(
            "keypoints",
            format!("{} channels", layout.num_channels()),
            format!("{} channels", keypoints.len()),
        ));
    }
    for seq in keypoints.iter().chain(quat_keypoints) {
        seq.check_frames(n_frames)?;
    }

    let truth_a = trajectory.a();
    let truth_b = trajectory.b();
    let mut a: Vec<DMatrix<f64>> = truth_a
        .iter()
        .map(|m| DMatrix::zeros(m.nrows(), m.ncols()))
        .collect();
    let mut b: Vec<DMatrix<f64>> = truth_b
        .iter()
        .map(|m| DMatrix::zeros(m.nrows(), m.ncols()))
        .collect();

    for (channel, seq) in keypoints.iter().enumerate() {
        interpolate_column(truth_a, &mut a, layout.position_column(channel), seq, settings.order);
        interpolate_column(truth_a, &mut a, layout.velocity_column(channel), seq, settings.order);
        if let Some(col) = layout.control_column(channel) {
            interpolate_column(truth_b, &mut b, col, seq, settings.order);
        }
    }

    let state_cols = layout.periodic_state_columns();
    let control_cols = layout.periodic_control_columns();
    if !state_cols.is_empty() || !control_cols.is_empty() {
        let generated;
        let shared = match quat_keypoints {
            Some(seq) => seq,
            None => {
                generated = periodic_keypoints(n_frames, QUAT_W_SAMPLE_PERIOD)?;
                &generated
            }
        };
        for col in state_cols {
            interpolate_column(truth_a, &mut a, col, shared, settings.order);
        }
        for col in control_cols {
            interpolate_column(truth_b, &mut b, col, shared, settings.order);
        }
    }

    let last = n_frames - 1;
    match settings.final_frame {
        FinalFrame::MirrorPrevious => {
            a[last] = a[last - 1].clone();
            b[last] = b[last - 1].clone();
        }
        FinalFrame::Exact => {
            a[last] = truth_a[last].clone();
            b[last] = truth_b[last].clone();
        }
    }

    debug!(
        n_frames,
        channels = keypoints.len(),
        order = ?settings.order,
        "reconstructed trajectory"
    );

    Ok(ReconstructedTrajectory { a, b })
}

/// Rebuild one column of every frame from `keypoints`.
fn interpolate_column(
    truth: &[DMatrix<f64>],
    out: &mut [DMatrix<f64>],
    col: usize,
    keypoints: &KeypointSequence,
    order: InterpolationOrder,
) {
    let kp = keypoints.as_slice();
    let window = order.degree() + 1;
    let rows = truth[0].nrows();

    for (j, (start, end)) in keypoints.segments().enumerate() {
        for row in 0..rows {
            out[start][(row, col)] = truth[start][(row, col)];
        }

        let steps = end - start;
        if steps < 2 {
            continue;
        }

        let fit = if order == InterpolationOrder::Linear || kp.len() < window {
            None
        } else {
            let w = j.min(kp.len() - window);
            PolynomialFit::new(&kp[w..w + window])
        };

        for row in 0..rows {
            let coeffs = fit
                .as_ref()
                .and_then(|f| f.coefficients(|frame| truth[frame][(row, col)]));

            match (&fit, coeffs) {
                (Some(fit), Some(coeffs)) => {
                    for k in 1..steps {
                        out[start + k][(row, col)] = fit.evaluate(&coeffs, start + k);
                    }
                }
                _ => {
                    let sv = truth[start][(row, col)];
                    let ev = truth[end][(row, col)];
                    let diff = ev - sv;
                    for k in 1..steps {
                        out[start + k][(row, col)] = sv + diff * (k as f64 / steps as f64);
                    }
                }
            }
        }
    }
}

/// Vandermonde fit through a window of keypoints.
struct PolynomialFit<'a> {
    frames: &'a [usize],
    lu: LU<f64, Dyn, Dyn>,
}

impl<'a> PolynomialFit<'a> {
    fn new(frames: &'a [usize]) -> Option<Self> {
        let origin = frames[0];
        let n = frames.len();
        let vandermonde = DMatrix::from_fn(n, n, |i, p| {
            ((frames[i] - origin) as f64).powi(p as i32)
        });
        let lu = vandermonde.lu();
        lu.is_invertible().then_some(Self { frames, lu })
    }

    /// Coefficients (ascending powers) through `value(frame)` at the window.
    fn coefficients(&self, value: impl Fn(usize) -> f64) -> Option<DVector<f64>> {
        let y = DVector::from_iterator(self.frames.len(), self.frames.iter().map(|&f| value(f)));
        self.lu.solve(&y)
    }

    /// Horner evaluation at `frame`.
    fn evaluate(&self, coeffs: &DVector<f64>, frame: usize) -> f64 {
        let x = frame as f64 - self.frames[0] as f64;
        coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::ChannelLayout;
    use approx::assert_relative_eq;

    /// Two channels, one control. Every entry of `A[t]` and `B[t]` equals
    /// `f(t, row, col)`.
    fn build(n: usize, layout: ChannelLayout, f: impl Fn(usize, usize, usize) -> f64) -> Trajectory {
        let ns = layout.num_states();
        let nc = layout.num_ctrl;
        Trajectory::new(
            DMatrix::zeros(n, ns),
            DMatrix::zeros(n, nc),
            (0..n).map(|t| DMatrix::from_fn(ns, ns, |r, c| f(t, r, c))).collect(),
            (0..n).map(|t| DMatrix::from_fn(ns, nc, |r, c| f(t, r, c) + 0.5)).collect(),
            layout,
        )
        .unwrap()
    }

    fn seq(indices: &[usize], n: usize) -> KeypointSequence {
        KeypointSequence::new(indices.to_vec(), n).unwrap()
    }

    #[test]
    fn test_linear_segment_values() {
        let traj = build(5, ChannelLayout::actuated(1), |t, _, _| (t * t) as f64);
        let keypoints = vec![seq(&[0, 4], 5)];
        let recon = reconstruct(&traj, &keypoints, None, &ReconstructionSettings::default()).unwrap();

        // line from 0 to 16
        assert_relative_eq!(recon.a[0][(0, 0)], 0.0);
        assert_relative_eq!(recon.a[1][(0, 0)], 4.0);
        assert_relative_eq!(recon.a[2][(1, 1)], 8.0);
        assert_relative_eq!(recon.a[3][(0, 1)], 12.0);
        assert_relative_eq!(recon.b[2][(1, 0)], 8.5);
        // last frame mirrors frame T-2
        assert_eq!(recon.a[4], recon.a[3]);
        assert_eq!(recon.b[4], recon.b[3]);
    }

    #[test]
    fn test_keypoint_frames_are_exact() {
        let traj = build(12, ChannelLayout::actuated(2), |t, r, c| {
            ((t as f64) * 0.7 + r as f64).sin() * (c + 1) as f64
        });
        let keypoints = vec![seq(&[0, 3, 7, 11], 12), seq(&[0, 5, 6, 11], 12)];
        let recon = reconstruct(&traj, &keypoints, None, &ReconstructionSettings::default()).unwrap();

        let layout = traj.layout();
        for (ch, kp) in keypoints.iter().enumerate() {
            for &frame in kp.as_slice().iter().filter(|&&f| f < 11) {
                for row in 0..4 {
                    for col in [layout.position_column(ch), layout.velocity_column(ch)] {
                        assert_eq!(recon.a[frame][(row, col)], traj.a()[frame][(row, col)]);
                    }
                    assert_eq!(recon.b[frame][(row, ch)], traj.b()[frame][(row, ch)]);
                }
            }
        }
    }

    #[test]
    fn test_exact_final_frame() {
        let traj = build(6, ChannelLayout::actuated(1), |t, _, _| t as f64);
        let settings = ReconstructionSettings {
            final_frame: FinalFrame::Exact,
            ..ReconstructionSettings::default()
        };
        let recon = reconstruct(&traj, &[seq(&[0, 5], 6)], None, &settings).unwrap();
        for t in 0..6 {
            assert_relative_eq!(recon.a[t][(0, 0)], t as f64, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_quadratic_recovers_parabola() {
        let traj = build(9, ChannelLayout::actuated(1), |t, _, _| {
            let x = t as f64;
            0.5 * x * x - 2.0 * x + 1.0
        });
        let settings = ReconstructionSettings {
            order: InterpolationOrder::Quadratic,
            final_frame: FinalFrame::Exact,
        };
        let recon = reconstruct(&traj, &[seq(&[0, 3, 5, 8], 9)], None, &settings).unwrap();
        for t in 0..9 {
            assert_relative_eq!(recon.a[t][(1, 1)], traj.a()[t][(1, 1)], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_cubic_recovers_cubic() {
        let traj = build(10, ChannelLayout::actuated(1), |t, _, _| {
            let x = t as f64;
            0.1 * x * x * x - x * x + 3.0
        });
        let settings = ReconstructionSettings {
            order: InterpolationOrder::Cubic,
            final_frame: FinalFrame::Exact,
        };
        let recon = reconstruct(&traj, &[seq(&[0, 2, 4, 7, 9], 10)], None, &settings).unwrap();
        for t in 0..10 {
            assert_relative_eq!(recon.a[t][(0, 0)], traj.a()[t][(0, 0)], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_polynomial_falls_back_to_linear() {
        let traj = build(5, ChannelLayout::actuated(1), |t, _, _| (t * t) as f64);
        let settings = ReconstructionSettings {
            order: InterpolationOrder::Cubic,
            ..ReconstructionSettings::default()
        };
        // only two keypoints: cubic needs four
        let recon = reconstruct(&traj, &[seq(&[0, 4], 5)], None, &settings).unwrap();
        assert_relative_eq!(recon.a[2][(0, 0)], 8.0);
    }

    #[test]
    fn test_periodic_columns_use_shared_keypoints() {
        // column 1 is a quaternion scalar; column 2 is claimed by nobody
        let layout = ChannelLayout::new(3, 1, 1).with_quat_w_indices(vec![1]);
        let traj = build(12, layout, |t, _, c| if c == 0 { 0.0 } else { (t * t) as f64 });
        let quat = quat_keypoints(&traj).unwrap();
        assert_eq!(quat.as_slice(), &[0, 5, 10, 11]);

        let keypoints = vec![seq(&[0, 11], 12)];
        let recon = reconstruct(&traj, &keypoints, Some(&quat), &ReconstructionSettings::default()).unwrap();

        for col in [1, 2] {
            assert_relative_eq!(recon.a[5][(0, col)], 25.0);
            assert_relative_eq!(recon.a[10][(0, col)], 100.0);
            // halfway between 25 and 100
            assert_relative_eq!(recon.a[7][(0, col)], 25.0 + 75.0 * 0.4);
        }
        // velocity column follows the channel's single segment: 0 -> 121
        assert_relative_eq!(recon.a[5][(0, 3)], 121.0 * 5.0 / 11.0, epsilon = 1e-12);
    }

    #[test]
    fn test_channel_count_mismatch() {
        let traj = build(6, ChannelLayout::actuated(2), |_, _, _| 1.0);
        let err = reconstruct(&traj, &[seq(&[0, 5], 6)], None, &ReconstructionSettings::default())
            .unwrap_err();
        assert!(matches!(err, InterpolationError::ShapeMismatch { .. }));

        let err = reconstruct(
            &traj,
            &[seq(&[0, 4], 5), seq(&[0, 4], 5)],
            None,
            &ReconstructionSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, InterpolationError::InvalidKeypoints(_)));
    }

    #[test]
    fn test_unordered_keypoints_rejected() {
        let traj = build(10, ChannelLayout::actuated(1), |t, _, _| t as f64);
        for bad in [vec![0, 6, 3, 9], vec![3, 6, 9], vec![0, 4, 4, 9]] {
            let keypoints = vec![KeypointSequence::unchecked(bad)];
            let err = reconstruct(&traj, &keypoints, None, &ReconstructionSettings::default())
                .unwrap_err();
            assert!(matches!(err, InterpolationError::InvalidKeypoints(_)));
        }

        let good = vec![seq(&[0, 4, 9], 10)];
        let shared = KeypointSequence::unchecked(vec![0, 5, 2, 9]);
        let traj = build(
            10,
            ChannelLayout::actuated(1).with_quat_w_indices(vec![0]),
            |t, _, _| t as f64,
        );
        let err = reconstruct(&traj, &good, Some(&shared), &ReconstructionSettings::default())
            .unwrap_err();
        assert!(matches!(err, InterpolationError::InvalidKeypoints(_)));
    }
}
