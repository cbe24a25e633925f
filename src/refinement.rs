//! Error-driven interval refinement (`iterativeError`).
//!
//! Starting from the whole trajectory `(0, T-1)`, intervals are bisected in
//! breadth-first passes until each one is either narrow enough or linearly
//! predictable at its midpoint:
//!
//! 1. An interval `(s, e)` with `e - s <= min_n` is accepted without a check.
//! 2. Otherwise the channel's position and velocity columns of `A` at
//!    `mid = (s + e) / 2` are compared against the straight line between the
//!    values at `s` and `e`. A mean squared error below the threshold accepts
//!    the interval.
//! 3. Rejected intervals are split into `(s, mid)` and `(mid, e)` for the next
//!    pass.
//!
//! Every accepted interval contributes `s`, `mid` and `e` as keypoints. The
//! number of passes is bounded by `log2(T / min_n) + 1`.

use tracing::{debug, trace};

use crate::keypoints::KeypointSequence;
use crate::trajectory::Trajectory;

/// A closed frame interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    /// First frame.
    pub start: usize,
    /// Last frame.
    pub end: usize,
}

impl Interval {
    /// Create an interval.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of frames spanned (`end - start`).
    #[inline]
    #[must_use]
    pub const fn width(&self) -> usize {
        self.end - self.start
    }

    /// Floor midpoint.
    #[inline]
    #[must_use]
    pub const fn mid(&self) -> usize {
        (self.start + self.end) / 2
    }

    /// The two halves sharing the midpoint.
    #[must_use]
    pub const fn split(&self) -> (Self, Self) {
        let mid = self.mid();
        (Self::new(self.start, mid), Self::new(mid, self.end))
    }
}

/// An interval that stopped being refined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcceptedInterval {
    /// The interval.
    pub interval: Interval,
    /// Midpoint error, or `None` if accepted on width alone.
    pub error: Option<f64>,
    /// Pass in which it was accepted (0-based).
    pub pass: usize,
}

/// Full result of refining one channel.
#[derive(Debug, Clone)]
pub struct Refinement {
    /// Sorted, de-duplicated keypoints.
    pub keypoints: KeypointSequence,
    /// Accepted intervals in acceptance order.
    pub accepted: Vec<AcceptedInterval>,
    /// Number of passes run.
    pub passes: usize,
}

/// Keypoints for `channel` by breadth-first bisection.
///
/// `min_n` must be at least 1.
#[must_use]
pub fn refine_channel(
    trajectory: &Trajectory,
    channel: usize,
    min_n: usize,
    threshold: f64,
) -> KeypointSequence {
    refine_channel_detailed(trajectory, channel, min_n, threshold).keypoints
}

/// Like [`refine_channel`], also returning every accepted interval.
#[must_use]
pub fn refine_channel_detailed(
    trajectory: &Trajectory,
    channel: usize,
    min_n: usize,
    threshold: f64,
) -> Refinement {
    debug_assert!(min_n >= 1);

    let mut frontier = vec![Interval::new(0, trajectory.n_frames() - 1)];
    let mut accepted = Vec::new();
    let mut anchors = Vec::new();
    let mut passes = 0;

    while !frontier.is_empty() {
        let mut next = Vec::with_capacity(frontier.len() * 2);

        for interval in frontier {
            let error = if interval.width() <= min_n {
                None
            } else {
                let err = midpoint_error(trajectory, channel, interval);
                if err >= threshold {
                    trace!(
                        channel,
                        start = interval.start,
                        end = interval.end,
                        error = err,
                        "splitting interval"
                    );
                    let (left, right) = interval.split();
                    next.push(left);
                    next.push(right);
                    continue;
                }
                Some(err)
            };

            anchors.extend([interval.start, interval.mid(), interval.end]);
            accepted.push(AcceptedInterval {
                interval,
                error,
                pass: passes,
            });
        }

        frontier = next;
        passes += 1;
    }

    anchors.sort_unstable();
    anchors.dedup();

    debug!(
        channel,
        passes,
        accepted = accepted.len(),
        keypoints = anchors.len(),
        "refined channel"
    );

    Refinement {
        keypoints: KeypointSequence::from_sorted(anchors),
        accepted,
        passes,
    }
}

/// Mean squared error of the straight-line prediction at the midpoint.
///
/// Compares every row of the channel's position and velocity columns of `A`.
/// The mean is over those `2 * num_states` comparisons, not `2 * dof_vel`;
/// thresholds tuned against the latter are twice as strict here when
/// `dof_pos == dof_vel`. Returns `0.0` if there is nothing to compare.
#[must_use]
pub fn midpoint_error(trajectory: &Trajectory, channel: usize, interval: Interval) -> f64 {
    let layout = trajectory.layout();
    let a = trajectory.a();
    let (s, e, mid) = (interval.start, interval.end, interval.mid());
    let weight = (mid - s) as f64 / interval.width() as f64;

    let columns = [
        layout.position_column(channel),
        layout.velocity_column(channel),
    ];

    let mut sum_sq = 0.0;
    let mut count = 0usize;
    for &col in &columns {
        for row in 0..a[mid].nrows() {
            let start = a[s][(row, col)];
            let end = a[e][(row, col)];
            let predicted = start + (end - start) * weight;
            let diff = a[mid][(row, col)] - predicted;
            sum_sq += diff * diff;
            count += 1;
        }
    }

    if count == 0 {
        0.0
    } else {
        sum_sq / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::ChannelLayout;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    /// One channel; `A[t]` filled with `f(t)` everywhere.
    fn scalar_trajectory(n: usize, f: impl Fn(usize) -> f64) -> Trajectory {
        Trajectory::new(
            DMatrix::zeros(n, 2),
            DMatrix::zeros(n, 1),
            (0..n).map(|t| DMatrix::from_element(2, 2, f(t))).collect(),
            vec![DMatrix::zeros(2, 1); n],
            ChannelLayout::actuated(1),
        )
        .unwrap()
    }

    #[test]
    fn test_interval_geometry() {
        let interval = Interval::new(4, 11);
        assert_eq!(interval.width(), 7);
        assert_eq!(interval.mid(), 7);
        assert_eq!(interval.split(), (Interval::new(4, 7), Interval::new(7, 11)));
    }

    #[test]
    fn test_midpoint_error_linear_is_zero() {
        let traj = scalar_trajectory(9, |t| 2.0 * t as f64 - 1.0);
        assert_relative_eq!(midpoint_error(&traj, 0, Interval::new(0, 8)), 0.0);
        // odd width: floor midpoint still lies on the line
        assert_relative_eq!(midpoint_error(&traj, 0, Interval::new(1, 6)), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_midpoint_error_quadratic() {
        let traj = scalar_trajectory(5, |t| (t * t) as f64);
        // line from 0 to 16 predicts 8 at t=2, truth is 4
        assert_relative_eq!(midpoint_error(&traj, 0, Interval::new(0, 4)), 16.0);
    }

    #[test]
    fn test_linear_accepts_in_one_pass() {
        let traj = scalar_trajectory(17, |t| t as f64);
        let refinement = refine_channel_detailed(&traj, 0, 2, 1e-9);
        assert_eq!(refinement.passes, 1);
        assert_eq!(refinement.keypoints.as_slice(), &[0, 8, 16]);
    }

    #[test]
    fn test_zero_threshold_full_resolution() {
        let traj = scalar_trajectory(11, |t| (t as f64).sin());
        let keypoints = refine_channel(&traj, 0, 1, 0.0);
        assert_eq!(keypoints.as_slice(), (0..11).collect::<Vec<_>>().as_slice());
    }

    #[test]
    fn test_accepted_intervals_respect_threshold() {
        let traj = scalar_trajectory(64, |t| (t as f64 * 0.3).sin() * 3.0);
        let threshold = 0.01;
        let refinement = refine_channel_detailed(&traj, 0, 3, threshold);
        for acc in &refinement.accepted {
            match acc.error {
                Some(err) => assert!(err < threshold),
                None => assert!(acc.interval.width() <= 3),
            }
        }
        assert!(refinement.passes <= 6);
    }

    #[test]
    fn test_wide_min_n_accepts_root() {
        let traj = scalar_trajectory(10, |t| (t * t) as f64);
        let refinement = refine_channel_detailed(&traj, 0, 9, 0.0);
        assert_eq!(refinement.passes, 1);
        assert_eq!(refinement.accepted[0].error, None);
        assert_eq!(refinement.keypoints.as_slice(), &[0, 4, 9]);
    }
}
