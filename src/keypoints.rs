//! Keypoint selection strategies.
//!
//! Every strategy produces one [`KeypointSequence`] per channel. Frame `0` is
//! always seeded first and frame `T-1` always closes the sequence.
//!
//! # Strategies
//!
//! | Method | Trigger |
//! |--------|---------|
//! | `setInterval` | every `min_n`-th frame |
//! | `adaptiveAccel` | `|accel| > threshold`, spacing in `[min_n, max_n]` |
//! | `adaptiveJerk` | `|jerk| > threshold`, spacing in `[min_n, max_n]` |
//! | `magVelChange` | velocity drift or direction reversal, spacing in `[min_n, max_n]` |
//! | `iterativeError` | see [`crate::refinement`] |

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{InterpolationConfig, KeypointMethod};
use crate::error::{InterpolationError, Result};
use crate::profile::DerivedProfiles;
use crate::refinement::refine_channel;
use crate::trajectory::Trajectory;

/// Sampling period of the shared quaternion keypoint sequence.
pub const QUAT_W_SAMPLE_PERIOD: usize = 5;

/// Strictly increasing frame indices, starting at `0` and ending at `T-1`.
///
/// Deserialization enforces the ordering rules; the final frame is checked
/// against the trajectory at reconstruction time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawKeypoints"))]
pub struct KeypointSequence {
    indices: Vec<usize>,
}

/// Serialized form of a [`KeypointSequence`], before validation.
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawKeypoints {
    indices: Vec<usize>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawKeypoints> for KeypointSequence {
    type Error = InterpolationError;

    fn try_from(raw: RawKeypoints) -> Result<Self> {
        check_order(&raw.indices)?;
        Ok(Self {
            indices: raw.indices,
        })
    }
}

/// At least two indices, starting at `0`, strictly increasing.
fn check_order(indices: &[usize]) -> Result<()> {
    if indices.len() < 2 {
        return Err(InterpolationError::invalid_keypoints(format!(
            "need at least 2 keypoints, got {}",
            indices.len()
        )));
    }
    if indices[0] != 0 {
        return Err(InterpolationError::invalid_keypoints(format!(
            "first keypoint must be 0, got {}",
            indices[0]
        )));
    }
    if let Some(w) = indices.windows(2).find(|w| w[1] <= w[0]) {
        return Err(InterpolationError::invalid_keypoints(format!(
            "keypoints not strictly increasing at {} -> {}",
            w[0], w[1]
        )));
    }
    Ok(())
}

impl KeypointSequence {
    /// Validate and wrap `indices` for a trajectory of `n_frames` frames.
    ///
    /// # Errors
    ///
    /// Returns [`InterpolationError::InvalidKeypoints`] if there are fewer
    /// than two indices, the first is not `0`, the last is not
    /// `n_frames - 1`, or the indices are not strictly increasing.
    pub fn new(indices: Vec<usize>, n_frames: usize) -> Result<Self> {
        check_order(&indices)?;
        let seq = Self { indices };
        seq.check_frames(n_frames)?;
        Ok(seq)
    }

    /// Check that this sequence spans exactly `n_frames` frames.
    ///
    /// Re-checks the ordering as well, so sequences that did not come from
    /// [`KeypointSequence::new`] are caught before they are indexed.
    pub(crate) fn check_frames(&self, n_frames: usize) -> Result<()> {
        check_order(&self.indices)?;
        let last = self.indices[self.indices.len() - 1];
        if n_frames == 0 || last != n_frames - 1 {
            return Err(InterpolationError::invalid_keypoints(format!(
                "last keypoint must be {}, got {last}",
                n_frames.saturating_sub(1)
            )));
        }
        Ok(())
    }

    /// Wrap indices produced by a strategy in this crate.
    pub(crate) fn from_sorted(indices: Vec<usize>) -> Self {
        debug_assert!(indices.len() >= 2);
        debug_assert_eq!(indices.first(), Some(&0));
        debug_assert!(indices.windows(2).all(|w| w[0] < w[1]));
        Self { indices }
    }

    /// Wrap indices without any check.
    #[cfg(test)]
    pub(crate) fn unchecked(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    /// Frame indices.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }

    /// Number of keypoints.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Always false; a sequence holds at least two keypoints.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Whether `frame` is a keypoint.
    #[must_use]
    pub fn contains(&self, frame: usize) -> bool {
        self.indices.binary_search(&frame).is_ok()
    }

    /// Consecutive `(start, end)` pairs.
    pub fn segments(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.indices.windows(2).map(|w| (w[0], w[1]))
    }

    /// Spacing between consecutive keypoints.
    pub fn gaps(&self) -> impl Iterator<Item = usize> + '_ {
        self.segments().map(|(s, e)| e - s)
    }

    /// Largest spacing between consecutive keypoints.
    #[must_use]
    pub fn max_gap(&self) -> usize {
        self.gaps().max().unwrap_or(0)
    }

    /// Consume into the raw indices.
    #[must_use]
    pub fn into_inner(self) -> Vec<usize> {
        self.indices
    }
}

impl AsRef<[usize]> for KeypointSequence {
    fn as_ref(&self) -> &[usize] {
        &self.indices
    }
}

impl<'a> IntoIterator for &'a KeypointSequence {
    type Item = &'a usize;
    type IntoIter = std::slice::Iter<'a, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.indices.iter()
    }
}

impl fmt::Display for KeypointSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.indices)
    }
}

/// Select keypoints for every channel of `trajectory`.
///
/// # Errors
///
/// Returns a configuration error if `config` fails validation.
///
/// # Example
///
/// ```
/// use dynamics_keypoints::{select_keypoints, ChannelLayout, InterpolationConfig, Trajectory};
/// use nalgebra::DMatrix;
///
/// let layout = ChannelLayout::actuated(1);
/// let t = 10;
/// let trajectory = Trajectory::new(
///     DMatrix::zeros(t, 2),
///     DMatrix::zeros(t, 1),
///     vec![DMatrix::zeros(2, 2); t],
///     vec![DMatrix::zeros(2, 1); t],
///     layout,
/// )?;
///
/// let keypoints = select_keypoints(&trajectory, &InterpolationConfig::set_interval(3))?;
/// assert_eq!(keypoints[0].as_slice(), &[0, 3, 6, 9]);
/// # Ok::<(), dynamics_keypoints::InterpolationError>(())
/// ```
pub fn select_keypoints(
    trajectory: &Trajectory,
    config: &InterpolationConfig,
) -> Result<Vec<KeypointSequence>> {
    config.validate()?;

    let n_frames = trajectory.n_frames();
    let channels = trajectory.layout().num_channels();

    let keypoints: Vec<KeypointSequence> = match config.method {
        KeypointMethod::SetInterval => {
            let shared = set_interval_keypoints(n_frames, config.min_n)?;
            vec![shared; channels]
        }
        KeypointMethod::AdaptiveAccel => {
            let profiles = DerivedProfiles::from_trajectory(trajectory);
            (0..channels)
                .map(|ch| {
                    threshold_keypoints(
                        |frame| profile_value(&profiles.accel, frame, ch),
                        n_frames,
                        config.min_n,
                        config.max_n,
                        config.accel_threshold,
                    )
                })
                .collect()
        }
        KeypointMethod::AdaptiveJerk => {
            let profiles = DerivedProfiles::from_trajectory(trajectory);
            (0..channels)
                .map(|ch| {
                    threshold_keypoints(
                        |frame| profile_value(&profiles.jerk, frame, ch),
                        n_frames,
                        config.min_n,
                        config.max_n,
                        config.jerk_threshold,
                    )
                })
                .collect()
        }
        KeypointMethod::MagVelChange => (0..channels)
            .map(|ch| {
                velocity_change_keypoints(
                    |frame| trajectory.velocity(frame, ch),
                    n_frames,
                    config.min_n,
                    config.max_n,
                    config.vel_change_required,
                )
            })
            .collect(),
        KeypointMethod::IterativeError => (0..channels)
            .map(|ch| {
                refine_channel(
                    trajectory,
                    ch,
                    config.min_n,
                    config.iterative_error_threshold,
                )
            })
            .collect(),
    };

    debug!(
        method = %config.method,
        channels,
        total_keypoints = keypoints.iter().map(KeypointSequence::len).sum::<usize>(),
        "selected keypoints"
    );

    Ok(keypoints)
}

/// Every multiple of `min_n` in `[1, T-2]`, bracketed by `0` and `T-1`.
///
/// # Errors
///
/// Returns a configuration error if `min_n` is 0, or a degenerate input
/// error if `n_frames < 2`.
pub fn set_interval_keypoints(n_frames: usize, min_n: usize) -> Result<KeypointSequence> {
    if min_n == 0 {
        return Err(InterpolationError::invalid_config("min_n must be at least 1"));
    }
    check_span(n_frames)?;
    let mut spacing = Spacing::new();
    for frame in (min_n..n_frames - 1).step_by(min_n) {
        spacing.emit(frame);
    }
    Ok(spacing.finish(n_frames))
}

/// Shared keypoints for the quaternion scalar columns.
///
/// Samples every `period`-th frame and closes with `T-1`.
///
/// # Errors
///
/// Returns a configuration error if `period` is 0, or a degenerate input
/// error if `n_frames < 2`.
pub fn periodic_keypoints(n_frames: usize, period: usize) -> Result<KeypointSequence> {
    if period == 0 {
        return Err(InterpolationError::invalid_config("sampling period must be at least 1"));
    }
    check_span(n_frames)?;
    let mut spacing = Spacing::new();
    for frame in (period..n_frames).step_by(period) {
        spacing.emit(frame);
    }
    Ok(spacing.finish(n_frames))
}

fn check_span(n_frames: usize) -> Result<()> {
    if n_frames < 2 {
        return Err(InterpolationError::trajectory_too_short(2, n_frames));
    }
    Ok(())
}

/// Value of a profile column, or `None` past its end.
fn profile_value(profile: &nalgebra::DMatrix<f64>, frame: usize, channel: usize) -> Option<f64> {
    (frame < profile.nrows()).then(|| profile[(frame, channel)])
}

/// Per-channel spacing state: frames since the last keypoint and the
/// keypoints emitted so far.
#[derive(Debug, Clone)]
struct Spacing {
    since_last: usize,
    indices: Vec<usize>,
}

impl Spacing {
    fn new() -> Self {
        Self {
            since_last: 0,
            indices: vec![0],
        }
    }

    fn emit(&mut self, frame: usize) {
        self.indices.push(frame);
        self.since_last = 0;
    }

    fn tick(&mut self) {
        self.since_last += 1;
    }

    fn finish(mut self, n_frames: usize) -> KeypointSequence {
        let last = n_frames - 1;
        if self.indices.last() != Some(&last) {
            self.indices.push(last);
        }
        KeypointSequence::from_sorted(self.indices)
    }
}

/// Min/max spacing controller over a scalar signal.
///
/// Frames `0..=T-2` are visited. A frame is emitted when the spacing counter
/// has reached `min_n` and `|signal| > threshold`, or unconditionally once the
/// counter reaches `max_n`. Frames where the signal is undefined can only take
/// the `max_n` branch.
pub(crate) fn threshold_keypoints(
    signal: impl Fn(usize) -> Option<f64>,
    n_frames: usize,
    min_n: usize,
    max_n: usize,
    threshold: f64,
) -> KeypointSequence {
    let spacing = (0..n_frames - 1).fold(Spacing::new(), |mut spacing, frame| {
        let triggered = spacing.since_last >= min_n
            && signal(frame).is_some_and(|value| value.abs() > threshold);
        if triggered || spacing.since_last >= max_n {
            spacing.emit(frame);
        }
        spacing.tick();
        spacing
    });
    spacing.finish(n_frames)
}

/// Per-channel state for the velocity change strategy.
#[derive(Debug, Clone)]
struct VelocityTracker {
    spacing: Spacing,
    /// Velocity at the last keypoint.
    reference: f64,
    /// Velocity at the previous frame.
    previous: f64,
    /// Sign of the last non-zero velocity change.
    direction: i8,
}

/// Velocity drift / direction reversal controller.
///
/// At each frame, in priority order:
/// 1. drift from the last keypoint's velocity exceeds `vel_change_required`
///    (once `min_n` frames have passed),
/// 2. `max_n` frames have passed,
/// 3. the velocity change reverses sign (once `min_n` frames have passed).
///
/// The reversal test compares against the sign of the last non-zero velocity
/// change, not the previous frame's: a zero change (a plateau) keeps the old
/// direction, so rising, flat, then falling counts as a reversal.
pub(crate) fn velocity_change_keypoints(
    velocity: impl Fn(usize) -> f64,
    n_frames: usize,
    min_n: usize,
    max_n: usize,
    vel_change_required: f64,
) -> KeypointSequence {
    let v0 = velocity(0);
    let start = VelocityTracker {
        spacing: Spacing::new(),
        reference: v0,
        previous: v0,
        direction: 0,
    };

    let tracker = (0..n_frames - 1).fold(start, |mut state, frame| {
        let v = velocity(frame);
        let delta = v - state.previous;
        let direction: i8 = if delta > 0.0 {
            1
        } else if delta < 0.0 {
            -1
        } else {
            0
        };
        let reversed = direction * state.direction < 0;
        let settled = state.spacing.since_last >= min_n;

        let emit = (settled && (v - state.reference).abs() > vel_change_required)
            || state.spacing.since_last >= max_n
            || (settled && reversed);
        if emit {
            state.spacing.emit(frame);
            state.reference = v;
        }

        if direction != 0 {
            state.direction = direction;
        }
        state.previous = v;
        state.spacing.tick();
        state
    });

    tracker.spacing.finish(n_frames)
}
