//! Trajectory storage and channel layout.
//!
//! A [`Trajectory`] is a read-only snapshot of one rollout: the state and
//! control sequences plus the per-frame sensitivity matrices `A_t` and `B_t`.
//! All shapes are validated once at construction so the selection and
//! reconstruction code can index without further checks.

use nalgebra::DMatrix;

use crate::error::{InterpolationError, Result};
use crate::profile::DerivedProfiles;

/// Column layout of the state vector.
///
/// The state vector holds `dof_pos` position entries followed by `dof_vel`
/// velocity entries. Channel `i` owns position column `i`, velocity column
/// `dof_pos + i` and, when `i < num_ctrl`, control column `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelLayout {
    /// Number of position entries.
    pub dof_pos: usize,
    /// Number of velocity entries; also the number of channels.
    pub dof_vel: usize,
    /// Number of control entries.
    pub num_ctrl: usize,
    /// State columns holding quaternion scalar components.
    pub quat_w_indices: Vec<usize>,
}

impl ChannelLayout {
    /// Layout without quaternion components.
    #[must_use]
    pub const fn new(dof_pos: usize, dof_vel: usize, num_ctrl: usize) -> Self {
        Self {
            dof_pos,
            dof_vel,
            num_ctrl,
            quat_w_indices: Vec::new(),
        }
    }

    /// Fully actuated arm: `dof` positions, `dof` velocities, `dof` controls.
    #[must_use]
    pub const fn actuated(dof: usize) -> Self {
        Self::new(dof, dof, dof)
    }

    /// Set the quaternion scalar columns.
    #[must_use]
    pub fn with_quat_w_indices(mut self, indices: Vec<usize>) -> Self {
        self.quat_w_indices = indices;
        self
    }

    /// State dimension (`dof_pos + dof_vel`).
    #[inline]
    #[must_use]
    pub const fn num_states(&self) -> usize {
        self.dof_pos + self.dof_vel
    }

    /// Number of independent channels.
    #[inline]
    #[must_use]
    pub const fn num_channels(&self) -> usize {
        self.dof_vel
    }

    /// Position column of `channel`.
    #[inline]
    #[must_use]
    pub const fn position_column(&self, channel: usize) -> usize {
        channel
    }

    /// Velocity column of `channel`.
    #[inline]
    #[must_use]
    pub const fn velocity_column(&self, channel: usize) -> usize {
        self.dof_pos + channel
    }

    /// Control column of `channel`, if it has one.
    #[inline]
    #[must_use]
    pub const fn control_column(&self, channel: usize) -> Option<usize> {
        if channel < self.num_ctrl {
            Some(channel)
        } else {
            None
        }
    }

    /// Validate internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`InterpolationError::InvalidLayout`] if there are no channels,
    /// fewer positions than velocities, or a quaternion index is out of range
    /// or repeated.
    pub fn validate(&self) -> Result<()> {
        if self.dof_vel == 0 {
            return Err(InterpolationError::invalid_layout(
                "dof_vel must be at least 1",
            ));
        }
        if self.dof_pos < self.dof_vel {
            return Err(InterpolationError::invalid_layout(format!(
                "dof_pos ({}) must be at least dof_vel ({})",
                self.dof_pos, self.dof_vel
            )));
        }

        let n = self.num_states();
        for (k, &idx) in self.quat_w_indices.iter().enumerate() {
            if idx >= n {
                return Err(InterpolationError::invalid_layout(format!(
                    "quaternion index {idx} outside state of size {n}"
                )));
            }
            if self.quat_w_indices[..k].contains(&idx) {
                return Err(InterpolationError::invalid_layout(format!(
                    "quaternion index {idx} listed twice"
                )));
            }
        }

        Ok(())
    }

    /// State columns reconstructed from the shared periodic keypoints.
    ///
    /// These are the quaternion scalar columns plus any column that no
    /// channel claims, in ascending order.
    #[must_use]
    pub fn periodic_state_columns(&self) -> Vec<usize> {
        (0..self.num_states())
            .filter(|&c| {
                let position = c < self.dof_vel;
                let velocity = c >= self.dof_pos;
                self.quat_w_indices.contains(&c) || !(position || velocity)
            })
            .collect()
    }

    /// Control columns that no channel claims.
    #[must_use]
    pub fn periodic_control_columns(&self) -> Vec<usize> {
        (self.dof_vel..self.num_ctrl).collect()
    }
}

/// A single trajectory with its linearized dynamics.
#[derive(Debug, Clone)]
pub struct Trajectory {
    states: DMatrix<f64>,
    controls: DMatrix<f64>,
    a: Vec<DMatrix<f64>>,
    b: Vec<DMatrix<f64>>,
    layout: ChannelLayout,
}

impl Trajectory {
    /// Minimum number of frames (jerk needs three).
    pub const MIN_FRAMES: usize = 3;

    /// Build a trajectory, validating every shape against `layout`.
    ///
    /// # Arguments
    ///
    /// * `states` - `T x (dof_pos + dof_vel)`, one row per frame
    /// * `controls` - `T x num_ctrl`, one row per frame
    /// * `a` - `T` matrices of `num_states x num_states`
    /// * `b` - `T` matrices of `num_states x num_ctrl`
    /// * `layout` - Channel layout
    ///
    /// # Errors
    ///
    /// Returns a degenerate input error if `T < 3`, the layout is invalid, or
    /// any sequence disagrees with the layout or with the frame count.
    pub fn new(
        states: DMatrix<f64>,
        controls: DMatrix<f64>,
        a: Vec<DMatrix<f64>>,
        b: Vec<DMatrix<f64>>,
        layout: ChannelLayout,
    ) -> Result<Self> {
        layout.validate()?;

        let t = states.nrows();
        if t < Self::MIN_FRAMES {
            return Err(InterpolationError::trajectory_too_short(Self::MIN_FRAMES, t));
        }

        let ns = layout.num_states();
        let nc = layout.num_ctrl;

        check_shape("states", (t, ns), states.shape())?;
        check_shape("controls", (t, nc), controls.shape())?;
        check_len("A", t, a.len())?;
        check_len("B", t, b.len())?;
        for (i, m) in a.iter().enumerate() {
            check_shape(&format!("A[{i}]"), (ns, ns), m.shape())?;
        }
        for (i, m) in b.iter().enumerate() {
            check_shape(&format!("B[{i}]"), (ns, nc), m.shape())?;
        }

        Ok(Self {
            states,
            controls,
            a,
            b,
            layout,
        })
    }

    /// Number of frames `T`.
    #[inline]
    #[must_use]
    pub fn n_frames(&self) -> usize {
        self.states.nrows()
    }

    /// Channel layout.
    #[inline]
    #[must_use]
    pub fn layout(&self) -> &ChannelLayout {
        &self.layout
    }

    /// State sequence, one row per frame.
    #[must_use]
    pub fn states(&self) -> &DMatrix<f64> {
        &self.states
    }

    /// Control sequence, one row per frame.
    #[must_use]
    pub fn controls(&self) -> &DMatrix<f64> {
        &self.controls
    }

    /// State sensitivity matrices.
    #[must_use]
    pub fn a(&self) -> &[DMatrix<f64>] {
        &self.a
    }

    /// Control sensitivity matrices.
    #[must_use]
    pub fn b(&self) -> &[DMatrix<f64>] {
        &self.b
    }

    /// Velocity of `channel` at `frame`.
    #[inline]
    #[must_use]
    pub fn velocity(&self, frame: usize, channel: usize) -> f64 {
        self.states[(frame, self.layout.velocity_column(channel))]
    }

    /// Acceleration and jerk profiles of the velocity channels.
    #[must_use]
    pub fn profiles(&self) -> DerivedProfiles {
        DerivedProfiles::from_trajectory(self)
    }
}

fn check_len(what: &str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(InterpolationError::shape_mismatch(
            what,
            format!("{expected} frames"),
            format!("{actual} frames"),
        ))
    }
}

fn check_shape(what: &str, expected: (usize, usize), actual: (usize, usize)) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(InterpolationError::shape_mismatch(
            what,
            format!("{}x{}", expected.0, expected.1),
            format!("{}x{}", actual.0, actual.1),
        ))
    }
}
