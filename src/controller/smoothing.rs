// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the exponential filter that moves live impedance parameters towards their targets.

use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, Dim, Matrix, OMatrix, RawStorage, UnitQuaternion};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::controller::pose_error::select_quaternion_branch;
use crate::controller::types::{CartesianPose, ComplianceState};
use crate::exception::{create_configuration_exception, ImpedanceResult};

/// Smoothing factors per parameter group. 0 freezes a group, 1 applies targets instantly.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(default)]
pub struct SmoothingFactors {
    /// Stiffness and damping matrices.
    pub stiffness: f64,
    /// Nullspace stiffness and nullspace reference configuration.
    pub nullspace: f64,
    /// Desired position and orientation.
    pub pose: f64,
    /// Commanded wrench.
    pub wrench: f64,
}

impl Default for SmoothingFactors {
    fn default() -> Self {
        SmoothingFactors::uniform(0.1)
    }
}

impl SmoothingFactors {
    /// Uses the same factor for every parameter group.
    pub fn uniform(alpha: f64) -> Self {
        SmoothingFactors {
            stiffness: alpha,
            nullspace: alpha,
            pose: alpha,
            wrench: alpha,
        }
    }

    /// # Errors
    /// * InvalidConfiguration if a factor is outside \[0, 1\] or NaN.
    pub fn validate(&self) -> ImpedanceResult<()> {
        let in_range = |alpha: f64| (0. ..=1.).contains(&alpha);
        if in_range(self.stiffness)
            && in_range(self.nullspace)
            && in_range(self.pose)
            && in_range(self.wrench)
        {
            Ok(())
        } else {
            Err(create_configuration_exception(
                "smoothing factors must lie in [0, 1]",
            ))
        }
    }
}

/// Computes the smoothing factor of a first-order low-pass filter with the given cutoff
/// frequency.
///
/// # Arguments
/// * `sample_time` - Control period in \[s\].
/// * `cutoff_frequency` - Cutoff frequency in \[Hz\].
/// # Errors
/// * InvalidConfiguration if sample_time or cutoff_frequency are not finite and positive.
pub fn smoothing_factor_from_cutoff(sample_time: f64, cutoff_frequency: f64) -> ImpedanceResult<f64> {
    let is_positive = |x: f64| x.is_finite() && x > 0.;
    if !is_positive(sample_time) || !is_positive(cutoff_frequency) {
        return Err(create_configuration_exception(
            "sample time and cutoff frequency must be finite and positive",
        ));
    }
    Ok(sample_time / (sample_time + (1.0 / (2.0 * PI * cutoff_frequency))))
}

/// Below this distance between two orientations slerp has no well defined axis.
pub static SLERP_EPSILON: f64 = 1e-6;

/// Applies `alpha * target + (1 - alpha) * current`.
#[inline]
#[allow(clippy::float_cmp)]
pub fn exponential_filter(alpha: f64, target: f64, current: f64) -> f64 {
    // keeps converged parameters bit-exact
    if target == current {
        return current;
    }
    alpha * target + (1. - alpha) * current
}

fn filter_elementwise<R: Dim, C: Dim, S: RawStorage<f64, R, C>>(
    alpha: f64,
    target: &Matrix<f64, R, C, S>,
    current: &Matrix<f64, R, C, S>,
) -> OMatrix<f64, R, C>
where
    DefaultAllocator: Allocator<f64, R, C>,
{
    current.zip_map(target, |c, t| exponential_filter(alpha, t, c))
}

/// Spherical linear interpolation from `current` towards `target` along the shortest arc.
///
/// `alpha = 0` or identical orientations return `current` unchanged. If the two orientations
/// are closer than [`SLERP_EPSILON`], normalized linear interpolation is used instead.
#[allow(clippy::float_cmp)]
pub fn slerp_orientation(
    alpha: f64,
    target: &UnitQuaternion<f64>,
    current: &UnitQuaternion<f64>,
) -> UnitQuaternion<f64> {
    if alpha == 0. || current.coords == target.coords {
        return *current;
    }
    current
        .try_slerp(target, alpha, SLERP_EPSILON)
        .unwrap_or_else(|| current.nlerp(&select_quaternion_branch(target, current), alpha))
}

/// Moves a pose towards a target: position with the exponential filter, orientation with slerp.
pub fn smooth_pose(alpha: f64, target: &CartesianPose, current: &CartesianPose) -> CartesianPose {
    CartesianPose {
        position: filter_elementwise(alpha, &target.position, &current.position),
        orientation: slerp_orientation(alpha, &target.orientation, &current.orientation),
    }
}

/// Moves every live parameter of `state` one step towards its target.
///
/// This is the only place where targets influence the live parameters. Nothing is clamped.
pub fn smooth_parameters(factors: &SmoothingFactors, state: &mut ComplianceState) {
    let current = &mut state.current;
    let target = &state.target;

    let alpha = factors.stiffness;
    current.stiffness = filter_elementwise(alpha, &target.stiffness, &current.stiffness);
    current.damping = filter_elementwise(alpha, &target.damping, &current.damping);

    let alpha = factors.nullspace;
    current.nullspace_stiffness =
        exponential_filter(alpha, target.nullspace_stiffness, current.nullspace_stiffness);
    current.nullspace_reference =
        filter_elementwise(alpha, &target.nullspace_reference, &current.nullspace_reference);

    current.pose = smooth_pose(factors.pose, &target.pose, &current.pose);

    let alpha = factors.wrench;
    current.wrench = filter_elementwise(alpha, &target.wrench, &current.wrench);
}
