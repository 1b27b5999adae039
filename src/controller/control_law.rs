// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Cartesian PD control combined with a nullspace PD controller.

use nalgebra::{Matrix6, Vector6};

use crate::utils::{Matrix6x7, Matrix7, Vector7};

/// Inputs of [`compute_torques`] for one cycle. Everything is borrowed from the controller and
/// the host snapshot.
#[derive(Debug, Copy, Clone)]
pub struct ControlLawInput<'a> {
    pub q: &'a Vector7,
    pub dq: &'a Vector7,
    /// Pose error from [`pose_error`](`crate::controller::pose_error::pose_error`).
    pub error: &'a Vector6<f64>,
    pub jacobian: &'a Matrix6x7,
    pub stiffness: &'a Matrix6<f64>,
    pub damping: &'a Matrix6<f64>,
    pub nullspace_projector: &'a Matrix7,
    pub nullspace_stiffness: f64,
    /// Damping ratio of the nullspace controller, 1 is critically damped.
    pub nullspace_damping_factor: f64,
    pub nullspace_reference: &'a Vector7,
}

/// Task and nullspace torques of one cycle.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ControlLawOutput {
    pub tau_task: Vector7,
    pub tau_nullspace: Vector7,
}

impl ControlLawOutput {
    pub fn tau_desired(&self) -> Vector7 {
        self.tau_task + self.tau_nullspace
    }
}

/// Computes the desired joint torque without dynamics compensation.
///
/// * `tau_task = J^T * (-K * error - D * (J * dq))`
/// * `tau_nullspace = N * (k_n * (q_ref - q) - 2 * zeta_n * sqrt(k_n) * dq)`
///
/// Gravity and Coriolis terms have to be added by the caller.
pub fn compute_torques(input: &ControlLawInput) -> ControlLawOutput {
    let jacobian = input.jacobian;
    let tau_task: Vector7 = jacobian.transpose()
        * (-input.stiffness * input.error - input.damping * (jacobian * input.dq));
    let nullspace_damping =
        2. * input.nullspace_damping_factor * f64::sqrt(input.nullspace_stiffness);
    let tau_nullspace: Vector7 = input.nullspace_projector
        * (input.nullspace_stiffness * (input.nullspace_reference - input.q)
            - nullspace_damping * input.dq);
    ControlLawOutput {
        tau_task,
        tau_nullspace,
    }
}

/// Maps a Cartesian wrench (force, torque) to joint torques: `J^T * F`.
pub fn wrench_torques(jacobian: &Matrix6x7, wrench: &Vector6<f64>) -> Vector7 {
    jacobian.transpose() * wrench
}
