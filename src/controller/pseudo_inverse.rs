// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the regularized pseudo-inverse of the Jacobian transpose and the nullspace projector.

use nalgebra::{Matrix6, Vector6};
use serde::{Deserialize, Serialize};

use crate::exception::{create_configuration_exception, ImpedanceResult};
use crate::utils::{Matrix6x7, Matrix7, Matrix7x6};

/// Settings of the singular value decomposition based pseudo-inverse.
///
/// Every singular value `s` above `relative_threshold * s_max` is inverted as
/// `s / (s^2 + damping^2)`, everything below is treated as zero.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(default)]
pub struct PseudoInverseConfig {
    /// Damping of the damped least squares inverse. 0 gives the plain truncated pseudo-inverse.
    pub damping: f64,
    /// Singular values below this fraction of the largest one are discarded.
    pub relative_threshold: f64,
    /// Upper bound for the iterations of the decomposition.
    pub max_iterations: usize,
}

impl Default for PseudoInverseConfig {
    fn default() -> Self {
        PseudoInverseConfig {
            damping: 0.,
            relative_threshold: 1e-3,
            max_iterations: 100,
        }
    }
}

impl PseudoInverseConfig {
    /// # Errors
    /// * InvalidConfiguration if damping or threshold are negative or not finite or if
    /// max_iterations is zero (zero means unbounded for the decomposition).
    pub fn validate(&self) -> ImpedanceResult<()> {
        if !(self.damping.is_finite() && self.damping >= 0.) {
            return Err(create_configuration_exception(
                "pseudo-inverse damping must be finite and non-negative",
            ));
        }
        if !(self.relative_threshold.is_finite() && self.relative_threshold >= 0.) {
            return Err(create_configuration_exception(
                "pseudo-inverse threshold must be finite and non-negative",
            ));
        }
        if self.max_iterations == 0 {
            return Err(create_configuration_exception(
                "pseudo-inverse needs a bounded number of iterations",
            ));
        }
        Ok(())
    }
}

/// Result of [`resolve_redundancy`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Redundancy {
    /// Pseudo-inverse of the Jacobian transpose (6x7).
    pub jacobian_transpose_pinv: Matrix6x7,
    /// `I - J^T * pinv(J^T)` (7x7).
    pub nullspace_projector: Matrix7,
    /// Number of singular values that were inverted.
    pub rank: usize,
    /// False if the decomposition did not converge. The projector is zero in that case, which
    /// disables the nullspace controller for this cycle.
    pub converged: bool,
}

/// Computes the regularized pseudo-inverse of `matrix` (7x6).
///
/// Returns `None` if the decomposition did not converge within `max_iterations`.
pub fn pseudo_inverse(matrix: &Matrix7x6, config: &PseudoInverseConfig) -> Option<(Matrix6x7, usize)> {
    let svd = matrix.try_svd(true, true, f64::EPSILON, config.max_iterations)?;
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => return None,
    };
    let singular_values = svd.singular_values;
    let threshold = f64::max(
        config.relative_threshold * singular_values.max(),
        f64::MIN_POSITIVE,
    );
    let lambda_squared = config.damping * config.damping;
    let mut rank = 0;
    let inverted = Vector6::from_iterator(singular_values.iter().map(|&sigma| {
        if sigma > threshold {
            rank += 1;
            sigma / (sigma * sigma + lambda_squared)
        } else {
            0.
        }
    }));
    let pinv: Matrix6x7 = v_t.transpose() * Matrix6::from_diagonal(&inverted) * u.transpose();
    Some((pinv, rank))
}

/// Computes the pseudo-inverse of the Jacobian transpose and the nullspace projector
/// `I - J^T * pinv(J^T)`.
///
/// Near singularities the discarded directions are left to the nullspace instead of blowing
/// up the inverse, so the result stays finite for every finite Jacobian.
pub fn resolve_redundancy(jacobian: &Matrix6x7, config: &PseudoInverseConfig) -> Redundancy {
    let jacobian_transpose: Matrix7x6 = jacobian.transpose();
    match pseudo_inverse(&jacobian_transpose, config) {
        Some((jacobian_transpose_pinv, rank)) => Redundancy {
            jacobian_transpose_pinv,
            nullspace_projector: Matrix7::identity() - jacobian_transpose * jacobian_transpose_pinv,
            rank,
            converged: true,
        },
        None => Redundancy {
            jacobian_transpose_pinv: Matrix6x7::zeros(),
            nullspace_projector: Matrix7::zeros(),
            rank: 0,
            converged: false,
        },
    }
}
