// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the per-cycle torque rate saturation.

use crate::exception::{create_configuration_exception, ImpedanceResult};
use crate::utils::Vector7;

/// Default maximum torque change per cycle in \[Nm\].
pub static DEFAULT_DELTA_TAU_MAX: f64 = 1.0;

/// Limits the change of every joint torque with respect to the previous command.
///
/// # Arguments
/// * `max_delta` - Per-joint maximum allowed change per cycle.
/// * `commanded_values` - Torques computed in the current cycle.
/// * `last_commanded_values` - Torques commanded in the previous cycle.
/// # Return
/// Rate-limited torques. Every element lies within `max_delta` of the previous command.
pub fn limit_rate_torques(
    max_delta: &Vector7,
    commanded_values: &Vector7,
    last_commanded_values: &Vector7,
) -> Vector7 {
    let mut limited_values = Vector7::zeros();
    for i in 0..7 {
        let difference = commanded_values[i] - last_commanded_values[i];
        limited_values[i] = last_commanded_values[i]
            + f64::max(f64::min(difference, max_delta[i]), -max_delta[i]);
    }
    limited_values
}

/// Saturates `tau_desired` against `last_commanded` with the same limit for every joint and
/// stores the result in `last_commanded` for the next cycle.
pub fn saturate_torque_rate(
    tau_desired: &Vector7,
    last_commanded: &mut Vector7,
    delta_tau_max: f64,
) -> Vector7 {
    let saturated = limit_rate_torques(&Vector7::repeat(delta_tau_max), tau_desired, last_commanded);
    *last_commanded = saturated;
    saturated
}

/// Owns the torque commanded in the previous cycle.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TorqueRateLimiter {
    delta_tau_max: f64,
    last_commanded: Vector7,
}

impl Default for TorqueRateLimiter {
    fn default() -> Self {
        TorqueRateLimiter {
            delta_tau_max: DEFAULT_DELTA_TAU_MAX,
            last_commanded: Vector7::zeros(),
        }
    }
}

impl TorqueRateLimiter {
    /// # Errors
    /// * InvalidConfiguration if `delta_tau_max` is negative or not finite.
    pub fn new(delta_tau_max: f64) -> ImpedanceResult<Self> {
        let mut limiter = TorqueRateLimiter::default();
        limiter.set_delta_tau_max(delta_tau_max)?;
        Ok(limiter)
    }

    /// # Errors
    /// * InvalidConfiguration if `delta_tau_max` is negative or not finite.
    pub fn set_delta_tau_max(&mut self, delta_tau_max: f64) -> ImpedanceResult<()> {
        if !(delta_tau_max.is_finite() && delta_tau_max >= 0.) {
            return Err(create_configuration_exception(
                "maximum torque delta must be finite and non-negative",
            ));
        }
        self.delta_tau_max = delta_tau_max;
        Ok(())
    }

    pub fn delta_tau_max(&self) -> f64 {
        self.delta_tau_max
    }

    pub fn last_commanded(&self) -> &Vector7 {
        &self.last_commanded
    }

    /// Overwrites the previous command, e.g. with the measured torque on activation.
    pub fn reset(&mut self, last_commanded: Vector7) {
        self.last_commanded = last_commanded;
    }

    /// Saturates `tau_desired` and remembers the result.
    pub fn limit(&mut self, tau_desired: &Vector7) -> Vector7 {
        saturate_torque_rate(tau_desired, &mut self.last_commanded, self.delta_tau_max)
    }
}
