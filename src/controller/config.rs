// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the controller settings. Loading them from a file is up to the host, every serde
//! format works.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::controller::compliance::{validate_damping_factors, validate_stiffness};
use crate::controller::logger::MAX_LOG_SIZE;
use crate::controller::pseudo_inverse::PseudoInverseConfig;
use crate::controller::rate_limiting::DEFAULT_DELTA_TAU_MAX;
use crate::controller::smoothing::SmoothingFactors;
use crate::exception::{create_configuration_exception, ImpedanceResult};

/// Damping ratios. 1 is critically damped.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(default)]
pub struct DampingFactors {
    pub translational: [f64; 3],
    pub rotational: [f64; 3],
    pub nullspace: f64,
}

impl Default for DampingFactors {
    fn default() -> Self {
        DampingFactors {
            translational: [1.; 3],
            rotational: [1.; 3],
            nullspace: 1.,
        }
    }
}

impl DampingFactors {
    /// # Errors
    /// * InvalidCompliance if a factor is negative or not finite.
    pub fn validate(&self) -> ImpedanceResult<()> {
        validate_damping_factors(
            &Vector3::from(self.translational),
            &Vector3::from(self.rotational),
            self.nullspace,
        )
    }
}

/// Settings of a [`CartesianImpedanceController`](`crate::CartesianImpedanceController`).
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(default)]
pub struct ControllerConfig {
    /// Stiffness along X, Y, Z in \[N/m\].
    pub translational_stiffness: [f64; 3],
    /// Stiffness about X, Y, Z in \[Nm/rad\].
    pub rotational_stiffness: [f64; 3],
    /// Stiffness of the nullspace controller in \[Nm/rad\].
    pub nullspace_stiffness: f64,
    pub damping_factors: DampingFactors,
    pub smoothing: SmoothingFactors,
    /// Maximum torque change per cycle in \[Nm\].
    pub delta_tau_max: f64,
    pub pseudo_inverse: PseudoInverseConfig,
    /// Number of cycles kept for the ControlException log. 0 disables the log, at most
    /// [`MAX_LOG_SIZE`](`crate::controller::logger::MAX_LOG_SIZE`).
    pub log_size: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            translational_stiffness: [200.; 3],
            rotational_stiffness: [20.; 3],
            nullspace_stiffness: 10.,
            damping_factors: DampingFactors::default(),
            smoothing: SmoothingFactors::default(),
            delta_tau_max: DEFAULT_DELTA_TAU_MAX,
            pseudo_inverse: PseudoInverseConfig::default(),
            log_size: 50,
        }
    }
}

impl ControllerConfig {
    /// Checks every setting.
    /// # Errors
    /// * InvalidCompliance for negative or non-finite stiffness or damping factors.
    /// * InvalidConfiguration for everything else.
    pub fn validate(&self) -> ImpedanceResult<()> {
        validate_stiffness(
            &Vector3::from(self.translational_stiffness),
            &Vector3::from(self.rotational_stiffness),
            self.nullspace_stiffness,
        )?;
        self.damping_factors.validate()?;
        self.smoothing.validate()?;
        self.pseudo_inverse.validate()?;
        if !(self.delta_tau_max.is_finite() && self.delta_tau_max >= 0.) {
            return Err(create_configuration_exception(
                "maximum torque delta must be finite and non-negative",
            ));
        }
        if self.log_size > MAX_LOG_SIZE {
            return Err(create_configuration_exception("log size is too large"));
        }
        Ok(())
    }
}
