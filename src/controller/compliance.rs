// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Builds Cartesian stiffness and critically damped damping matrices.

use nalgebra::{Matrix3, Matrix6, Vector3};

use crate::exception::{create_compliance_exception, ImpedanceResult};

/// Stiffness and damping targets produced by [`build_compliance`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ComplianceTargets {
    pub stiffness: Matrix6<f64>,
    pub damping: Matrix6<f64>,
    pub nullspace_stiffness: f64,
}

/// Builds block diagonal stiffness and damping matrices with damping ratio 1.
///
/// # Arguments
/// * `translational_stiffness` - Stiffness along X, Y, Z in \[N/m\].
/// * `rotational_stiffness` - Stiffness about X, Y, Z in \[Nm/rad\].
/// * `nullspace_stiffness` - Passed through unchanged.
///
/// All values have to be non-negative, this is not checked here (see [`validate_stiffness`]).
pub fn build_compliance(
    translational_stiffness: &Vector3<f64>,
    rotational_stiffness: &Vector3<f64>,
    nullspace_stiffness: f64,
) -> ComplianceTargets {
    build_compliance_with_damping_factors(
        translational_stiffness,
        rotational_stiffness,
        nullspace_stiffness,
        &Vector3::repeat(1.),
        &Vector3::repeat(1.),
    )
}

/// Same as [`build_compliance`] but with a per-axis damping ratio:
/// `damping = 2 * factor * sqrt(stiffness)`.
pub fn build_compliance_with_damping_factors(
    translational_stiffness: &Vector3<f64>,
    rotational_stiffness: &Vector3<f64>,
    nullspace_stiffness: f64,
    translational_damping_factors: &Vector3<f64>,
    rotational_damping_factors: &Vector3<f64>,
) -> ComplianceTargets {
    let k_t = Matrix3::from_diagonal(translational_stiffness);
    let k_r = Matrix3::from_diagonal(rotational_stiffness);
    let d_t = Matrix3::from_diagonal(&critical_damping(
        translational_stiffness,
        translational_damping_factors,
    ));
    let d_r = Matrix3::from_diagonal(&critical_damping(
        rotational_stiffness,
        rotational_damping_factors,
    ));

    let mut stiffness = Matrix6::zeros();
    let mut damping = Matrix6::zeros();
    stiffness.fixed_view_mut::<3, 3>(0, 0).copy_from(&k_t);
    stiffness.fixed_view_mut::<3, 3>(3, 3).copy_from(&k_r);
    damping.fixed_view_mut::<3, 3>(0, 0).copy_from(&d_t);
    damping.fixed_view_mut::<3, 3>(3, 3).copy_from(&d_r);
    ComplianceTargets {
        stiffness,
        damping,
        nullspace_stiffness,
    }
}

fn critical_damping(stiffness: &Vector3<f64>, factors: &Vector3<f64>) -> Vector3<f64> {
    stiffness.map(f64::sqrt).component_mul(factors) * 2.
}

/// Checks that all stiffness values are finite and non-negative.
/// # Errors
/// * InvalidCompliance otherwise.
pub fn validate_stiffness(
    translational_stiffness: &Vector3<f64>,
    rotational_stiffness: &Vector3<f64>,
    nullspace_stiffness: f64,
) -> ImpedanceResult<()> {
    if !is_non_negative(translational_stiffness.iter()) {
        return Err(create_compliance_exception(
            "translational stiffness must be finite and non-negative",
        ));
    }
    if !is_non_negative(rotational_stiffness.iter()) {
        return Err(create_compliance_exception(
            "rotational stiffness must be finite and non-negative",
        ));
    }
    if !is_non_negative(std::iter::once(&nullspace_stiffness)) {
        return Err(create_compliance_exception(
            "nullspace stiffness must be finite and non-negative",
        ));
    }
    Ok(())
}

/// Checks that all damping factors are finite and non-negative.
/// # Errors
/// * InvalidCompliance otherwise.
pub fn validate_damping_factors(
    translational: &Vector3<f64>,
    rotational: &Vector3<f64>,
    nullspace: f64,
) -> ImpedanceResult<()> {
    if is_non_negative(translational.iter().chain(rotational.iter()))
        && is_non_negative(std::iter::once(&nullspace))
    {
        Ok(())
    } else {
        Err(create_compliance_exception(
            "damping factors must be finite and non-negative",
        ))
    }
}

pub(crate) fn is_non_negative<'a, I: IntoIterator<Item = &'a f64>>(values: I) -> bool {
    values.into_iter().all(|x| x.is_finite() && *x >= 0.)
}
