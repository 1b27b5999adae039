// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Computes the task space error between the current and the desired end effector pose.

use nalgebra::{Quaternion, UnitQuaternion, Vector3, Vector6};

use crate::controller::types::CartesianPose;

/// Picks the representative of `orientation` on the same hemisphere as `reference`.
///
/// `q` and `-q` describe the same rotation. If the coefficient vectors of both quaternions
/// have a negative dot product, the coefficients of `orientation` are negated so that the
/// difference rotation computed afterwards is the shorter one.
pub fn select_quaternion_branch(
    orientation: &UnitQuaternion<f64>,
    reference: &UnitQuaternion<f64>,
) -> UnitQuaternion<f64> {
    if reference.coords.dot(&orientation.coords) < 0. {
        UnitQuaternion::new_unchecked(Quaternion::from(-orientation.coords))
    } else {
        *orientation
    }
}

/// Orientation error as rotation axis scaled by the rotation angle in \[rad\].
pub fn orientation_error(
    orientation: &UnitQuaternion<f64>,
    orientation_d: &UnitQuaternion<f64>,
) -> Vector3<f64> {
    let orientation = select_quaternion_branch(orientation, orientation_d);
    if orientation.coords == orientation_d.coords {
        return Vector3::zeros();
    }
    // "difference" quaternion
    let error_quaternion: UnitQuaternion<f64> = orientation * orientation_d.inverse();
    error_quaternion.scaled_axis()
}

/// Computes the 6 dimensional pose error `[position - position_d; axis * angle]`.
///
/// The error is zero if and only if both poses are equal, independent of the sign of the
/// quaternions.
pub fn pose_error(current: &CartesianPose, desired: &CartesianPose) -> Vector6<f64> {
    let mut error = Vector6::zeros();
    error
        .fixed_rows_mut::<3>(0)
        .copy_from(&(current.position - desired.position));
    error
        .fixed_rows_mut::<3>(3)
        .copy_from(&orientation_error(&current.orientation, &desired.orientation));
    error
}
