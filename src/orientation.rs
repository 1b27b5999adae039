// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Conversions between roll-pitch-yaw angles and unit quaternions.
//!
//! The convention is the X-Y-Z axis sequence: a rotation of `rpy.x` about X, followed by
//! `rpy.y` about the new Y and `rpy.z` about the new Z, i.e. `R = Rx(roll) * Ry(pitch) * Rz(yaw)`.
//! Note that this is *not* the convention of [`UnitQuaternion::from_euler_angles`].

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

/// Converts roll-pitch-yaw angles to a unit quaternion.
///
/// # Arguments
/// * `rpy` - Angles about X, Y and Z in \[rad\].
/// # Return
/// Normalized quaternion representing `Rx(rpy.x) * Ry(rpy.y) * Rz(rpy.z)`.
pub fn rpy_to_quaternion(rpy: &Vector3<f64>) -> UnitQuaternion<f64> {
    let rotation = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), rpy.x)
        * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), rpy.y)
        * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), rpy.z);
    UnitQuaternion::new_normalize(rotation.into_inner())
}

/// Converts a quaternion to roll-pitch-yaw angles.
///
/// The quaternion is normalized first. Roll and yaw are returned in \[-pi, pi\], pitch in
/// \[-pi/2, pi/2\]. At pitch = ±pi/2 (gimbal lock) roll and yaw are not unique and the
/// returned pair is just one valid decomposition.
/// # Return
/// Angles about X, Y and Z in \[rad\].
pub fn quaternion_to_rpy(q: &Quaternion<f64>) -> Vector3<f64> {
    let rotation = UnitQuaternion::new_normalize(*q).to_rotation_matrix();
    let m = rotation.matrix();
    let roll = f64::atan2(-m[(1, 2)], m[(2, 2)]);
    let pitch = f64::atan2(m[(0, 2)], f64::sqrt(m[(0, 0)].powi(2) + m[(0, 1)].powi(2)));
    let yaw = f64::atan2(-m[(0, 1)], m[(0, 0)]);
    Vector3::new(roll, pitch, yaw)
}
