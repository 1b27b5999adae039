// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! contains useful type definitions and conversion functions.
#![allow(non_upper_case_globals)]
use nalgebra::{Isometry3, Matrix4, Rotation3, SMatrix, SVector, Vector3};

/// Number of joints of the manipulator.
pub const NUM_JOINTS: usize = 7;
/// A Vector with 7 entries
pub type Vector7 = SVector<f64, NUM_JOINTS>;
/// A Matrix with 6 rows and 7 columns
pub type Matrix6x7 = SMatrix<f64, 6, NUM_JOINTS>;
/// A Matrix with 7 rows and 6 columns
pub type Matrix7x6 = SMatrix<f64, NUM_JOINTS, 6>;
/// A Matrix with 7 rows and 7 columns
pub type Matrix7 = SMatrix<f64, NUM_JOINTS, NUM_JOINTS>;

/// converts a 4x4 column-major homogenous matrix to an Isometry
pub fn array_to_isometry(array: &[f64; 16]) -> Isometry3<f64> {
    let rot = Rotation3::from_matrix(
        &Matrix4::from_column_slice(array)
            .remove_column(3)
            .remove_row(3),
    );
    Isometry3::from_parts(
        Vector3::new(array[12], array[13], array[14]).into(),
        rot.into(),
    )
}

/// converts an Isometry to a 4x4 column-major homogenous matrix
pub fn isometry_to_array(transform: &Isometry3<f64>) -> [f64; 16] {
    let mut out = [0.; 16];
    for (i, &x) in transform.to_homogeneous().iter().enumerate() {
        out[i] = x;
    }
    out
}

/// Determines whether the given array represents a valid homogeneous transformation matrix.
/// transform is represented as a 4x4 matrix in column-major format
#[allow(clippy::float_cmp)]
pub fn is_homogeneous_transformation(transform: &[f64; 16]) -> bool {
    const kOrthonormalThreshold: f64 = 1e-5;
    if transform[3] != 0.0 || transform[7] != 0.0 || transform[11] != 0.0 || transform[15] != 1.0 {
        return false;
    }
    for j in 0..3 {
        let column_norm = Vector3::new(transform[j * 4], transform[j * 4 + 1], transform[j * 4 + 2]);
        if f64::abs(column_norm.norm() - 1.) > kOrthonormalThreshold {
            return false;
        }
    }
    for i in 0..3 {
        let row_norm = Vector3::new(transform[i], transform[4 + i], transform[8 + i]);
        if f64::abs(row_norm.norm() - 1.) > kOrthonormalThreshold {
            return false;
        }
    }
    true
}

/// true if every element of the slice is neither infinite nor NaN
pub fn all_finite<'a, I: IntoIterator<Item = &'a f64>>(values: I) -> bool {
    values.into_iter().all(|x| x.is_finite())
}
