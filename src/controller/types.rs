// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the per-cycle input types, the compliance state and the torque command type.

use nalgebra::{Isometry3, Matrix6, Quaternion, Translation3, UnitQuaternion, Vector3, Vector6};
use serde::Deserialize;
use serde::Serialize;

use crate::exception::{create_configuration_exception, ImpedanceResult};
use crate::utils::{
    all_finite, array_to_isometry, is_homogeneous_transformation, isometry_to_array,
};
use crate::utils::{Matrix6x7, Vector7};

/// Joint positions and velocities of the manipulator, supplied fresh every cycle.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct JointState {
    /// Measured joint positions in \[rad\].
    pub q: Vector7,
    /// Measured joint velocities in \[rad/s\].
    pub dq: Vector7,
}

impl JointState {
    /// Creates a new JointState instance
    /// # Arguments
    /// * `q` - Joint positions in \[rad\].
    /// * `dq` - Joint velocities in \[rad/s\].
    pub fn new(q: [f64; 7], dq: [f64; 7]) -> Self {
        JointState {
            q: Vector7::from_column_slice(&q),
            dq: Vector7::from_column_slice(&dq),
        }
    }
    /// true if no position or velocity is infinite or NaN
    pub fn is_finite(&self) -> bool {
        all_finite(self.q.iter()) && all_finite(self.dq.iter())
    }
}

/// End effector pose in the base frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CartesianPose {
    /// Position in \[m\].
    pub position: Vector3<f64>,
    /// Orientation as unit quaternion.
    pub orientation: UnitQuaternion<f64>,
}

impl Default for CartesianPose {
    fn default() -> Self {
        CartesianPose {
            position: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
        }
    }
}

impl CartesianPose {
    /// Creates a new pose. The quaternion is normalized.
    pub fn new(position: Vector3<f64>, orientation: Quaternion<f64>) -> Self {
        CartesianPose {
            position,
            orientation: UnitQuaternion::new_normalize(orientation),
        }
    }

    /// Creates a pose from a position and roll-pitch-yaw angles
    /// (see [`rpy_to_quaternion`](`crate::orientation::rpy_to_quaternion`)).
    pub fn from_rpy(position: Vector3<f64>, rpy: &Vector3<f64>) -> Self {
        CartesianPose {
            position,
            orientation: crate::orientation::rpy_to_quaternion(rpy),
        }
    }

    /// Creates a pose from a 4x4 homogeneous transformation matrix in column-major format.
    /// # Errors
    /// * InvalidConfiguration if the array is not finite or not a homogeneous transformation.
    pub fn from_homogeneous(transform: &[f64; 16]) -> ImpedanceResult<Self> {
        if !all_finite(transform.iter()) || !is_homogeneous_transformation(transform) {
            return Err(create_configuration_exception(
                "pose is not a valid homogeneous transformation",
            ));
        }
        let isometry = array_to_isometry(transform);
        Ok(CartesianPose {
            position: isometry.translation.vector,
            orientation: isometry.rotation,
        })
    }

    /// Converts the pose to a 4x4 homogeneous transformation matrix in column-major format.
    pub fn to_homogeneous(&self) -> [f64; 16] {
        isometry_to_array(&Isometry3::from_parts(
            Translation3::from(self.position),
            self.orientation,
        ))
    }

    /// true if no position or quaternion coefficient is infinite or NaN
    pub fn is_finite(&self) -> bool {
        all_finite(self.position.iter()) && all_finite(self.orientation.coords.iter())
    }
}

/// Everything the host supplies for one control cycle.
#[derive(Debug, Copy, Clone)]
pub struct RobotSnapshot {
    pub joints: JointState,
    /// Current end effector pose.
    pub pose: CartesianPose,
    /// Zero Jacobian mapping joint velocities to linear and angular end effector velocity.
    pub jacobian: Matrix6x7,
}

impl RobotSnapshot {
    /// true if joint state, pose and Jacobian contain only finite values
    pub fn is_finite(&self) -> bool {
        self.joints.is_finite() && self.pose.is_finite() && all_finite(self.jacobian.iter())
    }
}

/// One set of impedance parameters. The controller keeps a live and a target instance, see
/// [`ComplianceState`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ImpedanceParameters {
    /// Cartesian stiffness, translational block first.
    pub stiffness: Matrix6<f64>,
    /// Cartesian damping, translational block first.
    pub damping: Matrix6<f64>,
    pub nullspace_stiffness: f64,
    /// Joint configuration the nullspace controller pulls towards.
    pub nullspace_reference: Vector7,
    /// Desired end effector pose.
    pub pose: CartesianPose,
    /// Commanded wrench (force, torque) in the base frame.
    pub wrench: Vector6<f64>,
}

impl Default for ImpedanceParameters {
    fn default() -> Self {
        ImpedanceParameters {
            stiffness: Matrix6::zeros(),
            damping: Matrix6::zeros(),
            nullspace_stiffness: 0.,
            nullspace_reference: Vector7::zeros(),
            pose: CartesianPose::default(),
            wrench: Vector6::zeros(),
        }
    }
}

/// Live parameters used by the control law and the targets they are smoothed towards.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ComplianceState {
    pub current: ImpedanceParameters,
    pub target: ImpedanceParameters,
}

/// Intermediate and final torques of the last cycle.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct CycleCommands {
    pub tau_task: Vector7,
    pub tau_nullspace: Vector7,
    pub tau_wrench: Vector7,
    /// Sum of the above, before rate limiting.
    pub tau_desired: Vector7,
    /// Rate-limited torque sent to the host.
    pub tau_commanded: Vector7,
}

/// Stores joint-level torque commands without gravity and friction.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[allow(non_snake_case)]
pub struct Torques {
    /// Desired torques in \[Nm\].
    pub tau_J: [f64; 7],
}

impl From<Vector7> for Torques {
    fn from(vector: Vector7) -> Self {
        Torques::new(vector.into())
    }
}

impl From<Torques> for Vector7 {
    fn from(torques: Torques) -> Self {
        Vector7::from_column_slice(&torques.tau_J)
    }
}

impl Torques {
    /// Creates a new Torques instance
    /// # Arguments
    /// * `torques` - Desired joint-level torques without gravity and friction in \[Nm\].
    pub fn new(torques: [f64; 7]) -> Self {
        Torques { tau_J: torques }
    }
}

#[cfg(test)]
mod tests {
    use super::{CartesianPose, JointState, RobotSnapshot, Torques};
    use crate::utils::{Matrix6x7, Vector7};
    use nalgebra::{Quaternion, Vector3};

    #[test]
    fn pose_from_homogeneous() {
        let transform = [
            0.0, 1.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.3, 0.1, 0.5, 1.0,
        ];
        let pose = CartesianPose::from_homogeneous(&transform).unwrap();
        assert_eq!(pose.position, Vector3::new(0.3, 0.1, 0.5));
        assert!((pose.orientation.angle() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn pose_to_homogeneous() {
        let pose = CartesianPose::from_rpy(Vector3::new(0.3, 0.1, 0.5), &Vector3::new(0.2, 0.1, -0.4));
        let back = CartesianPose::from_homogeneous(&pose.to_homogeneous()).unwrap();
        assert!((back.position - pose.position).norm() < 1e-12);
        assert!(back.orientation.angle_to(&pose.orientation) < 1e-9);
    }

    #[test]
    fn pose_from_invalid_homogeneous_fails() {
        let mut transform = [0.; 16];
        transform[15] = 1.;
        assert!(CartesianPose::from_homogeneous(&transform).is_err());
        let mut transform = [
            1., 0., 0., 0., 0., 1., 0., 0., 0., 0., 1., 0., 0., 0., 0., 1.,
        ];
        transform[12] = f64::NAN;
        assert!(CartesianPose::from_homogeneous(&transform).is_err());
    }

    #[test]
    fn pose_normalizes_quaternion() {
        let pose = CartesianPose::new(Vector3::zeros(), Quaternion::new(2., 0., 0., 0.));
        assert!((pose.orientation.norm() - 1.).abs() < 1e-15);
    }

    #[test]
    fn snapshot_finiteness() {
        let mut snapshot = RobotSnapshot {
            joints: JointState::new([0.; 7], [0.; 7]),
            pose: CartesianPose::default(),
            jacobian: Matrix6x7::zeros(),
        };
        assert!(snapshot.is_finite());
        snapshot.jacobian[(2, 4)] = f64::INFINITY;
        assert!(!snapshot.is_finite());
        snapshot.jacobian[(2, 4)] = 0.;
        snapshot.joints.dq[6] = f64::NAN;
        assert!(!snapshot.is_finite());
    }

    #[test]
    fn torques_vector_conversion() {
        let vector = Vector7::from_column_slice(&[1., 2., 3., 4., 5., 6., 7.]);
        let torques: Torques = vector.into();
        assert_eq!(torques.tau_J, [1., 2., 3., 4., 5., 6., 7.]);
        assert_eq!(Vector7::from(torques), vector);
    }
}
