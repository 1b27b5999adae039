// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! # cartesian-impedance-rs
//! cartesian-impedance-rs computes joint torques that make the end effector of a 7 DOF
//! torque-controlled manipulator behave like a spring-damper system around a desired pose.
//! A nullspace controller pulls the redundant joint motion towards a reference configuration.
//!
//! **THE TORQUES DO NOT CONTAIN GRAVITY OR CORIOLIS COMPENSATION. ALWAYS HAVE THE USER STOP
//! BUTTON AT HAND WHILE CONTROLLING THE ROBOT!**
//!
//! ## Design
//! The library does no I/O and owns no thread. The host control loop supplies a
//! [`RobotSnapshot`] (joint positions and velocities, end effector pose, Jacobian) once per
//! control period and forwards the returned [`Torques`].
//!
//! Every cycle runs the same pipeline:
//! 1. live stiffness, damping, nullspace parameters, desired pose and wrench move one
//! smoothing step towards their targets ([`controller::smoothing`]).
//! 2. the pose error is computed with quaternion sign handling ([`controller::pose_error`]).
//! 3. the nullspace projector is built from a regularized pseudo-inverse
//! ([`controller::pseudo_inverse`]).
//! 4. task, nullspace and wrench torques are summed ([`controller::control_law`]).
//! 5. the change with respect to the previous command is saturated
//! ([`controller::rate_limiting`]).
//!
//! Parameters are changed with setters on the [`CartesianImpedanceController`]. They only
//! write targets, so the commanded torque never jumps because of a reconfiguration.
//!
//! # Example:
//!```no_run
//! use impedance::{CartesianImpedanceController, ControllerConfig, ImpedanceResult};
//! use impedance::{CartesianPose, RobotSnapshot, Vector7};
//! use nalgebra::Vector3;
//! # fn read_state() -> RobotSnapshot { unimplemented!() }
//! # fn send(_tau: [f64; 7]) {}
//! fn main() -> ImpedanceResult<()> {
//!     let mut controller = CartesianImpedanceController::new(&ControllerConfig::default())?;
//!     let state = read_state();
//!     controller.activate(&state, &Vector7::zeros())?;
//!     let goal = state.pose.position + Vector3::new(0., 0., -0.1);
//!     controller.set_desired_pose(&CartesianPose {
//!         position: goal,
//!         ..state.pose
//!     })?;
//!     loop {
//!         let torques = controller.update(&read_state())?;
//!         send(torques.tau_J);
//!     }
//! }
//!   ```
//!
//! The main function returns an ImpedanceResult<()> which means that it returns either Ok(())
//! or an Error of type [`ImpedanceException`]. A
//! [`ControlException`](`ImpedanceException::ControlException`) from
//! [`update`](`CartesianImpedanceController::update`) leaves the previous command untouched,
//! the host can keep sending
//! [`last_commanded_torque`](`CartesianImpedanceController::last_commanded_torque`) or stop.
//!
//! [`ControllerConfig`] implements serde's `Serialize` and `Deserialize`, so the settings can
//! be loaded from any format the host prefers. Missing fields use their defaults.

pub mod controller;
pub mod exception;
pub mod orientation;
pub mod utils;

pub use controller::config::{ControllerConfig, DampingFactors};
pub use controller::pseudo_inverse::PseudoInverseConfig;
pub use controller::smoothing::SmoothingFactors;
pub use controller::types::*;
pub use controller::CartesianImpedanceController;
pub use exception::{ImpedanceException, ImpedanceResult};
pub use orientation::{quaternion_to_rpy, rpy_to_quaternion};
pub use utils::*;
