// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the [`CartesianImpedanceController`] and its building blocks.

pub mod compliance;
pub mod config;
pub mod control_law;
pub mod logger;
pub mod pose_error;
pub mod pseudo_inverse;
pub mod rate_limiting;
pub mod smoothing;
pub mod types;

use nalgebra::{Matrix6, Vector3, Vector6};
use tracing::{debug, info, warn};

use crate::controller::compliance::{
    build_compliance_with_damping_factors, is_non_negative, validate_stiffness,
};
use crate::controller::config::{ControllerConfig, DampingFactors};
use crate::controller::control_law::{compute_torques, wrench_torques, ControlLawInput};
use crate::controller::logger::Logger;
use crate::controller::pose_error::pose_error;
use crate::controller::pseudo_inverse::{resolve_redundancy, PseudoInverseConfig};
use crate::controller::rate_limiting::TorqueRateLimiter;
use crate::controller::smoothing::{smooth_parameters, SmoothingFactors};
use crate::controller::types::{
    CartesianPose, ComplianceState, CycleCommands, RobotSnapshot, Torques,
};
use crate::exception::{
    create_compliance_exception, create_configuration_exception, ImpedanceException,
    ImpedanceResult,
};
use crate::utils::{all_finite, Vector7};

/// Torque-level Cartesian impedance controller for a 7 DOF manipulator.
///
/// The host calls [`update`](`Self::update`) once per control period with a fresh
/// [`RobotSnapshot`] and sends the returned [`Torques`] to the robot, after adding its own
/// gravity and Coriolis compensation. Parameters are changed through the setters, which only
/// write targets. The live parameters used by the control law follow the targets through
/// exponential smoothing in every cycle.
///
/// # Example
/// ```
/// use impedance::{CartesianImpedanceController, ControllerConfig, ImpedanceResult};
/// use impedance::{CartesianPose, JointState, Matrix6x7, RobotSnapshot, Vector7};
/// # fn main() -> ImpedanceResult<()> {
/// let mut controller = CartesianImpedanceController::new(&ControllerConfig::default())?;
/// let snapshot = RobotSnapshot {
///     joints: JointState::new([0.; 7], [0.; 7]),
///     pose: CartesianPose::default(),
///     jacobian: Matrix6x7::identity(),
/// };
/// controller.activate(&snapshot, &Vector7::zeros())?;
/// let torques = controller.update(&snapshot)?;
/// assert_eq!(torques.tau_J, [0.; 7]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CartesianImpedanceController {
    translational_stiffness: Vector3<f64>,
    rotational_stiffness: Vector3<f64>,
    damping_factors: DampingFactors,
    smoothing: SmoothingFactors,
    pseudo_inverse: PseudoInverseConfig,
    compliance: ComplianceState,
    limiter: TorqueRateLimiter,
    logger: Logger,
    error: Vector6<f64>,
    commands: CycleCommands,
    degenerate: bool,
}

impl CartesianImpedanceController {
    /// Creates a controller from validated settings. Live parameters start at their targets.
    /// # Errors
    /// * InvalidCompliance or InvalidConfiguration if `config` does not pass
    /// [`ControllerConfig::validate`].
    pub fn new(config: &ControllerConfig) -> ImpedanceResult<Self> {
        config.validate()?;
        let mut controller = CartesianImpedanceController {
            translational_stiffness: Vector3::from(config.translational_stiffness),
            rotational_stiffness: Vector3::from(config.rotational_stiffness),
            damping_factors: config.damping_factors,
            smoothing: config.smoothing,
            pseudo_inverse: config.pseudo_inverse,
            compliance: ComplianceState::default(),
            limiter: TorqueRateLimiter::new(config.delta_tau_max)?,
            logger: Logger::new(config.log_size),
            error: Vector6::zeros(),
            commands: CycleCommands::default(),
            degenerate: false,
        };
        controller.compliance.target.nullspace_stiffness = config.nullspace_stiffness;
        controller.rebuild_compliance_targets();
        controller.compliance.current = controller.compliance.target;
        Ok(controller)
    }

    /// Prepares the controller for the first cycle.
    ///
    /// Desired pose and nullspace reference are set to the measured state, the wrench is
    /// cleared and the live stiffness and damping jump to their targets. `initial_torque`
    /// becomes the previous command of the rate limiter, usually the torque the robot is
    /// currently applying.
    /// # Errors
    /// * ControlException if the snapshot or `initial_torque` contain non-finite values.
    pub fn activate(
        &mut self,
        snapshot: &RobotSnapshot,
        initial_torque: &Vector7,
    ) -> ImpedanceResult<()> {
        if !snapshot.is_finite() || !all_finite(initial_torque.iter()) {
            return Err(self.control_exception("activation state contains non-finite values"));
        }
        let target = &mut self.compliance.target;
        target.pose = snapshot.pose;
        target.nullspace_reference = snapshot.joints.q;
        target.wrench = Vector6::zeros();
        self.compliance.current = *target;
        self.limiter.reset(*initial_torque);
        self.logger.clear();
        self.error = Vector6::zeros();
        self.commands = CycleCommands {
            tau_commanded: *initial_torque,
            ..CycleCommands::default()
        };
        self.degenerate = false;
        info!(
            position = ?snapshot.pose.position,
            "cartesian impedance controller activated"
        );
        Ok(())
    }

    /// Runs one control cycle and returns the rate-limited joint torques.
    ///
    /// # Errors
    /// * ControlException if the snapshot contains non-finite values or the computed torque is
    /// not finite. The previous command stays untouched in both cases, see
    /// [`last_commanded_torque`](`Self::last_commanded_torque`).
    pub fn update(&mut self, snapshot: &RobotSnapshot) -> ImpedanceResult<Torques> {
        if !snapshot.is_finite() {
            return Err(self.control_exception("robot state contains non-finite values"));
        }
        smooth_parameters(&self.smoothing, &mut self.compliance);
        let live = &self.compliance.current;

        let error = pose_error(&snapshot.pose, &live.pose);
        let redundancy = resolve_redundancy(&snapshot.jacobian, &self.pseudo_inverse);
        if !redundancy.converged || redundancy.rank < 6 {
            if !self.degenerate {
                warn!(
                    rank = redundancy.rank,
                    converged = redundancy.converged,
                    "jacobian is singular, nullspace projection degraded"
                );
            }
            self.degenerate = true;
        } else {
            self.degenerate = false;
        }

        let output = compute_torques(&ControlLawInput {
            q: &snapshot.joints.q,
            dq: &snapshot.joints.dq,
            error: &error,
            jacobian: &snapshot.jacobian,
            stiffness: &live.stiffness,
            damping: &live.damping,
            nullspace_projector: &redundancy.nullspace_projector,
            nullspace_stiffness: live.nullspace_stiffness,
            nullspace_damping_factor: self.damping_factors.nullspace,
            nullspace_reference: &live.nullspace_reference,
        });
        let tau_wrench = wrench_torques(&snapshot.jacobian, &live.wrench);
        let tau_desired = output.tau_desired() + tau_wrench;
        if !all_finite(tau_desired.iter()) {
            return Err(self.control_exception("computed torque is not finite"));
        }

        let tau_commanded = self.limiter.limit(&tau_desired);
        self.error = error;
        self.commands = CycleCommands {
            tau_task: output.tau_task,
            tau_nullspace: output.tau_nullspace,
            tau_wrench,
            tau_desired,
            tau_commanded,
        };
        let torques = Torques::from(tau_commanded);
        self.logger.log(&snapshot.joints, &snapshot.pose, &torques);
        Ok(torques)
    }

    /// Sets new stiffness targets. Damping targets follow with the current damping factors.
    /// # Arguments
    /// * `translational` - Stiffness along X, Y, Z in \[N/m\].
    /// * `rotational` - Stiffness about X, Y, Z in \[Nm/rad\].
    /// * `nullspace` - Stiffness of the nullspace controller in \[Nm/rad\].
    /// # Errors
    /// * InvalidCompliance if a value is negative or not finite. The targets stay unchanged.
    pub fn set_stiffness(
        &mut self,
        translational: &Vector3<f64>,
        rotational: &Vector3<f64>,
        nullspace: f64,
    ) -> ImpedanceResult<()> {
        validate_stiffness(translational, rotational, nullspace)?;
        self.translational_stiffness = *translational;
        self.rotational_stiffness = *rotational;
        self.compliance.target.nullspace_stiffness = nullspace;
        self.rebuild_compliance_targets();
        info!(
            translational = ?translational,
            rotational = ?rotational,
            nullspace,
            "new stiffness targets"
        );
        Ok(())
    }

    /// Sets the damping ratios. 1 is critically damped.
    /// # Errors
    /// * InvalidCompliance if a factor is negative or not finite.
    pub fn set_damping_factors(&mut self, factors: &DampingFactors) -> ImpedanceResult<()> {
        factors.validate()?;
        self.damping_factors = *factors;
        self.rebuild_compliance_targets();
        info!(factors = ?factors, "new damping factors");
        Ok(())
    }

    /// Replaces the damping target with an explicit matrix instead of the one derived from
    /// the stiffness. The next call to [`set_stiffness`](`Self::set_stiffness`) or
    /// [`set_damping_factors`](`Self::set_damping_factors`) derives it again.
    /// # Errors
    /// * InvalidCompliance if the matrix is not finite, not symmetric or has a negative
    /// diagonal element.
    pub fn set_damping(&mut self, damping: &Matrix6<f64>) -> ImpedanceResult<()> {
        if !all_finite(damping.iter())
            || !is_non_negative(&damping.diagonal())
            || (damping - damping.transpose()).abs().max() > 1e-12
        {
            return Err(create_compliance_exception(
                "damping must be a finite symmetric matrix with non-negative diagonal",
            ));
        }
        self.compliance.target.damping = *damping;
        info!("new damping target");
        Ok(())
    }

    /// Sets the joint configuration the nullspace controller pulls towards.
    /// # Errors
    /// * InvalidConfiguration if the reference is not finite.
    pub fn set_nullspace_reference(&mut self, q_reference: &Vector7) -> ImpedanceResult<()> {
        if !all_finite(q_reference.iter()) {
            return Err(create_configuration_exception(
                "nullspace reference must be finite",
            ));
        }
        self.compliance.target.nullspace_reference = *q_reference;
        debug!(q_reference = ?q_reference, "new nullspace reference");
        Ok(())
    }

    /// Sets the desired end effector pose.
    /// # Errors
    /// * InvalidConfiguration if the pose is not finite.
    pub fn set_desired_pose(&mut self, pose: &CartesianPose) -> ImpedanceResult<()> {
        if !pose.is_finite() {
            return Err(create_configuration_exception("desired pose must be finite"));
        }
        self.compliance.target.pose = *pose;
        debug!(
            position = ?pose.position,
            orientation = ?pose.orientation.coords,
            "new desired pose"
        );
        Ok(())
    }

    /// Sets the desired end effector pose from a position and roll-pitch-yaw angles.
    /// # Errors
    /// * InvalidConfiguration if an input is not finite.
    pub fn set_desired_pose_rpy(
        &mut self,
        position: &Vector3<f64>,
        rpy: &Vector3<f64>,
    ) -> ImpedanceResult<()> {
        if !all_finite(rpy.iter()) {
            return Err(create_configuration_exception("desired pose must be finite"));
        }
        self.set_desired_pose(&CartesianPose::from_rpy(*position, rpy))
    }

    /// Commands a wrench (force in \[N\], torque in \[Nm\]) in the base frame on top of the
    /// impedance behavior.
    /// # Errors
    /// * InvalidConfiguration if the wrench is not finite.
    pub fn apply_wrench(&mut self, wrench: &Vector6<f64>) -> ImpedanceResult<()> {
        if !all_finite(wrench.iter()) {
            return Err(create_configuration_exception("wrench must be finite"));
        }
        self.compliance.target.wrench = *wrench;
        debug!(wrench = ?wrench, "new wrench target");
        Ok(())
    }

    /// Sets the wrench target to zero. The live wrench decays with the wrench smoothing factor.
    pub fn clear_wrench(&mut self) {
        self.compliance.target.wrench = Vector6::zeros();
        debug!("wrench target cleared");
    }

    /// # Errors
    /// * InvalidConfiguration if a factor is outside of \[0, 1\].
    pub fn set_smoothing(&mut self, factors: &SmoothingFactors) -> ImpedanceResult<()> {
        factors.validate()?;
        self.smoothing = *factors;
        info!(factors = ?factors, "new smoothing factors");
        Ok(())
    }

    /// Sets the maximum torque change per cycle in \[Nm\].
    /// # Errors
    /// * InvalidConfiguration if `delta_tau_max` is negative or not finite.
    pub fn set_max_torque_delta(&mut self, delta_tau_max: f64) -> ImpedanceResult<()> {
        self.limiter.set_delta_tau_max(delta_tau_max)?;
        info!(delta_tau_max, "new maximum torque delta");
        Ok(())
    }

    /// Live and target parameters.
    pub fn compliance(&self) -> &ComplianceState {
        &self.compliance
    }

    /// Pose error (position, orientation) of the last successful cycle.
    pub fn pose_error(&self) -> &Vector6<f64> {
        &self.error
    }

    /// Intermediate torques of the last successful cycle.
    pub fn last_commands(&self) -> &CycleCommands {
        &self.commands
    }

    /// Torque commanded in the last successful cycle, or the initial torque after activation.
    pub fn last_commanded_torque(&self) -> Torques {
        Torques::from(*self.limiter.last_commanded())
    }

    /// Damping ratios used to derive the damping targets.
    pub fn damping_factors(&self) -> &DampingFactors {
        &self.damping_factors
    }

    /// Smoothing factors per parameter group.
    pub fn smoothing(&self) -> &SmoothingFactors {
        &self.smoothing
    }

    /// Maximum torque change per cycle in \[Nm\].
    pub fn max_torque_delta(&self) -> f64 {
        self.limiter.delta_tau_max()
    }

    fn rebuild_compliance_targets(&mut self) {
        let targets = build_compliance_with_damping_factors(
            &self.translational_stiffness,
            &self.rotational_stiffness,
            self.compliance.target.nullspace_stiffness,
            &Vector3::from(self.damping_factors.translational),
            &Vector3::from(self.damping_factors.rotational),
        );
        let target = &mut self.compliance.target;
        target.stiffness = targets.stiffness;
        target.damping = targets.damping;
    }

    fn control_exception(&mut self, message: &str) -> ImpedanceException {
        warn!(
            last_command = ?self.limiter.last_commanded().as_slice(),
            "control exception: {}",
            message
        );
        let log = self.logger.flush();
        ImpedanceException::ControlException {
            log: if log.is_empty() { None } else { Some(log) },
            error: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CartesianImpedanceController;
    use crate::controller::config::{ControllerConfig, DampingFactors};
    use crate::controller::smoothing::SmoothingFactors;
    use crate::controller::types::{CartesianPose, JointState, RobotSnapshot};
    use crate::exception::ImpedanceException;
    use crate::utils::{Matrix6x7, Vector7};
    use nalgebra::{Matrix6, UnitQuaternion, Vector3, Vector6};

    fn test_jacobian() -> Matrix6x7 {
        Matrix6x7::from_row_slice(&[
            0.0, 0.1, 0.0, -0.2, 0.0, 0.2, 0.0, //
            0.3, 0.0, 0.3, 0.0, 0.1, 0.0, 0.0, //
            0.0, -0.3, 0.0, 0.5, 0.0, 0.1, 0.0, //
            0.0, 0.0, 0.7, 0.0, 0.7, 0.0, 0.0, //
            0.0, 1.0, 0.0, -1.0, 0.0, -1.0, 0.0, //
            1.0, 0.0, 0.7, 0.0, -0.7, 0.0, -1.0,
        ])
    }

    fn snapshot() -> RobotSnapshot {
        RobotSnapshot {
            joints: JointState::new([0., -0.78, 0., -2.36, 0., 1.57, 0.78], [0.; 7]),
            pose: CartesianPose::from_rpy(
                Vector3::new(0.3, 0., 0.5),
                &Vector3::new(std::f64::consts::PI, 0., 0.),
            ),
            jacobian: test_jacobian(),
        }
    }

    fn active_controller(initial_torque: &Vector7) -> CartesianImpedanceController {
        let mut controller =
            CartesianImpedanceController::new(&ControllerConfig::default()).unwrap();
        controller.activate(&snapshot(), initial_torque).unwrap();
        controller
    }

    #[test]
    fn equilibrium_ramps_previous_torque_to_zero() {
        let initial = Vector7::from_column_slice(&[3., -0.5, 0., 1., -2., 0.25, 0.]);
        let mut controller = active_controller(&initial);
        let torques = controller.update(&snapshot()).unwrap();
        assert_eq!(controller.last_commands().tau_desired, Vector7::zeros());
        assert_eq!(controller.pose_error(), &Vector6::zeros());
        assert_eq!(torques.tau_J, [2., 0., 0., 0., -1., 0., 0.]);
        let torques = controller.update(&snapshot()).unwrap();
        assert_eq!(torques.tau_J, [1., 0., 0., 0., 0., 0., 0.]);
    }

    #[test]
    fn offset_produces_restoring_torque() {
        let mut controller = active_controller(&Vector7::zeros());
        controller
            .set_smoothing(&SmoothingFactors::uniform(1.))
            .unwrap();
        controller.set_max_torque_delta(1000.).unwrap();
        let mut state = snapshot();
        state.pose.position.x += 0.01;
        controller.update(&state).unwrap();
        assert!((controller.pose_error()[0] - 0.01).abs() < 1e-12);
        // F = -K * e = -2 N along X
        let expected = state.jacobian.transpose() * Vector6::new(-2., 0., 0., 0., 0., 0.);
        assert!((controller.last_commands().tau_task - expected).norm() < 1e-9);
        assert_eq!(
            controller.last_commands().tau_commanded,
            controller.last_commands().tau_desired
        );
    }

    #[test]
    fn stiffness_changes_are_smoothed() {
        let mut controller = active_controller(&Vector7::zeros());
        controller
            .set_stiffness(&Vector3::repeat(400.), &Vector3::repeat(20.), 10.)
            .unwrap();
        assert_eq!(controller.compliance().target.stiffness[(0, 0)], 400.);
        assert_eq!(controller.compliance().target.damping[(0, 0)], 40.);
        assert_eq!(controller.compliance().current.stiffness[(0, 0)], 200.);
        controller.update(&snapshot()).unwrap();
        assert!((controller.compliance().current.stiffness[(0, 0)] - 220.).abs() < 1e-12);
        let mut previous = 220.;
        for _ in 0..200 {
            controller.update(&snapshot()).unwrap();
            let current = controller.compliance().current.stiffness[(0, 0)];
            assert!(current >= previous - 1e-9 && current <= 400. + 1e-9);
            previous = current;
        }
        assert!((previous - 400.).abs() < 1e-6);
    }

    #[test]
    fn invalid_stiffness_keeps_targets() {
        let mut controller = active_controller(&Vector7::zeros());
        let before = *controller.compliance();
        let result = controller.set_stiffness(&Vector3::new(100., -1., 100.), &Vector3::zeros(), 0.);
        assert!(matches!(
            result,
            Err(ImpedanceException::InvalidCompliance { .. })
        ));
        assert_eq!(*controller.compliance(), before);
        assert!(controller
            .set_stiffness(&Vector3::zeros(), &Vector3::repeat(f64::NAN), 0.)
            .is_err());
        assert!(controller.set_smoothing(&SmoothingFactors::uniform(1.5)).is_err());
        assert!(controller.set_max_torque_delta(-1.).is_err());
        assert_eq!(controller.max_torque_delta(), 1.);
    }

    #[test]
    fn damping_factors_scale_damping() {
        let mut controller = active_controller(&Vector7::zeros());
        controller
            .set_damping_factors(&DampingFactors {
                translational: [0.5, 1., 2.],
                rotational: [1.; 3],
                nullspace: 0.7,
            })
            .unwrap();
        let damping = controller.compliance().target.damping;
        let d = 2. * 200f64.sqrt();
        assert!((damping[(0, 0)] - 0.5 * d).abs() < 1e-12);
        assert!((damping[(1, 1)] - d).abs() < 1e-12);
        assert!((damping[(2, 2)] - 2. * d).abs() < 1e-12);
        assert_eq!(controller.damping_factors().nullspace, 0.7);

        let explicit = Matrix6::from_diagonal_element(5.);
        controller.set_damping(&explicit).unwrap();
        assert_eq!(controller.compliance().target.damping, explicit);
        let mut asymmetric = explicit;
        asymmetric[(0, 1)] = 1.;
        assert!(controller.set_damping(&asymmetric).is_err());
    }

    #[test]
    fn non_finite_state_keeps_previous_torque() {
        let initial = Vector7::repeat(0.5);
        let mut controller = active_controller(&initial);
        controller.update(&snapshot()).unwrap();
        controller.update(&snapshot()).unwrap();
        let held = controller.last_commanded_torque();
        let commands = *controller.last_commands();

        let mut state = snapshot();
        state.joints.dq[3] = f64::NAN;
        match controller.update(&state) {
            Err(ImpedanceException::ControlException { log, error }) => {
                assert!(error.contains("non-finite"));
                let log = log.unwrap();
                assert_eq!(log.len(), 2);
                assert_eq!(log[1].command, held);
            }
            other => panic!("expected ControlException, got {:?}", other),
        }
        assert_eq!(controller.last_commanded_torque(), held);
        assert_eq!(*controller.last_commands(), commands);

        let mut state = snapshot();
        state.jacobian[(0, 0)] = f64::INFINITY;
        assert!(controller.update(&state).is_err());
        assert_eq!(controller.last_commanded_torque(), held);
    }

    #[test]
    fn overflowing_torque_is_rejected() {
        let mut controller = active_controller(&Vector7::zeros());
        controller
            .set_smoothing(&SmoothingFactors::uniform(1.))
            .unwrap();
        // the first joint sees 0.3 * MAX + 1.0 * MAX
        controller
            .apply_wrench(&Vector6::new(0., f64::MAX, 0., 0., 0., f64::MAX))
            .unwrap();
        assert!(matches!(
            controller.update(&snapshot()),
            Err(ImpedanceException::ControlException { .. })
        ));
        assert_eq!(controller.last_commanded_torque().tau_J, [0.; 7]);
    }

    #[test]
    fn wrench_is_added_and_cleared() {
        let mut controller = active_controller(&Vector7::zeros());
        controller
            .set_smoothing(&SmoothingFactors {
                wrench: 1.,
                ..SmoothingFactors::default()
            })
            .unwrap();
        let wrench = Vector6::new(0., 0., -10., 0., 0., 0.);
        controller.apply_wrench(&wrench).unwrap();
        controller.update(&snapshot()).unwrap();
        let expected = test_jacobian().transpose() * wrench;
        assert!((controller.last_commands().tau_wrench - expected).norm() < 1e-12);
        assert_eq!(
            controller.last_commands().tau_desired,
            controller.last_commands().tau_wrench
        );
        controller.clear_wrench();
        controller.update(&snapshot()).unwrap();
        assert_eq!(controller.last_commands().tau_wrench, Vector7::zeros());
        assert!(controller
            .apply_wrench(&Vector6::repeat(f64::NAN))
            .is_err());
    }

    #[test]
    fn desired_pose_rpy_sets_target_only() {
        let mut controller = active_controller(&Vector7::zeros());
        let position = Vector3::new(0.4, 0.1, 0.4);
        let rpy = Vector3::new(std::f64::consts::PI, 0.1, 0.);
        controller.set_desired_pose_rpy(&position, &rpy).unwrap();
        let target = controller.compliance().target.pose;
        assert_eq!(target.position, position);
        assert_eq!(
            controller.compliance().current.pose,
            snapshot().pose
        );
        controller.update(&snapshot()).unwrap();
        let current = controller.compliance().current.pose;
        assert!((current.position - (0.1 * position + 0.9 * snapshot().pose.position)).norm() < 1e-12);
        assert!(
            current.orientation.angle_to(&target.orientation)
                < snapshot().pose.orientation.angle_to(&target.orientation)
        );
        assert!(controller
            .set_desired_pose_rpy(&position, &Vector3::new(0., f64::NAN, 0.))
            .is_err());
    }

    #[test]
    fn singular_jacobian_stays_finite() {
        let mut controller = active_controller(&Vector7::zeros());
        let mut state = snapshot();
        state.jacobian = Matrix6x7::zeros();
        state.joints.q[0] += 0.5;
        let torques = controller.update(&state).unwrap();
        assert!(torques.tau_J.iter().all(|x| x.is_finite()));
        // rank 0: the projector is the identity and the nullspace spring acts alone
        let nullspace = controller.last_commands().tau_nullspace;
        assert!((nullspace[0] + 10. * 0.5).abs() < 1e-12);
    }

    #[test]
    fn antipodal_orientation_gives_zero_error() {
        let mut controller = active_controller(&Vector7::zeros());
        let mut state = snapshot();
        let flipped = -state.pose.orientation.into_inner();
        state.pose.orientation = UnitQuaternion::new_unchecked(flipped);
        controller.update(&state).unwrap();
        assert!(controller.pose_error().norm() < 1e-12);
    }

    #[test]
    fn construction_rejects_invalid_config() {
        let mut config = ControllerConfig::default();
        config.nullspace_stiffness = -1.;
        assert!(matches!(
            CartesianImpedanceController::new(&config),
            Err(ImpedanceException::InvalidCompliance { .. })
        ));
        let mut config = ControllerConfig::default();
        config.log_size = 0;
        let mut controller = CartesianImpedanceController::new(&config).unwrap();
        let mut state = snapshot();
        state.pose.position.y = f64::NAN;
        match controller.activate(&state, &Vector7::zeros()) {
            Err(ImpedanceException::ControlException { log, .. }) => assert!(log.is_none()),
            other => panic!("expected ControlException, got {:?}", other),
        }
    }

    /// Unit inertia joints with constant linear kinematics: `x = x0 + J_v * (q - q0)`.
    #[test]
    fn closed_loop_converges_to_desired_position() {
        let mut jacobian = test_jacobian();
        for row in 3..6 {
            jacobian.row_mut(row).fill(0.);
        }
        let q0 = Vector7::from_column_slice(&[0., -0.78, 0., -2.36, 0., 1.57, 0.78]);
        let x0 = Vector3::new(0.3, 0., 0.5);
        let pose_at = |q: &Vector7| CartesianPose {
            position: x0 + jacobian.fixed_rows::<3>(0) * (q - q0),
            orientation: UnitQuaternion::identity(),
        };
        let mut config = ControllerConfig::default();
        config.translational_stiffness = [1000.; 3];
        let mut controller = CartesianImpedanceController::new(&config).unwrap();

        let mut q = q0;
        let mut dq = Vector7::zeros();
        let state = |q: &Vector7, dq: &Vector7| RobotSnapshot {
            joints: JointState { q: *q, dq: *dq },
            pose: pose_at(q),
            jacobian,
        };
        controller
            .activate(&state(&q, &dq), &Vector7::zeros())
            .unwrap();
        let goal = x0 + Vector3::new(0.05, 0., 0.);
        controller
            .set_desired_pose(&CartesianPose {
                position: goal,
                orientation: UnitQuaternion::identity(),
            })
            .unwrap();

        let dt = 1e-3;
        for _ in 0..5000 {
            let tau: Vector7 = controller.update(&state(&q, &dq)).unwrap().into();
            dq += tau * dt;
            q += dq * dt;
        }
        assert!((pose_at(&q).position - goal).norm() < 5e-3);
        assert!(dq.norm() < 0.1);
    }
}
