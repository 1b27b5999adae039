// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use nalgebra::{UnitQuaternion, Vector3, Vector6};
use tracing::{info, warn};

use impedance::{
    CartesianImpedanceController, CartesianPose, ControllerConfig, ImpedanceResult, JointState,
    Matrix6x7, RobotSnapshot, Vector7,
};

/// Drives the impedance controller against a simulated arm with constant Jacobian and unit
/// joint inertia. The desired pose steps away from the start pose, after half of the run a
/// downward force is commanded on top.
#[derive(Parser, Debug)]
#[clap(author, version, name = "impedance_simulation")]
struct CommandLineArguments {
    /// Simulated time in seconds
    #[clap(short, long, default_value_t = 5.)]
    pub duration: f64,
    /// Step of the desired position along X in meters
    #[clap(long, default_value_t = 0.05)]
    pub step_x: f64,
    /// Step of the desired position along Y in meters
    #[clap(long, default_value_t = 0.)]
    pub step_y: f64,
    /// Step of the desired position along Z in meters
    #[clap(long, default_value_t = -0.03)]
    pub step_z: f64,
    /// Downward force commanded during the second half in Newton
    #[clap(short, long, default_value_t = 5.)]
    pub force: f64,
    /// Controller settings as JSON. Missing fields use the defaults
    #[clap(short, long)]
    pub config: Option<PathBuf>,
}

const SAMPLE_TIME: f64 = 1e-3;

struct ToyArm {
    jacobian: Matrix6x7,
    q0: Vector7,
    start: CartesianPose,
    q: Vector7,
    dq: Vector7,
}

impl ToyArm {
    fn new() -> Self {
        let q0 = Vector7::from_column_slice(&[0., -0.78, 0., -2.36, 0., 1.57, 0.78]);
        ToyArm {
            jacobian: Matrix6x7::from_row_slice(&[
                0.0, 0.1, 0.0, -0.2, 0.0, 0.2, 0.0, //
                0.3, 0.0, 0.3, 0.0, 0.1, 0.0, 0.0, //
                0.0, -0.3, 0.0, 0.5, 0.0, 0.1, 0.0, //
                0.0, 0.0, 0.7, 0.0, 0.7, 0.0, 0.0, //
                0.0, 1.0, 0.0, -1.0, 0.0, -1.0, 0.0, //
                1.0, 0.0, 0.7, 0.0, -0.7, 0.0, -1.0,
            ]),
            q0,
            start: CartesianPose::from_rpy(
                Vector3::new(0.3, 0., 0.5),
                &Vector3::new(std::f64::consts::PI, 0., 0.),
            ),
            q: q0,
            dq: Vector7::zeros(),
        }
    }

    fn pose(&self) -> CartesianPose {
        let displacement: Vector6<f64> = self.jacobian * (self.q - self.q0);
        let rotation = UnitQuaternion::from_scaled_axis(displacement.fixed_rows::<3>(3).into_owned());
        CartesianPose {
            position: self.start.position + displacement.fixed_rows::<3>(0),
            orientation: rotation * self.start.orientation,
        }
    }

    fn snapshot(&self) -> RobotSnapshot {
        RobotSnapshot {
            joints: JointState {
                q: self.q,
                dq: self.dq,
            },
            pose: self.pose(),
            jacobian: self.jacobian,
        }
    }

    fn step(&mut self, tau: &Vector7) {
        // a little joint friction
        let ddq = tau - 0.5 * self.dq;
        self.dq += ddq * SAMPLE_TIME;
        self.q += self.dq * SAMPLE_TIME;
    }
}

fn load_config(path: &Option<PathBuf>) -> ControllerConfig {
    let path = match path {
        Some(path) => path,
        None => return ControllerConfig::default(),
    };
    match fs::read_to_string(path).map(|text| serde_json::from_str(&text)) {
        Ok(Ok(config)) => config,
        Ok(Err(error)) => {
            warn!(%error, "could not parse config, using defaults");
            ControllerConfig::default()
        }
        Err(error) => {
            warn!(%error, "could not read config, using defaults");
            ControllerConfig::default()
        }
    }
}

fn main() -> ImpedanceResult<()> {
    tracing_subscriber::fmt::init();
    let args = CommandLineArguments::parse();
    let config = load_config(&args.config);
    let mut controller = CartesianImpedanceController::new(&config)?;

    let mut arm = ToyArm::new();
    controller.activate(&arm.snapshot(), &Vector7::zeros())?;
    let goal = CartesianPose {
        position: arm.start.position + Vector3::new(args.step_x, args.step_y, args.step_z),
        ..arm.start
    };
    controller.set_desired_pose(&goal)?;

    let cycles = (args.duration / SAMPLE_TIME).round() as usize;
    let report_every = (0.5 / SAMPLE_TIME) as usize;
    for cycle in 0..cycles {
        if cycle == cycles / 2 && args.force != 0. {
            controller.apply_wrench(&Vector6::new(0., 0., -args.force, 0., 0., 0.))?;
            info!(force = args.force, "commanding downward force");
        }
        let tau: Vector7 = controller.update(&arm.snapshot())?.into();
        arm.step(&tau);
        if cycle % report_every == 0 {
            let error = controller.pose_error();
            info!(
                time = cycle as f64 * SAMPLE_TIME,
                position_error = error.fixed_rows::<3>(0).norm(),
                orientation_error = error.fixed_rows::<3>(3).norm(),
                tau_norm = controller.last_commands().tau_commanded.norm(),
                "cycle"
            );
        }
    }
    let final_pose = arm.pose();
    info!(
        position = ?final_pose.position,
        goal = ?goal.position,
        distance = (final_pose.position - goal.position).norm(),
        "simulation finished"
    );
    Ok(())
}
