//! Position frames and step-counter sync.

use cnc_common::consts::MOTORS;
use cnc_common::planner::config::KinematicsConfig;
use cnc_common::planner::state::Axis;
use cnc_planner::collab::StepPrep;
use cnc_planner::exec::{ExecContext, ExecStatus};
use cnc_planner::kinematics::{CartesianKinematics, IdentityKinematics};
use cnc_planner::planner::Planner;
use cnc_planner::sim::{SimMachine, SimSteps};

#[test]
fn identity_sync_equalizes_step_counters() {
    let mut planner = Planner::<4>::new();
    let (_producer, mut consumer) = planner.split();
    let mut steps = SimSteps::new();
    steps.add_correction(0, 2.0);
    steps.add_correction(3, -1.0);

    consumer.set_runtime_position(Axis::X, 12.5);
    consumer.set_runtime_position(Axis::Y, -3.0);
    consumer.set_runtime_position(Axis::A, 90.0);
    consumer.sync_runtime_to_steps(&IdentityKinematics, &mut steps);

    let runtime = consumer.runtime();
    for motor in 0..MOTORS {
        assert_eq!(runtime.target_steps[motor], runtime.position[motor]);
        assert_eq!(runtime.position_steps[motor], runtime.target_steps[motor]);
        assert_eq!(runtime.commanded_steps[motor], runtime.target_steps[motor]);
        assert_eq!(runtime.following_error[motor], 0.0);
    }
    assert_eq!(steps.encoder_steps(), [12.5, -3.0, 0.0, 90.0]);
    assert_eq!(steps.corrected_steps(), [0.0; MOTORS]);
}

#[test]
fn cartesian_sync_scales_steps() {
    let mut planner = Planner::<4>::new();
    let (_producer, mut consumer) = planner.split();
    let mut steps = SimSteps::new();
    let kinematics = CartesianKinematics::from_config(&KinematicsConfig {
        steps_per_unit: [80.0, 80.0, 400.0, 10.0],
        motor_map: [0, 1, 2, 3],
    });

    consumer.set_runtime_position(Axis::X, 1.0);
    consumer.set_runtime_position(Axis::Z, 0.5);
    consumer.sync_runtime_to_steps(&kinematics, &mut steps);

    assert_eq!(consumer.runtime().position_steps, [80.0, 0.0, 200.0, 0.0]);
    assert_eq!(steps.encoder_steps(), [80.0, 0.0, 200.0, 0.0]);
}

#[test]
fn planner_position_leads_runtime() {
    let mut planner = Planner::<4>::new();
    let (mut producer, mut consumer) = planner.split();
    let mut steps = SimSteps::new();
    let mut machine = SimMachine::new();
    let target = [4.0, 0.0, 0.0, 0.0, 0.0, 0.0];

    producer.queue_line(&mut machine, &target, 0.02, 1).unwrap();
    assert_eq!(*producer.planner_position(), target);
    assert_eq!(consumer.runtime().position, [0.0; 6]);

    let mut ctx = ExecContext {
        steps: &mut steps,
        kinematics: &IdentityKinematics,
        machine: &mut machine,
    };
    assert_eq!(consumer.exec_move(&mut ctx), Ok(ExecStatus::Continue));
    let runtime = consumer.runtime();
    assert_eq!(runtime.position[0], 1.0);
    assert_eq!(runtime.target[0], 1.0);
    assert_eq!(runtime.endpoint, target);
    assert!(runtime.busy);
}

#[test]
fn setters_do_not_cross_frames() {
    let mut planner = Planner::<4>::new();
    {
        let (mut producer, mut consumer) = planner.split();
        producer.set_planner_position(Axis::C, 45.0);
        consumer.set_runtime_position(Axis::B, -10.0);
    }
    assert_eq!(planner.planner_model().position, [0.0, 0.0, 0.0, 0.0, 0.0, 45.0]);
    assert_eq!(planner.runtime_model().position, [0.0, 0.0, 0.0, 0.0, -10.0, 0.0]);
}

#[test]
fn sync_after_move_matches_endpoint() {
    let mut planner = Planner::<4>::new();
    let (mut producer, mut consumer) = planner.split();
    let mut steps = SimSteps::new();
    let mut machine = SimMachine::new();
    producer
        .queue_line(&mut machine, &[3.0, 2.0, 1.0, 0.0, 0.0, 0.0], 0.005, 1)
        .unwrap();

    let mut ctx = ExecContext {
        steps: &mut steps,
        kinematics: &IdentityKinematics,
        machine: &mut machine,
    };
    assert_eq!(consumer.exec_move(&mut ctx), Ok(ExecStatus::Done));

    steps.set_encoder_steps(0, 99.0);
    consumer.sync_runtime_to_steps(&IdentityKinematics, &mut steps);
    assert_eq!(steps.encoder_steps(), [3.0, 2.0, 1.0, 0.0]);
}
