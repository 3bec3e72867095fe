//! Flushing the planner during a hold.

use cnc_common::planner::command::MachineCommand;
use cnc_common::planner::state::{AxisFlags, MotionState, RunState};
use cnc_planner::exec::{ExecContext, ExecStatus};
use cnc_planner::kinematics::IdentityKinematics;
use cnc_planner::planner::Planner;
use cnc_planner::sim::{SimMachine, SimSteps};

#[test]
fn flush_mid_move_abandons_queue() {
    let mut planner = Planner::<4>::new();
    let mut steps = SimSteps::new();
    let mut machine = SimMachine::new();

    {
        let (mut producer, mut consumer) = planner.split();
        producer
            .queue_line(&mut machine, &[8.0, 0.0, 0.0, 0.0, 0.0, 0.0], 0.04, 1)
            .unwrap();
        producer
            .queue_command(&mut machine, MachineCommand::ProgramEnd, &[0.0; 6], AxisFlags::empty())
            .unwrap();

        let mut ctx = ExecContext {
            steps: &mut steps,
            kinematics: &IdentityKinematics,
            machine: &mut machine,
        };
        assert_eq!(consumer.exec_move(&mut ctx), Ok(ExecStatus::Continue));
    }

    // Feedhold: execution is suspended.
    machine.set_run_state(RunState::Holding);
    {
        let (_producer, mut consumer) = planner.split();
        let mut ctx = ExecContext {
            steps: &mut steps,
            kinematics: &IdentityKinematics,
            machine: &mut machine,
        };
        assert_eq!(consumer.exec_move(&mut ctx), Ok(ExecStatus::Noop));
    }

    planner.flush(&mut machine);
    assert_eq!(planner.buffers_available(), 4);
    assert_eq!(machine.motion_state(), MotionState::Stop);
    assert_eq!(machine.arc_aborts(), 1);
    // Positions are left alone.
    assert_eq!(planner.planner_model().position[0], 8.0);
    assert_eq!(planner.runtime_model().position[0], 1.0);
    assert!(!planner.runtime_model().busy);

    // The abandoned command never runs; new work starts from slot 0.
    machine.set_run_state(RunState::Ready);
    let (mut producer, mut consumer) = planner.split();
    producer.dwell(&mut machine, 0.0).unwrap();
    assert_eq!(producer.pool().cursors().write.index(), 1);

    let mut ctx = ExecContext {
        steps: &mut steps,
        kinematics: &IdentityKinematics,
        machine: &mut machine,
    };
    assert_eq!(consumer.exec_move(&mut ctx), Ok(ExecStatus::Continue));
    assert_eq!(consumer.exec_move(&mut ctx), Ok(ExecStatus::Done));
    assert_eq!(machine.commands_executed(), 0);
    assert_eq!(machine.cycle_ends(), 1);
}
