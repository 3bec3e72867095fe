//! Command and dwell work items interleaved in one queue.

use cnc_common::planner::command::MachineCommand;
use cnc_common::planner::state::AxisFlags;
use cnc_planner::exec::{ExecContext, ExecStatus};
use cnc_planner::kinematics::IdentityKinematics;
use cnc_planner::planner::{Consumer, Planner};
use cnc_planner::sim::{SimMachine, SimSteps};

fn step<const N: usize>(
    consumer: &mut Consumer<'_, N>,
    steps: &mut SimSteps,
    machine: &mut SimMachine,
) -> ExecStatus {
    let mut ctx = ExecContext {
        steps,
        kinematics: &IdentityKinematics,
        machine,
    };
    consumer.exec_move(&mut ctx).unwrap()
}

#[test]
fn command_then_dwell_fires_cycle_end_once() {
    let mut planner = Planner::<4>::new();
    let (mut producer, mut consumer) = planner.split();
    let mut steps = SimSteps::new();
    let mut machine = SimMachine::new();

    let values = [1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
    let flags = AxisFlags::from_vector(&[1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    producer
        .queue_command(&mut machine, MachineCommand::Custom(100), &values, flags)
        .unwrap();
    producer.dwell(&mut machine, 0.5).unwrap();
    assert_eq!(producer.buffers_available(), 2);

    // First run-cycle: the command, exactly once, no cycle-end.
    assert_eq!(step(&mut consumer, &mut steps, &mut machine), ExecStatus::Done);
    let commands = machine.commands();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].command, MachineCommand::Custom(100));
    assert_eq!(commands[0].values, values);
    assert_eq!(commands[0].flags, AxisFlags::X);
    assert_eq!(machine.cycle_ends(), 0);
    assert_eq!(consumer.buffers_available(), 3);

    // Second run-cycle: dwell timing starts.
    assert_eq!(step(&mut consumer, &mut steps, &mut machine), ExecStatus::Continue);
    assert_eq!(steps.last_dwell_us(), Some(500_000));

    // Still timing: slot held, no cycle-end.
    steps.tick(250_000);
    assert_eq!(step(&mut consumer, &mut steps, &mut machine), ExecStatus::Continue);
    assert_eq!(machine.cycle_ends(), 0);
    assert_eq!(consumer.buffers_available(), 3);

    // Step timing reports completion.
    steps.tick(250_000);
    assert_eq!(step(&mut consumer, &mut steps, &mut machine), ExecStatus::Done);
    assert_eq!(machine.cycle_ends(), 1);
    assert_eq!(consumer.buffers_available(), 4);

    // Nothing left: no further cycle-end.
    assert_eq!(step(&mut consumer, &mut steps, &mut machine), ExecStatus::Noop);
    assert_eq!(machine.cycle_ends(), 1);
    assert_eq!(machine.commands_executed(), 1);
}

#[test]
fn commands_keep_their_place_between_moves() {
    let mut planner = Planner::<8>::new();
    let (mut producer, mut consumer) = planner.split();
    let mut steps = SimSteps::new();
    let mut machine = SimMachine::new();

    producer
        .queue_line(&mut machine, &[1.0, 0.0, 0.0, 0.0, 0.0, 0.0], 0.01, 1)
        .unwrap();
    producer
        .queue_command(&mut machine, MachineCommand::Coolant, &[1.0; 6], AxisFlags::all())
        .unwrap();
    producer
        .queue_line(&mut machine, &[2.0, 0.0, 0.0, 0.0, 0.0, 0.0], 0.01, 3)
        .unwrap();

    let mut segments_at_command = None;
    for _ in 0..20 {
        let status = step(&mut consumer, &mut steps, &mut machine);
        if segments_at_command.is_none() && machine.commands_executed() == 1 {
            segments_at_command = Some(steps.segments_prepared());
        }
        if status == ExecStatus::Noop {
            break;
        }
        steps.tick(1000);
    }

    // Both segments of the first move went out before the command ran.
    assert_eq!(segments_at_command, Some(2));
    assert_eq!(steps.segments_prepared(), 4);
    assert_eq!(consumer.runtime().position[0], 2.0);
    assert_eq!(consumer.runtime().line, 3);
    assert_eq!(machine.cycle_ends(), 1);
}

#[test]
fn drain_then_refill_signals_again() {
    let mut planner = Planner::<4>::new();
    let (mut producer, mut consumer) = planner.split();
    let mut steps = SimSteps::new();
    let mut machine = SimMachine::new();

    for round in 1..=3 {
        producer
            .queue_command(&mut machine, MachineCommand::OptionalStop, &[0.0; 6], AxisFlags::empty())
            .unwrap();
        assert_eq!(step(&mut consumer, &mut steps, &mut machine), ExecStatus::Done);
        assert_eq!(machine.cycle_ends(), round);
    }
}
