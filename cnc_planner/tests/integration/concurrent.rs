//! Producer and consumer on separate threads.

use cnc_common::planner::command::MachineCommand;
use cnc_common::planner::error::PlannerError;
use cnc_common::planner::state::{AxisFlags, AxisVector, MotionState, RunState};
use cnc_planner::collab::MachineControl;
use cnc_planner::exec::{ExecContext, ExecStatus};
use cnc_planner::kinematics::IdentityKinematics;
use cnc_planner::planner::Planner;
use cnc_planner::sim::{SimMachine, SimSteps};

const ITEMS: u16 = 2000;

/// Records every executed command in order.
#[derive(Default)]
struct Recorder {
    seen: Vec<u16>,
    cycle_ends: u32,
}

impl MachineControl for Recorder {
    fn run_state(&self) -> RunState {
        RunState::Running
    }

    fn set_motion_state(&mut self, _state: MotionState) {}

    fn cycle_end(&mut self) {
        self.cycle_ends += 1;
    }

    fn hard_alarm(&mut self, err: PlannerError) {
        panic!("unexpected alarm: {err}");
    }

    fn abort_arc(&mut self) {}

    fn exec_command(&mut self, command: MachineCommand, values: &AxisVector, _flags: AxisFlags) {
        if let MachineCommand::Custom(code) = command {
            assert_eq!(values[0], code as f32);
            self.seen.push(code);
        }
    }
}

#[test]
fn fifo_across_threads() {
    let mut planner = Planner::<8>::new();
    let (mut producer, mut consumer) = planner.split();
    let recorder = std::thread::scope(|s| {
        let worker = s.spawn(move || {
            let mut recorder = Recorder::default();
            let mut steps = SimSteps::new();
            while recorder.seen.len() < ITEMS as usize {
                let mut ctx = ExecContext {
                    steps: &mut steps,
                    kinematics: &IdentityKinematics,
                    machine: &mut recorder,
                };
                if consumer.exec_move(&mut ctx).unwrap() == ExecStatus::Noop {
                    std::hint::spin_loop();
                }
                steps.tick(1000);
            }
            recorder
        });

        let mut machine = SimMachine::new();
        for code in 0..ITEMS {
            while producer.buffers_available() == 0 {
                std::thread::yield_now();
            }
            let mut values = [0.0; 6];
            values[0] = code as f32;
            if code % 5 == 0 {
                producer.dwell(&mut machine, 0.0).unwrap();
            }
            while producer.buffers_available() == 0 {
                std::thread::yield_now();
            }
            producer
                .queue_command(&mut machine, MachineCommand::Custom(code), &values, AxisFlags::X)
                .unwrap();
        }
        assert!(machine.alarm().is_none());

        worker.join().unwrap()
    });

    let expected: Vec<u16> = (0..ITEMS).collect();
    assert_eq!(recorder.seen, expected);
    assert!(recorder.cycle_ends >= 1);
}
