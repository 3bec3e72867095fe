//! Line-oriented program driver.
//!
//! Feeds a tiny block language to the producer half:
//!
//! | Block | Meaning |
//! |-------|---------|
//! | `G0`/`G1 X.. Y.. F<s>` | linear move lasting `F` seconds; omitted axes keep their position |
//! | `G4 P<s>` | dwell `P` seconds |
//! | `M<code> [P<v>]` | machine command, `P` in `values[0]` |
//! | `S<rpm>` | spindle speed |
//!
//! `;` starts a comment. This is a driver for the planner, not an
//! interpreter: no modal state, no units, no arcs.

use core::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use cnc_common::consts::AXES;
use cnc_common::planner::command::MachineCommand;
use cnc_common::planner::error::PlannerError;
use cnc_common::planner::state::{Axis, AxisFlags, AxisVector, RunState};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::collab::MachineControl;
use crate::planner::Producer;

/// Poll interval while waiting for a free buffer.
const BUFFER_WAIT: Duration = Duration::from_micros(500);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProgramError {
    #[error("line {line}: {reason}")]
    Syntax { line: u32, reason: String },

    #[error("line {line}: {source}")]
    Planner {
        line: u32,
        #[source]
        source: PlannerError,
    },

    #[error("stopped at line {0}")]
    Interrupted(u32),
}

/// One parsed block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Block {
    Line { axes: [Option<f32>; AXES], seconds: f32 },
    Dwell { seconds: f32 },
    Command { command: MachineCommand, values: AxisVector },
}

/// Counts of queued blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgramSummary {
    pub lines: u32,
    pub moves: u32,
    pub dwells: u32,
    pub commands: u32,
}

fn syntax(line: u32, reason: impl Into<String>) -> ProgramError {
    ProgramError::Syntax {
        line,
        reason: reason.into(),
    }
}

fn parse_number(line: u32, word: &str) -> Result<f32, ProgramError> {
    word[1..]
        .parse::<f32>()
        .map_err(|_| syntax(line, format!("bad number in '{word}'")))
}

/// Parse one block. `Ok(None)` for blank and comment-only lines.
pub fn parse_line(line: u32, text: &str) -> Result<Option<Block>, ProgramError> {
    let code = text.split(';').next().unwrap_or("").trim();
    if code.is_empty() {
        return Ok(None);
    }

    let mut words = code.split_whitespace();
    let head = words.next().unwrap_or("");
    let rest: Vec<&str> = words.collect();
    let letter = head.chars().next().map(|c| c.to_ascii_uppercase());

    match (letter, head.get(1..)) {
        (Some('G'), Some("0" | "00" | "1" | "01")) => {
            let mut axes = [None; AXES];
            let mut seconds = None;
            for word in rest {
                let c = word.chars().next().unwrap_or(' ');
                if c.eq_ignore_ascii_case(&'F') {
                    seconds = Some(parse_number(line, word)?);
                } else if let Some(axis) = Axis::from_letter(c) {
                    axes[axis.index()] = Some(parse_number(line, word)?);
                } else {
                    return Err(syntax(line, format!("unexpected word '{word}'")));
                }
            }
            let seconds = seconds.ok_or_else(|| syntax(line, "move needs F<seconds>"))?;
            if seconds < 0.0 {
                return Err(syntax(line, "negative move time"));
            }
            Ok(Some(Block::Line { axes, seconds }))
        }
        (Some('G'), Some("4" | "04")) => {
            let seconds = match rest.as_slice() {
                [p] if p.starts_with(['P', 'p']) => parse_number(line, p)?,
                _ => return Err(syntax(line, "dwell needs P<seconds>")),
            };
            if seconds < 0.0 {
                return Err(syntax(line, "negative dwell"));
            }
            Ok(Some(Block::Dwell { seconds }))
        }
        (Some('M'), Some(number)) => {
            let code = number
                .parse::<u16>()
                .map_err(|_| syntax(line, format!("bad M code '{head}'")))?;
            let mut values = [0.0; AXES];
            for word in rest {
                if word.starts_with(['P', 'p']) {
                    values[0] = parse_number(line, word)?;
                } else {
                    return Err(syntax(line, format!("unexpected word '{word}'")));
                }
            }
            Ok(Some(Block::Command {
                command: MachineCommand::from_mcode(code),
                values,
            }))
        }
        (Some('S'), Some(_)) if rest.is_empty() => {
            let mut values = [0.0; AXES];
            values[0] = parse_number(line, head)?;
            Ok(Some(Block::Command {
                command: MachineCommand::SpindleSpeed,
                values,
            }))
        }
        _ => Err(syntax(line, format!("unsupported block '{head}'"))),
    }
}

/// Parse and queue every block of `source`, waiting for free buffers.
///
/// Stops early if `shutdown` is set or the machine is e-stopped.
pub fn queue_program<const N: usize>(
    producer: &mut Producer<'_, N>,
    machine: &mut dyn MachineControl,
    source: &str,
    shutdown: &AtomicBool,
) -> Result<ProgramSummary, ProgramError> {
    let mut summary = ProgramSummary::default();

    for (index, text) in source.lines().enumerate() {
        let line = index as u32 + 1;
        let Some(block) = parse_line(line, text)? else {
            continue;
        };

        while producer.buffers_available() == 0 {
            if shutdown.load(Ordering::Acquire) || machine.run_state() == RunState::Estopped {
                warn!(line, "Program interrupted");
                return Err(ProgramError::Interrupted(line));
            }
            std::thread::sleep(BUFFER_WAIT);
        }
        if shutdown.load(Ordering::Acquire) {
            return Err(ProgramError::Interrupted(line));
        }

        let planner_err = |source| ProgramError::Planner { line, source };
        producer.set_line(line);
        match block {
            Block::Line { axes, seconds } => {
                let current = *producer.planner_position();
                let target: AxisVector = core::array::from_fn(|i| axes[i].unwrap_or(current[i]));
                producer
                    .queue_line(machine, &target, seconds, line)
                    .map_err(planner_err)?;
                summary.moves += 1;
            }
            Block::Dwell { seconds } => {
                producer.dwell(machine, seconds).map_err(planner_err)?;
                summary.dwells += 1;
            }
            Block::Command { command, values } => {
                let flags = AxisFlags::from_vector(&values);
                producer
                    .queue_command(machine, command, &values, flags)
                    .map_err(planner_err)?;
                summary.commands += 1;
            }
        }
        summary.lines += 1;
        debug!(line, "Block queued");
    }

    info!(
        lines = summary.lines,
        moves = summary.moves,
        dwells = summary.dwells,
        commands = summary.commands,
        "Program queued"
    );
    Ok(summary)
}
