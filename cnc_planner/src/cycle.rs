//! Fixed-period consumer cycle.
//!
//! Stands in for the step-timer interrupt: every period the step layer is
//! advanced by one tick and the consumer gets one [`Consumer::exec_move`]
//! call.
//!
//! ## RT Setup Sequence
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)`: lock all pages.
//! 2. Prefault stack pages.
//! 3. `sched_setaffinity`: pin to one CPU core.
//! 4. `sched_setscheduler(SCHED_FIFO, prio)`.
//!
//! ## Cycle Loop
//! With the `rt` feature: absolute-time sleep on `CLOCK_MONOTONIC`, and an
//! overrun ends the loop. Otherwise `std::thread::sleep`, overruns counted
//! only.

use core::sync::atomic::{AtomicBool, Ordering};

use cnc_common::planner::config::PlannerConfig;
use cnc_common::planner::error::PlannerError;
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::collab::Kinematics;
use crate::exec::{ExecContext, ExecStatus};
use crate::planner::Consumer;
use crate::sim::{SimMachine, SimSteps};

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: i64,
    pub min_cycle_ns: i64,
    pub max_cycle_ns: i64,
    /// Running sum for average computation.
    pub sum_cycle_ns: i64,
    /// Cycles whose body outlasted the period.
    pub overruns: u64,
    /// Maximum wake-up latency [ns].
    pub max_latency_ns: i64,
    /// Cycles in which a work item made progress.
    pub busy_cycles: u64,
    /// Cycles skipped with nothing committed.
    pub idle_cycles: u64,
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
            busy_cycles: 0,
            idle_cycles: 0,
        }
    }

    /// Record a cycle duration. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns += duration_ns;
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Average cycle time [ns] (0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

/// Errors during RT setup or cycle execution.
#[derive(Debug, Error)]
pub enum CycleError {
    /// RT system call failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),

    /// The consumer refused or failed to execute.
    #[error("planner: {0}")]
    Planner(#[from] PlannerError),

    /// Cycle body outlasted its period.
    #[error("cycle overrun: {actual_ns}ns > {budget_ns}ns budget")]
    CycleOverrun { actual_ns: i64, budget_ns: i64 },
}

// ─── RT Setup ───────────────────────────────────────────────────────

#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), CycleError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), CycleError> {
    Ok(())
}

/// Touch 256 KiB of stack so the cycle never faults it in.
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, aligned, exclusive reference.
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), CycleError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), CycleError> {
    Ok(())
}

#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` outlives the call; pid 0 is the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), CycleError> {
    Ok(())
}

/// Prepare the calling thread for the cycle loop.
///
/// Without the `rt` feature only the stack prefault runs.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    debug!(cpu_core, rt_priority, "RT setup complete");
    Ok(())
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Drives the consumer half against the simulated step layer.
pub struct CycleRunner<'p, K, const N: usize> {
    consumer: Consumer<'p, N>,
    steps: SimSteps,
    kinematics: K,
    machine: SimMachine,
    pub stats: CycleStats,
    cycle_time_us: u32,
    cycle_time_ns: i64,
}

impl<'p, K: Kinematics, const N: usize> CycleRunner<'p, K, N> {
    /// Build a runner and sync the step counters to the runtime position.
    pub fn new(mut consumer: Consumer<'p, N>, kinematics: K, machine: SimMachine, config: &PlannerConfig) -> Self {
        let mut steps = SimSteps::new();
        consumer.sync_runtime_to_steps(&kinematics, &mut steps);
        Self {
            consumer,
            steps,
            kinematics,
            machine,
            stats: CycleStats::new(),
            cycle_time_us: config.cycle_time_us,
            cycle_time_ns: config.cycle_time_us as i64 * 1000,
        }
    }

    pub fn consumer(&self) -> &Consumer<'p, N> {
        &self.consumer
    }

    pub fn steps(&self) -> &SimSteps {
        &self.steps
    }

    /// One period: tick the step layer, then one execution step.
    ///
    /// The execution step is skipped while the run slot is empty and no
    /// commit has been signalled since the last period.
    pub fn cycle_body(&mut self) -> Result<ExecStatus, CycleError> {
        self.steps.tick(self.cycle_time_us);
        let requested = self.consumer.take_exec_request();
        if !requested && !self.consumer.is_busy() {
            self.stats.idle_cycles += 1;
            return Ok(ExecStatus::Noop);
        }
        let mut ctx = ExecContext {
            steps: &mut self.steps,
            kinematics: &self.kinematics,
            machine: &mut self.machine,
        };
        let status = self.consumer.exec_move(&mut ctx)?;
        if status != ExecStatus::Noop {
            self.stats.busy_cycles += 1;
            trace!(?status, line = self.consumer.runtime().line, "exec");
        }
        Ok(status)
    }

    /// Retire whatever the step layer still holds.
    pub fn drain(&mut self) {
        while !self.steps.is_idle() {
            self.steps.tick(self.cycle_time_us);
        }
    }

    /// Run cycles until `shutdown` is set, then drain the step layer.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<(), CycleError> {
        info!(cycle_time_us = self.cycle_time_us, "Cycle loop started");

        #[cfg(feature = "rt")]
        let result = self.run_rt_loop(shutdown);
        #[cfg(not(feature = "rt"))]
        let result = self.run_sim_loop(shutdown);

        self.drain();
        info!(
            cycles = self.stats.cycle_count,
            busy = self.stats.busy_cycles,
            idle = self.stats.idle_cycles,
            avg_ns = self.stats.avg_cycle_ns(),
            max_ns = self.stats.max_cycle_ns,
            overruns = self.stats.overruns,
            "Cycle loop stopped"
        );
        result
    }

    #[cfg(feature = "rt")]
    fn run_rt_loop(&mut self, shutdown: &AtomicBool) -> Result<(), CycleError> {
        use nix::time::{ClockId, ClockNanosleepFlags, clock_gettime, clock_nanosleep};

        let clock = ClockId::CLOCK_MONOTONIC;
        let now = || clock_gettime(clock).map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")));
        let mut next_wake = now()?;

        while !shutdown.load(Ordering::Acquire) {
            next_wake = timespec_add_ns(next_wake, self.cycle_time_ns);

            let cycle_start = now()?;
            let latency_ns = timespec_diff_ns(&cycle_start, &next_wake).abs();

            self.cycle_body()?;

            let duration_ns = timespec_diff_ns(&now()?, &cycle_start);
            self.stats.record(duration_ns, latency_ns);
            if duration_ns > self.cycle_time_ns {
                self.stats.overruns += 1;
                return Err(CycleError::CycleOverrun {
                    actual_ns: duration_ns,
                    budget_ns: self.cycle_time_ns,
                });
            }

            let _ = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &next_wake);
        }
        Ok(())
    }

    #[cfg(not(feature = "rt"))]
    fn run_sim_loop(&mut self, shutdown: &AtomicBool) -> Result<(), CycleError> {
        use std::time::{Duration, Instant};

        let period = Duration::from_nanos(self.cycle_time_ns as u64);

        while !shutdown.load(Ordering::Acquire) {
            let cycle_start = Instant::now();

            self.cycle_body()?;

            let elapsed = cycle_start.elapsed();
            let duration_ns = elapsed.as_nanos() as i64;
            self.stats.record(duration_ns, 0);
            if duration_ns > self.cycle_time_ns {
                self.stats.overruns += 1;
            }

            if let Some(remaining) = period.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }
        Ok(())
    }
}

// ─── Time Helpers ───────────────────────────────────────────────────

#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    const NS_PER_S: i64 = 1_000_000_000;
    let total = ts.tv_nsec() + ns;
    nix::sys::time::TimeSpec::new(ts.tv_sec() + total.div_euclid(NS_PER_S), total.rem_euclid(NS_PER_S))
}

/// `a - b` in nanoseconds.
#[cfg(feature = "rt")]
fn timespec_diff_ns(a: &nix::sys::time::TimeSpec, b: &nix::sys::time::TimeSpec) -> i64 {
    (a.tv_sec() - b.tv_sec()) * 1_000_000_000 + (a.tv_nsec() - b.tv_nsec())
}
