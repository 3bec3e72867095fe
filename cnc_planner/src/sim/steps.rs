//! Simulated step layer.
//!
//! Prepared segments wait in a bounded pipeline and are retired one per
//! [`SimSteps::tick`], the way a step ISR consumes one segment per period.
//! Dwells count down in microseconds on the same tick. Encoder registers
//! follow the retired segments exactly (no following error).

use cnc_common::consts::MOTORS;
use cnc_common::planner::state::MotorVector;
use heapless::Deque;

use crate::collab::StepPrep;

/// Depth of the simulated segment pipeline.
pub const PIPELINE_DEPTH: usize = 4;

/// A segment accepted by the step layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreparedSegment {
    pub target_steps: MotorVector,
    /// Segment duration [s].
    pub time: f32,
}

/// In-memory step layer.
#[derive(Debug, Clone)]
pub struct SimSteps {
    pipeline: Deque<PreparedSegment, PIPELINE_DEPTH>,
    dwell_remaining_us: u32,
    last_dwell_us: Option<u32>,
    dwells_started: u32,
    segments_prepared: u32,
    encoder: MotorVector,
    corrected: MotorVector,
}

impl Default for SimSteps {
    fn default() -> Self {
        Self::new()
    }
}

impl SimSteps {
    pub fn new() -> Self {
        Self {
            pipeline: Deque::new(),
            dwell_remaining_us: 0,
            last_dwell_us: None,
            dwells_started: 0,
            segments_prepared: 0,
            encoder: [0.0; MOTORS],
            corrected: [0.0; MOTORS],
        }
    }

    /// Advance simulated time by one step-layer period.
    pub fn tick(&mut self, elapsed_us: u32) {
        if self.dwell_remaining_us > 0 {
            self.dwell_remaining_us = self.dwell_remaining_us.saturating_sub(elapsed_us);
            return;
        }
        if let Some(segment) = self.pipeline.pop_front() {
            self.encoder = segment.target_steps;
        }
    }

    /// Segments prepared but not yet retired.
    #[inline]
    pub fn pending_segments(&self) -> usize {
        self.pipeline.len()
    }

    /// Prepared segments in retirement order.
    pub fn pending(&self) -> impl Iterator<Item = &PreparedSegment> + '_ {
        self.pipeline.iter()
    }

    /// Whether every prepared segment and dwell has been retired.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.pipeline.is_empty() && self.dwell_remaining_us == 0
    }

    /// Total segments accepted since construction.
    #[inline]
    pub fn segments_prepared(&self) -> u32 {
        self.segments_prepared
    }

    #[inline]
    pub fn dwells_started(&self) -> u32 {
        self.dwells_started
    }

    /// Duration of the most recent dwell, in µs.
    #[inline]
    pub fn last_dwell_us(&self) -> Option<u32> {
        self.last_dwell_us
    }

    #[inline]
    pub fn encoder_steps(&self) -> MotorVector {
        self.encoder
    }

    #[inline]
    pub fn corrected_steps(&self) -> MotorVector {
        self.corrected
    }

    /// Accumulate a step correction for `motor`.
    pub fn add_correction(&mut self, motor: usize, steps: f32) {
        if let Some(c) = self.corrected.get_mut(motor) {
            *c += steps;
        }
    }
}

impl StepPrep for SimSteps {
    fn prep_line(&mut self, target_steps: &MotorVector, segment_time: f32) {
        let segment = PreparedSegment {
            target_steps: *target_steps,
            time: segment_time,
        };
        // The engine checks `ready()` first; a full pipeline drops the
        // oldest segment straight into the encoder.
        if let Err(segment) = self.pipeline.push_back(segment) {
            if let Some(oldest) = self.pipeline.pop_front() {
                self.encoder = oldest.target_steps;
            }
            let _ = self.pipeline.push_back(segment);
        }
        self.segments_prepared += 1;
    }

    fn prep_dwell(&mut self, microseconds: u32) {
        self.dwell_remaining_us = microseconds;
        self.last_dwell_us = Some(microseconds);
        self.dwells_started += 1;
    }

    fn dwell_complete(&self) -> bool {
        self.dwell_remaining_us == 0
    }

    fn set_encoder_steps(&mut self, motor: usize, steps: f32) {
        if let Some(e) = self.encoder.get_mut(motor) {
            *e = steps;
        }
    }

    fn reset_corrections(&mut self) {
        self.corrected = [0.0; MOTORS];
    }

    fn ready(&self) -> bool {
        !self.pipeline.is_full()
    }
}
