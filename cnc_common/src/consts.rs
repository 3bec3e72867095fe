//! System-wide constants for the CNC workspace.
//!
//! Single source of truth for all numeric limits. Pool capacity is a
//! compile-time constant: the planner never allocates after startup.

use static_assertions::const_assert;

/// Number of machine axes (X, Y, Z, A, B, C).
pub const AXES: usize = 6;

/// Number of motors on the board.
pub const MOTORS: usize = 4;

/// Number of move slots in the planner buffer pool.
pub const PLANNER_BUFFER_POOL_SIZE: usize = 48;

/// Default consumer cycle period in microseconds.
pub const CYCLE_TIME_US: u32 = 1000;

/// Lower bound for the consumer cycle period [µs].
pub const CYCLE_TIME_US_MIN: u32 = 100;

/// Upper bound for the consumer cycle period [µs].
pub const CYCLE_TIME_US_MAX: u32 = 100_000;

/// Default nominal segment duration for linear moves [s].
pub const SEGMENT_TIME: f32 = 0.005;

/// Lower bound for the segment duration [s].
pub const SEGMENT_TIME_MIN: f32 = 0.0005;

/// Upper bound for the segment duration [s].
pub const SEGMENT_TIME_MAX: f32 = 0.1;

/// Lengths below this are treated as zero.
pub const EPSILON: f32 = 1e-5;

/// Microseconds per second, used for dwell conversion.
pub const MICROSECONDS_PER_SECOND: f32 = 1_000_000.0;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/planner.toml";

const_assert!(PLANNER_BUFFER_POOL_SIZE >= 2);
const_assert!(PLANNER_BUFFER_POOL_SIZE <= u8::MAX as usize);
const_assert!(AXES > 0 && AXES <= 8);
const_assert!(MOTORS > 0 && MOTORS <= 8);
const_assert!(CYCLE_TIME_US_MIN <= CYCLE_TIME_US && CYCLE_TIME_US <= CYCLE_TIME_US_MAX);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_consistent() {
        assert!(SEGMENT_TIME_MIN <= SEGMENT_TIME && SEGMENT_TIME <= SEGMENT_TIME_MAX);
        assert!(EPSILON > 0.0);
        assert_eq!(MICROSECONDS_PER_SECOND, 1e6);
    }

    #[test]
    fn axis_flags_fit_in_u8() {
        // AxisFlags packs one bit per axis.
        assert!(AXES <= 8);
    }
}
