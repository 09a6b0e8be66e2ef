//! Bus timing configuration.

use embassy_time::Duration;

/// Default minimum time between two micro-steps.
///
/// The controller itself is happy with ~1 µs, but fast MCUs driving long
/// wires with weak pull-ups need considerably more.
pub const DEFAULT_MIN_STEP_INTERVAL: Duration = Duration::from_micros(100);

/// Default deadline for a whole update before it is forcibly dropped.
pub const DEFAULT_WATCHDOG: Duration = Duration::from_millis(100);

/// Default hold with both lines released before the leading start condition.
pub const DEFAULT_BUS_SETTLE: Duration = Duration::from_micros(50);

/// Default hold after the leading start condition.
pub const DEFAULT_START_HOLD: Duration = Duration::from_micros(10);

/// Timing parameters of a display session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Minimum time between two micro-steps. Zero disables the check.
    pub min_step_interval: Duration,
    /// Maximum duration of one update, measured from arming.
    pub watchdog: Duration,
    /// Busy-wait with the bus released while arming.
    pub bus_settle: Duration,
    /// Busy-wait after the start condition while arming.
    pub start_hold: Duration,
}

impl Timings {
    /// For MCUs slow enough that a tick never outruns the bit period.
    pub const SLOW_MCU: Self = Self {
        min_step_interval: Duration::from_ticks(0),
        ..Self::DEFAULT
    };

    pub const DEFAULT: Self = Self {
        min_step_interval: DEFAULT_MIN_STEP_INTERVAL,
        watchdog: DEFAULT_WATCHDOG,
        bus_settle: DEFAULT_BUS_SETTLE,
        start_hold: DEFAULT_START_HOLD,
    };
}

impl Default for Timings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Convert a duration into whole microseconds for `DelayNs::delay_us`.
pub(crate) fn as_delay_us(duration: Duration) -> u32 {
    u32::try_from(duration.as_micros()).unwrap_or(u32::MAX)
}
