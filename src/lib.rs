#![no_std]

pub mod codec;
pub mod display;
pub mod protocol;
pub mod shared;
pub mod timing;
pub mod transmission;

pub use codec::{encode_char, encode_digit};
pub use display::{Brightness, Error, Tm1637};
pub use shared::SharedDisplay;
pub use timing::Timings;
pub use transmission::Phase;

pub use embassy_time::{Duration, Instant};

/// Monotonic time source
///
/// Implement this trait to drive the session from a custom timer.
/// Microsecond resolution is needed for step pacing.
pub trait Clock {
    /// Current monotonic time
    fn now(&self) -> Instant;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// [`Clock`] backed by the embassy time driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
