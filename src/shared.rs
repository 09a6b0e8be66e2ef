//! Interrupt-safe display holder
//!
//! Lets a periodic interrupt tick the display while thread context polls for
//! completion and arms new updates. The session lives behind a
//! `critical-section` mutex; the idle flag is mirrored into an atomic so the
//! common "is it done yet?" poll needs no lock.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::Mutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::Clock;
use crate::display::{Error, Tm1637};

/// A [`Tm1637`] shareable between interrupt and thread context.
///
/// Meant to live in a `static`:
///
/// ```ignore
/// static DISPLAY: SharedDisplay<Clk, Dio, Delay, EmbassyClock> = SharedDisplay::new();
///
/// // setup
/// DISPLAY.install(Tm1637::new(clk, dio, delay, EmbassyClock));
///
/// // timer interrupt
/// let _ = DISPLAY.tick();
///
/// // main loop
/// if DISPLAY.is_idle() {
///     DISPLAY.with(|display| display.show_number_dec(n, false, 4, 0));
/// }
/// ```
pub struct SharedDisplay<CLK, DIO, D, C> {
    inner: Mutex<RefCell<Option<Tm1637<CLK, DIO, D, C>>>>,
    idle: AtomicBool,
}

impl<CLK, DIO, D, C> SharedDisplay<CLK, DIO, D, C> {
    /// Create an empty holder.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
            idle: AtomicBool::new(true),
        }
    }
}

impl<CLK, DIO, D, C> Default for SharedDisplay<CLK, DIO, D, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<CLK, DIO, D, C, E> SharedDisplay<CLK, DIO, D, C>
where
    CLK: OutputPin<Error = E>,
    DIO: OutputPin<Error = E>,
    D: DelayNs,
    C: Clock,
{
    /// Store the session, returning the previous one if any.
    pub fn install(&self, display: Tm1637<CLK, DIO, D, C>) -> Option<Tm1637<CLK, DIO, D, C>> {
        critical_section::with(|cs| {
            self.idle.store(display.is_idle(), Ordering::Release);
            self.inner.borrow(cs).replace(Some(display))
        })
    }

    /// Take the session out again.
    pub fn take(&self) -> Option<Tm1637<CLK, DIO, D, C>> {
        critical_section::with(|cs| {
            self.idle.store(true, Ordering::Release);
            self.inner.borrow(cs).take()
        })
    }

    /// Run `f` with exclusive access to the session.
    ///
    /// This is how updates are armed. Returns `None` if no session is
    /// installed. Arming busy-waits for the bus settle and start hold delays,
    /// which then run inside the critical section.
    pub fn with<R>(&self, f: impl FnOnce(&mut Tm1637<CLK, DIO, D, C>) -> R) -> Option<R> {
        critical_section::with(|cs| {
            let mut slot = self.inner.borrow(cs).borrow_mut();
            let display = slot.as_mut()?;
            let result = f(display);
            self.idle.store(display.is_idle(), Ordering::Release);
            Some(result)
        })
    }

    /// Advance the session by one micro-step.
    ///
    /// Same contract as [`Tm1637::tick`]; an empty holder counts as idle.
    pub fn tick(&self) -> Result<bool, Error<E>> {
        critical_section::with(|cs| {
            let mut slot = self.inner.borrow(cs).borrow_mut();
            let Some(display) = slot.as_mut() else {
                return Ok(true);
            };
            let result = display.tick();
            // A failed tick drops the update, so the session is idle either way
            self.idle
                .store(!matches!(result, Ok(false)), Ordering::Release);
            result
        })
    }

    /// Whether no update is in flight. Never mutates the session.
    ///
    /// Lock-free while idle. While busy it briefly enters a critical section
    /// to check the watchdog deadline, so a stalled update reads as idle even
    /// if the ticking side has stopped.
    pub fn is_idle(&self) -> bool {
        if self.idle.load(Ordering::Acquire) {
            return true;
        }
        critical_section::with(|cs| {
            self.inner
                .borrow(cs)
                .borrow()
                .as_ref()
                .is_none_or(|display| display.is_idle())
        })
    }
}
