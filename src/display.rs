//! Display session
//!
//! [`Tm1637`] owns the two bus pins and drives one update at a time. Every
//! `show_*`/`set_*` call arms a transmission; [`Tm1637::tick`] then advances
//! it by exactly one line action per call, without ever waiting.
//!
//! # Usage
//!
//! ```ignore
//! let mut display = Tm1637::new(clk, dio, delay, EmbassyClock);
//!
//! display.show_number_dec(42, false, 4, 0)?;
//! loop {
//!     // Cheap to call often; extra calls inside the step interval are no-ops
//!     if display.tick()? {
//!         break;
//!     }
//! }
//! ```

use embassy_time::Instant;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

#[cfg(feature = "esp32-log")]
use esp_println::println;

use crate::Clock;
use crate::codec::{self, BLANK, DIGIT_COUNT};
use crate::protocol::{Level, Line, LineAction};
use crate::timing::{Timings, as_delay_us};
use crate::transmission::{Phase, Transmission};

/// Error raised by a bus pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Setting a pin level failed; the in-flight update was dropped
    Pin(E),
}

/// Brightness level and display power.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Brightness(u8);

impl Brightness {
    /// Brightest setting, display on.
    pub const MAX: Self = Self(0x0f);

    /// `level` is masked to `0..=7`.
    pub const fn new(level: u8, on: bool) -> Self {
        Self((level & 0x07) | if on { 0x08 } else { 0x00 })
    }

    pub const fn level(self) -> u8 {
        self.0 & 0x07
    }

    pub const fn is_on(self) -> bool {
        self.0 & 0x08 != 0
    }

    /// Low nibble of the display control command.
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl Default for Brightness {
    fn default() -> Self {
        Self::MAX
    }
}

/// A 4-digit display on a two-wire bus.
pub struct Tm1637<CLK, DIO, D, C> {
    clk: CLK,
    dio: DIO,
    delay: D,
    clock: C,
    timings: Timings,

    brightness: Brightness,
    transmission: Transmission,

    last_step: Instant,
    armed_at: Instant,
}

impl<CLK, DIO, D, C, E> Tm1637<CLK, DIO, D, C>
where
    CLK: OutputPin<Error = E>,
    DIO: OutputPin<Error = E>,
    D: DelayNs,
    C: Clock,
{
    /// Create a session with default timings.
    ///
    /// Both pins must be configured as open-drain outputs with pull-ups:
    /// `set_high` releases the line, `set_low` drives it low.
    pub fn new(clk: CLK, dio: DIO, delay: D, clock: C) -> Self {
        Self::with_timings(clk, dio, delay, clock, Timings::default())
    }

    pub fn with_timings(clk: CLK, dio: DIO, delay: D, clock: C, timings: Timings) -> Self {
        Self {
            clk,
            dio,
            delay,
            clock,
            timings,
            brightness: Brightness::default(),
            transmission: Transmission::idle(),
            last_step: Instant::from_ticks(0),
            armed_at: Instant::from_ticks(0),
        }
    }

    /// Give back the pins, delay and clock.
    pub fn release(self) -> (CLK, DIO, D, C) {
        (self.clk, self.dio, self.delay, self.clock)
    }

    pub const fn timings(&self) -> &Timings {
        &self.timings
    }

    pub const fn brightness(&self) -> Brightness {
        self.brightness
    }

    /// Set brightness (`0..=7`) and power.
    ///
    /// Takes effect with the next update.
    pub fn set_brightness(&mut self, level: u8, on: bool) {
        self.brightness = Brightness::new(level, on);
    }

    /// Current phase, `None` when idle.
    pub const fn phase(&self) -> Option<Phase> {
        self.transmission.phase()
    }

    /// Segment bytes of the most recent update.
    pub fn segments(&self) -> &[u8] {
        self.transmission.segments()
    }

    /// Whether no update is in flight.
    ///
    /// An update that outlived the watchdog deadline counts as idle even
    /// before the next tick drops it. Never mutates the session.
    pub fn is_idle(&self) -> bool {
        self.transmission.is_idle() || self.watchdog_expired(self.clock.now())
    }

    /// Arm an update with raw segment bytes starting at `position`.
    ///
    /// At most four bytes are used, and never more than fit from
    /// `position` (masked to `0..=3`) to the last digit. Any update still in
    /// flight is replaced.
    pub fn set_segments(&mut self, segments: &[u8], position: u8) -> Result<(), Error<E>> {
        self.transmission
            .arm(segments, position, self.brightness.bits());

        #[cfg(feature = "esp32-log")]
        println!(
            "[Tm1637.set_segments] {:02x?} at {}",
            self.transmission.segments(),
            self.transmission.position()
        );

        // The session is fully armed before the bus is touched, so a tick
        // racing this call never sees a half-configured update
        if let Err(err) = self.precondition_bus() {
            self.transmission.abort();
            return Err(err);
        }

        let now = self.clock.now();
        self.last_step = now;
        self.armed_at = now;
        Ok(())
    }

    /// Blank all four digits.
    pub fn clear(&mut self) -> Result<(), Error<E>> {
        self.set_segments(&[BLANK; DIGIT_COUNT], 0)
    }

    /// Show a signed decimal number in a field of `length` digits.
    pub fn show_number_dec(
        &mut self,
        value: i32,
        leading_zero: bool,
        length: u8,
        position: u8,
    ) -> Result<(), Error<E>> {
        self.show_number_dec_with_dots(value, 0, leading_zero, length, position)
    }

    /// Show a signed decimal number with decimal points.
    ///
    /// Bit 7 of `dots` lights the point of the first digit of the field,
    /// bit 6 the second and so on.
    pub fn show_number_dec_with_dots(
        &mut self,
        value: i32,
        dots: u8,
        leading_zero: bool,
        length: u8,
        position: u8,
    ) -> Result<(), Error<E>> {
        let mut digits = codec::format_decimal(value, leading_zero, length);
        codec::apply_dots(dots, &mut digits);
        self.set_field(&digits, length, position)
    }

    /// Show an unsigned hexadecimal number with decimal points.
    pub fn show_number_hex_with_dots(
        &mut self,
        value: u16,
        dots: u8,
        leading_zero: bool,
        length: u8,
        position: u8,
    ) -> Result<(), Error<E>> {
        let mut digits = codec::format_hex(value, leading_zero, length);
        codec::apply_dots(dots, &mut digits);
        self.set_field(&digits, length, position)
    }

    /// Show text from `position` to the last digit.
    ///
    /// Unsupported characters render blank, as do positions past the end
    /// of `text`.
    pub fn display_text(&mut self, text: &str, position: u8) -> Result<(), Error<E>> {
        let position = position & 0x03;
        let mut segments = [BLANK; DIGIT_COUNT];
        let room = DIGIT_COUNT - usize::from(position);
        for (segment, c) in segments[..room].iter_mut().zip(text.chars()) {
            *segment = codec::encode_char(c);
        }
        self.set_segments(&segments[..room], position)
    }

    /// Show a character followed by a scaled three digit number.
    ///
    /// See [`codec::char_and_number`] for the scaling rules.
    pub fn display_char_and_number(&mut self, c: char, number: u32) -> Result<(), Error<E>> {
        self.set_segments(&codec::char_and_number(c, number), 0)
    }

    /// Advance the current update by one micro-step.
    ///
    /// Returns `Ok(true)` when the session is idle after this call, either
    /// because nothing was pending or because the update just finished (or
    /// was dropped by the watchdog). Calls closer together than the minimum
    /// step interval return `Ok(false)` without touching anything.
    pub fn tick(&mut self) -> Result<bool, Error<E>> {
        if self.transmission.is_idle() {
            return Ok(true);
        }

        let now = self.clock.now();
        if self.watchdog_expired(now) {
            #[cfg(feature = "esp32-log")]
            println!(
                "[Tm1637.tick] watchdog expired in phase {:?}",
                self.transmission.phase()
            );
            self.transmission.abort();
            self.release_bus()?;
            return Ok(true);
        }

        let interval = self.timings.min_step_interval;
        if interval.as_ticks() > 0 && now.saturating_duration_since(self.last_step) < interval {
            return Ok(false);
        }
        self.last_step = now;

        if let Some(action) = self.transmission.advance() {
            if let Err(err) = self.apply(action) {
                #[cfg(feature = "esp32-log")]
                println!("[Tm1637.tick] pin error, dropping update");
                self.transmission.abort();
                return Err(err);
            }
        }

        Ok(self.transmission.is_idle())
    }

    /// Tick until the current update is done.
    ///
    /// Busy-waits the minimum step interval between ticks, so this blocks
    /// for the length of a whole update (bounded by the watchdog).
    pub fn flush(&mut self) -> Result<(), Error<E>> {
        let pause = as_delay_us(self.timings.min_step_interval);
        while !self.tick()? {
            self.delay.delay_us(pause);
        }
        Ok(())
    }

    /// Arm a formatted field; digits past `length` are dropped.
    fn set_field(
        &mut self,
        digits: &[u8; DIGIT_COUNT],
        length: u8,
        position: u8,
    ) -> Result<(), Error<E>> {
        let length = codec::clamp_length(length);
        self.set_segments(&digits[..length], position)
    }

    fn watchdog_expired(&self, now: Instant) -> bool {
        !self.transmission.is_idle()
            && now.saturating_duration_since(self.armed_at) > self.timings.watchdog
    }

    /// Release the bus, let it settle, then signal start.
    fn precondition_bus(&mut self) -> Result<(), Error<E>> {
        self.apply(LineAction::DATA_RELEASE)?;
        self.apply(LineAction::CLOCK_RELEASE)?;
        self.delay.delay_us(as_delay_us(self.timings.bus_settle));

        self.apply(LineAction::DATA_LOW)?;
        self.delay.delay_us(as_delay_us(self.timings.start_hold));
        Ok(())
    }

    fn release_bus(&mut self) -> Result<(), Error<E>> {
        self.apply(LineAction::CLOCK_RELEASE)?;
        self.apply(LineAction::DATA_RELEASE)
    }

    fn apply(&mut self, action: LineAction) -> Result<(), Error<E>> {
        let result = match (action.line, action.level) {
            (Line::Clock, Level::Low) => self.clk.set_low(),
            (Line::Clock, Level::Released) => self.clk.set_high(),
            (Line::Data, Level::Low) => self.dio.set_low(),
            (Line::Data, Level::Released) => self.dio.set_high(),
        };
        result.map_err(Error::Pin)
    }
}
