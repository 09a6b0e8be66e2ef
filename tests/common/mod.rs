#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};
use tm1637_nonblocking::protocol::{Level, Line, LineAction};
use tm1637_nonblocking::{Clock, Instant, Timings, Tm1637};

pub type TestDisplay = Tm1637<TestPin, TestPin, TestDelay, TestClock>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinFault;

impl embedded_hal::digital::Error for PinFault {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Shared log of every line action, plus a switch to make pins fail.
#[derive(Clone, Default)]
pub struct Bus {
    log: Rc<RefCell<Vec<LineAction>>>,
    fail: Rc<Cell<bool>>,
}

impl Bus {
    pub fn actions(&self) -> Vec<LineAction> {
        self.log.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.log.borrow().len()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.set(fail);
    }
}

pub struct TestPin {
    line: Line,
    bus: Bus,
}

impl TestPin {
    fn record(&self, level: Level) -> Result<(), PinFault> {
        if self.bus.fail.get() {
            return Err(PinFault);
        }
        self.bus
            .log
            .borrow_mut()
            .push(LineAction::new(self.line, level));
        Ok(())
    }
}

impl ErrorType for TestPin {
    type Error = PinFault;
}

impl OutputPin for TestPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.record(Level::Low)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.record(Level::Released)
    }
}

/// Manually advanced clock.
#[derive(Clone, Default)]
pub struct TestClock {
    micros: Rc<Cell<u64>>,
}

impl TestClock {
    pub fn advance_us(&self, us: u64) {
        self.micros.set(self.micros.get() + us);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance_us(ms * 1_000);
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        Instant::from_micros(self.micros.get())
    }
}

/// Busy-wait that just moves the test clock forward.
pub struct TestDelay {
    clock: TestClock,
}

impl DelayNs for TestDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.clock.advance_us(u64::from(ns.div_ceil(1_000)));
    }

    fn delay_us(&mut self, us: u32) {
        self.clock.advance_us(u64::from(us));
    }
}

pub struct Rig {
    pub bus: Bus,
    pub clock: TestClock,
}

pub fn display() -> (TestDisplay, Rig) {
    display_with(Timings::default())
}

pub fn display_with(timings: Timings) -> (TestDisplay, Rig) {
    let bus = Bus::default();
    let clock = TestClock::default();
    let clk = TestPin {
        line: Line::Clock,
        bus: bus.clone(),
    };
    let dio = TestPin {
        line: Line::Data,
        bus: bus.clone(),
    };
    let delay = TestDelay {
        clock: clock.clone(),
    };
    let display = Tm1637::with_timings(clk, dio, delay, clock.clone(), timings);
    (display, Rig { bus, clock })
}

/// Tick with the default step interval between calls until idle.
///
/// Returns the number of ticks, including the one that reported idle.
pub fn run_to_idle(display: &mut TestDisplay, rig: &Rig) -> usize {
    for count in 1..=10_000 {
        rig.clock.advance_us(100);
        if display.tick().expect("tick failed") {
            return count;
        }
    }
    panic!("transmission never finished");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    Start,
    Stop,
    Byte(u8),
}

/// Decode recorded line actions into bus events.
///
/// Both lines start released. Every rising clock edge samples a bit; nine
/// samples (eight data bits plus the acknowledge slot) make a byte. Start and
/// stop conditions discard any partial byte.
pub fn decode(actions: &[LineAction]) -> Vec<BusEvent> {
    let mut events = Vec::new();
    let mut clock_high = true;
    let mut data_high = true;
    let mut bits: Vec<bool> = Vec::new();

    for action in actions {
        let high = action.level == Level::Released;
        match action.line {
            Line::Clock => {
                if high && !clock_high {
                    bits.push(data_high);
                    if bits.len() == 9 {
                        let byte = bits[..8]
                            .iter()
                            .enumerate()
                            .fold(0u8, |acc, (i, bit)| acc | (u8::from(*bit) << i));
                        events.push(BusEvent::Byte(byte));
                        bits.clear();
                    }
                }
                clock_high = high;
            }
            Line::Data => {
                if clock_high && data_high && !high {
                    events.push(BusEvent::Start);
                    bits.clear();
                } else if clock_high && !data_high && high {
                    events.push(BusEvent::Stop);
                    bits.clear();
                }
                data_high = high;
            }
        }
    }
    events
}
