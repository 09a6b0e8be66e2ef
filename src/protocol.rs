//! Bus micro-operations
//!
//! The two-wire bus is open-drain: a line is either actively driven low or
//! released and pulled high. Each micro-operation below is a small state
//! machine whose `step` produces exactly one [`LineAction`] per call, so the
//! scheduler can interleave them with one GPIO side effect per tick.

/// One of the two bus lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Line {
    /// Clock (CLK)
    Clock,
    /// Data (DIO)
    Data,
}

/// Level a line is put into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    /// Actively driven low
    Low,
    /// Released, pulled high by the bus pull-up
    Released,
}

/// A single GPIO action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineAction {
    pub line: Line,
    pub level: Level,
}

impl LineAction {
    pub const CLOCK_LOW: Self = Self::new(Line::Clock, Level::Low);
    pub const CLOCK_RELEASE: Self = Self::new(Line::Clock, Level::Released);
    pub const DATA_LOW: Self = Self::new(Line::Data, Level::Low);
    pub const DATA_RELEASE: Self = Self::new(Line::Data, Level::Released);

    pub const fn new(line: Line, level: Level) -> Self {
        Self { line, level }
    }
}

/// Result of one micro-step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Action to perform on the bus
    pub action: LineAction,
    /// Whether the micro-operation finished with this step
    pub done: bool,
}

impl Step {
    const fn pending(action: LineAction) -> Self {
        Self {
            action,
            done: false,
        }
    }

    const fn done(action: LineAction) -> Self {
        Self { action, done: true }
    }
}

/// Shifts one byte out LSB-first, followed by an acknowledge clock.
///
/// The acknowledge slot is clocked but never sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteWriter {
    byte: u8,
    bits: u8,
    step: u8,
}

impl ByteWriter {
    pub const fn new(byte: u8) -> Self {
        Self {
            byte,
            bits: 0,
            step: 0,
        }
    }

    /// Bits shifted out so far (`0..=8`).
    pub const fn bits_sent(&self) -> u8 {
        self.bits
    }

    pub fn step(&mut self) -> Step {
        match self.step {
            0 => {
                self.step = 1;
                Step::pending(LineAction::CLOCK_LOW)
            }
            1 => {
                self.step = 2;
                if self.byte & 0x01 == 0 {
                    Step::pending(LineAction::DATA_LOW)
                } else {
                    Step::pending(LineAction::DATA_RELEASE)
                }
            }
            2 => {
                // Receiver samples on this rising edge
                self.byte >>= 1;
                self.bits += 1;
                self.step = if self.bits < 8 { 0 } else { 3 };
                Step::pending(LineAction::CLOCK_RELEASE)
            }
            3 => {
                self.step = 4;
                Step::pending(LineAction::CLOCK_LOW)
            }
            4 => {
                self.step = 5;
                Step::pending(LineAction::DATA_RELEASE)
            }
            5 => {
                self.step = 6;
                Step::pending(LineAction::CLOCK_RELEASE)
            }
            _ => {
                self.bits = 0;
                Step::done(LineAction::CLOCK_LOW)
            }
        }
    }
}

/// Start condition: data falls while clock is high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartCondition {
    step: u8,
}

impl StartCondition {
    pub const fn new() -> Self {
        Self { step: 0 }
    }

    pub fn step(&mut self) -> Step {
        match self.step {
            0 => {
                self.step = 1;
                Step::pending(LineAction::CLOCK_RELEASE)
            }
            1 => {
                self.step = 2;
                Step::pending(LineAction::DATA_RELEASE)
            }
            _ => Step::done(LineAction::DATA_LOW),
        }
    }
}

/// Stop condition: data rises while clock is high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StopCondition {
    step: u8,
}

impl StopCondition {
    pub const fn new() -> Self {
        Self { step: 0 }
    }

    pub fn step(&mut self) -> Step {
        match self.step {
            0 => {
                self.step = 1;
                Step::pending(LineAction::CLOCK_LOW)
            }
            1 => {
                self.step = 2;
                Step::pending(LineAction::DATA_LOW)
            }
            2 => {
                self.step = 3;
                Step::pending(LineAction::CLOCK_RELEASE)
            }
            _ => Step::done(LineAction::DATA_RELEASE),
        }
    }
}

/// The micro-operation currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicroOp {
    Write(ByteWriter),
    Start(StartCondition),
    Stop(StopCondition),
}

impl MicroOp {
    pub const fn write(byte: u8) -> Self {
        MicroOp::Write(ByteWriter::new(byte))
    }

    pub const fn start() -> Self {
        MicroOp::Start(StartCondition::new())
    }

    pub const fn stop() -> Self {
        MicroOp::Stop(StopCondition::new())
    }

    pub fn step(&mut self) -> Step {
        match self {
            MicroOp::Write(writer) => writer.step(),
            MicroOp::Start(start) => start.step(),
            MicroOp::Stop(stop) => stop.step(),
        }
    }
}
