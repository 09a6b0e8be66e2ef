//! Transmission scheduling
//!
//! One display update is a fixed sequence of phases:
//!
//! ```text
//! [start] mode  stop | start address data.. stop | start control stop
//! ```
//!
//! The leading start condition is generated synchronously when the update is
//! armed, everything after it is advanced one micro-step per call to
//! [`Transmission::advance`]. This type never touches GPIO; it only tells the
//! caller which line action comes next.

use heapless::Vec;

use crate::codec::DIGIT_COUNT;
use crate::protocol::{LineAction, MicroOp};

/// Data command: write to display registers, auto-increment address.
pub const CMD_DATA_WRITE: u8 = 0x40;
/// Address command, OR-ed with the start position.
pub const CMD_ADDRESS: u8 = 0xC0;
/// Display control command, OR-ed with the brightness bits.
pub const CMD_DISPLAY_CONTROL: u8 = 0x80;

/// Phase of an armed transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Phase {
    /// Write the data command byte
    ModeCommand = 0,
    /// Stop after the data command
    ModeStop = 1,
    /// Start before the address command
    AddressStart = 2,
    /// Write the address command byte
    AddressCommand = 3,
    /// Write segment bytes, one per digit
    Data = 4,
    /// Stop after the segment bytes
    DataStop = 5,
    /// Start before the display control command
    ControlStart = 6,
    /// Write the display control byte
    ControlCommand = 7,
    /// Final stop, the bus is idle afterwards
    FinalStop = 8,
}

impl Phase {
    /// Index of the phase in the update sequence.
    pub const fn index(self) -> u8 {
        self as u8
    }
}

/// State of the update being shifted out.
#[derive(Debug, Clone)]
pub struct Transmission {
    phase: Option<Phase>,
    op: MicroOp,
    segments: Vec<u8, DIGIT_COUNT>,
    position: u8,
    current: usize,
    control: u8,
}

impl Default for Transmission {
    fn default() -> Self {
        Self::idle()
    }
}

impl Transmission {
    /// A transmission with nothing pending.
    pub const fn idle() -> Self {
        Self {
            phase: None,
            op: MicroOp::write(CMD_DATA_WRITE),
            segments: Vec::new(),
            position: 0,
            current: 0,
            control: CMD_DISPLAY_CONTROL,
        }
    }

    /// Queue a new update.
    ///
    /// `position` is masked to `0..=3` and the segment data is truncated so
    /// that it never runs past the last digit. `brightness` holds the low
    /// nibble of the display control command.
    pub fn arm(&mut self, segments: &[u8], position: u8, brightness: u8) {
        let position = position & 0x03;
        let room = DIGIT_COUNT - usize::from(position);
        let length = segments.len().min(room);

        self.segments.clear();
        // Cannot overflow, length <= DIGIT_COUNT
        let _ = self.segments.extend_from_slice(&segments[..length]);
        self.position = position;
        self.current = 0;
        self.control = CMD_DISPLAY_CONTROL | (brightness & 0x0f);
        self.op = MicroOp::write(CMD_DATA_WRITE);
        self.phase = Some(Phase::ModeCommand);
    }

    /// Drop whatever is in flight.
    pub fn abort(&mut self) {
        self.phase = None;
    }

    pub const fn is_idle(&self) -> bool {
        self.phase.is_none()
    }

    /// Current phase, `None` when idle.
    pub const fn phase(&self) -> Option<Phase> {
        self.phase
    }

    /// Segment bytes of the armed update.
    pub fn segments(&self) -> &[u8] {
        &self.segments
    }

    /// Start position of the armed update.
    pub const fn position(&self) -> u8 {
        self.position
    }

    /// Advance by one micro-step.
    ///
    /// Returns the line action to perform, or `None` if nothing is pending.
    pub fn advance(&mut self) -> Option<LineAction> {
        let phase = self.phase?;
        let step = self.op.step();
        if step.done {
            self.finish(phase);
        }
        Some(step.action)
    }

    /// Move on after the micro-operation of `phase` completed.
    fn finish(&mut self, phase: Phase) {
        match phase {
            Phase::ModeCommand => self.enter(Phase::ModeStop, MicroOp::stop()),
            Phase::ModeStop => self.enter(Phase::AddressStart, MicroOp::start()),
            Phase::AddressStart => {
                let address = CMD_ADDRESS | (self.position & 0x03);
                self.enter(Phase::AddressCommand, MicroOp::write(address));
            }
            Phase::AddressCommand => {
                self.current = 0;
                self.next_segment_or_stop();
            }
            Phase::Data => {
                self.current += 1;
                self.next_segment_or_stop();
            }
            Phase::DataStop => self.enter(Phase::ControlStart, MicroOp::start()),
            Phase::ControlStart => {
                self.enter(Phase::ControlCommand, MicroOp::write(self.control));
            }
            Phase::ControlCommand => self.enter(Phase::FinalStop, MicroOp::stop()),
            Phase::FinalStop => self.phase = None,
        }
    }

    fn next_segment_or_stop(&mut self) {
        match self.segments.get(self.current) {
            Some(&segment) => self.enter(Phase::Data, MicroOp::write(segment)),
            None => self.enter(Phase::DataStop, MicroOp::stop()),
        }
    }

    fn enter(&mut self, phase: Phase, op: MicroOp) {
        self.phase = Some(phase);
        self.op = op;
    }
}
