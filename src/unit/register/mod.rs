//! Register unit.
//!
//! The basic computer has seven registers sharing one load/clear/signal
//! protocol:
//! - AR: 12-bit address register
//! - PC: 12-bit program counter (see [`ProgramCounter`])
//! - DR: 16-bit data register
//! - AC: 16-bit accumulator (see [`Accumulator`])
//! - IR: 16-bit instruction register (see [`InstructionRegister`])
//! - TR: 16-bit temporary register
//! - SC: 4-bit sequence counter (see [`SequenceCounter`])
//!
//! [`Register`] is the shared core. It is used directly for AR, DR and TR,
//! and wrapped by the specialized registers.

mod accumulator;
mod instruction;
mod program_counter;
mod sequence;

pub use accumulator::{Accumulator, AccumulatorSnapshot};
pub use instruction::{InstructionRegister, InstructionRegisterSnapshot};
pub use program_counter::{NextSource, ProgramCounter, ProgramCounterSnapshot, UnknownNextSource};
pub use sequence::{SequenceCounter, SequenceCounterSnapshot};

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{event, Level};

use crate::arith;
use crate::unit::{Outcome, Pulse, Unit, SIGNAL_DURATION};

/// Named registers of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterName {
    Ar,
    Pc,
    Dr,
    Ac,
    Ir,
    Tr,
    Sc,
}

impl RegisterName {
    pub const ALL: [RegisterName; 7] = [
        RegisterName::Ar,
        RegisterName::Pc,
        RegisterName::Dr,
        RegisterName::Ac,
        RegisterName::Ir,
        RegisterName::Tr,
        RegisterName::Sc,
    ];

    /// Width of the register in bits.
    pub const fn bits(self) -> u32 {
        match self {
            RegisterName::Ar | RegisterName::Pc => 12,
            RegisterName::Dr | RegisterName::Ac | RegisterName::Ir | RegisterName::Tr => 16,
            RegisterName::Sc => 4,
        }
    }
}

impl fmt::Display for RegisterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RegisterName::Ar => "AR",
            RegisterName::Pc => "PC",
            RegisterName::Dr => "DR",
            RegisterName::Ac => "AC",
            RegisterName::Ir => "IR",
            RegisterName::Tr => "TR",
            RegisterName::Sc => "SC",
        })
    }
}

/// Events understood by the register family.
///
/// Not every register supports every event; see each register's
/// documentation. Unsupported events are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RegisterEvent {
    Load { value: u64 },
    Clear,
    Increment,
    /// Direct set (sequence counter).
    Set { value: u64 },
    Complement,
    And { operand: u64 },
    Or { operand: u64 },
    Xor { operand: u64 },
    Add { operand: u64 },
    ShiftLeft,
    ShiftRight,
    CircularShiftLeft { carry_in: bool },
    CircularShiftRight { carry_in: bool },
    /// Any tag this crate does not know about.
    #[serde(other)]
    Unknown,
}

/// Data path that fired on a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterSignal {
    Load,
    Clear,
    Increment,
    Set,
    Complement,
    And,
    Or,
    Xor,
    Add,
    ShiftLeft,
    ShiftRight,
    CircularShiftLeft,
    CircularShiftRight,
}

/// Plain-data view of a register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSnapshot {
    pub name: RegisterName,
    pub value: u16,
    pub bits: u32,
    pub last_operation: String,
    pub active_signal: Option<RegisterSignal>,
}

/// Fixed-width register core.
#[derive(Debug, Clone)]
pub struct Register {
    name: RegisterName,
    bits: u32,
    value: u16,
    last_operation: String,
    pulse: Pulse<RegisterSignal>,
}

impl Register {
    /// Create a zeroed register with the default signal duration.
    pub fn new(name: RegisterName) -> Self {
        Self::with_signal_duration(name, SIGNAL_DURATION)
    }

    pub fn with_signal_duration(name: RegisterName, duration: u64) -> Self {
        Self {
            name,
            bits: name.bits(),
            value: 0,
            last_operation: String::new(),
            pulse: Pulse::new(duration),
        }
    }

    pub fn name(&self) -> RegisterName {
        self.name
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn value(&self) -> u16 {
        self.value
    }

    pub fn last_operation(&self) -> &str {
        &self.last_operation
    }

    /// Format a value with as many hex digits as the register is wide.
    pub fn hex(&self, value: u64) -> String {
        hex_width(value, self.bits)
    }

    /// `R <- value`
    pub fn load(&mut self, value: u64) -> Outcome {
        let label = format!("{} <- {}", self.name, self.hex(arith::mask(value, self.bits)));
        self.commit(value, RegisterSignal::Load, label)
    }

    /// `R <- 0`
    pub fn clear(&mut self) -> Outcome {
        let label = format!("{} <- 0", self.name);
        self.commit(0, RegisterSignal::Clear, label)
    }

    /// `R <- R + 1`, wrapping at the register width.
    pub fn increment(&mut self) -> Outcome {
        let next = arith::increment(u64::from(self.value), self.bits).value;
        let label = format!("{} <- {} + 1", self.name, self.name);
        self.commit(next, RegisterSignal::Increment, label)
    }

    /// Store a masked value, record the operation and raise the signal.
    pub(crate) fn commit(&mut self, value: u64, signal: RegisterSignal, label: String) -> Outcome {
        // Widths never exceed 16 bits, so the masked value always fits.
        self.value = arith::mask(value, self.bits) as u16;
        event!(
            Level::DEBUG,
            register = %self.name,
            value = self.value,
            "{}",
            label
        );
        self.last_operation = label;
        self.pulse.fire(signal);
        Outcome::Accepted
    }

    pub(crate) fn ignore(&self, event: &RegisterEvent) -> Outcome {
        event!(Level::TRACE, register = %self.name, "ignoring unsupported event {:?}", event);
        Outcome::Ignored
    }

    pub(crate) fn tick(&mut self, elapsed: u64) {
        if self.pulse.advance(elapsed) {
            event!(Level::TRACE, register = %self.name, "signal dropped");
        }
    }

    pub(crate) fn signal(&self) -> Option<RegisterSignal> {
        self.pulse.active()
    }

    pub(crate) fn base_snapshot(&self) -> RegisterSnapshot {
        RegisterSnapshot {
            name: self.name,
            value: self.value,
            bits: self.bits,
            last_operation: self.last_operation.clone(),
            active_signal: self.pulse.active(),
        }
    }
}

/// Plain registers (AR, DR, TR) accept Load, Clear and Increment.
impl Unit for Register {
    type Event = RegisterEvent;
    type Signal = RegisterSignal;
    type Snapshot = RegisterSnapshot;

    fn dispatch(&mut self, event: RegisterEvent) -> Outcome {
        match event {
            RegisterEvent::Load { value } => self.load(value),
            RegisterEvent::Clear => self.clear(),
            RegisterEvent::Increment => self.increment(),
            other => self.ignore(&other),
        }
    }

    fn advance(&mut self, elapsed: u64) {
        self.tick(elapsed);
    }

    fn active_signal(&self) -> Option<RegisterSignal> {
        self.signal()
    }

    fn snapshot(&self) -> RegisterSnapshot {
        self.base_snapshot()
    }
}

/// `0x` followed by one hex digit per started nibble of `bits`.
pub fn hex_width(value: u64, bits: u32) -> String {
    let digits = bits.div_ceil(4).max(1) as usize;
    format!("0x{:0digits$X}", value, digits = digits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::Phase;
    use proptest::prelude::*;

    #[test]
    fn test_widths() {
        assert_eq!(Register::new(RegisterName::Ar).bits(), 12);
        assert_eq!(Register::new(RegisterName::Dr).bits(), 16);
        assert_eq!(Register::new(RegisterName::Sc).bits(), 4);
    }

    #[test]
    fn test_load_masks_to_width() {
        let mut ar = Register::new(RegisterName::Ar);
        assert_eq!(ar.load(0xABCD), Outcome::Accepted);
        assert_eq!(ar.value(), 0xBCD);
        assert_eq!(ar.last_operation(), "AR <- 0xBCD");
    }

    #[test]
    fn test_increment_wraps() {
        let mut ar = Register::new(RegisterName::Ar);
        ar.load(0xFFF);
        ar.increment();
        assert_eq!(ar.value(), 0);

        let mut dr = Register::new(RegisterName::Dr);
        dr.load(0xFFFF);
        dr.dispatch(RegisterEvent::Increment);
        assert_eq!(dr.value(), 0);
    }

    #[test]
    fn test_signal_lifecycle() {
        let mut tr = Register::new(RegisterName::Tr);
        assert_eq!(tr.phase(), Phase::Idle);

        tr.dispatch(RegisterEvent::Load { value: 0x1234 });
        assert_eq!(tr.active_signal(), Some(RegisterSignal::Load));
        let before = tr.snapshot();

        tr.advance(SIGNAL_DURATION);
        let after = tr.snapshot();
        assert_eq!(after.active_signal, None);
        assert_eq!(after.value, before.value);
        assert_eq!(after.last_operation, before.last_operation);
    }

    #[test]
    fn test_event_while_signaling_rearms() {
        let mut ar = Register::new(RegisterName::Ar);
        ar.dispatch(RegisterEvent::Load { value: 1 });
        ar.advance(150);
        ar.dispatch(RegisterEvent::Increment);
        assert_eq!(ar.value(), 2);
        ar.advance(150);
        assert_eq!(ar.active_signal(), Some(RegisterSignal::Increment));
        ar.advance(10);
        assert_eq!(ar.active_signal(), None);
    }

    #[test]
    fn test_unsupported_event_ignored() {
        let mut ar = Register::new(RegisterName::Ar);
        ar.load(0x00F);
        ar.advance(SIGNAL_DURATION);
        let before = ar.snapshot();

        assert_eq!(ar.dispatch(RegisterEvent::Complement), Outcome::Ignored);
        assert_eq!(ar.dispatch(RegisterEvent::Unknown), Outcome::Ignored);
        assert_eq!(ar.snapshot(), before);
    }

    #[test]
    fn test_unknown_tag_deserializes() {
        let ev: RegisterEvent = serde_json::from_str(r#"{"op":"rotate_sideways"}"#).unwrap();
        assert_eq!(ev, RegisterEvent::Unknown);

        let ev: RegisterEvent = serde_json::from_str(r#"{"op":"load","value":4660}"#).unwrap();
        assert_eq!(ev, RegisterEvent::Load { value: 0x1234 });
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut dr = Register::new(RegisterName::Dr);
        dr.load(0xBEEF);
        let snap = dr.snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        let back: RegisterSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn test_hex_width() {
        assert_eq!(hex_width(0xA, 4), "0xA");
        assert_eq!(hex_width(0xA, 12), "0x00A");
        assert_eq!(hex_width(0xA, 16), "0x000A");
    }

    proptest! {
        #[test]
        fn value_always_in_range(values in proptest::collection::vec(any::<u64>(), 1..20)) {
            for name in RegisterName::ALL {
                let mut r = Register::new(name);
                for &v in &values {
                    r.load(v);
                    prop_assert!(u64::from(r.value()) < (1u64 << r.bits()));
                    r.increment();
                    prop_assert!(u64::from(r.value()) < (1u64 << r.bits()));
                }
            }
        }
    }
}
