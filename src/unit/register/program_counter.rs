//! The program counter and its next-address selector.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{event, Level};

use super::{Register, RegisterEvent, RegisterName, RegisterSignal, RegisterSnapshot};
use crate::arith;
use crate::unit::{Outcome, Unit, SIGNAL_DURATION};

/// Where the control unit takes the next fetch address from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextSource {
    #[default]
    Increment,
    Branch,
    Return,
    Interrupt,
}

impl fmt::Display for NextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NextSource::Increment => "increment",
            NextSource::Branch => "branch",
            NextSource::Return => "return",
            NextSource::Interrupt => "interrupt",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown next source '{0}' (expected increment, branch, return or interrupt)")]
pub struct UnknownNextSource(pub String);

impl FromStr for NextSource {
    type Err = UnknownNextSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "increment" => Ok(NextSource::Increment),
            "branch" => Ok(NextSource::Branch),
            "return" => Ok(NextSource::Return),
            "interrupt" => Ok(NextSource::Interrupt),
            _ => Err(UnknownNextSource(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramCounterSnapshot {
    #[serde(flatten)]
    pub register: RegisterSnapshot,
    pub next_source: NextSource,
    pub branch_target: u16,
    pub return_address: u16,
    pub interrupt_vector: u16,
}

/// PC: 12-bit register plus next-address configuration.
///
/// Load, Clear and Increment follow the signal contract. The selector and
/// auxiliary addresses are plain configuration: setting them never raises a
/// signal and never touches `last_operation`.
#[derive(Debug, Clone)]
pub struct ProgramCounter {
    reg: Register,
    next_source: NextSource,
    branch_target: u16,
    return_address: u16,
    interrupt_vector: u16,
}

impl ProgramCounter {
    pub fn new() -> Self {
        Self::with_signal_duration(SIGNAL_DURATION)
    }

    pub fn with_signal_duration(duration: u64) -> Self {
        Self {
            reg: Register::with_signal_duration(RegisterName::Pc, duration),
            next_source: NextSource::default(),
            branch_target: 0,
            return_address: 0,
            interrupt_vector: 0,
        }
    }

    pub fn value(&self) -> u16 {
        self.reg.value()
    }

    pub fn load(&mut self, value: u64) -> Outcome {
        self.reg.load(value)
    }

    pub fn clear(&mut self) -> Outcome {
        self.reg.clear()
    }

    pub fn increment(&mut self) -> Outcome {
        self.reg.increment()
    }

    pub fn next_source(&self) -> NextSource {
        self.next_source
    }

    pub fn set_next_source(&mut self, source: NextSource) {
        event!(Level::TRACE, "PC next source = {}", source);
        self.next_source = source;
    }

    pub fn branch_target(&self) -> u16 {
        self.branch_target
    }

    pub fn set_branch_target(&mut self, address: u64) {
        self.branch_target = self.address(address);
    }

    pub fn return_address(&self) -> u16 {
        self.return_address
    }

    pub fn set_return_address(&mut self, address: u64) {
        self.return_address = self.address(address);
    }

    pub fn interrupt_vector(&self) -> u16 {
        self.interrupt_vector
    }

    pub fn set_interrupt_vector(&mut self, address: u64) {
        self.interrupt_vector = self.address(address);
    }

    /// The address the selected source would feed into PC.
    ///
    /// Pure query; the control unit decides when to load it.
    pub fn next_address(&self) -> u16 {
        match self.next_source {
            NextSource::Increment => {
                arith::increment(u64::from(self.reg.value()), self.reg.bits()).value as u16
            }
            NextSource::Branch => self.branch_target,
            NextSource::Return => self.return_address,
            NextSource::Interrupt => self.interrupt_vector,
        }
    }

    fn address(&self, value: u64) -> u16 {
        arith::mask(value, self.reg.bits()) as u16
    }
}

impl Default for ProgramCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl Unit for ProgramCounter {
    type Event = RegisterEvent;
    type Signal = RegisterSignal;
    type Snapshot = ProgramCounterSnapshot;

    fn dispatch(&mut self, event: RegisterEvent) -> Outcome {
        match event {
            RegisterEvent::Load { value } => self.load(value),
            RegisterEvent::Clear => self.clear(),
            RegisterEvent::Increment => self.increment(),
            other => self.reg.ignore(&other),
        }
    }

    fn advance(&mut self, elapsed: u64) {
        self.reg.tick(elapsed);
    }

    fn active_signal(&self) -> Option<RegisterSignal> {
        self.reg.signal()
    }

    fn snapshot(&self) -> ProgramCounterSnapshot {
        ProgramCounterSnapshot {
            register: self.reg.base_snapshot(),
            next_source: self.next_source,
            branch_target: self.branch_target,
            return_address: self.return_address,
            interrupt_vector: self.interrupt_vector,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_does_not_pulse() {
        let mut pc = ProgramCounter::new();
        pc.set_next_source(NextSource::Branch);
        pc.set_branch_target(0x1ABC);
        pc.set_return_address(0x010);
        pc.set_interrupt_vector(0x001);

        assert_eq!(pc.active_signal(), None);
        assert_eq!(pc.snapshot().register.last_operation, "");
        assert_eq!(pc.branch_target(), 0xABC);
    }

    #[test]
    fn test_next_address_per_source() {
        let mut pc = ProgramCounter::new();
        pc.load(0xFFF);
        pc.set_branch_target(0x200);
        pc.set_return_address(0x300);
        pc.set_interrupt_vector(0x001);

        assert_eq!(pc.next_address(), 0x000);
        pc.set_next_source(NextSource::Branch);
        assert_eq!(pc.next_address(), 0x200);
        pc.set_next_source(NextSource::Return);
        assert_eq!(pc.next_address(), 0x300);
        pc.set_next_source(NextSource::Interrupt);
        assert_eq!(pc.next_address(), 0x001);

        // Querying never moves the counter.
        assert_eq!(pc.value(), 0xFFF);
    }

    #[test]
    fn test_next_source_from_text() {
        assert_eq!("branch".parse::<NextSource>(), Ok(NextSource::Branch));
        assert_eq!(" Interrupt ".parse::<NextSource>(), Ok(NextSource::Interrupt));
        for source in [NextSource::Increment, NextSource::Return] {
            assert_eq!(source.to_string().parse::<NextSource>(), Ok(source));
        }
        assert_eq!(
            "jump".parse::<NextSource>(),
            Err(UnknownNextSource("jump".to_string()))
        );
    }

    #[test]
    fn test_increment_wraps_at_12_bits() {
        let mut pc = ProgramCounter::new();
        pc.dispatch(RegisterEvent::Load { value: 0xFFF });
        pc.dispatch(RegisterEvent::Increment);
        assert_eq!(pc.value(), 0);
        assert_eq!(pc.active_signal(), Some(RegisterSignal::Increment));
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut pc = ProgramCounter::new();
        pc.load(0x123);
        pc.set_next_source(NextSource::Return);
        pc.set_return_address(0x456);
        let snap = pc.snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"next_source\":\"return\""));
        let back: ProgramCounterSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }
}
