//! The 4-bit sequence counter that times the control steps.

use serde::{Deserialize, Serialize};

use super::{Register, RegisterEvent, RegisterName, RegisterSignal, RegisterSnapshot};
use crate::arith;
use crate::unit::{Outcome, Unit, SIGNAL_DURATION};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceCounterSnapshot {
    #[serde(flatten)]
    pub register: RegisterSnapshot,
    pub max_value: u16,
}

/// SC: accepts Load, Increment, Set and Clear.
#[derive(Debug, Clone)]
pub struct SequenceCounter {
    reg: Register,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::with_signal_duration(SIGNAL_DURATION)
    }

    pub fn with_signal_duration(duration: u64) -> Self {
        Self {
            reg: Register::with_signal_duration(RegisterName::Sc, duration),
        }
    }

    pub fn value(&self) -> u16 {
        self.reg.value()
    }

    pub fn max_value(&self) -> u16 {
        arith::width_mask(self.reg.bits()) as u16
    }

    pub fn load(&mut self, value: u64) -> Outcome {
        self.reg.load(value)
    }

    /// Advance to the next timing step, wrapping after `max_value`.
    pub fn increment(&mut self) -> Outcome {
        self.reg.increment()
    }

    /// `SC <- value`
    pub fn set(&mut self, value: u64) -> Outcome {
        let label = format!("SC <- {}", arith::mask(value, self.reg.bits()));
        self.reg.commit(value, RegisterSignal::Set, label)
    }

    pub fn clear(&mut self) -> Outcome {
        self.reg.clear()
    }
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl Unit for SequenceCounter {
    type Event = RegisterEvent;
    type Signal = RegisterSignal;
    type Snapshot = SequenceCounterSnapshot;

    fn dispatch(&mut self, event: RegisterEvent) -> Outcome {
        match event {
            RegisterEvent::Load { value } => self.load(value),
            RegisterEvent::Increment => self.increment(),
            RegisterEvent::Set { value } => self.set(value),
            RegisterEvent::Clear => self.clear(),
            other => self.reg.ignore(&other),
        }
    }

    fn advance(&mut self, elapsed: u64) {
        self.reg.tick(elapsed);
    }

    fn active_signal(&self) -> Option<RegisterSignal> {
        self.reg.signal()
    }

    fn snapshot(&self) -> SequenceCounterSnapshot {
        SequenceCounterSnapshot {
            register: self.reg.base_snapshot(),
            max_value: self.max_value(),
        }
    }
}
