//! The instruction register and its decoded fields.

use serde::{Deserialize, Serialize};

use super::{Register, RegisterEvent, RegisterName, RegisterSignal, RegisterSnapshot};
use crate::unit::{Outcome, Unit, SIGNAL_DURATION};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionRegisterSnapshot {
    #[serde(flatten)]
    pub register: RegisterSnapshot,
    /// Bits 15..12, indirect bit included.
    pub opcode: u8,
    /// Bit 15.
    pub indirect: bool,
    /// Bits 11..0.
    pub address: u16,
}

/// IR: 16-bit register whose fields are re-decoded on every change.
///
/// Accepts Load, Clear and Increment.
#[derive(Debug, Clone)]
pub struct InstructionRegister {
    reg: Register,
    opcode: u8,
    indirect: bool,
    address: u16,
}

impl InstructionRegister {
    pub fn new() -> Self {
        Self::with_signal_duration(SIGNAL_DURATION)
    }

    pub fn with_signal_duration(duration: u64) -> Self {
        Self {
            reg: Register::with_signal_duration(RegisterName::Ir, duration),
            opcode: 0,
            indirect: false,
            address: 0,
        }
    }

    pub fn value(&self) -> u16 {
        self.reg.value()
    }

    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    pub fn indirect(&self) -> bool {
        self.indirect
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn load(&mut self, value: u64) -> Outcome {
        let outcome = self.reg.load(value);
        self.decode();
        outcome
    }

    pub fn clear(&mut self) -> Outcome {
        let outcome = self.reg.clear();
        self.decode();
        outcome
    }

    pub fn increment(&mut self) -> Outcome {
        let outcome = self.reg.increment();
        self.decode();
        outcome
    }

    fn decode(&mut self) {
        let v = self.reg.value();
        self.opcode = ((v >> 12) & 0xF) as u8;
        self.indirect = v & 0x8000 != 0;
        self.address = v & 0x0FFF;
    }
}

impl Default for InstructionRegister {
    fn default() -> Self {
        Self::new()
    }
}

impl Unit for InstructionRegister {
    type Event = RegisterEvent;
    type Signal = RegisterSignal;
    type Snapshot = InstructionRegisterSnapshot;

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

    fn snapshot(&self) -> InstructionRegisterSnapshot {
        InstructionRegisterSnapshot {
            register: self.reg.base_snapshot(),
            opcode: self.opcode,
            indirect: self.indirect,
            address: self.address,
        }
    }
}
