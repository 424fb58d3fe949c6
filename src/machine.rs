//! One simulated machine: an owned instance of every unit.
//!
//! The machine routes events to units and aggregates their snapshots. It
//! does not sequence instructions; that belongs to whatever drives it.
//! Separate `Machine` values share nothing and can run side by side.

use serde::{Deserialize, Serialize};
use tracing::{event, Level};

use crate::config::SimConfig;
use crate::error::SimError;
use crate::isa::Program;
use crate::unit::bus::{Bus, BusEvent, BusSnapshot};
use crate::unit::io::{IoEvent, IoFlags, IoSnapshot};
use crate::unit::memory::{Memory, MemoryEvent, MemorySnapshot};
use crate::unit::register::{
    Accumulator, AccumulatorSnapshot, InstructionRegister, InstructionRegisterSnapshot,
    ProgramCounter, ProgramCounterSnapshot, Register, RegisterEvent, RegisterName,
    RegisterSnapshot, SequenceCounter, SequenceCounterSnapshot,
};
use crate::unit::{Outcome, Unit};

/// An event addressed to one unit of the machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "event", rename_all = "lowercase")]
pub enum MachineEvent {
    Ar(RegisterEvent),
    Pc(RegisterEvent),
    Dr(RegisterEvent),
    Ac(RegisterEvent),
    Ir(RegisterEvent),
    Tr(RegisterEvent),
    Sc(RegisterEvent),
    Memory(MemoryEvent),
    Bus(BusEvent),
    Io(IoEvent),
}

impl MachineEvent {
    /// Address a register event to `name`.
    pub fn register(name: RegisterName, event: RegisterEvent) -> Self {
        match name {
            RegisterName::Ar => MachineEvent::Ar(event),
            RegisterName::Pc => MachineEvent::Pc(event),
            RegisterName::Dr => MachineEvent::Dr(event),
            RegisterName::Ac => MachineEvent::Ac(event),
            RegisterName::Ir => MachineEvent::Ir(event),
            RegisterName::Tr => MachineEvent::Tr(event),
            RegisterName::Sc => MachineEvent::Sc(event),
        }
    }

    /// Parse one event from JSON.
    ///
    /// An unknown `unit` is rejected here. An unknown `op` for a known unit
    /// parses and is then ignored by that unit.
    pub fn from_json(text: &str) -> Result<Self, SimError> {
        serde_json::from_str(text).map_err(SimError::Event)
    }

    /// Parse a JSON array of events.
    pub fn list_from_json(text: &str) -> Result<Vec<Self>, SimError> {
        serde_json::from_str(text).map_err(SimError::Event)
    }
}

/// Every unit's snapshot at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineSnapshot {
    pub ar: RegisterSnapshot,
    pub pc: ProgramCounterSnapshot,
    pub dr: RegisterSnapshot,
    pub ac: AccumulatorSnapshot,
    pub ir: InstructionRegisterSnapshot,
    pub tr: RegisterSnapshot,
    pub sc: SequenceCounterSnapshot,
    pub memory: MemorySnapshot,
    pub bus: BusSnapshot,
    pub io: IoSnapshot,
}

#[derive(Debug, Clone)]
pub struct Machine {
    pub ar: Register,
    pub pc: ProgramCounter,
    pub dr: Register,
    pub ac: Accumulator,
    pub ir: InstructionRegister,
    pub tr: Register,
    pub sc: SequenceCounter,
    pub memory: Memory,
    pub bus: Bus,
    pub io: IoFlags,
    /// Simulated time elapsed since creation.
    now: u64,
}

impl Machine {
    /// Create a zeroed machine with default configuration.
    pub fn new() -> Self {
        Self::with_config(&SimConfig::default())
    }

    pub fn with_config(config: &SimConfig) -> Self {
        let d = config.signal_duration;
        Self {
            ar: Register::with_signal_duration(RegisterName::Ar, d),
            pc: ProgramCounter::with_signal_duration(d),
            dr: Register::with_signal_duration(RegisterName::Dr, d),
            ac: Accumulator::with_signal_duration(d),
            ir: InstructionRegister::with_signal_duration(d),
            tr: Register::with_signal_duration(RegisterName::Tr, d),
            sc: SequenceCounter::with_signal_duration(d),
            memory: Memory::with_signal_duration(d),
            bus: Bus::with_signal_duration(d),
            io: IoFlags::with_signal_duration(d),
            now: 0,
        }
    }

    /// Route an event to its unit.
    pub fn dispatch(&mut self, event: MachineEvent) -> Outcome {
        event!(Level::TRACE, now = self.now, "dispatch {:?}", event);
        match event {
            MachineEvent::Ar(e) => self.ar.dispatch(e),
            MachineEvent::Pc(e) => self.pc.dispatch(e),
            MachineEvent::Dr(e) => self.dr.dispatch(e),
            MachineEvent::Ac(e) => self.ac.dispatch(e),
            MachineEvent::Ir(e) => self.ir.dispatch(e),
            MachineEvent::Tr(e) => self.tr.dispatch(e),
            MachineEvent::Sc(e) => self.sc.dispatch(e),
            MachineEvent::Memory(e) => self.memory.dispatch(e),
            MachineEvent::Bus(e) => self.bus.dispatch(e),
            MachineEvent::Io(e) => self.io.dispatch(e),
        }
    }

    /// Let simulated time pass for every unit.
    pub fn advance(&mut self, elapsed: u64) {
        self.now = self.now.saturating_add(elapsed);
        self.ar.advance(elapsed);
        self.pc.advance(elapsed);
        self.dr.advance(elapsed);
        self.ac.advance(elapsed);
        self.ir.advance(elapsed);
        self.tr.advance(elapsed);
        self.sc.advance(elapsed);
        self.memory.advance(elapsed);
        self.bus.advance(elapsed);
        self.io.advance(elapsed);
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    /// Bulk-load a program image into memory.
    pub fn load_program(&mut self, program: &Program) -> Outcome {
        self.dispatch(MachineEvent::Memory(MemoryEvent::BulkLoad {
            data: program.to_bulk_data(),
        }))
    }

    /// Whether any unit still has a signal up.
    pub fn is_signaling(&self) -> bool {
        self.ar.active_signal().is_some()
            || self.pc.active_signal().is_some()
            || self.dr.active_signal().is_some()
            || self.ac.active_signal().is_some()
            || self.ir.active_signal().is_some()
            || self.tr.active_signal().is_some()
            || self.sc.active_signal().is_some()
            || self.memory.active_signal().is_some()
            || self.bus.active_signal().is_some()
            || self.io.active_signal().is_some()
    }

    pub fn snapshot(&self) -> MachineSnapshot {
        MachineSnapshot {
            ar: self.ar.snapshot(),
            pc: self.pc.snapshot(),
            dr: self.dr.snapshot(),
            ac: self.ac.snapshot(),
            ir: self.ir.snapshot(),
            tr: self.tr.snapshot(),
            sc: self.sc.snapshot(),
            memory: self.memory.snapshot(),
            bus: self.bus.snapshot(),
            io: self.io.snapshot(),
        }
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}
