//! # Basic Computer Simulator
//!
//! Bit-exact simulators for the architectural units of a simple 16-bit
//! stored-program teaching computer: registers, a 4096-word memory, a shared
//! bus and the I/O/interrupt flags.
//!
//! Every unit is driven by events and exposes a plain-data snapshot. After
//! accepting an event a unit raises a transient signal naming the data path
//! that fired; the signal drops once a fixed amount of simulated time has
//! passed. Fetch/decode/execute sequencing is left to the caller.

pub mod arith;
pub mod unit;
pub mod isa;
pub mod machine;
pub mod autorun;
pub mod share;
pub mod config;
pub mod error;
pub mod input;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use arith::{mask, compute_flags, Flags};
pub use unit::{Unit, Outcome, Phase, SIGNAL_DURATION};
pub use unit::register::{Register, RegisterName, RegisterEvent, Accumulator, InstructionRegister, ProgramCounter, SequenceCounter, NextSource, UnknownNextSource};
pub use unit::memory::{Memory, MemoryEvent, BulkData, MEMORY_SIZE};
pub use unit::bus::{Bus, BusEvent, BusSource};
pub use unit::io::{IoFlags, IoEvent};
pub use isa::{Instruction, InstructionWord, Program, load_program, disassemble};
pub use machine::{Machine, MachineEvent, MachineSnapshot};
pub use autorun::AutoRun;
pub use config::SimConfig;
pub use error::SimError;
