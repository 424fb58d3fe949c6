//! Instruction set support.
//!
//! This module provides:
//! - Instruction word encoding/decoding (bit 15 indirect, 14..12 opcode,
//!   11..0 address) and single-line instruction parsing
//! - A disassembler (words -> readable text)
//! - The program image file format consumed by memory bulk loads

pub mod word;
pub mod disasm;
pub mod program;

pub use disasm::{disassemble, disassemble_word};
pub use program::{load_program, parse_program, save_program, Program, ProgramError};
pub use word::{decode, encode, parse_instruction, Instruction, InstructionWord};
