//! Disassembler for basic-computer programs.
//!
//! Converts memory words back to readable instructions.

use crate::isa::program::Program;
use crate::isa::word::{decode, InstructionWord};

/// Disassemble a single word to text.
///
/// Words that are not valid instructions are shown as data.
pub fn disassemble_word(word: u16) -> String {
    match decode(InstructionWord(word)) {
        Ok(instr) => instr.to_string(),
        Err(_) => format!(".WORD 0x{:04X}", word),
    }
}

/// Disassemble every word of a program, in address order.
pub fn disassemble(program: &Program) -> String {
    let mut output = String::new();
    output.push_str("; Basic computer disassembly\n");
    output.push_str("; --------------------------\n\n");

    for (address, word) in program.iter() {
        let line = disassemble_word(word);
        output.push_str(&format!("0x{:03X}: {:<16} ; 0x{:04X}\n", address, line, word));
    }

    output
}

/// Disassemble `(address, word)` pairs, e.g. from a memory dump.
pub fn disassemble_words(words: &[(usize, u16)]) -> String {
    words
        .iter()
        .map(|&(address, word)| format!("0x{:03X}: {}", address, disassemble_word(word)))
        .collect::<Vec<_>>()
        .join("\n")
}
