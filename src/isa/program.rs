//! Program image file format.
//!
//! A program is a sparse mapping from 12-bit address to 16-bit word. On disk
//! it is plain text:
//! - One `ADDRESS CONTENT` pair per line
//! - `CONTENT` is a number (`0x2004`, `8196`, `0b...`) or an instruction
//!   (`LDA 0x004 I`)
//! - Text after `;` is a comment
//! - Blank lines are ignored

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use thiserror::Error;

use crate::input::parse_number;
use crate::isa::word::{encode, parse_instruction};
use crate::unit::memory::BulkData;

/// Highest address a program may use.
pub const MAX_ADDRESS: u64 = 0x0FFF;
/// Largest word a program may hold.
pub const MAX_WORD: u64 = 0xFFFF;

/// A loaded program image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    words: BTreeMap<u16, u16>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the word at `address`, replacing any earlier one.
    pub fn insert(&mut self, address: u16, word: u16) {
        self.words.insert(address & 0x0FFF, word);
    }

    pub fn get(&self, address: u16) -> Option<u16> {
        self.words.get(&address).copied()
    }

    /// Words in address order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        self.words.iter().map(|(&a, &w)| (a, w))
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The payload for a memory bulk load.
    pub fn to_bulk_data(&self) -> BulkData {
        BulkData::Sparse(
            self.words
                .iter()
                .map(|(&a, &w)| (u64::from(a), u64::from(w)))
                .collect(),
        )
    }
}

/// Parse program text.
pub fn parse_program(source: &str) -> Result<Program, ProgramError> {
    let mut program = Program::new();

    for (index, raw) in source.lines().enumerate() {
        let line = index + 1;
        let code = raw.split(';').next().unwrap_or("").trim();
        if code.is_empty() {
            continue;
        }

        let (address_text, content) = match code.split_once(char::is_whitespace) {
            Some((a, c)) => (a, c.trim()),
            None => {
                return Err(ProgramError::Parse {
                    line,
                    message: "expected an address followed by a word".into(),
                })
            }
        };

        let address = parse_number(address_text.trim_end_matches(':')).map_err(|e| {
            ProgramError::Parse { line, message: format!("address: {}", e) }
        })?;
        if address > MAX_ADDRESS {
            return Err(ProgramError::Parse {
                line,
                message: format!("address {:#X} does not fit in 12 bits", address),
            });
        }

        let word = parse_content(content).map_err(|message| ProgramError::Parse { line, message })?;
        program.insert(address as u16, word);
    }

    Ok(program)
}

fn parse_content(content: &str) -> Result<u16, String> {
    let starts_numeric = content
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '$');

    if starts_numeric {
        let word = parse_number(content).map_err(|e| format!("word: {}", e))?;
        if word > MAX_WORD {
            return Err(format!("word {:#X} does not fit in 16 bits", word));
        }
        Ok(word as u16)
    } else {
        parse_instruction(content)
            .map(|instr| encode(&instr).raw())
            .map_err(|e| e.to_string())
    }
}

impl FromIterator<(u16, u16)> for Program {
    fn from_iter<I: IntoIterator<Item = (u16, u16)>>(iter: I) -> Self {
        let mut program = Program::new();
        for (address, word) in iter {
            program.insert(address, word);
        }
        program
    }
}

/// Load a program file from disk.
pub fn load_program<P: AsRef<Path>>(path: P) -> Result<Program, ProgramError> {
    let source = std::fs::read_to_string(path.as_ref())
        .map_err(|e| ProgramError::IoError(e.to_string()))?;
    parse_program(&source)
}

/// Save a program file to disk.
pub fn save_program<P: AsRef<Path>>(path: P, program: &Program) -> Result<(), ProgramError> {
    let mut file = std::fs::File::create(path.as_ref())
        .map_err(|e| ProgramError::IoError(e.to_string()))?;

    writeln!(file, "; basic computer program")
        .map_err(|e| ProgramError::IoError(e.to_string()))?;
    writeln!(file, "; {} words", program.len())
        .map_err(|e| ProgramError::IoError(e.to_string()))?;
    writeln!(file).map_err(|e| ProgramError::IoError(e.to_string()))?;

    for (address, word) in program.iter() {
        writeln!(
            file,
            "0x{:03X} 0x{:04X} ; {}",
            address,
            word,
            crate::isa::disasm::disassemble_word(word)
        )
        .map_err(|e| ProgramError::IoError(e.to_string()))?;
    }

    Ok(())
}

/// Errors that can occur while reading or writing program files.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
}
