//! Instruction word encoding.
//!
//! Every instruction is one 16-bit word:
//!
//! ```text
//!  15 | 14 13 12 | 11 ........ 0
//!  I  |  opcode  |   address
//! ```
//!
//! Opcodes 0-6 are memory-reference instructions. Opcode 7 selects a
//! register-reference instruction (I = 0) or an input/output instruction
//! (I = 1); in both cases exactly one of the low 12 bits names the operation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::input::{parse_number, InputError};

/// A raw instruction word with field accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstructionWord(pub u16);

impl InstructionWord {
    pub fn from_parts(indirect: bool, opcode: u8, address: u16) -> Self {
        let i = if indirect { 0x8000 } else { 0 };
        Self(i | (u16::from(opcode & 0x7) << 12) | (address & 0x0FFF))
    }

    /// Bit 15.
    pub fn indirect(self) -> bool {
        self.0 & 0x8000 != 0
    }

    /// Bits 14..12.
    pub fn opcode(self) -> u8 {
        ((self.0 >> 12) & 0x7) as u8
    }

    /// Bits 11..0.
    pub fn address(self) -> u16 {
        self.0 & 0x0FFF
    }

    pub fn raw(self) -> u16 {
        self.0
    }
}

impl From<u16> for InstructionWord {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

/// Memory-reference operations, by opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryOp {
    /// AC <- AC & M[EA]
    And,
    /// AC <- AC + M[EA], E <- carry
    Add,
    /// AC <- M[EA]
    Lda,
    /// M[EA] <- AC
    Sta,
    /// PC <- EA
    Bun,
    /// M[EA] <- PC, PC <- EA + 1
    Bsa,
    /// M[EA] <- M[EA] + 1, skip if zero
    Isz,
}

impl MemoryOp {
    pub const ALL: [MemoryOp; 7] = [
        MemoryOp::And,
        MemoryOp::Add,
        MemoryOp::Lda,
        MemoryOp::Sta,
        MemoryOp::Bun,
        MemoryOp::Bsa,
        MemoryOp::Isz,
    ];

    pub fn opcode(self) -> u8 {
        self as u8
    }

    pub fn from_opcode(opcode: u8) -> Option<Self> {
        Self::ALL.get(usize::from(opcode)).copied()
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            MemoryOp::And => "AND",
            MemoryOp::Add => "ADD",
            MemoryOp::Lda => "LDA",
            MemoryOp::Sta => "STA",
            MemoryOp::Bun => "BUN",
            MemoryOp::Bsa => "BSA",
            MemoryOp::Isz => "ISZ",
        }
    }
}

/// Register-reference operations (`0x7xxx`), by selector bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegisterOp {
    Cla,
    Cle,
    Cma,
    Cme,
    Cir,
    Cil,
    Inc,
    Spa,
    Sna,
    Sza,
    Sze,
    Hlt,
}

impl RegisterOp {
    pub const ALL: [RegisterOp; 12] = [
        RegisterOp::Cla,
        RegisterOp::Cle,
        RegisterOp::Cma,
        RegisterOp::Cme,
        RegisterOp::Cir,
        RegisterOp::Cil,
        RegisterOp::Inc,
        RegisterOp::Spa,
        RegisterOp::Sna,
        RegisterOp::Sza,
        RegisterOp::Sze,
        RegisterOp::Hlt,
    ];

    /// The selector bit in the address field; CLA is bit 11, HLT bit 0.
    pub fn selector(self) -> u16 {
        0x800 >> (self as u16)
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            RegisterOp::Cla => "CLA",
            RegisterOp::Cle => "CLE",
            RegisterOp::Cma => "CMA",
            RegisterOp::Cme => "CME",
            RegisterOp::Cir => "CIR",
            RegisterOp::Cil => "CIL",
            RegisterOp::Inc => "INC",
            RegisterOp::Spa => "SPA",
            RegisterOp::Sna => "SNA",
            RegisterOp::Sza => "SZA",
            RegisterOp::Sze => "SZE",
            RegisterOp::Hlt => "HLT",
        }
    }
}

/// Input/output operations (`0xFxxx`), by selector bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IoOp {
    Inp,
    Out,
    Ski,
    Sko,
    Ion,
    Iof,
}

impl IoOp {
    pub const ALL: [IoOp; 6] = [IoOp::Inp, IoOp::Out, IoOp::Ski, IoOp::Sko, IoOp::Ion, IoOp::Iof];

    /// The selector bit in the address field; INP is bit 11, IOF bit 6.
    pub fn selector(self) -> u16 {
        0x800 >> (self as u16)
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            IoOp::Inp => "INP",
            IoOp::Out => "OUT",
            IoOp::Ski => "SKI",
            IoOp::Sko => "SKO",
            IoOp::Ion => "ION",
            IoOp::Iof => "IOF",
        }
    }
}

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    Memory {
        op: MemoryOp,
        address: u16,
        indirect: bool,
    },
    Register(RegisterOp),
    Io(IoOp),
}

impl Instruction {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Memory { op, .. } => op.mnemonic(),
            Instruction::Register(op) => op.mnemonic(),
            Instruction::Io(op) => op.mnemonic(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Memory { op, address, indirect } => {
                write!(f, "{} 0x{:03X}", op.mnemonic(), address)?;
                if *indirect {
                    write!(f, " I")?;
                }
                Ok(())
            }
            other => f.write_str(other.mnemonic()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("register-reference word {0:#06X} does not select exactly one operation")]
    InvalidRegisterPattern(u16),

    #[error("input/output word {0:#06X} does not select exactly one operation")]
    InvalidIoPattern(u16),
}

/// Decode a word into an instruction.
pub fn decode(word: InstructionWord) -> Result<Instruction, DecodeError> {
    if let Some(op) = MemoryOp::from_opcode(word.opcode()) {
        return Ok(Instruction::Memory {
            op,
            address: word.address(),
            indirect: word.indirect(),
        });
    }

    let selector = word.address();
    if word.indirect() {
        IoOp::ALL
            .into_iter()
            .find(|op| op.selector() == selector)
            .map(Instruction::Io)
            .ok_or(DecodeError::InvalidIoPattern(word.raw()))
    } else {
        RegisterOp::ALL
            .into_iter()
            .find(|op| op.selector() == selector)
            .map(Instruction::Register)
            .ok_or(DecodeError::InvalidRegisterPattern(word.raw()))
    }
}

/// Encode an instruction back into a word.
pub fn encode(instr: &Instruction) -> InstructionWord {
    match *instr {
        Instruction::Memory { op, address, indirect } => {
            InstructionWord::from_parts(indirect, op.opcode(), address)
        }
        Instruction::Register(op) => InstructionWord(0x7000 | op.selector()),
        Instruction::Io(op) => InstructionWord(0xF000 | op.selector()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleError {
    #[error("empty instruction")]
    Empty,

    #[error("unknown mnemonic: {0}")]
    UnknownMnemonic(String),

    #[error("{0} needs an address operand")]
    MissingAddress(String),

    #[error("address {0:#X} does not fit in 12 bits")]
    AddressTooLarge(u64),

    #[error("unexpected operand: {0}")]
    UnexpectedOperand(String),

    #[error(transparent)]
    Number(#[from] InputError),
}

/// Parse one instruction written as `MNEMONIC [ADDRESS] [I]`.
pub fn parse_instruction(text: &str) -> Result<Instruction, AssembleError> {
    let mut tokens = text.split_whitespace();
    let mnemonic = tokens.next().ok_or(AssembleError::Empty)?.to_ascii_uppercase();

    if let Some(op) = MemoryOp::ALL.into_iter().find(|op| op.mnemonic() == mnemonic) {
        let operand = tokens
            .next()
            .ok_or_else(|| AssembleError::MissingAddress(mnemonic.clone()))?;
        let address = parse_number(operand)?;
        if address > 0x0FFF {
            return Err(AssembleError::AddressTooLarge(address));
        }
        let indirect = match tokens.next() {
            None => false,
            Some(t) if t.eq_ignore_ascii_case("I") => true,
            Some(t) => return Err(AssembleError::UnexpectedOperand(t.to_string())),
        };
        if let Some(extra) = tokens.next() {
            return Err(AssembleError::UnexpectedOperand(extra.to_string()));
        }
        return Ok(Instruction::Memory {
            op,
            address: address as u16,
            indirect,
        });
    }

    let instr = if let Some(op) = RegisterOp::ALL.into_iter().find(|op| op.mnemonic() == mnemonic) {
        Instruction::Register(op)
    } else if let Some(op) = IoOp::ALL.into_iter().find(|op| op.mnemonic() == mnemonic) {
        Instruction::Io(op)
    } else {
        return Err(AssembleError::UnknownMnemonic(mnemonic));
    };

    match tokens.next() {
        Some(extra) => Err(AssembleError::UnexpectedOperand(extra.to_string())),
        None => Ok(instr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields() {
        let w = InstructionWord(0xA123);
        assert!(w.indirect());
        assert_eq!(w.opcode(), 2);
        assert_eq!(w.address(), 0x123);
        assert_eq!(InstructionWord::from_parts(true, 2, 0x123), w);
    }

    #[test]
    fn test_decode_memory_reference() {
        assert_eq!(
            decode(InstructionWord(0x2004)),
            Ok(Instruction::Memory { op: MemoryOp::Lda, address: 0x004, indirect: false })
        );
        assert_eq!(
            decode(InstructionWord(0xE010)),
            Ok(Instruction::Memory { op: MemoryOp::Isz, address: 0x010, indirect: true })
        );
    }

    #[test]
    fn test_decode_register_and_io() {
        assert_eq!(decode(InstructionWord(0x7800)), Ok(Instruction::Register(RegisterOp::Cla)));
        assert_eq!(decode(InstructionWord(0x7001)), Ok(Instruction::Register(RegisterOp::Hlt)));
        assert_eq!(decode(InstructionWord(0xF800)), Ok(Instruction::Io(IoOp::Inp)));
        assert_eq!(decode(InstructionWord(0xF040)), Ok(Instruction::Io(IoOp::Iof)));
    }

    #[test]
    fn test_decode_rejects_bad_patterns() {
        assert_eq!(
            decode(InstructionWord(0x7003)),
            Err(DecodeError::InvalidRegisterPattern(0x7003))
        );
        assert_eq!(decode(InstructionWord(0xF001)), Err(DecodeError::InvalidIoPattern(0xF001)));
    }

    #[test]
    fn test_encode_decode_all_non_memory() {
        for op in RegisterOp::ALL {
            let instr = Instruction::Register(op);
            assert_eq!(decode(encode(&instr)), Ok(instr));
        }
        for op in IoOp::ALL {
            let instr = Instruction::Io(op);
            assert_eq!(decode(encode(&instr)), Ok(instr));
        }
    }

    #[test]
    fn test_parse_instruction() {
        assert_eq!(
            parse_instruction("lda 0x004 I"),
            Ok(Instruction::Memory { op: MemoryOp::Lda, address: 4, indirect: true })
        );
        assert_eq!(parse_instruction("HLT"), Ok(Instruction::Register(RegisterOp::Hlt)));
        assert_eq!(parse_instruction("ION"), Ok(Instruction::Io(IoOp::Ion)));
        assert_eq!(
            parse_instruction("ADD"),
            Err(AssembleError::MissingAddress("ADD".into()))
        );
        assert_eq!(
            parse_instruction("BUN 0x1000"),
            Err(AssembleError::AddressTooLarge(0x1000))
        );
        assert_eq!(
            parse_instruction("NOP"),
            Err(AssembleError::UnknownMnemonic("NOP".into()))
        );
        assert!(matches!(parse_instruction("STA zz"), Err(AssembleError::Number(_))));
    }

    #[test]
    fn test_display() {
        let instr = Instruction::Memory { op: MemoryOp::Sta, address: 0x1F, indirect: true };
        assert_eq!(instr.to_string(), "STA 0x01F I");
        assert_eq!(Instruction::Register(RegisterOp::Cir).to_string(), "CIR");
    }
}
