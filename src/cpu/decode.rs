//! Instruction decoder for the LS-8.
//!
//! Instruction bytes use a fixed bit-field layout:
//!
//! ```text
//! AABCDDDD
//! ││││└┴┴┴── instruction identifier
//! │││└────── sets PC (unused by this instruction set)
//! ││└─────── ALU operation
//! └┴──────── number of operand bytes that follow (0-2)
//! ```
//!
//! Decoding classifies the opcode byte only. The engine fetches the operand
//! bytes and assembles them into an [`Instruction`].

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Bit marking an ALU-bearing opcode.
const ALU_BIT: u8 = 0b0010_0000;

/// Number of operand bytes that follow an opcode byte, from its top two bits.
///
/// This is defined for every byte, recognised or not.
#[inline]
pub fn operand_count(byte: u8) -> usize {
    (byte >> 6) as usize
}

/// A recognised opcode byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    Hlt = 0b0000_0001,
    Push = 0b0100_0101,
    Pop = 0b0100_0110,
    Prn = 0b0100_0111,
    Ldi = 0b1000_0010,
    Add = 0b1010_0000,
    Mul = 0b1010_0010,
}

impl Opcode {
    /// Every opcode in the instruction set.
    pub const ALL: [Opcode; 7] = [
        Opcode::Hlt,
        Opcode::Push,
        Opcode::Pop,
        Opcode::Prn,
        Opcode::Ldi,
        Opcode::Add,
        Opcode::Mul,
    ];

    /// The raw opcode byte.
    #[inline]
    pub fn byte(self) -> u8 {
        self as u8
    }

    /// Assembly mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Hlt => "HLT",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Prn => "PRN",
            Opcode::Ldi => "LDI",
            Opcode::Add => "ADD",
            Opcode::Mul => "MUL",
        }
    }

    /// Look up an opcode by mnemonic (case-insensitive).
    pub fn from_mnemonic(name: &str) -> Option<Opcode> {
        Self::ALL
            .into_iter()
            .find(|op| op.mnemonic().eq_ignore_ascii_case(name))
    }

    pub fn operand_count(self) -> usize {
        operand_count(self.byte())
    }

    /// Whether executing this opcode writes a general-purpose register.
    pub fn writes_register(self) -> bool {
        matches!(self, Opcode::Ldi | Opcode::Add | Opcode::Mul | Opcode::Pop)
    }

    /// Whether this opcode is carried out by the ALU.
    pub fn is_alu(self) -> bool {
        self.byte() & ALU_BIT != 0
    }
}

impl TryFrom<u8> for Opcode {
    type Error = DecodeError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        decode(byte)
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Decoded LS-8 instruction with its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Load immediate: R[reg] := value
    Ldi { reg: u8, value: u8 },

    /// Print R[reg] in decimal
    Prn { reg: u8 },

    /// R[a] := R[a] * R[b] (wrapping)
    Mul { a: u8, b: u8 },

    /// R[a] := R[a] + R[b] (wrapping)
    Add { a: u8, b: u8 },

    /// SP -= 1; mem[SP] := R[reg]
    Push { reg: u8 },

    /// R[reg] := mem[SP]; SP += 1
    Pop { reg: u8 },

    /// Halt execution
    Hlt,
}

impl Instruction {
    /// Combine a decoded opcode with the operand bytes that followed it.
    ///
    /// Operands the opcode does not use are ignored.
    pub fn from_parts(opcode: Opcode, operands: [u8; 2]) -> Self {
        let [a, b] = operands;
        match opcode {
            Opcode::Ldi => Instruction::Ldi { reg: a, value: b },
            Opcode::Prn => Instruction::Prn { reg: a },
            Opcode::Mul => Instruction::Mul { a, b },
            Opcode::Add => Instruction::Add { a, b },
            Opcode::Push => Instruction::Push { reg: a },
            Opcode::Pop => Instruction::Pop { reg: a },
            Opcode::Hlt => Instruction::Hlt,
        }
    }

    /// The opcode this instruction was decoded from.
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Ldi { .. } => Opcode::Ldi,
            Instruction::Prn { .. } => Opcode::Prn,
            Instruction::Mul { .. } => Opcode::Mul,
            Instruction::Add { .. } => Opcode::Add,
            Instruction::Push { .. } => Opcode::Push,
            Instruction::Pop { .. } => Opcode::Pop,
            Instruction::Hlt => Opcode::Hlt,
        }
    }

    /// Encoded length in bytes (opcode plus operands).
    pub fn encoded_len(&self) -> usize {
        1 + self.opcode().operand_count()
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instruction::Ldi { reg, value } => write!(f, "LDI R{},{}", reg, value),
            Instruction::Prn { reg } => write!(f, "PRN R{}", reg),
            Instruction::Mul { a, b } => write!(f, "MUL R{},R{}", a, b),
            Instruction::Add { a, b } => write!(f, "ADD R{},R{}", a, b),
            Instruction::Push { reg } => write!(f, "PUSH R{}", reg),
            Instruction::Pop { reg } => write!(f, "POP R{}", reg),
            Instruction::Hlt => f.write_str("HLT"),
        }
    }
}

/// Classify an opcode byte.
pub fn decode(byte: u8) -> Result<Opcode, DecodeError> {
    let opcode = match byte {
        b if b == Opcode::Hlt as u8 => Opcode::Hlt,
        b if b == Opcode::Push as u8 => Opcode::Push,
        b if b == Opcode::Pop as u8 => Opcode::Pop,
        b if b == Opcode::Prn as u8 => Opcode::Prn,
        b if b == Opcode::Ldi as u8 => Opcode::Ldi,
        b if b == Opcode::Add as u8 => Opcode::Add,
        b if b == Opcode::Mul as u8 => Opcode::Mul,
        _ => return Err(DecodeError::UnknownOpcode(byte)),
    };

    Ok(opcode)
}

/// Encode an instruction to its opcode and operand bytes.
pub fn encode(instr: &Instruction) -> Vec<u8> {
    let op = instr.opcode().byte();
    match *instr {
        Instruction::Ldi { reg, value } => vec![op, reg, value],
        Instruction::Mul { a, b } | Instruction::Add { a, b } => vec![op, a, b],
        Instruction::Prn { reg } | Instruction::Push { reg } | Instruction::Pop { reg } => {
            vec![op, reg]
        }
        Instruction::Hlt => vec![op],
    }
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode {0:#010b}")]
    UnknownOpcode(u8),
}
