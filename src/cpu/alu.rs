//! Arithmetic-logic unit.
//!
//! Register-to-register arithmetic with 8-bit wraparound. The result always
//! lands in the destination register.

use crate::cpu::decode::Opcode;
use crate::cpu::registers::{Registers, RegisterError};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Operations the ALU can carry out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AluOp {
    Add,
    Mul,
}

impl AluOp {
    /// Combine two register values.
    #[inline]
    pub fn compute(self, a: u8, b: u8) -> u8 {
        match self {
            AluOp::Add => a.wrapping_add(b),
            AluOp::Mul => a.wrapping_mul(b),
        }
    }
}

impl TryFrom<Opcode> for AluOp {
    type Error = AluError;

    fn try_from(opcode: Opcode) -> Result<Self, Self::Error> {
        match opcode {
            Opcode::Add => Ok(AluOp::Add),
            Opcode::Mul => Ok(AluOp::Mul),
            other => Err(AluError::UnsupportedOp(other.byte())),
        }
    }
}

/// R[dest] := R[dest] op R[src]. Returns the stored result.
pub fn apply(regs: &mut Registers, op: AluOp, dest: u8, src: u8) -> Result<u8, AluError> {
    let a = regs.get(dest)?;
    let b = regs.get(src)?;
    let result = op.compute(a, b);
    regs.set(dest, result)?;
    Ok(result)
}

/// Errors raised by the ALU.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AluError {
    #[error("unsupported ALU operation for opcode {0:#010b}")]
    UnsupportedOp(u8),

    #[error(transparent)]
    Register(#[from] RegisterError),
}
