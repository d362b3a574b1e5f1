//! LS-8 CPU registers.
//!
//! The LS-8 has:
//! - R0..R7: eight 8-bit general-purpose registers
//! - PC: program counter (address of the next instruction byte)
//! - SP: stack pointer (address of the current top of stack)

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Number of general-purpose registers.
pub const REGISTER_COUNT: usize = 8;

/// Initial value of the stack pointer.
///
/// The stack grows downward from here into the same memory that holds the
/// program, so a deep stack will overwrite low addresses.
pub const STACK_BASE: usize = 6;

/// The LS-8 register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// R0..R7
    gpr: [u8; REGISTER_COUNT],

    /// Program counter
    pub pc: usize,

    /// Stack pointer
    pub sp: usize,
}

impl Registers {
    /// Create a new register file: all registers zero, SP at [`STACK_BASE`].
    pub fn new() -> Self {
        Self {
            gpr: [0; REGISTER_COUNT],
            pc: 0,
            sp: STACK_BASE,
        }
    }

    /// Reset to the power-on state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Read a general-purpose register.
    #[inline]
    pub fn get(&self, index: u8) -> Result<u8, RegisterError> {
        self.gpr
            .get(index as usize)
            .copied()
            .ok_or(RegisterError::InvalidRegister(index))
    }

    /// Write a general-purpose register.
    #[inline]
    pub fn set(&mut self, index: u8, value: u8) -> Result<(), RegisterError> {
        let slot = self.gpr
            .get_mut(index as usize)
            .ok_or(RegisterError::InvalidRegister(index))?;
        *slot = value;
        Ok(())
    }

    /// Snapshot of R0..R7.
    pub fn general(&self) -> [u8; REGISTER_COUNT] {
        self.gpr
    }

    /// Move the program counter past an instruction of `len` bytes.
    /// Returns the old value.
    pub fn advance_pc(&mut self, len: usize) -> usize {
        let old = self.pc;
        self.pc += len;
        old
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors from register file access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("invalid register R{0} (valid: R0-R7)")]
    InvalidRegister(u8),
}
