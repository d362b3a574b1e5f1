//! CPU emulation for the LS-8.
//!
//! This module implements the complete LS-8 machine:
//! - 255 bytes of memory shared by code, data and stack
//! - 8 general-purpose registers plus PC and SP
//! - a 7-instruction set with 0-2 operand bytes per instruction

pub mod memory;
pub mod registers;
pub mod decode;
pub mod alu;
pub mod execute;

pub use memory::{Memory, MemoryError, MEMORY_SIZE};
pub use registers::{Registers, RegisterError, REGISTER_COUNT, STACK_BASE};
pub use decode::{Instruction, Opcode, DecodeError};
pub use alu::{AluOp, AluError};
pub use execute::{Cpu, CpuError, CpuState};
