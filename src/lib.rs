//! # LS-8 Emulator
//!
//! An emulator for the LS-8, a small 8-bit register machine.
//!
//! The machine has 255 bytes of memory shared by program, data and stack,
//! eight byte-sized registers, and a seven-instruction set whose opcode byte
//! encodes its own operand count in the top two bits.

pub mod cpu;
pub mod asm;
pub mod trace;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use cpu::{Cpu, CpuState, CpuError, Memory, Registers, Instruction, Opcode};
pub use asm::{assemble, disassemble, parse_program, load_program_file, render_image, AssemblerError, LoadError};
pub use trace::trace_line;

#[cfg(feature = "tui")]
pub use tui::run_debugger;
