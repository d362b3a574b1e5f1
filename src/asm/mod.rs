//! Program images, assembler and disassembler for LS-8 programs.
//!
//! This module provides:
//! - A loader for the binary-literal-per-line program image format
//! - A mnemonic assembler (text → program bytes)
//! - A disassembler (program bytes → readable text)

pub mod assembler;
pub mod disasm;
pub mod loader;

pub use assembler::{assemble, AssemblerError};
pub use disasm::disassemble;
pub use loader::{load_program_file, parse_program, read_source, render_image, save_image, LoadError};
