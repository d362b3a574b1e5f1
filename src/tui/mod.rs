//! TUI debugger for the LS-8 emulator.
//!
//! Provides an interactive terminal-based debugger with:
//! - Register and stack pointer view
//! - Hex memory view with PC/SP highlighting
//! - Step/run/breakpoint controls
//! - Disassembly and printed output views

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
