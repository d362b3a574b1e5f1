//! Diagnostic trace lines.
//!
//! Purely observational: reading past the end of memory shows `00` rather
//! than faulting.

use crate::cpu::Cpu;
use std::fmt::Write as _;

/// Render the machine state before the next fetch:
///
/// ```text
/// TRACE: PC | IR OP OP | R0 R1 R2 R3 R4 R5 R6 R7
/// ```
///
/// All fields are two-digit upper-case hex.
pub fn trace_line(cpu: &Cpu) -> String {
    let pc = cpu.regs.pc;
    let peek = |addr: usize| cpu.mem.peek(addr).unwrap_or(0);

    let mut line = format!(
        "TRACE: {:02X} | {:02X} {:02X} {:02X} |",
        pc,
        peek(pc),
        peek(pc + 1),
        peek(pc + 2)
    );

    for value in cpu.regs.general() {
        let _ = write!(line, " {:02X}", value);
    }

    line
}
