//! Disassembler for LS-8 programs.
//!
//! Converts program bytes back to readable assembly.

use crate::cpu::decode::{decode, operand_count, Instruction};

/// Disassemble the instruction starting at `addr`.
///
/// Returns the text and the number of bytes consumed. Unknown opcodes and
/// truncated instructions consume a single byte and render as `???`.
pub fn disassemble_at(program: &[u8], addr: usize) -> (String, usize) {
    let Some(&byte) = program.get(addr) else {
        return ("???".to_string(), 1);
    };

    let Ok(opcode) = decode(byte) else {
        return (format!("??? {:#04X}", byte), 1);
    };

    let count = operand_count(byte);
    let Some(operand_bytes) = program.get(addr + 1..addr + 1 + count) else {
        return (format!("{} <truncated>", opcode), 1);
    };

    let mut operands = [0u8; 2];
    operands[..count].copy_from_slice(operand_bytes);
    let instr = Instruction::from_parts(opcode, operands);

    (instr.to_string(), 1 + count)
}

/// Disassemble a single instruction from the start of `bytes`.
pub fn disassemble_instruction(bytes: &[u8]) -> String {
    disassemble_at(bytes, 0).0
}

/// Disassemble a whole program.
pub fn disassemble(program: &[u8]) -> String {
    let mut output = String::new();
    output.push_str("; LS-8 Disassembly\n");
    output.push_str("; ----------------\n\n");

    let mut addr = 0;
    while addr < program.len() {
        let (line, len) = disassemble_at(program, addr);
        let end = (addr + len).min(program.len());
        let raw: Vec<String> = program[addr..end]
            .iter()
            .map(|b| format!("{:08b}", b))
            .collect();
        output.push_str(&format!("{:02X}: {:<16}; {}\n", addr, line, raw.join(" ")));
        addr = end;
    }

    output
}
