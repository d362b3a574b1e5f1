//! Simple assembler for LS-8 programs.
//!
//! Syntax:
//! ```text
//! ; Comment (`#` works too)
//!     LDI R0, 8       ; Load immediate into R0
//!     LDI R1, 0x09    ; Hex and 0b binary literals are accepted
//!     MUL R0, R1      ; R0 := R0 * R1
//!     PRN R0          ; Print R0
//!     HLT             ; Halt
//!     DB 0b1010       ; Emit a raw byte
//! ```

use crate::cpu::decode::{encode, Instruction, Opcode};
use crate::cpu::{MEMORY_SIZE, REGISTER_COUNT};
use thiserror::Error;

/// Assemble source code to a program image.
pub fn assemble(source: &str) -> Result<Vec<u8>, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// The assembler state.
struct Assembler {
    /// Output bytes.
    output: Vec<u8>,
}

impl Assembler {
    fn new() -> Self {
        Self { output: Vec::new() }
    }

    fn assemble(&mut self, source: &str) -> Result<Vec<u8>, AssemblerError> {
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        if self.output.len() > MEMORY_SIZE {
            return Err(AssemblerError::ProgramTooLarge { size: self.output.len() });
        }

        Ok(std::mem::take(&mut self.output))
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Remove comments
        let line = match line.find(|c: char| c == ';' || c == '#') {
            Some(idx) => &line[..idx],
            None => line,
        };
        let line = line.trim();

        if line.is_empty() {
            return Ok(());
        }

        let (mnemonic, rest) = match line.split_once(char::is_whitespace) {
            Some((m, rest)) => (m, rest.trim()),
            None => (line, ""),
        };
        let operands: Vec<&str> = rest
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();

        if mnemonic.eq_ignore_ascii_case("DB") || mnemonic.eq_ignore_ascii_case("DATA") {
            let [value] = operands.as_slice() else {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: "DB requires exactly one value".into(),
                });
            };
            let byte = self.parse_value(value, line_num)?;
            self.output.push(byte);
            return Ok(());
        }

        let instr = self.parse_instruction(mnemonic, &operands, line_num)?;
        self.output.extend(encode(&instr));
        Ok(())
    }

    fn parse_instruction(&self, mnemonic: &str, operands: &[&str], line_num: usize)
        -> Result<Instruction, AssemblerError>
    {
        let opcode = Opcode::from_mnemonic(mnemonic).ok_or_else(|| {
            AssemblerError::UnknownMnemonic {
                line: line_num,
                mnemonic: mnemonic.to_uppercase(),
            }
        })?;

        if operands.len() != opcode.operand_count() {
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!(
                    "{} takes {} operand(s), found {}",
                    opcode,
                    opcode.operand_count(),
                    operands.len()
                ),
            });
        }

        let instr = match opcode {
            Opcode::Ldi => Instruction::Ldi {
                reg: self.parse_register(operands[0], line_num)?,
                value: self.parse_value(operands[1], line_num)?,
            },
            Opcode::Add => Instruction::Add {
                a: self.parse_register(operands[0], line_num)?,
                b: self.parse_register(operands[1], line_num)?,
            },
            Opcode::Mul => Instruction::Mul {
                a: self.parse_register(operands[0], line_num)?,
                b: self.parse_register(operands[1], line_num)?,
            },
            Opcode::Prn => Instruction::Prn { reg: self.parse_register(operands[0], line_num)? },
            Opcode::Push => Instruction::Push { reg: self.parse_register(operands[0], line_num)? },
            Opcode::Pop => Instruction::Pop { reg: self.parse_register(operands[0], line_num)? },
            Opcode::Hlt => Instruction::Hlt,
        };

        Ok(instr)
    }

    fn parse_register(&self, operand: &str, line_num: usize) -> Result<u8, AssemblerError> {
        let invalid = || AssemblerError::InvalidRegister {
            line: line_num,
            register: operand.to_string(),
        };

        let index = operand
            .strip_prefix(|c: char| c == 'R' || c == 'r')
            .ok_or_else(invalid)?
            .parse::<u8>()
            .map_err(|_| invalid())?;

        if index as usize >= REGISTER_COUNT {
            return Err(invalid());
        }
        Ok(index)
    }

    fn parse_value(&self, operand: &str, line_num: usize) -> Result<u8, AssemblerError> {
        let (digits, radix) = if let Some(hex) = operand.strip_prefix("0x").or_else(|| operand.strip_prefix("0X")) {
            (hex, 16)
        } else if let Some(bin) = operand.strip_prefix("0b").or_else(|| operand.strip_prefix("0B")) {
            (bin, 2)
        } else {
            (operand, 10)
        };

        let value = i64::from_str_radix(digits, radix).map_err(|_| AssemblerError::SyntaxError {
            line: line_num,
            message: format!("invalid number `{}`", operand),
        })?;

        u8::try_from(value).map_err(|_| AssemblerError::ValueOutOfRange { line: line_num, value })
    }
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("invalid register on line {line}: {register}")]
    InvalidRegister { line: usize, register: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: i64 },

    #[error("program size {size} exceeds memory")]
    ProgramTooLarge { size: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cpu;

    #[test]
    fn test_assemble_simple() {
        let source = r#"
            ; Print the number 8
            LDI R0,8
            PRN R0
            HLT
        "#;

        let result = assemble(source).unwrap();
        assert_eq!(result, vec![0b1000_0010, 0, 8, 0b0100_0111, 0, 0b0000_0001]);
    }

    #[test]
    fn test_assemble_and_run() {
        let source = r#"
            ldi r0, 5     # lower case works
            LDI R1, 0x06
            MUL R0, R1
            PRN R0
            HLT
        "#;

        let program = assemble(source).unwrap();
        let mut cpu = Cpu::new();
        cpu.load_program(&program).unwrap();
        let mut out = Vec::new();
        cpu.run_with(&mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "30\n");
    }

    #[test]
    fn test_assemble_data() {
        let result = assemble("DB 42\nDB 0xFF\nDB 0b101\n").unwrap();
        assert_eq!(result, vec![42, 255, 5]);
    }

    #[test]
    fn test_unknown_mnemonic() {
        let err = assemble("HLT\nJMP R0\n").unwrap_err();
        assert_eq!(err, AssemblerError::UnknownMnemonic { line: 2, mnemonic: "JMP".into() });
    }

    #[test]
    fn test_invalid_register() {
        let err = assemble("PRN R8").unwrap_err();
        assert!(matches!(err, AssemblerError::InvalidRegister { line: 1, .. }));

        let err = assemble("PUSH 3").unwrap_err();
        assert!(matches!(err, AssemblerError::InvalidRegister { line: 1, .. }));
    }

    #[test]
    fn test_operand_count_checked() {
        let err = assemble("LDI R0").unwrap_err();
        assert!(matches!(err, AssemblerError::SyntaxError { line: 1, .. }));
    }

    #[test]
    fn test_value_out_of_range() {
        let err = assemble("LDI R0, 256").unwrap_err();
        assert_eq!(err, AssemblerError::ValueOutOfRange { line: 1, value: 256 });
    }
}
