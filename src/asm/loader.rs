//! Program image format for LS-8 programs.
//!
//! An image is plain text:
//! - One byte per line, written as a base-2 literal (`10000010`)
//! - Anything after `#` on a line is a comment
//! - Lines that are empty once the comment is stripped are skipped and
//!   do not take up an address
//!
//! Bytes are placed at consecutive addresses starting from 0.

use crate::cpu::decode::{decode, operand_count};
use crate::cpu::MEMORY_SIZE;
use log::debug;
use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::Path;
use thiserror::Error;

/// Parse a program image into the bytes it describes.
pub fn parse_program(source: &str) -> Result<Vec<u8>, LoadError> {
    let mut program = Vec::new();

    for (line_num, line) in source.lines().enumerate() {
        let code = match line.split_once('#') {
            Some((code, _comment)) => code,
            None => line,
        };
        let literal = code.trim();

        if literal.is_empty() {
            continue;
        }

        let value = u32::from_str_radix(literal, 2).map_err(|e| LoadError::Parse {
            line: line_num + 1,
            message: format!("invalid binary literal `{}`: {}", literal, e),
        })?;

        let byte = u8::try_from(value).map_err(|_| LoadError::ValueOutOfRange {
            line: line_num + 1,
            value,
        })?;

        program.push(byte);
    }

    if program.len() > MEMORY_SIZE {
        return Err(LoadError::TooLarge {
            size: program.len(),
            available: MEMORY_SIZE,
        });
    }

    debug!("parsed program image: {} bytes", program.len());
    Ok(program)
}

/// Read a source file, distinguishing a missing file from other I/O errors.
pub fn read_source<P: AsRef<Path>>(path: P) -> Result<String, LoadError> {
    let path = path.as_ref();
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => LoadError::NotFound {
            path: path.display().to_string(),
        },
        _ => LoadError::Io(e.to_string()),
    })
}

/// Load a program image from disk.
pub fn load_program_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, LoadError> {
    parse_program(&read_source(path)?)
}

/// Render bytes as a program image.
///
/// Opcode bytes are annotated with their mnemonic so the output reads like a
/// hand-written program. Bytes that do not decode are written bare.
pub fn render_image(program: &[u8]) -> String {
    let mut output = String::new();
    let mut addr = 0;

    while addr < program.len() {
        let byte = program[addr];
        match decode(byte) {
            Ok(op) => {
                let _ = writeln!(output, "{:08b} # {}", byte, op);
                let end = (addr + 1 + operand_count(byte)).min(program.len());
                for operand in &program[addr + 1..end] {
                    let _ = writeln!(output, "{:08b}", operand);
                }
                addr = end;
            }
            Err(_) => {
                let _ = writeln!(output, "{:08b}", byte);
                addr += 1;
            }
        }
    }

    output
}

/// Write a program image to disk.
pub fn save_image<P: AsRef<Path>>(path: P, program: &[u8]) -> Result<(), LoadError> {
    std::fs::write(path.as_ref(), render_image(program))
        .map_err(|e| LoadError::Io(e.to_string()))
}

/// Errors that can occur while loading a program image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("{path} not found")]
    NotFound { path: String },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("value out of range on line {line}: {value} does not fit in a byte")]
    ValueOutOfRange { line: usize, value: u32 },

    #[error("program size {size} exceeds available space {available}")]
    TooLarge { size: usize, available: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cpu;

    #[test]
    fn test_single_hlt() {
        let program = parse_program("00000001\n").unwrap();
        assert_eq!(program, vec![0b0000_0001]);

        let mut cpu = Cpu::new();
        cpu.load_program(&program).unwrap();
        assert_eq!(cpu.mem.read(0).unwrap(), 0b0000_0001);
        assert!(cpu.mem.as_slice()[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_comment_stripping() {
        let program = parse_program("10000010 # LDI\n").unwrap();
        assert_eq!(program, vec![0b1000_0010]);
    }

    #[test]
    fn test_blank_and_comment_lines_take_no_address() {
        let source = "# header\n\n   \n10000010 # LDI R0,8\n00000000\n  00001000  \n# trailer\n";
        assert_eq!(parse_program(source).unwrap(), vec![0b1000_0010, 0, 8]);
    }

    #[test]
    fn test_invalid_literal() {
        let err = parse_program("00000001\n0000002\n").unwrap_err();
        assert!(matches!(err, LoadError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_value_out_of_range() {
        let err = parse_program("100000000\n").unwrap_err();
        assert_eq!(err, LoadError::ValueOutOfRange { line: 1, value: 256 });
    }

    #[test]
    fn test_too_large() {
        let source = "00000000\n".repeat(MEMORY_SIZE + 1);
        let err = parse_program(&source).unwrap_err();
        assert_eq!(err, LoadError::TooLarge { size: 256, available: 255 });
    }

    #[test]
    fn test_missing_file() {
        let err = load_program_file("/definitely/not/here.ls8").unwrap_err();
        assert_eq!(err, LoadError::NotFound { path: "/definitely/not/here.ls8".into() });
        assert_eq!(err.to_string(), "/definitely/not/here.ls8 not found");
    }

    #[test]
    fn test_render_image_reads_back() {
        let program = vec![0b1000_0010, 0, 8, 0b0100_0111, 0, 0b0000_0001, 0xFF];

        let image = render_image(&program);

        assert!(image.starts_with("10000010 # LDI\n00000000\n00001000\n"));
        assert!(image.contains("00000001 # HLT\n"));
        assert!(image.ends_with("11111111\n"));
        assert_eq!(parse_program(&image).unwrap(), program);
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("ls8-loader-{}.ls8", std::process::id()));
        let program = vec![0b1000_0010, 1, 42, 0b0000_0001];

        save_image(&path, &program).unwrap();
        let loaded = load_program_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, program);
    }
}
