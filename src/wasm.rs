//! WebAssembly bindings for the LS-8 emulator.
//!
//! This module provides JavaScript-friendly wrappers around the core emulator.

use wasm_bindgen::prelude::*;
use crate::Cpu;
use crate::asm::{assemble, parse_program};
use crate::asm::disasm::disassemble_instruction;
use crate::cpu::REGISTER_COUNT;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly CPU wrapper.
#[wasm_bindgen]
pub struct WasmCpu {
    cpu: Cpu,
    program: Vec<u8>,
}

#[wasm_bindgen]
impl WasmCpu {
    /// Create a new CPU instance.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            program: Vec::new(),
        }
    }

    /// Load a program from a binary-literal program image.
    #[wasm_bindgen]
    pub fn load_image(&mut self, source: &str) -> Result<usize, JsError> {
        let program = parse_program(source)
            .map_err(|e| JsError::new(&e.to_string()))?;
        self.install(program)
    }

    /// Load a program from assembly source code.
    #[wasm_bindgen]
    pub fn load_asm(&mut self, source: &str) -> Result<usize, JsError> {
        let program = assemble(source)
            .map_err(|e| JsError::new(&e.to_string()))?;
        self.install(program)
    }

    /// Step one instruction. Returns the disassembled instruction.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        let instr = self.cpu.step_with(&mut std::io::sink())
            .map_err(|e| JsError::new(&e.to_string()))?;

        Ok(instr.to_string())
    }

    /// Run until halt or max cycles. Returns the total cycle count.
    #[wasm_bindgen]
    pub fn run(&mut self, max_cycles: u32) -> Result<u64, JsError> {
        self.cpu.run_limited_with(max_cycles as u64, &mut std::io::sink())
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(self.cpu.cycles)
    }

    /// Reset CPU to initial state with loaded program.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.cpu = Cpu::new();
        let _ = self.cpu.load_program(&self.program);
    }

    #[wasm_bindgen]
    pub fn is_running(&self) -> bool {
        self.cpu.is_running()
    }

    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.cpu.is_halted()
    }

    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.cpu.cycles
    }

    /// Get program counter.
    #[wasm_bindgen]
    pub fn pc(&self) -> usize {
        self.cpu.regs.pc
    }

    /// Get stack pointer.
    #[wasm_bindgen]
    pub fn sp(&self) -> usize {
        self.cpu.regs.sp
    }

    /// Get a general-purpose register (0 for invalid indices).
    #[wasm_bindgen]
    pub fn register(&self, index: u8) -> u8 {
        self.cpu.regs.get(index).unwrap_or(0)
    }

    /// Get R0..R7 as a byte array.
    #[wasm_bindgen]
    pub fn registers(&self) -> js_sys::Uint8Array {
        let regs: [u8; REGISTER_COUNT] = self.cpu.regs.general();
        js_sys::Uint8Array::from(&regs[..])
    }

    /// Get state as string.
    #[wasm_bindgen]
    pub fn state(&self) -> String {
        format!("{:?}", self.cpu.state)
    }

    /// Get memory byte at address (0 past the end).
    #[wasm_bindgen]
    pub fn memory_at(&self, addr: usize) -> u8 {
        self.cpu.mem.peek(addr).unwrap_or(0)
    }

    /// Get all memory.
    #[wasm_bindgen]
    pub fn memory_all(&self) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(self.cpu.mem.as_slice())
    }

    /// Values printed so far.
    #[wasm_bindgen]
    pub fn printed(&self) -> Vec<u8> {
        self.cpu.printed.clone()
    }

    /// Whole machine state as JSON.
    #[wasm_bindgen]
    pub fn snapshot_json(&self) -> Result<String, JsError> {
        self.cpu.snapshot_json()
            .map_err(|e| JsError::new(&e.to_string()))
    }
}

impl WasmCpu {
    fn install(&mut self, program: Vec<u8>) -> Result<usize, JsError> {
        let len = program.len();
        self.cpu = Cpu::new();
        self.cpu.load_program(&program)
            .map_err(|e| JsError::new(&e.to_string()))?;
        self.program = program;
        Ok(len)
    }
}

impl Default for WasmCpu {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble source code and return the program bytes.
#[wasm_bindgen]
pub fn wasm_assemble(source: &str) -> Result<Vec<u8>, JsError> {
    assemble(source).map_err(|e| JsError::new(&e.to_string()))
}

/// Disassemble a single instruction.
#[wasm_bindgen]
pub fn wasm_disassemble(bytes: &[u8]) -> String {
    disassemble_instruction(bytes)
}
