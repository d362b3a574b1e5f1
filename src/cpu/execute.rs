//! CPU execution engine for the LS-8.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use crate::cpu::{Memory, Registers};
use crate::cpu::alu::{self, AluOp, AluError};
use crate::cpu::decode::{self, Instruction, DecodeError};
use crate::cpu::memory::MemoryError;
use crate::cpu::registers::RegisterError;
use log::{debug, info, warn};
use serde::{Serialize, Deserialize};
use std::io::Write;
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has halted (executed HLT instruction).
    Halted,
    /// CPU stopped on a fatal error.
    Error,
}

/// The LS-8 CPU.
#[derive(Clone, Serialize, Deserialize)]
pub struct Cpu {
    /// CPU registers, including PC and SP.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Instruction count.
    pub cycles: u64,
    /// Every value emitted by PRN, in order.
    pub printed: Vec<u8>,
    last_instr: Option<Instruction>,
}

impl Cpu {
    /// Create a new CPU with zeroed state.
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            state: CpuState::Running,
            cycles: 0,
            printed: Vec::new(),
            last_instr: None,
        }
    }

    /// Reset the CPU to its power-on state. Memory is cleared too.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.state = CpuState::Running;
        self.cycles = 0;
        self.printed.clear();
        self.last_instr = None;
    }

    /// Load a program image into memory at address 0.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), MemoryError> {
        self.mem.load_program(0, program)
    }

    /// Execute a single instruction, printing to stdout.
    pub fn step(&mut self) -> Result<Instruction, CpuError> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        self.step_with(&mut out)
    }

    /// Execute a single instruction, printing to `out`.
    ///
    /// Returns the instruction that was executed. A fatal error moves the CPU
    /// into [`CpuState::Error`].
    pub fn step_with<W: Write + ?Sized>(&mut self, out: &mut W) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        match self.cycle(out) {
            Ok(instr) => {
                self.cycles += 1;
                self.last_instr = Some(instr);
                Ok(instr)
            }
            Err(e) => {
                self.state = CpuState::Error;
                Err(e)
            }
        }
    }

    /// Run until halt or error, printing to stdout.
    ///
    /// Returns the number of instructions executed.
    pub fn run(&mut self) -> Result<u64, CpuError> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        self.run_with(&mut out)
    }

    /// Run until halt or error, printing to `out`.
    pub fn run_with<W: Write + ?Sized>(&mut self, out: &mut W) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;

        while self.state == CpuState::Running {
            self.step_with(out)?;
        }

        info!("halted after {} cycles", self.cycles - start_cycles);
        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions, printing to stdout.
    pub fn run_limited(&mut self, max_cycles: u64) -> Result<u64, CpuError> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        self.run_limited_with(max_cycles, &mut out)
    }

    /// Run for at most `max_cycles` instructions, printing to `out`.
    pub fn run_limited_with<W: Write + ?Sized>(
        &mut self,
        max_cycles: u64,
        out: &mut W,
    ) -> Result<u64, CpuError> {
        self.run_observed(max_cycles, out, |_| {})
    }

    /// Bounded run that calls `before_step` with the machine state ahead of
    /// every cycle.
    pub fn run_observed<W, F>(
        &mut self,
        max_cycles: u64,
        out: &mut W,
        mut before_step: F,
    ) -> Result<u64, CpuError>
    where
        W: Write + ?Sized,
        F: FnMut(&Cpu),
    {
        let start_cycles = self.cycles;
        let limit = self.cycles.saturating_add(max_cycles);

        while self.state == CpuState::Running && self.cycles < limit {
            before_step(self);
            self.step_with(out)?;
        }

        if self.state == CpuState::Running {
            warn!("cycle limit of {} reached at PC={:02X}", max_cycles, self.regs.pc);
        } else {
            info!("halted after {} cycles", self.cycles - start_cycles);
        }

        Ok(self.cycles - start_cycles)
    }

    /// One fetch-decode-execute cycle.
    fn cycle<W: Write + ?Sized>(&mut self, out: &mut W) -> Result<Instruction, CpuError> {
        // Fetch
        let pc = self.regs.pc;
        let ir = self.mem.read(pc)?;

        // Decode
        let opcode = decode::decode(ir)?;
        let count = decode::operand_count(ir);
        let mut operands = [0u8; 2];
        for (i, slot) in operands.iter_mut().take(count).enumerate() {
            *slot = self.mem.read(pc + 1 + i)?;
        }
        let instr = Instruction::from_parts(opcode, operands);
        debug!("{:02X}: {}", pc, instr);

        // Execute
        self.execute(instr, out)?;

        // Advance by the length encoded in the fetched opcode byte
        if self.state == CpuState::Running {
            self.regs.advance_pc(1 + count);
        }

        Ok(instr)
    }

    /// Execute a decoded instruction.
    fn execute<W: Write + ?Sized>(&mut self, instr: Instruction, out: &mut W) -> Result<(), CpuError> {
        match instr {
            Instruction::Ldi { reg, value } => {
                self.regs.set(reg, value)?;
            }

            Instruction::Prn { reg } => {
                let value = self.regs.get(reg)?;
                writeln!(out, "{}", value).map_err(|e| CpuError::Output(e.to_string()))?;
                self.printed.push(value);
            }

            Instruction::Add { a, b } | Instruction::Mul { a, b } => {
                let op = AluOp::try_from(instr.opcode())?;
                alu::apply(&mut self.regs, op, a, b)?;
            }

            Instruction::Push { reg } => {
                let value = self.regs.get(reg)?;
                let sp = self.regs.sp
                    .checked_sub(1)
                    .ok_or(MemoryError::OutOfBounds(-1))?;
                self.mem.write(sp, value)?;
                self.regs.sp = sp;
            }

            Instruction::Pop { reg } => {
                let value = self.mem.read(self.regs.sp)?;
                self.regs.set(reg, value)?;
                self.regs.sp += 1;
            }

            Instruction::Hlt => {
                self.state = CpuState::Halted;
            }
        }

        Ok(())
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }

    /// Serialize the whole machine state as JSON.
    pub fn snapshot_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("register error: {0}")]
    Register(#[from] RegisterError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("ALU error: {0}")]
    Alu(#[from] AluError),

    #[error("output error: {0}")]
    Output(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::{encode, Opcode};
    use crate::cpu::registers::STACK_BASE;
    use crate::cpu::MEMORY_SIZE;
    use proptest::prelude::*;

    fn make_program(instructions: &[Instruction]) -> Vec<u8> {
        instructions.iter().flat_map(encode).collect()
    }

    fn load(instructions: &[Instruction]) -> Cpu {
        let mut cpu = Cpu::new();
        cpu.load_program(&make_program(instructions)).unwrap();
        cpu
    }

    #[test]
    fn test_cpu_halt() {
        let mut cpu = load(&[Instruction::Hlt]);
        let mut out = Vec::new();

        let executed = cpu.run_with(&mut out).unwrap();

        assert_eq!(executed, 1);
        assert!(cpu.is_halted());
        assert_eq!(cpu.regs.pc, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_mult_program_prints_30() {
        let mut cpu = load(&[
            Instruction::Ldi { reg: 0, value: 5 },
            Instruction::Ldi { reg: 1, value: 6 },
            Instruction::Mul { a: 0, b: 1 },
            Instruction::Prn { reg: 0 },
            Instruction::Hlt,
        ]);
        let mut out = Vec::new();

        let executed = cpu.run_with(&mut out).unwrap();

        assert_eq!(executed, 5);
        assert_eq!(String::from_utf8(out).unwrap(), "30\n");
        assert_eq!(cpu.regs.get(0).unwrap(), 30);
        assert_eq!(cpu.regs.get(1).unwrap(), 6);
        assert_eq!(cpu.printed, vec![30]);
        // HLT sits at address 11 and PC stays on it
        assert_eq!(cpu.regs.pc, 11);
    }

    #[test]
    fn test_add() {
        let mut cpu = load(&[
            Instruction::Ldi { reg: 2, value: 250 },
            Instruction::Ldi { reg: 3, value: 10 },
            Instruction::Add { a: 2, b: 3 },
            Instruction::Hlt,
        ]);

        cpu.run_with(&mut Vec::new()).unwrap();

        assert_eq!(cpu.regs.get(2).unwrap(), 4);
        assert_eq!(cpu.regs.get(3).unwrap(), 10);
    }

    #[test]
    fn test_stack_program() {
        let mut cpu = load(&[
            Instruction::Ldi { reg: 0, value: 1 },
            Instruction::Ldi { reg: 1, value: 2 },
            Instruction::Push { reg: 0 },
            Instruction::Push { reg: 1 },
            Instruction::Ldi { reg: 0, value: 3 },
            Instruction::Pop { reg: 0 },
            Instruction::Prn { reg: 0 },
            Instruction::Pop { reg: 1 },
            Instruction::Prn { reg: 1 },
            Instruction::Hlt,
        ]);
        let mut out = Vec::new();

        cpu.run_with(&mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "2\n1\n");
        assert_eq!(cpu.regs.sp, STACK_BASE);
    }

    #[test]
    fn test_push_writes_below_sp() {
        let mut cpu = load(&[
            Instruction::Ldi { reg: 4, value: 77 },
            Instruction::Push { reg: 4 },
            Instruction::Hlt,
        ]);
        cpu.regs.sp = MEMORY_SIZE;

        cpu.run_with(&mut Vec::new()).unwrap();

        assert_eq!(cpu.regs.sp, MEMORY_SIZE - 1);
        assert_eq!(cpu.mem.read(MEMORY_SIZE - 1).unwrap(), 77);
    }

    #[test]
    fn test_push_from_stack_base_overwrites_program() {
        // The first push lands on address 5, the opcode after PUSH.
        let mut cpu = load(&[
            Instruction::Ldi { reg: 4, value: 0b0000_0001 },
            Instruction::Push { reg: 4 },
            Instruction::Ldi { reg: 0, value: 9 },
        ]);

        cpu.run_with(&mut Vec::new()).unwrap();

        assert!(cpu.is_halted());
        assert_eq!(cpu.regs.sp, STACK_BASE - 1);
        assert_eq!(cpu.regs.pc, STACK_BASE - 1);
        assert_eq!(cpu.regs.get(0).unwrap(), 0);
    }

    #[test]
    fn test_run_observed_sees_every_cycle() {
        let mut cpu = load(&[
            Instruction::Ldi { reg: 0, value: 8 },
            Instruction::Prn { reg: 0 },
            Instruction::Hlt,
        ]);
        let mut pcs = Vec::new();
        let mut out = Vec::new();

        let executed = cpu.run_observed(u64::MAX, &mut out, |cpu| pcs.push(cpu.regs.pc)).unwrap();

        assert_eq!(executed, 3);
        assert_eq!(pcs, vec![0, 3, 5]);
        assert_eq!(out, b"8\n");
    }

    #[test]
    fn test_run_observed_stops_at_limit() {
        let mut cpu = load(&[
            Instruction::Ldi { reg: 0, value: 8 },
            Instruction::Prn { reg: 0 },
            Instruction::Hlt,
        ]);
        let mut seen = 0;

        let executed = cpu.run_observed(1, &mut Vec::new(), |_| seen += 1).unwrap();

        assert_eq!(executed, 1);
        assert_eq!(seen, 1);
        assert!(cpu.is_running());
        assert_eq!(cpu.regs.pc, 3);
    }

    #[test]
    fn test_unknown_opcode_is_fatal() {
        let mut cpu = Cpu::new();
        cpu.load_program(&[0b1111_1111, 0, 1]).unwrap();

        let err = cpu.run_with(&mut Vec::new()).unwrap_err();

        assert_eq!(err, CpuError::Decode(DecodeError::UnknownOpcode(0xFF)));
        assert_eq!(cpu.state, CpuState::Error);
        assert_eq!(cpu.regs, Registers::new());
        assert_eq!(cpu.cycles, 0);
    }

    #[test]
    fn test_zeroed_memory_is_unknown_opcode() {
        let mut cpu = Cpu::new();

        let err = cpu.step_with(&mut Vec::new()).unwrap_err();
        assert!(matches!(err, CpuError::Decode(DecodeError::UnknownOpcode(0))));
    }

    #[test]
    fn test_step_after_halt() {
        let mut cpu = load(&[Instruction::Hlt]);
        cpu.step_with(&mut Vec::new()).unwrap();

        let err = cpu.step_with(&mut Vec::new()).unwrap_err();
        assert_eq!(err, CpuError::NotRunning(CpuState::Halted));
    }

    #[test]
    fn test_invalid_register_is_fatal() {
        let mut cpu = load(&[Instruction::Ldi { reg: 8, value: 1 }, Instruction::Hlt]);

        let err = cpu.run_with(&mut Vec::new()).unwrap_err();

        assert_eq!(err, CpuError::Register(RegisterError::InvalidRegister(8)));
        assert_eq!(cpu.regs.pc, 0);
    }

    #[test]
    fn test_alu_invalid_register() {
        let mut cpu = load(&[Instruction::Add { a: 0, b: 12 }, Instruction::Hlt]);

        let err = cpu.run_with(&mut Vec::new()).unwrap_err();
        assert_eq!(err, CpuError::Alu(AluError::Register(RegisterError::InvalidRegister(12))));
    }

    #[test]
    fn test_push_past_bottom_of_memory() {
        let mut cpu = load(&[
            Instruction::Push { reg: 0 },
            Instruction::Hlt,
        ]);
        cpu.regs.sp = 0;

        let err = cpu.run_with(&mut Vec::new()).unwrap_err();

        assert_eq!(err, CpuError::Memory(MemoryError::OutOfBounds(-1)));
        assert_eq!(cpu.regs.sp, 0);
    }

    #[test]
    fn test_pop_past_top_of_memory() {
        let mut cpu = load(&[Instruction::Pop { reg: 0 }, Instruction::Hlt]);
        cpu.regs.sp = 255;

        let err = cpu.run_with(&mut Vec::new()).unwrap_err();
        assert_eq!(err, CpuError::Memory(MemoryError::OutOfBounds(255)));
    }

    #[test]
    fn test_operand_fetch_past_end() {
        let mut cpu = Cpu::new();
        cpu.mem.write(254, Opcode::Ldi.byte()).unwrap();
        cpu.regs.pc = 254;

        let err = cpu.step_with(&mut Vec::new()).unwrap_err();
        assert_eq!(err, CpuError::Memory(MemoryError::OutOfBounds(255)));
    }

    #[test]
    fn test_pc_runs_off_the_end() {
        let mut cpu = Cpu::new();
        cpu.mem.write(253, Opcode::Prn.byte()).unwrap();
        cpu.regs.pc = 253;

        cpu.step_with(&mut Vec::new()).unwrap();
        assert_eq!(cpu.regs.pc, 255);

        let err = cpu.step_with(&mut Vec::new()).unwrap_err();
        assert_eq!(err, CpuError::Memory(MemoryError::OutOfBounds(255)));
    }

    #[test]
    fn test_run_limited() {
        let mut cpu = load(&[
            Instruction::Ldi { reg: 0, value: 1 },
            Instruction::Ldi { reg: 1, value: 2 },
            Instruction::Hlt,
        ]);

        assert_eq!(cpu.run_limited_with(1, &mut Vec::new()).unwrap(), 1);
        assert!(cpu.is_running());
        assert_eq!(cpu.last_instruction(), Some(Instruction::Ldi { reg: 0, value: 1 }));

        assert_eq!(cpu.run_limited_with(10, &mut Vec::new()).unwrap(), 2);
        assert!(cpu.is_halted());
    }

    #[test]
    fn test_reset() {
        let mut cpu = load(&[Instruction::Ldi { reg: 0, value: 9 }, Instruction::Prn { reg: 0 }, Instruction::Hlt]);
        cpu.run_with(&mut Vec::new()).unwrap();

        cpu.reset();

        assert!(cpu.is_running());
        assert_eq!(cpu.cycles, 0);
        assert!(cpu.printed.is_empty());
        assert_eq!(cpu.regs, Registers::new());
        assert_eq!(cpu.mem, Memory::new());
    }

    #[test]
    fn test_snapshot_json() {
        let mut cpu = load(&[Instruction::Ldi { reg: 0, value: 5 }, Instruction::Hlt]);
        cpu.run_with(&mut Vec::new()).unwrap();

        let json = cpu.snapshot_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["state"], "Halted");
        assert_eq!(value["regs"]["pc"], 3);
        assert_eq!(value["regs"]["gpr"][0], 5);
    }

    proptest! {
        #[test]
        fn prop_ldi_sets_register(reg in 0u8..8, value in any::<u8>()) {
            let mut cpu = load(&[Instruction::Ldi { reg, value }, Instruction::Hlt]);
            cpu.run_with(&mut Vec::new()).unwrap();
            prop_assert_eq!(cpu.regs.get(reg).unwrap(), value);
        }

        #[test]
        fn prop_push_pop_round_trip(reg in 0u8..8, value in any::<u8>()) {
            let mut cpu = load(&[
                Instruction::Ldi { reg, value },
                Instruction::Push { reg },
                Instruction::Pop { reg },
                Instruction::Hlt,
            ]);
            cpu.regs.sp = MEMORY_SIZE;

            cpu.run_limited_with(2, &mut Vec::new()).unwrap();
            prop_assert_eq!(cpu.regs.sp, MEMORY_SIZE - 1);
            prop_assert_eq!(cpu.mem.read(MEMORY_SIZE - 1).unwrap(), value);
            cpu.regs.set(reg, value.wrapping_add(1)).unwrap();

            cpu.run_with(&mut Vec::new()).unwrap();

            prop_assert_eq!(cpu.regs.get(reg).unwrap(), value);
            prop_assert_eq!(cpu.regs.sp, MEMORY_SIZE);
        }

        #[test]
        fn prop_pc_advance_law(idx in 0usize..6, a in 0u8..8, b in 0u8..8, start in 0usize..100) {
            let op = [Opcode::Ldi, Opcode::Prn, Opcode::Mul, Opcode::Add, Opcode::Push, Opcode::Pop][idx];
            let mut cpu = Cpu::new();
            cpu.mem.write(start, op.byte()).unwrap();
            cpu.mem.write(start + 1, a).unwrap();
            cpu.mem.write(start + 2, b).unwrap();
            cpu.regs.pc = start;

            cpu.step_with(&mut Vec::new()).unwrap();

            prop_assert_eq!(cpu.regs.pc, start + 1 + (op.byte() >> 6) as usize);
        }
    }
}
