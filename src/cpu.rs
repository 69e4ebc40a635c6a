use std::io::Write;

use log::{debug, trace, warn};

use crate::alu::{alu, AluOutput};
use crate::bus::{Mem, MEMORY_SIZE};
use crate::error::{Ls8Error, Result};
use crate::opcodes::{Instruction, OpCode, OPCODES_MAP};
use crate::state::{MachineState, STACK_POINTER};

/// Destination for `PRN`. Every [`Write`] gets one decimal value per line.
pub trait Output {
    fn print(&mut self, value: u8) -> Result<()>;
}

impl<W: Write> Output for W {
    fn print(&mut self, value: u8) -> Result<()> {
        writeln!(self, "{}", value).map_err(Ls8Error::Output)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Halted,
}

pub struct CPU<O> {
    pub state: MachineState,
    pub output: O,
    run_state: RunState,
}

impl<O: Output> CPU<O> {
    pub fn new(output: O) -> Self {
        CPU {
            state: MachineState::new(),
            output: output,
            run_state: RunState::Running,
        }
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn register(&self, index: u8) -> Result<u8> {
        self.state.get_register(index)
    }

    /// Copies a program image into memory starting at `base`.
    pub fn load(&mut self, base: u16, program: &[u8]) -> Result<()> {
        self.state.mem_write_slice(base, program)?;
        debug!("loaded {} bytes at {:#04x}", program.len(), base);
        Ok(())
    }

    pub fn load_and_run(&mut self, program: &[u8]) -> Result<()> {
        self.load(0, program)?;
        self.run()
    }

    pub fn run(&mut self) -> Result<()> {
        self.run_with_callback(|_| {})
    }

    /// Runs until `HLT` or the first error, calling `callback` before each
    /// instruction is fetched.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> Result<()>
    where
        F: FnMut(&CPU<O>),
    {
        while self.run_state == RunState::Running {
            callback(&*self);
            self.step()?;
        }
        Ok(())
    }

    /// Executes a single instruction. A halted CPU stays halted and does nothing.
    pub fn step(&mut self) -> Result<RunState> {
        if self.run_state == RunState::Halted {
            return Ok(RunState::Halted);
        }
        if let Err(err) = self.execute() {
            debug!("halting on error at pc {:#04x}: {}", self.state.get_pc(), err);
            self.run_state = RunState::Halted;
            return Err(err);
        }
        Ok(self.run_state)
    }

    fn execute(&mut self) -> Result<()> {
        let pc = self.state.get_pc();
        let code = self.state.read_byte(pc)?;

        let opcode: &OpCode = match OPCODES_MAP.get(&code) {
            Some(opcode) => *opcode,
            None => {
                warn!("skipping unknown opcode {:#010b} at {:#04x}", code, pc);
                self.state.set_pc(pc + 1);
                return Ok(());
            }
        };

        let mut operands = [0u8; 2];
        for i in 0..opcode.operand_count() as u16 {
            operands[i as usize] = self.state.read_byte(pc + 1 + i)?;
        }
        let [operand_a, operand_b] = operands;
        trace!(
            "{:02X}: {} {:02X} {:02X}",
            pc,
            opcode.mnemonic,
            operand_a,
            operand_b
        );

        // handlers return true when they have set the pc themselves
        let pc_set = match opcode.instruction {
            Instruction::Hlt => self.hlt(),
            Instruction::Ldi => self.ldi(operand_a, operand_b)?,
            Instruction::Prn => self.prn(operand_a)?,
            Instruction::Push => self.push(operand_a)?,
            Instruction::Pop => self.pop(operand_a)?,
            Instruction::Add | Instruction::Sub | Instruction::Mul | Instruction::Cmp => {
                self.arithmetic(opcode.instruction, operand_a, operand_b)?
            }
            Instruction::Jmp => self.jump(operand_a)?,
            Instruction::Jeq => self.branch(operand_a, self.state.get_flags().is_equal())?,
            Instruction::Jne => self.branch(operand_a, !self.state.get_flags().is_equal())?,
        };

        if !pc_set {
            self.state.set_pc(pc + opcode.len as u16);
        }
        Ok(())
    }

    // The pc is left on the HLT byte.
    fn hlt(&mut self) -> bool {
        debug!("halted at {:#04x}", self.state.get_pc());
        self.run_state = RunState::Halted;
        true
    }

    fn ldi(&mut self, register: u8, value: u8) -> Result<bool> {
        self.state.set_register(register, value)?;
        Ok(false)
    }

    fn prn(&mut self, register: u8) -> Result<bool> {
        let value = self.state.get_register(register)?;
        self.output.print(value)?;
        Ok(false)
    }

    fn push(&mut self, register: u8) -> Result<bool> {
        let value = self.state.get_register(register)?;
        let stack_pointer = self.state.stack_pointer().wrapping_sub(1);
        self.state.set_stack_pointer(stack_pointer);
        self.state.write_byte(stack_pointer as u16, value)?;
        Ok(false)
    }

    fn pop(&mut self, register: u8) -> Result<bool> {
        let value = self.state.read_byte(self.state.stack_pointer() as u16)?;
        self.state.set_register(register, value)?;
        let stack_pointer = self.state.get_register(STACK_POINTER)?.wrapping_add(1);
        self.state.set_stack_pointer(stack_pointer);
        Ok(false)
    }

    fn arithmetic(&mut self, op: Instruction, register_a: u8, register_b: u8) -> Result<bool> {
        let a = self.state.get_register(register_a)?;
        let b = self.state.get_register(register_b)?;
        match alu(op, a, b)? {
            AluOutput::Register(value) => self.state.set_register(register_a, value)?,
            AluOutput::Flags(flags) => self.state.set_flags(flags),
        }
        Ok(false)
    }

    fn jump(&mut self, register: u8) -> Result<bool> {
        let target = self.state.get_register(register)?;
        self.state.set_pc(target as u16);
        Ok(true)
    }

    fn branch(&mut self, register: u8, condition: bool) -> Result<bool> {
        if condition {
            self.jump(register)
        } else {
            Ok(false)
        }
    }

    /// One line of machine state: pc, the three bytes from pc, then R0..R7.
    pub fn trace(&self) -> String {
        let pc = self.state.get_pc();
        let peek = |addr: u16| match self.state.read_byte(addr) {
            Ok(byte) => format!("{:02X}", byte),
            Err(_) => "--".to_string(),
        };

        let mut line = format!(
            "TRACE: {:02X} | {} {} {} |",
            pc,
            peek(pc),
            peek(pc + 1),
            peek(pc + 2)
        );
        for value in self.state.registers() {
            line.push_str(&format!(" {:02X}", value));
        }
        line
    }

    pub fn memory(&self) -> &[u8; MEMORY_SIZE] {
        self.state.memory()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::Location;
    use crate::state::STACK_POINTER_INIT;

    const HLT: u8 = 0b0000_0001;
    const LDI: u8 = 0b1000_0010;
    const PRN: u8 = 0b0100_0111;
    const PUSH: u8 = 0b0100_0101;
    const POP: u8 = 0b0100_0110;
    const ADD: u8 = 0b1010_0000;
    const SUB: u8 = 0b1010_0001;
    const MUL: u8 = 0b1010_0010;
    const CMP: u8 = 0b1010_0111;
    const JMP: u8 = 0b0101_0100;
    const JEQ: u8 = 0b0101_0101;
    const JNE: u8 = 0b0101_0110;

    fn run(program: &[u8]) -> CPU<Vec<u8>> {
        let mut cpu = CPU::new(Vec::new());
        cpu.load_and_run(program).unwrap();
        cpu
    }

    fn printed(cpu: &CPU<Vec<u8>>) -> String {
        String::from_utf8(cpu.output.clone()).unwrap()
    }

    #[test]
    fn test_ldi_every_register_and_value() {
        for register in 0..8u8 {
            for value in 0..=255u8 {
                let cpu = run(&[LDI, register, value, HLT]);
                assert_eq!(cpu.register(register).unwrap(), value);
            }
        }
    }

    #[test]
    fn test_mul_print_72() {
        let cpu = run(&[LDI, 0, 8, LDI, 1, 9, MUL, 0, 1, PRN, 0, HLT]);
        assert_eq!(printed(&cpu), "72\n");
        assert_eq!(cpu.register(0).unwrap(), 72);
        assert_eq!(cpu.register(1).unwrap(), 9);
        assert_eq!(cpu.run_state(), RunState::Halted);
        assert_eq!(cpu.state.get_pc(), 11);
    }

    #[test]
    fn test_arithmetic_wraps() {
        let cpu = run(&[LDI, 0, 200, LDI, 1, 100, ADD, 0, 1, HLT]);
        assert_eq!(cpu.register(0).unwrap(), 44);

        let cpu = run(&[LDI, 0, 3, LDI, 1, 5, SUB, 0, 1, HLT]);
        assert_eq!(cpu.register(0).unwrap(), 254);

        let cpu = run(&[LDI, 0, 16, LDI, 1, 17, MUL, 0, 1, HLT]);
        assert_eq!(cpu.register(0).unwrap(), 16);
    }

    #[test]
    fn test_cmp_clears_stale_flags() {
        let mut cpu = CPU::new(Vec::new());
        cpu.load(0, &[LDI, 0, 5, LDI, 1, 5, LDI, 2, 9, CMP, 0, 1, CMP, 0, 2, CMP, 2, 0, HLT])
            .unwrap();
        for _ in 0..4 {
            cpu.step().unwrap();
        }
        assert!(cpu.state.get_flags().is_equal());

        cpu.step().unwrap();
        let flags = cpu.state.get_flags();
        assert!(flags.is_less());
        assert!(!flags.is_equal());
        assert_eq!(flags.bits(), 0b100);

        cpu.step().unwrap();
        assert_eq!(cpu.state.get_flags().bits(), 0b010);
    }

    #[test]
    fn test_push_pop_round_trip() {
        let cpu = run(&[LDI, 0, 42, PUSH, 0, LDI, 0, 0, POP, 0, HLT]);
        assert_eq!(cpu.register(0).unwrap(), 42);
        assert_eq!(cpu.state.stack_pointer(), STACK_POINTER_INIT);
        assert_eq!(cpu.memory()[(STACK_POINTER_INIT - 1) as usize], 42);
    }

    #[test]
    fn test_interleaved_push_pop_swaps() {
        let cpu = run(&[
            LDI, 0, 1, LDI, 1, 2, PUSH, 0, PUSH, 1, POP, 0, POP, 1, HLT,
        ]);
        assert_eq!(cpu.register(0).unwrap(), 2);
        assert_eq!(cpu.register(1).unwrap(), 1);
        assert_eq!(cpu.state.stack_pointer(), STACK_POINTER_INIT);
    }

    #[test]
    fn test_push_decrements_before_write() {
        let mut cpu = CPU::new(Vec::new());
        cpu.load(0, &[LDI, 3, 0x77, PUSH, 3, HLT]).unwrap();
        cpu.step().unwrap();
        cpu.step().unwrap();
        assert_eq!(cpu.state.stack_pointer(), 0xf3);
        assert_eq!(cpu.state.read_byte(0xf3).unwrap(), 0x77);
        assert_eq!(cpu.state.read_byte(0xf4).unwrap(), 0);
    }

    #[test]
    fn test_stack_pointer_wraps() {
        let mut cpu = CPU::new(Vec::new());
        cpu.load(0, &[LDI, 7, 0, LDI, 0, 9, PUSH, 0, HLT]).unwrap();
        cpu.run().unwrap();
        assert_eq!(cpu.state.stack_pointer(), 0xff);
        assert_eq!(cpu.memory()[0xff], 9);
    }

    // 0: LDI R0,5  3: LDI R1,x  6: LDI R2,17  9: CMP R0,R1  12: JEQ R2
    // 14: LDI R3,1  17: LDI R4,2  20: HLT
    fn conditional(jump: u8, r1: u8) -> Vec<u8> {
        vec![
            LDI, 0, 5, LDI, 1, r1, LDI, 2, 17, CMP, 0, 1, jump, 2, LDI, 3, 1, LDI, 4, 2, HLT,
        ]
    }

    #[test]
    fn test_jeq() {
        let cpu = run(&conditional(JEQ, 5));
        assert_eq!(cpu.register(3).unwrap(), 0);
        assert_eq!(cpu.register(4).unwrap(), 2);

        let cpu = run(&conditional(JEQ, 6));
        assert_eq!(cpu.register(3).unwrap(), 1);
        assert_eq!(cpu.register(4).unwrap(), 2);
    }

    #[test]
    fn test_jeq_falls_through_to_next_instruction() {
        let mut cpu = CPU::new(Vec::new());
        cpu.load(0, &conditional(JEQ, 6)).unwrap();
        for _ in 0..4 {
            cpu.step().unwrap();
        }
        assert_eq!(cpu.state.get_pc(), 12);
        cpu.step().unwrap();
        assert_eq!(cpu.state.get_pc(), 14);
    }

    #[test]
    fn test_jne() {
        let cpu = run(&conditional(JNE, 6));
        assert_eq!(cpu.register(3).unwrap(), 0);

        let cpu = run(&conditional(JNE, 5));
        assert_eq!(cpu.register(3).unwrap(), 1);
    }

    #[test]
    fn test_jmp_keeps_running() {
        // 0: LDI R0,6  3: JMP R0  5: HLT  6: LDI R1,7  9: PRN R1  11: HLT
        let cpu = run(&[LDI, 0, 6, JMP, 0, HLT, LDI, 1, 7, PRN, 1, HLT]);
        assert_eq!(printed(&cpu), "7\n");
        assert_eq!(cpu.state.get_pc(), 11);
    }

    #[test]
    fn test_countdown_loop() {
        // 12: PRN R0  14: SUB R0,R1  17: CMP R0,R2  20: JNE R3  22: HLT
        let cpu = run(&[
            LDI, 0, 3, LDI, 1, 1, LDI, 2, 0, LDI, 3, 12, PRN, 0, SUB, 0, 1, CMP, 0, 2, JNE, 3,
            HLT,
        ]);
        assert_eq!(printed(&cpu), "3\n2\n1\n");
        assert_eq!(cpu.register(0).unwrap(), 0);
    }

    #[test]
    fn test_unknown_opcode_skips_one_byte() {
        let mut cpu = CPU::new(Vec::new());
        cpu.load(0, &[0b0000_0000, 0b1111_1111, LDI, 0, 9, HLT]).unwrap();
        cpu.step().unwrap();
        assert_eq!(cpu.state.get_pc(), 1);
        cpu.step().unwrap();
        assert_eq!(cpu.state.get_pc(), 2);
        cpu.run().unwrap();
        assert_eq!(cpu.register(0).unwrap(), 9);
    }

    #[test]
    fn test_nothing_runs_after_hlt() {
        let mut cpu = run(&[HLT, LDI, 0, 1, PRN, 0]);
        assert_eq!(cpu.register(0).unwrap(), 0);
        assert!(cpu.output.is_empty());
        assert_eq!(cpu.step().unwrap(), RunState::Halted);
        assert_eq!(cpu.state.get_pc(), 0);
        assert_eq!(cpu.register(0).unwrap(), 0);
    }

    #[test]
    fn test_bad_register_halts() {
        let mut cpu = CPU::new(Vec::new());
        let err = cpu.load_and_run(&[LDI, 8, 1, HLT]).unwrap_err();
        assert!(matches!(
            err,
            Ls8Error::OutOfBounds {
                location: Location::Register,
                index: 8,
                ..
            }
        ));
        assert_eq!(cpu.run_state(), RunState::Halted);
        assert_eq!(cpu.state.registers(), &[0, 0, 0, 0, 0, 0, 0, 0xf4]);
    }

    #[test]
    fn test_running_off_the_end_of_memory() {
        let mut cpu = CPU::new(Vec::new());
        let err = cpu.run().unwrap_err();
        assert!(matches!(
            err,
            Ls8Error::OutOfBounds {
                location: Location::Memory,
                index: 0x100,
                ..
            }
        ));
        assert_eq!(cpu.run_state(), RunState::Halted);
    }

    #[test]
    fn test_operand_past_end_of_memory() {
        let mut cpu = CPU::new(Vec::new());
        cpu.load(0, &[LDI, 0, 0xfe, JMP, 0]).unwrap();
        cpu.state.write_byte(0xfe, LDI).unwrap();
        let err = cpu.run().unwrap_err();
        assert!(matches!(err, Ls8Error::OutOfBounds { index: 0x100, .. }));
        assert_eq!(cpu.state.get_pc(), 0xfe);
    }

    #[test]
    fn test_oversized_image_is_rejected() {
        let mut cpu = CPU::new(Vec::new());
        assert!(cpu.load(0, &[0; MEMORY_SIZE]).is_ok());
        assert!(matches!(
            cpu.load(0, &[0; MEMORY_SIZE + 1]),
            Err(Ls8Error::OutOfBounds { .. })
        ));
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_output_failure_halts() {
        let mut cpu = CPU::new(BrokenPipe);
        let err = cpu.load_and_run(&[PRN, 0, HLT]).unwrap_err();
        assert!(matches!(err, Ls8Error::Output(_)));
        assert_eq!(cpu.run_state(), RunState::Halted);
    }

    #[test]
    fn test_trace() {
        let mut cpu = CPU::new(Vec::new());
        cpu.load(0, &[LDI, 0, 8, HLT]).unwrap();
        assert_eq!(cpu.trace(), "TRACE: 00 | 82 00 08 | 00 00 00 00 00 00 00 F4");
        cpu.step().unwrap();
        assert_eq!(cpu.trace(), "TRACE: 03 | 01 00 00 | 08 00 00 00 00 00 00 F4");

        cpu.state.set_pc(0xff);
        assert_eq!(cpu.trace(), "TRACE: FF | 00 -- -- | 08 00 00 00 00 00 00 F4");
    }

    #[test]
    fn test_run_with_callback_sees_every_instruction() {
        let mut cpu = CPU::new(Vec::new());
        cpu.load(0, &[LDI, 0, 8, PRN, 0, HLT]).unwrap();
        let mut pcs = vec![];
        cpu.run_with_callback(|cpu| pcs.push(cpu.state.get_pc()))
            .unwrap();
        assert_eq!(pcs, vec![0, 3, 5]);
    }
}
