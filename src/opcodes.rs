use std::collections::HashMap;

use once_cell::sync::Lazy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    Hlt,
    Ldi,
    Prn,
    Push,
    Pop,
    Cmp,
    Jmp,
    Jeq,
    Jne,
    Add,
    Sub,
    Mul,
}

pub struct OpCode {
    pub code: u8,
    pub mnemonic: &'static str,
    pub len: u8,
    pub instruction: Instruction,
}

impl OpCode {
    fn new(code: u8, mnemonic: &'static str, len: u8, instruction: Instruction) -> Self {
        OpCode {
            code: code,
            mnemonic: mnemonic,
            len: len,
            instruction: instruction,
        }
    }

    pub fn operand_count(&self) -> u8 {
        self.len - 1
    }
}

/// Number of operand bytes following `code`, taken from its two high bits.
pub fn operand_count(code: u8) -> u8 {
    (code >> 6) & 0b11
}

pub static CPU_OPS_CODES: Lazy<Vec<OpCode>> = Lazy::new(|| {
    vec![
        OpCode::new(0b0000_0001, "HLT", 1, Instruction::Hlt),
        OpCode::new(0b1000_0010, "LDI", 3, Instruction::Ldi),
        OpCode::new(0b0100_0111, "PRN", 2, Instruction::Prn),
        /* Stack */
        OpCode::new(0b0100_0101, "PUSH", 2, Instruction::Push),
        OpCode::new(0b0100_0110, "POP", 2, Instruction::Pop),
        /* ALU */
        OpCode::new(0b1010_0000, "ADD", 3, Instruction::Add),
        OpCode::new(0b1010_0001, "SUB", 3, Instruction::Sub),
        OpCode::new(0b1010_0010, "MUL", 3, Instruction::Mul),
        OpCode::new(0b1010_0111, "CMP", 3, Instruction::Cmp),
        /* Jumps */
        OpCode::new(0b0101_0100, "JMP", 2, Instruction::Jmp),
        OpCode::new(0b0101_0101, "JEQ", 2, Instruction::Jeq),
        OpCode::new(0b0101_0110, "JNE", 2, Instruction::Jne),
    ]
});

pub static OPCODES_MAP: Lazy<HashMap<u8, &'static OpCode>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for cpuop in CPU_OPS_CODES.iter() {
        map.insert(cpuop.code, cpuop);
    }
    map
});
