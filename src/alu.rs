use crate::error::{Ls8Error, Result};
use crate::flags::Flags;
use crate::opcodes::Instruction;

/// What the ALU hands back: a value for the destination register, or new flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOutput {
    Register(u8),
    Flags(Flags),
}

pub fn alu(op: Instruction, a: u8, b: u8) -> Result<AluOutput> {
    match op {
        Instruction::Add => Ok(AluOutput::Register(a.wrapping_add(b))),
        Instruction::Sub => Ok(AluOutput::Register(a.wrapping_sub(b))),
        Instruction::Mul => Ok(AluOutput::Register(a.wrapping_mul(b))),
        Instruction::Cmp => Ok(AluOutput::Flags(compare(a, b))),
        other => Err(Ls8Error::UnsupportedOperation(other)),
    }
}

// Starts from a cleared register so exactly one bit ends up set.
fn compare(a: u8, b: u8) -> Flags {
    let mut flags = Flags::new();
    if a == b {
        flags.insert(Flags::EQUAL);
    } else if a > b {
        flags.insert(Flags::GREATER);
    } else {
        flags.insert(Flags::LESS);
    }
    flags
}
