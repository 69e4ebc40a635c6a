use std::io;

use crate::opcodes::Instruction;

/// Which part of the machine an out-of-range index was aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Memory,
    Register,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Memory => write!(f, "memory address"),
            Location::Register => write!(f, "register index"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Ls8Error {
    /// A memory address or register index outside the machine.
    #[error("{location} {index:#04x} out of bounds (limit {limit})")]
    OutOfBounds {
        location: Location,
        index: usize,
        limit: usize,
    },
    /// The ALU was handed an instruction it does not compute.
    #[error("unsupported ALU operation: {0:?}")]
    UnsupportedOperation(Instruction),
    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),
    #[error("failed to read program: {0}")]
    Io(#[from] io::Error),
    /// A program line that is not an 8-bit binary literal.
    #[error("line {line}: invalid instruction word {text:?}")]
    Parse { line: usize, text: String },
}

pub type Result<T> = std::result::Result<T, Ls8Error>;
