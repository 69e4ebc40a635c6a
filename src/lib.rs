//! # LS-8
//! An emulator for the LS-8, an 8-bit machine with 256 bytes of memory, eight
//! registers (R7 doubling as the stack pointer) and a compare-flags register.
//!
//! The [`cpu::CPU`] fetches, decodes and executes instructions against a
//! [`state::MachineState`]. Programs are plain byte images; [`loader`] turns the
//! textual `.ls8` format into one.
//!
//! ```rust
//! use ls8::cpu::CPU;
//!
//! let mut cpu = CPU::new(Vec::new());
//! cpu.load_and_run(&[
//!     0b1000_0010, 0, 8, // LDI R0,8
//!     0b0100_0111, 0,    // PRN R0
//!     0b0000_0001,       // HLT
//! ])
//! .unwrap();
//! assert_eq!(cpu.output, b"8\n");
//! ```

pub mod alu;
pub mod bus;
pub mod cpu;
pub mod error;
pub mod flags;
pub mod loader;
pub mod opcodes;
pub mod state;

pub use cpu::{Output, RunState, CPU};
pub use error::{Ls8Error, Result};
