//! Register file, program counter and flags around the memory [`Bus`].
//!
//! Nothing here knows about instructions; the CPU drives every mutation.

use crate::bus::{Bus, Mem, MEMORY_SIZE};
use crate::error::{Location, Ls8Error, Result};
use crate::flags::Flags;

pub const REGISTER_COUNT: usize = 8;
/// R7 doubles as the stack pointer.
pub const STACK_POINTER: u8 = 7;
pub const STACK_POINTER_INIT: u8 = 0xf4;

pub struct MachineState {
    pub bus: Bus,
    registers: [u8; REGISTER_COUNT],
    program_counter: u16,
    flags: Flags,
}

impl MachineState {
    pub fn new() -> Self {
        let mut registers = [0; REGISTER_COUNT];
        registers[STACK_POINTER as usize] = STACK_POINTER_INIT;
        MachineState {
            bus: Bus::new(),
            registers: registers,
            program_counter: 0,
            flags: Flags::new(),
        }
    }

    pub fn read_byte(&self, address: u16) -> Result<u8> {
        self.bus.mem_read(address)
    }

    pub fn write_byte(&mut self, address: u16, value: u8) -> Result<()> {
        self.bus.mem_write(address, value)
    }

    pub fn get_register(&self, index: u8) -> Result<u8> {
        self.registers
            .get(index as usize)
            .copied()
            .ok_or(Ls8Error::OutOfBounds {
                location: Location::Register,
                index: index as usize,
                limit: REGISTER_COUNT,
            })
    }

    pub fn set_register(&mut self, index: u8, value: u8) -> Result<()> {
        let slot = self
            .registers
            .get_mut(index as usize)
            .ok_or(Ls8Error::OutOfBounds {
                location: Location::Register,
                index: index as usize,
                limit: REGISTER_COUNT,
            })?;
        *slot = value;
        Ok(())
    }

    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.registers
    }

    pub fn stack_pointer(&self) -> u8 {
        self.registers[STACK_POINTER as usize]
    }

    pub fn set_stack_pointer(&mut self, value: u8) {
        self.registers[STACK_POINTER as usize] = value;
    }

    pub fn get_flags(&self) -> Flags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: Flags) {
        self.flags = flags;
    }

    pub fn get_pc(&self) -> u16 {
        self.program_counter
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.program_counter = pc;
    }

    pub fn memory(&self) -> &[u8; MEMORY_SIZE] {
        self.bus.ram()
    }
}

impl Default for MachineState {
    fn default() -> Self {
        MachineState::new()
    }
}

impl Mem for MachineState {
    fn mem_read(&self, addr: u16) -> Result<u8> {
        self.bus.mem_read(addr)
    }

    fn mem_write(&mut self, addr: u16, data: u8) -> Result<()> {
        self.bus.mem_write(addr, data)
    }

    fn mem_write_slice(&mut self, base: u16, data: &[u8]) -> Result<()> {
        self.bus.mem_write_slice(base, data)
    }
}
