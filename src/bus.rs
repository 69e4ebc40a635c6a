use crate::error::{Location, Ls8Error, Result};

pub const MEMORY_SIZE: usize = 256;

pub trait Mem {
    fn mem_read(&self, addr: u16) -> Result<u8>;

    fn mem_write(&mut self, addr: u16, data: u8) -> Result<()>;

    /// Writes `data` contiguously from `base`.
    fn mem_write_slice(&mut self, base: u16, data: &[u8]) -> Result<()> {
        for (offset, byte) in data.iter().enumerate() {
            let addr = (base as usize) + offset;
            let addr = u16::try_from(addr).map_err(|_| out_of_bounds(addr))?;
            self.mem_write(addr, *byte)?;
        }
        Ok(())
    }
}

pub(crate) fn out_of_bounds(addr: usize) -> Ls8Error {
    Ls8Error::OutOfBounds {
        location: Location::Memory,
        index: addr,
        limit: MEMORY_SIZE,
    }
}

/// The machine's RAM. Every address is bounds-checked, nothing is mirrored.
pub struct Bus {
    ram: [u8; MEMORY_SIZE],
}

impl Bus {
    pub fn new() -> Self {
        Bus {
            ram: [0; MEMORY_SIZE],
        }
    }

    pub fn ram(&self) -> &[u8; MEMORY_SIZE] {
        &self.ram
    }
}

impl Default for Bus {
    fn default() -> Self {
        Bus::new()
    }
}

impl Mem for Bus {
    fn mem_read(&self, addr: u16) -> Result<u8> {
        self.ram
            .get(addr as usize)
            .copied()
            .ok_or_else(|| out_of_bounds(addr as usize))
    }

    fn mem_write(&mut self, addr: u16, data: u8) -> Result<()> {
        let slot = self
            .ram
            .get_mut(addr as usize)
            .ok_or_else(|| out_of_bounds(addr as usize))?;
        *slot = data;
        Ok(())
    }

    fn mem_write_slice(&mut self, base: u16, data: &[u8]) -> Result<()> {
        let start = base as usize;
        let end = start + data.len();
        if end > MEMORY_SIZE {
            // report the first address that does not fit
            return Err(out_of_bounds(start.max(MEMORY_SIZE)));
        }
        self.ram[start..end].copy_from_slice(data);
        Ok(())
    }
}
