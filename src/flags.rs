use bitflags::bitflags;

bitflags! {
  /// Condition codes written by `CMP` and read by the conditional jumps.
  pub struct Flags: u8 {
    const EQUAL = 0b0000_0001;
    const GREATER = 0b0000_0010;
    const LESS = 0b0000_0100;
  }
}

impl Flags {
    pub fn new() -> Self {
        Flags::from_bits_truncate(0b0000_0000)
    }

    pub fn is_equal(&self) -> bool {
        self.contains(Flags::EQUAL)
    }

    pub fn is_greater(&self) -> bool {
        self.contains(Flags::GREATER)
    }

    pub fn is_less(&self) -> bool {
        self.contains(Flags::LESS)
    }

    // Undefined bits are dropped.
    pub fn update(&mut self, data: u8) {
        self.bits = data & Flags::all().bits;
    }
}

impl Default for Flags {
    fn default() -> Self {
        Flags::new()
    }
}
