//! Memory and I/O bus interface.

/// Memory and I/O bus interface.
///
/// The CPU performs every memory access through this trait, one call per
/// cycle. The implementor decides what lives at each address: RAM, ROM,
/// bank-switched memory or a soft switch with side effects.
pub trait Bus {
    /// Read a byte from the given address.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);
}

/// A flat 64K RAM bus with no side effects.
///
/// Used by CPU tests and by anything that wants a plain memory image.
#[derive(Clone)]
pub struct SimpleBus {
    memory: Box<[u8; 0x10000]>,
}

impl SimpleBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            memory: Box::new([0; 0x10000]),
        }
    }

    /// Copy `data` into memory starting at `address`, wrapping at $FFFF.
    pub fn load(&mut self, address: u16, data: &[u8]) {
        let mut addr = address;
        for &byte in data {
            self.memory[addr as usize] = byte;
            addr = addr.wrapping_add(1);
        }
    }

    /// Read without counting as a bus access.
    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        self.memory[address as usize]
    }

    /// Write without counting as a bus access.
    pub fn poke(&mut self, address: u16, value: u8) {
        self.memory[address as usize] = value;
    }
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for SimpleBus {
    fn read(&mut self, address: u16) -> u8 {
        self.memory[address as usize]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.memory[address as usize] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_wraps_at_top_of_memory() {
        let mut bus = SimpleBus::new();
        bus.load(0xFFFF, &[0x11, 0x22]);
        assert_eq!(bus.peek(0xFFFF), 0x11);
        assert_eq!(bus.peek(0x0000), 0x22);
    }

    #[test]
    fn read_returns_written_value() {
        let mut bus = SimpleBus::new();
        bus.write(0x1234, 0x5A);
        assert_eq!(bus.read(0x1234), 0x5A);
    }
}
