//! The page table.
//!
//! 256 read entries and 256 write entries, each a window into a backing
//! buffer. Read and write entries for the same page may point at
//! different buffers: with the language card write-enabled but not
//! read-enabled, $D000 reads ROM and writes RAM. Read entries carry a
//! separate watch window so a ROM page can still be watched through the
//! RAM beneath it.

use crate::memory::{Mapping, PAGE_SIZE, Region};

const PAGES: usize = 0x100;

/// Which half of the table a mapping call touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// Read and write page mappings for the 64K CPU address space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTable {
    read: [Mapping; PAGES],
    read_watch: [Mapping; PAGES],
    write: [Mapping; PAGES],
}

impl PageTable {
    /// Every page reads and writes main RAM at its own address.
    #[must_use]
    pub fn new() -> Self {
        let identity = std::array::from_fn(|page| Mapping::ram(page * PAGE_SIZE));
        Self {
            read: identity,
            read_watch: identity,
            write: identity,
        }
    }

    /// Where a read of `address` lands.
    #[must_use]
    pub fn read(&self, address: u16) -> Mapping {
        self.read[page_of(address)]
    }

    /// Which watch bytes a read of `address` consults.
    #[must_use]
    pub fn read_watch(&self, address: u16) -> Mapping {
        self.read_watch[page_of(address)]
    }

    /// Where a write of `address` lands. Always RAM or language card, so
    /// it doubles as the write watch.
    #[must_use]
    pub fn write(&self, address: u16) -> Mapping {
        self.write[page_of(address)]
    }

    /// Point `length` bytes at `address` to RAM starting at `source`.
    ///
    /// `source` is a RAM buffer offset, so aux RAM is `$1_0000 + address`.
    pub fn map_ram(&mut self, direction: Direction, address: u16, length: usize, source: usize) {
        self.map(direction, address, length, Mapping::ram(source));
    }

    /// Point `length` bytes at `address` to language-card RAM at `source`.
    pub fn map_language_card(
        &mut self,
        direction: Direction,
        address: u16,
        length: usize,
        source: usize,
    ) {
        self.map(
            direction,
            address,
            length,
            Mapping::new(Region::LanguageCard, source),
        );
    }

    /// Overlay ROM for reads. Writes and watches still see main RAM.
    pub fn map_rom(&mut self, address: u16, length: usize, rom: Mapping) {
        let first = page_of(address);
        let mut window = rom;
        let mut watch = Mapping::ram(address as usize);
        for page in first..first + length / PAGE_SIZE {
            self.read[page] = window;
            self.read_watch[page] = watch;
            window = window.next_page();
            watch = watch.next_page();
        }
    }

    fn map(&mut self, direction: Direction, address: u16, length: usize, source: Mapping) {
        let first = page_of(address);
        let mut window = source;
        for page in first..first + length / PAGE_SIZE {
            match direction {
                Direction::Read => {
                    self.read[page] = window;
                    self.read_watch[page] = window;
                }
                Direction::Write => self.write[page] = window,
            }
            window = window.next_page();
        }
    }
}

impl Default for PageTable {
    fn default() -> Self {
        Self::new()
    }
}

fn page_of(address: u16) -> usize {
    address as usize / PAGE_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_as_identity() {
        let pages = PageTable::new();
        assert_eq!(pages.read(0x1234), Mapping::ram(0x1200));
        assert_eq!(pages.write(0xFFFF), Mapping::ram(0xFF00));
    }

    #[test]
    fn aux_ram_mapping() {
        let mut pages = PageTable::new();
        pages.map_ram(Direction::Read, 0x0200, 0xBE00, 0x1_0200);
        assert_eq!(pages.read(0x0200), Mapping::ram(0x1_0200));
        assert_eq!(pages.read(0xBFFF), Mapping::ram(0x1_BF00));
        assert_eq!(pages.read(0xC000), Mapping::ram(0xC000));
        // Writes untouched
        assert_eq!(pages.write(0x0200), Mapping::ram(0x0200));
    }

    #[test]
    fn rom_watch_stays_on_ram() {
        let mut pages = PageTable::new();
        pages.map_rom(0xD000, 0x3000, Mapping::new(Region::Rom, 0x1000));
        assert_eq!(pages.read(0xE000), Mapping::new(Region::Rom, 0x2000));
        assert_eq!(pages.read_watch(0xE000), Mapping::ram(0xE000));
        assert_eq!(pages.write(0xE000), Mapping::ram(0xE000));
    }

    #[test]
    fn read_and_write_diverge() {
        let mut pages = PageTable::new();
        pages.map_rom(0xD000, 0x1000, Mapping::new(Region::Rom, 0x1000));
        pages.map_language_card(Direction::Write, 0xD000, 0x1000, 0x1000);
        assert_eq!(pages.read(0xD000).region, Region::Rom);
        assert_eq!(
            pages.write(0xD000),
            Mapping::new(Region::LanguageCard, 0x1000)
        );
    }
}
