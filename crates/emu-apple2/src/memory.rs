//! Physical backing buffers.
//!
//! Everything the page table can point at lives here, allocated once when
//! the machine is built:
//!
//! | Buffer         | Size       | Notes                                     |
//! |----------------|------------|-------------------------------------------|
//! | RAM            | 64K / 128K | Main at $0_0000, IIe aux at $1_0000       |
//! | Language card  | 32K        | Bank 1, bank 2, high 8K; aux copy at $4000 |
//! | System ROM     | 16K        | Image positioned from $C000               |
//! | Card ROMs      | 256 + 2K   | Per slot firmware and expansion ROM       |
//!
//! RAM and language-card bytes each carry a watch byte and a last-writer
//! record. ROM has neither: a ROM page borrows the RAM watch at the same
//! CPU address.

use crate::config::{Apple2Model, SlotCard};
use crate::hooks::Watch;
use crate::softswitch::FLOATING_BUS;

/// Bytes per page-table entry.
pub const PAGE_SIZE: usize = 0x100;
/// Offset of auxiliary RAM inside the RAM buffer.
pub const AUX_BASE: usize = 0x1_0000;
/// Offset of the auxiliary copy inside the language-card buffer.
pub const LC_AUX_BASE: usize = 0x4000;
/// Two 16K language cards: main and auxiliary.
pub const LANGUAGE_CARD_SIZE: usize = 0x8000;
/// The system ROM buffer spans $C000-$FFFF.
pub const ROM_BASE: u16 = 0xC000;

const ROM_BUFFER_SIZE: usize = 0x4000;

/// A backing buffer the page table can point into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Main and auxiliary RAM.
    Ram,
    /// Language-card RAM.
    LanguageCard,
    /// System ROM, offset from $C000.
    Rom,
    /// A card's $Cn00 firmware page.
    CardRom(u8),
    /// A card's $C800 expansion ROM.
    CardExpansion(u8),
}

/// A page-aligned window into one buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub region: Region,
    pub base: usize,
}

impl Mapping {
    #[must_use]
    pub const fn new(region: Region, base: usize) -> Self {
        Self { region, base }
    }

    #[must_use]
    pub const fn ram(base: usize) -> Self {
        Self::new(Region::Ram, base)
    }

    /// The window one page further on.
    #[must_use]
    pub const fn next_page(self) -> Self {
        Self::new(self.region, self.base + PAGE_SIZE)
    }

    /// Whether this window has watch and last-write bytes of its own.
    #[must_use]
    pub const fn is_writable(self) -> bool {
        matches!(self.region, Region::Ram | Region::LanguageCard)
    }
}

struct CardRoms {
    firmware: Vec<u8>,
    expansion: Option<Vec<u8>>,
}

/// All RAM, ROM and per-byte bookkeeping of one machine.
pub struct Memory {
    ram: Vec<u8>,
    ram_watch: Vec<Watch>,
    ram_last_write: Vec<u32>,
    language_card: Vec<u8>,
    lc_watch: Vec<Watch>,
    lc_last_write: Vec<u32>,
    rom: Vec<u8>,
    cards: [Option<CardRoms>; 8],
}

impl Memory {
    /// Allocate and fill the buffers for `model`.
    ///
    /// The ROM image must already have been size-checked. A II+ image is
    /// placed at $D000, a IIe image at $C000.
    #[must_use]
    pub fn new(model: Apple2Model, rom_image: &[u8]) -> Self {
        let ram_size = model.ram_size();

        let mut rom = vec![0; ROM_BUFFER_SIZE];
        let start = ROM_BUFFER_SIZE - rom_image.len().min(ROM_BUFFER_SIZE);
        rom[start..].copy_from_slice(&rom_image[..ROM_BUFFER_SIZE - start]);

        let mut memory = Self {
            ram: power_on_pattern(ram_size),
            ram_watch: vec![Watch::empty(); ram_size],
            ram_last_write: vec![0; ram_size],
            language_card: power_on_pattern(LANGUAGE_CARD_SIZE),
            lc_watch: vec![Watch::empty(); LANGUAGE_CARD_SIZE],
            lc_last_write: vec![0; LANGUAGE_CARD_SIZE],
            rom,
            cards: Default::default(),
        };

        // Nothing drives $C001-$CFFE when no ROM is mapped there
        memory.ram[0xC001..0xCFFF].fill(FLOATING_BUS);
        if ram_size > AUX_BASE {
            memory.ram[AUX_BASE + 0xC001..AUX_BASE + 0xCFFF].fill(FLOATING_BUS);
        }
        memory
    }

    /// Attach a card's ROMs to `slot`.
    pub fn install_card(&mut self, slot: u8, card: &SlotCard) {
        self.cards[slot as usize & 7] = Some(CardRoms {
            firmware: card.rom().to_vec(),
            expansion: card.expansion_rom().map(<[u8]>::to_vec),
        });
    }

    #[must_use]
    pub fn has_card(&self, slot: u8) -> bool {
        self.cards[slot as usize & 7].is_some()
    }

    #[must_use]
    pub fn has_expansion_rom(&self, slot: u8) -> bool {
        self.cards[slot as usize & 7]
            .as_ref()
            .is_some_and(|card| card.expansion.is_some())
    }

    #[must_use]
    pub fn read(&self, mapping: Mapping, offset: usize) -> u8 {
        let index = mapping.base + offset;
        match mapping.region {
            Region::Ram => self.ram[index],
            Region::LanguageCard => self.language_card[index],
            Region::Rom => self.rom[index],
            Region::CardRom(slot) => self.cards[slot as usize & 7]
                .as_ref()
                .map_or(FLOATING_BUS, |card| card.firmware[index]),
            Region::CardExpansion(slot) => self.cards[slot as usize & 7]
                .as_ref()
                .and_then(|card| card.expansion.as_ref())
                .map_or(FLOATING_BUS, |rom| rom[index]),
        }
    }

    /// Store a byte. ROM regions ignore the write.
    pub fn write(&mut self, mapping: Mapping, offset: usize, value: u8) {
        let index = mapping.base + offset;
        match mapping.region {
            Region::Ram => self.ram[index] = value,
            Region::LanguageCard => self.language_card[index] = value,
            Region::Rom | Region::CardRom(_) | Region::CardExpansion(_) => {}
        }
    }

    #[must_use]
    pub fn watch(&self, mapping: Mapping, offset: usize) -> Watch {
        let index = mapping.base + offset;
        match mapping.region {
            Region::Ram => self.ram_watch[index],
            Region::LanguageCard => self.lc_watch[index],
            _ => Watch::empty(),
        }
    }

    pub fn insert_watch(&mut self, mapping: Mapping, offset: usize, flags: Watch) {
        let index = mapping.base + offset;
        match mapping.region {
            Region::Ram => self.ram_watch[index].insert(flags),
            Region::LanguageCard => self.lc_watch[index].insert(flags),
            _ => {}
        }
    }

    pub fn remove_watch(&mut self, mapping: Mapping, offset: usize, flags: Watch) {
        let index = mapping.base + offset;
        match mapping.region {
            Region::Ram => self.ram_watch[index].remove(flags),
            Region::LanguageCard => self.lc_watch[index].remove(flags),
            _ => {}
        }
    }

    /// Flag `length` main-RAM watch bytes starting at `address`.
    pub fn watch_range(&mut self, address: u16, length: usize, flags: Watch) {
        let start = address as usize;
        for watch in &mut self.ram_watch[start..start + length] {
            watch.insert(flags);
        }
    }

    /// Shift the writer's PC into the byte's two-deep history.
    pub fn record_write(&mut self, mapping: Mapping, offset: usize, pc: u16) {
        let index = mapping.base + offset;
        let history = match mapping.region {
            Region::Ram => &mut self.ram_last_write[index],
            Region::LanguageCard => &mut self.lc_last_write[index],
            _ => return,
        };
        *history = (*history << 16) | u32::from(pc);
    }

    /// Writer PCs of the last two stores: most recent in the low half.
    #[must_use]
    pub fn last_write(&self, mapping: Mapping, offset: usize) -> u32 {
        let index = mapping.base + offset;
        match mapping.region {
            Region::Ram => self.ram_last_write[index],
            Region::LanguageCard => self.lc_last_write[index],
            _ => 0,
        }
    }

    /// Main and auxiliary RAM as one slice.
    #[must_use]
    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    pub fn ram_mut(&mut self) -> &mut [u8] {
        &mut self.ram
    }

    #[must_use]
    pub fn language_card(&self) -> &[u8] {
        &self.language_card
    }
}

/// RAM powers on as repeating $FF,$FF,$00,$00.
fn power_on_pattern(size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| if i & 2 == 0 { 0xFF } else { 0x00 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iie() -> Memory {
        Memory::new(Apple2Model::Enhanced, &[0xEE; 0x4000])
    }

    #[test]
    fn power_on_fill() {
        let memory = iie();
        assert_eq!(&memory.ram()[..8], &[0xFF, 0xFF, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00]);
        assert_eq!(&memory.language_card()[..4], &[0xFF, 0xFF, 0x00, 0x00]);
    }

    #[test]
    fn io_area_floats_in_both_banks() {
        let memory = iie();
        assert_eq!(memory.ram()[0xC000], 0xFF);
        assert_eq!(memory.ram()[0xC001], FLOATING_BUS);
        assert_eq!(memory.ram()[0xCFFE], FLOATING_BUS);
        assert_eq!(memory.ram()[0xCFFF], 0x00);
        assert_eq!(memory.ram()[AUX_BASE + 0xC800], FLOATING_BUS);
    }

    #[test]
    fn plus_rom_sits_at_d000() {
        let mut image = vec![0x11; 0x3000];
        image[0x2FFC] = 0x62;
        let memory = Memory::new(Apple2Model::Plus, &image);
        let reset_lo = Mapping::new(Region::Rom, 0x3F00);
        assert_eq!(memory.read(reset_lo, 0xFC), 0x62);
        assert_eq!(memory.read(Mapping::new(Region::Rom, 0x1000), 0), 0x11);
        assert_eq!(memory.ram().len(), 0x1_0000);
    }

    #[test]
    fn rom_ignores_writes() {
        let mut memory = iie();
        let rom = Mapping::new(Region::Rom, 0x1000);
        memory.write(rom, 0, 0x00);
        assert_eq!(memory.read(rom, 0), 0xEE);
    }

    #[test]
    fn last_write_keeps_two_writers() {
        let mut memory = iie();
        let page = Mapping::ram(0x0300);
        memory.record_write(page, 0x10, 0x1234);
        memory.record_write(page, 0x10, 0x5678);
        assert_eq!(memory.last_write(page, 0x10), 0x1234_5678);
        memory.record_write(page, 0x10, 0x9ABC);
        assert_eq!(memory.last_write(page, 0x10), 0x5678_9ABC);
    }

    #[test]
    fn watch_is_per_buffer() {
        let mut memory = iie();
        let lc = Mapping::new(Region::LanguageCard, 0x1000);
        memory.insert_watch(lc, 5, Watch::READ_BREAKPOINT);
        assert_eq!(memory.watch(lc, 5), Watch::READ_BREAKPOINT);
        assert!(memory.watch(Mapping::ram(0xD000), 5).is_empty());
        memory.remove_watch(lc, 5, Watch::BREAKPOINTS);
        assert!(memory.watch(lc, 5).is_empty());
    }

    #[test]
    fn card_roms_resolve() {
        let mut memory = iie();
        let card = SlotCard::Generic {
            rom: vec![0x42; 0x100],
            expansion_rom: Some(vec![0x43; 0x800]),
        };
        memory.install_card(4, &card);
        assert!(memory.has_card(4));
        assert!(memory.has_expansion_rom(4));
        assert!(!memory.has_card(5));
        assert_eq!(memory.read(Mapping::new(Region::CardRom(4), 0), 0x80), 0x42);
        assert_eq!(
            memory.read(Mapping::new(Region::CardExpansion(4), 0x700), 0xFF),
            0x43
        );
        assert_eq!(
            memory.read(Mapping::new(Region::CardRom(5), 0), 0),
            FLOATING_BUS
        );
    }
}
