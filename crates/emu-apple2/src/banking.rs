//! Bank-switch controller.
//!
//! Owns the bank-switch state and rewrites the page table whenever it
//! changes. Changes are applied incrementally: only the regions whose
//! controlling flags changed are repointed. `remap_all` rebuilds the whole
//! table from the state and produces the same result.
//!
//! # Regions
//!
//! | Range         | Controlled by                                       |
//! |---------------|-----------------------------------------------------|
//! | $0000-$01FF   | ALTZP                                               |
//! | $0200-$BFFF   | RAMRD, RAMWRT; 80STORE with PAGE2 (and HIRES)       |
//! | $C100-$C7FF   | INTCXROM, SLOTC3ROM                                 |
//! | $C800-$CFFF   | INTCXROM and the most recently selected slot        |
//! | $D000-$FFFF   | LCBANK2, LCREAD, LCWRITE, ALTZP                     |

use bitflags::bitflags;

use crate::config::Apple2Model;
use crate::memory::{AUX_BASE, LC_AUX_BASE, Mapping, Memory, ROM_BASE, Region};
use crate::pages::{Direction, PageTable};

bitflags! {
    /// Flags that decide the page table.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BankState: u16 {
        /// $D000-$DFFF uses language-card bank 2.
        const LC_BANK2 = 1 << 0;
        /// $D000-$FFFF reads language-card RAM instead of ROM.
        const LC_READ = 1 << 1;
        /// $D000-$FFFF writes go to language-card RAM.
        const LC_WRITE = 1 << 2;
        /// Zero page, stack and language card from aux memory.
        const ALTZP = 1 << 3;
        /// PAGE2 selects main or aux for the display pages.
        const STORE80 = 1 << 4;
        const RAMRD = 1 << 5;
        const RAMWRT = 1 << 6;
        const PAGE2 = 1 << 7;
        const HIRES = 1 << 8;
        /// Internal ROM at $C100-$CFFF.
        const INTCXROM = 1 << 9;
        /// Card ROM rather than internal firmware at $C300.
        const SLOTC3ROM = 1 << 10;
    }
}

/// Who the $C800-$CFFF window belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum C800Owner {
    /// Released. Reads fall through to RAM.
    #[default]
    None,
    /// IIe internal 80-column firmware.
    Internal,
    /// A card's expansion ROM.
    Slot(u8),
}

/// The bank-switch state and the rules that turn it into page mappings.
#[derive(Debug, Clone, Default)]
pub struct BankSwitch {
    state: BankState,
    /// Armed by an odd language-card read; the next odd read write-enables.
    pre_write: bool,
    c800: C800Owner,
}

impl BankSwitch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> BankState {
        self.state
    }

    #[must_use]
    pub fn pre_write(&self) -> bool {
        self.pre_write
    }

    #[must_use]
    pub fn c800_owner(&self) -> C800Owner {
        self.c800
    }

    /// Power-on and reset defaults, applied with a full remap.
    ///
    /// ROM is visible with bank 2 write-enabled and the pre-write latch
    /// armed. The II+ has no internal slot firmware, so its slot 3 always
    /// shows the card.
    pub fn reset(&mut self, pages: &mut PageTable, memory: &Memory, model: Apple2Model) {
        let mut state = BankState::LC_BANK2 | BankState::LC_WRITE;
        if !model.is_iie() {
            state |= BankState::SLOTC3ROM;
        }
        self.state = state;
        self.pre_write = true;
        self.c800 = C800Owner::None;
        self.remap_all(pages, memory);
        log::debug!("bank state reset to {state:?}");
    }

    pub fn set(&mut self, pages: &mut PageTable, memory: &Memory, bits: BankState) {
        self.update(pages, memory, self.state | bits);
    }

    pub fn clear(&mut self, pages: &mut PageTable, memory: &Memory, bits: BankState) {
        self.update(pages, memory, self.state - bits);
    }

    /// Move to `new`, repointing whatever it changes.
    pub fn update(&mut self, pages: &mut PageTable, memory: &Memory, new: BankState) {
        let old = self.state;
        if new == old {
            return;
        }
        self.state = new;
        log::debug!("bank state {old:?} -> {new:?}");
        self.apply(pages, memory, old, new);
    }

    /// Language-card soft switch at $C080-$C08F.
    ///
    /// A3 clear selects bank 2. A1/A0 of 00 or 11 read-enable RAM. Writing
    /// needs two odd reads in a row: an even access or any write disarms
    /// the pre-write latch, the first odd read arms it, and an odd read
    /// with the latch armed write-enables.
    pub fn language_card_access(
        &mut self,
        pages: &mut PageTable,
        memory: &Memory,
        address: u16,
        write: bool,
    ) {
        let mut new = self.state;
        new.set(BankState::LC_BANK2, address & 0x08 == 0);
        new.set(BankState::LC_READ, matches!(address & 0x03, 0 | 3));

        if address & 1 == 0 {
            self.pre_write = false;
            new.remove(BankState::LC_WRITE);
        } else if write {
            self.pre_write = false;
        } else {
            if self.pre_write {
                new.insert(BankState::LC_WRITE);
            }
            self.pre_write = true;
        }

        self.update(pages, memory, new);
    }

    /// An access to $C100-$C7FF.
    ///
    /// The most recently selected slot owns the $C800 window. Slot 3 with
    /// the internal firmware showing claims it for that firmware; any other
    /// slot claims it only if its card has an expansion ROM. Nothing
    /// changes while internal ROM covers the slot space.
    pub fn select_slot(&mut self, pages: &mut PageTable, memory: &Memory, address: u16) {
        if self.state.contains(BankState::INTCXROM) {
            return;
        }
        let slot = ((address >> 8) & 0x07) as u8;
        let owner = if slot == 3 && !self.state.contains(BankState::SLOTC3ROM) {
            C800Owner::Internal
        } else if memory.has_expansion_rom(slot) {
            C800Owner::Slot(slot)
        } else {
            return;
        };
        if owner == self.c800 {
            return;
        }
        log::debug!("$C800 window {:?} -> {owner:?}", self.c800);
        self.c800 = owner;
        self.map_c800(pages, memory, self.state);
    }

    /// $CFFF: give up the $C800 window.
    pub fn release_c800(&mut self, pages: &mut PageTable, memory: &Memory) {
        if self.c800 != C800Owner::None {
            log::debug!("$C800 window released");
        }
        self.c800 = C800Owner::None;
        self.map_c800(pages, memory, self.state);
    }

    /// Rebuild the table from scratch for the current state.
    pub fn remap_all(&self, pages: &mut PageTable, memory: &Memory) {
        *pages = PageTable::new();
        let state = self.state;
        map_zero_page(pages, state);
        map_main(pages, state);
        map_language_card_read(pages, state);
        map_language_card_write(pages, state);
        if state.contains(BankState::INTCXROM) {
            map_internal(pages, 0xC100, 0x0F00);
        } else {
            for slot in 1..=7 {
                if slot == 3 && !state.contains(BankState::SLOTC3ROM) {
                    map_internal(pages, 0xC300, 0x100);
                } else {
                    restore_slot_page(pages, memory, slot);
                }
            }
            self.map_c800(pages, memory, state);
        }
    }

    fn apply(&self, pages: &mut PageTable, memory: &Memory, old: BankState, new: BankState) {
        let changed = old ^ new;

        if changed.contains(BankState::ALTZP) {
            map_zero_page(pages, new);
        }
        if changed.intersects(
            BankState::RAMRD
                | BankState::RAMWRT
                | BankState::STORE80
                | BankState::PAGE2
                | BankState::HIRES,
        ) {
            map_main(pages, new);
        }
        if changed.intersects(BankState::LC_READ | BankState::LC_BANK2 | BankState::ALTZP) {
            map_language_card_read(pages, new);
        }
        if changed.intersects(BankState::LC_WRITE | BankState::LC_BANK2 | BankState::ALTZP) {
            map_language_card_write(pages, new);
        }
        if changed.contains(BankState::INTCXROM) {
            self.map_cxrom(pages, memory, new);
        }
        if changed.contains(BankState::SLOTC3ROM) {
            self.map_c3rom(pages, memory, new);
        }
    }

    fn map_cxrom(&self, pages: &mut PageTable, memory: &Memory, state: BankState) {
        if state.contains(BankState::INTCXROM) {
            map_internal(pages, 0xC100, 0x0F00);
            return;
        }
        for slot in [1, 2, 4, 5, 6, 7] {
            restore_slot_page(pages, memory, slot);
        }
        // Slot 3 keeps the internal firmware unless the card is selected
        if state.contains(BankState::SLOTC3ROM) {
            restore_slot_page(pages, memory, 3);
        }
        self.map_c800(pages, memory, state);
    }

    fn map_c3rom(&self, pages: &mut PageTable, memory: &Memory, state: BankState) {
        // INTCXROM already shows internal ROM across all of $C100-$CFFF
        if state.contains(BankState::INTCXROM) {
            return;
        }
        if state.contains(BankState::SLOTC3ROM) {
            restore_slot_page(pages, memory, 3);
        } else {
            map_internal(pages, 0xC300, 0x100);
        }
        self.map_c800(pages, memory, state);
    }

    fn map_c800(&self, pages: &mut PageTable, memory: &Memory, state: BankState) {
        if state.contains(BankState::INTCXROM) || self.c800 == C800Owner::Internal {
            map_internal(pages, 0xC800, 0x800);
            return;
        }
        if let C800Owner::Slot(slot) = self.c800 {
            if memory.has_expansion_rom(slot) {
                pages.map_rom(0xC800, 0x800, Mapping::new(Region::CardExpansion(slot), 0));
                return;
            }
        }
        pages.map_ram(Direction::Read, 0xC800, 0x800, 0xC800);
    }
}

fn aux_if(flag: bool, address: u16) -> usize {
    address as usize + if flag { AUX_BASE } else { 0 }
}

fn map_zero_page(pages: &mut PageTable, state: BankState) {
    let source = aux_if(state.contains(BankState::ALTZP), 0x0000);
    pages.map_ram(Direction::Read, 0x0000, 0x0200, source);
    pages.map_ram(Direction::Write, 0x0000, 0x0200, source);
}

fn map_main(pages: &mut PageTable, state: BankState) {
    pages.map_ram(
        Direction::Read,
        0x0200,
        0xBE00,
        aux_if(state.contains(BankState::RAMRD), 0x0200),
    );
    pages.map_ram(
        Direction::Write,
        0x0200,
        0xBE00,
        aux_if(state.contains(BankState::RAMWRT), 0x0200),
    );

    if state.contains(BankState::STORE80) {
        let page2 = state.contains(BankState::PAGE2);
        for direction in [Direction::Read, Direction::Write] {
            pages.map_ram(direction, 0x0400, 0x0400, aux_if(page2, 0x0400));
            if state.contains(BankState::HIRES) {
                pages.map_ram(direction, 0x2000, 0x2000, aux_if(page2, 0x2000));
            }
        }
    }
}

/// Offsets of the $D000 bank and the high 8K in language-card RAM.
fn language_card_sources(state: BankState) -> (usize, usize) {
    let aux = if state.contains(BankState::ALTZP) {
        LC_AUX_BASE
    } else {
        0
    };
    let bank = if state.contains(BankState::LC_BANK2) {
        0x1000
    } else {
        0x0000
    };
    (bank + aux, 0x2000 + aux)
}

fn map_language_card_read(pages: &mut PageTable, state: BankState) {
    if state.contains(BankState::LC_READ) {
        let (bank, high) = language_card_sources(state);
        pages.map_language_card(Direction::Read, 0xD000, 0x1000, bank);
        pages.map_language_card(Direction::Read, 0xE000, 0x2000, high);
    } else {
        map_internal(pages, 0xD000, 0x3000);
    }
}

fn map_language_card_write(pages: &mut PageTable, state: BankState) {
    if state.contains(BankState::LC_WRITE) {
        let (bank, high) = language_card_sources(state);
        pages.map_language_card(Direction::Write, 0xD000, 0x1000, bank);
        pages.map_language_card(Direction::Write, 0xE000, 0x2000, high);
    } else {
        // ROM writes land in main RAM and are never seen again
        pages.map_ram(Direction::Write, 0xD000, 0x3000, 0xD000);
    }
}

/// System ROM at its own address.
fn map_internal(pages: &mut PageTable, address: u16, length: usize) {
    pages.map_rom(
        address,
        length,
        Mapping::new(Region::Rom, (address - ROM_BASE) as usize),
    );
}

/// A slot's $Cn00 page as the card (or its absence) leaves it.
fn restore_slot_page(pages: &mut PageTable, memory: &Memory, slot: u8) {
    let address = 0xC000 | (u16::from(slot) << 8);
    if memory.has_card(slot) {
        pages.map_rom(address, 0x100, Mapping::new(Region::CardRom(slot), 0));
    } else {
        pages.map_ram(Direction::Read, address, 0x100, address as usize);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SlotCard;

    fn setup(model: Apple2Model) -> (BankSwitch, PageTable, Memory) {
        let mut memory = Memory::new(model, &vec![0; model.rom_size()]);
        memory.install_card(
            4,
            &SlotCard::Generic {
                rom: vec![0x44; 0x100],
                expansion_rom: Some(vec![0x48; 0x800]),
            },
        );
        let mut banks = BankSwitch::new();
        let mut pages = PageTable::new();
        banks.reset(&mut pages, &memory, model);
        (banks, pages, memory)
    }

    #[test]
    fn reset_shows_rom_and_arms_bank2_writes() {
        let (banks, pages, _) = setup(Apple2Model::Enhanced);
        assert_eq!(banks.state(), BankState::LC_BANK2 | BankState::LC_WRITE);
        assert!(banks.pre_write());
        assert_eq!(pages.read(0xD000), Mapping::new(Region::Rom, 0x1000));
        assert_eq!(
            pages.write(0xD000),
            Mapping::new(Region::LanguageCard, 0x1000)
        );
        assert_eq!(pages.write(0xE000), Mapping::new(Region::LanguageCard, 0x2000));
        assert_eq!(pages.read(0xC300), Mapping::new(Region::Rom, 0x300));
        assert_eq!(pages.read(0xC400), Mapping::new(Region::CardRom(4), 0));
        assert_eq!(pages.read(0xC800), Mapping::ram(0xC800));
    }

    #[test]
    fn plus_reset_shows_slot3_card() {
        let (banks, pages, _) = setup(Apple2Model::Plus);
        assert!(banks.state().contains(BankState::SLOTC3ROM));
        assert_eq!(pages.read(0xC300), Mapping::ram(0xC300));
    }

    #[test]
    fn bank1_read_write() {
        let (mut banks, mut pages, memory) = setup(Apple2Model::Enhanced);
        // $C08B twice: bank 1, read RAM, write RAM
        banks.language_card_access(&mut pages, &memory, 0xC08B, false);
        banks.language_card_access(&mut pages, &memory, 0xC08B, false);
        assert!(banks.state().contains(BankState::LC_READ | BankState::LC_WRITE));
        assert!(!banks.state().contains(BankState::LC_BANK2));
        assert_eq!(pages.read(0xD000), Mapping::new(Region::LanguageCard, 0));
        assert_eq!(pages.write(0xD800), Mapping::new(Region::LanguageCard, 0x800));
    }

    #[test]
    fn altzp_moves_language_card_to_aux() {
        let (mut banks, mut pages, memory) = setup(Apple2Model::Enhanced);
        banks.language_card_access(&mut pages, &memory, 0xC080, false);
        banks.set(&mut pages, &memory, BankState::ALTZP);
        assert_eq!(
            pages.read(0xD000),
            Mapping::new(Region::LanguageCard, 0x5000)
        );
        assert_eq!(
            pages.read(0xF000),
            Mapping::new(Region::LanguageCard, 0x7000)
        );
        assert_eq!(pages.read(0x0100), Mapping::ram(0x1_0100));
        assert_eq!(pages.write(0x0000), Mapping::ram(0x1_0000));
    }

    #[test]
    fn store80_follows_page2() {
        let (mut banks, mut pages, memory) = setup(Apple2Model::Enhanced);
        banks.set(&mut pages, &memory, BankState::STORE80 | BankState::PAGE2);
        assert_eq!(pages.read(0x0400), Mapping::ram(0x1_0400));
        assert_eq!(pages.write(0x07FF), Mapping::ram(0x1_0700));
        // Hires pages only follow with HIRES
        assert_eq!(pages.read(0x2000), Mapping::ram(0x2000));
        banks.set(&mut pages, &memory, BankState::HIRES);
        assert_eq!(pages.read(0x2000), Mapping::ram(0x1_2000));
        // RAMRD does not override the display page
        banks.clear(&mut pages, &memory, BankState::PAGE2);
        banks.set(&mut pages, &memory, BankState::RAMRD);
        assert_eq!(pages.read(0x0400), Mapping::ram(0x0400));
        assert_eq!(pages.read(0x0800), Mapping::ram(0x1_0800));
    }

    #[test]
    fn c800_follows_selected_slot() {
        let (mut banks, mut pages, memory) = setup(Apple2Model::Enhanced);
        banks.select_slot(&mut pages, &memory, 0xC400);
        assert_eq!(banks.c800_owner(), C800Owner::Slot(4));
        assert_eq!(
            pages.read(0xC800),
            Mapping::new(Region::CardExpansion(4), 0)
        );
        banks.release_c800(&mut pages, &memory);
        assert_eq!(banks.c800_owner(), C800Owner::None);
        assert_eq!(pages.read(0xC800), Mapping::ram(0xC800));
        // Slot 3 with internal firmware claims the window
        banks.select_slot(&mut pages, &memory, 0xC3FE);
        assert_eq!(banks.c800_owner(), C800Owner::Internal);
        assert_eq!(pages.read(0xCC00), Mapping::new(Region::Rom, 0xC00));
    }

    #[test]
    fn most_recent_slot_owns_window() {
        let (mut banks, mut pages, mut memory) = setup(Apple2Model::Enhanced);
        memory.install_card(
            5,
            &SlotCard::Generic {
                rom: vec![0x55; 0x100],
                expansion_rom: Some(vec![0x58; 0x800]),
            },
        );
        banks.select_slot(&mut pages, &memory, 0xC400);
        banks.select_slot(&mut pages, &memory, 0xC500);
        assert_eq!(banks.c800_owner(), C800Owner::Slot(5));
        assert_eq!(
            pages.read(0xC800),
            Mapping::new(Region::CardExpansion(5), 0)
        );
        // Internal slot 3 firmware takes it over the same way
        banks.select_slot(&mut pages, &memory, 0xC300);
        assert_eq!(banks.c800_owner(), C800Owner::Internal);
        // A card without an expansion ROM leaves the owner alone
        banks.select_slot(&mut pages, &memory, 0xC600);
        assert_eq!(banks.c800_owner(), C800Owner::Internal);
    }

    #[test]
    fn intcxrom_freezes_window_owner() {
        let (mut banks, mut pages, memory) = setup(Apple2Model::Enhanced);
        banks.set(&mut pages, &memory, BankState::INTCXROM);
        banks.select_slot(&mut pages, &memory, 0xC400);
        assert_eq!(banks.c800_owner(), C800Owner::None);
    }

    #[test]
    fn slot_without_expansion_rom_leaves_window() {
        let (mut banks, mut pages, memory) = setup(Apple2Model::Enhanced);
        banks.select_slot(&mut pages, &memory, 0xC600);
        assert_eq!(banks.c800_owner(), C800Owner::None);
    }

    #[test]
    fn intcxrom_round_trip() {
        let (mut banks, mut pages, memory) = setup(Apple2Model::Enhanced);
        let before = pages.clone();
        banks.set(&mut pages, &memory, BankState::INTCXROM);
        assert_eq!(pages.read(0xC400), Mapping::new(Region::Rom, 0x400));
        assert_eq!(pages.read(0xCF00), Mapping::new(Region::Rom, 0xF00));
        banks.clear(&mut pages, &memory, BankState::INTCXROM);
        assert_eq!(pages, before);
    }

    #[test]
    fn slotc3rom_under_intcxrom_stays_internal() {
        let (mut banks, mut pages, memory) = setup(Apple2Model::Enhanced);
        banks.set(&mut pages, &memory, BankState::INTCXROM);
        banks.set(&mut pages, &memory, BankState::SLOTC3ROM);
        assert_eq!(pages.read(0xC300), Mapping::new(Region::Rom, 0x300));
        banks.clear(&mut pages, &memory, BankState::INTCXROM);
        assert_eq!(pages.read(0xC300), Mapping::ram(0xC300));
    }
}
