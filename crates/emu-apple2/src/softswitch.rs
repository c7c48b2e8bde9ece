//! Soft-switch dispatcher.
//!
//! Every byte flagged `Watch::IO_PORT` lands here instead of in memory.
//! The $C000 page is decoded per model; $C100-$C7FF and $CFFF steer the
//! $C800 window.
//!
//! | Range         | Read                        | Write                   |
//! |---------------|-----------------------------|-------------------------|
//! | $C000-$C00F   | keyboard latch              | IIe memory/video modes  |
//! | $C010         | strobe clear                | strobe clear            |
//! | $C011-$C01F   | IIe status in bit 7         | strobe clear            |
//! | $C030-$C03F   | speaker                     | speaker                 |
//! | $C050-$C057   | TEXT/MIXED/PAGE2/HIRES      | same                    |
//! | $C05E-$C05F   | IIe DHIRES                  | same                    |
//! | $C061-$C067   | buttons, paddles            | -                       |
//! | $C070-$C07F   | paddle trigger              | paddle trigger          |
//! | $C080-$C08F   | language card               | language card           |
//! | $C090-$C0FF   | slot device select          | slot device select      |

use bitflags::bitflags;

use crate::banking::BankState;
use crate::bus::Apple2Bus;
use crate::hooks::Peripherals;

/// What an undriven read returns.
pub const FLOATING_BUS: u8 = 0xA0;

/// NTSC frame: 262 lines of 65 cycles.
pub const CYCLES_PER_FRAME: u64 = 17_030;
/// First vertical-blank cycle within a frame.
pub const VBL_START: u64 = 15_665;

/// Releases the $C800 window.
pub const CLRROM: u16 = 0xCFFF;

bitflags! {
    /// Display modes that do not affect memory mapping. PAGE2 and HIRES
    /// live in `BankState` because 80STORE banks on them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct VideoFlags: u8 {
        const TEXT = 1 << 0;
        const MIXED = 1 << 1;
        const COL80 = 1 << 2;
        const ALTCHAR = 1 << 3;
        const DHIRES = 1 << 4;
    }
}

/// Keyboard latch and display mode switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftSwitches {
    pub video: VideoFlags,
    /// Last key in bits 0-6, bit 7 set until the strobe is cleared.
    pub keyboard: u8,
}

impl SoftSwitches {
    #[must_use]
    pub fn new() -> Self {
        Self {
            video: VideoFlags::TEXT,
            keyboard: 0,
        }
    }

    /// Back to text mode. The keyboard latch survives.
    pub fn reset(&mut self) {
        self.video = VideoFlags::TEXT;
    }
}

impl Default for SoftSwitches {
    fn default() -> Self {
        Self::new()
    }
}

fn bit7(on: bool) -> u8 {
    if on { 0x80 } else { 0x00 }
}

impl<P: Peripherals> Apple2Bus<P> {
    /// Read of an I/O-port byte.
    pub(crate) fn io_read(&mut self, address: u16) -> u8 {
        match address {
            0xC000..=0xC0FF => return self.c0_read(address),
            0xC100..=0xC7FF => self.slot_rom_access(address),
            CLRROM => self.banks.release_c800(&mut self.pages, &self.memory),
            _ => {}
        }
        // Whatever the access left mapped there
        self.peek(address)
    }

    /// Write to an I/O-port byte. Nothing is stored.
    pub(crate) fn io_write(&mut self, address: u16, value: u8) {
        match address {
            0xC000..=0xC0FF => self.c0_write(address, value),
            0xC100..=0xC7FF => self.slot_rom_access(address),
            CLRROM => self.banks.release_c800(&mut self.pages, &self.memory),
            _ => {}
        }
    }

    fn slot_rom_access(&mut self, address: u16) {
        self.banks.select_slot(&mut self.pages, &self.memory, address);
    }

    fn c0_read(&mut self, address: u16) -> u8 {
        let reg = (address & 0xFF) as u8;
        let iie = self.model().is_iie();
        log::trace!("soft switch read ${address:04X}");

        match reg {
            0x00..=0x0F => self.switches.keyboard,
            0x10 => {
                let key = self.switches.keyboard & 0x7F;
                self.clear_strobe();
                if iie { key } else { FLOATING_BUS }
            }
            0x11..=0x1F if iie => (self.switches.keyboard & 0x7F) | bit7(self.status(reg)),
            0x11..=0x1F => FLOATING_BUS,
            0x30..=0x3F => {
                self.peripherals.speaker_toggle();
                FLOATING_BUS
            }
            0x50..=0x57 => {
                self.display_switch(reg);
                FLOATING_BUS
            }
            0x5E | 0x5F if iie => {
                self.switches.video.set(VideoFlags::DHIRES, reg == 0x5E);
                FLOATING_BUS
            }
            0x61..=0x63 => bit7(self.peripherals.read_button(reg - 0x61)),
            0x64..=0x67 => {
                let cycle = self.cycles();
                self.peripherals.read_paddle(reg - 0x64, cycle)
            }
            0x70..=0x7F => {
                let cycle = self.cycles();
                self.peripherals.paddle_trigger(cycle);
                FLOATING_BUS
            }
            0x80..=0x8F => {
                self.banks
                    .language_card_access(&mut self.pages, &self.memory, address, false);
                FLOATING_BUS
            }
            0x90..=0xFF => {
                let slot = (reg >> 4) & 0x07;
                self.slots[slot as usize].read(slot, address, &mut self.peripherals)
            }
            _ => FLOATING_BUS,
        }
    }

    fn c0_write(&mut self, address: u16, value: u8) {
        let reg = (address & 0xFF) as u8;
        let iie = self.model().is_iie();
        log::trace!("soft switch write ${address:04X} = ${value:02X}");

        match reg {
            0x00..=0x0F if iie => self.memory_mode_switch(reg),
            0x10..=0x1F => self.clear_strobe(),
            0x30..=0x3F => self.peripherals.speaker_toggle(),
            0x50..=0x57 => self.display_switch(reg),
            0x5E | 0x5F if iie => self.switches.video.set(VideoFlags::DHIRES, reg == 0x5E),
            0x70..=0x7F => {
                let cycle = self.cycles();
                self.peripherals.paddle_trigger(cycle);
            }
            0x80..=0x8F => {
                self.banks
                    .language_card_access(&mut self.pages, &self.memory, address, true);
            }
            0x90..=0xFF => {
                let slot = (reg >> 4) & 0x07;
                self.slots[slot as usize].write(slot, address, value, &mut self.peripherals);
            }
            _ => {}
        }
    }

    /// IIe $C000-$C00F writes: even addresses clear, odd addresses set.
    fn memory_mode_switch(&mut self, reg: u8) {
        let on = reg & 1 == 1;
        let bits = match reg >> 1 {
            0 => BankState::STORE80,
            1 => BankState::RAMRD,
            2 => BankState::RAMWRT,
            3 => BankState::INTCXROM,
            4 => BankState::ALTZP,
            5 => BankState::SLOTC3ROM,
            6 => {
                self.switches.video.set(VideoFlags::COL80, on);
                return;
            }
            _ => {
                self.switches.video.set(VideoFlags::ALTCHAR, on);
                return;
            }
        };
        if on {
            self.banks.set(&mut self.pages, &self.memory, bits);
        } else {
            self.banks.clear(&mut self.pages, &self.memory, bits);
        }
    }

    /// $C050-$C057.
    fn display_switch(&mut self, reg: u8) {
        let on = reg & 1 == 1;
        let bank = match reg {
            0x50 | 0x51 => {
                self.switches.video.set(VideoFlags::TEXT, on);
                return;
            }
            0x52 | 0x53 => {
                self.switches.video.set(VideoFlags::MIXED, on);
                return;
            }
            0x54 | 0x55 => BankState::PAGE2,
            _ => BankState::HIRES,
        };
        if on {
            self.banks.set(&mut self.pages, &self.memory, bank);
        } else {
            self.banks.clear(&mut self.pages, &self.memory, bank);
        }
    }

    /// IIe status flags at $C011-$C01F.
    fn status(&self, reg: u8) -> bool {
        let bank = self.banks.state();
        let video = self.switches.video;
        match reg {
            0x11 => bank.contains(BankState::LC_BANK2),
            0x12 => bank.contains(BankState::LC_READ),
            0x13 => bank.contains(BankState::RAMRD),
            0x14 => bank.contains(BankState::RAMWRT),
            0x15 => bank.contains(BankState::INTCXROM),
            0x16 => bank.contains(BankState::ALTZP),
            0x17 => bank.contains(BankState::SLOTC3ROM),
            0x18 => bank.contains(BankState::STORE80),
            0x19 => self.in_vbl(),
            0x1A => video.contains(VideoFlags::TEXT),
            0x1B => video.contains(VideoFlags::MIXED),
            0x1C => bank.contains(BankState::PAGE2),
            0x1D => bank.contains(BankState::HIRES),
            0x1E => video.contains(VideoFlags::ALTCHAR),
            0x1F => video.contains(VideoFlags::COL80),
            _ => false,
        }
    }

    #[must_use]
    pub fn in_vbl(&self) -> bool {
        self.cycles() % CYCLES_PER_FRAME >= VBL_START
    }

    fn clear_strobe(&mut self) {
        if !self.peripherals.paste_pending() {
            self.switches.keyboard &= 0x7F;
        }
    }
}
