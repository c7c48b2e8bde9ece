//! Apple II configuration: model selection, system ROM and slot cards.

use cpu_65x02::CpuClass;

use crate::error::Apple2Error;

/// Size of a card's $Cn00 firmware page.
pub const SLOT_ROM_SIZE: usize = 0x100;
/// Size of a card's $C800-$CFFF expansion ROM.
pub const EXPANSION_ROM_SIZE: usize = 0x800;

/// Apple II model variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Apple2Model {
    /// Apple II+ (NMOS 6502, 64K RAM, 12K ROM at $D000).
    Plus,
    /// Enhanced Apple IIe (65C02, 128K RAM, 16K ROM at $C000).
    #[default]
    Enhanced,
}

impl Apple2Model {
    #[must_use]
    pub fn cpu_class(self) -> CpuClass {
        match self {
            Self::Plus => CpuClass::Mos6502,
            Self::Enhanced => CpuClass::Wdc65C02,
        }
    }

    /// Main plus auxiliary RAM.
    #[must_use]
    pub fn ram_size(self) -> usize {
        match self {
            Self::Plus => 0x1_0000,
            Self::Enhanced => 0x2_0000,
        }
    }

    /// Expected size of the system ROM image.
    ///
    /// The IIe image starts at $C000; its first 4K is the internal
    /// $C100-$CFFF firmware.
    #[must_use]
    pub fn rom_size(self) -> usize {
        match self {
            Self::Plus => 0x3000,
            Self::Enhanced => 0x4000,
        }
    }

    #[must_use]
    pub fn is_iie(self) -> bool {
        self == Self::Enhanced
    }
}

/// A card plugged into one of slots 1-7.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotCard {
    /// Disk II controller. Drive mechanics and disk images live outside
    /// the core, behind the `disk_*` peripheral callbacks.
    DiskII { rom: Vec<u8> },
    /// Block device speaking the Smartport soft-switch protocol.
    Smartport { rom: Vec<u8> },
    /// Any other card. Its device-select range is forwarded to
    /// `io_read`/`io_write`.
    Generic {
        rom: Vec<u8>,
        expansion_rom: Option<Vec<u8>>,
    },
}

impl SlotCard {
    /// The $Cn00 firmware page.
    #[must_use]
    pub fn rom(&self) -> &[u8] {
        match self {
            Self::DiskII { rom } | Self::Smartport { rom } | Self::Generic { rom, .. } => rom,
        }
    }

    /// The $C800 expansion ROM, if the card has one.
    #[must_use]
    pub fn expansion_rom(&self) -> Option<&[u8]> {
        match self {
            Self::Generic {
                expansion_rom: Some(rom),
                ..
            } => Some(rom),
            _ => None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::DiskII { .. } => "Disk II",
            Self::Smartport { .. } => "Smartport",
            Self::Generic { .. } => "generic",
        }
    }
}

/// Configuration for constructing an Apple II instance.
#[derive(Debug, Clone, Default)]
pub struct Apple2Config {
    /// Model variant.
    pub model: Apple2Model,
    /// System ROM (12,288 bytes for the II+, 16,384 for the IIe).
    pub rom: Vec<u8>,
    /// Cards by slot number.
    pub cards: Vec<(u8, SlotCard)>,
}

impl Apple2Config {
    #[must_use]
    pub fn new(model: Apple2Model, rom: Vec<u8>) -> Self {
        Self {
            model,
            rom,
            cards: Vec::new(),
        }
    }

    /// Add a card. Checked by `validate`.
    #[must_use]
    pub fn with_card(mut self, slot: u8, card: SlotCard) -> Self {
        self.cards.push((slot, card));
        self
    }

    /// Check ROM sizes and slot assignments.
    pub fn validate(&self) -> Result<(), Apple2Error> {
        let expected = self.model.rom_size();
        if self.rom.len() != expected {
            return Err(Apple2Error::RomSize {
                expected,
                actual: self.rom.len(),
            });
        }

        let mut occupied = [false; 8];
        for (slot, card) in &self.cards {
            let slot = *slot;
            if !(1..=7).contains(&slot) {
                return Err(Apple2Error::InvalidSlot(slot));
            }
            if occupied[slot as usize] {
                return Err(Apple2Error::SlotOccupied(slot));
            }
            occupied[slot as usize] = true;

            if card.rom().len() != SLOT_ROM_SIZE {
                return Err(Apple2Error::SlotRomSize {
                    slot,
                    expected: SLOT_ROM_SIZE,
                    actual: card.rom().len(),
                });
            }
            if let Some(expansion) = card.expansion_rom() {
                if expansion.len() != EXPANSION_ROM_SIZE {
                    return Err(Apple2Error::SlotRomSize {
                        slot,
                        expected: EXPANSION_ROM_SIZE,
                        actual: expansion.len(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card() -> SlotCard {
        SlotCard::DiskII {
            rom: vec![0; SLOT_ROM_SIZE],
        }
    }

    #[test]
    fn model_shapes() {
        assert_eq!(Apple2Model::Plus.cpu_class(), CpuClass::Mos6502);
        assert_eq!(Apple2Model::Enhanced.cpu_class(), CpuClass::Wdc65C02);
        assert_eq!(Apple2Model::Plus.ram_size(), 64 * 1024);
        assert_eq!(Apple2Model::Enhanced.ram_size(), 128 * 1024);
    }

    #[test]
    fn rom_size_checked() {
        let config = Apple2Config::new(Apple2Model::Plus, vec![0; 0x4000]);
        assert_eq!(
            config.validate(),
            Err(Apple2Error::RomSize {
                expected: 0x3000,
                actual: 0x4000
            })
        );
    }

    #[test]
    fn slot_zero_rejected() {
        let config = Apple2Config::new(Apple2Model::Plus, vec![0; 0x3000]).with_card(0, card());
        assert_eq!(config.validate(), Err(Apple2Error::InvalidSlot(0)));
    }

    #[test]
    fn duplicate_slot_rejected() {
        let config = Apple2Config::new(Apple2Model::Plus, vec![0; 0x3000])
            .with_card(6, card())
            .with_card(6, card());
        assert_eq!(config.validate(), Err(Apple2Error::SlotOccupied(6)));
    }

    #[test]
    fn expansion_rom_size_checked() {
        let config = Apple2Config::new(Apple2Model::Enhanced, vec![0; 0x4000]).with_card(
            4,
            SlotCard::Generic {
                rom: vec![0; SLOT_ROM_SIZE],
                expansion_rom: Some(vec![0; 0x400]),
            },
        );
        assert_eq!(
            config.validate(),
            Err(Apple2Error::SlotRomSize {
                slot: 4,
                expected: EXPANSION_ROM_SIZE,
                actual: 0x400
            })
        );
    }

    #[test]
    fn good_config_passes() {
        let config = Apple2Config::new(Apple2Model::Enhanced, vec![0; 0x4000])
            .with_card(6, card())
            .with_card(
                7,
                SlotCard::Smartport {
                    rom: vec![0; SLOT_ROM_SIZE],
                },
            );
        assert_eq!(config.validate(), Ok(()));
    }
}
