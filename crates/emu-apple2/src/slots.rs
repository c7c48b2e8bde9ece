//! Slot device-select handling ($C090-$C0FF).
//!
//! Each slot owns sixteen soft switches at $C080 + slot * 16. What they do
//! depends on the card: the Disk II decodes them into stepper, motor and
//! latch controls, the Smartport card exposes a data port and a status
//! port over a command buffer, and anything else is forwarded to the
//! peripherals verbatim.

use crate::config::SlotCard;
use crate::hooks::Peripherals;
use crate::softswitch::FLOATING_BUS;

// Disk II switch offsets
const PHASE_LAST: u8 = 0x7;
const MOTOR_OFF: u8 = 0x8;
const MOTOR_ON: u8 = 0x9;
const SELECT_DRIVE_1: u8 = 0xA;
const SELECT_DRIVE_2: u8 = 0xB;
const Q6_OFF: u8 = 0xC;
const Q6_ON: u8 = 0xD;
const Q7_OFF: u8 = 0xE;
const Q7_ON: u8 = 0xF;

// Smartport port offsets
const SP_DATA: u8 = 0x4;
const SP_STATUS: u8 = 0x5;

/// Disk II controller latches. The drives themselves are external.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskIi {
    /// Stepper magnets, bit n = phase n.
    pub phases: u8,
    pub motor_on: bool,
    /// 0 or 1.
    pub drive: u8,
    pub q6: bool,
    pub q7: bool,
}

impl DiskIi {
    fn access<P: Peripherals>(
        &mut self,
        slot: u8,
        switch: u8,
        read: bool,
        peripherals: &mut P,
    ) -> u8 {
        match switch {
            0..=PHASE_LAST => {
                let bit = 1 << (switch >> 1);
                if switch & 1 == 1 {
                    self.phases |= bit;
                } else {
                    self.phases &= !bit;
                }
                log::trace!("slot {slot} Disk II phases {:04b}", self.phases);
                peripherals.disk_phase_step(slot, self.phases);
            }
            MOTOR_OFF | MOTOR_ON => {
                self.motor_on = switch == MOTOR_ON;
                log::trace!("slot {slot} Disk II motor {}", self.motor_on);
                peripherals.disk_motor(slot, self.motor_on);
            }
            SELECT_DRIVE_1 | SELECT_DRIVE_2 => {
                self.drive = switch & 1;
                peripherals.disk_drive_select(slot, self.drive);
            }
            Q6_OFF | Q6_ON => {
                self.q6 = switch == Q6_ON;
                if read {
                    return peripherals.disk_read_byte(slot);
                }
            }
            Q7_OFF | Q7_ON => {
                self.q7 = switch == Q7_ON;
                return 0x7F;
            }
            _ => unreachable!(),
        }
        FLOATING_BUS
    }
}

/// Smartport commands carried in byte 0 of the command block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmartportCommand {
    Status,
    ReadBlock,
    WriteBlock,
}

/// The 516-byte buffer the Smartport firmware fills through the data port.
///
/// Request layout: command, unit (bit 7 = drive), block number low/high,
/// then 512 bytes of write data. The reply reuses the buffer: a result
/// code in byte 0, then either the block read or the status payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBlock {
    bytes: Box<[u8; CommandBlock::LEN]>,
}

impl CommandBlock {
    pub const LEN: usize = 516;
    pub const BLOCK_SIZE: usize = 512;
    pub const SUCCESS: u8 = 0x00;
    pub const IO_ERROR: u8 = 0x27;

    #[must_use]
    pub fn new() -> Self {
        Self {
            bytes: Box::new([0; Self::LEN]),
        }
    }

    #[must_use]
    pub fn command(&self) -> Option<SmartportCommand> {
        match self.bytes[0] {
            0 => Some(SmartportCommand::Status),
            1 => Some(SmartportCommand::ReadBlock),
            2 => Some(SmartportCommand::WriteBlock),
            _ => None,
        }
    }

    /// Drive 0 or 1.
    #[must_use]
    pub fn unit(&self) -> u8 {
        self.bytes[1] >> 7
    }

    #[must_use]
    pub fn block_number(&self) -> u16 {
        u16::from_le_bytes([self.bytes[2], self.bytes[3]])
    }

    /// Data supplied with a write request.
    #[must_use]
    pub fn write_data(&self) -> &[u8] {
        &self.bytes[4..4 + Self::BLOCK_SIZE]
    }

    /// Where a read request's block goes.
    pub fn read_data_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[1..=Self::BLOCK_SIZE]
    }

    /// Status reply: device size in blocks.
    pub fn set_block_count(&mut self, blocks: u16) {
        let [lo, hi] = blocks.to_le_bytes();
        self.bytes[1] = lo;
        self.bytes[2] = hi;
    }

    pub fn set_result(&mut self, code: u8) {
        self.bytes[0] = code;
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..]
    }
}

impl Default for CommandBlock {
    fn default() -> Self {
        Self::new()
    }
}

/// Smartport card port state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Smartport {
    pub block: CommandBlock,
    read_offset: usize,
    write_offset: usize,
    pub status: u8,
}

impl Smartport {
    fn read(&mut self, switch: u8) -> u8 {
        match switch {
            SP_DATA => {
                let value = self.block.bytes[self.read_offset];
                self.read_offset = (self.read_offset + 1) % CommandBlock::LEN;
                value
            }
            SP_STATUS => self.status,
            _ => FLOATING_BUS,
        }
    }

    fn write<P: Peripherals>(&mut self, slot: u8, switch: u8, value: u8, peripherals: &mut P) {
        match switch {
            SP_DATA => {
                self.block.bytes[self.write_offset] = value;
                self.write_offset = (self.write_offset + 1) % CommandBlock::LEN;
            }
            SP_STATUS => {
                self.read_offset = 0;
                self.write_offset = 0;
                if let Some(command) = self.block.command() {
                    log::debug!(
                        "slot {slot} Smartport {command:?} unit {} block {}",
                        self.block.unit(),
                        self.block.block_number()
                    );
                    peripherals.smartport_command(slot, &mut self.block);
                }
                self.status = 0x80;
            }
            _ => {}
        }
    }
}

/// What answers a slot's device-select range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SlotDevice {
    #[default]
    Empty,
    DiskIi(DiskIi),
    Smartport(Smartport),
    Generic,
}

impl SlotDevice {
    #[must_use]
    pub fn for_card(card: &SlotCard) -> Self {
        match card {
            SlotCard::DiskII { .. } => Self::DiskIi(DiskIi::default()),
            SlotCard::Smartport { .. } => Self::Smartport(Smartport::default()),
            SlotCard::Generic { .. } => Self::Generic,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::DiskIi(_) => "Disk II",
            Self::Smartport(_) => "Smartport",
            Self::Generic => "generic",
        }
    }

    pub fn read<P: Peripherals>(&mut self, slot: u8, address: u16, peripherals: &mut P) -> u8 {
        let switch = (address & 0x0F) as u8;
        match self {
            Self::Empty => FLOATING_BUS,
            Self::DiskIi(disk) => disk.access(slot, switch, true, peripherals),
            Self::Smartport(port) => port.read(switch),
            Self::Generic => peripherals.io_read(address),
        }
    }

    pub fn write<P: Peripherals>(
        &mut self,
        slot: u8,
        address: u16,
        value: u8,
        peripherals: &mut P,
    ) {
        let switch = (address & 0x0F) as u8;
        match self {
            Self::Empty => {}
            Self::DiskIi(disk) => {
                disk.access(slot, switch, false, peripherals);
            }
            Self::Smartport(port) => port.write(slot, switch, value, peripherals),
            Self::Generic => peripherals.io_write(address, value),
        }
    }
}
