//! 65x02 register record.

use crate::Status;

/// Which member of the family is being emulated.
///
/// The two share an instruction set core but differ in decoding of the
/// unused opcodes, decimal-mode flags, dummy-cycle addresses and a few
/// cycle counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CpuClass {
    /// NMOS 6502 as fitted to the Apple II and II+.
    #[default]
    Mos6502,
    /// CMOS 65C02 as fitted to the enhanced IIe.
    Wdc65C02,
}

/// A 16-bit internal latch that is usually handled a byte at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Latch(pub u16);

impl Latch {
    #[must_use]
    pub const fn lo(self) -> u8 {
        self.0 as u8
    }

    #[must_use]
    pub const fn hi(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn set_lo(&mut self, value: u8) {
        self.0 = (self.0 & 0xFF00) | u16::from(value);
    }

    pub fn set_hi(&mut self, value: u8) {
        self.0 = (self.0 & 0x00FF) | (u16::from(value) << 8);
    }
}

/// Register file plus the internal latches used while an instruction is
/// in flight.
///
/// The stack pointer is kept as a full address in $0100-$01FF. Pushes and
/// pulls wrap inside page one and never leave it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub pc: u16,
    pub sp: u16,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub p: Status,
    /// Effective address being built by the current instruction.
    pub address: Latch,
    /// Operand and intermediate data for the current instruction.
    pub scratch: Latch,
    pub class: CpuClass,
    /// Bus cycles executed since power-on.
    pub cycles: u64,
}

impl Registers {
    #[must_use]
    pub const fn new(class: CpuClass) -> Self {
        Self {
            pc: 0,
            sp: 0x01FF,
            a: 0,
            x: 0,
            y: 0,
            p: Status::new(),
            address: Latch(0),
            scratch: Latch(0),
            class,
            cycles: 0,
        }
    }

    /// Address for the next push, then move the stack pointer down.
    pub fn push(&mut self) -> u16 {
        let addr = self.sp;
        self.sp = 0x0100 | (self.sp.wrapping_sub(1) & 0xFF);
        addr
    }

    /// Move the stack pointer up, then return the address to pull from.
    pub fn pop(&mut self) -> u16 {
        self.sp = 0x0100 | (self.sp.wrapping_add(1) & 0xFF);
        self.sp
    }

    /// Low byte of the stack pointer, as TSX sees it.
    #[must_use]
    pub const fn s(&self) -> u8 {
        self.sp as u8
    }

    pub fn set_s(&mut self, value: u8) {
        self.sp = 0x0100 | u16::from(value);
    }

    #[must_use]
    pub const fn is_cmos(&self) -> bool {
        matches!(self.class, CpuClass::Wdc65C02)
    }
}
