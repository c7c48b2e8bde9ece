//! Instruction descriptors and the per-class opcode decode tables.
//!
//! Each opcode decodes to an operation and an addressing mode. Both
//! execution engines drive their bus sequences from this descriptor, so the
//! tables are the single place where the two CPU classes differ in what an
//! opcode means.

use crate::CpuClass;

/// Addressing mode of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// No operand. Costs a dummy read of the next byte.
    Implied,
    /// Operates on A. Costs a dummy read of the next byte.
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    /// `(zp,X)`
    IndexedIndirect,
    /// `(zp),Y`
    IndirectIndexed,
    /// `(zp)`, 65C02 only.
    ZeroPageIndirect,
    /// `JMP (abs)`
    Indirect,
    /// `JMP (abs,X)`, 65C02 only.
    AbsoluteIndexedIndirect,
    Relative,
    /// 65C02 one-byte, one-cycle no-op. Only the opcode fetch happens.
    Single,
}

impl Mode {
    /// Instruction length in bytes, opcode included.
    #[must_use]
    pub const fn len(self) -> u16 {
        match self {
            Mode::Implied | Mode::Accumulator | Mode::Single => 1,
            Mode::Immediate
            | Mode::ZeroPage
            | Mode::ZeroPageX
            | Mode::ZeroPageY
            | Mode::IndexedIndirect
            | Mode::IndirectIndexed
            | Mode::ZeroPageIndirect
            | Mode::Relative => 2,
            Mode::Absolute
            | Mode::AbsoluteX
            | Mode::AbsoluteY
            | Mode::Indirect
            | Mode::AbsoluteIndexedIndirect => 3,
        }
    }
}

/// Branch condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Plus,
    Minus,
    OverflowClear,
    OverflowSet,
    CarryClear,
    CarrySet,
    NotEqual,
    Equal,
    Always,
}

/// Operation performed by an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Lda,
    Ldx,
    Ldy,
    Adc,
    Sbc,
    And,
    Ora,
    Eor,
    Cmp,
    Cpx,
    Cpy,
    Bit,
    Nop,
    Sta,
    Stx,
    Sty,
    Stz,
    Asl,
    Lsr,
    Rol,
    Ror,
    Inc,
    Dec,
    Tsb,
    Trb,
    Inx,
    Iny,
    Dex,
    Dey,
    Tax,
    Tay,
    Txa,
    Tya,
    Tsx,
    Txs,
    Clc,
    Sec,
    Cli,
    Sei,
    Clv,
    Cld,
    Sed,
    Pha,
    Php,
    Phx,
    Phy,
    Pla,
    Plp,
    Plx,
    Ply,
    Jmp,
    Jsr,
    Rts,
    Rti,
    Brk,
    Branch(Condition),
}

/// How an operation touches its memory operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Reads the operand once.
    Read,
    /// Writes a register value to the operand.
    Write,
    /// Reads, modifies and writes back the operand.
    Modify,
    /// Stack, flow control and register-only operations.
    Control,
}

impl Op {
    #[must_use]
    pub const fn kind(self) -> Kind {
        match self {
            Op::Lda
            | Op::Ldx
            | Op::Ldy
            | Op::Adc
            | Op::Sbc
            | Op::And
            | Op::Ora
            | Op::Eor
            | Op::Cmp
            | Op::Cpx
            | Op::Cpy
            | Op::Bit
            | Op::Nop => Kind::Read,
            Op::Sta | Op::Stx | Op::Sty | Op::Stz => Kind::Write,
            Op::Asl | Op::Lsr | Op::Rol | Op::Ror | Op::Inc | Op::Dec | Op::Tsb | Op::Trb => {
                Kind::Modify
            }
            _ => Kind::Control,
        }
    }

    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Op::Lda => "LDA",
            Op::Ldx => "LDX",
            Op::Ldy => "LDY",
            Op::Adc => "ADC",
            Op::Sbc => "SBC",
            Op::And => "AND",
            Op::Ora => "ORA",
            Op::Eor => "EOR",
            Op::Cmp => "CMP",
            Op::Cpx => "CPX",
            Op::Cpy => "CPY",
            Op::Bit => "BIT",
            Op::Nop => "NOP",
            Op::Sta => "STA",
            Op::Stx => "STX",
            Op::Sty => "STY",
            Op::Stz => "STZ",
            Op::Asl => "ASL",
            Op::Lsr => "LSR",
            Op::Rol => "ROL",
            Op::Ror => "ROR",
            Op::Inc => "INC",
            Op::Dec => "DEC",
            Op::Tsb => "TSB",
            Op::Trb => "TRB",
            Op::Inx => "INX",
            Op::Iny => "INY",
            Op::Dex => "DEX",
            Op::Dey => "DEY",
            Op::Tax => "TAX",
            Op::Tay => "TAY",
            Op::Txa => "TXA",
            Op::Tya => "TYA",
            Op::Tsx => "TSX",
            Op::Txs => "TXS",
            Op::Clc => "CLC",
            Op::Sec => "SEC",
            Op::Cli => "CLI",
            Op::Sei => "SEI",
            Op::Clv => "CLV",
            Op::Cld => "CLD",
            Op::Sed => "SED",
            Op::Pha => "PHA",
            Op::Php => "PHP",
            Op::Phx => "PHX",
            Op::Phy => "PHY",
            Op::Pla => "PLA",
            Op::Plp => "PLP",
            Op::Plx => "PLX",
            Op::Ply => "PLY",
            Op::Jmp => "JMP",
            Op::Jsr => "JSR",
            Op::Rts => "RTS",
            Op::Rti => "RTI",
            Op::Brk => "BRK",
            Op::Branch(Condition::Plus) => "BPL",
            Op::Branch(Condition::Minus) => "BMI",
            Op::Branch(Condition::OverflowClear) => "BVC",
            Op::Branch(Condition::OverflowSet) => "BVS",
            Op::Branch(Condition::CarryClear) => "BCC",
            Op::Branch(Condition::CarrySet) => "BCS",
            Op::Branch(Condition::NotEqual) => "BNE",
            Op::Branch(Condition::Equal) => "BEQ",
            Op::Branch(Condition::Always) => "BRA",
        }
    }
}

/// A decoded opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub op: Op,
    pub mode: Mode,
}

impl Instruction {
    const fn new(op: Op, mode: Mode) -> Self {
        Self { op, mode }
    }

    /// Decode `opcode` for the given CPU class. Every byte decodes to
    /// something; opcodes the class leaves undefined become no-ops.
    #[must_use]
    pub const fn decode(class: CpuClass, opcode: u8) -> Self {
        match class {
            CpuClass::Mos6502 => match documented(opcode) {
                Some(instr) => instr,
                None => Self::new(Op::Nop, Mode::Implied),
            },
            CpuClass::Wdc65C02 => match cmos_extension(opcode) {
                Some(instr) => instr,
                None => match documented(opcode) {
                    Some(instr) => instr,
                    None => cmos_undefined(opcode),
                },
            },
        }
    }
}

/// Opcodes defined on both the 6502 and the 65C02.
const fn documented(opcode: u8) -> Option<Instruction> {
    use Condition::{
        CarryClear, CarrySet, Equal, Minus, NotEqual, OverflowClear, OverflowSet, Plus,
    };
    use Mode::{
        Absolute, AbsoluteX, AbsoluteY, Accumulator, Immediate, Implied, IndexedIndirect, Indirect,
        IndirectIndexed, Relative, ZeroPage, ZeroPageX, ZeroPageY,
    };

    let (op, mode) = match opcode {
        // ORA
        0x01 => (Op::Ora, IndexedIndirect),
        0x05 => (Op::Ora, ZeroPage),
        0x09 => (Op::Ora, Immediate),
        0x0D => (Op::Ora, Absolute),
        0x11 => (Op::Ora, IndirectIndexed),
        0x15 => (Op::Ora, ZeroPageX),
        0x19 => (Op::Ora, AbsoluteY),
        0x1D => (Op::Ora, AbsoluteX),
        // AND
        0x21 => (Op::And, IndexedIndirect),
        0x25 => (Op::And, ZeroPage),
        0x29 => (Op::And, Immediate),
        0x2D => (Op::And, Absolute),
        0x31 => (Op::And, IndirectIndexed),
        0x35 => (Op::And, ZeroPageX),
        0x39 => (Op::And, AbsoluteY),
        0x3D => (Op::And, AbsoluteX),
        // EOR
        0x41 => (Op::Eor, IndexedIndirect),
        0x45 => (Op::Eor, ZeroPage),
        0x49 => (Op::Eor, Immediate),
        0x4D => (Op::Eor, Absolute),
        0x51 => (Op::Eor, IndirectIndexed),
        0x55 => (Op::Eor, ZeroPageX),
        0x59 => (Op::Eor, AbsoluteY),
        0x5D => (Op::Eor, AbsoluteX),
        // ADC
        0x61 => (Op::Adc, IndexedIndirect),
        0x65 => (Op::Adc, ZeroPage),
        0x69 => (Op::Adc, Immediate),
        0x6D => (Op::Adc, Absolute),
        0x71 => (Op::Adc, IndirectIndexed),
        0x75 => (Op::Adc, ZeroPageX),
        0x79 => (Op::Adc, AbsoluteY),
        0x7D => (Op::Adc, AbsoluteX),
        // STA
        0x81 => (Op::Sta, IndexedIndirect),
        0x85 => (Op::Sta, ZeroPage),
        0x8D => (Op::Sta, Absolute),
        0x91 => (Op::Sta, IndirectIndexed),
        0x95 => (Op::Sta, ZeroPageX),
        0x99 => (Op::Sta, AbsoluteY),
        0x9D => (Op::Sta, AbsoluteX),
        // LDA
        0xA1 => (Op::Lda, IndexedIndirect),
        0xA5 => (Op::Lda, ZeroPage),
        0xA9 => (Op::Lda, Immediate),
        0xAD => (Op::Lda, Absolute),
        0xB1 => (Op::Lda, IndirectIndexed),
        0xB5 => (Op::Lda, ZeroPageX),
        0xB9 => (Op::Lda, AbsoluteY),
        0xBD => (Op::Lda, AbsoluteX),
        // CMP
        0xC1 => (Op::Cmp, IndexedIndirect),
        0xC5 => (Op::Cmp, ZeroPage),
        0xC9 => (Op::Cmp, Immediate),
        0xCD => (Op::Cmp, Absolute),
        0xD1 => (Op::Cmp, IndirectIndexed),
        0xD5 => (Op::Cmp, ZeroPageX),
        0xD9 => (Op::Cmp, AbsoluteY),
        0xDD => (Op::Cmp, AbsoluteX),
        // SBC
        0xE1 => (Op::Sbc, IndexedIndirect),
        0xE5 => (Op::Sbc, ZeroPage),
        0xE9 => (Op::Sbc, Immediate),
        0xED => (Op::Sbc, Absolute),
        0xF1 => (Op::Sbc, IndirectIndexed),
        0xF5 => (Op::Sbc, ZeroPageX),
        0xF9 => (Op::Sbc, AbsoluteY),
        0xFD => (Op::Sbc, AbsoluteX),
        // Shifts and rotates
        0x06 => (Op::Asl, ZeroPage),
        0x0A => (Op::Asl, Accumulator),
        0x0E => (Op::Asl, Absolute),
        0x16 => (Op::Asl, ZeroPageX),
        0x1E => (Op::Asl, AbsoluteX),
        0x26 => (Op::Rol, ZeroPage),
        0x2A => (Op::Rol, Accumulator),
        0x2E => (Op::Rol, Absolute),
        0x36 => (Op::Rol, ZeroPageX),
        0x3E => (Op::Rol, AbsoluteX),
        0x46 => (Op::Lsr, ZeroPage),
        0x4A => (Op::Lsr, Accumulator),
        0x4E => (Op::Lsr, Absolute),
        0x56 => (Op::Lsr, ZeroPageX),
        0x5E => (Op::Lsr, AbsoluteX),
        0x66 => (Op::Ror, ZeroPage),
        0x6A => (Op::Ror, Accumulator),
        0x6E => (Op::Ror, Absolute),
        0x76 => (Op::Ror, ZeroPageX),
        0x7E => (Op::Ror, AbsoluteX),
        // Memory increment / decrement
        0xC6 => (Op::Dec, ZeroPage),
        0xCE => (Op::Dec, Absolute),
        0xD6 => (Op::Dec, ZeroPageX),
        0xDE => (Op::Dec, AbsoluteX),
        0xE6 => (Op::Inc, ZeroPage),
        0xEE => (Op::Inc, Absolute),
        0xF6 => (Op::Inc, ZeroPageX),
        0xFE => (Op::Inc, AbsoluteX),
        // X and Y loads, stores and compares
        0x86 => (Op::Stx, ZeroPage),
        0x8E => (Op::Stx, Absolute),
        0x96 => (Op::Stx, ZeroPageY),
        0xA2 => (Op::Ldx, Immediate),
        0xA6 => (Op::Ldx, ZeroPage),
        0xAE => (Op::Ldx, Absolute),
        0xB6 => (Op::Ldx, ZeroPageY),
        0xBE => (Op::Ldx, AbsoluteY),
        0x84 => (Op::Sty, ZeroPage),
        0x8C => (Op::Sty, Absolute),
        0x94 => (Op::Sty, ZeroPageX),
        0xA0 => (Op::Ldy, Immediate),
        0xA4 => (Op::Ldy, ZeroPage),
        0xAC => (Op::Ldy, Absolute),
        0xB4 => (Op::Ldy, ZeroPageX),
        0xBC => (Op::Ldy, AbsoluteX),
        0xC0 => (Op::Cpy, Immediate),
        0xC4 => (Op::Cpy, ZeroPage),
        0xCC => (Op::Cpy, Absolute),
        0xE0 => (Op::Cpx, Immediate),
        0xE4 => (Op::Cpx, ZeroPage),
        0xEC => (Op::Cpx, Absolute),
        0x24 => (Op::Bit, ZeroPage),
        0x2C => (Op::Bit, Absolute),
        // Branches
        0x10 => (Op::Branch(Plus), Relative),
        0x30 => (Op::Branch(Minus), Relative),
        0x50 => (Op::Branch(OverflowClear), Relative),
        0x70 => (Op::Branch(OverflowSet), Relative),
        0x90 => (Op::Branch(CarryClear), Relative),
        0xB0 => (Op::Branch(CarrySet), Relative),
        0xD0 => (Op::Branch(NotEqual), Relative),
        0xF0 => (Op::Branch(Equal), Relative),
        // Flow control
        0x00 => (Op::Brk, Implied),
        0x20 => (Op::Jsr, Absolute),
        0x40 => (Op::Rti, Implied),
        0x60 => (Op::Rts, Implied),
        0x4C => (Op::Jmp, Absolute),
        0x6C => (Op::Jmp, Indirect),
        // Stack
        0x08 => (Op::Php, Implied),
        0x28 => (Op::Plp, Implied),
        0x48 => (Op::Pha, Implied),
        0x68 => (Op::Pla, Implied),
        // Register and flag operations
        0x88 => (Op::Dey, Implied),
        0xA8 => (Op::Tay, Implied),
        0xC8 => (Op::Iny, Implied),
        0xE8 => (Op::Inx, Implied),
        0x18 => (Op::Clc, Implied),
        0x38 => (Op::Sec, Implied),
        0x58 => (Op::Cli, Implied),
        0x78 => (Op::Sei, Implied),
        0x98 => (Op::Tya, Implied),
        0xB8 => (Op::Clv, Implied),
        0xD8 => (Op::Cld, Implied),
        0xF8 => (Op::Sed, Implied),
        0x8A => (Op::Txa, Implied),
        0x9A => (Op::Txs, Implied),
        0xAA => (Op::Tax, Implied),
        0xBA => (Op::Tsx, Implied),
        0xCA => (Op::Dex, Implied),
        0xEA => (Op::Nop, Implied),
        _ => return None,
    };
    Some(Instruction::new(op, mode))
}

/// Opcodes the 65C02 adds to the documented set.
const fn cmos_extension(opcode: u8) -> Option<Instruction> {
    use Mode::{
        Absolute, AbsoluteIndexedIndirect, AbsoluteX, Accumulator, Immediate, Implied, Relative,
        ZeroPage, ZeroPageIndirect, ZeroPageX,
    };

    let (op, mode) = match opcode {
        0x04 => (Op::Tsb, ZeroPage),
        0x0C => (Op::Tsb, Absolute),
        0x14 => (Op::Trb, ZeroPage),
        0x1C => (Op::Trb, Absolute),
        0x12 => (Op::Ora, ZeroPageIndirect),
        0x32 => (Op::And, ZeroPageIndirect),
        0x52 => (Op::Eor, ZeroPageIndirect),
        0x72 => (Op::Adc, ZeroPageIndirect),
        0x92 => (Op::Sta, ZeroPageIndirect),
        0xB2 => (Op::Lda, ZeroPageIndirect),
        0xD2 => (Op::Cmp, ZeroPageIndirect),
        0xF2 => (Op::Sbc, ZeroPageIndirect),
        0x1A => (Op::Inc, Accumulator),
        0x3A => (Op::Dec, Accumulator),
        0x34 => (Op::Bit, ZeroPageX),
        0x3C => (Op::Bit, AbsoluteX),
        0x89 => (Op::Bit, Immediate),
        0x5A => (Op::Phy, Implied),
        0x7A => (Op::Ply, Implied),
        0xDA => (Op::Phx, Implied),
        0xFA => (Op::Plx, Implied),
        0x64 => (Op::Stz, ZeroPage),
        0x74 => (Op::Stz, ZeroPageX),
        0x9C => (Op::Stz, Absolute),
        0x9E => (Op::Stz, AbsoluteX),
        0x7C => (Op::Jmp, AbsoluteIndexedIndirect),
        0x80 => (Op::Branch(Condition::Always), Relative),
        _ => return None,
    };
    Some(Instruction::new(op, mode))
}

/// No-op shapes for the opcodes the 65C02 leaves undefined. They consume
/// the bytes and bus cycles of the addressing mode they decode as.
const fn cmos_undefined(opcode: u8) -> Instruction {
    let mode = match opcode {
        0xCB => Mode::Implied,
        0xDB => Mode::ZeroPageX,
        0x44 | 0x07 | 0x27 | 0x47 | 0x67 | 0x87 | 0xA7 | 0xC7 | 0xE7 => Mode::ZeroPage,
        0x54 | 0xD4 | 0xF4 | 0x17 | 0x37 | 0x57 | 0x77 | 0x97 | 0xB7 | 0xD7 | 0xF7 => {
            Mode::ZeroPageX
        }
        // Silicon spends 8 cycles on $5C; treated as a plain absolute read
        0x5C | 0xDC | 0xFC => Mode::Absolute,
        _ if opcode & 0x0F == 0x0F => Mode::Absolute,
        _ if opcode & 0x0F == 0x02 => Mode::Immediate,
        _ => Mode::Single,
    };
    Instruction::new(Op::Nop, mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nmos_undefined_opcodes_are_two_cycle_nops() {
        for opcode in [0x02, 0x03, 0x1A, 0x80, 0xFF] {
            let instr = Instruction::decode(CpuClass::Mos6502, opcode);
            assert_eq!(instr, Instruction::new(Op::Nop, Mode::Implied), "{opcode:02X}");
        }
    }

    #[test]
    fn cmos_extensions_replace_nmos_holes() {
        let instr = Instruction::decode(CpuClass::Wdc65C02, 0x80);
        assert_eq!(instr.op, Op::Branch(Condition::Always));
        let instr = Instruction::decode(CpuClass::Wdc65C02, 0xB2);
        assert_eq!((instr.op, instr.mode), (Op::Lda, Mode::ZeroPageIndirect));
    }

    #[test]
    fn cmos_undefined_lengths() {
        let len = |op| Instruction::decode(CpuClass::Wdc65C02, op).mode.len();
        assert_eq!(len(0x03), 1);
        assert_eq!(len(0x0B), 1);
        assert_eq!(len(0x02), 2);
        assert_eq!(len(0x44), 2);
        assert_eq!(len(0xF4), 2);
        assert_eq!(len(0xDC), 3);
        assert_eq!(len(0x0F), 3);
        assert_eq!(len(0xCB), 1);
    }

    #[test]
    fn every_cmos_opcode_decodes() {
        let defined = (0..=255u8)
            .filter(|&op| {
                let instr = Instruction::decode(CpuClass::Wdc65C02, op);
                instr.op != Op::Nop || op == 0xEA
            })
            .count();
        // 151 documented + 27 extensions
        assert_eq!(defined, 178);
    }
}
