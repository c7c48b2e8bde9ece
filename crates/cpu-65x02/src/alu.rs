//! Operation semantics shared by both execution models.
//!
//! Nothing here touches the bus. The engines fetch operands and call in
//! with the byte they read; the bus sequence is entirely theirs.

use crate::flags::{C, D, I, N, V, Z};
use crate::instruction::{Mode, Op};
use crate::{Cpu65x02, Status};

impl Cpu65x02 {
    /// Apply a read-class operation to `value`.
    ///
    /// Returns true when the 65C02 needs the extra decimal-mode cycle.
    pub(crate) fn execute_read(&mut self, value: u8) -> bool {
        match self.instr.op {
            Op::Lda => {
                self.regs.a = value;
                self.regs.p.update_nz(value);
            }
            Op::Ldx => {
                self.regs.x = value;
                self.regs.p.update_nz(value);
            }
            Op::Ldy => {
                self.regs.y = value;
                self.regs.p.update_nz(value);
            }
            Op::Adc => return self.do_adc(value),
            Op::Sbc => return self.do_sbc(value),
            Op::And => {
                self.regs.a &= value;
                self.regs.p.update_nz(self.regs.a);
            }
            Op::Ora => {
                self.regs.a |= value;
                self.regs.p.update_nz(self.regs.a);
            }
            Op::Eor => {
                self.regs.a ^= value;
                self.regs.p.update_nz(self.regs.a);
            }
            Op::Cmp => self.do_compare(self.regs.a, value),
            Op::Cpx => self.do_compare(self.regs.x, value),
            Op::Cpy => self.do_compare(self.regs.y, value),
            Op::Bit => self.do_bit(value),
            _ => {}
        }
        false
    }

    /// Value a write-class operation stores.
    pub(crate) fn store_value(&self) -> u8 {
        match self.instr.op {
            Op::Sta => self.regs.a,
            Op::Stx => self.regs.x,
            Op::Sty => self.regs.y,
            _ => 0,
        }
    }

    /// Apply a read-modify-write operation and return the new value.
    pub(crate) fn execute_modify(&mut self, value: u8) -> u8 {
        let result = match self.instr.op {
            Op::Asl => {
                self.regs.p.set_if(C, value & 0x80 != 0);
                value << 1
            }
            Op::Lsr => {
                self.regs.p.set_if(C, value & 0x01 != 0);
                value >> 1
            }
            Op::Rol => {
                let carry_in = u8::from(self.regs.p.is_set(C));
                self.regs.p.set_if(C, value & 0x80 != 0);
                (value << 1) | carry_in
            }
            Op::Ror => {
                let carry_in = if self.regs.p.is_set(C) { 0x80 } else { 0 };
                self.regs.p.set_if(C, value & 0x01 != 0);
                (value >> 1) | carry_in
            }
            Op::Inc => value.wrapping_add(1),
            Op::Dec => value.wrapping_sub(1),
            // TSB/TRB only touch Z, and from the AND before modification
            Op::Tsb => {
                self.regs.p.set_if(Z, self.regs.a & value == 0);
                return value | self.regs.a;
            }
            Op::Trb => {
                self.regs.p.set_if(Z, self.regs.a & value == 0);
                return value & !self.regs.a;
            }
            _ => value,
        };
        self.regs.p.update_nz(result);
        result
    }

    /// Register-only and flag operations, plus accumulator shifts.
    pub(crate) fn execute_implied(&mut self) {
        if self.instr.mode == Mode::Accumulator {
            self.regs.a = self.execute_modify(self.regs.a);
            return;
        }
        match self.instr.op {
            Op::Inx => {
                self.regs.x = self.regs.x.wrapping_add(1);
                self.regs.p.update_nz(self.regs.x);
            }
            Op::Iny => {
                self.regs.y = self.regs.y.wrapping_add(1);
                self.regs.p.update_nz(self.regs.y);
            }
            Op::Dex => {
                self.regs.x = self.regs.x.wrapping_sub(1);
                self.regs.p.update_nz(self.regs.x);
            }
            Op::Dey => {
                self.regs.y = self.regs.y.wrapping_sub(1);
                self.regs.p.update_nz(self.regs.y);
            }
            Op::Tax => {
                self.regs.x = self.regs.a;
                self.regs.p.update_nz(self.regs.x);
            }
            Op::Tay => {
                self.regs.y = self.regs.a;
                self.regs.p.update_nz(self.regs.y);
            }
            Op::Txa => {
                self.regs.a = self.regs.x;
                self.regs.p.update_nz(self.regs.a);
            }
            Op::Tya => {
                self.regs.a = self.regs.y;
                self.regs.p.update_nz(self.regs.a);
            }
            Op::Tsx => {
                self.regs.x = self.regs.s();
                self.regs.p.update_nz(self.regs.x);
            }
            // TXS does not touch flags
            Op::Txs => self.regs.set_s(self.regs.x),
            Op::Clc => self.regs.p.clear(C),
            Op::Sec => self.regs.p.set(C),
            Op::Cli => self.regs.p.clear(I),
            Op::Sei => self.regs.p.set(I),
            Op::Clv => self.regs.p.clear(V),
            Op::Cld => self.regs.p.clear(D),
            Op::Sed => self.regs.p.set(D),
            _ => {}
        }
    }

    /// Apply a byte pulled by PLA, PLX, PLY or PLP.
    pub(crate) fn execute_pull(&mut self, value: u8) {
        match self.instr.op {
            Op::Pla => {
                self.regs.a = value;
                self.regs.p.update_nz(value);
            }
            Op::Plx => {
                self.regs.x = value;
                self.regs.p.update_nz(value);
            }
            Op::Ply => {
                self.regs.y = value;
                self.regs.p.update_nz(value);
            }
            _ => self.regs.p = Status::from_byte(value),
        }
    }

    /// Byte pushed by PHA, PHX, PHY or PHP.
    pub(crate) fn push_value(&self) -> u8 {
        match self.instr.op {
            Op::Pha => self.regs.a,
            Op::Phx => self.regs.x,
            Op::Phy => self.regs.y,
            _ => self.regs.p.to_byte_brk(),
        }
    }

    // =========================================================================
    // Arithmetic
    // =========================================================================

    fn do_adc(&mut self, val: u8) -> bool {
        if !self.regs.p.is_set(D) {
            self.do_adc_binary(val);
            return false;
        }
        self.do_adc_decimal(val);
        self.regs.is_cmos()
    }

    fn do_adc_binary(&mut self, val: u8) {
        let a = self.regs.a;
        let carry = u16::from(self.regs.p.is_set(C));
        let sum = u16::from(a) + u16::from(val) + carry;
        let result = sum as u8;

        self.regs.p.set_if(C, sum > 0xFF);
        self.regs
            .p
            .set_if(V, (a ^ result) & (val ^ result) & 0x80 != 0);
        self.regs.a = result;
        self.regs.p.update_nz(result);
    }

    fn do_adc_decimal(&mut self, val: u8) {
        let a = self.regs.a;
        let carry = u8::from(self.regs.p.is_set(C));

        let mut lo = (a & 0x0F) + (val & 0x0F) + carry;
        if lo > 9 {
            lo += 6;
        }
        let mut hi = (a >> 4) + (val >> 4) + u8::from(lo > 0x0F);

        // Z from the binary sum, N from the unadjusted high nibble (NMOS)
        let bin_result = a.wrapping_add(val).wrapping_add(carry);
        self.regs.p.set_if(Z, bin_result == 0);
        self.regs.p.set_if(N, hi & 0x08 != 0);
        self.regs
            .p
            .set_if(V, (a ^ bin_result) & (val ^ bin_result) & 0x80 != 0);

        if hi > 9 {
            hi += 6;
        }

        self.regs.p.set_if(C, hi > 0x0F);
        self.regs.a = (hi << 4) | (lo & 0x0F);

        // The 65C02 spends a cycle fixing N and Z up from the BCD result
        if self.regs.is_cmos() {
            self.regs.p.update_nz(self.regs.a);
        }
    }

    fn do_sbc(&mut self, val: u8) -> bool {
        if !self.regs.p.is_set(D) {
            self.do_adc_binary(!val);
            return false;
        }
        if self.regs.is_cmos() {
            self.do_sbc_decimal_cmos(val);
            true
        } else {
            self.do_sbc_decimal(val);
            false
        }
    }

    fn do_sbc_decimal(&mut self, val: u8) {
        let a = self.regs.a;
        let borrow = i16::from(!self.regs.p.is_set(C));

        // Binary result for flags (NMOS behavior)
        let bin_result = i16::from(a) - i16::from(val) - borrow;
        self.set_sbc_binary_flags(a, val, bin_result);

        let mut lo = i16::from(a & 0x0F) - i16::from(val & 0x0F) - borrow;
        let mut hi = i16::from(a >> 4) - i16::from(val >> 4);

        if lo < 0 {
            lo -= 6;
            hi -= 1;
        }
        if hi < 0 {
            hi -= 6;
        }

        self.regs.a = ((hi << 4) as u8) | ((lo & 0x0F) as u8);
    }

    fn do_sbc_decimal_cmos(&mut self, val: u8) {
        let a = self.regs.a;
        let borrow = i16::from(!self.regs.p.is_set(C));

        let bin_result = i16::from(a) - i16::from(val) - borrow;
        self.set_sbc_binary_flags(a, val, bin_result);

        let mut result = bin_result;
        if i16::from(a & 0x0F) < i16::from(val & 0x0F) + borrow {
            result -= 6;
        }
        if i16::from(a) < i16::from(val) + borrow {
            result -= 0x60;
        }

        self.regs.a = result as u8;
        self.regs.p.update_nz(self.regs.a);
    }

    fn set_sbc_binary_flags(&mut self, a: u8, val: u8, bin_result: i16) {
        self.regs.p.set_if(C, bin_result >= 0);
        self.regs.p.set_if(Z, (bin_result as u8) == 0);
        self.regs.p.set_if(N, bin_result & 0x80 != 0);
        self.regs.p.set_if(
            V,
            (i16::from(a) ^ bin_result) & (i16::from(a) ^ i16::from(val)) & 0x80 != 0,
        );
    }

    fn do_compare(&mut self, reg: u8, val: u8) {
        self.regs.p.set_if(C, reg >= val);
        self.regs.p.update_nz(reg.wrapping_sub(val));
    }

    fn do_bit(&mut self, val: u8) {
        self.regs.p.set_if(Z, self.regs.a & val == 0);
        // BIT #imm on the 65C02 only affects Z
        if self.instr.mode != Mode::Immediate {
            self.regs.p.set_if(N, val & 0x80 != 0);
            self.regs.p.set_if(V, val & 0x40 != 0);
        }
    }
}
