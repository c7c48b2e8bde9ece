//! Cycle-stepped execution: one bus access per `tick`.
//!
//! Each instruction moves through up to three stages after its opcode
//! fetch. The address stage builds the effective address one access at a
//! time, the operand stage reads, writes or modifies it, and control
//! instructions run their own fixed sequences.

use emu_core::Bus;

use crate::cpu::Stage;
use crate::instruction::{Condition, Kind, Mode, Op};
use crate::registers::Latch;
use crate::{Cpu65x02, Status};

impl Cpu65x02 {
    /// Execute one CPU cycle.
    pub(crate) fn tick_cycle<B: Bus>(&mut self, bus: &mut B) {
        match self.stage {
            Stage::Fetch => self.fetch_opcode(bus),
            Stage::Address => {
                self.cycle += 1;
                if self.address_cycle(bus) {
                    self.stage = Stage::Operand(0);
                }
            }
            Stage::Operand(n) => {
                self.cycle += 1;
                self.operand_cycle(bus, n);
            }
            Stage::Control => {
                self.cycle += 1;
                self.control_cycle(bus);
            }
        }
    }

    // =========================================================================
    // Address stage
    // =========================================================================

    /// One cycle of effective-address generation. Returns true once the
    /// address in `regs.address` is final.
    fn address_cycle<B: Bus>(&mut self, bus: &mut B) -> bool {
        match (self.instr.mode, self.cycle) {
            (Mode::ZeroPage, 1) => {
                let zp = self.fetch(bus);
                self.regs.address = Latch(u16::from(zp));
                true
            }

            (Mode::ZeroPageX | Mode::ZeroPageY, 1) => {
                let base = self.fetch(bus);
                self.regs.address = Latch(u16::from(base));
                false
            }
            (Mode::ZeroPageX | Mode::ZeroPageY, 2) => {
                // Dummy read of the unindexed address while X/Y is added
                self.read(bus, self.regs.address.0);
                let index = self.index_register();
                let lo = self.regs.address.lo().wrapping_add(index);
                self.regs.address.set_lo(lo);
                true
            }

            (Mode::Absolute | Mode::AbsoluteX | Mode::AbsoluteY, 1) => {
                let lo = self.fetch(bus);
                self.regs.address = Latch(u16::from(lo));
                false
            }
            (Mode::Absolute, 2) => {
                let hi = self.fetch(bus);
                self.regs.address.set_hi(hi);
                true
            }
            (Mode::AbsoluteX | Mode::AbsoluteY, 2) => {
                let hi = self.fetch(bus);
                self.regs.address.set_hi(hi);
                self.add_index_to_low_byte();
                !self.needs_fixup(self.crossed)
            }
            (Mode::AbsoluteX | Mode::AbsoluteY, 3) => self.fixup_cycle(bus),

            (Mode::IndexedIndirect, 1) => {
                let ptr = self.fetch(bus);
                self.regs.scratch.set_lo(ptr);
                false
            }
            (Mode::IndexedIndirect, 2) => {
                self.read(bus, u16::from(self.regs.scratch.lo()));
                let ptr = self.regs.scratch.lo().wrapping_add(self.regs.x);
                self.regs.scratch.set_lo(ptr);
                false
            }
            (Mode::IndexedIndirect, 3) | (Mode::IndirectIndexed | Mode::ZeroPageIndirect, 2) => {
                let lo = self.read(bus, u16::from(self.regs.scratch.lo()));
                self.regs.address = Latch(u16::from(lo));
                false
            }
            (Mode::IndexedIndirect, 4) | (Mode::ZeroPageIndirect, 3) => {
                let ptr = self.regs.scratch.lo().wrapping_add(1);
                let hi = self.read(bus, u16::from(ptr));
                self.regs.address.set_hi(hi);
                true
            }

            (Mode::IndirectIndexed | Mode::ZeroPageIndirect, 1) => {
                let ptr = self.fetch(bus);
                self.regs.scratch.set_lo(ptr);
                false
            }
            (Mode::IndirectIndexed, 3) => {
                let ptr = self.regs.scratch.lo().wrapping_add(1);
                let hi = self.read(bus, u16::from(ptr));
                self.regs.address.set_hi(hi);
                self.add_index_to_low_byte();
                !self.needs_fixup(self.crossed)
            }
            (Mode::IndirectIndexed, 4) => self.fixup_cycle(bus),

            _ => unreachable!(),
        }
    }

    fn index_register(&self) -> u8 {
        match self.instr.mode {
            Mode::ZeroPageY | Mode::AbsoluteY | Mode::IndirectIndexed => self.regs.y,
            _ => self.regs.x,
        }
    }

    /// Add the index to the low byte only, remembering whether it carried.
    fn add_index_to_low_byte(&mut self) {
        let index = self.index_register();
        let (lo, carry) = self.regs.address.lo().overflowing_add(index);
        self.regs.address.set_lo(lo);
        self.crossed = carry;
    }

    fn fixup_cycle<B: Bus>(&mut self, bus: &mut B) -> bool {
        self.fixup_read(bus, self.regs.address.0);
        if self.crossed {
            self.regs.address = Latch(self.regs.address.0.wrapping_add(0x100));
        }
        true
    }

    // =========================================================================
    // Operand stage
    // =========================================================================

    fn operand_cycle<B: Bus>(&mut self, bus: &mut B, n: u8) {
        let address = self.regs.address.0;
        match (self.instr.op.kind(), n) {
            (Kind::Read, 0) => {
                let value = self.read(bus, address);
                self.regs.scratch.set_lo(value);
                if self.execute_read(value) {
                    self.stage = Stage::Operand(1);
                } else {
                    self.finish();
                }
            }
            // 65C02 decimal-mode fixup cycle
            (Kind::Read, _) => {
                self.read(bus, address);
                self.finish();
            }
            (Kind::Write, _) => {
                let value = self.store_value();
                self.write(bus, address, value);
                self.finish();
            }
            (Kind::Modify, 0) => {
                let value = self.read(bus, address);
                self.regs.scratch.set_lo(value);
                self.stage = Stage::Operand(1);
            }
            (Kind::Modify, 1) => {
                let old = self.regs.scratch.lo();
                self.modify_dummy(bus, address, old);
                let result = self.execute_modify(old);
                self.regs.scratch.set_hi(result);
                self.stage = Stage::Operand(2);
            }
            (Kind::Modify, _) => {
                self.write(bus, address, self.regs.scratch.hi());
                self.finish();
            }
            (Kind::Control, _) => unreachable!(),
        }
    }

    // =========================================================================
    // Control sequences
    // =========================================================================

    fn control_cycle<B: Bus>(&mut self, bus: &mut B) {
        match self.instr.op {
            Op::Brk => self.brk_cycle(bus),
            Op::Jsr => self.jsr_cycle(bus),
            Op::Rts => self.rts_cycle(bus),
            Op::Rti => self.rti_cycle(bus),
            Op::Jmp => match self.instr.mode {
                Mode::Absolute => self.jmp_abs_cycle(bus),
                Mode::Indirect => self.jmp_ind_cycle(bus),
                _ => self.jmp_abs_x_ind_cycle(bus),
            },
            Op::Pha | Op::Php | Op::Phx | Op::Phy => self.push_cycle(bus),
            Op::Pla | Op::Plp | Op::Plx | Op::Ply => self.pull_cycle(bus),
            Op::Branch(condition) => self.branch_cycle(bus, condition),
            // Implied and accumulator - 2 cycles
            _ => {
                self.read(bus, self.regs.pc);
                self.execute_implied();
                self.finish();
            }
        }
    }

    // BRK, IRQ, NMI - 7 cycles
    fn brk_cycle<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                self.read(bus, self.regs.pc);
                if !self.hardware_interrupt {
                    self.regs.pc = self.regs.pc.wrapping_add(1);
                }
            }
            2 => {
                let addr = self.regs.push();
                self.write(bus, addr, (self.regs.pc >> 8) as u8);
            }
            3 => {
                let addr = self.regs.push();
                self.write(bus, addr, self.regs.pc as u8);
            }
            4 => {
                let p = if self.hardware_interrupt {
                    self.regs.p.to_byte_irq()
                } else {
                    self.regs.p.to_byte_brk()
                };
                let addr = self.regs.push();
                self.write(bus, addr, p);
            }
            5 => {
                let lo = self.read(bus, self.vector);
                self.regs.address = Latch(u16::from(lo));
            }
            6 => {
                let hi = self.read(bus, self.vector.wrapping_add(1));
                self.regs.address.set_hi(hi);
                self.regs.pc = self.regs.address.0;
                self.enter_interrupt();
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    // JSR abs - 6 cycles
    fn jsr_cycle<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                let lo = self.fetch(bus);
                self.regs.address = Latch(u16::from(lo));
            }
            2 => {
                self.read(bus, self.regs.sp);
            }
            3 => {
                let addr = self.regs.push();
                self.write(bus, addr, (self.regs.pc >> 8) as u8);
            }
            4 => {
                let addr = self.regs.push();
                self.write(bus, addr, self.regs.pc as u8);
            }
            5 => {
                let hi = self.read(bus, self.regs.pc);
                self.regs.address.set_hi(hi);
                self.regs.pc = self.regs.address.0;
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    // RTS - 6 cycles
    fn rts_cycle<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                self.read(bus, self.regs.pc);
            }
            2 => {
                self.read(bus, self.regs.sp);
            }
            3 => {
                let addr = self.regs.pop();
                let lo = self.read(bus, addr);
                self.regs.address = Latch(u16::from(lo));
            }
            4 => {
                let addr = self.regs.pop();
                let hi = self.read(bus, addr);
                self.regs.address.set_hi(hi);
            }
            5 => {
                self.read(bus, self.regs.address.0);
                self.regs.pc = self.regs.address.0.wrapping_add(1);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    // RTI - 6 cycles
    fn rti_cycle<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                self.read(bus, self.regs.pc);
            }
            2 => {
                self.read(bus, self.regs.sp);
            }
            3 => {
                let addr = self.regs.pop();
                let p = self.read(bus, addr);
                self.regs.p = Status::from_byte(p);
            }
            4 => {
                let addr = self.regs.pop();
                let lo = self.read(bus, addr);
                self.regs.address = Latch(u16::from(lo));
            }
            5 => {
                let addr = self.regs.pop();
                let hi = self.read(bus, addr);
                self.regs.address.set_hi(hi);
                self.regs.pc = self.regs.address.0;
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    // JMP abs - 3 cycles
    fn jmp_abs_cycle<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                let lo = self.fetch(bus);
                self.regs.address = Latch(u16::from(lo));
            }
            2 => {
                let hi = self.fetch(bus);
                self.regs.address.set_hi(hi);
                self.regs.pc = self.regs.address.0;
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    // JMP (ind) - 5 cycles on the 6502, 6 on the 65C02
    fn jmp_ind_cycle<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                let lo = self.fetch(bus);
                self.regs.address = Latch(u16::from(lo));
            }
            2 => {
                let hi = self.fetch(bus);
                self.regs.address.set_hi(hi);
            }
            3 => {
                let lo = self.read(bus, self.regs.address.0);
                self.regs.scratch.set_lo(lo);
            }
            4 => {
                // High byte from the same page: the 6502 wraps at $xxFF
                let ptr = self.regs.address;
                let wrapped = (ptr.0 & 0xFF00) | u16::from(ptr.lo().wrapping_add(1));
                let hi = self.read(bus, wrapped);
                if !self.regs.is_cmos() {
                    self.regs.scratch.set_hi(hi);
                    self.regs.pc = self.regs.scratch.0;
                    self.finish();
                }
            }
            5 => {
                let hi = self.read(bus, self.regs.address.0.wrapping_add(1));
                self.regs.scratch.set_hi(hi);
                self.regs.pc = self.regs.scratch.0;
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    // JMP (abs,X) - 6 cycles
    fn jmp_abs_x_ind_cycle<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                let lo = self.fetch(bus);
                self.regs.address = Latch(u16::from(lo));
            }
            2 => {
                let hi = self.fetch(bus);
                self.regs.address.set_hi(hi);
            }
            3 => {
                self.read(bus, self.regs.pc.wrapping_sub(2));
                self.regs.address = Latch(self.regs.address.0.wrapping_add(u16::from(self.regs.x)));
            }
            4 => {
                let lo = self.read(bus, self.regs.address.0);
                self.regs.scratch.set_lo(lo);
            }
            5 => {
                let hi = self.read(bus, self.regs.address.0.wrapping_add(1));
                self.regs.scratch.set_hi(hi);
                self.regs.pc = self.regs.scratch.0;
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    // PHA/PHP/PHX/PHY - 3 cycles
    fn push_cycle<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                self.read(bus, self.regs.pc);
            }
            2 => {
                let value = self.push_value();
                let addr = self.regs.push();
                self.write(bus, addr, value);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    // PLA/PLP/PLX/PLY - 4 cycles
    fn pull_cycle<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                self.read(bus, self.regs.pc);
            }
            2 => {
                self.read(bus, self.regs.sp);
            }
            3 => {
                let addr = self.regs.pop();
                let value = self.read(bus, addr);
                self.execute_pull(value);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    // Branches - 2 cycles, +1 taken, +1 more across a page
    fn branch_cycle<B: Bus>(&mut self, bus: &mut B, condition: Condition) {
        match self.cycle {
            1 => {
                let offset = self.fetch(bus);
                self.regs.scratch.set_lo(offset);
                if !self.branch_taken(condition) {
                    self.finish();
                }
            }
            2 => {
                self.read(bus, self.regs.pc);
                let target = self.branch_target();
                self.regs.address = Latch(target);
                if target & 0xFF00 == self.regs.pc & 0xFF00 {
                    self.regs.pc = target;
                    self.finish();
                }
            }
            3 => {
                let target = self.regs.address.0;
                self.read(bus, (self.regs.pc & 0xFF00) | (target & 0x00FF));
                self.regs.pc = target;
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    pub(crate) fn branch_taken(&self, condition: Condition) -> bool {
        use crate::flags::{C, N, V, Z};
        let p = self.regs.p;
        match condition {
            Condition::Plus => !p.is_set(N),
            Condition::Minus => p.is_set(N),
            Condition::OverflowClear => !p.is_set(V),
            Condition::OverflowSet => p.is_set(V),
            Condition::CarryClear => !p.is_set(C),
            Condition::CarrySet => p.is_set(C),
            Condition::NotEqual => !p.is_set(Z),
            Condition::Equal => p.is_set(Z),
            Condition::Always => true,
        }
    }

    /// PC plus the signed displacement held in the scratch latch.
    pub(crate) fn branch_target(&self) -> u16 {
        let offset = self.regs.scratch.lo() as i8;
        self.regs.pc.wrapping_add(offset as u16)
    }
}
