//! Opcode-scored execution: run a whole instruction, report its cycles.
//!
//! Each instruction is executed front to back with the addressing helpers
//! below. The helpers issue the same bus accesses, in the same order, as
//! the cycle-stepped pipeline, so either engine can drive a machine.

use emu_core::Bus;

use crate::cpu::Stage;
use crate::instruction::{Kind, Mode, Op};
use crate::registers::Latch;
use crate::{Cpu65x02, Status};

impl Cpu65x02 {
    /// Run to the next instruction boundary.
    ///
    /// An instruction already started by `tick` is completed with the
    /// stepped pipeline so no cycle is repeated or skipped.
    pub(crate) fn run_instruction<B: Bus>(&mut self, bus: &mut B) {
        if self.stage != Stage::Fetch {
            while self.stage != Stage::Fetch {
                self.tick_cycle(bus);
            }
            return;
        }

        self.fetch_opcode(bus);
        let stage = self.stage;
        // The scored engine owns the rest of the instruction
        self.stage = Stage::Fetch;

        match stage {
            Stage::Fetch => {}
            Stage::Operand(_) => {
                // Immediate: the operand address was latched at fetch
                let address = self.regs.address.0;
                self.read_operand(bus, address);
            }
            Stage::Address => {
                let address = self.effective_address(bus);
                self.regs.address = Latch(address);
                match self.instr.op.kind() {
                    Kind::Read => self.read_operand(bus, address),
                    Kind::Write => {
                        let value = self.store_value();
                        self.write(bus, address, value);
                    }
                    Kind::Modify => self.modify_operand(bus, address),
                    Kind::Control => unreachable!(),
                }
            }
            Stage::Control => self.execute_control(bus),
        }
    }

    fn read_operand<B: Bus>(&mut self, bus: &mut B, address: u16) {
        let value = self.read(bus, address);
        self.regs.scratch.set_lo(value);
        if self.execute_read(value) {
            self.read(bus, address);
        }
    }

    fn modify_operand<B: Bus>(&mut self, bus: &mut B, address: u16) {
        let old = self.read(bus, address);
        self.regs.scratch.set_lo(old);
        self.modify_dummy(bus, address, old);
        let result = self.execute_modify(old);
        self.regs.scratch.set_hi(result);
        self.write(bus, address, result);
    }

    // =========================================================================
    // Addressing mode helpers
    // =========================================================================

    fn effective_address<B: Bus>(&mut self, bus: &mut B) -> u16 {
        match self.instr.mode {
            Mode::ZeroPage => self.addr_zero_page(bus),
            Mode::ZeroPageX => self.addr_zero_page_indexed(bus, self.regs.x),
            Mode::ZeroPageY => self.addr_zero_page_indexed(bus, self.regs.y),
            Mode::Absolute => self.fetch_word(bus),
            Mode::AbsoluteX => self.addr_absolute_indexed(bus, self.regs.x),
            Mode::AbsoluteY => self.addr_absolute_indexed(bus, self.regs.y),
            Mode::IndexedIndirect => self.addr_indexed_indirect(bus),
            Mode::IndirectIndexed => self.addr_indirect_indexed(bus),
            Mode::ZeroPageIndirect => self.addr_zero_page_indirect(bus),
            _ => unreachable!(),
        }
    }

    /// Fetch a 16-bit word (little-endian) at PC.
    fn fetch_word<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch(bus);
        let hi = self.fetch(bus);
        u16::from_le_bytes([lo, hi])
    }

    /// Read a pointer from zero page. The high byte wraps within page zero.
    fn read_zp_pointer<B: Bus>(&mut self, bus: &mut B, ptr: u8) -> u16 {
        let lo = self.read(bus, u16::from(ptr));
        let hi = self.read(bus, u16::from(ptr.wrapping_add(1)));
        u16::from_le_bytes([lo, hi])
    }

    /// Zero Page: $nn
    fn addr_zero_page<B: Bus>(&mut self, bus: &mut B) -> u16 {
        u16::from(self.fetch(bus))
    }

    /// Zero Page,X / Zero Page,Y: wraps within zero page
    fn addr_zero_page_indexed<B: Bus>(&mut self, bus: &mut B, index: u8) -> u16 {
        let base = self.fetch(bus);
        self.read(bus, u16::from(base));
        u16::from(base.wrapping_add(index))
    }

    /// Absolute,X / Absolute,Y: pays the fixup cycle per `needs_fixup`
    fn addr_absolute_indexed<B: Bus>(&mut self, bus: &mut B, index: u8) -> u16 {
        let base = self.fetch_word(bus);
        self.index_with_fixup(bus, base, index)
    }

    /// Indexed Indirect: ($nn,X)
    fn addr_indexed_indirect<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let base = self.fetch(bus);
        self.read(bus, u16::from(base));
        self.read_zp_pointer(bus, base.wrapping_add(self.regs.x))
    }

    /// Indirect Indexed: ($nn),Y
    fn addr_indirect_indexed<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let ptr = self.fetch(bus);
        let base = self.read_zp_pointer(bus, ptr);
        self.index_with_fixup(bus, base, self.regs.y)
    }

    /// Zero Page Indirect: ($nn)
    fn addr_zero_page_indirect<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let ptr = self.fetch(bus);
        self.read_zp_pointer(bus, ptr)
    }

    fn index_with_fixup<B: Bus>(&mut self, bus: &mut B, base: u16, index: u8) -> u16 {
        let addr = base.wrapping_add(u16::from(index));
        self.crossed = (base ^ addr) & 0xFF00 != 0;
        if self.needs_fixup(self.crossed) {
            let uncorrected = (base & 0xFF00) | (addr & 0x00FF);
            self.fixup_read(bus, uncorrected);
        }
        addr
    }

    // =========================================================================
    // Control instructions
    // =========================================================================

    fn execute_control<B: Bus>(&mut self, bus: &mut B) {
        match self.instr.op {
            Op::Brk => self.op_brk(bus),
            Op::Jsr => self.op_jsr(bus),
            Op::Rts => self.op_rts(bus),
            Op::Rti => self.op_rti(bus),
            Op::Jmp => self.op_jmp(bus),
            Op::Pha | Op::Php | Op::Phx | Op::Phy => {
                self.read(bus, self.regs.pc);
                let value = self.push_value();
                self.push(bus, value);
            }
            Op::Pla | Op::Plp | Op::Plx | Op::Ply => {
                self.read(bus, self.regs.pc);
                self.read(bus, self.regs.sp);
                let value = self.pull(bus);
                self.execute_pull(value);
            }
            Op::Branch(condition) => {
                let offset = self.fetch(bus);
                self.regs.scratch.set_lo(offset);
                if self.branch_taken(condition) {
                    self.op_branch(bus);
                }
            }
            _ => {
                self.read(bus, self.regs.pc);
                self.execute_implied();
            }
        }
    }

    fn push<B: Bus>(&mut self, bus: &mut B, value: u8) {
        let addr = self.regs.push();
        self.write(bus, addr, value);
    }

    fn pull<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let addr = self.regs.pop();
        self.read(bus, addr)
    }

    fn op_brk<B: Bus>(&mut self, bus: &mut B) {
        self.read(bus, self.regs.pc);
        if !self.hardware_interrupt {
            self.regs.pc = self.regs.pc.wrapping_add(1);
        }
        self.push(bus, (self.regs.pc >> 8) as u8);
        self.push(bus, self.regs.pc as u8);
        let p = if self.hardware_interrupt {
            self.regs.p.to_byte_irq()
        } else {
            self.regs.p.to_byte_brk()
        };
        self.push(bus, p);
        let lo = self.read(bus, self.vector);
        let hi = self.read(bus, self.vector.wrapping_add(1));
        self.regs.address = Latch(u16::from_le_bytes([lo, hi]));
        self.regs.pc = self.regs.address.0;
        self.enter_interrupt();
    }

    fn op_jsr<B: Bus>(&mut self, bus: &mut B) {
        let lo = self.fetch(bus);
        self.read(bus, self.regs.sp);
        self.push(bus, (self.regs.pc >> 8) as u8);
        self.push(bus, self.regs.pc as u8);
        let hi = self.read(bus, self.regs.pc);
        self.regs.address = Latch(u16::from_le_bytes([lo, hi]));
        self.regs.pc = self.regs.address.0;
    }

    fn op_rts<B: Bus>(&mut self, bus: &mut B) {
        self.read(bus, self.regs.pc);
        self.read(bus, self.regs.sp);
        let lo = self.pull(bus);
        let hi = self.pull(bus);
        let addr = u16::from_le_bytes([lo, hi]);
        self.regs.address = Latch(addr);
        self.read(bus, addr);
        self.regs.pc = addr.wrapping_add(1);
    }

    fn op_rti<B: Bus>(&mut self, bus: &mut B) {
        self.read(bus, self.regs.pc);
        self.read(bus, self.regs.sp);
        let p = self.pull(bus);
        self.regs.p = Status::from_byte(p);
        let lo = self.pull(bus);
        let hi = self.pull(bus);
        self.regs.address = Latch(u16::from_le_bytes([lo, hi]));
        self.regs.pc = self.regs.address.0;
    }

    fn op_jmp<B: Bus>(&mut self, bus: &mut B) {
        let addr = self.fetch_word(bus);
        self.regs.address = Latch(addr);
        let target = match self.instr.mode {
            Mode::Absolute => addr,
            Mode::Indirect => {
                let lo = self.read(bus, addr);
                let wrapped = (addr & 0xFF00) | (addr.wrapping_add(1) & 0x00FF);
                let mut hi = self.read(bus, wrapped);
                // The 65C02 spends a cycle re-reading the correct high byte
                if self.regs.is_cmos() {
                    hi = self.read(bus, addr.wrapping_add(1));
                }
                u16::from_le_bytes([lo, hi])
            }
            _ => {
                self.read(bus, self.regs.pc.wrapping_sub(2));
                let ptr = addr.wrapping_add(u16::from(self.regs.x));
                self.regs.address = Latch(ptr);
                let lo = self.read(bus, ptr);
                let hi = self.read(bus, ptr.wrapping_add(1));
                u16::from_le_bytes([lo, hi])
            }
        };
        self.regs.scratch = Latch(target);
        self.regs.pc = target;
    }

    /// Taken branch: one extra cycle, plus one more across a page.
    fn op_branch<B: Bus>(&mut self, bus: &mut B) {
        self.read(bus, self.regs.pc);
        let target = self.branch_target();
        self.regs.address = Latch(target);
        if target & 0xFF00 != self.regs.pc & 0xFF00 {
            self.read(bus, (self.regs.pc & 0xFF00) | (target & 0x00FF));
        }
        self.regs.pc = target;
    }
}
