//! Apple II bus: every CPU access goes through the page table.
//!
//! Implements `emu_core::Bus`. A read or write resolves its page, then
//! checks the watch byte behind it. Unwatched accesses touch memory and
//! nothing else. Watched ones may go to the soft-switch dispatcher
//! (`IO_PORT`) and may call the breakpoint hook afterwards.

use emu_core::Bus;

use crate::banking::BankSwitch;
use crate::config::Apple2Model;
use crate::hooks::{Peripherals, Watch};
use crate::memory::Memory;
use crate::pages::PageTable;
use crate::slots::SlotDevice;
use crate::softswitch::{FLOATING_BUS, SoftSwitches};

/// The Apple II bus, implementing `emu_core::Bus`.
///
/// Owns memory, the page table, the switch state, slot devices and the
/// external peripherals.
pub struct Apple2Bus<P> {
    pub memory: Memory,
    pub pages: PageTable,
    pub banks: BankSwitch,
    pub switches: SoftSwitches,
    pub slots: [SlotDevice; 8],
    pub peripherals: P,
    model: Apple2Model,
    /// Bus accesses so far. One per CPU cycle.
    cycles: u64,
    /// PC of the instruction in flight, for write history.
    opcode_pc: u16,
}

impl<P: Peripherals> Apple2Bus<P> {
    /// Assemble a bus. The page table is identity-mapped until `reset`.
    #[must_use]
    pub fn new(model: Apple2Model, memory: Memory, slots: [SlotDevice; 8], peripherals: P) -> Self {
        Self {
            memory,
            pages: PageTable::new(),
            banks: BankSwitch::new(),
            switches: SoftSwitches::new(),
            slots,
            peripherals,
            model,
            cycles: 0,
            opcode_pc: 0,
        }
    }

    #[must_use]
    pub fn model(&self) -> Apple2Model {
        self.model
    }

    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn set_opcode_pc(&mut self, pc: u16) {
        self.opcode_pc = pc;
    }

    /// Machine reset: blank the text page, restore switch defaults and
    /// rebuild the page table.
    pub fn reset(&mut self) {
        self.memory.ram_mut()[0x0400..0x0800].fill(FLOATING_BUS);
        self.switches.reset();
        self.banks.reset(&mut self.pages, &self.memory, self.model);
    }

    /// Read what the CPU would see, without side effects.
    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        self.memory.read(self.pages.read(address), address as usize & 0xFF)
    }

    /// Store where the CPU would store, without side effects or history.
    pub fn poke(&mut self, address: u16, value: u8) {
        let target = self.pages.write(address);
        self.memory.write(target, address as usize & 0xFF, value);
    }

    /// Watch flags a CPU read of `address` would see.
    #[must_use]
    pub fn read_watch(&self, address: u16) -> Watch {
        self.memory.watch(self.pages.read_watch(address), address as usize & 0xFF)
    }

    /// Add breakpoint flags to the bytes currently mapped at `address`
    /// for reading and for writing.
    pub fn insert_watch(&mut self, address: u16, flags: Watch) {
        let offset = address as usize & 0xFF;
        self.memory.insert_watch(self.pages.read_watch(address), offset, flags);
        self.memory.insert_watch(self.pages.write(address), offset, flags);
    }

    pub fn remove_watch(&mut self, address: u16, flags: Watch) {
        let offset = address as usize & 0xFF;
        self.memory.remove_watch(self.pages.read_watch(address), offset, flags);
        self.memory.remove_watch(self.pages.write(address), offset, flags);
    }

    /// PCs of the last two instructions that wrote the byte a CPU write to
    /// `address` would land on. Most recent in the low 16 bits.
    #[must_use]
    pub fn last_writer(&self, address: u16) -> u32 {
        self.memory.last_write(self.pages.write(address), address as usize & 0xFF)
    }
}

impl<P: Peripherals> Bus for Apple2Bus<P> {
    fn read(&mut self, address: u16) -> u8 {
        self.cycles += 1;
        let watch = self.read_watch(address);
        if watch.is_empty() {
            return self.peek(address);
        }

        let value = if watch.contains(Watch::IO_PORT) {
            self.io_read(address)
        } else {
            self.peek(address)
        };
        if watch.contains(Watch::READ_BREAKPOINT) {
            self.peripherals.breakpoint(address, Watch::READ_BREAKPOINT);
        }
        value
    }

    fn write(&mut self, address: u16, value: u8) {
        self.cycles += 1;
        let target = self.pages.write(address);
        let offset = address as usize & 0xFF;
        let watch = self.memory.watch(target, offset);
        self.memory.record_write(target, offset, self.opcode_pc);

        if watch.contains(Watch::IO_PORT) {
            self.io_write(address, value);
        } else {
            self.memory.write(target, offset, value);
        }
        if watch.contains(Watch::WRITE_BREAKPOINT) {
            self.peripherals.breakpoint(address, Watch::WRITE_BREAKPOINT);
        }
    }
}
