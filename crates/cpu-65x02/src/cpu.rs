//! 65x02 CPU state and the trait glue shared by both execution models.
//!
//! The cycle-stepped engine lives in `stepped.rs` and the opcode-scored
//! engine in `scored.rs`. They share the opcode fetch, the operation
//! semantics in `alu.rs` and the dummy-cycle rules below, which is what
//! keeps their bus traces identical.

use emu_core::{Bus, Cpu, Observable, Value};

use crate::flags::{C, D, I, N, V, Z};
use crate::instruction::{Instruction, Kind, Mode, Op};
use crate::registers::Latch;
use crate::{CpuClass, Registers};

pub(crate) const NMI_VECTOR: u16 = 0xFFFA;
pub(crate) const RESET_VECTOR: u16 = 0xFFFC;
pub(crate) const IRQ_VECTOR: u16 = 0xFFFE;

/// Where the current instruction is in its pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    /// The next cycle fetches an opcode or starts an interrupt.
    Fetch,
    /// Building the effective address.
    Address,
    /// Accessing the operand. Counts from zero.
    Operand(u8),
    /// Stack, flow-control and register-only sequences.
    Control,
}

/// A 6502 or 65C02.
///
/// Each bus access is one cycle and bumps `regs.cycles`. `tick` performs
/// exactly one access; `step` finishes the current instruction.
#[derive(Debug, Clone)]
pub struct Cpu65x02 {
    pub regs: Registers,
    pub(crate) stage: Stage,
    pub(crate) instr: Instruction,
    /// Cycle within the current instruction (0 = opcode fetch).
    pub(crate) cycle: u8,
    /// Indexing carried into the high byte of the address.
    pub(crate) crossed: bool,
    /// Vector fetched by the BRK/IRQ/NMI sequence in flight.
    pub(crate) vector: u16,
    /// The BRK sequence in flight was started by an interrupt line.
    pub(crate) hardware_interrupt: bool,
    nmi_pending: bool,
    irq_line: bool,
}

impl Cpu65x02 {
    #[must_use]
    pub fn new(class: CpuClass) -> Self {
        Self {
            regs: Registers::new(class),
            stage: Stage::Fetch,
            instr: Instruction::decode(class, 0xEA),
            cycle: 0,
            crossed: false,
            vector: IRQ_VECTOR,
            hardware_interrupt: false,
            nmi_pending: false,
            irq_line: false,
        }
    }

    #[must_use]
    pub fn class(&self) -> CpuClass {
        self.regs.class
    }

    /// The instruction in flight, or the last one executed.
    #[must_use]
    pub fn current_instruction(&self) -> Instruction {
        self.instr
    }

    /// Reset with an already-known reset vector.
    ///
    /// Stack pointer goes to the top of page one, interrupts are masked and
    /// any half-finished instruction is abandoned. The 65C02 also leaves
    /// decimal mode.
    pub fn reset_to(&mut self, pc: u16) {
        self.regs.pc = pc;
        self.regs.sp = 0x01FF;
        self.regs.p.set(I);
        if self.regs.is_cmos() {
            self.regs.p.clear(D);
        }
        self.stage = Stage::Fetch;
        self.cycle = 0;
        self.nmi_pending = false;
        log::debug!("{:?} reset, PC=${pc:04X}", self.regs.class);
    }

    pub(crate) fn finish(&mut self) {
        self.stage = Stage::Fetch;
    }

    pub(crate) fn read<B: Bus>(&mut self, bus: &mut B, address: u16) -> u8 {
        self.regs.cycles += 1;
        bus.read(address)
    }

    pub(crate) fn write<B: Bus>(&mut self, bus: &mut B, address: u16, value: u8) {
        self.regs.cycles += 1;
        bus.write(address, value);
    }

    /// Read the byte at PC and advance PC.
    pub(crate) fn fetch<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let value = self.read(bus, self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    /// The opcode fetch cycle. Decodes the instruction and picks the first
    /// pipeline stage, or starts an interrupt if one is pending.
    pub(crate) fn fetch_opcode<B: Bus>(&mut self, bus: &mut B) {
        self.cycle = 0;
        self.crossed = false;

        let irq = self.irq_line && !self.regs.p.is_set(I);
        if self.nmi_pending || irq {
            self.vector = if self.nmi_pending { NMI_VECTOR } else { IRQ_VECTOR };
            self.nmi_pending = false;
            self.hardware_interrupt = true;
            // The fetched opcode is discarded and PC is not advanced
            self.read(bus, self.regs.pc);
            self.instr = Instruction::decode(self.regs.class, 0x00);
            self.stage = Stage::Control;
            return;
        }

        let opcode = self.fetch(bus);
        self.instr = Instruction::decode(self.regs.class, opcode);
        self.vector = IRQ_VECTOR;
        self.hardware_interrupt = false;

        self.stage = match (self.instr.mode, self.instr.op.kind()) {
            (Mode::Single, _) => Stage::Fetch,
            (Mode::Immediate, _) => {
                self.regs.address = Latch(self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                Stage::Operand(0)
            }
            (Mode::Implied | Mode::Accumulator | Mode::Relative, _) | (_, Kind::Control) => {
                Stage::Control
            }
            _ => Stage::Address,
        };
    }

    /// Whether indexed addressing spends a cycle fixing the high byte.
    ///
    /// Reads only pay when the index carried. Stores always pay. The 6502
    /// always pays on read-modify-write; the 65C02 only does for INC and
    /// DEC.
    pub(crate) fn needs_fixup(&self, crossed: bool) -> bool {
        match self.instr.op.kind() {
            Kind::Read | Kind::Control => crossed,
            Kind::Write => true,
            Kind::Modify => {
                !self.regs.is_cmos() || matches!(self.instr.op, Op::Inc | Op::Dec) || crossed
            }
        }
    }

    /// The dummy read of the high-byte fixup cycle. The 6502 reads the
    /// uncorrected address; the 65C02 re-reads the last operand byte.
    pub(crate) fn fixup_read<B: Bus>(&mut self, bus: &mut B, uncorrected: u16) {
        let address = if self.regs.is_cmos() {
            self.regs.pc.wrapping_sub(1)
        } else {
            uncorrected
        };
        self.read(bus, address);
    }

    /// Second access of a read-modify-write: the 6502 writes the old value
    /// back, the 65C02 reads it again.
    pub(crate) fn modify_dummy<B: Bus>(&mut self, bus: &mut B, address: u16, old: u8) {
        if self.regs.is_cmos() {
            self.read(bus, address);
        } else {
            self.write(bus, address, old);
        }
    }

    /// Set up the interrupt flags at the end of a BRK/IRQ/NMI sequence.
    pub(crate) fn enter_interrupt(&mut self) {
        self.regs.p.set(I);
        if self.regs.is_cmos() {
            self.regs.p.clear(D);
        }
    }
}

// =========================================================================
// Trait implementations
// =========================================================================

impl Cpu for Cpu65x02 {
    type Registers = Registers;

    fn tick<B: Bus>(&mut self, bus: &mut B) {
        self.tick_cycle(bus);
    }

    fn step<B: Bus>(&mut self, bus: &mut B) -> u32 {
        let start = self.regs.cycles;
        self.run_instruction(bus);
        (self.regs.cycles - start) as u32
    }

    fn pc(&self) -> u16 {
        self.regs.pc
    }

    fn registers(&self) -> Registers {
        self.regs
    }

    fn is_instruction_complete(&self) -> bool {
        self.stage == Stage::Fetch
    }

    fn set_irq(&mut self, active: bool) {
        self.irq_line = active;
    }

    fn nmi(&mut self) {
        self.nmi_pending = true;
    }

    fn reset<B: Bus>(&mut self, bus: &mut B) {
        let lo = bus.read(RESET_VECTOR);
        let hi = bus.read(RESET_VECTOR + 1);
        self.reset_to(u16::from_le_bytes([lo, hi]));
    }
}

impl Observable for Cpu65x02 {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "pc" => Some(self.regs.pc.into()),
            "a" => Some(self.regs.a.into()),
            "x" => Some(self.regs.x.into()),
            "y" => Some(self.regs.y.into()),
            "sp" => Some(self.regs.sp.into()),
            "p" => Some(self.regs.p.bits().into()),
            "flags.c" => Some(self.regs.p.is_set(C).into()),
            "flags.z" => Some(self.regs.p.is_set(Z).into()),
            "flags.i" => Some(self.regs.p.is_set(I).into()),
            "flags.d" => Some(self.regs.p.is_set(D).into()),
            "flags.v" => Some(self.regs.p.is_set(V).into()),
            "flags.n" => Some(self.regs.p.is_set(N).into()),
            "address" => Some(self.regs.address.0.into()),
            "scratch" => Some(self.regs.scratch.0.into()),
            "cycles" => Some(self.regs.cycles.into()),
            "class" => Some(
                match self.regs.class {
                    CpuClass::Mos6502 => "6502",
                    CpuClass::Wdc65C02 => "65C02",
                }
                .into(),
            ),
            "instruction" => Some(self.instr.op.mnemonic().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "pc",
            "a",
            "x",
            "y",
            "sp",
            "p",
            "flags.c",
            "flags.z",
            "flags.i",
            "flags.d",
            "flags.v",
            "flags.n",
            "address",
            "scratch",
            "cycles",
            "class",
            "instruction",
        ]
    }
}
