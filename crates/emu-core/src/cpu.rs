//! CPU core trait.

use crate::Bus;

/// A CPU core.
///
/// CPUs take the bus by reference on every call so the same bus can be
/// inspected by the machine between calls. A CPU offers two ways to run:
/// `tick` advances a single bus cycle, `step` runs to the end of the
/// current instruction. Both must leave the machine in the same state.
pub trait Cpu {
    /// The type used for register inspection.
    type Registers;

    /// Advance the CPU by exactly one bus cycle.
    fn tick<B: Bus>(&mut self, bus: &mut B);

    /// Run until the current instruction completes and return the number
    /// of bus cycles it took.
    ///
    /// If called part-way through an instruction started by `tick`, only
    /// the remaining cycles are executed and counted.
    fn step<B: Bus>(&mut self, bus: &mut B) -> u32;

    /// Returns the current program counter.
    fn pc(&self) -> u16;

    /// Returns a snapshot of all registers for inspection.
    fn registers(&self) -> Self::Registers;

    /// Returns true between instructions.
    fn is_instruction_complete(&self) -> bool;

    /// Raise or lower the maskable interrupt line.
    fn set_irq(&mut self, active: bool);

    /// Request a non-maskable interrupt.
    fn nmi(&mut self);

    /// Reset the CPU and load the program counter from the reset vector.
    fn reset<B: Bus>(&mut self, bus: &mut B);
}
