//! Cycle-accurate 6502 and 65C02 CPU emulator.
//!
//! One bus access is one cycle. The CPU can be driven a cycle at a time
//! with `tick()` or an instruction at a time with `step()`, which returns
//! the number of cycles spent. Both produce the same bus traffic, so a
//! machine can switch between them freely.

mod alu;
mod cpu;
pub mod flags;
mod instruction;
mod registers;
mod scored;
mod stepped;

pub use cpu::Cpu65x02;
pub use flags::Status;
pub use instruction::{Condition, Instruction, Kind, Mode, Op};
pub use registers::{CpuClass, Latch, Registers};

/// Apple II CPU clock in Hz (14.31818 MHz / 14, with the long cycle).
pub const CPU_FREQUENCY: f64 = 1_020_484.4;
