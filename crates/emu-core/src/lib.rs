//! Core traits and types shared by the CPU and machine crates.
//!
//! One bus access is one CPU cycle. Every timing figure in the emulator is
//! derived from that rule, so the traits here deal in bus accesses rather
//! than wall-clock time.

mod bus;
mod cpu;
mod observable;

pub use bus::{Bus, SimpleBus};
pub use cpu::Cpu;
pub use observable::{Observable, Value};
