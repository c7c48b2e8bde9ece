//! Apple II+ and enhanced IIe emulation core.
//!
//! The CPU sees memory through a 256-entry page table. Bank switching
//! repoints pages instead of copying bytes, so the language card, aux RAM
//! and slot ROM windows cost nothing on the access path. Each RAM byte
//! carries a watch byte: I/O ports divert to the soft-switch dispatcher,
//! breakpoint bits call out to the `Peripherals` hook.
//!
//! Disk mechanics, audio, video and input devices live outside the core
//! behind the `Peripherals` trait.

mod apple2;
pub mod banking;
mod bus;
pub mod config;
mod error;
pub mod hooks;
pub mod memory;
pub mod pages;
pub mod slots;
pub mod softswitch;

pub use apple2::Apple2;
pub use banking::{BankState, BankSwitch, C800Owner};
pub use bus::Apple2Bus;
pub use config::{Apple2Config, Apple2Model, SlotCard};
pub use error::Apple2Error;
pub use hooks::{NoPeripherals, Peripherals, Watch};
pub use slots::{CommandBlock, SlotDevice, SmartportCommand};
pub use softswitch::{SoftSwitches, VideoFlags};
