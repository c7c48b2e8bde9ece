//! Watch bits and the callback surface the machine drives.
//!
//! Every RAM and language-card byte carries a `Watch` byte. A non-empty
//! watch on the byte a CPU access lands on diverts that access: I/O ports
//! go to the soft-switch dispatcher, breakpoint bits go to
//! `Peripherals::breakpoint`. Everything the core cannot do on its own
//! (disk mechanics, audio, joysticks, debugger policy) is a `Peripherals`
//! method with a do-nothing default.

use bitflags::bitflags;

use crate::slots::CommandBlock;
use crate::softswitch::FLOATING_BUS;

bitflags! {
    /// Per-byte watch flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Watch: u8 {
        /// Reads and writes go to the soft-switch dispatcher. Writes are
        /// not stored.
        const IO_PORT = 1 << 0;
        /// Break before executing the instruction at this address.
        const EXEC_BREAKPOINT = 1 << 1;
        /// Break after reading this byte.
        const READ_BREAKPOINT = 1 << 2;
        /// Break after writing this byte.
        const WRITE_BREAKPOINT = 1 << 3;

        const BREAKPOINTS = Self::EXEC_BREAKPOINT.bits()
            | Self::READ_BREAKPOINT.bits()
            | Self::WRITE_BREAKPOINT.bits();
    }
}

/// Devices and tooling outside the core.
///
/// The machine owns one implementor and calls it synchronously from inside
/// a bus access, in emulated order.
pub trait Peripherals {
    /// A watched byte was touched. `kind` is the single breakpoint bit that
    /// matched. The core does not act on breakpoints itself.
    fn breakpoint(&mut self, _address: u16, _kind: Watch) {}

    /// Device-select read for a generic card ($C090-$C0FF).
    fn io_read(&mut self, _address: u16) -> u8 {
        FLOATING_BUS
    }

    /// Device-select write for a generic card ($C090-$C0FF).
    fn io_write(&mut self, _address: u16, _value: u8) {}

    /// Any access to $C030-$C03F.
    fn speaker_toggle(&mut self) {}

    fn disk_motor(&mut self, _slot: u8, _on: bool) {}

    fn disk_drive_select(&mut self, _slot: u8, _drive: u8) {}

    /// Stepper phase magnets changed. Bit n of `phases` is phase n.
    fn disk_phase_step(&mut self, _slot: u8, _phases: u8) {}

    /// Next nibble under the read head. $7F means nothing readable.
    fn disk_read_byte(&mut self, _slot: u8) -> u8 {
        0x7F
    }

    /// Run a Smartport command in place. The result code goes in byte 0.
    fn smartport_command(&mut self, _slot: u8, block: &mut CommandBlock) {
        block.set_result(CommandBlock::IO_ERROR);
    }

    /// Pushbutton 0-2 (0 and 1 are also the open and closed apple keys).
    fn read_button(&mut self, _button: u8) -> bool {
        false
    }

    /// Paddle 0-3 timer. Bit 7 set while the timer is still running.
    fn read_paddle(&mut self, _paddle: u8, _cycle: u64) -> u8 {
        0x80
    }

    /// Paddle timers restarted by $C070-$C07F.
    fn paddle_trigger(&mut self, _cycle: u64) {}

    /// More pasted input is queued, so the key strobe should stay up.
    fn paste_pending(&mut self) -> bool {
        false
    }
}

/// A machine with nothing attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPeripherals;

impl Peripherals for NoPeripherals {}
