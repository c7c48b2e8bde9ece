//! Top-level Apple II system.
//!
//! One CPU and one bus. The bus counts every access, so the machine clock
//! is simply the number of bus cycles so far.
//!
//! # Instruction boundary
//!
//! Before each opcode fetch the machine records the opcode PC for write
//! history and checks the read watch at PC for an exec breakpoint. The
//! breakpoint is reported to `Peripherals::breakpoint` and the instruction
//! then runs; stopping is up to the caller.

use cpu_65x02::Cpu65x02;
use emu_core::{Cpu, Observable, Value};

use crate::banking::{BankState, C800Owner};
use crate::bus::Apple2Bus;
use crate::config::{Apple2Config, Apple2Model};
use crate::error::Apple2Error;
use crate::hooks::{NoPeripherals, Peripherals, Watch};
use crate::memory::Memory;
use crate::slots::SlotDevice;
use crate::softswitch::{CLRROM, VideoFlags};

const RESET_VECTOR: u16 = 0xFFFC;

/// Apple II+ or enhanced IIe.
pub struct Apple2<P: Peripherals = NoPeripherals> {
    cpu: Cpu65x02,
    bus: Apple2Bus<P>,
}

impl<P: Peripherals> Apple2<P> {
    /// Build and reset a machine.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails validation.
    pub fn new(config: &Apple2Config, peripherals: P) -> Result<Self, Apple2Error> {
        config.validate()?;
        let model = config.model;

        let mut memory = Memory::new(model, &config.rom);
        memory.watch_range(0xC000, 0x90, Watch::IO_PORT);
        if model.is_iie() {
            // Slot 3 device select and the internal 80-column firmware
            memory.watch_range(0xC0B0, 0x0F, Watch::IO_PORT);
            memory.watch_range(0xC300, 0xFF, Watch::IO_PORT);
        }
        memory.watch_range(CLRROM, 1, Watch::IO_PORT);

        let mut slots: [SlotDevice; 8] = Default::default();
        for (slot, card) in &config.cards {
            let base = 0xC080 + u16::from(*slot) * 0x10;
            memory.watch_range(base, 0x10, Watch::IO_PORT);
            memory.watch_range(0xC000 | (u16::from(*slot) << 8), 0x100, Watch::IO_PORT);
            memory.install_card(*slot, card);
            slots[*slot as usize] = SlotDevice::for_card(card);
            log::info!("slot {slot}: {}", card.name());
        }

        let mut machine = Self {
            cpu: Cpu65x02::new(model.cpu_class()),
            bus: Apple2Bus::new(model, memory, slots, peripherals),
        };
        machine.reset();
        log::info!("{model:?} ready, PC=${:04X}", machine.cpu.regs.pc);
        Ok(machine)
    }

    /// Reset switch: restore bank and display defaults, then jump through
    /// the reset vector.
    pub fn reset(&mut self) {
        self.bus.reset();
        let lo = self.bus.peek(RESET_VECTOR);
        let hi = self.bus.peek(RESET_VECTOR + 1);
        self.cpu.reset_to(u16::from_le_bytes([lo, hi]));
    }

    /// Run one instruction. Returns the cycles it took.
    pub fn step(&mut self) -> u32 {
        if !self.cpu.is_instruction_complete() {
            // Finish whatever `tick` left half done
            let mut cycles = 0;
            while !self.cpu.is_instruction_complete() {
                self.cpu.tick(&mut self.bus);
                cycles += 1;
            }
            return cycles;
        }
        self.instruction_boundary();
        self.cpu.step(&mut self.bus)
    }

    /// Run one bus cycle.
    pub fn tick(&mut self) {
        if self.cpu.is_instruction_complete() {
            self.instruction_boundary();
        }
        self.cpu.tick(&mut self.bus);
    }

    /// Run whole instructions until at least `cycles` have passed. Returns
    /// the number actually run.
    pub fn run_cycles(&mut self, cycles: u64) -> u64 {
        let start = self.bus.cycles();
        while self.bus.cycles() - start < cycles {
            self.step();
        }
        self.bus.cycles() - start
    }

    fn instruction_boundary(&mut self) {
        let pc = self.cpu.regs.pc;
        self.bus.set_opcode_pc(pc);
        if self.bus.read_watch(pc).contains(Watch::EXEC_BREAKPOINT) {
            self.bus.peripherals.breakpoint(pc, Watch::EXEC_BREAKPOINT);
        }
    }

    /// Latch a key. Bit 7 stays set until software clears the strobe.
    pub fn key_press(&mut self, ascii: u8) {
        self.bus.switches.keyboard = ascii | 0x80;
    }

    /// Read as the CPU would see it, without side effects.
    #[must_use]
    pub fn read_debug(&self, address: u16) -> u8 {
        self.bus.peek(address)
    }

    /// Store as the CPU would, without side effects or write history.
    pub fn write_debug(&mut self, address: u16, value: u8) {
        self.bus.poke(address, value);
    }

    /// Copy `data` to `address` through the current write mapping.
    pub fn load(&mut self, address: u16, data: &[u8]) {
        for (i, &byte) in data.iter().enumerate() {
            self.bus.poke(address.wrapping_add(i as u16), byte);
        }
    }

    /// Set breakpoint bits on the bytes currently mapped at `address`.
    /// Non-breakpoint bits are ignored.
    pub fn set_watch(&mut self, address: u16, flags: Watch) {
        self.bus.insert_watch(address, flags & Watch::BREAKPOINTS);
    }

    pub fn clear_watch(&mut self, address: u16, flags: Watch) {
        self.bus.remove_watch(address, flags & Watch::BREAKPOINTS);
    }

    /// Watch flags the CPU would see reading `address`.
    #[must_use]
    pub fn watch(&self, address: u16) -> Watch {
        self.bus.read_watch(address)
    }

    /// PCs of the last two instructions that wrote `address`, most recent
    /// in the low half.
    #[must_use]
    pub fn last_writer(&self, address: u16) -> u32 {
        self.bus.last_writer(address)
    }

    #[must_use]
    pub fn model(&self) -> Apple2Model {
        self.bus.model()
    }

    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.bus.cycles()
    }

    #[must_use]
    pub fn cpu(&self) -> &Cpu65x02 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu65x02 {
        &mut self.cpu
    }

    #[must_use]
    pub fn bus(&self) -> &Apple2Bus<P> {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Apple2Bus<P> {
        &mut self.bus
    }

    #[must_use]
    pub fn peripherals(&self) -> &P {
        &self.bus.peripherals
    }

    pub fn peripherals_mut(&mut self) -> &mut P {
        &mut self.bus.peripherals
    }
}

fn parse_address(text: &str) -> Option<u16> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).ok()
    } else if let Some(hex) = text.strip_prefix('$') {
        u16::from_str_radix(hex, 16).ok()
    } else {
        text.parse().ok()
    }
}

fn bank_flag(name: &str) -> Option<BankState> {
    Some(match name {
        "lc_bank2" => BankState::LC_BANK2,
        "lc_read" => BankState::LC_READ,
        "lc_write" => BankState::LC_WRITE,
        "altzp" => BankState::ALTZP,
        "store80" => BankState::STORE80,
        "ramrd" => BankState::RAMRD,
        "ramwrt" => BankState::RAMWRT,
        "page2" => BankState::PAGE2,
        "hires" => BankState::HIRES,
        "intcxrom" => BankState::INTCXROM,
        "slotc3rom" => BankState::SLOTC3ROM,
        _ => return None,
    })
}

fn video_flag(name: &str) -> Option<VideoFlags> {
    Some(match name {
        "text" => VideoFlags::TEXT,
        "mixed" => VideoFlags::MIXED,
        "col80" => VideoFlags::COL80,
        "altchar" => VideoFlags::ALTCHAR,
        "dhires" => VideoFlags::DHIRES,
        _ => return None,
    })
}

impl<P: Peripherals> Observable for Apple2<P> {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("cpu.") {
            self.cpu.query(rest)
        } else if let Some(rest) = path.strip_prefix("bank.") {
            let banks = &self.bus.banks;
            match rest {
                "pre_write" => Some(banks.pre_write().into()),
                "state" => Some(banks.state().bits().into()),
                _ => bank_flag(rest).map(|flag| banks.state().contains(flag).into()),
            }
        } else if let Some(rest) = path.strip_prefix("video.") {
            video_flag(rest).map(|flag| self.bus.switches.video.contains(flag).into())
        } else if let Some(rest) = path.strip_prefix("memory.") {
            parse_address(rest).map(|address| Value::U8(self.bus.peek(address)))
        } else if let Some(rest) = path.strip_prefix("watch.") {
            parse_address(rest).map(|address| Value::U8(self.bus.read_watch(address).bits()))
        } else if let Some(rest) = path.strip_prefix("slot") {
            let (slot, field) = rest.split_once('.')?;
            let slot: usize = slot.parse().ok().filter(|s| (1..=7).contains(s))?;
            let device = &self.bus.slots[slot];
            match (field, device) {
                ("device", _) => Some(device.name().into()),
                ("motor", SlotDevice::DiskIi(disk)) => Some(disk.motor_on.into()),
                ("phases", SlotDevice::DiskIi(disk)) => Some(disk.phases.into()),
                ("drive", SlotDevice::DiskIi(disk)) => Some(disk.drive.into()),
                ("status", SlotDevice::Smartport(port)) => Some(port.status.into()),
                _ => None,
            }
        } else {
            match path {
                "keyboard.latch" => Some(self.bus.switches.keyboard.into()),
                "c800.owner" => Some(Value::String(match self.bus.banks.c800_owner() {
                    C800Owner::None => "none".to_string(),
                    C800Owner::Internal => "internal".to_string(),
                    C800Owner::Slot(slot) => format!("slot{slot}"),
                })),
                "cycles" => Some(self.bus.cycles().into()),
                "vbl" => Some(self.bus.in_vbl().into()),
                "model" => Some(
                    match self.model() {
                        Apple2Model::Plus => "II+",
                        Apple2Model::Enhanced => "IIe",
                    }
                    .into(),
                ),
                _ => self.cpu.query(path),
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "cpu.<65x02_paths>",
            "bank.state",
            "bank.pre_write",
            "bank.{lc_bank2,lc_read,lc_write,altzp,store80,ramrd,ramwrt}",
            "bank.{page2,hires,intcxrom,slotc3rom}",
            "video.{text,mixed,col80,altchar,dhires}",
            "memory.<address>",
            "watch.<address>",
            "slot<n>.device",
            "slot<n>.{motor,phases,drive}",
            "slot<n>.status",
            "keyboard.latch",
            "c800.owner",
            "cycles",
            "vbl",
            "model",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SlotCard;

    /// IIe ROM that resets to $E000, where a JMP $E000 loop sits.
    fn iie_rom() -> Vec<u8> {
        let mut rom = vec![0xEA; 0x4000];
        rom[0x2000..0x2003].copy_from_slice(&[0x4C, 0x00, 0xE0]);
        rom[0x3FFC] = 0x00;
        rom[0x3FFD] = 0xE0;
        rom
    }

    fn make_iie() -> Apple2 {
        Apple2::new(
            &Apple2Config::new(Apple2Model::Enhanced, iie_rom()),
            NoPeripherals,
        )
        .expect("valid config")
    }

    #[test]
    fn reset_vector_and_stack() {
        let machine = make_iie();
        assert_eq!(machine.cpu().regs.pc, 0xE000);
        assert_eq!(machine.cpu().regs.sp, 0x01FF);
        assert_eq!(machine.read_debug(0x0400), 0xA0);
        assert_eq!(machine.read_debug(0x07FF), 0xA0);
    }

    #[test]
    fn bad_rom_is_rejected() {
        let result = Apple2::new(
            &Apple2Config::new(Apple2Model::Enhanced, vec![0; 0x3000]),
            NoPeripherals,
        );
        assert!(matches!(result, Err(Apple2Error::RomSize { .. })));
    }

    #[test]
    fn io_watches_installed() {
        let machine = make_iie();
        assert!(machine.watch(0xC000).contains(Watch::IO_PORT));
        assert!(machine.watch(0xC08F).contains(Watch::IO_PORT));
        assert!(machine.watch(0xC300).contains(Watch::IO_PORT));
        assert!(machine.watch(CLRROM).contains(Watch::IO_PORT));
        assert!(machine.watch(0xC0E0).is_empty());
        assert!(machine.watch(0xC600).is_empty());
    }

    #[test]
    fn card_adds_watches() {
        let config = Apple2Config::new(Apple2Model::Enhanced, iie_rom()).with_card(
            6,
            SlotCard::DiskII {
                rom: vec![0xA2; 0x100],
            },
        );
        let machine = Apple2::new(&config, NoPeripherals).expect("valid config");
        assert!(machine.watch(0xC0E0).contains(Watch::IO_PORT));
        assert!(machine.watch(0xC6FF).contains(Watch::IO_PORT));
        assert_eq!(machine.read_debug(0xC600), 0xA2);
        assert_eq!(machine.query("slot6.device"), Some(Value::from("Disk II")));
    }

    #[test]
    fn run_cycles_covers_request() {
        let mut machine = make_iie();
        let ran = machine.run_cycles(100);
        assert!(ran >= 100);
        assert_eq!(machine.cycles(), ran);
        assert_eq!(machine.cpu().regs.cycles, ran);
    }

    #[test]
    fn set_watch_ignores_io_bit() {
        let mut machine = make_iie();
        machine.set_watch(0x0300, Watch::IO_PORT | Watch::WRITE_BREAKPOINT);
        assert_eq!(machine.watch(0x0300), Watch::WRITE_BREAKPOINT);
        machine.clear_watch(0x0300, Watch::BREAKPOINTS);
        assert!(machine.watch(0x0300).is_empty());
    }

    #[test]
    fn query_paths() {
        let mut machine = make_iie();
        machine.key_press(b'A');
        assert_eq!(machine.query("keyboard.latch"), Some(Value::U8(0xC1)));
        assert_eq!(machine.query("cpu.pc"), Some(Value::U16(0xE000)));
        assert_eq!(machine.query("bank.lc_write"), Some(Value::Bool(true)));
        assert_eq!(machine.query("c800.owner"), Some(Value::from("none")));
        assert_eq!(machine.query("video.text"), Some(Value::Bool(true)));
        assert_eq!(machine.query("memory.$E000"), Some(Value::U8(0x4C)));
        assert_eq!(machine.query("memory.0xE001"), Some(Value::U8(0x00)));
        assert_eq!(machine.query("model"), Some(Value::from("IIe")));
        assert_eq!(machine.query("slot9.device"), None);
        assert_eq!(machine.query("bank.bogus"), None);
    }
}
