//! The cycle-stepped and opcode-scored engines must be interchangeable:
//! same bus accesses in the same order, same final state, same cycles.

use cpu_65x02::{Cpu65x02, CpuClass, Status};
use emu_core::{Bus, Cpu};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read(u16, u8),
    Write(u16, u8),
}

#[derive(Clone)]
struct TraceBus {
    ram: Vec<u8>,
    trace: Vec<Access>,
}

impl TraceBus {
    fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let ram = (0..0x10000).map(|_| rng.random::<u8>()).collect();
        Self {
            ram,
            trace: Vec::new(),
        }
    }
}

impl Bus for TraceBus {
    fn read(&mut self, address: u16) -> u8 {
        let value = self.ram[address as usize];
        self.trace.push(Access::Read(address, value));
        value
    }

    fn write(&mut self, address: u16, value: u8) {
        self.ram[address as usize] = value;
        self.trace.push(Access::Write(address, value));
    }
}

fn setup(class: CpuClass, opcode: u8, seed: u64) -> (Cpu65x02, TraceBus) {
    let mut rng = StdRng::seed_from_u64(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15));
    let mut bus = TraceBus::new(seed);
    let mut cpu = Cpu65x02::new(class);
    cpu.regs.pc = rng.random();
    cpu.regs.a = rng.random();
    cpu.regs.x = rng.random();
    cpu.regs.y = rng.random();
    cpu.regs.set_s(rng.random());
    cpu.regs.p = Status::from_byte(rng.random());
    bus.ram[cpu.regs.pc as usize] = opcode;
    (cpu, bus)
}

fn run_ticked(cpu: &mut Cpu65x02, bus: &mut TraceBus) {
    cpu.tick(bus);
    for _ in 0..16 {
        if cpu.is_instruction_complete() {
            return;
        }
        cpu.tick(bus);
    }
    panic!("instruction did not complete");
}

fn assert_same(label: &str, a: (&Cpu65x02, &TraceBus), b: (&Cpu65x02, &TraceBus)) {
    let (ra, rb) = (a.0.regs, b.0.regs);
    assert_eq!(a.1.trace, b.1.trace, "{label}: bus trace");
    assert_eq!(
        (ra.pc, ra.sp, ra.a, ra.x, ra.y, ra.p, ra.cycles),
        (rb.pc, rb.sp, rb.a, rb.x, rb.y, rb.p, rb.cycles),
        "{label}: registers"
    );
}

#[test]
fn every_opcode_same_trace_in_both_models() {
    for class in [CpuClass::Mos6502, CpuClass::Wdc65C02] {
        for opcode in 0..=0xFF_u8 {
            for seed in 1..=12_u64 {
                let (mut stepped_cpu, mut stepped_bus) = setup(class, opcode, seed);
                let (mut scored_cpu, mut scored_bus) = (stepped_cpu.clone(), stepped_bus.clone());

                run_ticked(&mut stepped_cpu, &mut stepped_bus);
                let cycles = scored_cpu.step(&mut scored_bus);

                let label = format!("{class:?} ${opcode:02X} seed {seed}");
                assert_same(&label, (&stepped_cpu, &stepped_bus), (&scored_cpu, &scored_bus));
                assert_eq!(cycles as usize, scored_bus.trace.len(), "{label}: cycle count");
            }
        }
    }
}

#[test]
fn decimal_mode_arithmetic_agrees() {
    for class in [CpuClass::Mos6502, CpuClass::Wdc65C02] {
        for opcode in [
            0x61, 0x65, 0x69, 0x6D, 0x71, 0x75, 0x79, 0x7D, 0xE1, 0xE5, 0xE9, 0xF1, 0xFD,
        ] {
            for seed in 1..=16_u64 {
                let (mut stepped_cpu, mut stepped_bus) = setup(class, opcode, seed);
                stepped_cpu.regs.p.set(cpu_65x02::flags::D);
                let (mut scored_cpu, mut scored_bus) = (stepped_cpu.clone(), stepped_bus.clone());

                run_ticked(&mut stepped_cpu, &mut stepped_bus);
                scored_cpu.step(&mut scored_bus);

                let label = format!("{class:?} ${opcode:02X} decimal seed {seed}");
                assert_same(&label, (&stepped_cpu, &stepped_bus), (&scored_cpu, &scored_bus));
            }
        }
    }
}

#[test]
fn step_finishes_an_instruction_started_by_tick() {
    // LDA $30FF,X across a page, then INC $10
    for class in [CpuClass::Mos6502, CpuClass::Wdc65C02] {
        let (mut cpu, mut bus) = setup(class, 0xBD, 7);
        cpu.regs.x = 0x01;
        let pc = cpu.regs.pc;
        bus.ram[pc.wrapping_add(1) as usize] = 0xFF;
        bus.ram[pc.wrapping_add(2) as usize] = 0x30;
        bus.ram[pc.wrapping_add(3) as usize] = 0xE6;
        bus.ram[pc.wrapping_add(4) as usize] = 0x10;
        let (mut ticked_cpu, mut ticked_bus) = (cpu.clone(), bus.clone());

        cpu.tick(&mut bus);
        cpu.tick(&mut bus);
        let rest = cpu.step(&mut bus);
        assert_eq!(rest, 3, "{class:?}: only the remaining cycles are counted");
        cpu.step(&mut bus);

        run_ticked(&mut ticked_cpu, &mut ticked_bus);
        run_ticked(&mut ticked_cpu, &mut ticked_bus);
        assert_same(&format!("{class:?}"), (&cpu, &bus), (&ticked_cpu, &ticked_bus));
    }
}

#[test]
fn interrupt_sequences_agree() {
    for class in [CpuClass::Mos6502, CpuClass::Wdc65C02] {
        for seed in 1..=8_u64 {
            let (mut stepped_cpu, mut stepped_bus) = setup(class, 0xEA, seed);
            stepped_cpu.regs.p.clear(cpu_65x02::flags::I);
            stepped_cpu.set_irq(true);
            let (mut scored_cpu, mut scored_bus) = (stepped_cpu.clone(), stepped_bus.clone());

            run_ticked(&mut stepped_cpu, &mut stepped_bus);
            assert_eq!(scored_cpu.step(&mut scored_bus), 7);
            assert_same(
                &format!("{class:?} IRQ seed {seed}"),
                (&stepped_cpu, &stepped_bus),
                (&scored_cpu, &scored_bus),
            );
        }
    }
}
