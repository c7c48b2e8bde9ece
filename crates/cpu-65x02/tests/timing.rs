//! Cycle counts returned by `step()`.

use cpu_65x02::{Cpu65x02, CpuClass, flags};
use emu_core::{Cpu, SimpleBus};

const NMOS: CpuClass = CpuClass::Mos6502;
const CMOS: CpuClass = CpuClass::Wdc65C02;

struct Case {
    name: &'static str,
    class: CpuClass,
    program: &'static [u8],
    x: u8,
    y: u8,
    decimal: bool,
    cycles: u32,
}

const fn case(name: &'static str, class: CpuClass, program: &'static [u8], cycles: u32) -> Case {
    Case {
        name,
        class,
        program,
        x: 0,
        y: 0,
        decimal: false,
        cycles,
    }
}

const fn indexed(
    name: &'static str,
    class: CpuClass,
    program: &'static [u8],
    index: u8,
    cycles: u32,
) -> Case {
    Case {
        name,
        class,
        program,
        x: index,
        y: index,
        decimal: false,
        cycles,
    }
}

const fn decimal(name: &'static str, class: CpuClass, program: &'static [u8], cycles: u32) -> Case {
    Case {
        name,
        class,
        program,
        x: 0,
        y: 0,
        decimal: true,
        cycles,
    }
}

fn step_cycles(c: &Case) -> u32 {
    let mut bus = SimpleBus::new();
    let mut cpu = Cpu65x02::new(c.class);
    bus.load(0x0200, c.program);
    // ($10) points at $20F0 for the indirect modes
    bus.load(0x0010, &[0xF0, 0x20]);
    cpu.regs.pc = 0x0200;
    cpu.regs.x = c.x;
    cpu.regs.y = c.y;
    cpu.regs.set_s(0xF0);
    cpu.regs.p.set_if(flags::D, c.decimal);
    cpu.step(&mut bus)
}

#[test]
fn documented_cycle_counts() {
    let cases = [
        case("LDA #imm", NMOS, &[0xA9, 0x00], 2),
        case("LDA zp", NMOS, &[0xA5, 0x10], 3),
        case("LDA zp,X", NMOS, &[0xB5, 0x10], 4),
        case("LDX zp,Y", NMOS, &[0xB6, 0x10], 4),
        case("LDA abs", NMOS, &[0xAD, 0x00, 0x30], 4),
        indexed("LDA abs,X same page", NMOS, &[0xBD, 0x00, 0x30], 0x10, 4),
        indexed("LDA abs,X page cross", NMOS, &[0xBD, 0xF0, 0x30], 0x20, 5),
        indexed("LDA abs,Y page cross", CMOS, &[0xB9, 0xF0, 0x30], 0x20, 5),
        indexed("STA abs,X same page", NMOS, &[0x9D, 0x00, 0x30], 0x10, 5),
        indexed("STA abs,Y", CMOS, &[0x99, 0x00, 0x30], 0x10, 5),
        case("LDA (zp,X)", NMOS, &[0xA1, 0x10], 6),
        indexed("LDA (zp),Y same page", NMOS, &[0xB1, 0x10], 0x01, 5),
        indexed("LDA (zp),Y page cross", NMOS, &[0xB1, 0x10], 0x20, 6),
        indexed("STA (zp),Y", NMOS, &[0x91, 0x10], 0x01, 6),
        case("LDA (zp)", CMOS, &[0xB2, 0x10], 5),
        case("INC zp", NMOS, &[0xE6, 0x10], 5),
        case("INC zp,X", CMOS, &[0xF6, 0x10], 6),
        case("ASL abs", NMOS, &[0x0E, 0x00, 0x30], 6),
        indexed("ASL abs,X (6502)", NMOS, &[0x1E, 0x00, 0x30], 0x01, 7),
        indexed("ASL abs,X no cross (65C02)", CMOS, &[0x1E, 0x00, 0x30], 0x01, 6),
        indexed("ASL abs,X cross (65C02)", CMOS, &[0x1E, 0xFF, 0x30], 0x01, 7),
        indexed("INC abs,X (65C02)", CMOS, &[0xFE, 0x00, 0x30], 0x01, 7),
        case("TSB abs", CMOS, &[0x0C, 0x00, 0x30], 6),
        case("TRB zp", CMOS, &[0x14, 0x10], 5),
        case("ASL A", NMOS, &[0x0A], 2),
        case("INX", NMOS, &[0xE8], 2),
        case("PHA", NMOS, &[0x48], 3),
        case("PLA", NMOS, &[0x68], 4),
        case("PHX", CMOS, &[0xDA], 3),
        case("JSR", NMOS, &[0x20, 0x00, 0x30], 6),
        case("RTS", NMOS, &[0x60], 6),
        case("RTI", NMOS, &[0x40], 6),
        case("BRK", NMOS, &[0x00], 7),
        case("BRK (65C02)", CMOS, &[0x00], 7),
        case("JMP abs", NMOS, &[0x4C, 0x00, 0x30], 3),
        case("JMP (ind) (6502)", NMOS, &[0x6C, 0x00, 0x30], 5),
        case("JMP (ind) (65C02)", CMOS, &[0x6C, 0x00, 0x30], 6),
        case("JMP (abs,X)", CMOS, &[0x7C, 0x00, 0x30], 6),
        case("STZ abs", CMOS, &[0x9C, 0x00, 0x30], 4),
        case("BIT #imm", CMOS, &[0x89, 0x00], 2),
        decimal("ADC #imm decimal (6502)", NMOS, &[0x69, 0x01], 2),
        decimal("ADC #imm decimal (65C02)", CMOS, &[0x69, 0x01], 3),
        decimal("SBC zp decimal (65C02)", CMOS, &[0xE5, 0x10], 4),
        decimal("LDA #imm decimal (65C02)", CMOS, &[0xA9, 0x01], 2),
    ];

    let mut failures = Vec::new();
    for c in &cases {
        let got = step_cycles(c);
        if got != c.cycles {
            failures.push(format!("{}: got {got}, want {}", c.name, c.cycles));
        }
    }
    assert!(failures.is_empty(), "{}", failures.join("\n"));
}

#[test]
fn branch_cycle_counts() {
    // BNE with Z clear is taken; BEQ is not
    let cases = [
        case("not taken", NMOS, &[0xF0, 0x10], 2),
        case("taken, same page", NMOS, &[0xD0, 0x10], 3),
        case("taken, page cross", NMOS, &[0xD0, 0x7F], 4),
        case("taken backwards, same page", CMOS, &[0xD0, 0x80], 3),
        case("BRA", CMOS, &[0x80, 0x00], 3),
    ];
    for c in &cases {
        // Start near the end of the page so +$7F crosses
        let mut bus = SimpleBus::new();
        let mut cpu = Cpu65x02::new(c.class);
        bus.load(0x02A0, c.program);
        cpu.regs.pc = 0x02A0;
        assert_eq!(cpu.step(&mut bus), c.cycles, "{}", c.name);
    }
}

#[test]
fn cmos_undefined_opcode_cycle_counts() {
    let cases = [
        case("1-byte NOP", CMOS, &[0x03], 1),
        case("xB NOP", CMOS, &[0xFB], 1),
        case("immediate NOP", CMOS, &[0x02, 0x00], 2),
        case("zp NOP", CMOS, &[0x44, 0x00], 3),
        case("zp,X NOP", CMOS, &[0xF4, 0x00], 4),
        case("abs NOP", CMOS, &[0xDC, 0x00, 0x00], 4),
        case("6502 undefined", NMOS, &[0x02], 2),
    ];
    for c in &cases {
        assert_eq!(step_cycles(c), c.cycles, "{}", c.name);
    }
}

#[test]
fn opcode_5c_is_an_absolute_read() {
    let mut bus = SimpleBus::new();
    let mut cpu = Cpu65x02::new(CMOS);
    bus.load(0x0200, &[0x5C, 0x34, 0x12, 0xEA]);
    cpu.regs.pc = 0x0200;
    assert_eq!(cpu.step(&mut bus), 4);
    assert_eq!(cpu.regs.pc, 0x0203);
}

#[test]
fn step_counts_match_cycle_counter() {
    let mut bus = SimpleBus::new();
    let mut cpu = Cpu65x02::new(CMOS);
    // LDA #$01; STA $3000,X; JSR $0300; ... RTS
    bus.load(0x0200, &[0xA9, 0x01, 0x9D, 0x00, 0x30, 0x20, 0x00, 0x03]);
    bus.load(0x0300, &[0x60]);
    cpu.regs.pc = 0x0200;

    let mut total = 0u64;
    for _ in 0..4 {
        total += u64::from(cpu.step(&mut bus));
    }
    assert_eq!(total, 2 + 5 + 6 + 6);
    assert_eq!(cpu.regs.cycles, total);
}
