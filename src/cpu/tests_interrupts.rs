use super::*;
use crate::alarm::AlarmContext;
use crate::clock::{Clock, ClockDomain};
use crate::memory::{Bus, PageTarget};

const SOURCE: u32 = 1 << 0;

struct Board {
    cpu: Cpu,
    domain: ClockDomain,
    bus: Bus,
    alarms: AlarmContext<Bus>,
}

impl Board {
    fn new() -> Self {
        let mut bus = Bus::new(0xDC00, 0xDD00, 26);
        bus.map_region(0x0000, 0xFFFF, PageTarget::Ram);
        let mut cpu = Cpu::new();
        cpu.state = ExecState::Running;
        cpu.pc = 0x0400;
        cpu.p = flags::UNUSED; // IRQs unmasked unless a test masks them
        Self {
            cpu,
            domain: ClockDomain::new("test"),
            bus,
            alarms: AlarmContext::new("test"),
        }
    }

    fn load(&mut self, addr: u16, bytes: &[u8]) {
        self.bus.ram[addr as usize..addr as usize + bytes.len()].copy_from_slice(bytes);
    }

    fn poke(&mut self, addr: u16, value: u8) {
        self.bus.ram[addr as usize] = value;
    }

    fn peek(&self, addr: u16) -> u8 {
        self.bus.ram[addr as usize]
    }

    fn set_vector(&mut self, vector: u16, target: u16) {
        self.poke(vector, target as u8);
        self.poke(vector + 1, (target >> 8) as u8);
    }

    fn step(&mut self) -> Clock {
        let before = self.domain.clock();
        run_until(
            &mut self.cpu,
            &mut self.domain,
            &mut self.bus,
            &mut self.alarms,
            before + 1,
        );
        self.domain.clock() - before
    }
}

#[test]
fn irq_waits_out_the_recognition_delay_then_services() {
    let mut b = Board::new();
    b.load(0x0400, &[0xEA, 0xEA]);
    b.set_vector(vectors::IRQ, 0x2000);
    b.poke(0x2000, 0xEA);
    b.bus.irq.assert_irq(SOURCE, 0);

    // Stamped at 0, not recognizable at the clock-0 boundary
    assert_eq!(b.step(), 2);
    assert_eq!(b.cpu.pc, 0x0401);

    // Recognizable now: service, then the handler's first instruction
    let spent = b.step();
    assert_eq!(spent, Clock::from(INTERRUPT_CYCLES) + 2);
    assert_eq!(b.cpu.pc, 0x2001);
    assert!(b.cpu.flag(flags::IRQ_DISABLE));

    // Pushed return address $0401 and flags without BREAK
    assert_eq!(b.peek(0x01FD), 0x04);
    assert_eq!(b.peek(0x01FC), 0x01);
    assert_eq!(b.peek(0x01FB) & flags::BREAK, 0);
}

#[test]
fn masked_irq_is_not_taken() {
    let mut b = Board::new();
    b.cpu.p |= flags::IRQ_DISABLE;
    b.load(0x0400, &[0xEA, 0xEA, 0xEA]);
    b.bus.irq.assert_irq(SOURCE, 0);

    for _ in 0..3 {
        assert_eq!(b.step(), 2);
    }
    assert_eq!(b.cpu.pc, 0x0403);
}

#[test]
fn cli_lands_one_instruction_late() {
    let mut b = Board::new();
    b.cpu.p |= flags::IRQ_DISABLE;
    b.load(0x0400, &[0x58, 0xEA, 0xEA]); // CLI; NOP; NOP
    b.set_vector(vectors::IRQ, 0x2000);
    b.poke(0x2000, 0xEA);
    b.bus.irq.assert_irq(SOURCE, 0);

    assert_eq!(b.step(), 2); // CLI
    assert_eq!(b.step(), 2); // the next instruction still runs unserviced
    assert_eq!(b.cpu.pc, 0x0402);

    let spent = b.step();
    assert_eq!(spent, Clock::from(INTERRUPT_CYCLES) + 2);
    // Return address is the second NOP, not the first
    assert_eq!(b.peek(0x01FD), 0x04);
    assert_eq!(b.peek(0x01FC), 0x02);
}

#[test]
fn sei_masks_at_the_very_next_boundary() {
    let mut b = Board::new();
    b.load(0x0400, &[0x78, 0xEA, 0xEA]); // SEI; NOP; NOP
    // Stamped so it first becomes recognizable after SEI has executed
    b.bus.irq.assert_irq(SOURCE, 2);

    assert_eq!(b.step(), 2); // SEI
    assert_eq!(b.step(), 2); // masked; no service
    assert_eq!(b.step(), 2);
    assert_eq!(b.cpu.pc, 0x0403);
}

#[test]
fn nmi_ignores_the_mask_and_is_edge_triggered() {
    let mut b = Board::new();
    b.cpu.p |= flags::IRQ_DISABLE;
    b.load(0x0400, &[0xEA, 0xEA]);
    b.set_vector(vectors::NMI, 0x3000);
    b.load(0x3000, &[0xEA, 0xEA]);
    b.bus.irq.assert_nmi(0);

    assert_eq!(b.step(), 2);
    let spent = b.step();
    assert_eq!(spent, Clock::from(INTERRUPT_CYCLES) + 2);
    assert_eq!(b.cpu.pc, 0x3001);

    // The edge was consumed; no second service
    assert_eq!(b.step(), 2);
    assert_eq!(b.cpu.pc, 0x3002);
}

/// Runs a taken same-page branch with an IRQ stamped at `stamp`, and
/// returns the cycles of the boundary that services it.
fn branch_then_service(stamp: Clock) -> Clock {
    let mut b = Board::new();
    b.load(0x0400, &[0xD0, 0x02]); // BNE +2, taken, no page crossing
    b.poke(0x0404, 0xEA);
    b.set_vector(vectors::IRQ, 0x2000);
    b.poke(0x2000, 0xEA);
    b.bus.irq.assert_irq(SOURCE, stamp);

    assert_eq!(b.step(), 3); // the branch
    let spent = b.step();
    assert_eq!(b.cpu.pc, 0x2001); // serviced either way
    spent
}

#[test]
fn taken_branch_slips_a_barely_recognizable_irq_by_one_cycle() {
    // Stamped early enough: the narrowed window still sees it
    assert_eq!(branch_then_service(0), Clock::from(INTERRUPT_CYCLES) + 2);
    // Only just recognizable at the post-branch boundary: exactly one
    // cycle of slip before the service sequence
    assert_eq!(branch_then_service(1), Clock::from(INTERRUPT_CYCLES) + 3);
}

#[test]
fn page_crossing_branch_does_not_narrow_the_window() {
    let mut b = Board::new();
    b.load(0x04F0, &[0xD0, 0x20]); // BNE +$20 -> $0512, crosses
    b.cpu.pc = 0x04F0;
    b.poke(0x0512, 0xEA);
    b.set_vector(vectors::IRQ, 0x2000);
    b.poke(0x2000, 0xEA);
    // Only just recognizable at the post-branch boundary (clock 4)
    b.bus.irq.assert_irq(SOURCE, 2);

    assert_eq!(b.step(), 4);
    assert_eq!(b.step(), Clock::from(INTERRUPT_CYCLES) + 2);
    assert_eq!(b.cpu.pc, 0x2001);
}

#[test]
fn trap_parks_the_loop_without_consuming_time() {
    let mut b = Board::new();
    b.load(0x0400, &[0xEA, 0xEA]);
    b.bus.irq.assert_trap();

    run_until(&mut b.cpu, &mut b.domain, &mut b.bus, &mut b.alarms, 100);
    assert_eq!(b.cpu.state, ExecState::TrapPending);
    assert_eq!(b.domain.clock(), 0);
    assert_eq!(b.cpu.pc, 0x0400);

    // Host acknowledges; execution resumes where it parked
    b.bus.irq.clear_trap();
    b.cpu.state = ExecState::Running;
    assert_eq!(b.step(), 2);
    assert_eq!(b.cpu.pc, 0x0401);
}

#[test]
fn jammed_cpu_ignores_irq_but_honors_reset() {
    let mut b = Board::new();
    b.poke(0x0400, 0x02);
    b.set_vector(vectors::RESET, 0x1200);
    b.poke(0x1200, 0xEA);

    b.step();
    assert_eq!(b.cpu.state, ExecState::Jammed);

    b.bus.irq.assert_irq(SOURCE, 0);
    assert_eq!(b.step(), 1);
    assert_eq!(b.step(), 1);
    assert_eq!(b.cpu.state, ExecState::Jammed);

    b.bus.irq.assert_reset();
    let spent = b.step();
    assert_eq!(spent, Clock::from(RESET_CYCLES) + 2);
    assert_eq!(b.cpu.state, ExecState::Running);
    assert_eq!(b.cpu.pc, 0x1201);
}

#[test]
fn brk_and_rti_round_trip() {
    let mut b = Board::new();
    b.load(0x0400, &[0x00, 0xFF, 0xEA]); // BRK + padding byte, then NOP
    b.set_vector(vectors::IRQ, 0x2000);
    b.poke(0x2000, 0x40); // RTI

    assert_eq!(b.step(), 7);
    assert_eq!(b.cpu.pc, 0x2000);
    assert!(b.cpu.flag(flags::IRQ_DISABLE));
    assert_eq!(b.peek(0x01FB) & flags::BREAK, flags::BREAK);

    assert_eq!(b.step(), 6);
    assert_eq!(b.cpu.pc, 0x0402); // past the padding byte
    assert!(!b.cpu.flag(flags::IRQ_DISABLE));
}

#[test]
fn rti_unmasks_without_the_one_instruction_delay() {
    let mut b = Board::new();
    b.cpu.p |= flags::IRQ_DISABLE;
    // Hand-build a stack frame: flags with the mask clear, return $0405
    b.cpu.sp = 0xFA;
    b.poke(0x01FB, flags::UNUSED);
    b.poke(0x01FC, 0x05);
    b.poke(0x01FD, 0x04);
    b.poke(0x0400, 0x40); // RTI
    b.load(0x0405, &[0xEA, 0xEA]);
    b.set_vector(vectors::IRQ, 0x2000);
    b.poke(0x2000, 0xEA);
    b.bus.irq.assert_irq(SOURCE, 2);

    assert_eq!(b.step(), 6); // RTI
    // Unmasked immediately: serviced before the NOP at $0405 runs
    let spent = b.step();
    assert_eq!(spent, Clock::from(INTERRUPT_CYCLES) + 2);
    assert_eq!(b.cpu.pc, 0x2001);
    assert_eq!(b.peek(0x01FD), 0x04);
    assert_eq!(b.peek(0x01FC), 0x05);
}

#[test]
fn plp_clearing_the_mask_lands_one_instruction_late() {
    let mut b = Board::new();
    b.cpu.p |= flags::IRQ_DISABLE;
    b.poke(0x01FE, flags::UNUSED); // flags with the mask clear
    b.load(0x0400, &[0x28, 0xEA, 0xEA]); // PLP; NOP; NOP
    b.set_vector(vectors::IRQ, 0x2000);
    b.poke(0x2000, 0xEA);
    b.bus.irq.assert_irq(SOURCE, 0);

    assert_eq!(b.step(), 4); // PLP
    assert!(!b.cpu.flag(flags::IRQ_DISABLE));
    assert_eq!(b.step(), 2); // the NOP still runs
    assert_eq!(b.cpu.pc, 0x0402);

    let spent = b.step();
    assert_eq!(spent, Clock::from(INTERRUPT_CYCLES) + 2);
    assert_eq!(b.peek(0x01FC), 0x02);
}
