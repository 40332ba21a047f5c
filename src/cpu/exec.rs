//! The Cycle-Stepped Execution Loop
//!
//! Per-boundary protocol, repeated until the domain clock reaches its
//! target:
//!
//! 1. Dispatch every due alarm. This also happens after each bus access
//!    inside an instruction, since a timer can expire mid-instruction.
//! 2. If an interrupt is recognizable under the family's delay rules,
//!    service it through its vector at the fixed acknowledge cost.
//! 3. Otherwise fetch, decode through the opcode table, and execute,
//!    charging each bus access one cycle as it happens and any remaining
//!    documented cost at the end of the instruction.
//!
//! Nothing in this loop can fail: illegal opcodes jam the CPU, which is a
//! modeled state that keeps consuming cycles while alarms fire.

use super::irq::Interrupt;
use super::opcodes::AddrMode;
use super::{flags, vectors, Cpu, ExecState, JamPolicy};
use super::{INTERRUPT_CYCLES, RESET_CYCLES};
use crate::alarm::AlarmContext;
use crate::clock::{Clock, ClockDomain};
use crate::memory::Bus;

/// Resolved operand handed to an opcode's side-effect function.
#[derive(Debug, Clone, Copy)]
pub enum Operand {
    None,
    Acc,
    Imm(u8),
    Addr(u16),
    Rel(i8),
}

/// One CPU's view of its domain for the duration of a step: registers,
/// clock, bus, and alarms, borrowed together.
pub struct Exec<'a> {
    pub cpu: &'a mut Cpu,
    pub domain: &'a mut ClockDomain,
    pub bus: &'a mut Bus,
    pub alarms: &'a mut AlarmContext<Bus>,
    /// Cycles charged so far in the current instruction
    spent: u8,
    /// Penalty cycles requested by the side-effect function
    pub(crate) extra: u8,
}

/// Run one domain's loop until its clock reaches `target` (or a trap
/// parks it). The clock may overshoot by a partial instruction; callers
/// keep absolute targets so the overshoot carries.
pub fn run_until(
    cpu: &mut Cpu,
    domain: &mut ClockDomain,
    bus: &mut Bus,
    alarms: &mut AlarmContext<Bus>,
    target: Clock,
) {
    let mut exec = Exec {
        cpu,
        domain,
        bus,
        alarms,
        spent: 0,
        extra: 0,
    };
    while exec.domain.clock < target {
        if exec.cpu.state == ExecState::TrapPending {
            break;
        }
        exec.step();
    }
}

impl Exec<'_> {
    /// Execute one boundary: alarms, interrupt recognition, then one
    /// instruction (or one idle cycle when jammed).
    pub fn step(&mut self) {
        self.dispatch_due();
        self.check_interrupts();
        match self.cpu.state {
            ExecState::Jammed => {
                // Time still passes; only the instruction stream stopped.
                self.tick();
                return;
            }
            ExecState::TrapPending => return,
            _ => {}
        }

        self.spent = 0;
        self.extra = 0;
        let opcode = self.fetch();
        let table = self.cpu.table();
        let entry = &table[opcode as usize];
        let (operand, crossed) = self.resolve(entry.mode);
        (entry.exec)(self, operand);

        let mut total = entry.cycles + self.extra;
        if crossed && entry.cross_penalty {
            total += 1;
        }
        while self.spent < total {
            self.tick();
        }
    }

    /// Advance the domain clock one cycle and fire everything now due.
    pub fn tick(&mut self) {
        self.domain.advance(1);
        self.spent = self.spent.saturating_add(1);
        self.dispatch_due();
    }

    /// Step-1 of the boundary protocol; also re-run after every tick.
    fn dispatch_due(&mut self) {
        while self.alarms.next_pending_clock() <= self.domain.clock {
            self.alarms.dispatch(self.bus, self.domain.clock);
        }
    }

    // ========== Interrupt recognition and servicing ==========

    fn check_interrupts(&mut self) {
        let branch_delay = self.cpu.branch_delay;
        self.cpu.branch_delay = false;
        let masked = self.cpu.flag(flags::IRQ_DISABLE) || self.cpu.irq_inhibit_once;
        self.cpu.irq_inhibit_once = false;

        let Some(kind) = self.bus.irq.next_pending(masked, self.domain.clock) else {
            return;
        };
        if branch_delay && matches!(kind, Interrupt::Irq | Interrupt::Nmi) {
            // A taken branch with no page crossing narrows the poll
            // window; an interrupt that only just became recognizable
            // slips by exactly one cycle.
            let narrowed = self
                .bus
                .irq
                .next_pending(masked, self.domain.clock.saturating_sub(1));
            if narrowed != Some(kind) {
                self.tick();
            }
        }
        // A jammed CPU ignores its interrupt lines; reset clears the jam
        // and traps are a host mechanism, not a CPU line.
        if self.cpu.state == ExecState::Jammed
            && !matches!(kind, Interrupt::Reset | Interrupt::Trap)
        {
            return;
        }
        self.cpu.state = ExecState::InterruptPending(kind);
        match kind {
            Interrupt::Reset => self.service_reset(),
            Interrupt::Trap => {
                self.bus.irq.acknowledge(kind);
                self.cpu.state = ExecState::TrapPending;
            }
            Interrupt::Nmi => self.service_interrupt(vectors::NMI, kind),
            Interrupt::Irq => self.service_interrupt(vectors::IRQ, kind),
        }
    }

    /// Push PC and flags, set the mask, load the vector. Fixed cost.
    fn service_interrupt(&mut self, vector: u16, kind: Interrupt) {
        self.spent = 0;
        let pc = self.cpu.pc;
        self.push((pc >> 8) as u8);
        self.push(pc as u8);
        let pushed = (self.cpu.p | flags::UNUSED) & !flags::BREAK;
        self.push(pushed);
        self.cpu.set_flag(flags::IRQ_DISABLE, true);
        self.cpu.pc = self.read_word(vector);
        self.bus.irq.acknowledge(kind);
        self.cpu.state = ExecState::Running;
        while self.spent < INTERRUPT_CYCLES {
            self.tick();
        }
    }

    /// Reset sequence: no pushes, stack pointer slides, vector load.
    /// Clears a jam.
    fn service_reset(&mut self) {
        log::debug!("{}: cpu reset", self.domain.name);
        self.spent = 0;
        self.cpu.reset_registers();
        self.cpu.sp = self.cpu.sp.wrapping_sub(3);
        self.cpu.pc = self.read_word(vectors::RESET);
        self.bus.irq.acknowledge(Interrupt::Reset);
        self.cpu.state = ExecState::Running;
        while self.spent < RESET_CYCLES {
            self.tick();
        }
    }

    // ========== Bus access (each access costs one cycle) ==========

    pub fn read(&mut self, addr: u16) -> u8 {
        let value = self.bus.read(addr, self.domain.clock, self.alarms);
        self.tick();
        value
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        self.bus.write(addr, value, self.domain.clock, self.alarms);
        self.tick();
    }

    fn read_word(&mut self, addr: u16) -> u16 {
        let lo = u16::from(self.read(addr));
        let hi = u16::from(self.read(addr.wrapping_add(1)));
        (hi << 8) | lo
    }

    fn fetch(&mut self) -> u8 {
        let value = self.read(self.cpu.pc);
        self.cpu.pc = self.cpu.pc.wrapping_add(1);
        value
    }

    fn fetch_word(&mut self) -> u16 {
        let lo = u16::from(self.fetch());
        let hi = u16::from(self.fetch());
        (hi << 8) | lo
    }

    pub(crate) fn push(&mut self, value: u8) {
        self.write(0x0100 | u16::from(self.cpu.sp), value);
        self.cpu.sp = self.cpu.sp.wrapping_sub(1);
    }

    pub(crate) fn pop(&mut self) -> u8 {
        self.cpu.sp = self.cpu.sp.wrapping_add(1);
        self.read(0x0100 | u16::from(self.cpu.sp))
    }

    // ========== Addressing ==========

    /// Resolve the operand; the bool reports an indexed page crossing.
    fn resolve(&mut self, mode: AddrMode) -> (Operand, bool) {
        match mode {
            AddrMode::Imp => (Operand::None, false),
            AddrMode::Acc => (Operand::Acc, false),
            AddrMode::Imm => (Operand::Imm(self.fetch()), false),
            AddrMode::Zp => (Operand::Addr(u16::from(self.fetch())), false),
            AddrMode::ZpX => {
                let base = self.fetch();
                (Operand::Addr(u16::from(base.wrapping_add(self.cpu.x))), false)
            }
            AddrMode::ZpY => {
                let base = self.fetch();
                (Operand::Addr(u16::from(base.wrapping_add(self.cpu.y))), false)
            }
            AddrMode::Abs => (Operand::Addr(self.fetch_word()), false),
            AddrMode::AbsX => {
                let base = self.fetch_word();
                let addr = base.wrapping_add(u16::from(self.cpu.x));
                (Operand::Addr(addr), crossed(base, addr))
            }
            AddrMode::AbsY => {
                let base = self.fetch_word();
                let addr = base.wrapping_add(u16::from(self.cpu.y));
                (Operand::Addr(addr), crossed(base, addr))
            }
            AddrMode::IndX => {
                let zp = self.fetch().wrapping_add(self.cpu.x);
                let lo = u16::from(self.read(u16::from(zp)));
                let hi = u16::from(self.read(u16::from(zp.wrapping_add(1))));
                (Operand::Addr((hi << 8) | lo), false)
            }
            AddrMode::IndY => {
                let zp = self.fetch();
                let lo = u16::from(self.read(u16::from(zp)));
                let hi = u16::from(self.read(u16::from(zp.wrapping_add(1))));
                let base = (hi << 8) | lo;
                let addr = base.wrapping_add(u16::from(self.cpu.y));
                (Operand::Addr(addr), crossed(base, addr))
            }
            AddrMode::Ind => {
                let ptr = self.fetch_word();
                let lo = u16::from(self.read(ptr));
                // 6502 quirk: the high byte is fetched without carrying
                // into the pointer's page
                let hi_addr = (ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF);
                let hi = u16::from(self.read(hi_addr));
                (Operand::Addr((hi << 8) | lo), false)
            }
            AddrMode::Rel => (Operand::Rel(self.fetch() as i8), false),
        }
    }

    /// Fetch the operand value
    pub(crate) fn load(&mut self, operand: Operand) -> u8 {
        match operand {
            Operand::Imm(value) => value,
            Operand::Acc => self.cpu.a,
            Operand::Addr(addr) => self.read(addr),
            Operand::None | Operand::Rel(_) => {
                unreachable!("value load from a non-value operand")
            }
        }
    }

    /// Store a result back through the operand
    pub(crate) fn store(&mut self, operand: Operand, value: u8) {
        match operand {
            Operand::Acc => self.cpu.a = value,
            Operand::Addr(addr) => self.write(addr, value),
            _ => unreachable!("store through a non-place operand"),
        }
    }

    /// Enter the jammed state per the configured policy.
    pub(crate) fn jam(&mut self) {
        // Park the PC on the offending opcode for snapshots
        self.cpu.pc = self.cpu.pc.wrapping_sub(1);
        log::debug!(
            "{}: illegal opcode at {:#06x}, cpu jammed",
            self.domain.name,
            self.cpu.pc
        );
        self.cpu.state = ExecState::Jammed;
        if self.cpu.jam_policy == JamPolicy::Reset {
            self.bus.irq.assert_reset();
        }
    }
}

fn crossed(base: u16, addr: u16) -> bool {
    base & 0xFF00 != addr & 0xFF00
}
