//! Board Orchestration
//!
//! Wires a primary clock domain (CPU, bus, alarm context, overflow guard)
//! to any number of dependent drive domains and runs them in lockstep:
//! the primary CPU executes a burst, every drive catches up to the
//! primary clock through its frequency bridge, and the guards rebase the
//! counters before they can overflow.
//!
//! All clock handoffs use absolute targets, so the partial-instruction
//! overshoot of one burst is consumed by the next instead of drifting.

use crate::alarm::AlarmContext;
use crate::clock::{Clock, ClockDomain, ClockGuard};
use crate::cpu::{self, Cpu, ExecState, JamPolicy};
use crate::memory::{Bus, PageTarget};
use crate::timer::{DiskRotation, IntervalTimer};
use serde::{Deserialize, Serialize};

mod drive;

pub use drive::{Drive, DriveConfig};

/// Board-level description of the primary domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineConfig {
    pub name: String,
    /// Primary CPU frequency in Hz; drives are bridged against this
    pub clock_hz: u64,
    /// Base address of the interval timer's register window
    pub timer_base: u16,
    /// Clock value at which the guard rebases
    pub guard_threshold: Clock,
    /// Rebase amounts are multiples of this
    pub guard_granularity: Clock,
    pub jam_policy: JamPolicy,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            name: "main".into(),
            clock_hz: 1_000_000,
            timer_base: 0xDC00,
            guard_threshold: 1 << 30,
            guard_granularity: 1,
            jam_policy: JamPolicy::default(),
        }
    }
}

/// The whole emulated computer: primary domain plus attached drives.
pub struct Machine {
    pub domain: ClockDomain,
    pub cpu: Cpu,
    pub bus: Bus,
    pub alarms: AlarmContext<Bus>,
    guard: ClockGuard<Bus>,
    drives: Vec<Drive>,
    /// Primary CPU frequency, for bridging added drives
    clock_hz: u64,
    /// Absolute primary target; overshoot carries between bursts
    target: Clock,
}

impl Machine {
    /// Build the primary board. The CPU comes up with a reset request
    /// pending, so the first burst runs the reset sequence through the
    /// reset vector.
    pub fn new(config: &MachineConfig) -> Self {
        let mut bus = Bus::new(config.timer_base, config.timer_base, 1);
        bus.map_region(0x0000, 0xCFFF, PageTarget::Ram);
        drive::map_io_page(&mut bus, config.timer_base);
        bus.map_region(0xE000, 0xFFFF, PageTarget::Rom);

        let mut alarms = AlarmContext::new(&config.name);
        let timer_alarm = IntervalTimer::install(&mut alarms);
        bus.timer.attach(timer_alarm);
        // The bus carries rotation logic for drive boards; unused here,
        // but its alarm slot keeps install order uniform across domains.
        let rotation_alarm = DiskRotation::install(&mut alarms);
        bus.rotation.attach(rotation_alarm);

        let mut guard = ClockGuard::new(config.guard_threshold);
        guard.set_granularity(config.guard_granularity);
        guard.add_callback(Box::new(|bus: &mut Bus, amount| bus.irq.rebase(amount)));

        let mut cpu = Cpu::new();
        cpu.jam_policy = config.jam_policy;
        bus.irq.assert_reset();

        Self {
            domain: ClockDomain::new(&config.name),
            cpu,
            bus,
            alarms,
            guard,
            drives: Vec::new(),
            clock_hz: config.clock_hz,
            target: 0,
        }
    }

    /// Attach a drive bridged against the primary clock. Returns its
    /// index; drives catch up in attachment order.
    pub fn add_drive(&mut self, config: &DriveConfig) -> usize {
        self.drives.push(Drive::new(config, self.clock_hz));
        self.drives.len() - 1
    }

    pub fn drive(&self, index: usize) -> &Drive {
        &self.drives[index]
    }

    pub fn drive_mut(&mut self, index: usize) -> &mut Drive {
        &mut self.drives[index]
    }

    pub fn drive_count(&self) -> usize {
        self.drives.len()
    }

    /// Run the machine for `cycles` primary cycles.
    ///
    /// The budget lands on an absolute target, so if the previous burst
    /// overshot its own target by a partial instruction, this burst is
    /// shorter by the same amount. A pending trap parks the primary CPU
    /// early; resume with [`Machine::ack_trap`].
    pub fn run_for(&mut self, cycles: Clock) {
        self.target += cycles;
        cpu::run_until(
            &mut self.cpu,
            &mut self.domain,
            &mut self.bus,
            &mut self.alarms,
            self.target,
        );
        let now = self.domain.clock();
        for drive in &mut self.drives {
            drive.catch_up(now);
        }
        self.prevent_overflow();
    }

    /// Run until the primary target reaches an absolute clock value.
    /// A target at or behind the current one is a no-op.
    pub fn run_until(&mut self, target: Clock) {
        if target > self.target {
            let cycles = target - self.target;
            self.run_for(cycles);
        }
    }

    /// Ask the primary CPU to park at its next instruction boundary.
    pub fn request_trap(&mut self) {
        self.bus.irq.assert_trap();
    }

    /// Resume a primary CPU parked by a trap.
    pub fn ack_trap(&mut self) {
        assert_eq!(
            self.cpu.state,
            ExecState::TrapPending,
            "{}: no trap pending",
            self.domain.name
        );
        self.bus.irq.clear_trap();
        self.cpu.state = ExecState::Running;
    }

    /// Rebase the primary clock if the guard threshold was reached, and
    /// shift every absolute clock that lives in this domain by the same
    /// amount: pending alarms, interrupt stamps (through the guard's
    /// subscribers), the run target, and each drive's primary bookmark.
    fn prevent_overflow(&mut self) {
        let amount = self.guard.prevent_overflow(&mut self.domain, &mut self.bus);
        if amount > 0 {
            self.alarms.rebase(amount);
            self.target -= amount;
            for drive in &mut self.drives {
                drive.primary_rebased(amount);
            }
        }
    }
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("domain", &self.domain)
            .field("cpu", &self.cpu)
            .field("drives", &self.drives)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}
