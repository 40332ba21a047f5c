//! Dependent-Domain Peripheral (Disk Drive)
//!
//! A drive is a full second computer: its own clock domain, CPU, bus,
//! alarm context, and overflow guard, running at a frequency that is not
//! an integral multiple of the primary CPU's. It never runs ahead of the
//! primary domain; after every primary burst the machine calls
//! [`Drive::catch_up`], which converts the elapsed primary cycles through
//! the drive's [`ClockBridge`] and executes exactly that budget.

use crate::alarm::AlarmContext;
use crate::clock::{Clock, ClockDomain, ClockGuard};
use crate::cpu::{self, Cpu, ExecState, JamPolicy};
use crate::memory::{Bus, PageTarget};
use crate::sync::ClockBridge;
use crate::timer::{DiskRotation, IntervalTimer};
use serde::{Deserialize, Serialize};

/// Board-level description of one drive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    pub name: String,
    /// Drive CPU frequency in Hz
    pub clock_hz: u64,
    /// Rotation cadence: cycles between bytes passing the head
    pub cycles_per_byte: Clock,
    /// Base address of the interval timer's register window
    pub timer_base: u16,
    /// Base address of the rotation logic's register window
    pub rotation_base: u16,
    /// Clock value at which the drive's guard rebases
    pub guard_threshold: Clock,
    /// Rebase amounts are multiples of this
    pub guard_granularity: Clock,
    pub jam_policy: JamPolicy,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            name: "drive8".into(),
            clock_hz: 1_000_000,
            cycles_per_byte: 26,
            timer_base: 0x1800,
            rotation_base: 0x1C00,
            guard_threshold: 1 << 30,
            guard_granularity: 1,
            jam_policy: JamPolicy::default(),
        }
    }
}

/// One dependent domain and everything that lives in it.
pub struct Drive {
    pub domain: ClockDomain,
    pub cpu: Cpu,
    pub bus: Bus,
    pub alarms: AlarmContext<Bus>,
    guard: ClockGuard<Bus>,
    bridge: ClockBridge,
    /// Primary-domain clock at the last catch-up
    last_primary: Clock,
    /// Absolute target in the drive's own domain; execution overshoot
    /// (a partial instruction) carries into the next catch-up
    target: Clock,
}

impl Drive {
    /// Build a drive board clocked against a primary domain at
    /// `primary_hz`. The CPU comes up with a reset request pending, so
    /// the first executed cycles run the reset sequence.
    pub fn new(config: &DriveConfig, primary_hz: u64) -> Self {
        let mut bus = Bus::new(
            config.timer_base,
            config.rotation_base,
            config.cycles_per_byte,
        );
        bus.map_region(0x0000, 0x07FF, PageTarget::Ram);
        map_io_page(&mut bus, config.timer_base);
        map_io_page(&mut bus, config.rotation_base);
        bus.map_region(0xC000, 0xFFFF, PageTarget::Rom);

        let mut alarms = AlarmContext::new(&config.name);
        let timer_alarm = IntervalTimer::install(&mut alarms);
        bus.timer.attach(timer_alarm);
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
            bridge: ClockBridge::new(config.clock_hz, primary_hz),
            last_primary: 0,
            target: 0,
        }
    }

    /// Execute the drive up to the primary domain's current clock.
    ///
    /// The primary clock must not move backwards between calls; rebases
    /// go through [`Drive::primary_rebased`] instead.
    pub fn catch_up(&mut self, primary_clock: Clock) {
        assert!(
            primary_clock >= self.last_primary,
            "{}: primary clock moved backwards ({} -> {})",
            self.domain.name,
            self.last_primary,
            primary_clock
        );
        let delta = primary_clock - self.last_primary;
        self.last_primary = primary_clock;
        if delta == 0 {
            return;
        }
        self.target += self.bridge.advance(delta);
        cpu::run_until(
            &mut self.cpu,
            &mut self.domain,
            &mut self.bus,
            &mut self.alarms,
            self.target,
        );
        self.prevent_overflow();
    }

    /// The primary domain rebased by `amount`; shift the bookmark so the
    /// next catch-up sees the same elapsed-primary delta.
    pub fn primary_rebased(&mut self, amount: Clock) {
        assert!(
            amount <= self.last_primary,
            "{}: primary rebase {} past bookmark {}",
            self.domain.name,
            amount,
            self.last_primary
        );
        self.last_primary -= amount;
    }

    /// The frequency bridge against the primary domain.
    pub fn bridge(&self) -> &ClockBridge {
        &self.bridge
    }

    /// Swap the frequency ratio mid-run (a turbo switch). The fractional
    /// cycle already owed to the drive is preserved.
    pub fn set_clock_hz(&mut self, clock_hz: u64) {
        let (_, primary_hz) = self.bridge.ratio();
        self.bridge.set_ratio(clock_hz, primary_hz);
    }

    /// Resume a drive CPU parked by a trap.
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

    fn prevent_overflow(&mut self) {
        let amount = self.guard.prevent_overflow(&mut self.domain, &mut self.bus);
        if amount > 0 {
            self.alarms.rebase(amount);
            self.target -= amount;
        }
    }
}

impl std::fmt::Debug for Drive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Drive")
            .field("domain", &self.domain)
            .field("cpu", &self.cpu)
            .field("last_primary", &self.last_primary)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Map the 256-byte page containing `base` as device registers.
pub(crate) fn map_io_page(bus: &mut Bus, base: u16) {
    let start = base & 0xFF00;
    bus.map_region(start, start | 0x00FF, PageTarget::Io);
}
