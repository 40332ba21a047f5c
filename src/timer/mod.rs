//! Programmable Timer Devices
//!
//! Devices that own alarms in their domain's context: a 16-bit interval
//! timer (the machine's programmable timer chip, stripped to its timing
//! contract) and the drive's disk-rotation byte cadence. Both re-arm from
//! inside their own callbacks using [`Fired::due`], so dispatch at coarse
//! instruction boundaries never accumulates drift.

use crate::alarm::{AlarmContext, AlarmId, Fired};
use crate::clock::Clock;
use crate::cpu::IrqStatus;
use crate::memory::Bus;
use serde::{Deserialize, Serialize};

/// IRQ source bit driven by the interval timer
pub const TIMER_IRQ_SOURCE: u32 = 1 << 0;

/// Fixed reload overhead: an underflowing timer spends one cycle
/// reloading from its latch, so the period is `latch + RELOAD_CYCLES`.
pub const RELOAD_CYCLES: Clock = 1;

/// Register offsets within the timer's I/O window
pub mod reg {
    /// Latch low byte (write) / counter low byte (read)
    pub const LATCH_LO: u16 = 0;
    /// Latch high byte (write) / counter high byte (read)
    pub const LATCH_HI: u16 = 1;
    /// Control register
    pub const CONTROL: u16 = 2;
    /// Status register; reading clears the underflow flag
    pub const STATUS: u16 = 3;
}

/// Control register bits
pub mod ctrl {
    pub const START: u8 = 0b0000_0001;
    pub const ONESHOT: u8 = 0b0000_0010;
    pub const IRQ_ENABLE: u8 = 0b0000_0100;
    /// Write-only strobe: restart the countdown from the latch
    pub const FORCE_LOAD: u8 = 0b0001_0000;
}

/// Whether the timer re-arms itself after underflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerMode {
    OneShot,
    Continuous,
}

/// 16-bit down-counting interval timer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalTimer {
    latch: u16,
    mode: TimerMode,
    running: bool,
    irq_enabled: bool,
    underflow_flag: bool,
    control: u8,
    #[serde(skip)]
    alarm: Option<AlarmId>,
}

impl Default for IntervalTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl IntervalTimer {
    pub fn new() -> Self {
        Self {
            latch: 0xFFFF,
            mode: TimerMode::Continuous,
            running: false,
            irq_enabled: false,
            underflow_flag: false,
            control: 0,
            alarm: None,
        }
    }

    /// Create this timer's alarm in the domain's context. Called once at
    /// board init, before any register access.
    pub fn install(alarms: &mut AlarmContext<Bus>) -> AlarmId {
        alarms.new_alarm(
            "interval timer",
            Box::new(|bus: &mut Bus, ctx, fired| {
                let Bus { timer, irq, .. } = bus;
                timer.on_underflow(ctx, irq, fired);
            }),
        )
    }

    /// Bind the installed alarm id
    pub fn attach(&mut self, alarm: AlarmId) {
        self.alarm = Some(alarm);
    }

    /// Countdown period in cycles
    pub fn period(&self) -> Clock {
        Clock::from(self.latch) + RELOAD_CYCLES
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn running(&self) -> bool {
        self.running
    }

    fn alarm(&self) -> AlarmId {
        self.alarm.expect("timer register access before install")
    }

    /// The installed alarm binding, if any
    pub(crate) fn alarm_id(&self) -> Option<AlarmId> {
        self.alarm
    }

    /// Read a timer register. Reading STATUS acknowledges the underflow:
    /// it clears the flag and releases the timer's IRQ source.
    pub fn read_reg(
        &mut self,
        offset: u16,
        clock: Clock,
        alarms: &AlarmContext<Bus>,
        irq: &mut IrqStatus,
    ) -> u8 {
        match offset {
            reg::LATCH_LO => self.counter(clock, alarms) as u8,
            reg::LATCH_HI => (self.counter(clock, alarms) >> 8) as u8,
            reg::CONTROL => self.control & !ctrl::FORCE_LOAD,
            reg::STATUS => {
                let flag = u8::from(self.underflow_flag);
                self.underflow_flag = false;
                irq.clear_irq(TIMER_IRQ_SOURCE);
                flag
            }
            _ => 0,
        }
    }

    /// Write a timer register
    pub fn write_reg(
        &mut self,
        offset: u16,
        value: u8,
        clock: Clock,
        alarms: &mut AlarmContext<Bus>,
    ) {
        match offset {
            reg::LATCH_LO => self.latch = (self.latch & 0xFF00) | u16::from(value),
            reg::LATCH_HI => self.latch = (self.latch & 0x00FF) | (u16::from(value) << 8),
            reg::CONTROL => {
                self.control = value & !ctrl::FORCE_LOAD;
                self.mode = if value & ctrl::ONESHOT != 0 {
                    TimerMode::OneShot
                } else {
                    TimerMode::Continuous
                };
                self.irq_enabled = value & ctrl::IRQ_ENABLE != 0;
                let start = value & ctrl::START != 0;
                if start && !self.running {
                    self.running = true;
                    alarms.set(self.alarm(), clock + self.period());
                } else if !start && self.running {
                    self.running = false;
                    alarms.unset(self.alarm());
                } else if start && value & ctrl::FORCE_LOAD != 0 {
                    alarms.set(self.alarm(), clock + self.period());
                }
            }
            _ => {}
        }
    }

    /// Cycles remaining until underflow, clamped to the latch range.
    /// Stopped timers read back the latch.
    fn counter(&self, clock: Clock, alarms: &AlarmContext<Bus>) -> u16 {
        if !self.running {
            return self.latch;
        }
        match self.alarm.and_then(|id| alarms.pending_clock(id)) {
            Some(fire) => fire
                .saturating_sub(clock)
                .saturating_sub(RELOAD_CYCLES)
                .min(Clock::from(self.latch)) as u16,
            None => 0,
        }
    }

    /// Alarm callback: record the underflow, raise the line, re-arm.
    fn on_underflow(&mut self, ctx: &mut AlarmContext<Bus>, irq: &mut IrqStatus, fired: Fired) {
        self.underflow_flag = true;
        if self.irq_enabled {
            irq.assert_irq(TIMER_IRQ_SOURCE, fired.clock);
        }
        match self.mode {
            // Re-arm relative to the armed time, not the dispatch time
            TimerMode::Continuous => ctx.set(fired.id, fired.due() + self.period()),
            TimerMode::OneShot => self.running = false,
        }
    }
}

/// Disk-rotation byte cadence for a drive domain.
///
/// While the motor spins, a byte passes under the head every
/// `cycles_per_byte` cycles and the byte-ready flag is raised. Reading
/// the status register clears the flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskRotation {
    cycles_per_byte: Clock,
    spinning: bool,
    byte_ready: bool,
    /// Total bytes that have passed the head since motor-on
    pub bytes_seen: u64,
    #[serde(skip)]
    alarm: Option<AlarmId>,
}

/// Rotation register offsets
pub mod rot_reg {
    /// bit0 byte-ready (read clears), bit1 motor spinning
    pub const STATUS: u16 = 0;
    /// bit0 motor on/off
    pub const CONTROL: u16 = 1;
}

impl DiskRotation {
    pub fn new(cycles_per_byte: Clock) -> Self {
        assert!(cycles_per_byte > 0);
        Self {
            cycles_per_byte,
            spinning: false,
            byte_ready: false,
            bytes_seen: 0,
            alarm: None,
        }
    }

    /// Create the rotation alarm in the drive's context
    pub fn install(alarms: &mut AlarmContext<Bus>) -> AlarmId {
        alarms.new_alarm(
            "disk rotation",
            Box::new(|bus: &mut Bus, ctx, fired| bus.rotation.on_byte(ctx, fired)),
        )
    }

    pub fn attach(&mut self, alarm: AlarmId) {
        self.alarm = Some(alarm);
    }

    /// The installed alarm binding, if any
    pub(crate) fn alarm_id(&self) -> Option<AlarmId> {
        self.alarm
    }

    pub fn spinning(&self) -> bool {
        self.spinning
    }

    pub fn read_reg(&mut self, offset: u16) -> u8 {
        match offset {
            rot_reg::STATUS => {
                let v = u8::from(self.byte_ready) | (u8::from(self.spinning) << 1);
                self.byte_ready = false;
                v
            }
            _ => 0,
        }
    }

    pub fn write_reg(
        &mut self,
        offset: u16,
        value: u8,
        clock: Clock,
        alarms: &mut AlarmContext<Bus>,
    ) {
        if offset == rot_reg::CONTROL {
            let on = value & 1 != 0;
            let alarm = self.alarm.expect("rotation register access before install");
            if on && !self.spinning {
                self.spinning = true;
                alarms.set(alarm, clock + self.cycles_per_byte);
            } else if !on && self.spinning {
                self.spinning = false;
                alarms.unset(alarm);
            }
        }
    }

    fn on_byte(&mut self, ctx: &mut AlarmContext<Bus>, fired: Fired) {
        self.byte_ready = true;
        self.bytes_seen += 1;
        ctx.set(fired.id, fired.due() + self.cycles_per_byte);
    }
}
