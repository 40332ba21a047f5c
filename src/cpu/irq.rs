//! Interrupt Status
//!
//! The interrupt-status object every CPU family consumes: level-sensitive
//! IRQ lines (one bit per source), an edge-triggered NMI, and reset/trap
//! requests. Assertion clocks are recorded so the execution loop can
//! apply the family's recognition-delay rules, and shifted during clock
//! rebasing so "time since assertion" stays consistent.

use crate::clock::Clock;
use serde::{Deserialize, Serialize};

/// Kinds of pending interrupt, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interrupt {
    Reset,
    Trap,
    Nmi,
    Irq,
}

/// An interrupt stamped at clock `C` becomes recognizable at a boundary
/// whose recognition limit is at least `C + RECOGNITION_CYCLES`: the line
/// must have been up by the penultimate cycle of the finishing
/// instruction.
pub const RECOGNITION_CYCLES: Clock = 2;

/// Per-domain interrupt line state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IrqStatus {
    /// One bit per IRQ source; the IRQ line is the OR of all bits
    irq_sources: u32,
    /// Clock at which the IRQ line last rose from idle
    irq_clock: Clock,
    nmi_pending: bool,
    nmi_clock: Clock,
    reset_pending: bool,
    trap_pending: bool,
}

impl IrqStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assert one IRQ source (level-sensitive). The stamp is taken only
    /// when the line rises from fully idle; re-asserting an already-held
    /// line does not refresh it.
    pub fn assert_irq(&mut self, source: u32, clock: Clock) {
        debug_assert!(source != 0);
        if self.irq_sources == 0 {
            self.irq_clock = clock;
        }
        self.irq_sources |= source;
    }

    /// Release one IRQ source
    pub fn clear_irq(&mut self, source: u32) {
        self.irq_sources &= !source;
    }

    /// True while any source holds the IRQ line down
    pub fn irq_line(&self) -> bool {
        self.irq_sources != 0
    }

    /// Edge-trigger the NMI
    pub fn assert_nmi(&mut self, clock: Clock) {
        if !self.nmi_pending {
            self.nmi_pending = true;
            self.nmi_clock = clock;
        }
    }

    /// Request a reset (power-on, reset button, or jam policy)
    pub fn assert_reset(&mut self) {
        self.reset_pending = true;
    }

    /// Request a trap stop (freeze button, host inspection point)
    pub fn assert_trap(&mut self) {
        self.trap_pending = true;
    }

    pub fn clear_trap(&mut self) {
        self.trap_pending = false;
    }

    /// Next recognizable interrupt kind at a boundary whose recognition
    /// limit is `limit`, with the IRQ mask state given. Reset and trap
    /// are recognized immediately; NMI ignores the mask.
    pub fn next_pending(&self, irq_masked: bool, limit: Clock) -> Option<Interrupt> {
        if self.reset_pending {
            return Some(Interrupt::Reset);
        }
        if self.trap_pending {
            return Some(Interrupt::Trap);
        }
        if self.nmi_pending && self.nmi_clock + RECOGNITION_CYCLES <= limit {
            return Some(Interrupt::Nmi);
        }
        if self.irq_line() && !irq_masked && self.irq_clock + RECOGNITION_CYCLES <= limit {
            return Some(Interrupt::Irq);
        }
        None
    }

    /// Consume an edge/request once the loop commits to servicing it.
    /// IRQ stays asserted; the device deasserts its own source.
    pub fn acknowledge(&mut self, kind: Interrupt) {
        match kind {
            Interrupt::Reset => self.reset_pending = false,
            Interrupt::Trap => {} // cleared by the host via clear_trap
            Interrupt::Nmi => self.nmi_pending = false,
            Interrupt::Irq => {}
        }
    }

    /// Shift recorded assertion clocks during a coordinated rebase
    pub fn rebase(&mut self, amount: Clock) {
        self.irq_clock = self.irq_clock.saturating_sub(amount);
        self.nmi_clock = self.nmi_clock.saturating_sub(amount);
    }
}
