//! Clock Domains
//!
//! Each independently clocked unit of the emulated machine (the host CPU,
//! each drive CPU) owns one free-running cycle counter: a clock domain.
//! Within a domain the counter is monotonically non-decreasing except at
//! explicit, coordinated rebasing events performed by [`ClockGuard`].

use serde::{Deserialize, Serialize};

mod guard;

pub use guard::ClockGuard;

/// Cycle counter value for one oscillator domain.
pub type Clock = u64;

/// Sentinel for "no pending alarm" / "never fires".
pub const NEVER: Clock = Clock::MAX;

/// One oscillator domain's free-running cycle counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockDomain {
    /// Domain name, for logs and snapshots
    pub name: String,
    /// Current cycle count
    pub clock: Clock,
}

impl ClockDomain {
    /// Create a new domain with its counter at zero
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            clock: 0,
        }
    }

    /// Current counter value
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Advance the counter by `cycles`
    pub fn advance(&mut self, cycles: Clock) {
        self.clock += cycles;
    }

    /// Subtract `amount` from the counter during a coordinated rebase.
    ///
    /// Only [`ClockGuard::prevent_overflow`] should call this; a rebase
    /// that would take the counter negative is a bug in the caller.
    pub fn rebase(&mut self, amount: Clock) {
        assert!(
            amount <= self.clock,
            "{}: rebase amount {} exceeds clock {}",
            self.name,
            amount,
            self.clock
        );
        self.clock -= amount;
    }
}


#[cfg(test)]
mod tests_guard;
