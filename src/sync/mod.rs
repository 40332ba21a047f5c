//! Cross-Domain Clock Synchronization
//!
//! A dependent CPU (a drive controller) runs at a frequency that is not an
//! integral multiple of the primary CPU's. The bridge converts elapsed
//! primary cycles into a dependent cycle budget using a precomputed 16.16
//! fixed-point table plus a persistent fractional accumulator, so the
//! conversion is exact over arbitrarily long runs using only lookups and
//! additions - no per-cycle division, no cumulative rounding error.

use crate::clock::Clock;

/// Largest per-chunk primary delta the table covers.
pub const MAX_TICKS: Clock = 4096;

/// One cycle in 16.16 fixed point.
const SCALE_ONE: u32 = 1 << 16;

/// Rational frequency-ratio converter between two clock domains.
#[derive(Debug, Clone)]
pub struct ClockBridge {
    dependent_hz: u64,
    primary_hz: u64,
    /// `round(dependent_hz / primary_hz * 65536)`
    scale: u64,
    /// `whole[n] = floor(n * scale / 65536)` for n in 0..=MAX_TICKS
    whole: Vec<Clock>,
    /// `frac[n] = (n * scale) mod 65536`
    frac: Vec<u32>,
    /// Persistent fractional carry, always < 65536
    accum: u32,
}

impl ClockBridge {
    /// Build a bridge for `dependent_hz / primary_hz`.
    pub fn new(dependent_hz: u64, primary_hz: u64) -> Self {
        let mut bridge = Self {
            dependent_hz: 0,
            primary_hz: 0,
            scale: 0,
            whole: Vec::new(),
            frac: Vec::new(),
            accum: 0,
        };
        bridge.set_ratio(dependent_hz, primary_hz);
        bridge
    }

    /// Rebuild the ratio table. The fractional accumulator is preserved
    /// so a mid-run ratio change (a turbo switch) does not discard the
    /// partial cycle already owed to the dependent domain.
    pub fn set_ratio(&mut self, dependent_hz: u64, primary_hz: u64) {
        assert!(
            dependent_hz > 0 && primary_hz > 0,
            "frequencies must be nonzero ({dependent_hz}/{primary_hz})"
        );
        self.dependent_hz = dependent_hz;
        self.primary_hz = primary_hz;
        self.scale = (dependent_hz * u64::from(SCALE_ONE) + primary_hz / 2) / primary_hz;
        let entries = (MAX_TICKS + 1) as usize;
        self.whole = Vec::with_capacity(entries);
        self.frac = Vec::with_capacity(entries);
        for n in 0..entries as u64 {
            let product = n * self.scale;
            self.whole.push(product >> 16);
            self.frac.push((product & 0xFFFF) as u32);
        }
    }

    /// The configured ratio as (dependent_hz, primary_hz)
    pub fn ratio(&self) -> (u64, u64) {
        (self.dependent_hz, self.primary_hz)
    }

    /// Convert `primary_cycles` of elapsed primary time into whole
    /// dependent cycles, carrying the sub-cycle remainder internally.
    ///
    /// Exact under any chunking: splitting a total delta across calls
    /// yields the same whole-cycle sum as one call. Zero is a no-op.
    pub fn advance(&mut self, primary_cycles: Clock) -> Clock {
        let mut remaining = primary_cycles;
        let mut budget: Clock = 0;
        while remaining > 0 {
            let chunk = remaining.min(MAX_TICKS);
            budget += self.whole[chunk as usize];
            self.accum += self.frac[chunk as usize];
            if self.accum >= SCALE_ONE {
                self.accum -= SCALE_ONE;
                budget += 1;
            }
            remaining -= chunk;
        }
        budget
    }

    /// Current fractional carry in 16.16 units (< 65536), for snapshots
    pub fn remainder(&self) -> u32 {
        self.accum
    }
}
