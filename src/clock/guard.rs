//! Clock Overflow Prevention
//!
//! A clock domain that runs for hours accumulates a huge cycle count. The
//! guard periodically rebases the counter by subtracting a large amount
//! before it can overflow, and tells every subscriber the exact amount so
//! all absolute-clock-relative state (pending alarms, interrupt stamps,
//! cross-domain bookmarks) shifts consistently. The amount subtracted is
//! always a multiple of a caller-supplied granularity so that periodic
//! hardware phase alignment survives the rebase.

use super::{Clock, ClockDomain};

/// Subscriber notified with the exact amount subtracted from the clock.
pub type GuardCallback<S> = Box<dyn FnMut(&mut S, Clock)>;

/// Periodic rebasing mechanism for one clock domain.
///
/// `S` is the chip state the subscribers mutate when they shift their
/// recorded clocks.
pub struct ClockGuard<S> {
    /// Counter value at which the next `prevent_overflow` call rebases
    max_value: Clock,
    /// The subtracted amount is always a multiple of this
    granularity: Clock,
    callbacks: Vec<GuardCallback<S>>,
}

impl<S> ClockGuard<S> {
    /// Create a guard that trips once the domain clock reaches `max_value`.
    pub fn new(max_value: Clock) -> Self {
        assert!(max_value > 0, "guard threshold must be nonzero");
        Self {
            max_value,
            granularity: 1,
            callbacks: Vec::new(),
        }
    }

    /// Set the phase-preservation granularity.
    ///
    /// Must not exceed the guard threshold, otherwise no multiple of it
    /// could ever be subtracted.
    pub fn set_granularity(&mut self, granularity: Clock) {
        assert!(
            granularity > 0 && granularity <= self.max_value / 2,
            "granularity {} outside (0, {}]",
            granularity,
            self.max_value / 2
        );
        self.granularity = granularity;
    }

    /// Current granularity
    pub fn granularity(&self) -> Clock {
        self.granularity
    }

    /// Register a subscriber; subscribers run in registration order.
    pub fn add_callback(&mut self, callback: GuardCallback<S>) {
        self.callbacks.push(callback);
    }

    /// Rebase the domain clock if it has reached the threshold.
    ///
    /// Brings the counter back to roughly half the threshold, leaving
    /// headroom so targets and bookmarks trailing the clock by a few
    /// cycles stay representable. Returns the amount subtracted (0 if no
    /// rebase happened) so the caller can shift its own target-clock
    /// bookkeeping identically. Never fails; a subscriber whose state
    /// would go negative after the subtraction has a bug of its own.
    pub fn prevent_overflow(&mut self, domain: &mut ClockDomain, state: &mut S) -> Clock {
        if domain.clock < self.max_value {
            return 0;
        }
        // Largest multiple of the granularity that leaves half the
        // threshold on the counter. Granularity is capped at half the
        // threshold, so the amount is always positive.
        let headroom = self.max_value / 2;
        let raw = domain.clock - headroom;
        let amount = raw - (raw % self.granularity);
        log::debug!(
            "{}: rebasing clock {} by {} (granularity {})",
            domain.name,
            domain.clock,
            amount,
            self.granularity
        );
        domain.rebase(amount);
        for callback in &mut self.callbacks {
            callback(state, amount);
        }
        amount
    }
}

impl<S> std::fmt::Debug for ClockGuard<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockGuard")
            .field("max_value", &self.max_value)
            .field("granularity", &self.granularity)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}
