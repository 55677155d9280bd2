//! Global atomic counters for the repair loop.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a batch).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    problems_started: AtomicU64,
    attempts: AtomicU64,
    reprompts: AtomicU64,
    units_executed: AtomicU64,
    problems_passed: AtomicU64,
    problems_exhausted: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            problems_started: AtomicU64::new(0),
            attempts: AtomicU64::new(0),
            reprompts: AtomicU64::new(0),
            units_executed: AtomicU64::new(0),
            problems_passed: AtomicU64::new(0),
            problems_exhausted: AtomicU64::new(0),
        }
    }

    pub fn inc_problems_started(&self) {
        self.problems_started.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "problems_started", "counter incremented");
    }

    pub fn inc_attempts(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "attempts", "counter incremented");
    }

    pub fn inc_reprompts(&self) {
        self.reprompts.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "reprompts", "counter incremented");
    }

    /// Add `n` executed fixture units.
    pub fn add_units_executed(&self, n: u64) {
        self.units_executed.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "units_executed", n, "counter incremented");
    }

    pub fn inc_problems_passed(&self) {
        self.problems_passed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_problems_exhausted(&self) {
        self.problems_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            problems_started = self.problems_started(),
            attempts = self.attempts(),
            reprompts = self.reprompts(),
            units_executed = self.units_executed(),
            problems_passed = self.problems_passed(),
            problems_exhausted = self.problems_exhausted(),
        );
    }

    pub fn problems_started(&self) -> u64 {
        self.problems_started.load(Ordering::Relaxed)
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn reprompts(&self) -> u64 {
        self.reprompts.load(Ordering::Relaxed)
    }

    pub fn units_executed(&self) -> u64 {
        self.units_executed.load(Ordering::Relaxed)
    }

    pub fn problems_passed(&self) -> u64 {
        self.problems_passed.load(Ordering::Relaxed)
    }

    pub fn problems_exhausted(&self) -> u64 {
        self.problems_exhausted.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.problems_started.store(0, Ordering::Relaxed);
        self.attempts.store(0, Ordering::Relaxed);
        self.reprompts.store(0, Ordering::Relaxed);
        self.units_executed.store(0, Ordering::Relaxed);
        self.problems_passed.store(0, Ordering::Relaxed);
        self.problems_exhausted.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        m.inc_problems_started();
        m.inc_attempts();
        m.inc_attempts();
        m.inc_reprompts();
        m.add_units_executed(7);
        m.inc_problems_passed();
        assert_eq!(m.problems_started(), 1);
        assert_eq!(m.attempts(), 2);
        assert_eq!(m.reprompts(), 1);
        assert_eq!(m.units_executed(), 7);
        assert_eq!(m.problems_passed(), 1);
        assert_eq!(m.problems_exhausted(), 0);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_attempts();
        m.add_units_executed(3);
        m.inc_problems_exhausted();
        m.reset();
        assert_eq!(m.attempts(), 0);
        assert_eq!(m.units_executed(), 0);
        assert_eq!(m.problems_exhausted(), 0);
    }
}
