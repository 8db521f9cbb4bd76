//! Exponential backoff.

use std::time::Duration;

/// Multiply a duration, saturating at `Duration::MAX`.
fn scale(delay: Duration, factor: f64) -> Duration {
    let nanos = (delay.as_nanos() as f64 * factor).round();
    if !nanos.is_finite() || nanos >= u64::MAX as f64 {
        return Duration::MAX;
    }
    Duration::from_nanos(nanos as u64)
}

/// Backoff schedule: retry `k` (0-based) waits `initial * multiplier^k`.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    multiplier: f64,
}

impl Backoff {
    pub fn new(initial: Duration, multiplier: f64) -> Self {
        Self {
            next: initial,
            multiplier: multiplier.max(1.0),
        }
    }

    /// Return the current delay and advance to the next one.
    pub fn next_delay(&mut self) -> Duration {
        let current = self.next;
        self.next = scale(current, self.multiplier);
        current
    }
}
