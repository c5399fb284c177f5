//! Countdown timer primitive used by the gameboard timer bank.

/// Accumulates elapsed milliseconds against a fixed period. Firing rewinds
/// the accumulator to zero, so each timer is one-shot per period.
#[derive(Debug, Clone)]
pub struct Timer {
    elapsed: f64,
    period: f64,
}

impl Timer {
    pub fn new(period: f64) -> Self {
        Self {
            elapsed: 0.0,
            period,
        }
    }

    /// Advance by `delta` ms. Returns true (and rewinds) when the period is
    /// reached or exceeded.
    pub fn advance(&mut self, delta: f64) -> bool {
        self.elapsed += delta;
        if self.elapsed >= self.period {
            self.elapsed = 0.0;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }

    /// Change the period without disturbing the accumulator (used when the
    /// grace period is recomputed on level-up).
    pub fn set_period(&mut self, period: f64) {
        self.period = period;
    }

    pub fn period(&self) -> f64 {
        self.period
    }
}
