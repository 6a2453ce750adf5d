//! Periodic task scaffolding
//!
//! Each task is an OS thread (named, via `std::thread::Builder`) running a
//! fixed-period loop until the shared shutdown flag flips. Periods are
//! scheduled against absolute deadlines: the next deadline advances by the
//! period, not from "now", so per-cycle jitter does not accumulate into
//! drift. A task that overruns its period skips the sleep and catches up.

pub mod control;
pub mod diag;
pub mod imu;

use std::time::{Duration, Instant};

/// Absolute-deadline period scheduler
pub struct Periodic {
    period: Duration,
    next: Instant,
}

impl Periodic {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: Instant::now() + period,
        }
    }

    /// Sleep until the current deadline (if it is still in the future) and
    /// advance to the next one.
    pub fn wait(&mut self) {
        let now = Instant::now();
        if self.next > now {
            std::thread::sleep(self.next - now);
        }
        self.next += self.period;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_periods_take_five_periods() {
        let mut tick = Periodic::new(Duration::from_millis(10));
        let start = Instant::now();
        for _ in 0..5 {
            tick.wait();
        }
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(120));
    }

    #[test]
    fn overrun_does_not_push_later_deadlines_out() {
        let mut tick = Periodic::new(Duration::from_millis(10));
        let start = Instant::now();
        std::thread::sleep(Duration::from_millis(25)); // blow through 2 deadlines
        tick.wait(); // immediate
        tick.wait(); // immediate
        tick.wait(); // lands on the 30 ms absolute deadline
        let elapsed = start.elapsed();
        assert!(elapsed < Duration::from_millis(45));
    }
}
