//! Diagnostics reporting task
//!
//! Drains the control loop's diagnostics channel and logs a summary line,
//! throttled to 1 Hz so the 100 Hz control loop does not flood the log.
//! Purely advisory: losing samples (full channel, slow drain) costs nothing
//! but visibility.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::error::Result;
use crate::tasks::control::CycleDiagnostics;

const LOG_INTERVAL: Duration = Duration::from_secs(1);

pub struct DiagTask {
    rx: Receiver<CycleDiagnostics>,
    last_log: Option<Instant>,
    received: u64,
}

impl DiagTask {
    pub fn new(rx: Receiver<CycleDiagnostics>) -> Self {
        Self {
            rx,
            last_log: None,
            received: 0,
        }
    }

    fn report(&mut self, d: &CycleDiagnostics) {
        self.received += 1;
        let should_log = self
            .last_log
            .map_or(true, |t| t.elapsed() >= LOG_INTERVAL);
        if !should_log {
            return;
        }
        self.last_log = Some(Instant::now());
        log::info!(
            "cycle {}: pose x={} y={} theta={} | L pwm={} (lin {} ang {}) esum=({},{}) | R pwm={} (lin {} ang {}) esum=({},{})",
            d.cycle,
            d.pose.x,
            d.pose.y,
            d.pose.theta,
            d.left.pwm_total,
            d.left.pwm_linear,
            d.left.pwm_angular,
            d.left.esum_linear,
            d.left.esum_angular,
            d.right.pwm_total,
            d.right.pwm_linear,
            d.right.pwm_angular,
            d.right.esum_linear,
            d.right.esum_angular,
        );
    }

    fn run(mut self, shutdown: Arc<AtomicBool>) {
        log::debug!("diagnostics drain started");
        while !shutdown.load(Ordering::Relaxed) {
            match self.rx.recv_timeout(Duration::from_millis(100)) {
                Ok(d) => self.report(&d),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        log::debug!("diagnostics drain exiting, {} samples seen", self.received);
    }

    pub fn spawn(self, shutdown: Arc<AtomicBool>) -> Result<JoinHandle<()>> {
        let handle = std::thread::Builder::new()
            .name("diagnostics".to_string())
            .spawn(move || self.run(shutdown))?;
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::Diagnostic;
    use crate::odometry::Pose;

    fn sample(cycle: u64) -> CycleDiagnostics {
        CycleDiagnostics {
            cycle,
            pose: Pose::default(),
            left: Diagnostic::default(),
            right: Diagnostic::default(),
        }
    }

    #[test]
    fn counts_every_sample_but_logs_throttled() {
        let (tx, rx) = crossbeam_channel::bounded(8);
        let mut task = DiagTask::new(rx);
        for i in 0..5 {
            tx.send(sample(i)).unwrap();
        }
        drop(tx);
        while let Ok(d) = task.rx.recv() {
            task.report(&d);
        }
        assert_eq!(task.received, 5);
        // Only the first sample inside the 1 s window produced a log line
        assert!(task.last_log.is_some());
    }
}
