//! IMU poll task
//!
//! Brings the BNO080 up (reset, product-ID handshake, rotation vector
//! feature enable) and then polls it on a fixed period, publishing each new
//! quaternion into shared state. Orientation is published for observers;
//! the control loop steers on wheel odometry alone.
//!
//! Bus faults are expected operational noise (the sensor clock-stretches,
//! the bus occasionally times out); they are logged throttled and the cycle
//! is skipped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::bus::BusPhy;
use crate::config::ImuConfig;
use crate::devices::bno080::Bno080;
use crate::error::Result;
use crate::state::SharedState;
use crate::tasks::Periodic;

pub struct ImuTask<P: BusPhy> {
    imu: Bno080<P>,
    state: SharedState,
    period: Duration,
    report_interval_ms: u16,
    last_fault_log: Option<Instant>,
    samples: u64,
}

impl<P: BusPhy + 'static> ImuTask<P> {
    pub fn new(imu: Bno080<P>, config: &ImuConfig, state: SharedState) -> Self {
        Self {
            imu,
            state,
            period: Duration::from_millis(config.poll_period_ms),
            report_interval_ms: config.report_interval_ms,
            last_fault_log: None,
            samples: 0,
        }
    }

    /// Reset, handshake and enable the rotation vector stream
    pub fn init(&mut self) -> Result<()> {
        self.imu.begin()?;
        self.imu
            .enable_rotation_vector(self.report_interval_ms as u32)?;
        log::info!(
            "imu streaming rotation vector every {} ms",
            self.report_interval_ms
        );
        Ok(())
    }

    /// One poll cycle
    pub fn poll(&mut self) {
        match self.imu.data_available() {
            Ok(true) => {
                if let Some(rv) = self.imu.rotation() {
                    self.state.set_orientation(rv.quat);
                    self.samples += 1;
                }
            }
            Ok(false) => {}
            Err(e) => {
                // Throttle to 1 Hz; a wedged sensor would otherwise flood
                // the log at the poll rate
                let should_log = self
                    .last_fault_log
                    .map_or(true, |t| t.elapsed() >= Duration::from_secs(1));
                if should_log {
                    log::warn!("imu poll failed: {}", e);
                    self.last_fault_log = Some(Instant::now());
                }
            }
        }
    }

    fn run(mut self, shutdown: Arc<AtomicBool>) {
        log::debug!("imu poll loop started, period {:?}", self.period);
        let mut tick = Periodic::new(self.period);
        while !shutdown.load(Ordering::Relaxed) {
            self.poll();
            tick.wait();
        }
        log::debug!("imu poll loop exiting, {} samples published", self.samples);
    }

    pub fn spawn(self, shutdown: Arc<AtomicBool>) -> Result<JoinHandle<()>> {
        let handle = std::thread::Builder::new()
            .name("imu-poll".to_string())
            .spawn(move || self.run(shutdown))?;
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::BusMaster;
    use crate::config::AppConfig;
    use crate::devices::bno080::shtp::SequencePolicy;
    use crate::sim::imu::ImuSim;

    fn task() -> ImuTask<ImuSim> {
        let config = AppConfig::defaults();
        let imu = Bno080::new(
            BusMaster::new(ImuSim::new()),
            config.imu.address,
            SequencePolicy::default(),
        );
        ImuTask::new(imu, &config.imu, SharedState::new())
    }

    #[test]
    fn init_then_poll_publishes_orientation() {
        let mut t = task();
        t.init().unwrap();
        t.imu.bus_mut().phy_mut().set_orientation([0, 0, 0, 0x4000]);
        t.poll();
        let snap = t.state.snapshot();
        assert_eq!(snap.orientation.real, 1.0);
        assert_eq!(t.samples, 1);
    }

    #[test]
    fn polling_an_idle_sensor_publishes_nothing() {
        let mut t = task();
        t.poll();
        assert_eq!(t.samples, 0);
        assert_eq!(t.state.snapshot().orientation.real, 0.0);
    }
}
