//! First-order wheel simulation
//!
//! One [`SimWheel`] models a motor, gearbox and encoder: the net bridge
//! duty sets wheel speed directly (no inertia), and tick position is
//! integrated lazily whenever either side touches the wheel. The encoder
//! and PWM handles share the wheel core, so the control loop closes through
//! the same seams it uses on hardware.
//!
//! Raw counter ticks follow the signed net duty directly on both wheels.
//! On the chassis the left motor and left encoder are both mirrored, so the
//! two inversions cancel in the duty-to-counter map; the left-side sign
//! conventions live in the controller direction sign and the encoder
//! negation, not here.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::encoder::WheelEncoder;
use crate::motor::PwmPair;

struct WheelCore {
    in1: u8,
    in2: u8,
    /// Accumulated raw counter position, fractional ticks kept
    ticks: f64,
    last: Instant,
    max_ticks_per_sec: f32,
}

impl WheelCore {
    fn integrate_to(&mut self, now: Instant) {
        let dt = now.duration_since(self.last).as_secs_f64();
        self.last = now;
        self.advance(dt);
    }

    fn advance(&mut self, dt: f64) {
        let net = (self.in1 as f64 - self.in2 as f64) / 100.0;
        self.ticks += net * self.max_ticks_per_sec as f64 * dt;
    }
}

/// One simulated wheel; hand out [`SimWheel::encoder`] and
/// [`SimWheel::pwm`] to the components that need each side.
#[derive(Clone)]
pub struct SimWheel {
    core: Arc<Mutex<WheelCore>>,
}

impl SimWheel {
    pub fn new(max_ticks_per_sec: f32) -> Self {
        Self {
            core: Arc::new(Mutex::new(WheelCore {
                in1: 0,
                in2: 0,
                ticks: 0.0,
                last: Instant::now(),
                max_ticks_per_sec,
            })),
        }
    }

    pub fn encoder(&self) -> SimEncoder {
        SimEncoder {
            core: self.core.clone(),
        }
    }

    pub fn pwm(&self) -> SimPwm {
        SimPwm {
            core: self.core.clone(),
        }
    }

    /// Raw accumulated tick position (test observation point)
    pub fn ticks(&self) -> f64 {
        let mut core = self.core.lock();
        core.integrate_to(Instant::now());
        core.ticks
    }

    /// Step simulated time forward without waiting for the wall clock
    pub fn advance(&self, dt_secs: f64) {
        let mut core = self.core.lock();
        core.integrate_to(Instant::now());
        core.advance(dt_secs);
    }
}

pub struct SimEncoder {
    core: Arc<Mutex<WheelCore>>,
}

impl WheelEncoder for SimEncoder {
    fn read_ticks(&mut self) -> u16 {
        let mut core = self.core.lock();
        core.integrate_to(Instant::now());
        // Free-running 16-bit counter: wrap like the hardware does
        core.ticks as i64 as u16
    }
}

pub struct SimPwm {
    core: Arc<Mutex<WheelCore>>,
}

impl PwmPair for SimPwm {
    fn set_duty(&mut self, in1: u8, in2: u8) {
        let mut core = self.core.lock();
        // Integrate the old duty up to now before the speed changes
        core.integrate_to(Instant::now());
        core.in1 = in1;
        core.in2 = in2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_duty_advances_the_counter() {
        let wheel = SimWheel::new(1000.0);
        let mut pwm = wheel.pwm();
        let mut enc = wheel.encoder();
        let start = enc.read_ticks();
        pwm.set_duty(50, 0);
        wheel.advance(1.0); // 1 s at 50%: 500 ticks
        let delta = enc.read_ticks().wrapping_sub(start) as i16;
        assert!((495..=505).contains(&delta));
    }

    #[test]
    fn reverse_duty_runs_the_counter_down() {
        let wheel = SimWheel::new(1000.0);
        let mut pwm = wheel.pwm();
        let mut enc = wheel.encoder();
        let start = enc.read_ticks();
        pwm.set_duty(0, 40);
        wheel.advance(0.5);
        let delta = enc.read_ticks().wrapping_sub(start) as i16;
        assert!(delta < -190);
    }

    #[test]
    fn brake_hold_keeps_the_wheel_still() {
        let wheel = SimWheel::new(1000.0);
        let mut pwm = wheel.pwm();
        pwm.set_duty(100, 100);
        wheel.advance(1.0);
        assert_eq!(wheel.ticks().round() as i64, 0);
    }

    #[test]
    fn counter_wraps_at_sixteen_bits() {
        let wheel = SimWheel::new(100_000.0);
        let mut pwm = wheel.pwm();
        let mut enc = wheel.encoder();
        pwm.set_duty(100, 0);
        wheel.advance(1.0); // well past 65536 ticks
        // Wrapped value still moves consistently afterwards
        let a = enc.read_ticks();
        wheel.advance(0.1);
        let delta = enc.read_ticks().wrapping_sub(a) as i16;
        assert!((9_000..=11_000).contains(&delta));
    }
}
