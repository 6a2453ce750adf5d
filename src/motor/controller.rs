//! Dual-axis wheel controller
//!
//! Each wheel runs one controller blending two PI loops: a linear loop on
//! driven distance and an angular loop on heading. The angular loop gets the
//! wheel's direction sign so the two wheels differentiate a turn command;
//! the blended total gets the sign again so a mirrored motor spins the right
//! way. All math is truncating integer arithmetic; the gains and limits are
//! tuned against that and must not be promoted to floats.
//!
//! Controllers come up inert (all gains and limits zero) and are configured
//! through clamp-on-set setters: out-of-range values are silently pulled
//! into range rather than rejected, so a bad config degrades to a slower
//! robot instead of a dead one.

use super::pwm::{drive, DriveMode, PwmPair};

/// Wheel identity, fixing the direction sign at construction.
///
/// The left motor is the mirrored one: its encoder counts down when the
/// robot drives forward and its PWM polarity is reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelSide {
    Left,
    Right,
}

impl WheelSide {
    pub fn direction(self) -> i32 {
        match self {
            WheelSide::Left => -1,
            WheelSide::Right => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WheelSide::Left => "left",
            WheelSide::Right => "right",
        }
    }
}

/// Per-cycle controller output snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostic {
    pub pwm_total: i32,
    pub pwm_linear: i32,
    pub pwm_angular: i32,
    pub esum_linear: i32,
    pub esum_angular: i32,
}

pub struct WheelController<P: PwmPair> {
    pwm: P,
    side: WheelSide,
    direction: i32,

    kp_l: i32,
    ki_l: i32,
    kd_l: i32,
    kp_a: i32,
    ki_a: i32,
    kd_a: i32,
    pwm_scale: i32,
    pwm_lim: i32,
    pwm_lim_linear: i32,
    esum_l_lim: i32,
    esum_a_lim: i32,

    setpoint_l: i32,
    position: i32,
    setpoint_a: i32,
    angle: i32,
    error_l: i32,
    esum_l: i32,
    error_a: i32,
    esum_a: i32,
}

impl<P: PwmPair> WheelController<P> {
    /// An inert controller: zero gains, zero limits, unity scale
    pub fn new(pwm: P, side: WheelSide) -> Self {
        Self {
            pwm,
            side,
            direction: side.direction(),
            kp_l: 0,
            ki_l: 0,
            kd_l: 0,
            kp_a: 0,
            ki_a: 0,
            kd_a: 0,
            pwm_scale: 1,
            pwm_lim: 0,
            pwm_lim_linear: 0,
            esum_l_lim: 0,
            esum_a_lim: 0,
            setpoint_l: 0,
            position: 0,
            setpoint_a: 0,
            angle: 0,
            error_l: 0,
            esum_l: 0,
            error_a: 0,
            esum_a: 0,
        }
    }

    pub fn side(&self) -> WheelSide {
        self.side
    }

    pub fn set_gains_linear(&mut self, kp: i32, ki: i32, kd: i32) {
        self.kp_l = kp;
        self.ki_l = ki;
        self.kd_l = kd;
    }

    pub fn set_gains_angular(&mut self, kp: i32, ki: i32, kd: i32) {
        self.kp_a = kp;
        self.ki_a = ki;
        self.kd_a = kd;
    }

    /// Divisor applied to the summed gain terms; floored at 1
    pub fn set_pwm_scale(&mut self, scale: i32) {
        self.pwm_scale = scale.max(1);
    }

    /// Total duty limit, silently capped to 0..=100
    pub fn set_pwm_lim(&mut self, lim: i32) {
        self.pwm_lim = lim.clamp(0, 100);
    }

    /// Linear share of the duty limit, silently capped to the current
    /// total limit; the remainder is the angular share
    pub fn set_pwm_lim_linear(&mut self, lim: i32) {
        self.pwm_lim_linear = lim.clamp(0, self.pwm_lim);
    }

    pub fn set_esum_l_lim(&mut self, lim: i32) {
        self.esum_l_lim = lim.max(0);
    }

    pub fn set_esum_a_lim(&mut self, lim: i32) {
        self.esum_a_lim = lim.max(0);
    }

    /// Targets for the two loops
    pub fn set_setpoints(&mut self, linear: i32, angular: i32) {
        self.setpoint_l = linear;
        self.setpoint_a = angular;
    }

    /// Measured values the errors are taken against
    pub fn set_feedback(&mut self, position: i32, angle: i32) {
        self.position = position;
        self.angle = angle;
    }

    pub fn zero_esum_l(&mut self) {
        self.esum_l = 0;
    }

    pub fn zero_esum_a(&mut self) {
        self.esum_a = 0;
    }

    /// One control cycle: update errors and accumulators, blend the two
    /// loops, and put the result on the bridge. The accumulators clamp
    /// after accumulation (no decay), so windup is bounded but the sum
    /// holds its limit value until the error changes sign.
    ///
    /// The derivative terms are wired but always contribute zero; the
    /// sample-difference source for them was never brought up.
    pub fn run(&mut self, en_p: bool, en_i: bool, en_d: bool, mode: DriveMode) -> Diagnostic {
        self.error_l = self.setpoint_l - self.position;
        self.error_a = self.setpoint_a - self.angle;
        self.esum_l = (self.esum_l + self.error_l).clamp(-self.esum_l_lim, self.esum_l_lim);
        self.esum_a = (self.esum_a + self.error_a).clamp(-self.esum_a_lim, self.esum_a_lim);
        let eder_l = 0;
        let eder_a = 0;

        let p = en_p as i32;
        let i = en_i as i32;
        let d = en_d as i32;

        let linear_sum =
            p * self.kp_l * self.error_l + i * self.ki_l * self.esum_l + d * self.kd_l * eder_l;
        let pwm_linear =
            (linear_sum / self.pwm_scale).clamp(-self.pwm_lim_linear, self.pwm_lim_linear);

        let angular_lim = self.pwm_lim - self.pwm_lim_linear;
        let angular_sum =
            p * self.kp_a * self.error_a + i * self.ki_a * self.esum_a + d * self.kd_a * eder_a;
        let pwm_angular =
            (angular_sum * self.direction / self.pwm_scale).clamp(-angular_lim, angular_lim);

        let pwm_total =
            ((pwm_linear + pwm_angular) * self.direction).clamp(-self.pwm_lim, self.pwm_lim);

        drive(&mut self.pwm, pwm_total, mode);

        Diagnostic {
            pwm_total,
            pwm_linear,
            pwm_angular,
            esum_linear: self.esum_l,
            esum_angular: self.esum_a,
        }
    }

    pub fn pwm_mut(&mut self) -> &mut P {
        &mut self.pwm
    }
}
