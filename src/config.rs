//! Configuration for the rover-core daemon
//!
//! Loads configuration from a TOML file. Gains and limits mirror the tuned
//! values the robot ships with; every field can be overridden per deployment.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub robot: RobotConfig,
    pub controller: ControllerConfig,
    pub imu: ImuConfig,
    pub sim: SimConfig,
    pub logging: LoggingConfig,
}

/// Robot geometry and scheduling
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RobotConfig {
    /// Wheelbase expressed in encoder ticks (ticks of travel for one wheel
    /// to swing the chassis one angle unit about the other)
    pub wheelbase_ticks: i32,

    /// Control loop period in milliseconds
    pub control_period_ms: u64,
}

/// Wheel controller gains and limits
///
/// `pwm_lim` is applied before `pwm_lim_linear` at configuration time; the
/// linear limit is silently capped to the total limit (clamp-on-set, no
/// rejection path).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControllerConfig {
    /// Divisor applied to the summed gain terms, allowing integer gains to
    /// be tuned with extra resolution
    pub pwm_scale: i32,

    /// Linear proportional / integral / derivative gains
    pub kp_l: i32,
    pub ki_l: i32,
    pub kd_l: i32,

    /// Angular proportional / integral / derivative gains
    pub kp_a: i32,
    pub ki_a: i32,
    pub kd_a: i32,

    /// Total PWM duty ceiling, percent (capped at 100)
    pub pwm_lim: i32,

    /// Portion of `pwm_lim` reserved for the linear loop; the remainder is
    /// the angular loop's authority
    pub pwm_lim_linear: i32,

    /// Anti-windup bound on the linear error sum
    pub esum_l_lim: i32,

    /// Anti-windup bound on the angular error sum
    pub esum_a_lim: i32,
}

/// IMU driver configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImuConfig {
    /// 7-bit bus address of the IMU
    pub address: u8,

    /// Rotation vector report interval requested from the sensor, ms
    pub report_interval_ms: u16,

    /// Poll task period, ms
    pub poll_period_ms: u64,

    /// Outgoing packet sequence numbering: "fixed" (always 0, matches the
    /// deployed firmware) or "per-channel" (increments a 6-entry table)
    pub sequence_numbering: String,
}

/// Simulated hardware parameters (used when the `mock` feature drives the
/// daemon without real hardware)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimConfig {
    /// Encoder tick rate at 100% PWM duty
    pub max_ticks_per_sec: f32,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Tuned defaults for the reference chassis
    pub fn defaults() -> Self {
        let pwm_lim = 50;
        let pwm_lim_linear = 3 * pwm_lim / 5;
        let pwm_scale = 100;
        Self {
            robot: RobotConfig {
                wheelbase_ticks: 531,
                control_period_ms: 10,
            },
            controller: ControllerConfig {
                pwm_scale,
                kp_l: 30,
                ki_l: 1,
                kd_l: 0,
                kp_a: 60,
                ki_a: 10,
                kd_a: 0,
                pwm_lim,
                pwm_lim_linear,
                // esum limits are compared against pre-scale error sums
                esum_l_lim: pwm_lim * pwm_scale / 10,
                esum_a_lim: (pwm_lim - pwm_lim_linear) * pwm_scale,
            },
            imu: ImuConfig {
                address: 0x4B,
                report_interval_ms: 50,
                poll_period_ms: 20,
                sequence_numbering: "fixed".to_string(),
            },
            sim: SimConfig {
                max_ticks_per_sec: 4000.0,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::defaults()
    }
}
