//! Motor control: per-wheel PI controllers over an H-bridge PWM pair

pub mod controller;
pub mod pwm;

pub use controller::{Diagnostic, WheelController, WheelSide};
pub use pwm::{DriveMode, PwmPair};
