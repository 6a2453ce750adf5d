//! Simulated hardware
//!
//! Lets the daemon (and the test suite) run without a robot attached: a
//! first-order wheel model that turns PWM duties into encoder ticks, and a
//! scripted IMU peripheral that speaks enough SHTP to satisfy the driver.

pub mod imu;
pub mod robot;
