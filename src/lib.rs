//! rover-core - firmware core for a two-wheeled differential-drive robot
//!
//! The crate is organized around three loops and the plumbing between them:
//!
//! - **Control loop** ([`tasks::control`]): encoder sampling, dead-reckoning
//!   pose estimation ([`odometry`]) and the per-wheel PI controllers
//!   ([`motor`]) driving the H-bridges, on a fixed 10 ms period.
//! - **IMU loop** ([`tasks::imu`]): the BNO080 driver ([`devices::bno080`])
//!   polled over the two-wire bus ([`bus`]), publishing orientation.
//! - **Diagnostics** ([`tasks::diag`]): throttled logging of controller
//!   internals off a bounded channel.
//!
//! Hardware touches the crate only through three traits:
//! [`bus::BusPhy`], [`encoder::WheelEncoder`] and [`motor::PwmPair`]. The
//! [`sim`] module implements all three so the daemon and the test suite run
//! without a robot attached.

pub mod bus;
pub mod config;
pub mod devices;
pub mod encoder;
pub mod error;
pub mod fixed;
pub mod motor;
pub mod odometry;
pub mod state;
pub mod tasks;

#[cfg(any(test, feature = "mock"))]
pub mod sim;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use state::SharedState;
