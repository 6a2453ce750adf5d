//! Shared robot state
//!
//! One snapshot struct behind a `parking_lot::RwLock`. Fields have exactly
//! one writer each: the control task owns pose, target feedback and wheel
//! diagnostics, the IMU task owns orientation, and the operator side owns
//! the target waypoint. Readers clone the whole snapshot; nobody ever sees
//! half an update.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::devices::bno080::reports::Quaternion;
use crate::motor::Diagnostic;
use crate::odometry::Pose;

/// Target waypoint in the inertial frame, encoder-tick units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Waypoint {
    pub x: i32,
    pub y: i32,
}

/// Everything observable about the robot at an instant
#[derive(Debug, Clone, Default)]
pub struct RobotSnapshot {
    pub pose: Pose,
    pub orientation: Quaternion,
    pub target: Waypoint,
    pub diag_left: Diagnostic,
    pub diag_right: Diagnostic,
    /// Control cycles completed since start
    pub cycles: u64,
}

#[derive(Clone, Default)]
pub struct SharedState {
    inner: Arc<RwLock<RobotSnapshot>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> RobotSnapshot {
        self.inner.read().clone()
    }

    pub fn set_pose(&self, pose: Pose) {
        self.inner.write().pose = pose;
    }

    pub fn set_orientation(&self, q: Quaternion) {
        self.inner.write().orientation = q;
    }

    pub fn set_target(&self, target: Waypoint) {
        self.inner.write().target = target;
    }

    pub fn set_diagnostics(&self, left: Diagnostic, right: Diagnostic, cycles: u64) {
        let mut s = self.inner.write();
        s.diag_left = left;
        s.diag_right = right;
        s.cycles = cycles;
    }
}
