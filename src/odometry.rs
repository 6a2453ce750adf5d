//! Dead-reckoning pose estimator
//!
//! Integrates per-cycle wheel tick deltas into an inertial-frame pose. Pure
//! incremental integration with no correction source: drift accumulates
//! unboundedly and that is accepted at this layer.
//!
//! The arithmetic runs in [`Q2`] fixed point. Deltas are promoted before
//! the velocity divisions so two fractional bits survive the truncating
//! integer math, and the accumulated values are demoted back to whole units
//! at the very end of each cycle. Heading change is computed directly from
//! the tick differential over the wheelbase rather than from the angular
//! velocity, which would truncate to zero at these magnitudes. The heading
//! accumulator is a raw integer interpreted as radians when the local
//! displacement is rotated into the inertial frame.

use crate::fixed::Q2;

/// Inertial-frame pose, integer accumulators.
/// x/y are in encoder ticks, theta in raw heading units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pose {
    pub x: i32,
    pub y: i32,
    pub theta: i32,
}

/// Intermediate values of one integration cycle, kept for diagnostics and
/// for observing sub-demotion motion the accumulators cannot show yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OdometryCycle {
    /// Per-wheel velocity, ticks per millisecond
    pub v_left: i32,
    pub v_right: i32,
    /// Mean forward velocity
    pub v_bar: i32,
    /// Forward displacement this cycle, local frame
    pub dy_local: Q2,
    /// Heading change this cycle
    pub theta_delta: Q2,
}

pub struct PoseEstimator {
    period_ms: i32,
    wheelbase: Q2,
    pose: Pose,
}

impl PoseEstimator {
    /// `wheelbase_ticks` is the wheel separation expressed in encoder
    /// ticks, so the heading math stays in tick units throughout.
    pub fn new(period_ms: i32, wheelbase_ticks: i32) -> Self {
        Self {
            period_ms: period_ms.max(1),
            wheelbase: Q2::promote(wheelbase_ticks.max(1)),
            pose: Pose::default(),
        }
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Fold one cycle of tick deltas (left already forward-positive) into
    /// the pose. Returns the cycle intermediates.
    pub fn update(&mut self, delta_left: i16, delta_right: i16) -> OdometryCycle {
        let period = Q2::promote(self.period_ms);

        let v_left = Q2::promote(delta_left as i32).div(period);
        let v_right = Q2::promote(delta_right as i32).div(period);

        // The velocity sum is divided by a promoted 2: half for the mean,
        // and the demotion folded into the same truncating division so no
        // intermediate rounds twice
        let v_bar = Q2::from_raw(v_left + v_right).div(Q2::promote(2));
        let dy_local = Q2::from_raw(v_bar * period.raw());

        let theta_delta =
            Q2::from_raw((v_right - v_left) * period.raw() / self.wheelbase.raw());
        self.pose.theta += theta_delta.demote();

        // Rotate the local forward displacement into the inertial frame;
        // the trig runs in f32 and the result truncates back to the integer
        // accumulators
        let heading = self.pose.theta as f32;
        let dx = (dy_local.raw() as f32 * heading.cos()) as i32;
        let dy = (dy_local.raw() as f32 * heading.sin()) as i32;
        self.pose.x += Q2::from_raw(dx).demote();
        self.pose.y += Q2::from_raw(dy).demote();

        OdometryCycle {
            v_left,
            v_right,
            v_bar,
            dy_local,
            theta_delta,
        }
    }
}
