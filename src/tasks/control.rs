//! Control loop task
//!
//! The hot path of the firmware: every cycle it samples both encoders,
//! folds the deltas into the pose estimate, recomputes the waypoint errors,
//! runs both wheel controllers and puts the result on the bridges. Pose and
//! diagnostics are published at the end of the cycle so readers only ever
//! see completed updates.
//!
//! The controllers run PI with brake-mode drive; the derivative terms stay
//! disabled (see `motor::controller`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Sender;

use crate::config::{AppConfig, ControllerConfig};
use crate::encoder::{EncoderPair, WheelEncoder};
use crate::error::Result;
use crate::motor::{Diagnostic, DriveMode, PwmPair, WheelController};
use crate::odometry::{Pose, PoseEstimator};
use crate::state::{SharedState, Waypoint};
use crate::tasks::Periodic;

/// Per-cycle output published to the diagnostics task
#[derive(Debug, Clone, Copy)]
pub struct CycleDiagnostics {
    pub cycle: u64,
    pub pose: Pose,
    pub left: Diagnostic,
    pub right: Diagnostic,
}

pub struct ControlTask<L, R, PL, PR>
where
    L: WheelEncoder,
    R: WheelEncoder,
    PL: PwmPair,
    PR: PwmPair,
{
    encoders: EncoderPair<L, R>,
    left: WheelController<PL>,
    right: WheelController<PR>,
    estimator: PoseEstimator,
    state: SharedState,
    diag_tx: Sender<CycleDiagnostics>,
    period: Duration,
    cycles: u64,
}

impl<L, R, PL, PR> ControlTask<L, R, PL, PR>
where
    L: WheelEncoder + 'static,
    R: WheelEncoder + 'static,
    PL: PwmPair + 'static,
    PR: PwmPair + 'static,
{
    pub fn new(
        config: &AppConfig,
        encoders: EncoderPair<L, R>,
        mut left: WheelController<PL>,
        mut right: WheelController<PR>,
        state: SharedState,
        diag_tx: Sender<CycleDiagnostics>,
    ) -> Self {
        configure_controller(&mut left, &config.controller);
        configure_controller(&mut right, &config.controller);
        Self {
            encoders,
            left,
            right,
            estimator: PoseEstimator::new(
                config.robot.control_period_ms as i32,
                config.robot.wheelbase_ticks,
            ),
            state,
            diag_tx,
            period: Duration::from_millis(config.robot.control_period_ms),
            cycles: 0,
        }
    }

    /// One full control cycle
    pub fn cycle(&mut self) {
        let (delta_left, delta_right) = self.encoders.sample();
        self.estimator.update(delta_left, delta_right);
        let pose = self.estimator.pose();
        self.state.set_pose(pose);

        let target = self.state.snapshot().target;
        let (distance, angle_goal) = waypoint_errors(pose, target);

        // Position is held at zero: the linear "error" is the signed
        // distance itself, recomputed fresh each cycle
        self.left.set_feedback(0, pose.theta);
        self.right.set_feedback(0, pose.theta);
        self.left.set_setpoints(distance, angle_goal);
        self.right.set_setpoints(distance, angle_goal);

        let diag_left = self.left.run(true, true, false, DriveMode::Brake);
        let diag_right = self.right.run(true, true, false, DriveMode::Brake);

        self.cycles += 1;
        self.state.set_diagnostics(diag_left, diag_right, self.cycles);
        // Diagnostics are advisory; a full channel just drops the sample
        let _ = self.diag_tx.try_send(CycleDiagnostics {
            cycle: self.cycles,
            pose,
            left: diag_left,
            right: diag_right,
        });
    }

    fn run(mut self, shutdown: Arc<AtomicBool>) {
        log::debug!("control loop started, period {:?}", self.period);
        let mut tick = Periodic::new(self.period);
        while !shutdown.load(Ordering::Relaxed) {
            self.cycle();
            tick.wait();
        }
        // Leave the bridges released, not braking
        self.left.pwm_mut().set_duty(0, 0);
        self.right.pwm_mut().set_duty(0, 0);
        log::debug!("control loop exiting after {} cycles", self.cycles);
    }

    pub fn spawn(self, shutdown: Arc<AtomicBool>) -> Result<JoinHandle<()>> {
        let handle = std::thread::Builder::new()
            .name("control-loop".to_string())
            .spawn(move || self.run(shutdown))?;
        Ok(handle)
    }
}

/// Apply the configured gains and limits. `set_pwm_lim` must run before
/// `set_pwm_lim_linear`: the linear limit clamps against the total limit
/// in force at set time.
fn configure_controller<P: PwmPair>(c: &mut WheelController<P>, cfg: &ControllerConfig) {
    c.set_pwm_scale(cfg.pwm_scale);
    c.set_gains_linear(cfg.kp_l, cfg.ki_l, cfg.kd_l);
    c.set_gains_angular(cfg.kp_a, cfg.ki_a, cfg.kd_a);
    c.set_pwm_lim(cfg.pwm_lim);
    c.set_pwm_lim_linear(cfg.pwm_lim_linear);
    c.set_esum_l_lim(cfg.esum_l_lim);
    c.set_esum_a_lim(cfg.esum_a_lim);
}

/// Waypoint errors from the current pose: signed straight-line distance
/// (negative once the target falls behind on the X axis, so the robot backs
/// up instead of circling) and the bearing to the target. The bearing
/// truncates to whole heading units, same as the heading accumulator.
fn waypoint_errors(pose: Pose, target: Waypoint) -> (i32, i32) {
    let dx = (target.x - pose.x) as f32;
    let dy = (target.y - pose.y) as f32;
    let mut distance = (dx * dx + dy * dy).sqrt() as i32;
    if target.x - pose.x <= 0 {
        distance = -distance;
    }
    let angle_goal = dy.atan2(dx) as i32;
    (distance, angle_goal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::WheelSide;
    use crate::sim::robot::SimWheel;
    use crate::state::SharedState;

    fn task_with_sim(
        config: &AppConfig,
        max_ticks_per_sec: f32,
    ) -> (
        ControlTask<
            crate::sim::robot::SimEncoder,
            crate::sim::robot::SimEncoder,
            crate::sim::robot::SimPwm,
            crate::sim::robot::SimPwm,
        >,
        crossbeam_channel::Receiver<CycleDiagnostics>,
    ) {
        let left_wheel = SimWheel::new(max_ticks_per_sec);
        let right_wheel = SimWheel::new(max_ticks_per_sec);
        let encoders = EncoderPair::new(left_wheel.encoder(), right_wheel.encoder());
        let left = WheelController::new(left_wheel.pwm(), WheelSide::Left);
        let right = WheelController::new(right_wheel.pwm(), WheelSide::Right);
        let (tx, rx) = crossbeam_channel::bounded(64);
        let state = SharedState::new();
        let task = ControlTask::new(config, encoders, left, right, state, tx);
        (task, rx)
    }

    #[test]
    fn waypoint_distance_is_signed_on_the_x_axis() {
        let pose = Pose { x: 100, y: 0, theta: 0 };
        let (ahead, _) = waypoint_errors(pose, Waypoint { x: 400, y: 0 });
        let (behind, _) = waypoint_errors(pose, Waypoint { x: 0, y: 0 });
        assert_eq!(ahead, 300);
        assert_eq!(behind, -100);
    }

    #[test]
    fn bearing_truncates_to_heading_units() {
        let pose = Pose::default();
        let (_, straight) = waypoint_errors(pose, Waypoint { x: 100, y: 0 });
        let (_, diagonal) = waypoint_errors(pose, Waypoint { x: 100, y: 100 });
        let (_, rear) = waypoint_errors(pose, Waypoint { x: -100, y: 1 });
        assert_eq!(straight, 0);
        assert_eq!(diagonal, 0); // atan2 = 0.78 truncates
        assert_eq!(rear, 3); // atan2 = 3.13 truncates
    }

    #[test]
    fn idle_cycles_publish_a_static_pose() {
        let config = AppConfig::defaults();
        let (mut task, rx) = task_with_sim(&config, 4000.0);
        task.cycle();
        task.cycle();
        let d = rx.try_iter().last().unwrap();
        assert_eq!(d.cycle, 2);
        assert_eq!(d.pose, Pose::default());
        assert_eq!(d.left.pwm_total, 0);
    }

    #[test]
    fn drives_toward_a_forward_waypoint() {
        let config = AppConfig::defaults();
        // High tick rate so per-cycle deltas survive the truncating
        // velocity math at 10 ms periods
        let (mut task, _rx) = task_with_sim(&config, 20_000.0);
        task.state.set_target(Waypoint { x: 400, y: 0 });

        for _ in 0..100 {
            task.cycle();
            std::thread::sleep(Duration::from_millis(10));
        }

        let pose = task.state.snapshot().pose;
        assert!(
            pose.x > 300,
            "expected convergence toward x=400, got {:?}",
            pose
        );
        assert!(pose.y.abs() < 60, "drifted sideways: {:?}", pose);
    }

    #[test]
    fn holds_position_once_the_target_is_reached() {
        let config = AppConfig::defaults();
        let (mut task, _rx) = task_with_sim(&config, 20_000.0);
        // Target is where we already are: zero distance, zero command
        task.state.set_target(Waypoint { x: 0, y: 0 });
        for _ in 0..5 {
            task.cycle();
        }
        let snap = task.state.snapshot();
        // Distance error is <= 0 at the target, so the command can only
        // push backward; with zero error it must be zero
        assert_eq!(snap.diag_left.pwm_linear, 0);
        assert_eq!(snap.diag_right.pwm_linear, 0);
    }
}
