//! PWM actuation
//!
//! Each motor sits on an H-bridge with two inputs. [`PwmPair`] is the
//! hardware seam; [`drive`] translates a signed duty command into the two
//! channel duties for the selected decay mode.

/// H-bridge drive mode.
///
/// Brake holds the off-side input high and modulates the other low (fast
/// current decay, firmer response); coast modulates the on-side input and
/// leaves the other low (slow decay, lower power).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveMode {
    Coast,
    Brake,
}

/// Two-channel PWM output for one motor
pub trait PwmPair: Send {
    /// Set both bridge input duties, percent 0..=100
    fn set_duty(&mut self, in1: u8, in2: u8);
}

/// Apply a signed duty command (already clamped to ±100) to the bridge.
///
/// Zero lands on the non-positive side: full brake in brake mode, both
/// inputs low in coast mode.
pub fn drive<P: PwmPair>(pwm: &mut P, command: i32, mode: DriveMode) {
    let mag = command.unsigned_abs().min(100) as u8;
    match mode {
        DriveMode::Brake => {
            if command > 0 {
                pwm.set_duty(100, 100 - mag);
            } else {
                pwm.set_duty(100 - mag, 100);
            }
        }
        DriveMode::Coast => {
            if command > 0 {
                pwm.set_duty(mag, 0);
            } else {
                pwm.set_duty(0, mag);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::PwmPair;

    /// Records the last duty pair it was given
    #[derive(Default)]
    pub struct RecordingPwm {
        pub last: Option<(u8, u8)>,
    }

    impl PwmPair for RecordingPwm {
        fn set_duty(&mut self, in1: u8, in2: u8) {
            self.last = Some((in1, in2));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::RecordingPwm;
    use super::*;

    #[test]
    fn brake_holds_the_commanded_side_high() {
        let mut pwm = RecordingPwm::default();
        drive(&mut pwm, 30, DriveMode::Brake);
        assert_eq!(pwm.last, Some((100, 70)));
        drive(&mut pwm, -30, DriveMode::Brake);
        assert_eq!(pwm.last, Some((70, 100)));
    }

    #[test]
    fn coast_modulates_the_commanded_side() {
        let mut pwm = RecordingPwm::default();
        drive(&mut pwm, 45, DriveMode::Coast);
        assert_eq!(pwm.last, Some((45, 0)));
        drive(&mut pwm, -45, DriveMode::Coast);
        assert_eq!(pwm.last, Some((0, 45)));
    }

    #[test]
    fn zero_command_brakes_or_freewheels() {
        let mut pwm = RecordingPwm::default();
        drive(&mut pwm, 0, DriveMode::Brake);
        assert_eq!(pwm.last, Some((100, 100)));
        drive(&mut pwm, 0, DriveMode::Coast);
        assert_eq!(pwm.last, Some((0, 0)));
    }
}
