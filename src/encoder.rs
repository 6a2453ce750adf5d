//! Quadrature encoder sampling
//!
//! Encoders are free-running 16-bit up/down counters; all that matters per
//! cycle is the wrapped difference since the previous sample. The left
//! encoder counts down when the robot drives forward (wiring convention),
//! so its reading is negated at the sample point and everything downstream
//! sees forward-positive ticks on both sides.

/// Hardware tick counter for one wheel
pub trait WheelEncoder: Send {
    /// Current raw counter value; wraps freely
    fn read_ticks(&mut self) -> u16;
}

/// Both wheel encoders plus the previous samples the deltas are taken from
pub struct EncoderPair<L, R> {
    left: L,
    right: R,
    prev_left: u16,
    prev_right: u16,
}

impl<L: WheelEncoder, R: WheelEncoder> EncoderPair<L, R> {
    /// Primes the previous samples so the first delta is zero
    pub fn new(mut left: L, mut right: R) -> Self {
        let prev_left = 0u16.wrapping_sub(left.read_ticks());
        let prev_right = right.read_ticks();
        Self {
            left,
            right,
            prev_left,
            prev_right,
        }
    }

    /// Per-cycle tick deltas (left, right), forward-positive on both sides.
    /// Wrapping 16-bit subtraction keeps deltas correct across counter
    /// rollover as long as a wheel moves less than half the counter range
    /// per cycle.
    pub fn sample(&mut self) -> (i16, i16) {
        let now_left = 0u16.wrapping_sub(self.left.read_ticks());
        let now_right = self.right.read_ticks();
        let delta_left = now_left.wrapping_sub(self.prev_left) as i16;
        let delta_right = now_right.wrapping_sub(self.prev_right) as i16;
        self.prev_left = now_left;
        self.prev_right = now_right;
        (delta_left, delta_right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Serves a scripted sequence of raw counter values
    struct ScriptedEncoder {
        values: Vec<u16>,
        at: usize,
    }

    impl ScriptedEncoder {
        fn new(values: &[u16]) -> Self {
            Self {
                values: values.to_vec(),
                at: 0,
            }
        }
    }

    impl WheelEncoder for ScriptedEncoder {
        fn read_ticks(&mut self) -> u16 {
            let v = self.values[self.at.min(self.values.len() - 1)];
            self.at += 1;
            v
        }
    }

    #[test]
    fn first_sample_after_priming_is_the_motion_since_construction() {
        let left = ScriptedEncoder::new(&[1000, 1000]);
        let right = ScriptedEncoder::new(&[500, 520]);
        let mut pair = EncoderPair::new(left, right);
        assert_eq!(pair.sample(), (0, 20));
    }

    #[test]
    fn left_reading_is_negated() {
        // Left counter counting DOWN is forward motion
        let left = ScriptedEncoder::new(&[1000, 970]);
        let right = ScriptedEncoder::new(&[0, 0]);
        let mut pair = EncoderPair::new(left, right);
        assert_eq!(pair.sample(), (30, 0));
    }

    #[test]
    fn delta_survives_counter_rollover() {
        let left = ScriptedEncoder::new(&[10, 0xFFF6]); // left counts down through 0
        let right = ScriptedEncoder::new(&[0xFFF0, 0x000A]);
        let mut pair = EncoderPair::new(left, right);
        assert_eq!(pair.sample(), (20, 26));
    }

    #[test]
    fn reverse_motion_gives_negative_deltas() {
        let left = ScriptedEncoder::new(&[100, 140]); // left counting up is reverse
        let right = ScriptedEncoder::new(&[100, 60]);
        let mut pair = EncoderPair::new(left, right);
        assert_eq!(pair.sample(), (-40, -40));
    }
}
