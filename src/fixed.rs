//! Q2 fixed-point arithmetic for the odometry pipeline
//!
//! The estimator runs the tick-to-pose math with two extra fractional bits so
//! the intermediate truncating divisions do not throw away sub-tick
//! resolution. [`Q2`] makes those promote/demote points explicit instead of
//! scattering raw `<< 2` / `>> 2` shifts through the math.
//!
//! Division stays truncating-toward-zero integer division; the controller and
//! estimator clamp thresholds are tuned against that behavior, so floating
//! point is deliberately not used here.

/// Fixed-point value with [`Q2::FRAC_BITS`] fractional bits in an `i32`
/// mantissa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Q2(i32);

impl Q2 {
    /// Number of fractional bits
    pub const FRAC_BITS: u32 = 2;

    /// One integer unit expressed in raw mantissa counts
    pub const SCALE: i32 = 1 << Self::FRAC_BITS;

    /// Promote an integer to Q2 (exact)
    #[inline]
    pub const fn promote(v: i32) -> Self {
        Q2(v << Self::FRAC_BITS)
    }

    /// Wrap an already-scaled mantissa
    #[inline]
    pub const fn from_raw(raw: i32) -> Self {
        Q2(raw)
    }

    /// Raw mantissa (integer value times [`Q2::SCALE`])
    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Demote back to an integer, discarding the fractional bits
    ///
    /// Arithmetic right shift, matching the sign-preserving demotion the
    /// estimator accumulators rely on.
    #[inline]
    pub const fn demote(self) -> i32 {
        self.0 >> Self::FRAC_BITS
    }

    /// Truncating division of one Q2 value by another, yielding a plain
    /// integer ratio (the scales cancel)
    #[inline]
    pub const fn div(self, rhs: Q2) -> i32 {
        self.0 / rhs.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promote_demote_round_trip() {
        for v in [-1000, -3, -1, 0, 1, 7, 1234] {
            assert_eq!(Q2::promote(v).demote(), v);
        }
    }

    #[test]
    fn division_truncates_toward_zero() {
        // 7/2 and -7/2 must truncate, not floor
        assert_eq!(Q2::promote(7).div(Q2::promote(2)), 3);
        assert_eq!(Q2::promote(-7).div(Q2::promote(2)), -3);
    }

    #[test]
    fn demote_is_arithmetic_shift() {
        // -1 raw stays -1 after demotion (sign-preserving), unlike a
        // truncating divide which would give 0
        assert_eq!(Q2::from_raw(-1).demote(), -1);
        assert_eq!(Q2::from_raw(-4).demote(), -1);
        assert_eq!(Q2::from_raw(5).demote(), 1);
    }

    #[test]
    fn scale_matches_frac_bits() {
        assert_eq!(Q2::SCALE, 4);
        assert_eq!(Q2::promote(3).raw(), 12);
    }
}
