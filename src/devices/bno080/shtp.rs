//! SHTP framing
//!
//! Every exchange with the BNO080 is an SHTP packet: a 4-byte header
//! {length LSB, length MSB, channel, sequence} followed by the payload.
//! The length covers the header itself and carries a continuation flag in
//! bit 15, which this driver masks off and otherwise ignores (reports that
//! matter here fit in one packet). A header with length 0 means the sensor
//! has nothing to say, which is a normal outcome of a poll, not a fault.

use crate::error::{Error, Result};

pub const HEADER_LEN: usize = 4;

/// Largest payload this driver will accept in one packet. Anything longer
/// is truncated to fit; the rotation reports used here are under 32 bytes.
pub const MAX_PAYLOAD: usize = 128;

/// SHTP virtual channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Channel {
    Command = 0,
    Executable = 1,
    Control = 2,
    Reports = 3,
    WakeReports = 4,
    Gyro = 5,
}

pub const CHANNEL_COUNT: usize = 6;

impl Channel {
    pub fn from_raw(raw: u8) -> Option<Channel> {
        match raw {
            0 => Some(Channel::Command),
            1 => Some(Channel::Executable),
            2 => Some(Channel::Control),
            3 => Some(Channel::Reports),
            4 => Some(Channel::WakeReports),
            5 => Some(Channel::Gyro),
            _ => None,
        }
    }

    pub fn raw(self) -> u8 {
        self as u8
    }
}

/// Decoded packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShtpHeader {
    /// Total packet length including the header, continuation bit cleared
    pub length: u16,
    pub channel: u8,
    pub sequence: u8,
}

impl ShtpHeader {
    pub fn parse(bytes: &[u8; HEADER_LEN]) -> ShtpHeader {
        let raw = u16::from_le_bytes([bytes[0], bytes[1]]);
        ShtpHeader {
            length: raw & 0x7FFF,
            channel: bytes[2],
            sequence: bytes[3],
        }
    }

    /// The sensor sends an all-zero header when it has no queued data
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn payload_len(&self) -> usize {
        (self.length as usize).saturating_sub(HEADER_LEN)
    }

    pub fn encode(channel: Channel, sequence: u8, payload_len: usize) -> [u8; HEADER_LEN] {
        let total = (payload_len + HEADER_LEN) as u16;
        let [lsb, msb] = total.to_le_bytes();
        [lsb, msb, channel.raw(), sequence]
    }
}

/// Outgoing sequence-number policy.
///
/// The SHTP datasheet calls for a per-channel counter, but the fielded firmware
/// this driver descends from sent a constant 0 on every packet and the
/// sensor accepted it. `Fixed(0)` is therefore the default; `PerChannel`
/// is available for parts that turn out to care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencePolicy {
    Fixed(u8),
    PerChannel,
}

impl Default for SequencePolicy {
    fn default() -> Self {
        SequencePolicy::Fixed(0)
    }
}

pub struct SequenceNumbers {
    policy: SequencePolicy,
    counters: [u8; CHANNEL_COUNT],
}

impl SequenceNumbers {
    pub fn new(policy: SequencePolicy) -> Self {
        Self {
            policy,
            counters: [0; CHANNEL_COUNT],
        }
    }

    /// Sequence number for the next outgoing packet on `channel`
    pub fn next(&mut self, channel: Channel) -> u8 {
        match self.policy {
            SequencePolicy::Fixed(n) => n,
            SequencePolicy::PerChannel => {
                let slot = &mut self.counters[channel.raw() as usize];
                let seq = *slot;
                *slot = slot.wrapping_add(1);
                seq
            }
        }
    }
}

impl std::str::FromStr for SequencePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fixed" => Ok(SequencePolicy::Fixed(0)),
            "per-channel" => Ok(SequencePolicy::PerChannel),
            other => Err(Error::InvalidParameter(format!(
                "unknown sequence numbering policy '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_masks_continuation_bit() {
        let header = ShtpHeader::parse(&[0x15, 0x80, 3, 7]);
        assert_eq!(header.length, 0x15);
        assert_eq!(header.channel, 3);
        assert_eq!(header.sequence, 7);
        assert_eq!(header.payload_len(), 0x15 - 4);
    }

    #[test]
    fn zero_length_header_is_empty() {
        let header = ShtpHeader::parse(&[0, 0, 0, 0]);
        assert!(header.is_empty());
        assert_eq!(header.payload_len(), 0);
    }

    #[test]
    fn encode_counts_the_header_in_the_length() {
        let bytes = ShtpHeader::encode(Channel::Control, 0, 2);
        assert_eq!(bytes, [6, 0, 2, 0]);
    }

    #[test]
    fn fixed_policy_never_advances() {
        let mut seq = SequenceNumbers::new(SequencePolicy::Fixed(0));
        assert_eq!(seq.next(Channel::Control), 0);
        assert_eq!(seq.next(Channel::Control), 0);
        assert_eq!(seq.next(Channel::Executable), 0);
    }

    #[test]
    fn per_channel_policy_counts_independently() {
        let mut seq = SequenceNumbers::new(SequencePolicy::PerChannel);
        assert_eq!(seq.next(Channel::Control), 0);
        assert_eq!(seq.next(Channel::Control), 1);
        assert_eq!(seq.next(Channel::Reports), 0);
        assert_eq!(seq.next(Channel::Control), 2);
    }

    #[test]
    fn per_channel_policy_wraps() {
        let mut seq = SequenceNumbers::new(SequencePolicy::PerChannel);
        for _ in 0..=u8::MAX {
            seq.next(Channel::Gyro);
        }
        assert_eq!(seq.next(Channel::Gyro), 0);
    }

    #[test]
    fn policy_parses_from_config_strings() {
        assert_eq!(
            "fixed".parse::<SequencePolicy>().unwrap(),
            SequencePolicy::Fixed(0)
        );
        assert_eq!(
            "per-channel".parse::<SequencePolicy>().unwrap(),
            SequencePolicy::PerChannel
        );
        assert!("random".parse::<SequencePolicy>().is_err());
    }
}
