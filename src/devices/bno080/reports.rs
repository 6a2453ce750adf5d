//! SHTP report payloads
//!
//! Parsing for the two payload families this driver consumes: sensor input
//! reports on the reports channel (a base-timestamp marker, then the sensor
//! record with up to five 16-bit little-endian data words at fixed offsets)
//! and command responses on the control channel. Sensor values are
//! fixed-point; the rotation quaternion uses Q14 (raw × 2^-14).

// Report IDs
pub const PRODUCT_ID_REQUEST: u8 = 0xF9;
pub const PRODUCT_ID_RESPONSE: u8 = 0xF8;
pub const BASE_TIMESTAMP: u8 = 0xFB;
pub const SET_FEATURE_COMMAND: u8 = 0xFD;
pub const COMMAND_RESPONSE: u8 = 0xF1;
pub const ROTATION_VECTOR: u8 = 0x05;
pub const GAME_ROTATION_VECTOR: u8 = 0x08;

// Command IDs carried inside command responses
pub const COMMAND_ME_CALIBRATE: u8 = 0x07;

const TIMESTAMP_LEN: usize = 5;

/// Convert a Q14 fixed-point raw value to float
pub fn q14(raw: i16) -> f32 {
    f32::from(raw) * (1.0 / 16384.0)
}

/// One decoded sensor input report.
///
/// `data` always has five slots; fields the report was too short to carry
/// are left at zero, mirroring how the sensor zero-pads unused words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputReport {
    pub report_id: u8,
    pub sequence: u8,
    /// Accuracy estimate, low two status bits (0 unreliable .. 3 high)
    pub status: u8,
    /// Microseconds between the batch timebase and this sample
    pub timestamp_delta_us: u32,
    pub data: [i16; 5],
}

/// Parse a reports-channel payload: base-timestamp record, then the sensor
/// record at a fixed offset. Returns `None` for payloads that are not input
/// reports or are too short to hold one.
pub fn parse_input_report(payload: &[u8]) -> Option<InputReport> {
    if payload.len() < TIMESTAMP_LEN + 10 || payload[0] != BASE_TIMESTAMP {
        return None;
    }
    let timestamp_delta_us =
        u32::from_le_bytes([payload[1], payload[2], payload[3], payload[4]]);

    let body = &payload[TIMESTAMP_LEN..];
    let mut data = [0i16; 5];
    data[0] = word_at(body, 4);
    data[1] = word_at(body, 6);
    data[2] = word_at(body, 8);
    // Short reports carry three words; the wider ones add a fourth and fifth
    if body.len() > 9 {
        data[3] = word_at(body, 10);
    }
    if body.len() > 11 {
        data[4] = word_at(body, 12);
    }

    Some(InputReport {
        report_id: body[0],
        sequence: body[1],
        status: body[2] & 0x03,
        timestamp_delta_us,
        data,
    })
}

fn word_at(body: &[u8], offset: usize) -> i16 {
    match (body.get(offset), body.get(offset + 1)) {
        (Some(&lo), Some(&hi)) => i16::from_le_bytes([lo, hi]),
        _ => 0,
    }
}

/// Unit quaternion in floating point, decoded from Q14 raw words
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Quaternion {
    pub i: f32,
    pub j: f32,
    pub k: f32,
    pub real: f32,
}

/// Rotation-vector (or game-rotation-vector) sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationVector {
    pub quat: Quaternion,
    /// Accuracy estimate from the report status bits
    pub status: u8,
    /// Heading accuracy estimate, Q14 raw radians (zero for the game
    /// rotation vector, which does not report one)
    pub accuracy_raw: i16,
}

impl RotationVector {
    pub fn from_report(report: &InputReport) -> RotationVector {
        RotationVector {
            quat: Quaternion {
                i: q14(report.data[0]),
                j: q14(report.data[1]),
                k: q14(report.data[2]),
                real: q14(report.data[3]),
            },
            status: report.status,
            accuracy_raw: report.data[4],
        }
    }
}

/// Command response on the control channel. Only the first response byte is
/// kept; for the ME-calibrate command it is the status (0 = accepted).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandResponse {
    pub command: u8,
    pub status: u8,
}

pub fn parse_command_response(payload: &[u8]) -> Option<CommandResponse> {
    if payload.len() < 6 || payload[0] != COMMAND_RESPONSE {
        return None;
    }
    Some(CommandResponse {
        command: payload[2],
        status: payload[5],
    })
}

/// Build the 17-byte set-feature command that starts a sensor streaming at
/// the given report interval.
pub fn build_set_feature(report_id: u8, interval_us: u32) -> [u8; 17] {
    let mut cmd = [0u8; 17];
    cmd[0] = SET_FEATURE_COMMAND;
    cmd[1] = report_id;
    // [2] feature flags, [3..5] change sensitivity: unused
    cmd[5..9].copy_from_slice(&interval_us.to_le_bytes());
    // [9..13] batch interval, [13..17] sensor-specific config: unused
    cmd
}
