//! BNO080 IMU driver (SHTP over the two-wire bus)
//!
//! Straight polled driver: the task layer calls [`Bno080::data_available`]
//! on its period and reads the latest decoded sample off the driver. There
//! is no interrupt line and no retry logic here; a bus fault aborts the
//! exchange and the caller simply gets nothing that cycle.

pub mod reports;
pub mod shtp;

use crate::bus::{BusMaster, BusPhy};
use crate::error::{Error, Result};

use reports::{
    parse_command_response, parse_input_report, RotationVector, COMMAND_ME_CALIBRATE,
    GAME_ROTATION_VECTOR, PRODUCT_ID_REQUEST, PRODUCT_ID_RESPONSE, ROTATION_VECTOR,
};
use shtp::{Channel, SequenceNumbers, SequencePolicy, ShtpHeader, HEADER_LEN, MAX_PAYLOAD};

/// Post-reset settle time; the part boots its sensor hub firmware
const RESET_SETTLE_MS: u64 = 50;
/// Cap on the post-reset flush, bytes
const FLUSH_MAX_BYTES: usize = 0xFFF;
/// Polls waiting for the product-ID response during startup
const BEGIN_ATTEMPTS: usize = 64;

/// One received SHTP packet, payload truncated to [`MAX_PAYLOAD`]
pub struct Packet {
    pub header: ShtpHeader,
    payload: [u8; MAX_PAYLOAD],
    len: usize,
}

impl Packet {
    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.len]
    }

    pub fn channel(&self) -> Option<Channel> {
        Channel::from_raw(self.header.channel)
    }
}

pub struct Bno080<P: BusPhy> {
    bus: BusMaster<P>,
    address: u8,
    sequences: SequenceNumbers,
    rotation: Option<RotationVector>,
    calibration_status: Option<u8>,
}

impl<P: BusPhy> Bno080<P> {
    pub fn new(bus: BusMaster<P>, address: u8, policy: SequencePolicy) -> Self {
        Self {
            bus,
            address,
            sequences: SequenceNumbers::new(policy),
            rotation: None,
            calibration_status: None,
        }
    }

    /// Reset the sensor and confirm it answers the product-ID request.
    pub fn begin(&mut self) -> Result<()> {
        self.soft_reset()?;
        self.send_packet(Channel::Control, &[PRODUCT_ID_REQUEST, 0])?;

        for _ in 0..BEGIN_ATTEMPTS {
            if let Some(packet) = self.receive_packet()? {
                if packet.channel() == Some(Channel::Control)
                    && packet.payload().first() == Some(&PRODUCT_ID_RESPONSE)
                {
                    log::info!("bno080 at 0x{:02X} answered product-id", self.address);
                    return Ok(());
                }
                // Startup adverts and resets arrive first; keep draining
                continue;
            }
            self.bus.phy_mut().delay_ms(1);
        }
        Err(Error::InitializationFailed(format!(
            "bno080 at 0x{:02X}: no product-id response",
            self.address
        )))
    }

    /// Reset the sensor hub and flush everything it queues on wake.
    ///
    /// The flush runs twice with a settle delay in between; the part
    /// streams a burst of advertisement data after reset and reading it
    /// out in one pass has been unreliable.
    pub fn soft_reset(&mut self) -> Result<()> {
        self.send_packet(Channel::Executable, &[1])?;
        self.bus.phy_mut().delay_ms(RESET_SETTLE_MS);
        self.bus.read_discard(self.address, FLUSH_MAX_BYTES)?;
        self.bus.phy_mut().delay_ms(RESET_SETTLE_MS);
        self.bus.read_discard(self.address, FLUSH_MAX_BYTES)?;
        Ok(())
    }

    /// Start the fused rotation vector streaming at `interval_ms`
    pub fn enable_rotation_vector(&mut self, interval_ms: u32) -> Result<()> {
        self.set_feature(ROTATION_VECTOR, interval_ms * 1000)
    }

    /// Start the game rotation vector (no magnetometer) streaming
    pub fn enable_game_rotation_vector(&mut self, interval_ms: u32) -> Result<()> {
        self.set_feature(GAME_ROTATION_VECTOR, interval_ms * 1000)
    }

    fn set_feature(&mut self, report_id: u8, interval_us: u32) -> Result<()> {
        let cmd = reports::build_set_feature(report_id, interval_us);
        self.send_packet(Channel::Control, &cmd)
    }

    /// Poll for one packet and fold it into the driver state. `Ok(true)`
    /// means a new sensor sample landed; `Ok(false)` covers both an idle
    /// sensor and non-sensor traffic.
    pub fn data_available(&mut self) -> Result<bool> {
        match self.receive_packet()? {
            None => Ok(false),
            Some(packet) => Ok(self.dispatch(&packet)),
        }
    }

    /// Access the underlying bus (sim and test plumbing)
    pub fn bus_mut(&mut self) -> &mut BusMaster<P> {
        &mut self.bus
    }

    /// Latest decoded rotation sample, if any has arrived
    pub fn rotation(&self) -> Option<RotationVector> {
        self.rotation
    }

    /// Last ME-calibrate response status (0 = accepted)
    pub fn calibration_status(&self) -> Option<u8> {
        self.calibration_status
    }

    fn dispatch(&mut self, packet: &Packet) -> bool {
        match packet.channel() {
            Some(Channel::Reports) => {
                let Some(report) = parse_input_report(packet.payload()) else {
                    return false;
                };
                match report.report_id {
                    ROTATION_VECTOR | GAME_ROTATION_VECTOR => {
                        self.rotation = Some(RotationVector::from_report(&report));
                        true
                    }
                    other => {
                        log::trace!("ignoring input report 0x{:02X}", other);
                        false
                    }
                }
            }
            Some(Channel::Control) => {
                if let Some(resp) = parse_command_response(packet.payload()) {
                    if resp.command == COMMAND_ME_CALIBRATE {
                        self.calibration_status = Some(resp.status);
                    }
                }
                false
            }
            _ => false,
        }
    }

    fn send_packet(&mut self, channel: Channel, payload: &[u8]) -> Result<()> {
        let seq = self.sequences.next(channel);
        let header = ShtpHeader::encode(channel, seq, payload.len());
        self.bus.write(self.address, &header, payload)?;
        Ok(())
    }

    /// Read one packet. The sensor answers an empty poll with a zero-length
    /// header, which comes back as `Ok(None)`.
    ///
    /// The header read and the body read are separate transactions; the
    /// sensor resends the header at the start of the body, so the body read
    /// is split across a scratch header and the payload buffer. A body
    /// longer than [`MAX_PAYLOAD`] is truncated to fit.
    pub fn receive_packet(&mut self) -> Result<Option<Packet>> {
        let mut header_bytes = [0u8; HEADER_LEN];
        self.bus.read(self.address, &mut header_bytes)?;
        let header = ShtpHeader::parse(&header_bytes);
        if header.is_empty() {
            return Ok(None);
        }

        let len = header.payload_len().min(MAX_PAYLOAD);
        let mut packet = Packet {
            header,
            payload: [0; MAX_PAYLOAD],
            len,
        };
        let mut resent = [0u8; HEADER_LEN];
        self.bus
            .read_split(self.address, &mut resent, &mut packet.payload[..len])?;
        Ok(Some(packet))
    }
}
