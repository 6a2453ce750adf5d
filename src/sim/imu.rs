//! Scripted BNO080 peripheral
//!
//! Implements [`BusPhy`] from the peripheral's point of view: it decodes
//! frames the driver writes, queues the frames a real part would answer
//! with, and serves them back byte by byte. Behavior mirrored from the
//! hardware: an idle part answers a poll with a zero header, the frame
//! header is re-served at the start of the body read, and a frame stays
//! queued until its body has actually been read out.

use std::collections::VecDeque;

use crate::bus::phy::{BusPhy, PhyStatus};
use crate::devices::bno080::reports::{
    BASE_TIMESTAMP, PRODUCT_ID_REQUEST, PRODUCT_ID_RESPONSE, SET_FEATURE_COMMAND,
};
use crate::devices::bno080::shtp::{Channel, HEADER_LEN};

pub struct ImuSim {
    outbox: VecDeque<Vec<u8>>,
    /// Frame currently being served, empty when the part has nothing queued
    current: Vec<u8>,
    cursor: usize,
    rx: Vec<u8>,
    last_write: Vec<u8>,
    /// Report ID enabled by the last set-feature command
    streaming: Option<u8>,
    /// Raw Q14 quaternion {i, j, k, real} reported while streaming
    orientation: [i16; 4],
    report_seq: u8,
}

impl ImuSim {
    pub fn new() -> Self {
        Self {
            outbox: VecDeque::new(),
            current: Vec::new(),
            cursor: 0,
            rx: Vec::new(),
            last_write: Vec::new(),
            streaming: None,
            // Identity orientation
            orientation: [0, 0, 0, 0x4000],
            report_seq: 0,
        }
    }

    /// Set the raw Q14 quaternion {i, j, k, real} streamed in reports
    pub fn set_orientation(&mut self, quat: [i16; 4]) {
        self.orientation = quat;
    }

    /// The most recently completed write frame, header included
    pub fn last_written(&self) -> &[u8] {
        &self.last_write
    }

    fn frame(channel: Channel, payload: &[u8]) -> Vec<u8> {
        let total = (payload.len() + HEADER_LEN) as u16;
        let mut f = Vec::with_capacity(total as usize);
        f.extend_from_slice(&total.to_le_bytes());
        f.push(channel.raw());
        f.push(0);
        f.extend_from_slice(payload);
        f
    }

    fn product_id_frame() -> Vec<u8> {
        let mut payload = [0u8; 16];
        payload[0] = PRODUCT_ID_RESPONSE;
        payload[2] = 3; // sw major
        Self::frame(Channel::Control, &payload)
    }

    fn rotation_frame(&mut self, report_id: u8) -> Vec<u8> {
        let mut payload = vec![BASE_TIMESTAMP, 0, 0, 0, 0];
        payload.extend_from_slice(&[report_id, self.report_seq, 3, 0]);
        self.report_seq = self.report_seq.wrapping_add(1);
        for raw in self.orientation {
            payload.extend_from_slice(&raw.to_le_bytes());
        }
        payload.extend_from_slice(&0i16.to_le_bytes()); // accuracy word
        Self::frame(Channel::Reports, &payload)
    }

    fn handle_write(&mut self) {
        if self.rx.len() < HEADER_LEN {
            return;
        }
        self.last_write = self.rx.clone();
        let channel = Channel::from_raw(self.rx[2]);
        let payload = self.rx[HEADER_LEN..].to_vec();
        self.rx.clear();

        match (channel, payload.first()) {
            (Some(Channel::Executable), Some(&1)) => {
                // Reset: drop everything, stop streaming
                self.outbox.clear();
                self.current.clear();
                self.streaming = None;
                self.report_seq = 0;
            }
            (Some(Channel::Control), Some(&PRODUCT_ID_REQUEST)) => {
                self.outbox.push_back(Self::product_id_frame());
            }
            (Some(Channel::Control), Some(&SET_FEATURE_COMMAND)) => {
                if payload.len() > 1 {
                    self.streaming = Some(payload[1]);
                }
            }
            _ => {}
        }
    }
}

impl Default for ImuSim {
    fn default() -> Self {
        Self::new()
    }
}

impl BusPhy for ImuSim {
    fn bus_idle(&mut self) -> bool {
        true
    }

    fn start_write(&mut self, _address: u8) {
        self.rx.clear();
    }

    fn start_read(&mut self, _address: u8) {
        self.cursor = 0;
        if self.current.is_empty() {
            if let Some(frame) = self.outbox.pop_front() {
                self.current = frame;
            } else if let Some(id) = self.streaming {
                self.current = self.rotation_frame(id);
            }
        }
    }

    fn write_status(&mut self) -> PhyStatus {
        PhyStatus::READY
    }

    fn read_status(&mut self) -> PhyStatus {
        PhyStatus::READY
    }

    fn write_data(&mut self, byte: u8) {
        self.rx.push(byte);
    }

    fn read_data(&mut self) -> u8 {
        // Idle part serves zeros (a zero-length header)
        let byte = self.current.get(self.cursor).copied().unwrap_or(0);
        self.cursor += 1;
        byte
    }

    fn ack_more(&mut self) {}

    fn nack_stop(&mut self) {
        // The driver first reads just the header, then the whole frame;
        // the frame is consumed only once the body read got past the header.
        if self.cursor > HEADER_LEN {
            self.current.clear();
        }
    }

    fn stop(&mut self) {
        if !self.rx.is_empty() {
            self.handle_write();
        }
    }

    fn delay_us(&mut self, _us: u64) {}

    fn delay_ms(&mut self, _ms: u64) {}
}
