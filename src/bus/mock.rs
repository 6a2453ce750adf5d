//! Scripted bus controller for tests and the simulated robot.
//!
//! The mock plays the peripheral side of a transaction: bytes queued with
//! [`MockPhy::inject`] are served to reads, written bytes are recorded, and
//! the public flags script failure modes (busy bus, NACKing device, silent
//! device, arbitration loss, bus error). Delays are no-ops so timeout paths
//! run at full speed in tests.

use std::collections::VecDeque;

use super::phy::{BusPhy, PhyStatus};

#[derive(Default)]
pub struct MockPhy {
    /// Bus reports idle when a transaction starts
    pub idle: bool,
    /// Peripheral drives read data (false simulates a dead device)
    pub respond: bool,
    pub ack_address: bool,
    pub ack_data: bool,
    /// Raise arbitration loss once this many bytes have been read
    pub arb_lost_after: Option<usize>,
    /// Raise a bus error once this many bytes have been read
    pub bus_error_after: Option<usize>,

    /// (address, is_read) for every START issued
    pub starts: Vec<(u8, bool)>,
    pub written: Vec<u8>,
    pub acks: usize,
    pub nack_stops: usize,
    pub stops: usize,
    pub reads_done: usize,

    read_queue: VecDeque<u8>,
    write_nack_pending: bool,
}

impl MockPhy {
    pub fn new() -> Self {
        Self {
            idle: true,
            respond: true,
            ack_address: true,
            ack_data: true,
            ..Default::default()
        }
    }

    /// Queue bytes the peripheral will serve to subsequent reads
    pub fn inject(&mut self, data: &[u8]) {
        self.read_queue.extend(data.iter().copied());
    }

    pub fn queued(&self) -> usize {
        self.read_queue.len()
    }

    fn read_fault(&self) -> PhyStatus {
        let arb_lost = self.arb_lost_after.is_some_and(|n| self.reads_done >= n);
        let bus_error = self.bus_error_after.is_some_and(|n| self.reads_done >= n);
        PhyStatus {
            ready: false,
            nack: false,
            arb_lost,
            bus_error,
        }
    }
}

impl BusPhy for MockPhy {
    fn bus_idle(&mut self) -> bool {
        self.idle
    }

    fn start_write(&mut self, address: u8) {
        self.starts.push((address, false));
        self.write_nack_pending = !self.ack_address;
    }

    fn start_read(&mut self, address: u8) {
        self.starts.push((address, true));
    }

    fn write_status(&mut self) -> PhyStatus {
        PhyStatus {
            ready: true,
            nack: self.write_nack_pending,
            arb_lost: false,
            bus_error: false,
        }
    }

    fn read_status(&mut self) -> PhyStatus {
        let fault = self.read_fault();
        if fault.arb_lost || fault.bus_error {
            return fault;
        }
        PhyStatus {
            ready: self.respond && !self.read_queue.is_empty(),
            ..PhyStatus::READY
        }
    }

    fn write_data(&mut self, byte: u8) {
        self.written.push(byte);
        self.write_nack_pending = !self.ack_data;
    }

    fn read_data(&mut self) -> u8 {
        self.reads_done += 1;
        self.read_queue.pop_front().unwrap_or(0xFF)
    }

    fn ack_more(&mut self) {
        self.acks += 1;
    }

    fn nack_stop(&mut self) {
        self.nack_stops += 1;
    }

    fn stop(&mut self) {
        self.stops += 1;
    }

    // Scripted peripherals answer immediately; sleeping only slows the
    // timeout tests down.
    fn delay_us(&mut self, _us: u64) {}

    fn delay_ms(&mut self, _ms: u64) {}
}
