//! Polled two-wire bus transaction engine
//!
//! [`BusMaster`] runs complete addressed read/write exchanges against a
//! peripheral over a [`BusPhy`]. Each transaction walks the same state
//! sequence: wait for the bus to go idle, START plus address, ACK-checked
//! data bytes, and a STOP that is issued on *every* exit path, success or
//! failure. Failures carry a [`BusFault`] reason; callers above the protocol
//! layer treat any fault as "no data this cycle".
//!
//! The engine busy-waits between bytes on purpose. Transfers complete on
//! microsecond deadlines the task scheduler's tick cannot guarantee, so the
//! per-byte waits are bounded polls rather than cooperative suspensions.

pub mod phy;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use phy::{BusPhy, PhyStatus};

use crate::error::BusFault;

/// Transaction timeouts.
///
/// The byte-wait poll count is large because the IMU stretches the clock
/// aggressively after a reset; the value is calibrated against the
/// platform's microsecond delay granularity.
#[derive(Debug, Clone, Copy)]
pub struct BusTiming {
    /// Bus idle-wait timeout, milliseconds
    pub idle_timeout_ms: u64,
    /// Per-byte wait, in 1 µs polls
    pub byte_timeout_polls: u32,
}

impl Default for BusTiming {
    fn default() -> Self {
        Self {
            idle_timeout_ms: 10,
            byte_timeout_polls: 0xFFF,
        }
    }
}

/// Synchronous bus master.
///
/// One instance owns the underlying controller; transactions are transient
/// (address + buffers in, result out) with no state carried between calls.
pub struct BusMaster<P: BusPhy> {
    phy: P,
    timing: BusTiming,
}

impl<P: BusPhy> BusMaster<P> {
    pub fn new(phy: P) -> Self {
        Self {
            phy,
            timing: BusTiming::default(),
        }
    }

    pub fn with_timing(phy: P, timing: BusTiming) -> Self {
        Self { phy, timing }
    }

    /// Access the underlying controller (used by the simulated bus)
    pub fn phy_mut(&mut self) -> &mut P {
        &mut self.phy
    }

    /// Write `header` then `payload` to the addressed peripheral in a single
    /// transaction.
    ///
    /// Fails if the bus stays busy past the idle timeout, or if the address
    /// or any byte is NACKed, or on arbitration loss / bus error. A STOP is
    /// issued before returning in all cases.
    pub fn write(&mut self, address: u8, header: &[u8], payload: &[u8]) -> Result<(), BusFault> {
        let result = self.write_frames(address, header, payload);
        self.phy.stop();
        result
    }

    /// Read exactly `buffer.len()` bytes from the addressed peripheral.
    ///
    /// All bytes but the last are ACKed; the last is NACKed so the
    /// peripheral stops driving, followed by STOP. A zero-length request is
    /// an immediate success with nothing put on the wire — callers use that
    /// to express "no data wanted", and peripheral protocols distinguish it
    /// from transport failure.
    pub fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), BusFault> {
        if buffer.is_empty() {
            return Ok(());
        }
        self.start_read_phase(address)?;
        let total = buffer.len();
        for i in 0..total {
            buffer[i] = self.next_byte(i + 1 == total).map_err(|f| self.fail(f))?;
        }
        Ok(())
    }

    /// Read one transaction split across two buffers: the first
    /// `header.len()` bytes land in `header`, the rest in `payload`.
    ///
    /// Used to peel a fixed-size frame header off a variable-size body
    /// without paying for a second transaction.
    pub fn read_split(
        &mut self,
        address: u8,
        header: &mut [u8],
        payload: &mut [u8],
    ) -> Result<(), BusFault> {
        let total = header.len() + payload.len();
        if total == 0 {
            return Ok(());
        }
        self.start_read_phase(address)?;
        for i in 0..total {
            let byte = self.next_byte(i + 1 == total).map_err(|f| self.fail(f))?;
            if i < header.len() {
                header[i] = byte;
            } else {
                payload[i - header.len()] = byte;
            }
        }
        Ok(())
    }

    /// Read and discard up to `count` bytes.
    ///
    /// Used to flush unread data after a peripheral reset. A byte-wait
    /// timeout here means the peripheral has nothing more to send and is a
    /// normal completion, not a failure — flushing the device harder than
    /// that has been seen to make it reset twice. Idle-wait timeout,
    /// arbitration loss and bus errors remain failures.
    pub fn read_discard(&mut self, address: u8, count: usize) -> Result<(), BusFault> {
        if count == 0 {
            return Ok(());
        }
        self.start_read_phase(address)?;
        for i in 0..count {
            match self.next_byte(i + 1 == count) {
                Ok(_) => {}
                Err(BusFault::ByteTimeout) => {
                    // End of available data
                    self.phy.nack_stop();
                    return Ok(());
                }
                Err(fault) => return Err(self.fail(fault)),
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Transaction phases
    // ------------------------------------------------------------------

    fn write_frames(&mut self, address: u8, header: &[u8], payload: &[u8]) -> Result<(), BusFault> {
        self.wait_idle()?;
        self.phy.start_write(address);

        // Address phase ACK
        self.wait_write_ready()?;

        for &byte in header.iter().chain(payload.iter()) {
            self.phy.write_data(byte);
            self.wait_write_ready()?;
        }
        Ok(())
    }

    /// Idle wait + START|R for the read-family operations. Forces STOP if
    /// the bus never frees up.
    fn start_read_phase(&mut self, address: u8) -> Result<(), BusFault> {
        if let Err(fault) = self.wait_idle() {
            return Err(self.fail(fault));
        }
        self.phy.start_read(address);
        Ok(())
    }

    /// Wait for the next received byte and take it, issuing ACK (more to
    /// come) or NACK+STOP (final byte).
    fn next_byte(&mut self, last: bool) -> Result<u8, BusFault> {
        self.wait_read_ready()?;
        let byte = self.phy.read_data();
        if last {
            self.phy.nack_stop();
        } else {
            self.phy.ack_more();
        }
        Ok(byte)
    }

    fn wait_idle(&mut self) -> Result<(), BusFault> {
        let mut waited_ms = 0;
        while !self.phy.bus_idle() {
            if waited_ms > self.timing.idle_timeout_ms {
                return Err(BusFault::IdleTimeout);
            }
            self.phy.delay_ms(1);
            waited_ms += 1;
        }
        Ok(())
    }

    fn wait_write_ready(&mut self) -> Result<(), BusFault> {
        let mut polls = self.timing.byte_timeout_polls;
        loop {
            let status = self.phy.write_status();
            if status.arb_lost {
                return Err(BusFault::ArbitrationLost);
            }
            if status.bus_error {
                return Err(BusFault::BusError);
            }
            if status.ready {
                if status.nack {
                    return Err(BusFault::Nack);
                }
                return Ok(());
            }
            polls -= 1;
            if polls == 0 {
                return Err(BusFault::ByteTimeout);
            }
            self.phy.delay_us(1);
        }
    }

    fn wait_read_ready(&mut self) -> Result<(), BusFault> {
        let mut polls = self.timing.byte_timeout_polls;
        loop {
            let status = self.phy.read_status();
            if status.arb_lost {
                return Err(BusFault::ArbitrationLost);
            }
            if status.bus_error {
                return Err(BusFault::BusError);
            }
            if status.nack {
                return Err(BusFault::Nack);
            }
            if status.ready {
                return Ok(());
            }
            polls -= 1;
            if polls == 0 {
                return Err(BusFault::ByteTimeout);
            }
            self.phy.delay_us(1);
        }
    }

    /// Failure exit for the read family: force NACK+STOP so the peripheral
    /// releases the bus, then hand the fault back.
    fn fail(&mut self, fault: BusFault) -> BusFault {
        self.phy.nack_stop();
        fault
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockPhy;
    use super::*;

    fn master(phy: MockPhy) -> BusMaster<MockPhy> {
        BusMaster::new(phy)
    }

    #[test]
    fn write_sends_header_then_payload_and_stops() {
        let mut bus = master(MockPhy::new());
        bus.write(0x4B, &[0x05, 0x00, 0x02, 0x00], &[0xF9, 0x00])
            .unwrap();
        let phy = bus.phy_mut();
        assert_eq!(phy.written, vec![0x05, 0x00, 0x02, 0x00, 0xF9, 0x00]);
        assert_eq!(phy.starts, vec![(0x4B, false)]);
        assert_eq!(phy.stops, 1);
    }

    #[test]
    fn write_fails_on_address_nack() {
        let mut phy = MockPhy::new();
        phy.ack_address = false;
        let mut bus = master(phy);
        let err = bus.write(0x10, &[1, 2], &[]).unwrap_err();
        assert_eq!(err, BusFault::Nack);
        // STOP still issued on the failure path
        assert_eq!(bus.phy_mut().stops, 1);
        // Nothing was clocked out after the NACKed address
        assert!(bus.phy_mut().written.is_empty());
    }

    #[test]
    fn write_fails_on_data_nack() {
        let mut phy = MockPhy::new();
        phy.ack_data = false;
        let mut bus = master(phy);
        let err = bus.write(0x10, &[1, 2, 3], &[]).unwrap_err();
        assert_eq!(err, BusFault::Nack);
        // First byte went out before its NACK came back
        assert_eq!(bus.phy_mut().written, vec![1]);
    }

    #[test]
    fn write_fails_when_bus_never_idle() {
        let mut phy = MockPhy::new();
        phy.idle = false;
        let mut bus = master(phy);
        assert_eq!(bus.write(0x10, &[1], &[]).unwrap_err(), BusFault::IdleTimeout);
    }

    #[test]
    fn read_fills_buffer_and_nacks_last_byte() {
        let mut phy = MockPhy::new();
        phy.inject(&[0xAA, 0xBB, 0xCC]);
        let mut bus = master(phy);
        let mut buf = [0u8; 3];
        bus.read(0x4B, &mut buf).unwrap();
        assert_eq!(buf, [0xAA, 0xBB, 0xCC]);
        let phy = bus.phy_mut();
        assert_eq!(phy.starts, vec![(0x4B, true)]);
        assert_eq!(phy.acks, 2);
        assert_eq!(phy.nack_stops, 1);
    }

    #[test]
    fn zero_length_read_succeeds_without_touching_the_bus() {
        let mut bus = master(MockPhy::new());
        bus.read(0x4B, &mut []).unwrap();
        let phy = bus.phy_mut();
        assert!(phy.starts.is_empty());
        assert_eq!(phy.stops + phy.nack_stops, 0);
    }

    #[test]
    fn read_times_out_when_peripheral_never_ready() {
        let mut phy = MockPhy::new();
        phy.respond = false;
        let mut bus = master(phy);
        let mut buf = [0u8; 4];
        // Must return, not hang
        assert_eq!(bus.read(0x4B, &mut buf).unwrap_err(), BusFault::ByteTimeout);
        assert_eq!(bus.phy_mut().nack_stops, 1);
    }

    #[test]
    fn read_times_out_when_peripheral_stops_mid_transfer() {
        let mut phy = MockPhy::new();
        phy.inject(&[1, 2]);
        let mut bus = master(phy);
        let mut buf = [0u8; 5];
        assert_eq!(bus.read(0x4B, &mut buf).unwrap_err(), BusFault::ByteTimeout);
        assert_eq!(buf[..2], [1, 2]);
    }

    #[test]
    fn read_surfaces_arbitration_loss() {
        let mut phy = MockPhy::new();
        phy.inject(&[1, 2, 3, 4]);
        phy.arb_lost_after = Some(2);
        let mut bus = master(phy);
        let mut buf = [0u8; 4];
        assert_eq!(
            bus.read(0x4B, &mut buf).unwrap_err(),
            BusFault::ArbitrationLost
        );
    }

    #[test]
    fn read_split_routes_header_and_payload() {
        let mut phy = MockPhy::new();
        phy.inject(&[0x09, 0x00, 0x03, 0x01, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE]);
        let mut bus = master(phy);
        let mut header = [0u8; 4];
        let mut payload = [0u8; 5];
        bus.read_split(0x4B, &mut header, &mut payload).unwrap();
        assert_eq!(header, [0x09, 0x00, 0x03, 0x01]);
        assert_eq!(payload, [0xAA, 0xBB, 0xCC, 0xDD, 0xEE]);
        let phy = bus.phy_mut();
        // One transaction: single start, single closing NACK+STOP
        assert_eq!(phy.starts.len(), 1);
        assert_eq!(phy.acks, 8);
        assert_eq!(phy.nack_stops, 1);
    }

    #[test]
    fn read_discard_succeeds_when_data_runs_out() {
        let mut phy = MockPhy::new();
        phy.inject(&[9, 9, 9]);
        let mut bus = master(phy);
        // Asked for far more than the peripheral has; timeout ends the flush
        bus.read_discard(0x4B, 0x100).unwrap();
        assert_eq!(bus.phy_mut().reads_done, 3);
    }

    #[test]
    fn read_discard_still_fails_on_bus_error() {
        let mut phy = MockPhy::new();
        phy.inject(&[9, 9, 9, 9]);
        phy.bus_error_after = Some(2);
        let mut bus = master(phy);
        assert_eq!(
            bus.read_discard(0x4B, 8).unwrap_err(),
            BusFault::BusError
        );
    }

    #[test]
    fn read_discard_reads_exact_count_when_available() {
        let mut phy = MockPhy::new();
        phy.inject(&[1, 2, 3, 4, 5]);
        let mut bus = master(phy);
        bus.read_discard(0x4B, 2).unwrap();
        let phy = bus.phy_mut();
        assert_eq!(phy.reads_done, 2);
        assert_eq!(phy.nack_stops, 1);
    }
}
