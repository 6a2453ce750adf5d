//! Hardware interface for the two-wire bus controller
//!
//! [`BusPhy`] is the seam between the transaction engine and the actual bus
//! peripheral. It exposes the controller at the level the engine needs: bus
//! arbitration state, START/STOP generation, one-byte data movement, and the
//! status flags raised between transfers. A register-backed implementation
//! maps each method onto the controller's status/control registers; the mock
//! in [`crate::bus::mock`] scripts the same surface for tests.

use std::time::Duration;

/// Status flags observed between byte transfers.
///
/// `ready` means the controller has finished clocking the previous byte
/// (write) or holds a received byte (read). The fault flags are level
/// conditions that invalidate the rest of the transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhyStatus {
    pub ready: bool,
    pub nack: bool,
    pub arb_lost: bool,
    pub bus_error: bool,
}

impl PhyStatus {
    /// A clean, completed transfer step
    pub const READY: PhyStatus = PhyStatus {
        ready: true,
        nack: false,
        arb_lost: false,
        bus_error: false,
    };
}

/// Two-wire bus controller interface (master role).
///
/// All methods are polled; none may block. The engine owns all pacing via
/// [`BusPhy::delay_us`] / [`BusPhy::delay_ms`], which implementations may
/// override (the mock makes them no-ops so timeout tests run instantly).
pub trait BusPhy: Send {
    /// Whether the bus is currently idle (no master driving it)
    fn bus_idle(&mut self) -> bool;

    /// Issue START (or repeated START) plus the address with the write bit
    fn start_write(&mut self, address: u8);

    /// Issue START (or repeated START) plus the address with the read bit
    fn start_read(&mut self, address: u8);

    /// Status of the write-side transfer flags
    fn write_status(&mut self) -> PhyStatus;

    /// Status of the read-side transfer flags
    fn read_status(&mut self) -> PhyStatus;

    /// Clock one byte out (only valid when `write_status().ready`)
    fn write_data(&mut self, byte: u8);

    /// Take the received byte (only valid when `read_status().ready`)
    fn read_data(&mut self) -> u8;

    /// ACK the received byte and keep the transfer going
    fn ack_more(&mut self);

    /// NACK the received byte and issue STOP (normal end of a read)
    fn nack_stop(&mut self);

    /// Force a STOP condition (cleanup on any exit path)
    fn stop(&mut self);

    /// Busy-wait pacing between polls, microsecond granularity
    fn delay_us(&mut self, us: u64) {
        std::thread::sleep(Duration::from_micros(us));
    }

    /// Busy-wait pacing for the bus-idle wait, millisecond granularity
    fn delay_ms(&mut self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}
