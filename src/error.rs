//! Error types for rover-core

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Fault reasons surfaced by the bus transaction engine.
///
/// A fault aborts the current transaction; a STOP condition has already been
/// forced on the wire by the time the caller sees one of these. Callers above
/// the protocol layer treat any fault as "no data this cycle" rather than a
/// fatal condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BusFault {
    /// Bus never went idle within the idle-wait timeout
    #[error("bus idle-wait timeout")]
    IdleTimeout,

    /// Peripheral NACKed the address or a data byte
    #[error("address or data byte not acknowledged")]
    Nack,

    /// Lost arbitration to another bus master
    #[error("arbitration lost")]
    ArbitrationLost,

    /// Illegal condition detected on the wire
    #[error("bus error")]
    BusError,

    /// Peripheral stopped clocking data mid-read
    #[error("byte-wait timeout")]
    ByteTimeout,
}

/// rover-core error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bus transaction failure
    #[error("bus transaction failed: {0}")]
    Bus(#[from] BusFault),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("config write error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// Device failed its startup handshake
    #[error("initialization failed: {0}")]
    InitializationFailed(String),

    /// Malformed or unexpected packet
    #[error("invalid packet: {0}")]
    InvalidPacket(String),

    /// Invalid parameter
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
