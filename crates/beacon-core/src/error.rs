//! Error types for the beacon discovery protocol.

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Packet framing errors
#[derive(Debug, Error)]
pub enum PacketError {
    /// Datagram too short to carry a header
    #[error("datagram too short: expected at least {expected}, got {actual}")]
    TooShort {
        /// Expected minimum size
        expected: usize,
        /// Actual size received
        actual: usize,
    },

    /// Opcode does not identify the expected packet kind
    #[error("unexpected opcode: 0x{0:02X}")]
    UnexpectedOpcode(u8),

    /// Declared address length does not match the payload
    #[error("address length mismatch: declared {declared}, got {actual}")]
    LengthMismatch {
        /// Length the prefix declared
        declared: usize,
        /// Bytes actually present after the prefix
        actual: usize,
    },

    /// Address bytes are not valid UTF-8
    #[error("address is not valid utf-8")]
    InvalidAddress(#[from] std::str::Utf8Error),
}

/// Address resolution errors
#[derive(Debug, Error)]
pub enum ResolveError {
    /// External IP lookup failed
    #[error("external ip lookup failed: {0}")]
    Lookup(String),
}

/// Liveness probe errors
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Ephemeral probe socket could not be bound
    #[error("probe socket bind failed: {0}")]
    Bind(#[source] std::io::Error),

    /// Sending the ping or receiving the reply failed
    #[error("probe i/o failed: {0}")]
    Io(#[source] std::io::Error),

    /// No datagram arrived before the deadline
    #[error("no reply within {0:?}")]
    Timeout(Duration),
}

/// Server runtime errors
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Main UDP socket bind failed (fatal at startup)
    #[error("udp bind failed on {addr}: {source}")]
    Bind {
        /// Address the bind was attempted on
        addr: SocketAddr,
        /// Underlying socket error
        source: std::io::Error,
    },

    /// HTTP listener bind failed (fatal at startup)
    #[error("http bind failed on {addr}: {source}")]
    HttpBind {
        /// Address the bind was attempted on
        addr: SocketAddr,
        /// Underlying socket error
        source: std::io::Error,
    },

    /// Resolver construction failed
    #[error("resolver setup failed: {0}")]
    Resolver(#[from] ResolveError),

    /// Discovery loop terminated with a read error
    #[error("discovery loop failed: {0}")]
    Discovery(#[source] std::io::Error),

    /// HTTP server terminated with an error
    #[error("http server failed: {0}")]
    Http(#[source] std::io::Error),

    /// A supervised task panicked or was cancelled unexpectedly
    #[error("task join failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
