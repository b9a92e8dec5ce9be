//! # Beacon Core
//!
//! Core implementation of the beacon discovery protocol: a UDP service
//! that tells game servers behind NAT where they can actually be reached.
//!
//! A node listens on a UDP port and answers every discovery datagram with
//! a pong carrying an `ip:port` address string. In *origin* mode the node
//! looks up its own public IP through an external service; in *relay* mode
//! it reports the transport-level source address the request arrived from.
//! A liveness probe reuses the same framing for health checking, both as a
//! standalone diagnostic and behind two HTTP endpoints.
//!
//! This crate provides:
//! - Ping/pong wire framing ([`packet`])
//! - Address resolution strategies for the two roles ([`resolve`])
//! - The external IP lookup collaborator ([`lookup`])
//! - The per-packet discovery responder ([`responder`])
//! - A one-shot liveness probe with a bounded deadline ([`probe`])
//! - HTTP health endpoints backed by the probe ([`http`])
//! - The long-lived server runtime and shutdown coordination ([`server`])
//!
//! ## Example
//!
//! ```rust,no_run
//! use beacon_core::{Mode, ServerConfig, ServerRuntime};
//!
//! # async fn example() -> Result<(), beacon_core::RuntimeError> {
//! let config = ServerConfig {
//!     bind_ip: "0.0.0.0".parse().unwrap(),
//!     port: 34197,
//!     remote_port: 34197,
//!     mode: Mode::Relay,
//!     http_enabled: true,
//! };
//!
//! let runtime = ServerRuntime::bind(config).await?;
//! runtime.run().await
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod http;
pub mod lookup;
pub mod packet;
pub mod probe;
pub mod resolve;
pub mod responder;
pub mod server;

// Re-export commonly used types
pub use config::{Mode, ServerConfig};
pub use error::{PacketError, ProbeError, ResolveError, RuntimeError};
pub use lookup::{ExternalIp, Ipify};
pub use packet::{
    MAX_DATAGRAM_LEN, MIN_DATAGRAM_LEN, OPCODE_PING, OPCODE_PONG, PacketHeader, Pong, encode_ping,
    encode_pong,
};
pub use probe::{DEFAULT_PROBE_TIMEOUT, LivenessProbe, ProbeOutcome};
pub use resolve::{AddressResolver, ObservedPeer, SelfLookup};
pub use responder::DiscoveryResponder;
pub use server::{SHUTDOWN_GRACE, ServerRuntime};
