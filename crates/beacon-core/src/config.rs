//! Server configuration values.
//!
//! Flags and the optional config file are collapsed by the CLI into one
//! immutable [`ServerConfig`] before the runtime starts; nothing here
//! changes after startup.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Which address-resolution strategy the node runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Discover our own public IP through an external lookup service.
    Origin,
    /// Report the address each request is observed to arrive from.
    Relay,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Origin => write!(f, "origin"),
            Self::Relay => write!(f, "relay"),
        }
    }
}

/// Immutable node configuration, fixed at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Local IP the UDP socket and HTTP listener bind to.
    pub bind_ip: IpAddr,
    /// UDP port of the discovery responder. The HTTP listener uses the
    /// same numeric port over TCP.
    pub port: u16,
    /// Port announced in pong replies and probed by `/health_for_factorio`.
    pub remote_port: u16,
    /// Address-resolution strategy.
    pub mode: Mode,
    /// Whether to expose the HTTP health endpoints.
    pub http_enabled: bool,
}

impl ServerConfig {
    /// Requested address of the discovery responder.
    #[must_use]
    pub fn udp_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Requested address of the HTTP listener.
    #[must_use]
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_display() {
        assert_eq!(Mode::Origin.to_string(), "origin");
        assert_eq!(Mode::Relay.to_string(), "relay");
    }

    #[test]
    fn test_addresses_share_bind_ip_and_port() {
        let config = ServerConfig {
            bind_ip: "127.0.0.1".parse().unwrap(),
            port: 34197,
            remote_port: 7777,
            mode: Mode::Relay,
            http_enabled: true,
        };

        assert_eq!(config.udp_addr().to_string(), "127.0.0.1:34197");
        assert_eq!(config.http_addr().to_string(), "127.0.0.1:34197");
    }
}
