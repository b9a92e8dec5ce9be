//! Address resolution strategies for the discovery responder.
//!
//! A pong announces where the requesting peer can reach the server. Two
//! strategies exist, selected once at startup: an origin node looks up its
//! own public IP through an external collaborator, a relay node reports
//! the transport-level source address the request arrived from.
//!
//! Resolution reflects only the current request; no state is retained
//! between calls beyond the immutable configured remote port.

use crate::error::ResolveError;
use crate::lookup::ExternalIp;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;

/// Strategy producing the `host:port` string announced in a pong.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Resolve the address to announce for a request received from `peer`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Lookup`] when an external lookup fails; the
    /// responder drops the request and keeps serving.
    async fn resolve(&self, peer: SocketAddr) -> Result<String, ResolveError>;
}

/// Relay-mode resolver: announces the observed source IP of each request.
#[derive(Debug, Clone)]
pub struct ObservedPeer {
    remote_port: u16,
}

impl ObservedPeer {
    /// Create a resolver announcing `remote_port` on the peer's own IP.
    #[must_use]
    pub fn new(remote_port: u16) -> Self {
        Self { remote_port }
    }
}

#[async_trait]
impl AddressResolver for ObservedPeer {
    async fn resolve(&self, peer: SocketAddr) -> Result<String, ResolveError> {
        Ok(format!("{}:{}", peer.ip(), self.remote_port))
    }
}

/// Origin-mode resolver: announces this node's own public IP.
pub struct SelfLookup {
    source: Arc<dyn ExternalIp>,
    remote_port: u16,
}

impl SelfLookup {
    /// Create a resolver that queries `source` for the public IP and
    /// announces it with `remote_port`.
    #[must_use]
    pub fn new(source: Arc<dyn ExternalIp>, remote_port: u16) -> Self {
        Self {
            source,
            remote_port,
        }
    }
}

#[async_trait]
impl AddressResolver for SelfLookup {
    async fn resolve(&self, _peer: SocketAddr) -> Result<String, ResolveError> {
        // TODO: cache the looked-up IP with a short TTL instead of hitting
        // the collaborator once per request.
        let ip = self.source.lookup().await?;
        Ok(format!("{}:{}", ip, self.remote_port))
    }
}
