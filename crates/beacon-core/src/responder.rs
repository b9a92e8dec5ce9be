//! Per-packet discovery responder.
//!
//! One long-lived socket, one loop: read a datagram, resolve the address
//! to announce, answer with a pong carrying the peer's sequence index.

use crate::packet::{MAX_DATAGRAM_LEN, PacketHeader, encode_pong};
use crate::resolve::AddressResolver;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Answers discovery requests on the main UDP socket.
pub struct DiscoveryResponder {
    socket: Arc<UdpSocket>,
    resolver: Box<dyn AddressResolver>,
}

impl DiscoveryResponder {
    /// Create a responder over `socket` using `resolver` for announcements.
    #[must_use]
    pub fn new(socket: Arc<UdpSocket>, resolver: Box<dyn AddressResolver>) -> Self {
        Self { socket, resolver }
    }

    /// Serve requests until `shutdown` fires or the socket read fails.
    ///
    /// A coordinated shutdown exits with `Ok(())` through the select arm,
    /// so a `recv_from` error is always a genuine terminal failure.
    /// Resolution and write failures only drop the request in hand; the
    /// loop keeps serving.
    ///
    /// # Errors
    ///
    /// Returns the first read error encountered outside of shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> io::Result<()> {
        let mut buf = [0u8; MAX_DATAGRAM_LEN];
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("discovery loop stopping");
                    return Ok(());
                }
                res = self.socket.recv_from(&mut buf) => {
                    let (len, peer) = res?;
                    debug!(bytes = len, %peer, "datagram received");
                    self.answer(&buf[..len], peer).await;
                }
            }
        }
    }

    /// Handle one datagram: decode, resolve, reply.
    ///
    /// Never fails; every non-answerable condition is logged and the
    /// datagram dropped.
    pub async fn answer(&self, data: &[u8], peer: SocketAddr) {
        let header = match PacketHeader::parse(data) {
            Ok(header) => header,
            Err(_) => {
                // Keepalive traffic, intentionally unanswered.
                debug!(bytes = data.len(), %peer, "short datagram ignored");
                return;
            }
        };

        let address = match self.resolver.resolve(peer).await {
            Ok(address) => address,
            Err(err) => {
                error!(%peer, sequence = header.sequence, %err, "resolution failed, dropping request");
                return;
            }
        };

        let pong = encode_pong(header.sequence, &address);
        match self.socket.send_to(&pong, peer).await {
            Ok(written) => {
                debug!(bytes = written, %peer, %address, sequence = header.sequence, "pong sent");
            }
            Err(err) => error!(%peer, %err, "pong write failed"),
        }
    }
}
