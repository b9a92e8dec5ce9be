//! Liveness probing over the discovery protocol.
//!
//! A probe opens its own ephemeral socket, sends one ping, and waits a
//! bounded time for any datagram back. The reply payload is deliberately
//! not validated against the sent sequence index; receipt of any datagram
//! within the deadline counts as success.

use crate::error::ProbeError;
use crate::packet::{MAX_DATAGRAM_LEN, encode_ping};
use rand::Rng;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tracing::debug;

/// Default deadline for a probe reply.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Successful probe result, owned by the caller.
#[derive(Debug, Clone, Copy)]
pub struct ProbeOutcome {
    /// Sequence index the ping carried.
    pub sequence: u16,
    /// Time from send to first datagram received.
    pub elapsed: Duration,
}

/// One-shot ping/pong check against a discovery responder.
#[derive(Debug, Clone)]
pub struct LivenessProbe {
    local_ip: IpAddr,
    timeout: Duration,
}

impl LivenessProbe {
    /// Create a probe whose ephemeral socket binds to `local_ip`.
    #[must_use]
    pub fn new(local_ip: IpAddr) -> Self {
        Self {
            local_ip,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Override the reply deadline.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Send one ping to `target` and wait for any datagram back.
    ///
    /// The ephemeral socket lives only for this call and is released on
    /// every path, including the timeout path.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Bind`] if the ephemeral socket cannot be
    /// bound, [`ProbeError::Io`] if sending or receiving fails, and
    /// [`ProbeError::Timeout`] if no datagram arrives before the deadline.
    pub async fn probe(&self, target: SocketAddr) -> Result<ProbeOutcome, ProbeError> {
        let socket = UdpSocket::bind(SocketAddr::new(self.local_ip, 0))
            .await
            .map_err(ProbeError::Bind)?;

        let sequence = rand::thread_rng().r#gen::<u16>();
        let ping = encode_ping(sequence);

        let started = Instant::now();
        let sent = socket
            .send_to(&ping, target)
            .await
            .map_err(ProbeError::Io)?;
        debug!(bytes = sent, %target, sequence, "probe ping sent");

        let mut buf = [0u8; MAX_DATAGRAM_LEN];
        let (received, from) = tokio::time::timeout(self.timeout, socket.recv_from(&mut buf))
            .await
            .map_err(|_| ProbeError::Timeout(self.timeout))?
            .map_err(ProbeError::Io)?;

        let elapsed = started.elapsed();
        debug!(bytes = received, %from, ?elapsed, "probe reply received");
        Ok(ProbeOutcome { sequence, elapsed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketHeader;

    const LOOPBACK: &str = "127.0.0.1";

    #[tokio::test]
    async fn test_probe_succeeds_when_any_datagram_returns() {
        let responder = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = responder.local_addr().unwrap();

        // Echo anything back, pong or not; the probe accepts any datagram.
        tokio::spawn(async move {
            let mut buf = [0u8; MAX_DATAGRAM_LEN];
            let (len, peer) = responder.recv_from(&mut buf).await.unwrap();
            let header = PacketHeader::parse(&buf[..len]).unwrap();
            assert_eq!(header.opcode, crate::packet::OPCODE_PING);
            responder.send_to(b"anything", peer).await.unwrap();
        });

        let probe = LivenessProbe::new(LOOPBACK.parse().unwrap());
        let outcome = probe.probe(target).await.unwrap();
        assert!(outcome.elapsed < DEFAULT_PROBE_TIMEOUT);
    }

    #[tokio::test]
    async fn test_probe_times_out_against_silent_peer() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = silent.local_addr().unwrap();

        let mut probe = LivenessProbe::new(LOOPBACK.parse().unwrap());
        probe.set_timeout(Duration::from_millis(100));

        let err = probe.probe(target).await.unwrap_err();
        assert!(matches!(err, ProbeError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_probe_sockets_are_released() {
        // Many sequential probes against a silent peer must not exhaust
        // local ports; each ephemeral socket is dropped with its call.
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = silent.local_addr().unwrap();

        let mut probe = LivenessProbe::new(LOOPBACK.parse().unwrap());
        probe.set_timeout(Duration::from_millis(10));

        for _ in 0..32 {
            let _ = probe.probe(target).await;
        }
    }
}
