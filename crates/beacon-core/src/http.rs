//! HTTP health endpoints backed by the liveness probe.
//!
//! The routing layer is thin: each handler runs one probe and maps the
//! outcome onto a status code. `/health` checks this node's own responder
//! over loopback; `/health_for_factorio` probes the HTTP caller's
//! observed address on the configured remote port, so the foreign UDP
//! server can confirm the reverse path works.

use crate::error::ProbeError;
use crate::probe::{DEFAULT_PROBE_TIMEOUT, LivenessProbe};
use axum::Router;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::routing::get;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tracing::debug;

/// Immutable state shared by the health handlers.
#[derive(Debug, Clone)]
pub struct HealthState {
    /// Local IP the probe sockets bind to.
    pub local_ip: IpAddr,
    /// UDP port of this node's own discovery responder.
    pub udp_port: u16,
    /// Port probed on the caller's address.
    pub remote_port: u16,
    /// Reply deadline for each probe.
    pub probe_timeout: Duration,
}

impl HealthState {
    /// Create state with the default 5 s probe deadline.
    #[must_use]
    pub fn new(local_ip: IpAddr, udp_port: u16, remote_port: u16) -> Self {
        Self {
            local_ip,
            udp_port,
            remote_port,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    fn probe(&self) -> LivenessProbe {
        let mut probe = LivenessProbe::new(self.local_ip);
        probe.set_timeout(self.probe_timeout);
        probe
    }
}

/// Build the health router.
#[must_use]
pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health_for_factorio", get(health_for_factorio))
        .with_state(state)
}

/// Probe this node's own responder over loopback.
async fn health(State(state): State<HealthState>) -> (StatusCode, String) {
    let target = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), state.udp_port);
    run_probe(&state, target).await
}

/// Probe the caller's observed address on the configured remote port.
async fn health_for_factorio(
    State(state): State<HealthState>,
    ConnectInfo(caller): ConnectInfo<SocketAddr>,
) -> (StatusCode, String) {
    let target = SocketAddr::new(caller.ip(), state.remote_port);
    run_probe(&state, target).await
}

async fn run_probe(state: &HealthState, target: SocketAddr) -> (StatusCode, String) {
    debug!(%target, "health probe");
    match state.probe().probe(target).await {
        Ok(outcome) => {
            debug!(%target, elapsed = ?outcome.elapsed, "health probe succeeded");
            (StatusCode::OK, "OK".to_string())
        }
        Err(err) => (probe_status(&err), err.to_string()),
    }
}

// Setup failures are ours (500); path failures are the peer's (502).
fn probe_status(err: &ProbeError) -> StatusCode {
    match err {
        ProbeError::Bind(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ProbeError::Io(_) | ProbeError::Timeout(_) => StatusCode::BAD_GATEWAY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_setup_failure_maps_to_500() {
        let err = ProbeError::Bind(io::Error::new(io::ErrorKind::AddrInUse, "in use"));
        assert_eq!(probe_status(&err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_path_failures_map_to_502() {
        let timeout = ProbeError::Timeout(Duration::from_secs(5));
        assert_eq!(probe_status(&timeout), StatusCode::BAD_GATEWAY);

        let io_err = ProbeError::Io(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        assert_eq!(probe_status(&io_err), StatusCode::BAD_GATEWAY);
    }
}
