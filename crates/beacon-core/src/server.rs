//! Long-lived server runtime and shutdown coordination.
//!
//! The runtime owns the main UDP socket and supervises the discovery
//! loop, the optional HTTP listener, and a shutdown coordinator. The
//! first task failure or an OS signal tears the siblings down; HTTP gets
//! a bounded drain window for in-flight requests.

use crate::config::{Mode, ServerConfig};
use crate::error::RuntimeError;
use crate::http::{self, HealthState};
use crate::lookup::Ipify;
use crate::resolve::{AddressResolver, ObservedPeer, SelfLookup};
use crate::responder::DiscoveryResponder;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Drain window for in-flight HTTP requests after shutdown is requested.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Send/receive buffer size for the main socket.
const SOCKET_BUFFER_SIZE: usize = 256 * 1024;

/// Owns the main socket and supervises the server tasks.
#[derive(Debug)]
pub struct ServerRuntime {
    config: ServerConfig,
    socket: Arc<UdpSocket>,
    udp_addr: SocketAddr,
    http_listener: Option<(TcpListener, SocketAddr)>,
}

impl ServerRuntime {
    /// Bind the UDP socket and, when enabled, the HTTP listener.
    ///
    /// Binding happens up front so startup failures abort immediately;
    /// there is no retry.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Bind`] or [`RuntimeError::HttpBind`] when a
    /// listener cannot be bound.
    pub async fn bind(config: ServerConfig) -> Result<Self, RuntimeError> {
        let requested = config.udp_addr();
        let socket = bind_udp(requested).map_err(|source| RuntimeError::Bind {
            addr: requested,
            source,
        })?;
        let udp_addr = socket.local_addr().map_err(|source| RuntimeError::Bind {
            addr: requested,
            source,
        })?;

        let http_listener = if config.http_enabled {
            let requested = config.http_addr();
            let listener =
                TcpListener::bind(requested)
                    .await
                    .map_err(|source| RuntimeError::HttpBind {
                        addr: requested,
                        source,
                    })?;
            let addr = listener
                .local_addr()
                .map_err(|source| RuntimeError::HttpBind {
                    addr: requested,
                    source,
                })?;
            Some((listener, addr))
        } else {
            None
        };

        Ok(Self {
            config,
            socket: Arc::new(socket),
            udp_addr,
            http_listener,
        })
    }

    /// Actual bound address of the discovery socket.
    #[must_use]
    pub fn udp_addr(&self) -> SocketAddr {
        self.udp_addr
    }

    /// Actual bound address of the HTTP listener, when enabled.
    #[must_use]
    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.http_listener.as_ref().map(|(_, addr)| *addr)
    }

    /// Serve until an OS interrupt/terminate signal arrives.
    ///
    /// # Errors
    ///
    /// Returns the first task failure that was not part of the
    /// coordinated shutdown.
    pub async fn run(self) -> Result<(), RuntimeError> {
        self.run_until(shutdown_signal()).await
    }

    /// Serve until `shutdown` resolves (tests drive this directly).
    ///
    /// # Errors
    ///
    /// Returns the first task failure that was not part of the
    /// coordinated shutdown.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), RuntimeError>
    where
        F: Future<Output = ()> + Send,
    {
        info!(addr = %self.udp_addr, mode = %self.config.mode, "discovery responder listening");

        let resolver: Box<dyn AddressResolver> = match self.config.mode {
            Mode::Origin => Box::new(SelfLookup::new(
                Arc::new(Ipify::new()?),
                self.config.remote_port,
            )),
            Mode::Relay => Box::new(ObservedPeer::new(self.config.remote_port)),
        };

        let responder = DiscoveryResponder::new(Arc::clone(&self.socket), resolver);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut discovery: Option<JoinHandle<io::Result<()>>> =
            Some(tokio::spawn(async move { responder.run(shutdown_rx).await }));

        let mut http: Option<JoinHandle<io::Result<()>>> = match self.http_listener {
            Some((listener, addr)) => {
                info!(addr = %addr, "health endpoints listening");
                let state = HealthState::new(
                    self.config.bind_ip,
                    self.udp_addr.port(),
                    self.config.remote_port,
                );
                let app = http::router(state).into_make_service_with_connect_info::<SocketAddr>();
                let mut rx = shutdown_tx.subscribe();
                Some(tokio::spawn(async move {
                    axum::serve(listener, app)
                        .with_graceful_shutdown(async move {
                            let _ = rx.changed().await;
                        })
                        .await
                }))
            }
            None => None,
        };

        // The first finished branch decides the outcome; the siblings are
        // then shut down cooperatively and drained below.
        let mut failure: Option<RuntimeError> = None;

        tokio::select! {
            () = shutdown => {
                info!("shutdown requested");
            }
            res = join_task(&mut discovery, RuntimeError::Discovery) => {
                failure = res.err();
            }
            res = join_task(&mut http, RuntimeError::Http) => {
                failure = res.err();
            }
        }

        let _ = shutdown_tx.send(true);

        if discovery.is_some() {
            match tokio::time::timeout(
                SHUTDOWN_GRACE,
                join_task(&mut discovery, RuntimeError::Discovery),
            )
            .await
            {
                Ok(res) => record_failure(&mut failure, res),
                Err(_) => {
                    warn!("discovery loop did not stop within the grace window, aborting");
                    abort(&mut discovery);
                }
            }
        }

        if http.is_some() {
            match tokio::time::timeout(SHUTDOWN_GRACE, join_task(&mut http, RuntimeError::Http))
                .await
            {
                Ok(res) => record_failure(&mut failure, res),
                Err(_) => {
                    warn!("http drain window elapsed, aborting listener");
                    abort(&mut http);
                }
            }
        }

        match failure {
            Some(err) => {
                error!(%err, "exit reason");
                Err(err)
            }
            None => {
                info!("graceful shutdown complete");
                Ok(())
            }
        }
    }
}

/// Bind the long-lived discovery socket with explicit socket options.
fn bind_udp(addr: SocketAddr) -> io::Result<UdpSocket> {
    let domain = if addr.is_ipv4() {
        socket2::Domain::IPV4
    } else {
        socket2::Domain::IPV6
    };

    let socket = socket2::Socket::new(domain, socket2::Type::DGRAM, Some(socket2::Protocol::UDP))?;
    socket.set_recv_buffer_size(SOCKET_BUFFER_SIZE)?;
    socket.set_send_buffer_size(SOCKET_BUFFER_SIZE)?;
    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}

/// Await an optional supervised task, flattening join and task errors.
///
/// Pends forever when the task is absent or already joined, so it can sit
/// in a `select!` arm without winning spuriously. The handle is kept in
/// place while polling; a cancelled await leaves it joinable.
async fn join_task(
    handle: &mut Option<JoinHandle<io::Result<()>>>,
    wrap: fn(io::Error) -> RuntimeError,
) -> Result<(), RuntimeError> {
    match handle.as_mut() {
        Some(task) => {
            let res = task.await;
            *handle = None;
            match res {
                Ok(Ok(())) => Ok(()),
                Ok(Err(err)) => Err(wrap(err)),
                Err(err) => Err(RuntimeError::Join(err)),
            }
        }
        None => std::future::pending().await,
    }
}

fn record_failure(failure: &mut Option<RuntimeError>, res: Result<(), RuntimeError>) {
    if let Err(err) = res {
        if failure.is_none() {
            *failure = Some(err);
        } else {
            error!(%err, "additional task failure during shutdown");
        }
    }
}

fn abort(handle: &mut Option<JoinHandle<io::Result<()>>>) {
    if let Some(task) = handle.take() {
        task.abort();
    }
}

/// Resolve when an interrupt or terminate signal arrives.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        // Registering a handler keeps SIGHUP from killing the process;
        // only interrupt/terminate stop the server.
        let _hangup = signal(SignalKind::hangup());
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    res = tokio::signal::ctrl_c() => {
                        if let Err(err) = res {
                            error!(%err, "interrupt handler failed");
                        }
                        info!("interrupt received");
                    }
                    _ = terminate.recv() => info!("terminate received"),
                }
            }
            Err(err) => {
                error!(%err, "terminate handler registration failed");
                if let Err(err) = tokio::signal::ctrl_c().await {
                    error!(%err, "interrupt handler failed");
                }
            }
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(%err, "interrupt handler failed");
        }
    }
}
