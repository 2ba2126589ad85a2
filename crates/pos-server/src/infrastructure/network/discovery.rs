//! UDP discovery responder.
//!
//! The server binds a UDP socket on the discovery port (default 5001) and
//! answers kiosk broadcasts.  For every inbound datagram it:
//!
//! 1. Compares the payload byte-for-byte with `DISCOVER_POS_SERVER`.
//! 2. On a match, sends exactly `POS_SERVER_HERE` back to the sender's
//!    source address.
//! 3. Otherwise drops the datagram silently and keeps listening.
//!
//! There is no authentication: any host on the LAN can ask and the server
//! always answers.  The deployment trusts its local network.
//!
//! The responder runs on a dedicated thread with blocking socket I/O so it
//! never competes with the Tokio runtime that serves the HTTP API.
//!
//! # Read timeout
//!
//! The socket is configured with a short read timeout.  `recv_from` blocks
//! for at most that long before returning a timeout error; on each timeout
//! we check the `running` flag and exit the loop once the process is
//! shutting down.

use std::net::{SocketAddr, UdpSocket};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::JoinHandle;
use std::time::Duration;

use pos_core::protocol::discovery::{is_discovery_request, DISCOVERY_RESPONSE, MAX_DATAGRAM};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// How long a single `recv_from` may block before the shutdown flag is polled.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Error type for discovery responder start-up.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The UDP socket could not be bound.
    #[error("failed to bind discovery socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// The socket could not be configured.
    #[error("failed to configure discovery socket: {0}")]
    Configure(#[source] std::io::Error),
    /// The responder thread could not be spawned.
    #[error("failed to spawn discovery thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Handle to a running discovery responder.
#[derive(Debug)]
pub struct DiscoveryResponder {
    local_addr: SocketAddr,
    thread: JoinHandle<()>,
}

impl DiscoveryResponder {
    /// The address the responder socket is actually bound to.
    ///
    /// Differs from the requested address when port 0 was requested.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits for the responder thread to finish.
    ///
    /// The thread only exits after the `running` flag passed to
    /// [`start_discovery_responder`] has been cleared.
    pub fn join(self) {
        if self.thread.join().is_err() {
            error!("discovery responder thread panicked");
        }
    }
}

/// Binds a UDP socket on `bind_addr` and spawns a background thread that
/// answers discovery requests until `running` is cleared.
///
/// # Errors
///
/// Returns [`DiscoveryError::BindFailed`] if the socket cannot be bound.
pub fn start_discovery_responder(
    bind_addr: SocketAddr,
    running: Arc<AtomicBool>,
) -> Result<DiscoveryResponder, DiscoveryError> {
    let socket = UdpSocket::bind(bind_addr).map_err(|source| DiscoveryError::BindFailed {
        addr: bind_addr,
        source,
    })?;
    socket
        .set_read_timeout(Some(POLL_INTERVAL))
        .map_err(DiscoveryError::Configure)?;
    let local_addr = socket.local_addr().map_err(DiscoveryError::Configure)?;

    let thread = std::thread::Builder::new()
        .name("pos-discovery".to_string())
        .spawn(move || discovery_loop(socket, running))
        .map_err(DiscoveryError::Spawn)?;

    info!("discovery responder listening on UDP {local_addr}");
    Ok(DiscoveryResponder { local_addr, thread })
}

/// Decides how to answer a single datagram.
///
/// Returns the reply payload for a discovery request and `None` for anything
/// else.
pub fn handle_datagram(payload: &[u8]) -> Option<&'static [u8]> {
    is_discovery_request(payload).then_some(DISCOVERY_RESPONSE)
}

/// The main receive loop executed on the discovery thread.
fn discovery_loop(socket: UdpSocket, running: Arc<AtomicBool>) {
    let mut buf = [0u8; MAX_DATAGRAM];

    while running.load(Ordering::Relaxed) {
        let (len, src) = match socket.recv_from(&mut buf) {
            Ok(pair) => pair,
            Err(e) if is_timeout_error(&e) => continue,
            Err(e) => {
                // e.g. ICMP port-unreachable surfacing as ConnectionReset on Windows.
                warn!("discovery recv error: {e}");
                continue;
            }
        };

        match handle_datagram(&buf[..len]) {
            Some(reply) => match socket.send_to(reply, src) {
                Ok(_) => info!("responded to discovery from {src}"),
                Err(e) => warn!("failed to answer discovery from {src}: {e}"),
            },
            None => debug!("ignoring {len}-byte datagram from {src}"),
        }
    }

    info!("discovery responder stopped");
}

/// Returns `true` for OS timeout / would-block errors that should be retried.
fn is_timeout_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
