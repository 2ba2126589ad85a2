//! UDP discovery client.
//!
//! Broadcasts `DISCOVER_POS_SERVER` once and waits for `POS_SERVER_HERE`.
//! The sender of the first matching reply is the server; its IP address is
//! combined with the (separately known) application port to form the
//! [`ServerEndpoint`].
//!
//! # Trust
//!
//! Discovery is unauthenticated: whoever answers first on the local network
//! is taken to be the server.  The kiosk relies on the LAN being trusted.
//!
//! # No automatic retry
//!
//! [`DiscoveryClient::discover`] sends exactly one request.  The kiosk calls
//! it at start-up and again only when the operator presses Retry.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use async_trait::async_trait;
use pos_core::protocol::discovery::MAX_DATAGRAM;
use pos_core::{is_discovery_response, APP_PORT, DISCOVERY_PORT, DISCOVERY_REQUEST, DISCOVERY_TIMEOUT};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::application::ports::{Discovery, ServerEndpoint, ServerLocator};

/// Errors from a single discovery run.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// No `POS_SERVER_HERE` arrived before the deadline.
    #[error("no discovery reply within {0:?}")]
    Timeout(Duration),
    /// The socket could not be opened, configured, or used.
    #[error("discovery socket error: {0}")]
    Io(#[from] std::io::Error),
}

/// Settings for the discovery client.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Where the request is sent.  The limited broadcast address by default.
    pub target: SocketAddr,
    /// How long to wait for a reply.
    pub timeout: Duration,
    /// HTTP port combined with the replying host.
    pub app_port: u16,
    /// Endpoint used when discovery fails.
    pub fallback: ServerEndpoint,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            target: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, DISCOVERY_PORT)),
            timeout: DISCOVERY_TIMEOUT,
            app_port: APP_PORT,
            fallback: ServerEndpoint::fallback(),
        }
    }
}

/// Finds the server with one broadcast.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryClient {
    config: DiscoveryConfig,
}

impl DiscoveryClient {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Sends one request and returns the endpoint of the first server that
    /// answers with the exact response payload.
    ///
    /// Datagrams with any other payload are ignored until the deadline.
    ///
    /// # Errors
    ///
    /// [`DiscoveryError::Timeout`] if nobody answers in time, and
    /// [`DiscoveryError::Io`] for socket failures.
    pub async fn discover(&self) -> Result<ServerEndpoint, DiscoveryError> {
        let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)).await?;
        socket.set_broadcast(true)?;

        let deadline = Instant::now() + self.config.timeout;
        socket.send_to(DISCOVERY_REQUEST, self.config.target).await?;
        debug!("discovery request sent to {}", self.config.target);

        let mut buf = [0u8; MAX_DATAGRAM];
        loop {
            let (len, src) = match timeout_at(deadline, socket.recv_from(&mut buf)).await {
                Ok(result) => result?,
                Err(_) => return Err(DiscoveryError::Timeout(self.config.timeout)),
            };
            if is_discovery_response(&buf[..len]) {
                let endpoint = ServerEndpoint::new(SocketAddr::new(src.ip(), self.config.app_port));
                info!("discovery reply from {src}");
                return Ok(endpoint);
            }
            debug!("ignoring {len}-byte datagram from {src}");
        }
    }
}

#[async_trait]
impl ServerLocator for DiscoveryClient {
    async fn locate(&self) -> Discovery {
        match self.discover().await {
            Ok(endpoint) => Discovery::discovered(endpoint),
            Err(e) => {
                warn!("discovery failed, using {}: {e}", self.config.fallback);
                Discovery::fallback(self.config.fallback, e.to_string())
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_targets_broadcast_discovery_port() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.target.to_string(), "255.255.255.255:5001");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.app_port, 5000);
        assert_eq!(config.fallback.to_string(), "127.0.0.1:5000");
    }

    #[tokio::test]
    async fn test_ignores_wrong_payload_then_accepts_response() {
        // Arrange: a fake server that first sends junk, then the real reply.
        let fake = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let fake_addr = fake.local_addr().unwrap();
        let client = DiscoveryClient::new(DiscoveryConfig {
            target: fake_addr,
            timeout: Duration::from_secs(2),
            app_port: 8123,
            fallback: ServerEndpoint::fallback(),
        });
        let server = tokio::spawn(async move {
            let mut buf = [0u8; MAX_DATAGRAM];
            let (len, src) = fake.recv_from(&mut buf).await.unwrap();
            assert_eq!(&buf[..len], DISCOVERY_REQUEST);
            fake.send_to(b"POS_SERVER_HERE?", src).await.unwrap();
            fake.send_to(b"POS_SERVER_HERE", src).await.unwrap();
        });

        // Act
        let endpoint = client.discover().await.unwrap();

        // Assert
        assert_eq!(endpoint.to_string(), "127.0.0.1:8123");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_silence_times_out_and_locate_falls_back() {
        // Arrange: a bound socket that never answers.
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let client = DiscoveryClient::new(DiscoveryConfig {
            target: silent.local_addr().unwrap(),
            timeout: Duration::from_millis(200),
            ..DiscoveryConfig::default()
        });

        // Act
        let discovery = client.locate().await;

        // Assert
        assert!(discovery.is_degraded());
        assert_eq!(discovery.endpoint, ServerEndpoint::fallback());
    }
}
