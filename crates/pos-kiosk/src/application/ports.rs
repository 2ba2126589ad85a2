//! Traits the kiosk's infrastructure implements, and the types they share.
//!
//! The application layer never opens a socket itself.  It asks a
//! [`ServerLocator`] where the server is, talks to it through [`PosApi`], and
//! reads user tokens through [`TokenSource`].  Tests substitute fakes for all
//! three.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use async_trait::async_trait;
use pos_core::{Item, KioskRecord, NewItem, NewSale, ServerInfo, User, APP_PORT};
use thiserror::Error;

// ── Server endpoint ───────────────────────────────────────────────────────────

/// Address of the server's HTTP API.
///
/// Resolved at runtime by discovery, never persisted.  Once set it is only
/// replaced as a whole, on an explicit retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServerEndpoint {
    addr: SocketAddr,
}

impl ServerEndpoint {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// The endpoint used when discovery gets no answer: `127.0.0.1:5000`.
    pub fn fallback() -> Self {
        Self::new(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), APP_PORT))
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL without a trailing slash, e.g. `http://192.168.1.20:5000`.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Full URL for an API path such as `/api/items`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.addr.fmt(f)
    }
}

// ── Discovery ─────────────────────────────────────────────────────────────────

/// How an endpoint was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoverySource {
    /// A server answered the broadcast.
    Discovered,
    /// Nobody answered (or the socket failed); the fallback endpoint is in
    /// use.  Carries the reason for logging.
    Fallback(String),
}

/// Result of one discovery run.  Discovery itself never fails: a timeout
/// degrades to the fallback endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub endpoint: ServerEndpoint,
    pub source: DiscoverySource,
}

impl Discovery {
    pub fn discovered(endpoint: ServerEndpoint) -> Self {
        Self {
            endpoint,
            source: DiscoverySource::Discovered,
        }
    }

    pub fn fallback(endpoint: ServerEndpoint, reason: impl Into<String>) -> Self {
        Self {
            endpoint,
            source: DiscoverySource::Fallback(reason.into()),
        }
    }

    /// `true` when the endpoint is the fallback rather than a real answer.
    pub fn is_degraded(&self) -> bool {
        matches!(self.source, DiscoverySource::Fallback(_))
    }
}

/// Finds the server on the local network.
///
/// Implementations must not retry on their own; callers invoke this once at
/// start-up and once per explicit user retry.
#[async_trait]
pub trait ServerLocator: Send + Sync {
    async fn locate(&self) -> Discovery;
}

// ── HTTP API ──────────────────────────────────────────────────────────────────

/// Any failure talking to the server.
///
/// The application treats every variant the same way (the server is
/// unavailable), but keeps them apart for logging.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connect, timeout, or other transport failure.
    #[error("request to {path} failed: {message}")]
    Transport { path: String, message: String },
    /// The server answered with a non-success status.
    #[error("{path} returned HTTP {status}")]
    Status { path: String, status: u16 },
    /// The body could not be decoded.
    #[error("unexpected response body from {path}: {message}")]
    Decode { path: String, message: String },
}

/// The server's HTTP/JSON API as the kiosk uses it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PosApi: Send + Sync {
    /// `GET /api/kiosks`
    async fn list_kiosks(&self, endpoint: &ServerEndpoint) -> Result<Vec<KioskRecord>, ApiError>;
    /// `GET /api/users`
    async fn list_users(&self, endpoint: &ServerEndpoint) -> Result<Vec<User>, ApiError>;
    /// `GET /api/items`
    async fn list_items(&self, endpoint: &ServerEndpoint) -> Result<Vec<Item>, ApiError>;
    /// `POST /api/items`
    async fn add_item(&self, endpoint: &ServerEndpoint, item: &NewItem) -> Result<(), ApiError>;
    /// `POST /api/sales`
    async fn record_sale(&self, endpoint: &ServerEndpoint, sale: &NewSale) -> Result<(), ApiError>;
    /// `GET /api/discover`
    async fn server_info(&self, endpoint: &ServerEndpoint) -> Result<ServerInfo, ApiError>;
}

// ── Token sources ─────────────────────────────────────────────────────────────

/// Failure of a token source.
#[derive(Debug, Error)]
pub enum TokenSourceError {
    /// The hardware reader is missing or stopped working.  Handled by falling
    /// back to manual entry; never escalates to the error screen.
    #[error("token reader unavailable: {0}")]
    HardwareUnavailable(String),
    /// Reading from the operator's terminal failed.
    #[error("manual entry failed: {0}")]
    Input(#[source] std::io::Error),
}

/// Something that yields a user's token: an RFID reader or a person typing.
#[async_trait]
pub trait TokenSource: Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Whether the source can be used right now.
    fn is_available(&self) -> bool;

    /// Reads one token.  `Ok(None)` means nothing was presented or entered.
    async fn read_token(&mut self) -> Result<Option<String>, TokenSourceError>;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
