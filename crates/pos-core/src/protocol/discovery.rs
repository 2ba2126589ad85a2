//! LAN server discovery handshake.
//!
//! The wire format is two literal payloads: a kiosk broadcasts the ASCII
//! bytes `DISCOVER_POS_SERVER` to UDP port 5001 and the server answers the
//! sender with the ASCII bytes `POS_SERVER_HERE`.  There are no sequence
//! numbers, no version byte, and no encryption.
//!
//! # Trust boundary
//!
//! Discovery is unauthenticated.  Any host on the local network can answer a
//! broadcast and any host can ask.  The deployment trusts its LAN; nothing in
//! this module attempts to harden that.
//!
//! # How the handshake works (for beginners)
//!
//! ```text
//! Kiosk                                   Server
//! ─────                                   ──────
//! sendto(255.255.255.255:5001,
//!        "DISCOVER_POS_SERVER")  ───────►  recv_from() == request?
//!                                 ◄───────  sendto(src, "POS_SERVER_HERE")
//! src.ip() + APP_PORT = server endpoint
//! ```
//!
//! The reply carries no address: the kiosk takes the *source IP* of the
//! reply datagram and combines it with the separately-known application
//! port (5000) to reach the HTTP API.

use std::time::Duration;

/// Well-known UDP port the discovery responder listens on.
pub const DISCOVERY_PORT: u16 = 5001;

/// TCP port of the HTTP/JSON API.
pub const APP_PORT: u16 = 5000;

/// Payload a kiosk broadcasts to find the server.
pub const DISCOVERY_REQUEST: &[u8] = b"DISCOVER_POS_SERVER";

/// Payload the server replies with.
pub const DISCOVERY_RESPONSE: &[u8] = b"POS_SERVER_HERE";

/// How long a kiosk waits for a reply before falling back.
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Receive buffer size used on both sides of the handshake.
pub const MAX_DATAGRAM: usize = 1024;

/// Returns `true` when `payload` is exactly the discovery request.
pub fn is_discovery_request(payload: &[u8]) -> bool {
    payload == DISCOVERY_REQUEST
}

/// Returns `true` when `payload` is exactly the discovery response.
pub fn is_discovery_response(payload: &[u8]) -> bool {
    payload == DISCOVERY_RESPONSE
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_literal_matches_wire_bytes() {
        assert_eq!(DISCOVERY_REQUEST, "DISCOVER_POS_SERVER".as_bytes());
        assert_eq!(DISCOVERY_RESPONSE, "POS_SERVER_HERE".as_bytes());
    }

    #[test]
    fn test_is_discovery_request_accepts_exact_payload() {
        assert!(is_discovery_request(b"DISCOVER_POS_SERVER"));
    }

    #[test]
    fn test_is_discovery_request_rejects_near_misses() {
        // Arrange
        let near_misses: [&[u8]; 5] = [
            b"",
            b"DISCOVER_POS_SERVER\n",
            b"discover_pos_server",
            b"DISCOVER_POS_SERVE",
            b"POS_SERVER_HERE",
        ];

        // Act / Assert
        for payload in near_misses {
            assert!(
                !is_discovery_request(payload),
                "payload {payload:?} must not be treated as a request"
            );
        }
    }

    #[test]
    fn test_is_discovery_response_requires_exact_payload() {
        assert!(is_discovery_response(b"POS_SERVER_HERE"));
        assert!(!is_discovery_response(b"POS_SERVER_HERE "));
        assert!(!is_discovery_response(b"DISCOVER_POS_SERVER"));
    }

    #[test]
    fn test_default_ports_and_timeout() {
        assert_eq!(DISCOVERY_PORT, 5001);
        assert_eq!(APP_PORT, 5000);
        assert_eq!(DISCOVERY_TIMEOUT, Duration::from_secs(5));
    }

    #[test]
    fn test_payloads_fit_in_receive_buffer() {
        assert!(DISCOVERY_REQUEST.len() < MAX_DATAGRAM);
        assert!(DISCOVERY_RESPONSE.len() < MAX_DATAGRAM);
    }
}
