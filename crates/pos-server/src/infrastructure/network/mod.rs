//! Network infrastructure for the server application.
//!
//! - **`discovery`** – UDP responder answering kiosk broadcasts.
//! - [`local_ip`] – the LAN address advertised by `GET /api/discover`.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

pub mod discovery;

/// Returns the IPv4 address of the interface used for outbound traffic.
///
/// "Connecting" a UDP socket only selects a route; no packet is sent.  Falls
/// back to `127.0.0.1` when the host has no route (e.g. an offline LAN).
pub fn local_ip() -> IpAddr {
    probe_local_ip().unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

fn probe_local_ip() -> std::io::Result<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect("8.8.8.8:80")?;
    Ok(socket.local_addr()?.ip())
}
