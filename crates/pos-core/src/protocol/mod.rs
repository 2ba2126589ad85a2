//! Protocol module containing the LAN discovery handshake.

pub mod discovery;
