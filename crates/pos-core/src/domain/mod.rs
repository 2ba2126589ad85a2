//! Domain entities for the POS system.
//!
//! This module contains pure data types with no infrastructure dependencies.
//! The server owns and persists these records; kiosks only read them (and
//! submit new items and sales) through the HTTP API.

/// Kiosk roles and server-side user privileges.
pub mod role;

/// JSON records exchanged over the HTTP API.
pub mod records;
