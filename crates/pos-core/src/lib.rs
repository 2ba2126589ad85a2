//! # pos-core
//!
//! Shared library for the POS system containing the LAN discovery protocol
//! constants, the records exchanged over the HTTP/JSON API, and the
//! credential hashing used for kiosk passwords.
//!
//! This crate is used by both the server and the kiosk applications.
//! It has no dependencies on sockets or HTTP stacks; the only environment
//! access is resolving the config directory in `paths`.
//!
//! # Architecture overview (for beginners)
//!
//! The POS deployment consists of one central server holding users, items,
//! and sales, plus one or more kiosk terminals that sell items on behalf of
//! staff, teachers, and admins.  Kiosks locate the server with a UDP
//! broadcast handshake and then talk to it over plain HTTP/JSON.
//!
//! - **`protocol`** – The bit-exact discovery handshake: the well-known
//!   port and the two literal payloads.
//!
//! - **`domain`** – Roles, privileges, and the JSON records both sides
//!   agree on (`User`, `Item`, `Sale`, `KioskRecord`, request bodies).
//!
//! - **`credential`** – Salted PBKDF2 password hashes in the
//!   `pbkdf2:sha256:<iterations>$<salt>$<digest>` text format.
//!
//! - **`paths`** – Where both binaries look for their TOML config.

pub mod credential;
pub mod domain;
pub mod paths;
pub mod protocol;

pub use credential::{hash_password, hash_password_with, verify_password};
pub use domain::records::{
    ApiErrorBody, ApiMessage, Item, KioskRecord, KioskStatus, KioskUpdate, NewItem, NewKiosk,
    NewSale, NewUser, Sale, ServerInfo, User,
};
pub use domain::role::{Privilege, Role, RoleParseError};
pub use protocol::discovery::{
    is_discovery_request, is_discovery_response, APP_PORT, DISCOVERY_PORT, DISCOVERY_REQUEST,
    DISCOVERY_RESPONSE, DISCOVERY_TIMEOUT,
};
