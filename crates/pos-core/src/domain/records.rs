//! JSON records exchanged over the HTTP API.
//!
//! Field names match the JSON bodies exactly (`user_id`, `total_price`, ...)
//! so the structs can be used directly with `axum::Json` on the server and
//! `reqwest`'s `.json()` on the kiosk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::role::{Privilege, Role};

/// A user as returned by `GET /api/users`.
///
/// The credential hash never leaves the server; kiosks only see identity,
/// privilege, and the optional RFID token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u32,
    pub username: String,
    pub privilege: Privilege,
    #[serde(default)]
    pub rfid: Option<String>,
}

/// Body of `POST /api/users`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub privilege: Privilege,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rfid: Option<String>,
}

/// A sellable item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: u32,
    pub name: String,
    pub price: f64,
}

/// Body of `POST /api/items`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub price: f64,
}

/// A recorded sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: u32,
    pub user_id: u32,
    pub item_id: u32,
    pub quantity: u32,
    pub total_price: f64,
    pub timestamp: DateTime<Utc>,
}

/// Body of `POST /api/sales`.
///
/// Manual charges that are not tied to a catalogue item use `item_id` 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSale {
    pub user_id: u32,
    pub item_id: u32,
    pub quantity: u32,
    pub total_price: f64,
}

impl NewSale {
    /// Item id used for charges that do not reference a catalogue item.
    pub const NO_ITEM: u32 = 0;
}

/// Operational status of a kiosk terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KioskStatus {
    #[default]
    Normal,
    Maintenance,
    Error,
}

/// Per-terminal record as returned by `GET /api/kiosks`.
///
/// Includes the per-role password hashes: kiosks verify passwords locally,
/// which is the same LAN trust the discovery handshake relies on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KioskRecord {
    pub id: u32,
    pub name: String,
    pub password_kiosk: String,
    pub password_teacher: String,
    pub password_admin: String,
    #[serde(default)]
    pub status: KioskStatus,
    #[serde(default)]
    pub ip_address: Option<String>,
}

impl KioskRecord {
    /// Returns the stored credential hash for `role`.
    pub fn password_hash_for(&self, role: Role) -> &str {
        match role {
            Role::KioskStaff => &self.password_kiosk,
            Role::Teacher => &self.password_teacher,
            Role::Admin => &self.password_admin,
        }
    }
}

/// Body of `POST /api/kiosks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewKiosk {
    pub name: String,
}

/// Body of `PUT /api/kiosk/{id}`.  Absent fields are left unchanged.
///
/// Password fields carry *plaintext*; the server hashes them before storing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KioskUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<KioskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_kiosk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_teacher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_admin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

/// Body of `GET /api/discover`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub server_ip: String,
    pub port: u16,
}

/// Success envelope for mutating endpoints: `{"message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    pub message: String,
}

impl ApiMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure envelope: `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
