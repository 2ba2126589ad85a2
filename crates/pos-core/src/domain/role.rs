//! Kiosk roles and server-side user privileges.
//!
//! A [`Role`] is what an *unlocked kiosk* is allowed to do.  A [`Privilege`]
//! is what the server records for a *user*.  The two overlap but are not the
//! same: students exist as users (they buy things) but there is no student
//! kiosk mode.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a role or privilege string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0:?}")]
pub struct RoleParseError(pub String);

/// The mode an unlocked kiosk operates in.
///
/// Permissions grow from `KioskStaff` to `Admin`:
///
/// | Role         | Sell from cart | Manual charge | Manage items |
/// |--------------|----------------|---------------|--------------|
/// | `KioskStaff` | yes            | no            | no           |
/// | `Teacher`    | yes            | yes           | no           |
/// | `Admin`      | yes            | yes           | yes          |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    KioskStaff,
    Teacher,
    Admin,
}

impl Role {
    /// All roles, in increasing order of privilege.
    pub const ALL: [Role; 3] = [Role::KioskStaff, Role::Teacher, Role::Admin];

    /// Wire name of the role (`kiosk_staff`, `teacher`, `admin`).
    pub fn as_str(self) -> &'static str {
        match self {
            Role::KioskStaff => "kiosk_staff",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }

    /// Whether this role may charge an arbitrary amount to a user id.
    pub fn can_manual_charge(self) -> bool {
        matches!(self, Role::Teacher | Role::Admin)
    }

    /// Whether this role may add items to the catalogue.
    pub fn can_manage_items(self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "kiosk_staff" => Ok(Role::KioskStaff),
            "teacher" => Ok(Role::Teacher),
            "admin" => Ok(Role::Admin),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}

/// Privilege level stored on a server-side user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Privilege {
    Student,
    KioskStaff,
    Teacher,
    Admin,
}

impl Privilege {
    /// The kiosk role granted when this user authenticates by token.
    ///
    /// Students have no kiosk mode of their own and get the least privileged
    /// role; their identity is still bound to the session for checkout.
    pub fn kiosk_role(self) -> Role {
        match self {
            Privilege::Student | Privilege::KioskStaff => Role::KioskStaff,
            Privilege::Teacher => Role::Teacher,
            Privilege::Admin => Role::Admin,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Privilege::Student => "student",
            Privilege::KioskStaff => "kiosk_staff",
            Privilege::Teacher => "teacher",
            Privilege::Admin => "admin",
        }
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Privilege {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "student" => Ok(Privilege::Student),
            "kiosk_staff" => Ok(Privilege::KioskStaff),
            "teacher" => Ok(Privilege::Teacher),
            "admin" => Ok(Privilege::Admin),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
