//! pos-kiosk library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does pos-kiosk do? (for beginners)
//!
//! A kiosk is a terminal that staff, teachers, and admins use to sell items
//! against a user's balance.  The kiosk application:
//!
//! 1. Broadcasts a discovery request once at start-up to find the server,
//!    falling back to `127.0.0.1:5000` when nobody answers within 5 seconds.
//! 2. Starts *locked*.  Unlocking requires either a per-role password
//!    (verified against the hash in this kiosk's server record) or a user
//!    token (RFID card or manual entry) matched against the user list.
//! 3. While unlocked, lists items, builds a cart, and submits sales for the
//!    user bound to the session.
//! 4. Drops into an *error* screen whenever the server cannot be reached;
//!    only an explicit Retry re-runs discovery and returns to the lock screen.

/// Application layer: state machine, sessions, and user-facing actions.
pub mod application;

/// Infrastructure layer: discovery socket, HTTP client, token readers,
/// terminal front end, and configuration.
pub mod infrastructure;
