//! pos-server library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does pos-server do? (for beginners)
//!
//! The server is the single source of truth for users, items, sales, and
//! kiosk records.  It runs two independent listeners for the whole process
//! lifetime:
//!
//! 1. A UDP discovery responder on port 5001 (a dedicated thread) that
//!    answers `DISCOVER_POS_SERVER` broadcasts so kiosks can find it.
//! 2. An HTTP/JSON API on port 5000 (Tokio tasks) that kiosks use once they
//!    know the server's address.
//!
//! Neither listener waits on the other; they share nothing but the shutdown
//! flag.

pub mod application;
pub mod infrastructure;
