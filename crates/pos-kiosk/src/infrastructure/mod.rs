//! Infrastructure layer for the kiosk application.
//!
//! Contains OS-facing adapters: the UDP discovery client, the HTTP API
//! client, token readers, the terminal front end, and configuration storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `pos_core`, but MUST NOT be imported by the `application` layer.

pub mod api;
pub mod console;
pub mod discovery;
pub mod storage;
pub mod token_source;
