//! Infrastructure layer for the server application.
//!
//! Contains OS-facing adapters: the UDP discovery socket, the HTTP listener,
//! and file-system configuration.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `pos_core`, but MUST NOT be imported by the `application` layer.

pub mod http;
pub mod network;
pub mod storage;
