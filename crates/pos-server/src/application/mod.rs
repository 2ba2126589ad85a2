//! Application layer for the server.
//!
//! - **`store`** – The in-memory record store behind the HTTP API, with an
//!   optional JSON snapshot on disk.  It knows nothing about HTTP; handlers
//!   translate its results into responses.

pub mod store;
