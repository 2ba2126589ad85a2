//! Application layer for the kiosk.
//!
//! Everything here talks to the outside world only through traits
//! ([`ports::PosApi`], [`ports::ServerLocator`], [`state_machine::ScreenSink`],
//! and the token sources), so the whole kiosk flow can be driven in tests
//! without sockets.
//!
//! - **`ports`** – The traits the infrastructure implements, plus the
//!   `ServerEndpoint` they share.
//! - **`state_machine`** – `Locked` / `Unlocked(role)` / `Error` transitions
//!   and the re-entrancy guard on the error screen.
//! - **`session`** – The explicit per-unlock session object: role, bound
//!   user, and cart.
//! - **`gate`** – Password and token authentication.
//! - **`kiosk`** – The controller that runs one user action to completion
//!   and funnels every network failure into the error state.

pub mod gate;
pub mod kiosk;
pub mod ports;
pub mod session;
pub mod state_machine;
