//! Connectivity state machine: which screen the kiosk is on.
//!
//! # States and transitions
//!
//! ```text
//!                 unlock(role)
//!   ┌────────┐ ───────────────► ┌──────────────┐
//!   │ Locked │                  │ Unlocked(role)│
//!   └────────┘ ◄─────────────── └──────────────┘
//!     ▲   │         lock()              │
//!     │   │ enter_error()               │ enter_error()
//!     │   ▼                             ▼
//!     │  ┌───────────────────────────────┐
//!     └──│             Error             │
//! recover() (after rediscovery)
//!        └───────────────────────────────┘
//! ```
//!
//! The machine starts `Locked` and never terminates.  Every transition emits
//! exactly one [`ScreenSink::show`] call.
//!
//! # Re-entrancy guard
//!
//! Several failures can arrive back to back (e.g. a failed sale followed by a
//! failed item reload).  Only the first one may switch screens; the
//! `error_mode_active` guard turns later calls into no-ops until
//! [`ConnectivityStateMachine::recover`] clears it.

use pos_core::Role;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Screen currently presented to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Lock,
    Main,
    Error,
}

/// A message for the operator that does not change the screen.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Info(String),
    Warning(String),
}

/// Where screen switches and notices are rendered.
pub trait ScreenSink {
    fn show(&mut self, screen: Screen);
    fn notify(&mut self, notice: Notice);
}

/// Connectivity state of the kiosk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KioskState {
    Locked,
    Unlocked(Role),
    Error,
}

impl KioskState {
    /// The screen that corresponds to this state.
    pub fn screen(self) -> Screen {
        match self {
            KioskState::Locked => Screen::Lock,
            KioskState::Unlocked(_) => Screen::Main,
            KioskState::Error => Screen::Error,
        }
    }
}

/// A transition that is not allowed from the current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {event} while {from:?}")]
pub struct TransitionError {
    pub from: KioskState,
    pub event: &'static str,
}

/// The kiosk's connectivity state machine.
pub struct ConnectivityStateMachine<S> {
    state: KioskState,
    error_mode_active: bool,
    sink: S,
}

impl<S: ScreenSink> ConnectivityStateMachine<S> {
    /// Creates a machine in the `Locked` state.  Nothing is shown until
    /// [`present`](Self::present) is called.
    pub fn new(sink: S) -> Self {
        Self {
            state: KioskState::Locked,
            error_mode_active: false,
            sink,
        }
    }

    pub fn state(&self) -> KioskState {
        self.state
    }

    /// The unlocked role, if any.
    pub fn role(&self) -> Option<Role> {
        match self.state {
            KioskState::Unlocked(role) => Some(role),
            _ => None,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Shows the screen for the current state without transitioning.
    pub fn present(&mut self) {
        self.sink.show(self.state.screen());
    }

    /// `Locked → Unlocked(role)` after a successful authentication.
    ///
    /// # Errors
    ///
    /// Fails from any state other than `Locked`; a role change always goes
    /// through locking and re-authenticating.
    pub fn unlock(&mut self, role: Role) -> Result<(), TransitionError> {
        if self.state != KioskState::Locked {
            return Err(TransitionError {
                from: self.state,
                event: "unlock",
            });
        }
        info!("kiosk unlocked as {role}");
        self.transition(KioskState::Unlocked(role));
        Ok(())
    }

    /// `Unlocked(role) → Locked` on the operator's lock action.
    ///
    /// # Errors
    ///
    /// Fails unless the kiosk is unlocked.
    pub fn lock(&mut self) -> Result<(), TransitionError> {
        if !matches!(self.state, KioskState::Unlocked(_)) {
            return Err(TransitionError {
                from: self.state,
                event: "lock",
            });
        }
        info!("kiosk locked");
        self.transition(KioskState::Locked);
        Ok(())
    }

    /// `Locked | Unlocked(role) → Error` on a connectivity failure.
    ///
    /// Returns `true` if this call switched to the error screen and `false`
    /// if the machine was already in error mode (no side effects).
    pub fn enter_error(&mut self) -> bool {
        if self.error_mode_active {
            debug!("already in error mode; ignoring repeated failure");
            return false;
        }
        self.error_mode_active = true;
        warn!("entering error mode");
        self.transition(KioskState::Error);
        true
    }

    /// `Error → Locked` once the operator's retry has re-run discovery.
    ///
    /// # Errors
    ///
    /// Fails unless the kiosk is in the `Error` state.
    pub fn recover(&mut self) -> Result<(), TransitionError> {
        if self.state != KioskState::Error {
            return Err(TransitionError {
                from: self.state,
                event: "recover",
            });
        }
        self.error_mode_active = false;
        info!("leaving error mode");
        self.transition(KioskState::Locked);
        Ok(())
    }

    fn transition(&mut self, next: KioskState) {
        debug!("state {:?} -> {:?}", self.state, next);
        self.state = next;
        self.sink.show(next.screen());
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        screens: Vec<Screen>,
        notices: Vec<Notice>,
    }

    impl ScreenSink for RecordingSink {
        fn show(&mut self, screen: Screen) {
            self.screens.push(screen);
        }
        fn notify(&mut self, notice: Notice) {
            self.notices.push(notice);
        }
    }

    fn machine() -> ConnectivityStateMachine<RecordingSink> {
        ConnectivityStateMachine::new(RecordingSink::default())
    }

    #[test]
    fn test_initial_state_is_locked_and_silent() {
        let m = machine();
        assert_eq!(m.state(), KioskState::Locked);
        assert!(m.sink().screens.is_empty());
    }

    #[test]
    fn test_present_shows_current_screen() {
        let mut m = machine();
        m.present();
        assert_eq!(m.sink().screens, vec![Screen::Lock]);
    }

    #[test]
    fn test_unlock_from_locked_shows_main_screen() {
        // Arrange
        let mut m = machine();

        // Act
        m.unlock(Role::Admin).unwrap();

        // Assert
        assert_eq!(m.state(), KioskState::Unlocked(Role::Admin));
        assert_eq!(m.role(), Some(Role::Admin));
        assert_eq!(m.sink().screens, vec![Screen::Main]);
    }

    #[test]
    fn test_unlock_while_unlocked_is_rejected() {
        // Arrange
        let mut m = machine();
        m.unlock(Role::KioskStaff).unwrap();

        // Act
        let result = m.unlock(Role::Admin);

        // Assert: no in-place role escalation.
        assert_eq!(
            result,
            Err(TransitionError {
                from: KioskState::Unlocked(Role::KioskStaff),
                event: "unlock"
            })
        );
        assert_eq!(m.role(), Some(Role::KioskStaff));
    }

    #[test]
    fn test_lock_returns_to_lock_screen() {
        let mut m = machine();
        m.unlock(Role::Teacher).unwrap();
        m.lock().unwrap();
        assert_eq!(m.state(), KioskState::Locked);
        assert_eq!(m.sink().screens, vec![Screen::Main, Screen::Lock]);
    }

    #[test]
    fn test_lock_while_locked_is_rejected() {
        let mut m = machine();
        assert!(m.lock().is_err());
        assert!(m.sink().screens.is_empty());
    }

    #[test]
    fn test_enter_error_from_locked_and_unlocked() {
        let mut a = machine();
        assert!(a.enter_error());
        assert_eq!(a.state(), KioskState::Error);

        let mut b = machine();
        b.unlock(Role::Teacher).unwrap();
        assert!(b.enter_error());
        assert_eq!(b.state(), KioskState::Error);
        assert_eq!(b.role(), None);
    }

    #[test]
    fn test_repeated_errors_switch_screen_once() {
        // Arrange
        let mut m = machine();

        // Act
        let first = m.enter_error();
        let second = m.enter_error();

        // Assert
        assert!(first);
        assert!(!second);
        assert_eq!(m.sink().screens, vec![Screen::Error]);
    }

    #[test]
    fn test_unlock_and_lock_rejected_in_error_mode() {
        let mut m = machine();
        m.enter_error();
        assert!(m.unlock(Role::Admin).is_err());
        assert!(m.lock().is_err());
        assert_eq!(m.state(), KioskState::Error);
    }

    #[test]
    fn test_recover_returns_to_locked_and_rearms_guard() {
        // Arrange
        let mut m = machine();
        m.enter_error();

        // Act
        m.recover().unwrap();
        let again = m.enter_error();

        // Assert
        assert!(again, "a fresh failure after recovery must switch screens again");
        assert_eq!(m.sink().screens, vec![Screen::Error, Screen::Lock, Screen::Error]);
    }

    #[test]
    fn test_recover_outside_error_is_rejected() {
        let mut m = machine();
        assert!(m.recover().is_err());
    }

    #[test]
    fn test_sink_mut_forwards_notices() {
        let mut m = machine();
        m.sink_mut().notify(Notice::Info("hello".into()));
        assert_eq!(m.sink().notices, vec![Notice::Info("hello".into())]);
    }
}
