//! KioskController: runs one user action at a time against the server.
//!
//! The controller owns the resolved [`ServerEndpoint`], the connectivity
//! state machine, and the current [`KioskSession`].  Each public action runs
//! to completion before the next one starts (the caller holds `&mut self`),
//! so no locking is needed anywhere in the kiosk.
//!
//! # Failure handling
//!
//! Every [`ApiError`] is caught inside the action that caused it and routed
//! through [`KioskController::fail`], which drops the session and asks the
//! state machine to enter `Error`.  Nothing propagates to the caller; the
//! returned [`ActionStatus`] only reports what happened.
//!
//! Local refusals (wrong password, missing permission, checkout without a
//! bound user) never touch the network and never leave the current state.

use pos_core::{Item, NewItem, NewSale, Role, ServerInfo};
use tracing::{debug, info, warn};

use crate::application::gate::{self, AuthOutcome, TokenSources};
use crate::application::ports::{ApiError, PosApi, ServerEndpoint, ServerLocator};
use crate::application::session::KioskSession;
use crate::application::state_machine::{
    ConnectivityStateMachine, KioskState, Notice, ScreenSink,
};

/// What a user action ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    /// The action did what was asked.
    Completed,
    /// Refused locally (mismatch, permission, validation).  No state change.
    Rejected,
    /// Not applicable in the current state; nothing happened.
    Ignored,
    /// A network failure moved the kiosk to the error screen.
    Failed,
}

/// The kiosk application, parameterised over its outside-world ports.
pub struct KioskController<A, L, S> {
    api: A,
    locator: L,
    machine: ConnectivityStateMachine<S>,
    endpoint: ServerEndpoint,
    kiosk_id: u32,
    session: Option<KioskSession>,
    items: Vec<Item>,
}

impl<A, L, S> KioskController<A, L, S>
where
    A: PosApi,
    L: ServerLocator,
    S: ScreenSink,
{
    /// Creates a locked controller.  The endpoint is the fallback until
    /// [`start`](Self::start) runs discovery.
    pub fn new(api: A, locator: L, sink: S, kiosk_id: u32) -> Self {
        Self {
            api,
            locator,
            machine: ConnectivityStateMachine::new(sink),
            endpoint: ServerEndpoint::fallback(),
            kiosk_id,
            session: None,
            items: Vec::new(),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn state(&self) -> KioskState {
        self.machine.state()
    }

    pub fn endpoint(&self) -> ServerEndpoint {
        self.endpoint
    }

    pub fn session(&self) -> Option<&KioskSession> {
        self.session.as_ref()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn kiosk_id(&self) -> u32 {
        self.kiosk_id
    }

    pub fn machine(&self) -> &ConnectivityStateMachine<S> {
        &self.machine
    }

    // ── Start-up and recovery ─────────────────────────────────────────────────

    /// Runs discovery once and shows the lock screen.
    ///
    /// A discovery timeout is not an error: the fallback endpoint is used
    /// and the condition is logged.
    pub async fn start(&mut self) -> ActionStatus {
        self.rediscover().await;
        self.machine.present();
        ActionStatus::Completed
    }

    /// `Error → Locked`: re-runs discovery, swaps in the new endpoint, and
    /// returns to the lock screen.  Ignored outside the error state.
    pub async fn retry(&mut self) -> ActionStatus {
        if self.machine.state() != KioskState::Error {
            debug!("retry ignored while {:?}", self.machine.state());
            return ActionStatus::Ignored;
        }
        self.rediscover().await;
        match self.machine.recover() {
            Ok(()) => ActionStatus::Completed,
            Err(e) => {
                warn!("{e}");
                ActionStatus::Ignored
            }
        }
    }

    async fn rediscover(&mut self) {
        let discovery = self.locator.locate().await;
        if discovery.is_degraded() {
            warn!(
                "discovery degraded ({:?}); using {}",
                discovery.source, discovery.endpoint
            );
        } else {
            info!("server discovered at {}", discovery.endpoint);
        }
        self.endpoint = discovery.endpoint;
    }

    // ── Authentication ────────────────────────────────────────────────────────

    /// Password path of the gate.  A mismatch shows nothing and stays
    /// locked.
    pub async fn unlock_with_password(&mut self, role: Role, password: &str) -> ActionStatus {
        if self.machine.state() != KioskState::Locked {
            return ActionStatus::Ignored;
        }
        let outcome =
            gate::authenticate_password(&self.api, &self.endpoint, self.kiosk_id, role, password)
                .await;
        self.finish_auth(outcome).await
    }

    /// Token path of the gate with an already obtained token.
    pub async fn unlock_with_token(&mut self, token: &str) -> ActionStatus {
        if self.machine.state() != KioskState::Locked {
            return ActionStatus::Ignored;
        }
        let outcome = gate::authenticate_token(&self.api, &self.endpoint, token).await;
        self.finish_auth(outcome).await
    }

    /// Reads a token from `sources` (reader or manual entry) and runs the
    /// token path with it.
    pub async fn scan_token(&mut self, sources: &mut TokenSources) -> ActionStatus {
        if self.machine.state() != KioskState::Locked {
            return ActionStatus::Ignored;
        }
        match sources.read().await {
            Ok(Some(token)) => self.unlock_with_token(&token).await,
            Ok(None) => ActionStatus::Rejected,
            Err(e) => {
                warn!("token entry failed: {e}");
                self.notify(Notice::Warning("Could not read token".into()));
                ActionStatus::Rejected
            }
        }
    }

    async fn finish_auth(&mut self, outcome: Result<AuthOutcome, ApiError>) -> ActionStatus {
        match outcome {
            Err(e) => self.fail(e),
            Ok(AuthOutcome::Mismatch) => ActionStatus::Rejected,
            Ok(AuthOutcome::Granted(session)) => {
                let role = session.role();
                if let Err(e) = self.machine.unlock(role) {
                    warn!("{e}");
                    return ActionStatus::Ignored;
                }
                info!(session = %session.id(), "session started as {role}");
                self.session = Some(session);
                self.refresh_items().await
            }
        }
    }

    /// `Unlocked → Locked`.  Drops the session and the loaded items.
    pub fn lock(&mut self) -> ActionStatus {
        match self.machine.lock() {
            Ok(()) => {
                if let Some(session) = self.session.take() {
                    info!(session = %session.id(), "session ended");
                }
                self.items.clear();
                ActionStatus::Completed
            }
            Err(e) => {
                debug!("{e}");
                ActionStatus::Ignored
            }
        }
    }

    // ── Main screen ───────────────────────────────────────────────────────────

    /// Reloads the item list from the server.
    pub async fn refresh_items(&mut self) -> ActionStatus {
        if self.session.is_none() {
            return ActionStatus::Ignored;
        }
        match self.api.list_items(&self.endpoint).await {
            Ok(items) => {
                debug!("loaded {} items", items.len());
                self.items = items;
                ActionStatus::Completed
            }
            Err(e) => self.fail(e),
        }
    }

    /// Adds the item at `index` of the loaded list to the cart.
    pub fn add_to_cart(&mut self, index: usize) -> ActionStatus {
        let Some(item) = self.items.get(index).cloned() else {
            if self.session.is_some() {
                self.notify(Notice::Warning(format!("No item #{}", index + 1)));
                return ActionStatus::Rejected;
            }
            return ActionStatus::Ignored;
        };
        let Some(session) = self.session.as_mut() else {
            return ActionStatus::Ignored;
        };
        let name = item.name.clone();
        session.add_to_cart(item);
        let total = session.cart_total();
        self.notify(Notice::Info(format!("Added {name}. Total: ${total:.2}")));
        ActionStatus::Completed
    }

    /// Submits one sale per cart line for the bound user.
    ///
    /// Without a bound user, or with an empty cart, nothing is sent.  If a
    /// sale fails part way, the kiosk enters `Error`; sales already recorded
    /// stay recorded.
    pub async fn checkout(&mut self) -> ActionStatus {
        let Some(session) = self.session.as_ref() else {
            return ActionStatus::Ignored;
        };
        let plan = match session.checkout_plan() {
            Ok(plan) => plan,
            Err(e) => {
                debug!(session = %session.id(), "checkout refused: {e}");
                self.notify(Notice::Warning(e.to_string()));
                return ActionStatus::Rejected;
            }
        };
        let total = session.cart_total();
        let session_id = session.id();

        for sale in &plan {
            if let Err(e) = self.api.record_sale(&self.endpoint, sale).await {
                return self.fail(e);
            }
        }

        info!(session = %session_id, "checkout of {} lines, total {total:.2}", plan.len());
        if let Some(session) = self.session.as_mut() {
            session.clear_cart();
        }
        self.notify(Notice::Info(format!("Checkout complete. Total: ${total:.2}")));
        ActionStatus::Completed
    }

    /// Charges `amount` to `user_id` without a catalogue item.  Teacher and
    /// admin only.
    pub async fn manual_charge(&mut self, user_id: u32, amount: f64) -> ActionStatus {
        let Some(role) = self.session.as_ref().map(KioskSession::role) else {
            return ActionStatus::Ignored;
        };
        if !role.can_manual_charge() {
            self.notify(Notice::Warning(format!("{role} cannot charge manually")));
            return ActionStatus::Rejected;
        }
        if !amount.is_finite() || amount <= 0.0 {
            self.notify(Notice::Warning("Invalid amount".into()));
            return ActionStatus::Rejected;
        }

        let sale = NewSale {
            user_id,
            item_id: NewSale::NO_ITEM,
            quantity: 1,
            total_price: amount,
        };
        match self.api.record_sale(&self.endpoint, &sale).await {
            Ok(()) => {
                info!(user_id, "manual charge of {amount:.2}");
                self.notify(Notice::Info(format!("Charged ${amount:.2} to user {user_id}")));
                ActionStatus::Completed
            }
            Err(e) => self.fail(e),
        }
    }

    /// Adds a catalogue item and reloads the list.  Admin only.
    pub async fn add_item(&mut self, name: &str, price: f64) -> ActionStatus {
        let Some(role) = self.session.as_ref().map(KioskSession::role) else {
            return ActionStatus::Ignored;
        };
        if !role.can_manage_items() {
            self.notify(Notice::Warning(format!("{role} cannot manage items")));
            return ActionStatus::Rejected;
        }
        let name = name.trim();
        if name.is_empty() || !price.is_finite() || price < 0.0 {
            self.notify(Notice::Warning("Invalid item".into()));
            return ActionStatus::Rejected;
        }

        let item = NewItem {
            name: name.to_owned(),
            price,
        };
        if let Err(e) = self.api.add_item(&self.endpoint, &item).await {
            return self.fail(e);
        }
        self.notify(Notice::Info(format!("Item added: {name}")));
        self.refresh_items().await
    }

    /// Asks the server for its advertised address.
    pub async fn server_info(&mut self) -> Option<ServerInfo> {
        if self.machine.state() == KioskState::Error {
            return None;
        }
        match self.api.server_info(&self.endpoint).await {
            Ok(info) => {
                self.notify(Notice::Info(format!(
                    "Server at {}:{}",
                    info.server_ip, info.port
                )));
                Some(info)
            }
            Err(e) => {
                self.fail(e);
                None
            }
        }
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// Maps a network failure to the error state.  Safe to call repeatedly:
    /// only the first call switches screens.
    fn fail(&mut self, err: ApiError) -> ActionStatus {
        warn!("server unavailable: {err}");
        if let Some(session) = self.session.take() {
            info!(session = %session.id(), "session dropped");
        }
        self.items.clear();
        self.machine.enter_error();
        ActionStatus::Failed
    }

    fn notify(&mut self, notice: Notice) {
        self.machine.sink_mut().notify(notice);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
