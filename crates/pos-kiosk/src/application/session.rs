//! KioskSession: everything tied to one unlock.
//!
//! A session is created when authentication succeeds and dropped when the
//! kiosk locks or enters error mode.  Handlers receive it explicitly instead
//! of reading kiosk-wide mutable state, so "which user is this sale for?"
//! always has one answer.
//!
//! A password unlock grants a *role* without a user; a token unlock binds
//! the matched user.  Only sessions with a bound user can check out.

use pos_core::{Item, NewSale, Role, User};
use thiserror::Error;
use uuid::Uuid;

/// Why a checkout was refused before contacting the server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("No user selected")]
    NoUserBound,
    #[error("Cart is empty")]
    EmptyCart,
}

/// One unlocked session.
#[derive(Debug, Clone, PartialEq)]
pub struct KioskSession {
    id: Uuid,
    role: Role,
    user: Option<User>,
    cart: Vec<Item>,
}

impl KioskSession {
    /// A role-level session from a password unlock (no user bound).
    pub fn for_role(role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            user: None,
            cart: Vec::new(),
        }
    }

    /// A session bound to `user`, with the role its privilege maps to.
    pub fn for_user(user: User) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: user.privilege.kiosk_role(),
            user: Some(user),
            cart: Vec::new(),
        }
    }

    /// Random id used to correlate log lines of one session.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn cart(&self) -> &[Item] {
        &self.cart
    }

    pub fn add_to_cart(&mut self, item: Item) {
        self.cart.push(item);
    }

    pub fn clear_cart(&mut self) {
        self.cart.clear();
    }

    pub fn cart_total(&self) -> f64 {
        self.cart.iter().map(|item| item.price).sum()
    }

    /// The sales a checkout would submit: one per cart line, quantity 1.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::NoUserBound`] when the session has no user, and
    /// [`CheckoutError::EmptyCart`] when there is nothing to sell.
    pub fn checkout_plan(&self) -> Result<Vec<NewSale>, CheckoutError> {
        let user = self.user.as_ref().ok_or(CheckoutError::NoUserBound)?;
        if self.cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        Ok(self
            .cart
            .iter()
            .map(|item| NewSale {
                user_id: user.id,
                item_id: item.id,
                quantity: 1,
                total_price: item.price,
            })
            .collect())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
