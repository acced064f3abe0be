//! The storefront facade: wires the state services together and owns the
//! cross-component cascades (login → cart fetch, logout → ordered clear).
//!
//! Components receive their collaborators explicitly - the session store,
//! cart manager, and consoles are plain values here, not ambient singletons,
//! so each remains independently testable.

use std::sync::Arc;

use tokio::sync::RwLock;

use clementine_core::Role;

use crate::admin::AdminOrderConsole;
use crate::api::CommerceApi;
use crate::authz::{self, Route, RouteDecision, RoutePolicy};
use crate::cart::CartManager;
use crate::checkout::CheckoutFlow;
use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::notify::Notices;
use crate::orders::OrderHistory;
use crate::session::{
    Credentials, FileSessionStore, SessionPersistence, SessionStore, SignupForm,
};

/// Top-level handle to the client core.
pub struct Storefront {
    api: CommerceApi,
    notices: Notices,
    session: Arc<SessionStore>,
    cart: CartManager,
    orders: OrderHistory,
    admin: AdminOrderConsole,
    /// The in-flight checkout, if the user is mid-checkout.
    checkout: RwLock<Option<Arc<CheckoutFlow>>>,
}

impl Storefront {
    /// Build a storefront with the durable file-backed session store.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: Config) -> Result<Self> {
        let persistence = Box::new(FileSessionStore::new(config.state_dir.clone()));
        Self::with_persistence(config, persistence)
    }

    /// Build a storefront with a caller-provided session store.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_persistence(
        config: Config,
        persistence: Box<dyn SessionPersistence>,
    ) -> Result<Self> {
        let api = CommerceApi::new(&config)?;
        let notices = Notices::new();
        let session = Arc::new(SessionStore::new(
            api.clone(),
            persistence,
            notices.clone(),
        ));
        let cart = CartManager::new(api.clone(), Arc::clone(&session), notices.clone());
        let orders = OrderHistory::new(api.clone(), Arc::clone(&session), notices.clone());
        let admin = AdminOrderConsole::new(api.clone(), Arc::clone(&session), notices.clone());

        Ok(Self {
            api,
            notices,
            session,
            cart,
            orders,
            admin,
            checkout: RwLock::new(None),
        })
    }

    /// One-time startup: settle the session, then warm the cart for a
    /// restored user session. Nothing that depends on `is_auth`/`role` may
    /// run before this completes.
    pub async fn init(&self) {
        self.session.restore().await;
        if self.session.snapshot().await.role() == Some(Role::User) {
            // Best-effort warm-up; a failure keeps the empty cart and
            // surfaces a notice.
            let _ = self.cart.fetch_cart().await;
        }
    }

    /// Log in, then fetch the cart for non-admin sessions.
    pub async fn login(&self, role_hint: Role, credentials: &Credentials) -> Result<Route> {
        let route = self.session.login(role_hint, credentials).await?;
        *self.checkout.write().await = None;
        if self.session.snapshot().await.role() == Some(Role::User) {
            let _ = self.cart.fetch_cart().await;
        }
        Ok(route)
    }

    /// Register a new user account.
    pub async fn signup(&self, form: &SignupForm) -> Result<Route> {
        self.session.signup(form).await
    }

    /// Ordered logout cascade: persisted clear → in-memory clear → cart and
    /// checkout clear → navigation (the returned route, applied last).
    pub async fn logout(&self) -> Route {
        let route = self.session.logout().await;
        self.cart.clear_cart().await;
        *self.checkout.write().await = None;
        route
    }

    /// Route decision for the current session state.
    pub async fn decide(&self, policy: RoutePolicy) -> RouteDecision {
        authz::decide(&self.session.snapshot().await, policy)
    }

    /// Enter checkout: creates a fresh flow and loads the address book.
    ///
    /// # Errors
    ///
    /// `ClientError::Authorization` unless the session is an authenticated
    /// user (admins have no cart to check out).
    pub async fn begin_checkout(&self) -> Result<Arc<CheckoutFlow>> {
        if self.session.snapshot().await.role() != Some(Role::User) {
            return Err(ClientError::Authorization(
                "checkout requires a logged-in user".to_owned(),
            ));
        }

        let flow = Arc::new(CheckoutFlow::new(
            self.api.clone(),
            Arc::clone(&self.session),
            self.cart.clone(),
            self.notices.clone(),
        ));
        flow.load_addresses().await?;

        *self.checkout.write().await = Some(Arc::clone(&flow));
        Ok(flow)
    }

    /// The in-flight checkout, if any.
    pub async fn checkout(&self) -> Option<Arc<CheckoutFlow>> {
        self.checkout.read().await.clone()
    }

    /// Session store handle.
    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Cart manager handle.
    #[must_use]
    pub const fn cart(&self) -> &CartManager {
        &self.cart
    }

    /// User order history handle.
    #[must_use]
    pub const fn orders(&self) -> &OrderHistory {
        &self.orders
    }

    /// Admin order console handle.
    #[must_use]
    pub const fn admin_orders(&self) -> &AdminOrderConsole {
        &self.admin
    }

    /// Notice channel handle (subscribe for toasts).
    #[must_use]
    pub const fn notices(&self) -> &Notices {
        &self.notices
    }
}
