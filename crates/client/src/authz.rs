//! Route-level and resource-level authorization.
//!
//! [`decide`] is a pure function over a session snapshot: no I/O, no side
//! effects, trivially testable. Resource-level checks are separate because
//! their failure mode differs - a denied resource renders an explicit
//! "not your resource" state in place, while a denied route redirects.

use clementine_core::Role;

use crate::error::{AuthError, ClientError, Result};
use crate::orders::Order;
use crate::session::SessionState;

/// Navigation vocabulary shared by the session, checkout, and route layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Storefront home (user landing page).
    Home,
    /// Admin dashboard (admin landing page).
    AdminDashboard,
    /// Login form.
    Login,
    /// The user's order list.
    Orders,
}

impl Route {
    /// Landing page for a role after login or a guest-only bounce.
    #[must_use]
    pub const fn home_for(role: Role) -> Self {
        match role {
            Role::User => Self::Home,
            Role::Admin => Self::AdminDashboard,
        }
    }

    /// Path rendered into the browser location.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::AdminDashboard => "/adminDashboard",
            Self::Login => "/login",
            Self::Orders => "/orders",
        }
    }
}

/// What a view requires of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePolicy {
    /// No requirement.
    Public,
    /// Any authenticated session.
    RequireAuth,
    /// An authenticated admin session.
    RequireAdmin,
    /// Login/signup pages: an authenticated session is bounced to its home.
    GuestOnly,
}

/// Outcome of a route decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Session restoration has not settled; render a neutral loading state,
    /// never a flash of protected or public content.
    Pending,
    /// Render the requested view.
    Allow,
    /// Bounce to the login form.
    RedirectToLogin,
    /// Bounce elsewhere (guest-only pages redirect to the role's home).
    Redirect(Route),
}

/// Decide whether a view may render for the current session.
#[must_use]
pub fn decide(state: &SessionState, policy: RoutePolicy) -> RouteDecision {
    if state.is_loading() {
        return RouteDecision::Pending;
    }

    match policy {
        RoutePolicy::Public => RouteDecision::Allow,
        RoutePolicy::RequireAuth => {
            if state.is_auth() {
                RouteDecision::Allow
            } else {
                RouteDecision::RedirectToLogin
            }
        }
        RoutePolicy::RequireAdmin => match state.role() {
            Some(Role::Admin) => RouteDecision::Allow,
            _ => RouteDecision::RedirectToLogin,
        },
        RoutePolicy::GuestOnly => match state.role() {
            // Authenticated sessions of either role are bounced; admins do
            // not get to see the login form again.
            Some(role) => RouteDecision::Redirect(Route::home_for(role)),
            None => RouteDecision::Allow,
        },
    }
}

/// Resource-level check: an order is readable by its owner or an admin.
///
/// Owner identity is compared on `user_id` only - the one canonical
/// comparison in the data model.
///
/// # Errors
///
/// `ClientError::Authorization` on a role or ownership mismatch;
/// `AuthError::SessionExpired` when there is no session at all.
pub fn authorize_order_view(state: &SessionState, order: &Order) -> Result<()> {
    let session = state.session().ok_or(AuthError::SessionExpired)?;

    if session.role.is_admin() {
        return Ok(());
    }

    let owns = order
        .owner
        .as_ref()
        .is_some_and(|owner| owner.user_id == session.user_id);
    if owns {
        Ok(())
    } else {
        Err(ClientError::Authorization(
            "this order belongs to a different account".to_owned(),
        ))
    }
}
