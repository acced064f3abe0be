//! Admin order console: list and advance order status.
//!
//! Uses the same primitives as the rest of the core: the session store for
//! identity, refetch-after-write for every mutation. Filtering is
//! client-side over the full admin list; the backend offers no server-side
//! search.

use std::sync::Arc;

use clementine_core::{OrderId, OrderStatus, Role};

use crate::api::{CommerceApi, SignupRequest};
use crate::error::{ClientError, Result};
use crate::notify::Notices;
use crate::orders::{Order, sorted_newest_first};
use crate::session::{SessionStore, SignupForm, validate_signup};
use tokio::sync::RwLock;

/// Lists and mutates orders for the admin role.
pub struct AdminOrderConsole {
    api: CommerceApi,
    session: Arc<SessionStore>,
    notices: Notices,
    /// Last full list fetched, unfiltered.
    orders: RwLock<Vec<Order>>,
}

impl AdminOrderConsole {
    #[must_use]
    pub fn new(api: CommerceApi, session: Arc<SessionStore>, notices: Notices) -> Self {
        Self {
            api,
            session,
            notices,
            orders: RwLock::new(Vec::new()),
        }
    }

    /// Fetch the full admin order list and apply a client-side
    /// case-insensitive substring filter over owner email and order id.
    ///
    /// An empty or whitespace search returns everything.
    pub async fn list_orders(&self, search: &str) -> Result<Vec<Order>> {
        self.require_admin().await?;
        let token = self.session.token().await?;

        let fetched: Vec<Order> = match self.api.admin_orders(&token).await {
            Ok(dtos) => sorted_newest_first(dtos.into_iter().map(Order::from).collect()),
            Err(err) => {
                self.notices.error(err.to_string());
                return Err(err);
            }
        };

        *self.orders.write().await = fetched.clone();
        Ok(filter_orders(fetched, search))
    }

    /// Advance an order's status, then refetch the full list.
    ///
    /// The forward-only transition table is mirrored client-side: an invalid
    /// transition is rejected as a validation error before any request is
    /// sent. The backend remains the final authority and its rejections
    /// surface the same way.
    pub async fn update_order_status(
        &self,
        order_id: &OrderId,
        new_status: OrderStatus,
    ) -> Result<Vec<Order>> {
        self.require_admin().await?;
        let token = self.session.token().await?;

        let current = match self.cached_status(order_id).await {
            Some(status) => status,
            // Not in the cached list: ask the backend rather than guessing.
            None => self.api.get_order(&token, order_id).await?.status,
        };

        if !current.can_advance_to(new_status) {
            let err = ClientError::Validation(format!(
                "order {order_id} cannot move from {current} to {new_status}"
            ));
            self.notices.error(err.to_string());
            return Err(err);
        }

        match self
            .api
            .update_order_status(&token, order_id, new_status)
            .await
        {
            Ok(response) => {
                self.notices.success(
                    response
                        .message
                        .unwrap_or_else(|| format!("Order marked {new_status}")),
                );
            }
            Err(err) => {
                self.notices.error(err.to_string());
                return Err(err);
            }
        }

        self.list_orders("").await
    }

    /// Create another admin account.
    ///
    /// Input is validated like signup before any request; only an admin
    /// session may call this.
    pub async fn add_admin(&self, form: &SignupForm) -> Result<()> {
        self.require_admin().await?;
        validate_signup(form)?;
        let token = self.session.token().await?;

        let request = SignupRequest {
            username: &form.username,
            email: &form.email,
            password: &form.password,
            mobile: &form.mobile,
        };
        match self.api.add_admin(&token, &request).await {
            Ok(response) => {
                self.notices.success(
                    response
                        .message
                        .unwrap_or_else(|| "New admin added".to_owned()),
                );
                Ok(())
            }
            Err(err) => {
                self.notices.error(err.to_string());
                Err(err)
            }
        }
    }

    async fn cached_status(&self, order_id: &OrderId) -> Option<OrderStatus> {
        self.orders
            .read()
            .await
            .iter()
            .find(|o| &o.id == order_id)
            .map(|o| o.status)
    }

    async fn require_admin(&self) -> Result<()> {
        match self.session.snapshot().await.role() {
            Some(Role::Admin) => Ok(()),
            _ => Err(ClientError::Authorization(
                "admin role required".to_owned(),
            )),
        }
    }
}

/// Case-insensitive substring filter over owner email and order id.
fn filter_orders(orders: Vec<Order>, search: &str) -> Vec<Order> {
    let needle = search.trim().to_lowercase();
    if needle.is_empty() {
        return orders;
    }

    orders
        .into_iter()
        .filter(|order| {
            let email_hit = order
                .owner
                .as_ref()
                .and_then(|o| o.email.as_deref())
                .is_some_and(|email| email.to_lowercase().contains(&needle));
            email_hit || order.id.as_str().to_lowercase().contains(&needle)
        })
        .collect()
}
