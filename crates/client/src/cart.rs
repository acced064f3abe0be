//! Cart contents and quantity/subtotal bookkeeping.
//!
//! Design principle: **refetch-after-write**. Every mutation posts its
//! intent and then performs a full cart read that replaces local state
//! wholesale. Price and stock are server-authoritative and can change
//! between requests, so the client never computes or trusts a locally
//! mutated quantity or subtotal.
//!
//! Mutations are serialized through a single-flight lock so rapid repeated
//! actions (fast double-clicks on increment) cannot interleave their
//! refetches and leave a stale state displayed.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

use clementine_core::{CartItemId, ProductId};

use crate::api::{CartAction, CartEntryDto, CartResponse, CommerceApi};
use crate::error::{ClientError, Result};
use crate::notify::Notices;
use crate::session::SessionStore;

/// Snapshot of a product taken when its cart line was last fetched.
#[derive(Debug, Clone)]
pub struct ProductSnapshot {
    pub title: String,
    pub stock: i64,
    pub category: String,
    pub images: Vec<String>,
}

/// One cart line.
#[derive(Debug, Clone)]
pub struct CartItem {
    pub item_id: CartItemId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub product: ProductSnapshot,
}

/// Full cart state, always built from the last full server response.
#[derive(Debug, Clone, Default)]
pub struct CartState {
    pub items: Vec<CartItem>,
    pub total_quantity: u32,
    pub sub_total: Decimal,
}

impl CartState {
    /// Whether the cart holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<CartResponse> for CartState {
    /// Build cart state from a full server response.
    ///
    /// Totals are recomputed from the line items so the invariants
    /// `total_quantity == Σ quantity` and `sub_total == Σ quantity × price`
    /// hold unconditionally; a disagreeing server total is logged.
    fn from(response: CartResponse) -> Self {
        let items: Vec<CartItem> = response.cart.into_iter().map(CartItem::from).collect();

        let total_quantity: u32 = items.iter().map(|i| i.quantity).sum();
        let sub_total: Decimal = items
            .iter()
            .map(|i| Decimal::from(i.quantity) * i.unit_price)
            .sum();

        if total_quantity != response.total_quantity || sub_total != response.sub_total {
            warn!(
                server_quantity = response.total_quantity,
                server_sub_total = %response.sub_total,
                computed_quantity = total_quantity,
                computed_sub_total = %sub_total,
                "server cart totals disagree with line items"
            );
        }

        Self {
            items,
            total_quantity,
            sub_total,
        }
    }
}

impl From<CartEntryDto> for CartItem {
    fn from(entry: CartEntryDto) -> Self {
        Self {
            item_id: entry.id,
            product_id: entry.product.id,
            quantity: entry.quantity,
            unit_price: entry.product.price,
            product: ProductSnapshot {
                title: entry.product.title,
                stock: entry.product.stock,
                category: entry.product.category,
                images: entry.product.images.into_iter().map(|i| i.url).collect(),
            },
        }
    }
}

/// Owns cart state and keeps it synchronized with the backend.
#[derive(Clone)]
pub struct CartManager {
    inner: Arc<CartManagerInner>,
}

struct CartManagerInner {
    api: CommerceApi,
    session: Arc<SessionStore>,
    notices: Notices,
    state: RwLock<CartState>,
    /// Single-flight gate serializing mutations and their refetches.
    mutation_gate: Arc<Mutex<()>>,
}

impl CartManager {
    #[must_use]
    pub fn new(api: CommerceApi, session: Arc<SessionStore>, notices: Notices) -> Self {
        Self {
            inner: Arc::new(CartManagerInner {
                api,
                session,
                notices,
                state: RwLock::new(CartState::default()),
                mutation_gate: Arc::new(Mutex::new(())),
            }),
        }
    }

    /// The last successfully fetched cart state.
    pub async fn state(&self) -> CartState {
        self.inner.state.read().await.clone()
    }

    /// The gate order submission shares, so checkout serializes with cart
    /// mutations.
    pub(crate) fn mutation_gate(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.inner.mutation_gate)
    }

    /// Idempotent full read; replaces the previous state in its entirety.
    ///
    /// On failure the last successfully fetched state stays in place.
    pub async fn fetch_cart(&self) -> Result<CartState> {
        let token = self.inner.session.token().await?;
        let response = match self.inner.api.fetch_cart(&token).await {
            Ok(response) => response,
            Err(err) => {
                self.inner.notices.error(err.to_string());
                return Err(err);
            }
        };

        let state = CartState::from(response);
        *self.inner.state.write().await = state.clone();
        Ok(state)
    }

    /// Add one unit of a product, then refetch.
    pub async fn add_to_cart(&self, product_id: &ProductId) -> Result<CartState> {
        let _serial = self.inner.mutation_gate.lock().await;
        let token = self.inner.session.token().await?;

        match self.inner.api.add_to_cart(&token, product_id).await {
            Ok(response) => {
                self.inner.notices.success(
                    response.message.unwrap_or_else(|| "Added to cart".to_owned()),
                );
            }
            Err(err) => {
                self.inner.notices.error(err.to_string());
                return Err(err);
            }
        }

        self.fetch_cart().await
    }

    /// Post a directional quantity action, then refetch.
    ///
    /// Whether a decrement to zero removes the line is the server's policy;
    /// the client only reflects whatever the refetch returns.
    pub async fn update_cart(&self, action: CartAction, item_id: &CartItemId) -> Result<CartState> {
        let _serial = self.inner.mutation_gate.lock().await;
        let token = self.inner.session.token().await?;

        match self.inner.api.update_cart(&token, action, item_id).await {
            Ok(response) => {
                self.inner.notices.success(
                    response.message.unwrap_or_else(|| "Cart updated".to_owned()),
                );
            }
            Err(err) => {
                self.inner.notices.error(err.to_string());
                return Err(err);
            }
        }

        self.fetch_cart().await
    }

    /// Delete a cart line, then refetch.
    pub async fn remove_from_cart(&self, item_id: &CartItemId) -> Result<CartState> {
        let _serial = self.inner.mutation_gate.lock().await;
        let token = self.inner.session.token().await?;

        match self.inner.api.remove_from_cart(&token, item_id).await {
            Ok(response) => {
                self.inner.notices.success(
                    response
                        .message
                        .unwrap_or_else(|| "Removed from cart".to_owned()),
                );
            }
            Err(err) => {
                self.inner.notices.error(err.to_string());
                return Err(err);
            }
        }

        self.fetch_cart().await
    }

    /// Local-only reset to the empty state, used on logout and after a
    /// successful checkout. Does not call the backend.
    pub async fn clear_cart(&self) {
        *self.inner.state.write().await = CartState::default();
    }

    /// Guard used by checkout: a submission over an empty cart is a
    /// validation error, not a request.
    pub(crate) async fn require_non_empty(&self) -> Result<CartState> {
        let state = self.state().await;
        if state.is_empty() {
            return Err(ClientError::Validation("your cart is empty".to_owned()));
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_json(json: &str) -> CartResponse {
        serde_json::from_str(json).expect("valid cart response")
    }

    #[test]
    fn test_state_matches_exact_server_scenario() {
        // Server: one product A, qty 2, price 10 => totalQuantity 2, subTotal 20
        let state = CartState::from(response_json(
            r#"{
                "cart": [{
                    "_id": "ci1",
                    "product": { "_id": "A", "title": "Teapot", "price": "10" },
                    "quantity": 2
                }],
                "totalQuantity": 2,
                "subTotal": "20"
            }"#,
        ));

        assert_eq!(state.items.len(), 1);
        assert_eq!(state.items[0].product_id, ProductId::new("A"));
        assert_eq!(state.items[0].quantity, 2);
        assert_eq!(state.total_quantity, 2);
        assert_eq!(state.sub_total, Decimal::from(20));
    }

    #[test]
    fn test_totals_recomputed_from_items() {
        // Server totals disagree with the line items; the recomputed values win.
        let state = CartState::from(response_json(
            r#"{
                "cart": [
                    { "_id": "ci1", "product": { "_id": "A", "title": "A", "price": "10" }, "quantity": 2 },
                    { "_id": "ci2", "product": { "_id": "B", "title": "B", "price": "2.50" }, "quantity": 3 }
                ],
                "totalQuantity": 99,
                "subTotal": "999"
            }"#,
        ));

        assert_eq!(state.total_quantity, 5);
        assert_eq!(state.sub_total, Decimal::new(275, 1)); // 27.5
    }

    #[test]
    fn test_empty_cart_state() {
        let state = CartState::from(response_json(
            r#"{ "cart": [], "totalQuantity": 0, "subTotal": "0" }"#,
        ));
        assert!(state.is_empty());
        assert_eq!(state.total_quantity, 0);
        assert_eq!(state.sub_total, Decimal::ZERO);

        assert!(CartState::default().is_empty());
    }
}
