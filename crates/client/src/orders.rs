//! Orders as the client sees them, plus the user-facing order history.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use clementine_core::{OrderId, OrderStatus, PaymentMethod, ProductId, UserId};

use crate::api::{CommerceApi, OrderDto};
use crate::authz;
use crate::error::Result;
use crate::notify::Notices;
use crate::session::SessionStore;

/// Owner reference on an order. Orders created before the account system
/// stabilized can lack one; those are admin-visible only.
#[derive(Debug, Clone)]
pub struct OrderOwner {
    pub user_id: UserId,
    pub email: Option<String>,
}

/// One ordered line, a snapshot of the cart at checkout time.
#[derive(Debug, Clone)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub title: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

/// An order.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub owner: Option<OrderOwner>,
    pub items: Vec<OrderItem>,
    pub sub_total: Decimal,
    pub status: OrderStatus,
    pub method: PaymentMethod,
    pub address: String,
    pub phone: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<OrderDto> for Order {
    fn from(dto: OrderDto) -> Self {
        Self {
            id: dto.id,
            owner: dto.user.map(|u| OrderOwner {
                user_id: u.id,
                email: u.email,
            }),
            items: dto
                .items
                .into_iter()
                .map(|line| OrderItem {
                    product_id: line.product.id,
                    title: line.product.title,
                    unit_price: line.product.price,
                    quantity: line.quantity,
                })
                .collect(),
            sub_total: dto.sub_total,
            status: dto.status,
            method: dto.method,
            address: dto.address,
            phone: dto.phone,
            paid_at: dto.paid_at,
            created_at: dto.created_at,
        }
    }
}

/// Read access to the calling user's orders.
pub struct OrderHistory {
    api: CommerceApi,
    session: Arc<SessionStore>,
    notices: Notices,
}

impl OrderHistory {
    #[must_use]
    pub fn new(api: CommerceApi, session: Arc<SessionStore>, notices: Notices) -> Self {
        Self {
            api,
            session,
            notices,
        }
    }

    /// Full list of the calling user's orders, newest first.
    pub async fn my_orders(&self) -> Result<Vec<Order>> {
        let token = self.session.token().await?;
        let orders = match self.api.my_orders(&token).await {
            Ok(dtos) => dtos.into_iter().map(Order::from).collect::<Vec<_>>(),
            Err(err) => {
                self.notices.error(err.to_string());
                return Err(err);
            }
        };
        Ok(sorted_newest_first(orders))
    }

    /// One order, readable only by its owner or an admin.
    ///
    /// # Errors
    ///
    /// `ClientError::Authorization` when the session is neither the order's
    /// owner nor an admin; the caller renders the denial in place of the
    /// order, never a redirect.
    pub async fn order_detail(&self, id: &OrderId) -> Result<Order> {
        let token = self.session.token().await?;
        let order: Order = self.api.get_order(&token, id).await?.into();

        let snapshot = self.session.snapshot().await;
        authz::authorize_order_view(&snapshot, &order)?;
        Ok(order)
    }
}

/// Sort orders newest first, treating missing timestamps as oldest.
pub(crate) fn sorted_newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders
}
