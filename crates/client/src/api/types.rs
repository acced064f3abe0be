//! Wire types for the commerce backend's REST contract.
//!
//! Only the fields the client core reads or writes are modeled; everything
//! else the backend returns is ignored by serde. Identifiers arrive in Mongo
//! style as `_id`, camelCase fields are renamed at this boundary only.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use clementine_core::{
    AddressId, CartItemId, OrderId, OrderStatus, PaymentMethod, ProductId, Role, UserId,
};

// =============================================================================
// Auth
// =============================================================================

/// Login request body for `POST /api/{user|admin}/login`.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Profile payload as returned by login and profile endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileDto {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub mobile: String,
    #[serde(default)]
    pub role: Option<Role>,
}

/// Response for `POST /api/{user|admin}/login`.
///
/// The backend keys the profile under `user` or `admin` depending on which
/// endpoint answered; exactly one of the two is present.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub user: Option<ProfileDto>,
    #[serde(default)]
    pub admin: Option<ProfileDto>,
    pub role: Role,
    #[serde(default)]
    pub message: Option<String>,
}

impl LoginResponse {
    /// The profile, regardless of which key it arrived under.
    #[must_use]
    pub fn into_profile(self) -> Option<ProfileDto> {
        self.user.or(self.admin)
    }
}

/// Signup request body for `POST /api/user/signup`.
#[derive(Debug, Serialize)]
pub struct SignupRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub mobile: &'a str,
}

/// Profile update body for `PUT /api/{user|admin}/update-profile`.
#[derive(Debug, Serialize)]
pub struct UpdateProfileRequest<'a> {
    pub username: &'a str,
    pub mobile: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<&'a str>,
    #[serde(rename = "newPassword", skip_serializing_if = "Option::is_none")]
    pub new_password: Option<&'a str>,
}

// =============================================================================
// Cart
// =============================================================================

/// Product as embedded in cart and order payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductDto {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub title: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub images: Vec<ImageDto>,
}

/// Product image reference.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageDto {
    pub url: String,
}

/// One cart line as returned by `GET /api/cart/all`.
#[derive(Debug, Clone, Deserialize)]
pub struct CartEntryDto {
    #[serde(rename = "_id")]
    pub id: CartItemId,
    pub product: ProductDto,
    pub quantity: u32,
}

/// Full cart payload from `GET /api/cart/all`.
#[derive(Debug, Deserialize)]
pub struct CartResponse {
    pub cart: Vec<CartEntryDto>,
    #[serde(rename = "totalQuantity")]
    pub total_quantity: u32,
    #[serde(rename = "subTotal")]
    pub sub_total: Decimal,
}

/// Body for `POST /api/cart/add`.
#[derive(Debug, Serialize)]
pub struct AddToCartRequest<'a> {
    pub product: &'a ProductId,
}

/// Body for `PUT /api/cart/update`.
#[derive(Debug, Serialize)]
pub struct CartUpdateRequest<'a> {
    pub id: &'a CartItemId,
}

/// Directional quantity action for `PUT /api/cart/update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartAction {
    Increment,
    Decrement,
}

impl CartAction {
    /// Query-string value the backend expects.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Increment => "increment",
            Self::Decrement => "decrement",
        }
    }
}

// =============================================================================
// Addresses
// =============================================================================

/// Address payload from the address endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressDto {
    #[serde(rename = "_id")]
    pub id: AddressId,
    pub address: String,
    pub phone: String,
}

/// Body for `POST /api/address/new`.
#[derive(Debug, Serialize)]
pub struct NewAddressRequest<'a> {
    pub address: &'a str,
    pub phone: &'a str,
}

// =============================================================================
// Orders
// =============================================================================

/// Body for `POST /api/order/new/{cod|online}`.
#[derive(Debug, Serialize)]
pub struct NewOrderRequest<'a> {
    pub method: PaymentMethod,
    pub address: &'a str,
    pub phone: &'a str,
}

/// Response for `POST /api/order/new/online`: the processor-hosted page.
#[derive(Debug, Deserialize)]
pub struct OnlineCheckoutResponse {
    pub url: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Owner reference embedded in an order.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderOwnerDto {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

/// One ordered line (a snapshot of the cart at checkout time).
#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemDto {
    pub product: ProductDto,
    pub quantity: u32,
}

/// Order payload from the order endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderDto {
    #[serde(rename = "_id")]
    pub id: OrderId,
    #[serde(default)]
    pub items: Vec<OrderItemDto>,
    #[serde(rename = "subTotal")]
    pub sub_total: Decimal,
    pub status: OrderStatus,
    pub method: PaymentMethod,
    pub address: String,
    pub phone: String,
    #[serde(default)]
    pub user: Option<OrderOwnerDto>,
    #[serde(rename = "paidAt", default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body for `PUT /api/order/{id}`.
#[derive(Debug, Serialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

// =============================================================================
// Misc
// =============================================================================

/// Generic `{message}` envelope many mutation endpoints answer with.
#[derive(Debug, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_response_deserializes_backend_shape() {
        let json = r#"{
            "cart": [
                {
                    "_id": "ci1",
                    "product": {
                        "_id": "p1",
                        "title": "Teapot",
                        "price": "10",
                        "stock": 5,
                        "category": "kitchen",
                        "images": [{ "url": "https://cdn.example/p1.jpg" }]
                    },
                    "quantity": 2
                }
            ],
            "totalQuantity": 2,
            "subTotal": "20"
        }"#;

        let response: CartResponse = serde_json::from_str(json).expect("deserialize cart");
        assert_eq!(response.cart.len(), 1);
        assert_eq!(response.cart[0].quantity, 2);
        assert_eq!(response.cart[0].product.price, Decimal::from(10));
        assert_eq!(response.total_quantity, 2);
        assert_eq!(response.sub_total, Decimal::from(20));
    }

    #[test]
    fn test_login_response_profile_under_either_key() {
        let user_json = r#"{
            "user": { "_id": "u1", "username": "jo", "email": "jo@example.com", "mobile": "5551234" },
            "role": "user"
        }"#;
        let response: LoginResponse = serde_json::from_str(user_json).expect("deserialize");
        assert_eq!(response.role, Role::User);
        let profile = response.into_profile().expect("profile present");
        assert_eq!(profile.username, "jo");

        let admin_json = r#"{
            "admin": { "_id": "a1", "username": "root", "email": "root@example.com" },
            "role": "admin"
        }"#;
        let response: LoginResponse = serde_json::from_str(admin_json).expect("deserialize");
        assert_eq!(response.role, Role::Admin);
        assert!(response.into_profile().is_some());
    }

    #[test]
    fn test_order_deserializes_without_optional_fields() {
        let json = r#"{
            "_id": "o1",
            "subTotal": "20",
            "status": "Pending",
            "method": "cod",
            "address": "12 Main St",
            "phone": "5551234"
        }"#;
        let order: OrderDto = serde_json::from_str(json).expect("deserialize order");
        assert!(order.items.is_empty());
        assert!(order.user.is_none());
        assert!(order.paid_at.is_none());
    }

    #[test]
    fn test_update_profile_omits_absent_password() {
        let body = UpdateProfileRequest {
            username: "jo",
            mobile: "5551234",
            password: None,
            new_password: None,
        };
        let json = serde_json::to_value(&body).expect("serialize");
        assert!(json.get("password").is_none());
        assert!(json.get("newPassword").is_none());
    }

    #[test]
    fn test_cart_action_query_values() {
        assert_eq!(CartAction::Increment.as_str(), "increment");
        assert_eq!(CartAction::Decrement.as_str(), "decrement");
    }
}
