//! REST client for the commerce backend.
//!
//! # Architecture
//!
//! - The backend is the source of truth - the client never computes a
//!   quantity or subtotal the server could have computed
//! - One shared `reqwest::Client` behind an `Arc` handle, cheap to clone
//! - Every call carries the configured bounded timeout; a timeout is
//!   reported as [`NetworkError::Timeout`]
//! - The session token travels as a `token` cookie; login responses deliver
//!   it via `Set-Cookie` and this module parses it out
//!
//! # Example
//!
//! ```rust,ignore
//! use clementine_client::api::CommerceApi;
//!
//! let api = CommerceApi::new(&config)?;
//! let (profile, role, token) = api.login(Role::User, "jo@example.com", "hunter2!").await?;
//! let cart = api.fetch_cart(&token).await?;
//! ```

pub mod types;

pub use types::*;

use std::sync::Arc;

use reqwest::header::{COOKIE, HeaderMap, SET_COOKIE};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use clementine_core::{AddressId, CartItemId, OrderId, OrderStatus, ProductId, Role};

use crate::config::Config;
use crate::error::{AuthError, ClientError, NetworkError, Result};

/// Client for the commerce backend's REST API.
#[derive(Clone)]
pub struct CommerceApi {
    inner: Arc<CommerceApiInner>,
}

struct CommerceApiInner {
    http: reqwest::Client,
    base: String,
}

impl CommerceApi {
    /// Create a new API client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Request`] if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(NetworkError::Request)?;

        Ok(Self {
            inner: Arc::new(CommerceApiInner {
                http,
                base: config.api_url.as_str().trim_end_matches('/').to_owned(),
            }),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.inner.base, path)
    }

    /// Send a request, attaching the session cookie and optional JSON body.
    async fn send<B>(
        &self,
        method: Method,
        path: &str,
        token: Option<&SecretString>,
        query: Option<&[(&str, &str)]>,
        body: Option<&B>,
    ) -> Result<reqwest::Response>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path);
        debug!(%method, %url, "commerce api request");

        let mut request = self.inner.http.request(method, &url);
        if let Some(token) = token {
            request = request.header(COOKIE, format!("token={}", token.expose_secret()));
        }
        if let Some(query) = query {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        request
            .send()
            .await
            .map_err(|e| NetworkError::from_transport(e).into())
    }

    /// Read and decode a response body, mapping non-success statuses onto
    /// the error taxonomy.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ClientError::from(NetworkError::from_transport(e)))?;

        if !status.is_success() {
            return Err(error_for_status(status, backend_message(&text)));
        }

        serde_json::from_str(&text).map_err(|e| NetworkError::Parse(e).into())
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Log in against the role-specific endpoint.
    ///
    /// Returns the profile, the role the backend confirmed, and the session
    /// token parsed from the `Set-Cookie` header.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` on a 401 and the usual
    /// network categories otherwise.
    pub async fn login(
        &self,
        role: Role,
        email: &str,
        password: &str,
    ) -> Result<(ProfileDto, Role, SecretString)> {
        let path = match role {
            Role::User => "api/user/login",
            Role::Admin => "api/admin/login",
        };

        let response = self
            .send(
                Method::POST,
                path,
                None,
                None,
                Some(&LoginRequest { email, password }),
            )
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::BAD_REQUEST {
            return Err(AuthError::InvalidCredentials.into());
        }

        let token = extract_session_token(response.headers());
        let body: LoginResponse = Self::decode(response).await?;
        let confirmed_role = body.role;

        let token = token.ok_or_else(|| {
            ClientError::Network(NetworkError::UnexpectedStatus {
                status: status.as_u16(),
                message: "login response did not set a session cookie".to_owned(),
            })
        })?;
        let profile = body.into_profile().ok_or_else(|| {
            ClientError::Network(NetworkError::UnexpectedStatus {
                status: status.as_u16(),
                message: "login response carried no profile".to_owned(),
            })
        })?;

        Ok((profile, confirmed_role, SecretString::from(token)))
    }

    /// Register a new user account.
    pub async fn signup(&self, form: &SignupRequest<'_>) -> Result<MessageResponse> {
        let response = self
            .send(Method::POST, "api/user/signup", None, None, Some(form))
            .await?;
        Self::decode(response).await
    }

    /// Create another admin account (admin only).
    pub async fn add_admin(
        &self,
        token: &SecretString,
        form: &SignupRequest<'_>,
    ) -> Result<MessageResponse> {
        let response = self
            .send(Method::POST, "api/admin/addAdmin", Some(token), None, Some(form))
            .await?;
        Self::decode(response).await
    }

    /// Update the logged-in profile on the role-specific endpoint.
    pub async fn update_profile(
        &self,
        token: &SecretString,
        role: Role,
        changes: &UpdateProfileRequest<'_>,
    ) -> Result<MessageResponse> {
        let path = match role {
            Role::User => "api/user/update-profile",
            Role::Admin => "api/admin/update-profile",
        };
        let response = self
            .send(Method::PUT, path, Some(token), None, Some(changes))
            .await?;
        Self::decode(response).await
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Full cart read. Idempotent; callers replace local state wholesale.
    pub async fn fetch_cart(&self, token: &SecretString) -> Result<CartResponse> {
        let response = self
            .send::<()>(Method::GET, "api/cart/all", Some(token), None, None)
            .await?;
        Self::decode(response).await
    }

    /// Post intent to add one unit of a product.
    pub async fn add_to_cart(
        &self,
        token: &SecretString,
        product: &ProductId,
    ) -> Result<MessageResponse> {
        let response = self
            .send(
                Method::POST,
                "api/cart/add",
                Some(token),
                None,
                Some(&AddToCartRequest { product }),
            )
            .await?;
        Self::decode(response).await
    }

    /// Post a directional quantity action for a cart line.
    pub async fn update_cart(
        &self,
        token: &SecretString,
        action: CartAction,
        id: &CartItemId,
    ) -> Result<MessageResponse> {
        let response = self
            .send(
                Method::PUT,
                "api/cart/update",
                Some(token),
                Some(&[("action", action.as_str())]),
                Some(&CartUpdateRequest { id }),
            )
            .await?;
        Self::decode(response).await
    }

    /// Delete a cart line.
    pub async fn remove_from_cart(
        &self,
        token: &SecretString,
        id: &CartItemId,
    ) -> Result<MessageResponse> {
        let path = format!("api/cart/remove/{id}");
        let response = self
            .send::<()>(Method::DELETE, &path, Some(token), None, None)
            .await?;
        Self::decode(response).await
    }

    // =========================================================================
    // Addresses
    // =========================================================================

    /// Full address-book read.
    pub async fn list_addresses(&self, token: &SecretString) -> Result<Vec<AddressDto>> {
        let response = self
            .send::<()>(Method::GET, "api/address/all", Some(token), None, None)
            .await?;
        Self::decode(response).await
    }

    /// Create a new address.
    pub async fn create_address(
        &self,
        token: &SecretString,
        request: &NewAddressRequest<'_>,
    ) -> Result<MessageResponse> {
        let response = self
            .send(
                Method::POST,
                "api/address/new",
                Some(token),
                None,
                Some(request),
            )
            .await?;
        Self::decode(response).await
    }

    /// Delete an address.
    pub async fn delete_address(
        &self,
        token: &SecretString,
        id: &AddressId,
    ) -> Result<MessageResponse> {
        let path = format!("api/address/{id}");
        let response = self
            .send::<()>(Method::DELETE, &path, Some(token), None, None)
            .await?;
        Self::decode(response).await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Create a cash-on-delivery order synchronously.
    pub async fn create_cod_order(
        &self,
        token: &SecretString,
        request: &NewOrderRequest<'_>,
    ) -> Result<MessageResponse> {
        let response = self
            .send(
                Method::POST,
                "api/order/new/cod",
                Some(token),
                None,
                Some(request),
            )
            .await?;
        Self::decode(response).await
    }

    /// Start an online payment; the backend answers with the processor URL.
    pub async fn create_online_order(
        &self,
        token: &SecretString,
        request: &NewOrderRequest<'_>,
    ) -> Result<OnlineCheckoutResponse> {
        let response = self
            .send(
                Method::POST,
                "api/order/new/online",
                Some(token),
                None,
                Some(request),
            )
            .await?;
        Self::decode(response).await
    }

    /// List the calling user's orders.
    pub async fn my_orders(&self, token: &SecretString) -> Result<Vec<OrderDto>> {
        let response = self
            .send::<()>(Method::GET, "api/order/my", Some(token), None, None)
            .await?;
        Self::decode(response).await
    }

    /// Read one order.
    pub async fn get_order(&self, token: &SecretString, id: &OrderId) -> Result<OrderDto> {
        let path = format!("api/order/{id}");
        let response = self
            .send::<()>(Method::GET, &path, Some(token), None, None)
            .await?;
        Self::decode(response).await
    }

    /// List every order in the store (admin only).
    pub async fn admin_orders(&self, token: &SecretString) -> Result<Vec<OrderDto>> {
        let response = self
            .send::<()>(Method::GET, "api/order/admin/all", Some(token), None, None)
            .await?;
        Self::decode(response).await
    }

    /// Set an order's status (admin only).
    pub async fn update_order_status(
        &self,
        token: &SecretString,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<MessageResponse> {
        let path = format!("api/order/{id}");
        let response = self
            .send(
                Method::PUT,
                &path,
                Some(token),
                None,
                Some(&UpdateOrderStatusRequest { status }),
            )
            .await?;
        Self::decode(response).await
    }
}

/// Map a non-success status onto the error taxonomy.
fn error_for_status(status: StatusCode, message: Option<String>) -> ClientError {
    let message = message.unwrap_or_else(|| status.to_string());
    match status {
        StatusCode::UNAUTHORIZED => AuthError::SessionExpired.into(),
        StatusCode::FORBIDDEN => ClientError::Authorization(message),
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        StatusCode::BAD_REQUEST => ClientError::Validation(message),
        _ => ClientError::Network(NetworkError::UnexpectedStatus {
            status: status.as_u16(),
            message,
        }),
    }
}

/// Pull the backend's `{message}` out of an error body, if it has one.
fn backend_message(body: &str) -> Option<String> {
    serde_json::from_str::<MessageResponse>(body)
        .ok()
        .and_then(|m| m.message)
}

/// Parse the session token out of `Set-Cookie` headers.
fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|raw| {
            let pair = raw.split(';').next()?;
            let (name, value) = pair.split_once('=')?;
            if name.trim() == "token" && !value.is_empty() {
                Some(value.to_owned())
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_extract_session_token_from_set_cookie() {
        let mut headers = HeaderMap::new();
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("token=abc123; Path=/; HttpOnly; Max-Age=86400"),
        );
        assert_eq!(extract_session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_extract_session_token_skips_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("theme=dark; Path=/"));
        headers.append(SET_COOKIE, HeaderValue::from_static("token=xyz; Path=/"));
        assert_eq!(extract_session_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn test_extract_session_token_absent_or_empty() {
        let headers = HeaderMap::new();
        assert!(extract_session_token(&headers).is_none());

        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("token=; Path=/"));
        assert!(extract_session_token(&headers).is_none());
    }

    #[test]
    fn test_error_for_status_mapping() {
        assert!(matches!(
            error_for_status(StatusCode::UNAUTHORIZED, None),
            ClientError::Auth(AuthError::SessionExpired)
        ));
        assert!(matches!(
            error_for_status(StatusCode::FORBIDDEN, Some("not yours".to_owned())),
            ClientError::Authorization(m) if m == "not yours"
        ));
        assert!(matches!(
            error_for_status(StatusCode::NOT_FOUND, None),
            ClientError::NotFound(_)
        ));
        assert!(matches!(
            error_for_status(StatusCode::BAD_REQUEST, Some("phone required".to_owned())),
            ClientError::Validation(m) if m == "phone required"
        ));
        assert!(matches!(
            error_for_status(StatusCode::BAD_GATEWAY, None),
            ClientError::Network(NetworkError::UnexpectedStatus { status: 502, .. })
        ));
    }

    #[test]
    fn test_backend_message_extraction() {
        assert_eq!(
            backend_message(r#"{"message":"Out of stock"}"#).as_deref(),
            Some("Out of stock")
        );
        assert!(backend_message("not json at all").is_none());
        assert!(backend_message(r#"{"error":"different shape"}"#).is_none());
    }
}
