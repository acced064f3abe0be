//! Checkout orchestration: address selection, payment method, submission.
//!
//! Stage machine: `SelectAddress → SelectPaymentMethod → Submitting →
//! Completed | Failed`, with an extra terminal arm for the online-payment
//! branch: the browser navigates to the processor-hosted page, which kills
//! this in-memory flow. On return the application must re-derive order
//! existence from the backend ([`CheckoutFlow::resume_after_redirect`]) -
//! pre-redirect local state is never trusted.
//!
//! The address book follows the same refetch-after-write discipline as the
//! cart: every create/delete is followed by a full list refresh.

use std::sync::Arc;

use tokio::sync::RwLock;

use clementine_core::{AddressId, PaymentMethod};

use crate::api::{AddressDto, CommerceApi, NewAddressRequest, NewOrderRequest};
use crate::authz::Route;
use crate::cart::CartManager;
use crate::error::{ClientError, Result};
use crate::notify::Notices;
use crate::orders::{Order, sorted_newest_first};
use crate::session::SessionStore;

/// A delivery address owned by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub id: AddressId,
    pub address: String,
    pub phone: String,
}

impl From<AddressDto> for Address {
    fn from(dto: AddressDto) -> Self {
        Self {
            id: dto.id,
            address: dto.address,
            phone: dto.phone,
        }
    }
}

/// Stage of a checkout flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutStage {
    /// Picking (or creating) a delivery address.
    SelectAddress,
    /// Address chosen; picking COD vs online payment.
    SelectPaymentMethod,
    /// Order request in flight.
    Submitting,
    /// Order created (COD path).
    Completed,
    /// Browser handed off to the payment processor; this flow is dead and
    /// order existence must be re-derived from the backend.
    RedirectedToProcessor,
    /// Submission failed; control is back at the payment-method step with
    /// the same address still selected.
    Failed { message: String },
}

/// What a successful submission asks the caller to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Order exists; navigate to the order list.
    Completed { route: Route },
    /// Navigate the browser to the processor-hosted page. No order is
    /// assumed to exist yet.
    RedirectToProcessor { url: String },
}

#[derive(Debug)]
struct FlowState {
    stage: CheckoutStage,
    addresses: Vec<Address>,
    selected: Option<Address>,
}

/// One checkout attempt. Created by the storefront facade when the user
/// enters checkout; dropped on logout.
pub struct CheckoutFlow {
    api: CommerceApi,
    session: Arc<SessionStore>,
    cart: CartManager,
    notices: Notices,
    state: RwLock<FlowState>,
}

impl std::fmt::Debug for CheckoutFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutFlow")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl CheckoutFlow {
    #[must_use]
    pub fn new(
        api: CommerceApi,
        session: Arc<SessionStore>,
        cart: CartManager,
        notices: Notices,
    ) -> Self {
        Self {
            api,
            session,
            cart,
            notices,
            state: RwLock::new(FlowState {
                stage: CheckoutStage::SelectAddress,
                addresses: Vec::new(),
                selected: None,
            }),
        }
    }

    /// Current stage.
    pub async fn stage(&self) -> CheckoutStage {
        self.state.read().await.stage.clone()
    }

    /// The last fetched address list.
    pub async fn addresses(&self) -> Vec<Address> {
        self.state.read().await.addresses.clone()
    }

    /// Full address-book read; replaces the local list wholesale.
    pub async fn load_addresses(&self) -> Result<Vec<Address>> {
        let token = self.session.token().await?;
        let addresses: Vec<Address> = match self.api.list_addresses(&token).await {
            Ok(dtos) => dtos.into_iter().map(Address::from).collect(),
            Err(err) => {
                self.notices.error(err.to_string());
                return Err(err);
            }
        };

        self.state.write().await.addresses = addresses.clone();
        Ok(addresses)
    }

    /// Create an address, then refetch the list.
    pub async fn add_address(&self, address: &str, phone: &str) -> Result<Vec<Address>> {
        validate_address(address, phone)?;

        let token = self.session.token().await?;
        match self
            .api
            .create_address(&token, &NewAddressRequest { address, phone })
            .await
        {
            Ok(response) => {
                self.notices.success(
                    response.message.unwrap_or_else(|| "Address added".to_owned()),
                );
            }
            Err(err) => {
                self.notices.error(err.to_string());
                return Err(err);
            }
        }

        self.load_addresses().await
    }

    /// Delete an address, then refetch the list.
    ///
    /// Deleting the currently selected address drops the selection and
    /// returns the flow to the address step.
    pub async fn delete_address(&self, id: &AddressId) -> Result<Vec<Address>> {
        let token = self.session.token().await?;
        match self.api.delete_address(&token, id).await {
            Ok(response) => {
                self.notices.success(
                    response
                        .message
                        .unwrap_or_else(|| "Address deleted".to_owned()),
                );
            }
            Err(err) => {
                self.notices.error(err.to_string());
                return Err(err);
            }
        }

        {
            let mut state = self.state.write().await;
            if state.selected.as_ref().is_some_and(|a| &a.id == id) {
                state.selected = None;
                state.stage = CheckoutStage::SelectAddress;
            }
        }

        self.load_addresses().await
    }

    /// Choose a delivery address out of the last fetched list.
    pub async fn select_address(&self, id: &AddressId) -> Result<()> {
        let mut state = self.state.write().await;
        let chosen = state
            .addresses
            .iter()
            .find(|a| &a.id == id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("address {id}")))?;

        state.selected = Some(chosen);
        state.stage = CheckoutStage::SelectPaymentMethod;
        Ok(())
    }

    /// Submit the order with the chosen payment method.
    ///
    /// COD resolves synchronously: on success the cart is cleared and the
    /// caller navigates to the order list. Online answers with the processor
    /// URL; navigating there ends this flow with no order assumed.
    ///
    /// Runs under the cart's single-flight gate so a submission cannot
    /// interleave with cart mutations.
    pub async fn submit(&self, method: PaymentMethod) -> Result<CheckoutOutcome> {
        let selected = {
            let state = self.state.read().await;
            ready_for_submit(&state.stage, state.selected.as_ref())?
        };
        self.cart.require_non_empty().await?;

        let gate = self.cart.mutation_gate();
        let _serial = gate.lock().await;

        self.set_stage(CheckoutStage::Submitting).await;

        let token = match self.session.token().await {
            Ok(token) => token,
            Err(err) => {
                self.fail(&err).await;
                return Err(err);
            }
        };
        let request = NewOrderRequest {
            method,
            address: &selected.address,
            phone: &selected.phone,
        };

        match method {
            PaymentMethod::Cod => match self.api.create_cod_order(&token, &request).await {
                Ok(response) => {
                    self.set_stage(CheckoutStage::Completed).await;
                    self.notices.success(
                        response.message.unwrap_or_else(|| "Order placed".to_owned()),
                    );
                    self.cart.clear_cart().await;
                    Ok(CheckoutOutcome::Completed {
                        route: Route::Orders,
                    })
                }
                Err(err) => {
                    self.fail(&err).await;
                    Err(err)
                }
            },
            PaymentMethod::Online => match self.api.create_online_order(&token, &request).await {
                Ok(response) => {
                    self.set_stage(CheckoutStage::RedirectedToProcessor).await;
                    Ok(CheckoutOutcome::RedirectToProcessor { url: response.url })
                }
                Err(err) => {
                    self.fail(&err).await;
                    Err(err)
                }
            },
        }
    }

    /// Re-derive order existence after returning from the processor page.
    ///
    /// Possibly running in a fresh process lifetime, so nothing local is
    /// consulted: the order list is fetched and the newest order (if any)
    /// reported, and the cart is refetched since the backend empties it once
    /// payment lands.
    pub async fn resume_after_redirect(&self) -> Result<Option<Order>> {
        let token = self.session.token().await?;
        let orders: Vec<Order> = self
            .api
            .my_orders(&token)
            .await?
            .into_iter()
            .map(Order::from)
            .collect();

        // Whatever happened at the processor, the server cart is the truth.
        let _ = self.cart.fetch_cart().await;

        Ok(sorted_newest_first(orders).into_iter().next())
    }

    async fn set_stage(&self, stage: CheckoutStage) {
        self.state.write().await.stage = stage;
    }

    async fn fail(&self, err: &ClientError) {
        self.notices.error(err.to_string());
        self.state.write().await.stage = CheckoutStage::Failed {
            message: err.to_string(),
        };
    }
}

/// Submission precondition: an address is selected and the stage is either
/// the payment step or a failed attempt being retried.
fn ready_for_submit(stage: &CheckoutStage, selected: Option<&Address>) -> Result<Address> {
    match (stage, selected) {
        (CheckoutStage::SelectPaymentMethod | CheckoutStage::Failed { .. }, Some(address)) => {
            Ok(address.clone())
        }
        _ => Err(ClientError::Validation(
            "select a delivery address first".to_owned(),
        )),
    }
}

fn validate_address(address: &str, phone: &str) -> Result<()> {
    if address.trim().is_empty() {
        return Err(ClientError::Validation("address is required".to_owned()));
    }
    let phone_ok = (7..=15).contains(&phone.len()) && phone.bytes().all(|b| b.is_ascii_digit());
    if phone_ok {
        Ok(())
    } else {
        Err(ClientError::Validation(
            "phone must be 7-15 digits".to_owned(),
        ))
    }
}
