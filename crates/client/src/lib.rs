//! Clementine client core.
//!
//! The session, authorization, and commerce-state core of the Clementine
//! storefront. It keeps authentication state, cart contents, and
//! order/checkout progress consistent with the commerce backend while
//! enforcing role-based access.
//!
//! # Architecture
//!
//! - The backend is a black-box REST API reached through [`api::CommerceApi`].
//! - State services ([`session::SessionStore`], [`cart::CartManager`],
//!   [`checkout::CheckoutFlow`], [`admin::AdminOrderConsole`]) are explicit,
//!   independently testable values wired together by [`storefront::Storefront`],
//!   never ambient singletons.
//! - Consistency follows one rule: **refetch-after-write**. Every mutation is
//!   followed by a full read that replaces local state wholesale; the client
//!   never accumulates quantities or totals locally.
//! - Route decisions are pure functions over a session snapshot
//!   ([`authz::decide`]); nothing renders before the one-time session
//!   restoration settles.
//!
//! # Example
//!
//! ```rust,ignore
//! use clementine_client::{Config, Storefront};
//! use clementine_core::Role;
//!
//! let store = Storefront::new(Config::from_env()?)?;
//! store.init().await; // settle session state before any route decision
//!
//! let route = store
//!     .login(Role::User, &Credentials { email, password })
//!     .await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod admin;
pub mod api;
pub mod authz;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod notify;
pub mod orders;
pub mod session;
pub mod storefront;

pub use authz::{Route, RouteDecision, RoutePolicy};
pub use config::Config;
pub use error::{AuthError, ClientError, NetworkError, Result};
pub use notify::{Notice, NoticeLevel, Notices};
pub use storefront::Storefront;
