//! Clementine Core - Shared domain types.
//!
//! This crate provides the common vocabulary used across all Clementine
//! components:
//! - `client` - Headless storefront client core (sessions, cart, checkout)
//! - `integration-tests` - End-to-end tests against a stub commerce backend
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no state.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, roles, and
//!   order/payment enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
