//! JuliD's Core - Shared types library.
//!
//! This crate provides the domain types used by every part of the storefront
//! client:
//! - `storefront` - Cart store, checkout sequencer, session and backend gateway
//! - `cli` - Command-line front end driving the storefront
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no async.
//! This keeps it lightweight and lets the storefront and the tests share the
//! same wire representations.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, quantities, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
