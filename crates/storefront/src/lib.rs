//! JuliD's storefront client library.
//!
//! Keeps a client-held cart consistent with the backend cart, sequences
//! checkout into per-line shop orders, and holds the signed-in identity.
//! Everything is constructed explicitly through [`state::AppState`]; there
//! are no process-wide globals.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod notice;
pub mod services;
pub mod session;
pub mod state;
