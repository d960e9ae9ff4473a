//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `cart` - Cart state store (optimistic with local fallback)
//! - `checkout` - Checkout sequencer (one order per cart line)
//! - `auth` - Login, registration and password reset flows
//! - `custom_orders` - Bespoke order requests

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod custom_orders;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{AuthService, reset_token_from_link};
pub use cart::{CartMode, CartStore};
pub use checkout::CheckoutSequencer;
pub use custom_orders::{CustomOrderForm, CustomOrderService};
