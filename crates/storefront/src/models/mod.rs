//! Domain models for the storefront client.
//!
//! These mirror the JSON shapes the backend exchanges; field names follow the
//! Rust side and are renamed onto the wire where the backend differs
//! (`wearName`, `image`, buyer `name`/`email`/`phone`).

pub mod cart;
pub mod custom_order;
pub mod identity;
pub mod order;
pub mod product;

pub use cart::{CartLine, CartSnapshot};
pub use custom_order::{CustomOrder, CustomOrderRequest, ImageUpload};
pub use identity::Identity;
pub use order::{Buyer, CheckoutReceipt, OrderRecord, OrderRequest, PlacedOrder};
pub use product::Product;
