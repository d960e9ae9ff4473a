//! Cart commands.
//!
//! Update, remove and clear never fail on a backend outage: the store falls
//! back to the local cart for the rest of this run, and nothing is saved.
//! Adding needs the catalog, so `add` fails outright when the store is
//! unreachable.

use julid_core::{CartLineId, ProductId, Quantity};
use julid_storefront::error::StorefrontError;
use julid_storefront::services::CartMode;
use julid_storefront::state::AppState;

use crate::output;

const OFFLINE: &str =
    "The store could not be reached; this change lasts only until the command exits and was not saved to your cart.";

/// Shown when `cart add` cannot reach the store to look the product up.
pub const ADD_NEEDS_CONNECTION: &str =
    "Adding to the cart needs a connection to the store; nothing was added.";

pub fn show(state: &AppState) {
    output::cart(&state.cart().snapshot(), state.cart().mode());
}

pub async fn add(
    state: &AppState,
    product_id: ProductId,
    quantity: Quantity,
) -> Result<(), StorefrontError> {
    let product = state.catalog().product(product_id).await?;
    let snapshot = state.cart().add(&product, quantity).await;
    report_mode(state, &format!("Added {} to cart", product.name));
    output::cart(&snapshot, state.cart().mode());
    Ok(())
}

pub async fn update(
    state: &AppState,
    line: CartLineId,
    quantity: i64,
) -> Result<(), StorefrontError> {
    let snapshot = state.cart().update_quantity(line, quantity).await?;
    report_mode(state, "Cart updated");
    output::cart(&snapshot, state.cart().mode());
    Ok(())
}

pub async fn remove(state: &AppState, line: CartLineId, yes: bool) {
    if !yes {
        state
            .notices()
            .info(format!("Pass --yes to remove cart line {line}"));
        return;
    }
    let snapshot = state.cart().remove(line).await;
    report_mode(state, "Item removed from cart");
    output::cart(&snapshot, state.cart().mode());
}

pub async fn clear(state: &AppState, yes: bool) {
    if !yes {
        state.notices().info("Pass --yes to empty the cart");
        return;
    }
    let snapshot = state.cart().clear().await;
    report_mode(state, "Cart cleared");
    output::cart(&snapshot, state.cart().mode());
}

pub async fn reconcile(state: &AppState) -> Result<(), StorefrontError> {
    let snapshot = state.cart().reconcile().await?;
    state.notices().success("Cart synced with the server");
    output::cart(&snapshot, state.cart().mode());
    Ok(())
}

fn report_mode(state: &AppState, done: &str) {
    match state.cart().mode() {
        CartMode::Synced => state.notices().success(done),
        CartMode::Degraded => state.notices().info(OFFLINE),
    };
}
