//! Shop order history.

use julid_core::{Email, OrderId};
use julid_storefront::error::StorefrontError;
use julid_storefront::state::AppState;

use crate::output;

pub async fn list(state: &AppState) -> Result<(), StorefrontError> {
    let email = signed_in_email(state)?;
    let orders = state.api().fetch_shop_orders(Some(&email)).await?;
    output::orders(&orders);
    Ok(())
}

pub async fn cancel(state: &AppState, id: OrderId, yes: bool) -> Result<(), StorefrontError> {
    signed_in_email(state)?;
    if !yes {
        state
            .notices()
            .info(format!("Pass --yes to cancel order {id}"));
        return Ok(());
    }
    state.api().cancel_shop_order(id).await?;
    state.notices().success("Order cancelled successfully");
    Ok(())
}

pub async fn notify_completed(state: &AppState, id: OrderId) -> Result<(), StorefrontError> {
    let email = signed_in_email(state)?;
    state
        .api()
        .notify_order_completed(id, &email)
        .await
        .map_err(StorefrontError::Notification)?;
    state
        .notices()
        .success(format!("Completion email sent for order {id}"));
    Ok(())
}

fn signed_in_email(state: &AppState) -> Result<Email, StorefrontError> {
    state
        .identity()
        .map(|identity| identity.email)
        .ok_or(StorefrontError::AuthRequired)
}
