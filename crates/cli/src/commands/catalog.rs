use julid_core::ProductId;
use julid_storefront::error::StorefrontError;
use julid_storefront::state::AppState;

use crate::output;

pub async fn list(state: &AppState) -> Result<(), StorefrontError> {
    let products = state.catalog().products().await?;
    output::products(&products);
    Ok(())
}

pub async fn show(state: &AppState, id: ProductId) -> Result<(), StorefrontError> {
    let product = state.catalog().product(id).await?;
    output::product(&product);
    Ok(())
}
