use julid_storefront::error::StorefrontError;
use julid_storefront::state::AppState;

use crate::output;

pub async fn run(state: &AppState, phone: &str) -> Result<(), StorefrontError> {
    match state.checkout().checkout(phone).await {
        Ok(receipt) => {
            output::receipt(&receipt);
            state.notices().success("Order placed successfully");
            Ok(())
        }
        Err(e) => {
            if let StorefrontError::CheckoutAborted { committed, .. } = &e
                && !committed.is_empty()
            {
                state.notices().info(format!(
                    "{} order(s) were placed before checkout stopped; they remain in your order history",
                    committed.len()
                ));
            }
            Err(e)
        }
    }
}
