//! Remote cart gateway.

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use tracing::{debug, instrument};

use julid_core::{CartLineId, ProductId, Quantity, UserId};

use super::{ApiClient, ApiError};
use crate::models::{CartLine, CartSnapshot};

/// Typed cart operations against the backend.
///
/// Every call is a single attempt whose result or error is handed back
/// unchanged; fallback policy lives in the cart store.
#[async_trait]
pub trait CartGateway: Send + Sync {
    /// Current server cart. Anything other than an array reads as empty.
    async fn fetch_cart(&self, user: Option<UserId>) -> Result<CartSnapshot, ApiError>;

    /// Add `quantity` of `product`. The backend merges into an existing
    /// line and returns the resulting line.
    async fn add_line(&self, product: ProductId, quantity: Quantity)
    -> Result<CartLine, ApiError>;

    /// Set a line's quantity. Unknown lines fail with [`ApiError::NotFound`].
    async fn update_line_quantity(
        &self,
        line: CartLineId,
        quantity: Quantity,
    ) -> Result<CartLine, ApiError>;

    async fn remove_line(&self, line: CartLineId) -> Result<(), ApiError>;

    async fn clear_cart(&self) -> Result<(), ApiError>;
}

#[derive(Serialize)]
struct AddLineBody {
    id: ProductId,
    quantity: Quantity,
}

#[derive(Serialize)]
struct UpdateLineBody {
    quantity: Quantity,
}

#[async_trait]
impl CartGateway for ApiClient {
    #[instrument(skip(self), fields(request_id = tracing::field::Empty))]
    async fn fetch_cart(&self, user: Option<UserId>) -> Result<CartSnapshot, ApiError> {
        let query: Vec<(&str, String)> = user
            .map(|id| vec![("userId", id.to_string())])
            .unwrap_or_default();
        let url = self.url_with_query("cart", &query)?;

        let body: serde_json::Value = self.send_json(self.request(Method::GET, url)).await?;
        if !body.is_array() {
            debug!("Cart response is not an array, treating as empty");
            return Ok(CartSnapshot::empty());
        }
        Ok(serde_json::from_value(body)?)
    }

    #[instrument(skip(self), fields(product_id = %product, quantity = %quantity, request_id = tracing::field::Empty))]
    async fn add_line(
        &self,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<CartLine, ApiError> {
        let url = self.url("cart/add")?;
        let body = AddLineBody {
            id: product,
            quantity,
        };
        self.send_json(self.request(Method::POST, url).json(&body))
            .await
    }

    #[instrument(skip(self), fields(line_id = %line, quantity = %quantity, request_id = tracing::field::Empty))]
    async fn update_line_quantity(
        &self,
        line: CartLineId,
        quantity: Quantity,
    ) -> Result<CartLine, ApiError> {
        let url = self.url(&format!("cart/update/{line}/"))?;
        self.send_json(
            self.request(Method::PUT, url)
                .json(&UpdateLineBody { quantity }),
        )
        .await
    }

    #[instrument(skip(self), fields(line_id = %line, request_id = tracing::field::Empty))]
    async fn remove_line(&self, line: CartLineId) -> Result<(), ApiError> {
        let url = self.url(&format!("cart/remove/{line}/"))?;
        self.send_empty(self.request(Method::DELETE, url)).await
    }

    #[instrument(skip(self), fields(request_id = tracing::field::Empty))]
    async fn clear_cart(&self) -> Result<(), ApiError> {
        let url = self.url("cart/clear")?;
        self.send_empty(self.request(Method::POST, url)).await
    }
}
