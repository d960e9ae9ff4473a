//! Shop order endpoints.

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use tracing::instrument;

use julid_core::{Email, OrderId};

use super::{ApiClient, ApiError};
use crate::models::{OrderRecord, OrderRequest};

/// Order creation and the "order placed" notification used by checkout.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Create one shop order. Rejections carry the server's `detail` or
    /// `message` when present.
    async fn create_order(&self, order: &OrderRequest) -> Result<OrderRecord, ApiError>;

    /// Ask the backend to email the buyer (and the shop) about a new order.
    async fn notify_order_placed(&self, order: OrderId, email: &Email) -> Result<(), ApiError>;
}

#[derive(Serialize)]
struct OrderNotice<'a> {
    id: OrderId,
    email: &'a str,
}

#[async_trait]
impl OrderGateway for ApiClient {
    #[instrument(skip(self, order), fields(line_id = %order.line_id, total = %order.total, request_id = tracing::field::Empty))]
    async fn create_order(&self, order: &OrderRequest) -> Result<OrderRecord, ApiError> {
        let url = self.url("shop-orders/")?;
        self.send_json(self.request(Method::POST, url).json(order))
            .await
    }

    #[instrument(skip(self, email), fields(order_id = %order, request_id = tracing::field::Empty))]
    async fn notify_order_placed(&self, order: OrderId, email: &Email) -> Result<(), ApiError> {
        let url = self.url("notifications/shop-order-placed/")?;
        let body = OrderNotice {
            id: order,
            email: email.as_str(),
        };
        self.send_empty(self.request(Method::POST, url).json(&body))
            .await
    }
}

impl ApiClient {
    /// Shop orders, optionally filtered by buyer email, ascending by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    #[instrument(skip(self, email), fields(request_id = tracing::field::Empty))]
    pub async fn fetch_shop_orders(
        &self,
        email: Option<&Email>,
    ) -> Result<Vec<OrderRecord>, ApiError> {
        let query: Vec<(&str, String)> = email
            .map(|e| vec![("email", e.as_str().to_string())])
            .unwrap_or_default();
        let url = self.url_with_query("shop-orders/", &query)?;

        let mut orders: Vec<OrderRecord> = self.send_json(self.request(Method::GET, url)).await?;
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }

    /// Cancel (delete) a shop order.
    ///
    /// # Errors
    ///
    /// Returns an error if the order is unknown or the backend refuses.
    #[instrument(skip(self), fields(order_id = %order, request_id = tracing::field::Empty))]
    pub async fn cancel_shop_order(&self, order: OrderId) -> Result<(), ApiError> {
        let url = self.url(&format!("shop-orders/{order}/"))?;
        self.send_empty(self.request(Method::DELETE, url)).await
    }

    /// Ask the backend to email the buyer that an order was fulfilled.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails; callers treat this as best
    /// effort.
    #[instrument(skip(self, email), fields(order_id = %order, request_id = tracing::field::Empty))]
    pub async fn notify_order_completed(
        &self,
        order: OrderId,
        email: &Email,
    ) -> Result<(), ApiError> {
        let url = self.url("notifications/shop-order-completed/")?;
        let body = OrderNotice {
            id: order,
            email: email.as_str(),
        };
        self.send_empty(self.request(Method::POST, url).json(&body))
            .await
    }
}
