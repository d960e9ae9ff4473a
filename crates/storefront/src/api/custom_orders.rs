//! Custom (bespoke) order endpoints.

use async_trait::async_trait;
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use tracing::instrument;

use julid_core::{CustomOrderId, Email};

use super::{ApiClient, ApiError};
use crate::models::{CustomOrder, CustomOrderRequest};

#[async_trait]
pub trait CustomOrderGateway: Send + Sync {
    /// Submit a custom order as a multipart form.
    async fn create_custom_order(
        &self,
        request: &CustomOrderRequest,
    ) -> Result<CustomOrder, ApiError>;

    async fn notify_custom_order_placed(&self, email: &str) -> Result<(), ApiError>;

    /// Custom orders for `email`, ascending by id.
    async fn fetch_custom_orders(&self, email: &Email) -> Result<Vec<CustomOrder>, ApiError>;

    async fn cancel_custom_order(&self, id: CustomOrderId) -> Result<(), ApiError>;
}

#[derive(Serialize)]
struct CustomOrderNotice<'a> {
    email: &'a str,
}

fn multipart_form(request: &CustomOrderRequest) -> Result<Form, ApiError> {
    let form = Form::new()
        .text("name", request.name.clone())
        .text("email", request.email.as_str().to_string())
        .text("phone", request.phone.clone())
        .text("description", request.description.clone())
        .text("status", request.status.as_str());

    let Some(image) = &request.image else {
        return Ok(form);
    };
    let part = Part::bytes(image.bytes.clone())
        .file_name(image.file_name.clone())
        .mime_str(&image.content_type)?;
    Ok(form.part("image", part))
}

#[async_trait]
impl CustomOrderGateway for ApiClient {
    #[instrument(skip(self, request), fields(has_image = request.image.is_some(), request_id = tracing::field::Empty))]
    async fn create_custom_order(
        &self,
        request: &CustomOrderRequest,
    ) -> Result<CustomOrder, ApiError> {
        let url = self.url("custom-orders/")?;
        let form = multipart_form(request)?;
        self.send_json(self.request(Method::POST, url).multipart(form))
            .await
    }

    #[instrument(skip(self, email), fields(request_id = tracing::field::Empty))]
    async fn notify_custom_order_placed(&self, email: &str) -> Result<(), ApiError> {
        let url = self.url("notifications/custom-order-placed/")?;
        self.send_empty(
            self.request(Method::POST, url)
                .json(&CustomOrderNotice { email }),
        )
        .await
    }

    #[instrument(skip(self, email), fields(request_id = tracing::field::Empty))]
    async fn fetch_custom_orders(&self, email: &Email) -> Result<Vec<CustomOrder>, ApiError> {
        let url = self.url_with_query("custom-orders/", &[("email", email.as_str().to_string())])?;
        let mut orders: Vec<CustomOrder> = self.send_json(self.request(Method::GET, url)).await?;
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }

    #[instrument(skip(self), fields(custom_order_id = %id, request_id = tracing::field::Empty))]
    async fn cancel_custom_order(&self, id: CustomOrderId) -> Result<(), ApiError> {
        let url = self.url(&format!("custom-orders/{id}/"))?;
        self.send_empty(self.request(Method::DELETE, url)).await
    }
}
