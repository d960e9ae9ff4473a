//! Custom (bespoke) order requests.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use julid_core::{CustomOrderId, Email, OrderStatus};

use crate::api::CustomOrderGateway;
use crate::error::{StorefrontError, add_breadcrumb};
use crate::models::{CustomOrder, CustomOrderRequest, ImageUpload};
use crate::session::SessionProvider;

/// What the customer filled in. Blank name/email are taken from the signed-in
/// identity.
#[derive(Debug, Clone, Default)]
pub struct CustomOrderForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: String,
    pub description: String,
    pub image: Option<ImageUpload>,
}

pub struct CustomOrderService {
    gateway: Arc<dyn CustomOrderGateway>,
    session: SessionProvider,
}

impl CustomOrderService {
    #[must_use]
    pub fn new(gateway: Arc<dyn CustomOrderGateway>, session: SessionProvider) -> Self {
        Self { gateway, session }
    }

    /// Build a validated request from `form`.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when name, email, phone or description is
    /// missing or the email is malformed.
    pub fn prepare(&self, form: CustomOrderForm) -> Result<CustomOrderRequest, StorefrontError> {
        let identity = self.session.identity();

        let name = non_blank(form.name)
            .or_else(|| identity.as_ref().map(|i| i.display_name().to_string()))
            .ok_or_else(|| StorefrontError::validation("Name is required"))?;

        let email = match non_blank(form.email) {
            Some(raw) => Email::parse(&raw)
                .map_err(|e| StorefrontError::validation(format!("Invalid email: {e}")))?,
            None => identity
                .map(|i| i.email)
                .ok_or_else(|| StorefrontError::validation("Email is required"))?,
        };

        let phone = form.phone.trim();
        if phone.is_empty() {
            return Err(StorefrontError::validation("Phone number is required"));
        }
        let description = form.description.trim();
        if description.is_empty() {
            return Err(StorefrontError::validation("Please describe your order"));
        }

        Ok(CustomOrderRequest {
            name,
            email,
            phone: phone.to_string(),
            description: description.to_string(),
            status: OrderStatus::Pending,
            image: form.image,
        })
    }

    /// Submit a custom order, then notify best effort.
    ///
    /// The notification goes to the email the server returned, falling back
    /// to the submitted one. Its failure is logged only.
    ///
    /// # Errors
    ///
    /// Returns `Validation` (see [`Self::prepare`]) or the submission error.
    #[instrument(skip(self, form))]
    pub async fn submit(&self, form: CustomOrderForm) -> Result<CustomOrder, StorefrontError> {
        let request = self.prepare(form)?;
        add_breadcrumb("custom_order", "Custom order submitted", None);

        let created = self.gateway.create_custom_order(&request).await?;
        info!(custom_order_id = %created.id, "Custom order created");

        let notify_to = created
            .email
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| request.email.as_str());
        if let Err(e) = self.gateway.notify_custom_order_placed(notify_to).await {
            warn!(
                custom_order_id = %created.id,
                error = %StorefrontError::Notification(e),
                "Custom order notification failed"
            );
        }

        Ok(created)
    }

    /// Custom orders for `email`, or for the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `AuthRequired` when no email is given and nobody is signed in,
    /// or the gateway error.
    pub async fn list(&self, email: Option<&Email>) -> Result<Vec<CustomOrder>, StorefrontError> {
        let email = match email {
            Some(email) => email.clone(),
            None => self
                .session
                .identity()
                .map(|i| i.email)
                .ok_or(StorefrontError::AuthRequired)?,
        };
        Ok(self.gateway.fetch_custom_orders(&email).await?)
    }

    /// Cancel (delete) a custom order.
    ///
    /// # Errors
    ///
    /// Returns the gateway error.
    pub async fn cancel(&self, id: CustomOrderId) -> Result<(), StorefrontError> {
        self.gateway.cancel_custom_order(id).await?;
        info!(custom_order_id = %id, "Custom order cancelled");
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
