//! Custom (bespoke) order requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use julid_core::{CustomOrderId, Email, OrderStatus};

/// An image attached to a custom order request.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Multipart body of `POST /custom-orders/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomOrderRequest {
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub description: String,
    pub status: OrderStatus,
    pub image: Option<ImageUpload>,
}

/// A custom order as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomOrder {
    pub id: CustomOrderId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub description: String,
    /// URL of the uploaded reference image.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
