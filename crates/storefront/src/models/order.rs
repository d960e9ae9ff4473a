//! Shop orders: the per-line request submitted at checkout and the record the
//! backend returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use julid_core::{CartLineId, Email, OrderId, OrderStatus, Price, Quantity};

use super::CartLine;

/// Buyer details stamped on every order of a checkout run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buyer {
    pub name: String,
    pub email: Email,
    pub phone: String,
}

/// Body of `POST /shop-orders/`, one per cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    /// Cart line this order commits.
    #[serde(rename = "id")]
    pub line_id: CartLineId,
    #[serde(rename = "wearName")]
    pub product_name: String,
    pub price: Price,
    pub category: String,
    pub description: String,
    #[serde(rename = "image", skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    pub quantity: Quantity,
    pub status: OrderStatus,
    pub total: Price,
    #[serde(rename = "name")]
    pub buyer_name: String,
    #[serde(rename = "email")]
    pub buyer_email: Email,
    #[serde(rename = "phone")]
    pub buyer_phone: String,
}

impl OrderRequest {
    /// Build the order for one cart line. Orders always start `pending`.
    #[must_use]
    pub fn for_line(line: &CartLine, buyer: &Buyer) -> Self {
        Self {
            line_id: line.id,
            product_name: line.product.name.clone(),
            price: line.product.price,
            category: line.product.category.clone(),
            description: line.product.description.clone(),
            image_ref: line.product.image_ref.clone(),
            quantity: line.quantity,
            status: OrderStatus::Pending,
            total: line.line_total(),
            buyer_name: buyer.name.clone(),
            buyer_email: buyer.email.clone(),
            buyer_phone: buyer.phone.clone(),
        }
    }
}

/// An order as stored by the backend.
///
/// Every field is optional on the way in: the client only relies on `id`,
/// and falls back to the cart line id when the backend omits it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    #[serde(default)]
    pub id: Option<OrderId>,
    #[serde(rename = "wearName", default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub quantity: Option<Quantity>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub total: Option<Price>,
    #[serde(rename = "name", default)]
    pub buyer_name: Option<String>,
    #[serde(rename = "email", default)]
    pub buyer_email: Option<String>,
    #[serde(rename = "phone", default)]
    pub buyer_phone: Option<String>,
    #[serde(rename = "image", default)]
    pub image_ref: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// An order committed during a checkout run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub line_id: CartLineId,
    /// Server-assigned id, or the line id when the server returned none.
    pub order_id: OrderId,
    /// Line total as submitted.
    pub total: Price,
    /// Whether the "order placed" notification went through.
    pub notified: bool,
    pub record: OrderRecord,
}

/// Outcome of a successful checkout run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutReceipt {
    pub run_id: Uuid,
    /// Orders in cart line order.
    pub orders: Vec<PlacedOrder>,
}

impl CheckoutReceipt {
    /// Sum of the committed orders' totals as submitted.
    #[must_use]
    pub fn total(&self) -> Price {
        self.orders.iter().map(|o| o.total).sum()
    }
}
