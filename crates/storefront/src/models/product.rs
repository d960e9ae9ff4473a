//! Catalog product ("wear").

use serde::{Deserialize, Serialize};

use julid_core::{Price, ProductId};

/// A product as served by the backend catalog.
///
/// Read-only from the client's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// Display name.
    #[serde(rename = "wearName")]
    pub name: String,
    /// Unit price in whole currency units.
    pub price: Price,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// Image URL or path, when the product has one.
    #[serde(rename = "image", default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}
