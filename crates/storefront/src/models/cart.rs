//! Cart lines and the cart snapshot.

use serde::{Deserialize, Serialize};

use julid_core::{CartLineId, OrderStatus, Price, ProductId, Quantity};

use super::Product;

/// One product-quantity-status tuple within a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Server-assigned line identity (negative while only held locally).
    pub id: CartLineId,
    pub product: Product,
    pub quantity: Quantity,
    #[serde(default)]
    pub status: OrderStatus,
}

impl CartLine {
    /// Price of the whole line (`unit price × quantity`).
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.quantity)
    }
}

/// Ordered collection of cart lines.
///
/// Holds at most one line per product. The total is derived on every call
/// and never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartSnapshot {
    lines: Vec<CartLine>,
}

impl CartSnapshot {
    /// An empty cart.
    #[must_use]
    pub const fn empty() -> Self {
        Self { lines: Vec::new() }
    }

    /// Lines in cart order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// `Σ line.product.price × line.quantity`.
    #[must_use]
    pub fn total(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity.get())).sum()
    }

    /// Find a line by its id.
    #[must_use]
    pub fn line(&self, id: CartLineId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.id == id)
    }

    /// Find the line holding `product`.
    #[must_use]
    pub fn line_for_product(&self, product: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product.id == product)
    }

    /// Accept an authoritative line returned by the backend for an add.
    ///
    /// Replaces the line holding the same product (the backend merges adds
    /// into the existing line), otherwise appends.
    pub(crate) fn accept_added(&mut self, requested: ProductId, line: CartLine) {
        let returned = line.product.id;
        match self
            .lines
            .iter_mut()
            .find(|l| l.product.id == returned || l.product.id == requested)
        {
            Some(existing) => *existing = line,
            None => self.lines.push(line),
        }
    }

    /// Apply an add locally: bump the existing line or append a new one
    /// carrying `provisional_id`.
    pub(crate) fn add_local(
        &mut self,
        product: &Product,
        quantity: Quantity,
        provisional_id: impl FnOnce() -> CartLineId,
    ) {
        if let Some(existing) = self.lines.iter_mut().find(|l| l.product.id == product.id) {
            existing.quantity = existing.quantity.saturating_add(quantity);
            return;
        }
        self.lines.push(CartLine {
            id: provisional_id(),
            product: product.clone(),
            quantity,
            status: OrderStatus::Pending,
        });
    }

    /// Replace the line with the same id as `line`. Unknown ids are ignored.
    pub(crate) fn replace_line(&mut self, line: CartLine) {
        if let Some(existing) = self.lines.iter_mut().find(|l| l.id == line.id) {
            *existing = line;
        }
    }

    /// Set a line's quantity locally. Unknown ids are ignored.
    pub(crate) fn set_quantity(&mut self, id: CartLineId, quantity: Quantity) {
        if let Some(existing) = self.lines.iter_mut().find(|l| l.id == id) {
            existing.quantity = quantity;
        }
    }

    /// Drop a line. Removing an absent id is a no-op.
    pub(crate) fn remove(&mut self, id: CartLineId) {
        self.lines.retain(|l| l.id != id);
    }

    pub(crate) fn clear(&mut self) {
        self.lines.clear();
    }
}

impl From<Vec<CartLine>> for CartSnapshot {
    fn from(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }
}

impl<'a> IntoIterator for &'a CartSnapshot {
    type Item = &'a CartLine;
    type IntoIter = std::slice::Iter<'a, CartLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn product(id: i32, price: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("wear-{id}"),
            price: Price::new(price),
            description: String::new(),
            category: String::new(),
            image_ref: None,
        }
    }

    fn line(id: i32, product_id: i32, price: i64, qty: i64) -> CartLine {
        CartLine {
            id: CartLineId::new(id),
            product: product(product_id, price),
            quantity: Quantity::new(qty).unwrap(),
            status: OrderStatus::Pending,
        }
    }

    #[test]
    fn test_total_is_sum_of_line_totals() {
        let cart = CartSnapshot::from(vec![line(1, 10, 5000, 2), line(2, 11, 1200, 3)]);
        assert_eq!(cart.total(), Price::new(13600));
        assert_eq!(cart.item_count(), 5);
        assert_eq!(CartSnapshot::empty().total(), Price::ZERO);
    }

    #[test]
    fn test_add_local_merges_by_product() {
        let mut cart = CartSnapshot::from(vec![line(1, 10, 5000, 2)]);
        cart.add_local(&product(10, 5000), Quantity::new(3).unwrap(), || {
            CartLineId::new(-1)
        });
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity.get(), 5);

        cart.add_local(&product(11, 700), Quantity::ONE, || CartLineId::new(-1));
        assert_eq!(cart.len(), 2);
        assert!(cart.lines()[1].id.is_provisional());
    }

    #[test]
    fn test_accept_added_replaces_merged_line() {
        let mut cart = CartSnapshot::from(vec![line(1, 10, 5000, 2)]);
        cart.accept_added(ProductId::new(10), line(1, 10, 5000, 4));
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity.get(), 4);

        cart.accept_added(ProductId::new(12), line(7, 12, 100, 1));
        assert_eq!(cart.len(), 2);
        assert_eq!(cart.line(CartLineId::new(7)).unwrap().product.id, ProductId::new(12));
    }

    #[test]
    fn test_remove_absent_line_is_noop() {
        let mut cart = CartSnapshot::from(vec![line(1, 10, 5000, 2)]);
        let before = cart.clone();
        cart.remove(CartLineId::new(99));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_deserialize_backend_array() {
        let json = r#"[{"id":4,"product":{"id":10,"wearName":"Kaftan","price":2500},"quantity":2}]"#;
        let cart: CartSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].status, OrderStatus::Pending);
        assert_eq!(cart.total(), Price::new(5000));
    }
}
