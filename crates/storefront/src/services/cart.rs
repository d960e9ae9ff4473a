//! Cart state store.
//!
//! Holds the working [`CartSnapshot`] and applies every mutation remote
//! first. On success the server's line replaces the local one; on any
//! gateway failure the same mutation is applied to the local copy instead
//! and the store enters [`CartMode::Degraded`]. Callers never see transport
//! errors from mutations.
//!
//! Mutations are not serialized against each other: two in-flight calls
//! proceed independently and whichever response lands last wins. The state
//! lock is never held across a gateway call.

use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, instrument, warn};

use julid_core::{CartLineId, Price, Quantity};

use crate::api::CartGateway;
use crate::error::{StorefrontError, add_breadcrumb};
use crate::models::{CartSnapshot, Product};
use crate::session::SessionProvider;

/// Consistency mode of the working cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CartMode {
    /// The last remote operation succeeded.
    #[default]
    Synced,
    /// A remote operation failed and was applied locally only; the local
    /// cart may differ from the server's.
    Degraded,
}

struct CartState {
    snapshot: CartSnapshot,
    mode: CartMode,
}

/// Marks one mutation as in flight for its lifetime.
struct LoadingGuard<'a>(&'a AtomicUsize);

impl<'a> LoadingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Owner of the working cart.
pub struct CartStore {
    gateway: Arc<dyn CartGateway>,
    session: SessionProvider,
    state: RwLock<CartState>,
    in_flight: AtomicUsize,
    next_local_id: AtomicI32,
}

impl CartStore {
    /// An empty, synced store. Call [`CartStore::load`] to fetch the server
    /// cart.
    #[must_use]
    pub fn new(gateway: Arc<dyn CartGateway>, session: SessionProvider) -> Self {
        Self {
            gateway,
            session,
            state: RwLock::new(CartState {
                snapshot: CartSnapshot::empty(),
                mode: CartMode::Synced,
            }),
            in_flight: AtomicUsize::new(0),
            next_local_id: AtomicI32::new(-1),
        }
    }

    /// Replace the working cart with the server cart.
    ///
    /// On failure the current local cart is kept and the store degrades.
    #[instrument(skip(self))]
    pub async fn load(&self) -> CartMode {
        let _loading = LoadingGuard::enter(&self.in_flight);
        match self.gateway.fetch_cart(self.user()).await {
            Ok(snapshot) => {
                debug!(lines = snapshot.len(), "Cart loaded");
                self.apply(CartMode::Synced, |cart| *cart = snapshot);
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch cart, using local copy");
                self.apply(CartMode::Degraded, |_| ());
            }
        }
        self.mode()
    }

    /// Overwrite local state with the server snapshot.
    ///
    /// Local-only edits made while degraded are discarded.
    ///
    /// # Errors
    ///
    /// Returns the gateway error if the server cart cannot be fetched; the
    /// store stays degraded in that case.
    #[instrument(skip(self))]
    pub async fn reconcile(&self) -> Result<CartSnapshot, StorefrontError> {
        let _loading = LoadingGuard::enter(&self.in_flight);
        match self.gateway.fetch_cart(self.user()).await {
            Ok(snapshot) => {
                let was = self.mode();
                self.apply(CartMode::Synced, |cart| *cart = snapshot);
                info!(previous_mode = ?was, "Cart reconciled with server");
                Ok(self.snapshot())
            }
            Err(e) => {
                warn!(error = %e, "Cart reconciliation failed");
                self.apply(CartMode::Degraded, |_| ());
                Err(e.into())
            }
        }
    }

    /// Add `quantity` of `product`, merging into its existing line.
    #[instrument(skip(self, product), fields(product_id = %product.id, quantity = %quantity))]
    pub async fn add(&self, product: &Product, quantity: Quantity) -> CartSnapshot {
        let _loading = LoadingGuard::enter(&self.in_flight);
        let product_id = product.id.to_string();
        add_breadcrumb("cart", "Add to cart", Some(&[("product_id", product_id.as_str())]));

        match self.gateway.add_line(product.id, quantity).await {
            Ok(line) => {
                self.apply(CartMode::Synced, |cart| cart.accept_added(product.id, line));
            }
            Err(e) => {
                warn!(error = %e, "Add to cart failed, applying locally");
                self.apply(CartMode::Degraded, |cart| {
                    cart.add_local(product, quantity, || self.provisional_id());
                });
            }
        }
        self.snapshot()
    }

    /// Set a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Validation`] when `quantity < 1`, before
    /// any network call.
    #[instrument(skip(self), fields(line_id = %line))]
    pub async fn update_quantity(
        &self,
        line: CartLineId,
        quantity: i64,
    ) -> Result<CartSnapshot, StorefrontError> {
        let quantity =
            Quantity::new(quantity).map_err(|e| StorefrontError::validation(e.to_string()))?;

        let _loading = LoadingGuard::enter(&self.in_flight);
        let line_id = line.to_string();
        add_breadcrumb("cart", "Update quantity", Some(&[("line_id", line_id.as_str())]));

        match self.gateway.update_line_quantity(line, quantity).await {
            Ok(updated) => self.apply(CartMode::Synced, |cart| cart.replace_line(updated)),
            Err(e) => {
                warn!(error = %e, "Quantity update failed, applying locally");
                self.apply(CartMode::Degraded, |cart| cart.set_quantity(line, quantity));
            }
        }
        Ok(self.snapshot())
    }

    /// Remove a line. Removing an absent line is a no-op.
    #[instrument(skip(self), fields(line_id = %line))]
    pub async fn remove(&self, line: CartLineId) -> CartSnapshot {
        let _loading = LoadingGuard::enter(&self.in_flight);
        let line_id = line.to_string();
        add_breadcrumb("cart", "Remove from cart", Some(&[("line_id", line_id.as_str())]));

        let mode = match self.gateway.remove_line(line).await {
            Ok(()) => CartMode::Synced,
            Err(e) => {
                warn!(error = %e, "Remove from cart failed, removing locally");
                CartMode::Degraded
            }
        };
        self.apply(mode, |cart| cart.remove(line));
        self.snapshot()
    }

    /// Empty the cart regardless of the gateway outcome.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> CartSnapshot {
        let _loading = LoadingGuard::enter(&self.in_flight);
        add_breadcrumb("cart", "Clear cart", None);

        let mode = match self.gateway.clear_cart().await {
            Ok(()) => CartMode::Synced,
            Err(e) => {
                warn!(error = %e, "Clear cart failed, clearing locally");
                CartMode::Degraded
            }
        };
        self.apply(mode, CartSnapshot::clear);
        self.snapshot()
    }

    /// A copy of the working cart.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.read(|state| state.snapshot.clone())
    }

    /// Cart total, derived from the current lines.
    #[must_use]
    pub fn total(&self) -> Price {
        self.read(|state| state.snapshot.total())
    }

    /// Units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.read(|state| state.snapshot.item_count())
    }

    #[must_use]
    pub fn mode(&self) -> CartMode {
        self.read(|state| state.mode)
    }

    /// Whether at least one mutation is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    fn user(&self) -> Option<julid_core::UserId> {
        self.session.identity().map(|identity| identity.id)
    }

    fn provisional_id(&self) -> CartLineId {
        CartLineId::new(self.next_local_id.fetch_sub(1, Ordering::Relaxed))
    }

    fn read<T>(&self, f: impl FnOnce(&CartState) -> T) -> T {
        f(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn apply<T>(&self, mode: CartMode, f: impl FnOnce(&mut CartSnapshot) -> T) -> T {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.mode = mode;
        f(&mut state.snapshot)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use async_trait::async_trait;
    use tokio::sync::Notify;

    use julid_core::{ProductId, UserId};

    use super::*;
    use crate::api::ApiError;
    use crate::models::CartLine;
    use crate::services::testing::{
        FakeCartGateway, anonymous_session, product, qty, signed_in_session, unavailable,
    };

    fn store(gateway: &Arc<FakeCartGateway>) -> CartStore {
        CartStore::new(gateway.clone(), anonymous_session())
    }

    fn assert_total_invariant(cart: &CartSnapshot) {
        let expected: i64 = cart
            .lines()
            .iter()
            .map(|l| l.product.price.amount() * i64::from(l.quantity.get()))
            .sum();
        assert_eq!(cart.total(), Price::new(expected));
    }

    #[tokio::test]
    async fn test_add_accepts_server_line() {
        let gateway = Arc::new(FakeCartGateway::with_products([product(10, 5000)]));
        let store = store(&gateway);

        let cart = store.add(&product(10, 5000), qty(2)).await;
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].id, CartLineId::new(1));
        assert_eq!(store.total(), Price::new(10000));
        assert_eq!(store.mode(), CartMode::Synced);
        assert_eq!(cart, CartSnapshot::from(gateway.server_lines()));
    }

    #[tokio::test]
    async fn test_add_merges_existing_product() {
        let gateway = Arc::new(FakeCartGateway::with_products([product(10, 5000)]));
        let store = store(&gateway);

        store.add(&product(10, 5000), qty(2)).await;
        let cart = store.add(&product(10, 5000), qty(3)).await;
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity.get(), 5);

        gateway.set_offline(true);
        let cart = store.add(&product(10, 5000), qty(1)).await;
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity.get(), 6);
        assert_total_invariant(&cart);
    }

    #[tokio::test]
    async fn test_every_mutation_falls_back_when_offline() {
        let gateway = Arc::new(FakeCartGateway::offline());
        let store = store(&gateway);

        let cart = store.add(&product(10, 5000), qty(2)).await;
        assert_eq!(cart.len(), 1);
        assert!(!store.is_loading());
        assert_eq!(store.mode(), CartMode::Degraded);
        let local = cart.lines()[0].id;
        assert!(local.is_provisional());

        let cart = store.add(&product(11, 700), qty(1)).await;
        assert_eq!(cart.len(), 2);
        assert_ne!(cart.lines()[1].id, local);
        assert!(!store.is_loading());

        let cart = store.update_quantity(local, 4).await.unwrap();
        assert_eq!(cart.line(local).unwrap().quantity.get(), 4);
        assert_eq!(store.total(), Price::new(20700));
        assert!(!store.is_loading());

        let cart = store.remove(local).await;
        assert!(cart.line(local).is_none());
        assert!(!store.is_loading());

        let cart = store.clear().await;
        assert!(cart.is_empty());
        assert!(!store.is_loading());
        assert_eq!(store.total(), Price::ZERO);

        assert_eq!(gateway.calls(), vec![
            "add:10",
            "add:11",
            format!("update:{local}:4").as_str(),
            format!("remove:{local}").as_str(),
            "clear",
        ]);
    }

    #[tokio::test]
    async fn test_remove_absent_line_is_noop() {
        let gateway = Arc::new(FakeCartGateway::with_products([product(10, 5000)]));
        let store = store(&gateway);
        store.add(&product(10, 5000), qty(1)).await;

        let before = store.snapshot();
        let after = store.remove(CartLineId::new(99)).await;
        assert_eq!(before, after);

        gateway.set_offline(true);
        let after = store.remove(CartLineId::new(99)).await;
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_update_below_one_is_rejected_without_network() {
        let gateway = Arc::new(FakeCartGateway::with_products([product(10, 5000)]));
        let store = store(&gateway);
        let cart = store.add(&product(10, 5000), qty(2)).await;
        let line = cart.lines()[0].id;

        for bad in [0, -3] {
            let err = store.update_quantity(line, bad).await.unwrap_err();
            assert!(matches!(err, StorefrontError::Validation(_)));
        }
        assert_eq!(gateway.calls(), vec!["add:10"]);
        assert_eq!(store.snapshot(), cart);
    }

    #[tokio::test]
    async fn test_update_unknown_line_falls_back_locally() {
        let gateway = Arc::new(FakeCartGateway::with_products([product(10, 5000)]));
        let store = store(&gateway);
        let cart = store.add(&product(10, 5000), qty(2)).await;

        // NotFound from the backend is a gateway failure like any other
        let updated = store.update_quantity(CartLineId::new(42), 3).await.unwrap();
        assert_eq!(updated, cart);
        assert_eq!(store.mode(), CartMode::Degraded);
    }

    #[tokio::test]
    async fn test_total_invariant_across_mutations() {
        let gateway = Arc::new(FakeCartGateway::with_products([
            product(10, 5000),
            product(11, 1250),
            product(12, 99),
        ]));
        let store = store(&gateway);

        store.add(&product(10, 5000), qty(2)).await;
        assert_total_invariant(&store.snapshot());
        store.add(&product(11, 1250), qty(3)).await;
        assert_total_invariant(&store.snapshot());
        gateway.set_offline(true);
        store.add(&product(12, 99), qty(7)).await;
        assert_total_invariant(&store.snapshot());
        store.update_quantity(CartLineId::new(1), 1).await.unwrap();
        assert_total_invariant(&store.snapshot());
        store.remove(CartLineId::new(2)).await;
        assert_total_invariant(&store.snapshot());

        assert_eq!(store.total(), Price::new(5000 + 99 * 7));
        assert_eq!(store.item_count(), 8);
    }

    #[tokio::test]
    async fn test_load_degrades_and_keeps_local_cart() {
        let gateway = Arc::new(FakeCartGateway::with_products([product(10, 5000)]));
        let store = store(&gateway);
        store.add(&product(10, 5000), qty(1)).await;

        gateway.set_offline(true);
        assert_eq!(store.load().await, CartMode::Degraded);
        assert_eq!(store.snapshot().len(), 1);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_reconcile_server_snapshot_overrides_local_edits() {
        let gateway = Arc::new(FakeCartGateway::with_products([product(10, 5000)]));
        let store = store(&gateway);
        store.add(&product(10, 5000), qty(1)).await;

        gateway.set_offline(true);
        store.add(&product(11, 700), qty(2)).await;
        assert_eq!(store.snapshot().len(), 2);

        let err = store.reconcile().await.unwrap_err();
        assert!(matches!(err, StorefrontError::ServerRejection { .. }));
        assert_eq!(store.mode(), CartMode::Degraded);
        assert_eq!(store.snapshot().len(), 2);

        gateway.set_offline(false);
        let cart = store.reconcile().await.unwrap();
        assert_eq!(cart, CartSnapshot::from(gateway.server_lines()));
        assert_eq!(cart.len(), 1);
        assert_eq!(store.mode(), CartMode::Synced);
    }

    /// Stalls `add_line` until released, then fails.
    #[derive(Default)]
    struct StallingGateway {
        release: Notify,
    }

    #[async_trait]
    impl CartGateway for StallingGateway {
        async fn fetch_cart(&self, _user: Option<UserId>) -> Result<CartSnapshot, ApiError> {
            Ok(CartSnapshot::empty())
        }

        async fn add_line(
            &self,
            _product: ProductId,
            _quantity: Quantity,
        ) -> Result<CartLine, ApiError> {
            self.release.notified().await;
            Err(unavailable())
        }

        async fn update_line_quantity(
            &self,
            _line: CartLineId,
            _quantity: Quantity,
        ) -> Result<CartLine, ApiError> {
            Err(unavailable())
        }

        async fn remove_line(&self, _line: CartLineId) -> Result<(), ApiError> {
            Err(unavailable())
        }

        async fn clear_cart(&self) -> Result<(), ApiError> {
            Err(unavailable())
        }
    }

    #[tokio::test]
    async fn test_loading_is_set_while_in_flight() {
        let gateway = Arc::new(StallingGateway::default());
        let store = CartStore::new(gateway.clone(), signed_in_session());
        assert!(!store.is_loading());

        let item = product(10, 5000);
        let (cart, ()) = tokio::join!(store.add(&item, qty(1)), async {
            tokio::task::yield_now().await;
            assert!(store.is_loading());
            gateway.release.notify_one();
        });

        assert_eq!(cart.len(), 1);
        assert!(!store.is_loading());
    }
}
