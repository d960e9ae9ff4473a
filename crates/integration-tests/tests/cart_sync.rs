//! Cart synchronization against the fake backend.
//!
//! Every mutation goes to the server first; when the server is unreachable
//! the cart falls back to local state and degrades until reconciled.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::HashSet;

use julid_core::{CartLineId, Price, ProductId, Quantity};
use julid_integration_tests::FakeBackend;
use julid_storefront::error::StorefrontError;
use julid_storefront::notice::NoticeLevel;
use julid_storefront::services::CartMode;
use julid_storefront::state::OFFLINE_CART_NOTICE;

fn qty(n: i64) -> Quantity {
    Quantity::new(n).unwrap()
}

// =============================================================================
// Synced
// =============================================================================

#[tokio::test]
async fn test_startup_loads_server_cart() {
    let backend = FakeBackend::start().await.unwrap();
    let line = backend.seed_cart_line(ProductId::new(10), 2);

    let state = backend.storefront().await.unwrap();

    let cart = state.cart().snapshot();
    assert_eq!(cart.len(), 1);
    assert_eq!(cart.lines()[0].id, line);
    assert_eq!(cart.total(), Price::new(10000));
    assert_eq!(state.cart().mode(), CartMode::Synced);
    assert_eq!(backend.routes(), vec!["GET /api/cart"]);
}

#[tokio::test]
async fn test_add_merges_into_server_line() {
    let backend = FakeBackend::start().await.unwrap();
    let state = backend.storefront().await.unwrap();
    let gown = state.catalog().product(ProductId::new(10)).await.unwrap();

    state.cart().add(&gown, qty(1)).await;
    let cart = state.cart().add(&gown, qty(2)).await;

    assert_eq!(cart.len(), 1);
    assert_eq!(cart.lines()[0].id, CartLineId::new(1));
    assert_eq!(cart.lines()[0].quantity, qty(3));
    assert_eq!(cart.total(), Price::new(15000));
    assert_eq!(backend.cart_lines()[0].quantity, qty(3));
    assert_eq!(state.cart().mode(), CartMode::Synced);
}

#[tokio::test]
async fn test_update_remove_and_clear_follow_server() {
    let backend = FakeBackend::start().await.unwrap();
    let first = backend.seed_cart_line(ProductId::new(10), 1);
    let second = backend.seed_cart_line(ProductId::new(11), 1);
    let state = backend.storefront().await.unwrap();

    let cart = state.cart().update_quantity(second, 4).await.unwrap();
    assert_eq!(cart.line(second).unwrap().quantity, qty(4));
    assert_eq!(cart.total(), Price::new(5000 + 4 * 1200));

    let cart = state.cart().remove(first).await;
    assert_eq!(cart.len(), 1);
    assert_eq!(backend.cart_lines().len(), 1);

    let cart = state.cart().clear().await;
    assert!(cart.is_empty());
    assert!(backend.cart_lines().is_empty());
    assert_eq!(state.cart().mode(), CartMode::Synced);
}

#[tokio::test]
async fn test_zero_quantity_is_rejected_before_any_request() {
    let backend = FakeBackend::start().await.unwrap();
    let line = backend.seed_cart_line(ProductId::new(10), 2);
    let state = backend.storefront().await.unwrap();
    backend.clear_requests();

    let err = state.cart().update_quantity(line, 0).await.unwrap_err();

    assert!(matches!(err, StorefrontError::Validation(_)));
    assert!(backend.routes().is_empty());
    assert_eq!(state.cart().snapshot().lines()[0].quantity, qty(2));
}

#[tokio::test]
async fn test_every_request_has_a_unique_request_id() {
    let backend = FakeBackend::start().await.unwrap();
    let state = backend.storefront().await.unwrap();
    let scarf = state.catalog().product(ProductId::new(11)).await.unwrap();
    state.cart().add(&scarf, qty(1)).await;
    state.cart().clear().await;

    let ids: Vec<String> = backend
        .requests()
        .into_iter()
        .map(|r| r.request_id.unwrap())
        .collect();
    assert_eq!(ids.len(), 4);
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), ids.len());
}

// =============================================================================
// Degraded
// =============================================================================

#[tokio::test]
async fn test_outage_at_startup_degrades_with_notice() {
    let backend = FakeBackend::start().await.unwrap();
    backend.seed_cart_line(ProductId::new(10), 1);
    backend.set_cart_down(true);

    let state = backend.storefront().await.unwrap();

    assert_eq!(state.cart().mode(), CartMode::Degraded);
    assert!(state.cart().snapshot().is_empty());
    let notices = state.notices().active();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Info);
    assert_eq!(notices[0].message, OFFLINE_CART_NOTICE);
    assert!(notices[0].message.contains("this session only"));
    assert!(!notices[0].message.contains("will sync"));
}

#[tokio::test]
async fn test_offline_edits_apply_locally_then_reconcile_discards_them() {
    let backend = FakeBackend::start().await.unwrap();
    let state = backend.storefront().await.unwrap();
    let gown = state.catalog().product(ProductId::new(10)).await.unwrap();
    let scarf = state.catalog().product(ProductId::new(11)).await.unwrap();
    state.cart().add(&gown, qty(1)).await;

    backend.set_cart_down(true);
    let cart = state.cart().add(&scarf, qty(2)).await;
    assert_eq!(state.cart().mode(), CartMode::Degraded);
    let local = cart.line_for_product(scarf.id).unwrap().id;
    assert!(local.is_provisional());
    assert_eq!(local, CartLineId::new(-1));

    let cart = state.cart().update_quantity(local, 3).await.unwrap();
    assert_eq!(cart.total(), Price::new(5000 + 3 * 1200));

    let cart = state.cart().remove(CartLineId::new(1)).await;
    assert_eq!(cart.len(), 1);
    assert_eq!(backend.cart_lines().len(), 1);

    let err = state.cart().reconcile().await.unwrap_err();
    assert!(matches!(err, StorefrontError::ServerRejection { .. }));
    assert_eq!(state.cart().mode(), CartMode::Degraded);

    backend.set_cart_down(false);
    let cart = state.cart().reconcile().await.unwrap();
    assert_eq!(state.cart().mode(), CartMode::Synced);
    assert_eq!(cart.len(), 1);
    assert_eq!(cart.lines()[0].product.id, gown.id);
    assert!(cart.line_for_product(scarf.id).is_none());
}

#[tokio::test]
async fn test_removing_unknown_line_is_a_local_no_op() {
    let backend = FakeBackend::start().await.unwrap();
    backend.seed_cart_line(ProductId::new(12), 5);
    let state = backend.storefront().await.unwrap();

    let cart = state.cart().remove(CartLineId::new(999)).await;

    assert_eq!(cart.len(), 1);
    assert_eq!(cart.item_count(), 5);
    assert_eq!(state.cart().mode(), CartMode::Degraded);
}

#[tokio::test]
async fn test_clear_empties_local_cart_during_outage() {
    let backend = FakeBackend::start().await.unwrap();
    backend.seed_cart_line(ProductId::new(10), 1);
    let state = backend.storefront().await.unwrap();
    backend.set_cart_down(true);

    let cart = state.cart().clear().await;

    assert!(cart.is_empty());
    assert_eq!(state.cart().total(), Price::ZERO);
    assert_eq!(backend.cart_lines().len(), 1);
}
