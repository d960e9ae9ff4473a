//! Checkout sequencing against the fake backend.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use secrecy::SecretString;
use serde_json::json;

use julid_core::{CartLineId, OrderId, Price, ProductId, Quantity};
use julid_integration_tests::{FakeBackend, SEED_EMAIL, SEED_PASSWORD};
use julid_storefront::error::StorefrontError;
use julid_storefront::state::AppState;

const PHONE: &str = "0800000000";

async fn signed_in(backend: &FakeBackend) -> AppState {
    let state = backend.storefront().await.unwrap();
    state
        .auth()
        .login(SEED_EMAIL, &SecretString::from(SEED_PASSWORD.to_string()))
        .await
        .unwrap();
    state
}

async fn fill(state: &AppState, items: &[(i32, i64)]) {
    for &(product, quantity) in items {
        let product = state.catalog().product(ProductId::new(product)).await.unwrap();
        state
            .cart()
            .add(&product, Quantity::new(quantity).unwrap())
            .await;
    }
}

#[tokio::test]
async fn test_checkout_places_one_order_per_line_in_cart_order() {
    let backend = FakeBackend::start().await.unwrap();
    let state = signed_in(&backend).await;
    fill(&state, &[(10, 2), (11, 1)]).await;
    backend.clear_requests();

    let receipt = state.checkout().checkout(PHONE).await.unwrap();

    assert_eq!(receipt.orders.len(), 2);
    assert_eq!(receipt.total(), Price::new(11200));
    assert_eq!(receipt.orders[0].order_id, OrderId::new(100));
    assert_eq!(receipt.orders[1].order_id, OrderId::new(101));
    assert!(receipt.orders.iter().all(|o| o.notified));

    assert_eq!(
        backend.routes(),
        vec![
            "POST /api/shop-orders/",
            "POST /api/notifications/shop-order-placed/",
            "POST /api/shop-orders/",
            "POST /api/notifications/shop-order-placed/",
            "POST /api/cart/clear",
        ]
    );
    assert!(
        backend
            .requests()
            .iter()
            .all(|r| r.authorization.as_deref() == Some("Bearer token-1"))
    );

    let orders = backend.orders();
    assert_eq!(orders[0]["wearName"], "Ankara Gown");
    assert_eq!(orders[0]["quantity"], 2);
    assert_eq!(orders[0]["total"], 10000);
    assert_eq!(orders[0]["status"], "pending");
    assert_eq!(orders[0]["name"], "Ada");
    assert_eq!(orders[0]["email"], SEED_EMAIL);
    assert_eq!(orders[0]["phone"], PHONE);

    let notified: Vec<_> = backend.notifications().into_iter().map(|n| n.body).collect();
    assert_eq!(
        notified,
        vec![
            json!({ "id": 100, "email": SEED_EMAIL }),
            json!({ "id": 101, "email": SEED_EMAIL }),
        ]
    );

    assert!(state.cart().snapshot().is_empty());
    assert!(backend.cart_lines().is_empty());
}

#[tokio::test]
async fn test_rejected_line_stops_checkout_and_keeps_earlier_orders() {
    let backend = FakeBackend::start().await.unwrap();
    let state = signed_in(&backend).await;
    fill(&state, &[(10, 1), (11, 2), (12, 3)]).await;
    backend.reject_order_for_line(CartLineId::new(2));

    let err = state.checkout().checkout(PHONE).await.unwrap_err();

    match &err {
        StorefrontError::CheckoutAborted {
            line, committed, ..
        } => {
            assert_eq!(*line, CartLineId::new(2));
            assert_eq!(committed.len(), 1);
            assert_eq!(committed[0].line_id, CartLineId::new(1));
        }
        other => panic!("expected CheckoutAborted, got {other:?}"),
    }
    assert_eq!(err.user_message(), "Out of stock");

    assert_eq!(backend.orders().len(), 1);
    assert!(!backend.routes().contains(&"POST /api/cart/clear".to_string()));
    assert_eq!(state.cart().snapshot().len(), 3);
    assert_eq!(backend.cart_lines().len(), 3);
}

#[tokio::test]
async fn test_notification_outage_does_not_fail_checkout() {
    let backend = FakeBackend::start().await.unwrap();
    let state = signed_in(&backend).await;
    fill(&state, &[(12, 1)]).await;
    backend.set_notifications_down(true);

    let receipt = state.checkout().checkout(PHONE).await.unwrap();

    assert_eq!(receipt.orders.len(), 1);
    assert!(!receipt.orders[0].notified);
    assert_eq!(backend.notifications().len(), 1);
    assert!(state.cart().snapshot().is_empty());
}

#[tokio::test]
async fn test_checkout_requires_sign_in() {
    let backend = FakeBackend::start().await.unwrap();
    let state = backend.storefront().await.unwrap();
    fill(&state, &[(10, 1)]).await;
    backend.clear_requests();

    let err = state.checkout().checkout(PHONE).await.unwrap_err();

    assert!(matches!(err, StorefrontError::AuthRequired));
    assert_eq!(err.user_message(), "Please login to continue");
    assert!(backend.routes().is_empty());
    assert_eq!(state.cart().snapshot().len(), 1);
}

#[tokio::test]
async fn test_blank_phone_is_rejected() {
    let backend = FakeBackend::start().await.unwrap();
    let state = signed_in(&backend).await;
    fill(&state, &[(10, 1)]).await;
    backend.clear_requests();

    let err = state.checkout().checkout("   ").await.unwrap_err();

    assert!(matches!(err, StorefrontError::Validation(_)));
    assert!(backend.routes().is_empty());
}

#[tokio::test]
async fn test_order_history_and_cancellation() {
    let backend = FakeBackend::start().await.unwrap();
    let state = signed_in(&backend).await;
    fill(&state, &[(10, 1), (11, 1)]).await;
    state.checkout().checkout(PHONE).await.unwrap();
    let email = state.identity().unwrap().email;

    let orders = state.api().fetch_shop_orders(Some(&email)).await.unwrap();
    let ids: Vec<_> = orders.iter().map(|o| o.id.unwrap()).collect();
    assert_eq!(ids, vec![OrderId::new(100), OrderId::new(101)]);
    assert_eq!(orders[0].product_name.as_deref(), Some("Ankara Gown"));

    state.api().cancel_shop_order(OrderId::new(100)).await.unwrap();
    let orders = state.api().fetch_shop_orders(Some(&email)).await.unwrap();
    assert_eq!(orders.len(), 1);

    let err: StorefrontError = state
        .api()
        .cancel_shop_order(OrderId::new(100))
        .await
        .unwrap_err()
        .into();
    assert!(matches!(err, StorefrontError::NotFound(_)));

    state
        .api()
        .notify_order_completed(OrderId::new(101), &email)
        .await
        .unwrap();
    let last = backend.notifications().pop().unwrap();
    assert_eq!(last.kind, "shop-order-completed");
}
