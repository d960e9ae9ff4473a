//! Custom order requests against the fake backend.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use secrecy::SecretString;

use julid_core::OrderStatus;
use julid_integration_tests::{FakeBackend, SEED_EMAIL, SEED_PASSWORD};
use julid_storefront::error::StorefrontError;
use julid_storefront::models::ImageUpload;
use julid_storefront::services::CustomOrderForm;
use julid_storefront::state::AppState;

async fn signed_in(backend: &FakeBackend) -> AppState {
    let state = backend.storefront().await.unwrap();
    state
        .auth()
        .login(SEED_EMAIL, &SecretString::from(SEED_PASSWORD.to_string()))
        .await
        .unwrap();
    state
}

fn form() -> CustomOrderForm {
    CustomOrderForm {
        phone: "0800000000".to_string(),
        description: "Aso-oke wedding set, two pieces".to_string(),
        ..CustomOrderForm::default()
    }
}

#[tokio::test]
async fn test_submit_uploads_image_and_notifies() {
    let backend = FakeBackend::start().await.unwrap();
    let state = signed_in(&backend).await;

    let created = state
        .custom_orders()
        .submit(CustomOrderForm {
            image: Some(ImageUpload {
                file_name: "sketch.png".to_string(),
                content_type: "image/png".to_string(),
                bytes: vec![0x89, b'P', b'N', b'G'],
            }),
            ..form()
        })
        .await
        .unwrap();

    assert_eq!(created.status, OrderStatus::Pending);
    assert_eq!(created.name.as_deref(), Some("Ada"));
    assert_eq!(created.email.as_deref(), Some(SEED_EMAIL));

    let images = backend.custom_order_images();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].file_name, "sketch.png");
    assert_eq!(images[0].content_type.as_deref(), Some("image/png"));
    assert_eq!(images[0].len, 4);

    let notifications = backend.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, "custom-order-placed");
    assert_eq!(notifications[0].body["email"], SEED_EMAIL);
}

#[tokio::test]
async fn test_submit_succeeds_when_notification_fails() {
    let backend = FakeBackend::start().await.unwrap();
    let state = signed_in(&backend).await;
    backend.set_notifications_down(true);

    state.custom_orders().submit(form()).await.unwrap();

    assert_eq!(backend.custom_orders().len(), 1);
}

#[tokio::test]
async fn test_list_and_cancel() {
    let backend = FakeBackend::start().await.unwrap();
    let state = signed_in(&backend).await;
    let created = state.custom_orders().submit(form()).await.unwrap();

    let listed = state.custom_orders().list(None).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created.id);
    let request = backend
        .requests()
        .into_iter()
        .rfind(|r| r.route() == "GET /api/custom-orders/")
        .unwrap();
    assert_eq!(request.query.as_deref(), Some("email=ada%40example.com"));

    state.custom_orders().cancel(created.id).await.unwrap();
    assert!(backend.custom_orders().is_empty());

    let err = state.custom_orders().cancel(created.id).await.unwrap_err();
    assert!(matches!(err, StorefrontError::NotFound(_)));
}

#[tokio::test]
async fn test_anonymous_list_requires_sign_in() {
    let backend = FakeBackend::start().await.unwrap();
    let state = backend.storefront().await.unwrap();
    backend.clear_requests();

    let err = state.custom_orders().list(None).await.unwrap_err();

    assert!(matches!(err, StorefrontError::AuthRequired));
    assert!(backend.routes().is_empty());
}
