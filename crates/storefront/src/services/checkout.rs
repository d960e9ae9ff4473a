//! Checkout sequencer.
//!
//! Turns the working cart plus the active identity into shop orders, one
//! remote call per cart line, strictly in cart order:
//!
//! 1. No identity: fail with [`StorefrontError::AuthRequired`], no calls.
//! 2. Blank phone: fail with [`StorefrontError::Validation`], no calls.
//! 3. For each line, create the order. On success, send the "order placed"
//!    notification; a notification failure is logged and swallowed. On
//!    failure, stop and return [`StorefrontError::CheckoutAborted`]. Orders
//!    created earlier in the run stay committed.
//! 4. Clear the cart through the cart store.
//!
//! Failed order creation is never faked locally.

use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use julid_core::OrderId;

use crate::api::OrderGateway;
use crate::error::{StorefrontError, add_breadcrumb};
use crate::models::{Buyer, CheckoutReceipt, OrderRequest, PlacedOrder};
use crate::services::CartStore;
use crate::session::SessionProvider;

pub struct CheckoutSequencer {
    orders: Arc<dyn OrderGateway>,
    cart: Arc<CartStore>,
    session: SessionProvider,
}

impl CheckoutSequencer {
    #[must_use]
    pub fn new(orders: Arc<dyn OrderGateway>, cart: Arc<CartStore>, session: SessionProvider) -> Self {
        Self {
            orders,
            cart,
            session,
        }
    }

    /// Place one order per cart line for the signed-in buyer.
    ///
    /// `phone` is supplied fresh by the caller; name and email come from the
    /// active identity.
    ///
    /// # Errors
    ///
    /// - [`StorefrontError::AuthRequired`] when nobody is signed in
    /// - [`StorefrontError::Validation`] when `phone` is blank
    /// - [`StorefrontError::CheckoutAborted`] on the first failed order
    #[instrument(skip(self, phone), fields(run_id = tracing::field::Empty, lines = tracing::field::Empty))]
    pub async fn checkout(&self, phone: &str) -> Result<CheckoutReceipt, StorefrontError> {
        let identity = self.session.identity().ok_or(StorefrontError::AuthRequired)?;

        let phone = phone.trim();
        if phone.is_empty() {
            return Err(StorefrontError::validation("Phone number is required"));
        }

        let run_id = Uuid::new_v4();
        let snapshot = self.cart.snapshot();
        let span = tracing::Span::current();
        span.record("run_id", tracing::field::display(run_id));
        span.record("lines", snapshot.len());

        let run = run_id.to_string();
        add_breadcrumb("checkout", "Checkout started", Some(&[("run_id", run.as_str())]));

        let buyer = Buyer {
            name: identity.name.clone(),
            email: identity.email.clone(),
            phone: phone.to_string(),
        };

        let mut committed: Vec<PlacedOrder> = Vec::with_capacity(snapshot.len());
        for line in snapshot.lines() {
            let request = OrderRequest::for_line(line, &buyer);

            let record = match self.orders.create_order(&request).await {
                Ok(record) => record,
                Err(source) => {
                    let committed_count = committed.len();
                    let err = StorefrontError::CheckoutAborted {
                        line: line.id,
                        committed,
                        source,
                    };
                    sentry::with_scope(
                        |scope| {
                            scope.set_tag("line_id", line.id);
                            scope.set_extra("committed", committed_count.into());
                        },
                        || err.report(),
                    );
                    return Err(err);
                }
            };

            let order_id = record.id.unwrap_or_else(|| OrderId::from(line.id));
            let notified = match self.orders.notify_order_placed(order_id, &buyer.email).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(
                        order_id = %order_id,
                        error = %StorefrontError::Notification(e),
                        "Order placed notification failed"
                    );
                    false
                }
            };

            committed.push(PlacedOrder {
                line_id: line.id,
                order_id,
                total: request.total,
                notified,
                record,
            });
        }

        self.cart.clear().await;

        let receipt = CheckoutReceipt {
            run_id,
            orders: committed,
        };
        info!(
            orders = receipt.orders.len(),
            total = %receipt.total(),
            "Checkout complete"
        );
        Ok(receipt)
    }
}
