//! In-memory gateways for service tests.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;

use julid_core::{
    CartLineId, Email, OrderId, OrderStatus, Price, ProductId, Quantity, UserId,
};

use crate::api::{ApiError, CartGateway, OrderGateway};
use crate::models::{CartLine, CartSnapshot, Identity, OrderRecord, OrderRequest, Product};
use crate::session::{BearerToken, MemoryStorage, SessionProvider};

pub fn product(id: i32, price: i64) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("wear-{id}"),
        price: Price::new(price),
        description: String::new(),
        category: "dresses".to_string(),
        image_ref: None,
    }
}

pub fn qty(n: i64) -> Quantity {
    Quantity::new(n).unwrap()
}

pub fn unavailable() -> ApiError {
    ApiError::Rejected {
        status: StatusCode::SERVICE_UNAVAILABLE,
        message: None,
    }
}

pub fn anonymous_session() -> SessionProvider {
    SessionProvider::new(Arc::new(MemoryStorage::new()))
}

pub fn signed_in_session() -> SessionProvider {
    let session = anonymous_session();
    session
        .login(
            BearerToken::new("jwt"),
            Identity {
                id: UserId::new(1),
                name: "A".to_string(),
                email: Email::parse("a@x.com").unwrap(),
                phone: None,
                full_name: None,
            },
        )
        .unwrap();
    session
}

/// A backend cart held in memory. Can be switched offline.
#[derive(Default)]
pub struct FakeCartGateway {
    offline: AtomicBool,
    state: Mutex<FakeCart>,
}

#[derive(Default)]
struct FakeCart {
    catalog: HashMap<ProductId, Product>,
    lines: Vec<CartLine>,
    next_id: i32,
    calls: Vec<String>,
}

impl FakeCartGateway {
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let gateway = Self::default();
        gateway.state.lock().unwrap().catalog =
            products.into_iter().map(|p| (p.id, p)).collect();
        gateway
    }

    pub fn offline() -> Self {
        let gateway = Self::default();
        gateway.set_offline(true);
        gateway
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn server_lines(&self) -> Vec<CartLine> {
        self.state.lock().unwrap().lines.clone()
    }

    fn begin(&self, call: String) -> Result<std::sync::MutexGuard<'_, FakeCart>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if self.offline.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(state)
    }
}

#[async_trait]
impl CartGateway for FakeCartGateway {
    async fn fetch_cart(&self, _user: Option<UserId>) -> Result<CartSnapshot, ApiError> {
        let state = self.begin("fetch".to_string())?;
        Ok(CartSnapshot::from(state.lines.clone()))
    }

    async fn add_line(
        &self,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<CartLine, ApiError> {
        let mut state = self.begin(format!("add:{product}"))?;
        if let Some(line) = state.lines.iter_mut().find(|l| l.product.id == product) {
            line.quantity = line.quantity.saturating_add(quantity);
            return Ok(line.clone());
        }
        let product = state
            .catalog
            .get(&product)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("/wears/{product}/")))?;
        state.next_id += 1;
        let line = CartLine {
            id: CartLineId::new(state.next_id),
            product,
            quantity,
            status: OrderStatus::Pending,
        };
        state.lines.push(line.clone());
        Ok(line)
    }

    async fn update_line_quantity(
        &self,
        line: CartLineId,
        quantity: Quantity,
    ) -> Result<CartLine, ApiError> {
        let mut state = self.begin(format!("update:{line}:{quantity}"))?;
        let existing = state
            .lines
            .iter_mut()
            .find(|l| l.id == line)
            .ok_or_else(|| ApiError::NotFound(format!("/cart/update/{line}/")))?;
        existing.quantity = quantity;
        Ok(existing.clone())
    }

    async fn remove_line(&self, line: CartLineId) -> Result<(), ApiError> {
        let mut state = self.begin(format!("remove:{line}"))?;
        state.lines.retain(|l| l.id != line);
        Ok(())
    }

    async fn clear_cart(&self) -> Result<(), ApiError> {
        let mut state = self.begin("clear".to_string())?;
        state.lines.clear();
        Ok(())
    }
}

/// Records order calls; can fail creation for one line and all notifications.
#[derive(Default)]
pub struct FakeOrderGateway {
    fail_create_for: Option<CartLineId>,
    fail_notify: bool,
    omit_ids: bool,
    state: Mutex<FakeOrders>,
}

#[derive(Default)]
struct FakeOrders {
    created: Vec<OrderRequest>,
    calls: Vec<String>,
}

impl FakeOrderGateway {
    pub fn failing_create_for(line: CartLineId) -> Self {
        Self {
            fail_create_for: Some(line),
            ..Self::default()
        }
    }

    pub fn failing_notify() -> Self {
        Self {
            fail_notify: true,
            ..Self::default()
        }
    }

    pub fn without_server_ids() -> Self {
        Self {
            omit_ids: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn created(&self) -> Vec<OrderRequest> {
        self.state.lock().unwrap().created.clone()
    }
}

#[async_trait]
impl OrderGateway for FakeOrderGateway {
    async fn create_order(&self, order: &OrderRequest) -> Result<OrderRecord, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("create:{}", order.line_id));
        if self.fail_create_for == Some(order.line_id) {
            return Err(ApiError::Rejected {
                status: StatusCode::BAD_REQUEST,
                message: Some("Out of stock".to_string()),
            });
        }
        state.created.push(order.clone());
        let id = i32::try_from(state.created.len()).unwrap() + 100;
        Ok(OrderRecord {
            id: (!self.omit_ids).then(|| OrderId::new(id)),
            total: Some(order.total),
            quantity: Some(order.quantity),
            ..OrderRecord::default()
        })
    }

    async fn notify_order_placed(&self, order: OrderId, email: &Email) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("notify:{order}:{email}"));
        if self.fail_notify {
            return Err(ApiError::Rejected {
                status: StatusCode::BAD_GATEWAY,
                message: None,
            });
        }
        Ok(())
    }
}
