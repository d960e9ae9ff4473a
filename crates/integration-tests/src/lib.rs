//! End-to-end tests for the JuliD's storefront client.
//!
//! Each test starts a [`FakeBackend`], an in-process axum server that speaks
//! the storefront backend's REST surface on `127.0.0.1` with an ephemeral
//! port, and points a real [`AppState`] at it. The backend records every
//! request and can be switched into failure modes.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p julid-integration-tests
//! ```
//!
//! # Seed data
//!
//! - Products 10 (`Ankara Gown`, 5000), 11 (`Adire Scarf`, 1200) and
//!   12 (`Beaded Bracelet`, 300)
//! - User 1, `Ada`, `ada@example.com`, password `hunter22`
//! - Reset token `MQ-valid`

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Multipart, Path as UrlPath, Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use julid_core::{CartLineId, CustomOrderId, Email, OrderStatus, Price, ProductId, Quantity, UserId};
use julid_storefront::config::{ConfigError, StorefrontConfig};
use julid_storefront::error::StorefrontError;
use julid_storefront::models::{CartLine, CustomOrder, Identity, Product};
use julid_storefront::session::{MemoryStorage, SessionStorage};
use julid_storefront::state::AppState;

pub const SEED_EMAIL: &str = "ada@example.com";
pub const SEED_PASSWORD: &str = "hunter22";
pub const VALID_RESET_TOKEN: &str = "MQ-valid";

// =============================================================================
// Recorded traffic
// =============================================================================

/// One request as seen by the fake backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub request_id: Option<String>,
}

impl RecordedRequest {
    /// `"POST /api/cart/add"`
    #[must_use]
    pub fn route(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// A notification the backend was asked to send.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub kind: String,
    pub body: Value,
}

/// An image part received with a custom order.
#[derive(Debug, Clone)]
pub struct ReceivedImage {
    pub file_name: String,
    pub content_type: Option<String>,
    pub len: usize,
}

// =============================================================================
// Backend state
// =============================================================================

#[derive(Debug, Default, Clone, Copy)]
struct Failures {
    /// Every cart endpoint answers 503.
    cart_down: bool,
    /// Order creation for this cart line answers 400 "Out of stock".
    reject_order_for_line: Option<CartLineId>,
    /// Notification endpoints answer 502.
    notifications_down: bool,
}

struct FakeUser {
    identity: Identity,
    password: String,
}

#[derive(Default)]
struct BackendState {
    products: Vec<Product>,
    users: Vec<FakeUser>,
    cart: Vec<CartLine>,
    next_line_id: i32,
    orders: Vec<Value>,
    next_order_id: i32,
    custom_orders: Vec<CustomOrder>,
    custom_images: Vec<ReceivedImage>,
    next_custom_order_id: i32,
    notifications: Vec<Notification>,
    password_resets: Vec<Value>,
    requests: Vec<RecordedRequest>,
    failures: Failures,
}

#[derive(Clone)]
struct Shared(Arc<Mutex<BackendState>>);

impl Shared {
    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn product(id: i32, name: &str, price: i64, category: &str) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        price: Price::new(price),
        description: format!("{name} from the JuliD's collection"),
        category: category.to_string(),
        image_ref: Some(format!("/media/wears/{id}.jpg")),
    }
}

fn seed() -> Result<BackendState, StorefrontError> {
    let email = Email::parse(SEED_EMAIL)
        .map_err(|e| StorefrontError::validation(e.to_string()))?;
    Ok(BackendState {
        products: vec![
            product(10, "Ankara Gown", 5000, "dresses"),
            product(11, "Adire Scarf", 1200, "accessories"),
            product(12, "Beaded Bracelet", 300, "accessories"),
        ],
        users: vec![FakeUser {
            identity: Identity {
                id: UserId::new(1),
                name: "Ada".to_string(),
                email,
                phone: Some("0800000000".to_string()),
                full_name: Some("Ada Obi".to_string()),
            },
            password: SEED_PASSWORD.to_string(),
        }],
        next_line_id: 1,
        next_order_id: 100,
        next_custom_order_id: 1,
        ..BackendState::default()
    })
}

// =============================================================================
// Harness
// =============================================================================

/// In-process stand-in for the storefront REST backend.
pub struct FakeBackend {
    addr: SocketAddr,
    shared: Shared,
    server: JoinHandle<()>,
}

impl FakeBackend {
    /// Bind an ephemeral port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let shared = Shared(Arc::new(Mutex::new(seed()?)));
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let app = router(shared.clone());
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            shared,
            server,
        })
    }

    /// Base URL of the REST surface, e.g. `http://127.0.0.1:41234/api/`.
    #[must_use]
    pub fn api_base(&self) -> String {
        format!("http://{}/api/", self.addr)
    }

    /// Configuration pointing at this backend with its session under
    /// `session_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the generated configuration is invalid.
    pub fn config(&self, session_dir: &Path) -> Result<StorefrontConfig, ConfigError> {
        let api_base = self.api_base();
        let session_dir = session_dir.display().to_string();
        StorefrontConfig::from_lookup(move |key| match key {
            "JULID_API_BASE" => Some(api_base.clone()),
            "JULID_SESSION_DIR" => Some(session_dir.clone()),
            "JULID_FRONTEND_URL" => Some("http://localhost:5173".to_string()),
            "JULID_HTTP_TIMEOUT_SECS" => Some("5".to_string()),
            _ => None,
        })
    }

    /// A fresh storefront with an in-memory session.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be built.
    pub async fn storefront(&self) -> Result<AppState, Box<dyn std::error::Error + Send + Sync>> {
        self.storefront_with(Arc::new(MemoryStorage::new())).await
    }

    /// A storefront on top of an explicit session storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be built.
    pub async fn storefront_with(
        &self,
        storage: Arc<dyn SessionStorage>,
    ) -> Result<AppState, Box<dyn std::error::Error + Send + Sync>> {
        let config = self.config(Path::new(".julid-test-unused"))?;
        Ok(AppState::with_storage(config, storage).await?)
    }

    fn state(&self) -> MutexGuard<'_, BackendState> {
        self.shared.lock()
    }

    // -------------------------------------------------------------------------
    // Failure switches
    // -------------------------------------------------------------------------

    pub fn set_cart_down(&self, down: bool) {
        self.state().failures.cart_down = down;
    }

    pub fn reject_order_for_line(&self, line: CartLineId) {
        self.state().failures.reject_order_for_line = Some(line);
    }

    pub fn set_notifications_down(&self, down: bool) {
        self.state().failures.notifications_down = down;
    }

    // -------------------------------------------------------------------------
    // Server-side data
    // -------------------------------------------------------------------------

    /// Put a line in the server cart directly, as another device would.
    ///
    /// # Panics
    ///
    /// Panics if `product` is not in the catalog.
    pub fn seed_cart_line(&self, product: ProductId, quantity: u32) -> CartLineId {
        let mut state = self.state();
        let product = state
            .products
            .iter()
            .find(|p| p.id == product)
            .cloned()
            .expect("seeded product");
        let quantity = Quantity::new(i64::from(quantity)).expect("positive quantity");
        let id = CartLineId::new(state.next_line_id);
        state.next_line_id += 1;
        state.cart.push(CartLine {
            id,
            product,
            quantity,
            status: OrderStatus::Pending,
        });
        id
    }

    #[must_use]
    pub fn cart_lines(&self) -> Vec<CartLine> {
        self.state().cart.clone()
    }

    #[must_use]
    pub fn orders(&self) -> Vec<Value> {
        self.state().orders.clone()
    }

    #[must_use]
    pub fn custom_orders(&self) -> Vec<CustomOrder> {
        self.state().custom_orders.clone()
    }

    #[must_use]
    pub fn custom_order_images(&self) -> Vec<ReceivedImage> {
        self.state().custom_images.clone()
    }

    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.state().notifications.clone()
    }

    #[must_use]
    pub fn password_resets(&self) -> Vec<Value> {
        self.state().password_resets.clone()
    }

    // -------------------------------------------------------------------------
    // Traffic
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state().requests.clone()
    }

    /// Recorded requests as `"METHOD /path"`, oldest first.
    #[must_use]
    pub fn routes(&self) -> Vec<String> {
        self.state().requests.iter().map(RecordedRequest::route).collect()
    }

    pub fn clear_requests(&self) {
        self.state().requests.clear();
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// A storefront pointed at a local port nothing listens on, so every backend
/// call fails to connect.
///
/// # Errors
///
/// Returns an error if the port cannot be reserved or the state cannot be
/// built.
pub async fn unreachable_storefront() -> Result<AppState, Box<dyn std::error::Error + Send + Sync>>
{
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let api_base = format!("http://{addr}/api/");
    let config = StorefrontConfig::from_lookup(move |key| match key {
        "JULID_API_BASE" => Some(api_base.clone()),
        "JULID_SESSION_DIR" => Some(".julid-test-unused".to_string()),
        "JULID_FRONTEND_URL" => Some("http://localhost:5173".to_string()),
        "JULID_HTTP_TIMEOUT_SECS" => Some("5".to_string()),
        _ => None,
    })?;
    Ok(AppState::with_storage(config, Arc::new(MemoryStorage::new())).await?)
}

// =============================================================================
// Routes
// =============================================================================

fn router(shared: Shared) -> Router {
    Router::new()
        .route("/api/wears/", get(list_products))
        .route("/api/wears/{id}/", get(get_product))
        .route("/api/cart", get(get_cart))
        .route("/api/cart/add", post(add_to_cart))
        .route("/api/cart/update/{id}/", put(update_cart_line))
        .route("/api/cart/remove/{id}/", delete(remove_cart_line))
        .route("/api/cart/clear", post(clear_cart))
        .route("/api/shop-orders/", post(create_order).get(list_orders))
        .route("/api/shop-orders/{id}/", delete(delete_order))
        .route("/api/custom-orders/", post(create_custom_order).get(list_custom_orders))
        .route("/api/custom-orders/{id}/", delete(delete_custom_order))
        .route("/api/notifications/{kind}/", post(notify))
        .route("/api/auth/login/", post(login))
        .route("/api/auth/register/", post(register))
        .route("/api/auth/forgot-password/", post(forgot_password))
        .route("/api/auth/reset-password/", post(reset_password))
        .layer(middleware::from_fn_with_state(shared.clone(), record))
        .with_state(shared)
}

async fn record(State(shared): State<Shared>, request: Request, next: Next) -> Response {
    let header = |headers: &HeaderMap, name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };
    let recorded = RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        query: request.uri().query().map(String::from),
        authorization: header(request.headers(), "authorization"),
        request_id: header(request.headers(), "x-request-id"),
    };
    shared.lock().requests.push(recorded);
    next.run(request).await
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

fn unavailable() -> Response {
    detail(StatusCode::SERVICE_UNAVAILABLE, "Service temporarily unavailable")
}

async fn list_products(State(shared): State<Shared>) -> Response {
    Json(shared.lock().products.clone()).into_response()
}

async fn get_product(State(shared): State<Shared>, UrlPath(id): UrlPath<i32>) -> Response {
    let state = shared.lock();
    match state.products.iter().find(|p| p.id == ProductId::new(id)) {
        Some(product) => Json(product.clone()).into_response(),
        None => detail(StatusCode::NOT_FOUND, "Not found."),
    }
}

// -----------------------------------------------------------------------------
// Cart
// -----------------------------------------------------------------------------

async fn get_cart(State(shared): State<Shared>) -> Response {
    let state = shared.lock();
    if state.failures.cart_down {
        return unavailable();
    }
    Json(state.cart.clone()).into_response()
}

#[derive(Deserialize)]
struct AddBody {
    id: ProductId,
    quantity: Quantity,
}

async fn add_to_cart(State(shared): State<Shared>, Json(body): Json<AddBody>) -> Response {
    let mut state = shared.lock();
    if state.failures.cart_down {
        return unavailable();
    }

    if let Some(line) = state.cart.iter_mut().find(|l| l.product.id == body.id) {
        line.quantity = line.quantity.saturating_add(body.quantity);
        return Json(line.clone()).into_response();
    }

    let Some(product) = state.products.iter().find(|p| p.id == body.id).cloned() else {
        return detail(StatusCode::NOT_FOUND, "Wear not found.");
    };
    let line = CartLine {
        id: CartLineId::new(state.next_line_id),
        product,
        quantity: body.quantity,
        status: OrderStatus::Pending,
    };
    state.next_line_id += 1;
    state.cart.push(line.clone());
    (StatusCode::CREATED, Json(line)).into_response()
}

#[derive(Deserialize)]
struct UpdateBody {
    quantity: Quantity,
}

async fn update_cart_line(
    State(shared): State<Shared>,
    UrlPath(id): UrlPath<i32>,
    Json(body): Json<UpdateBody>,
) -> Response {
    let mut state = shared.lock();
    if state.failures.cart_down {
        return unavailable();
    }
    match state.cart.iter_mut().find(|l| l.id == CartLineId::new(id)) {
        Some(line) => {
            line.quantity = body.quantity;
            Json(line.clone()).into_response()
        }
        None => detail(StatusCode::NOT_FOUND, "Cart item not found."),
    }
}

async fn remove_cart_line(State(shared): State<Shared>, UrlPath(id): UrlPath<i32>) -> Response {
    let mut state = shared.lock();
    if state.failures.cart_down {
        return unavailable();
    }
    let before = state.cart.len();
    state.cart.retain(|l| l.id != CartLineId::new(id));
    if state.cart.len() == before {
        return detail(StatusCode::NOT_FOUND, "Cart item not found.");
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn clear_cart(State(shared): State<Shared>) -> Response {
    let mut state = shared.lock();
    if state.failures.cart_down {
        return unavailable();
    }
    state.cart.clear();
    Json(json!({ "message": "Cart cleared" })).into_response()
}

// -----------------------------------------------------------------------------
// Shop orders
// -----------------------------------------------------------------------------

async fn create_order(State(shared): State<Shared>, Json(mut body): Json<Value>) -> Response {
    let mut state = shared.lock();
    let line = body
        .get("id")
        .and_then(Value::as_i64)
        .and_then(|id| i32::try_from(id).ok())
        .map(CartLineId::new);
    if line.is_some() && line == state.failures.reject_order_for_line {
        return detail(StatusCode::BAD_REQUEST, "Out of stock");
    }

    let id = state.next_order_id;
    state.next_order_id += 1;
    body["id"] = json!(id);
    body["created_at"] = json!("2026-10-16T12:00:00Z");
    state.orders.push(body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

#[derive(Deserialize)]
struct EmailQuery {
    email: Option<String>,
}

async fn list_orders(State(shared): State<Shared>, Query(query): Query<EmailQuery>) -> Response {
    let state = shared.lock();
    let orders: Vec<Value> = state
        .orders
        .iter()
        .filter(|o| {
            query
                .email
                .as_deref()
                .is_none_or(|email| o.get("email").and_then(Value::as_str) == Some(email))
        })
        .rev()
        .cloned()
        .collect();
    Json(orders).into_response()
}

async fn delete_order(State(shared): State<Shared>, UrlPath(id): UrlPath<i64>) -> Response {
    let mut state = shared.lock();
    let before = state.orders.len();
    state
        .orders
        .retain(|o| o.get("id").and_then(Value::as_i64) != Some(id));
    if state.orders.len() == before {
        return detail(StatusCode::NOT_FOUND, "Not found.");
    }
    StatusCode::NO_CONTENT.into_response()
}

// -----------------------------------------------------------------------------
// Custom orders
// -----------------------------------------------------------------------------

async fn create_custom_order(State(shared): State<Shared>, mut multipart: Multipart) -> Response {
    let mut fields: HashMap<String, String> = HashMap::new();
    let mut image = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field.content_type().map(String::from);
            let len = field.bytes().await.map_or(0, |b| b.len());
            image = Some(ReceivedImage {
                file_name,
                content_type,
                len,
            });
        } else if let Ok(text) = field.text().await {
            fields.insert(name, text);
        }
    }

    let field = |name: &str| fields.get(name).cloned().unwrap_or_default();
    if field("description").is_empty() || field("email").is_empty() {
        return detail(StatusCode::BAD_REQUEST, "description and email are required");
    }

    let mut state = shared.lock();
    let order = CustomOrder {
        id: CustomOrderId::new(state.next_custom_order_id),
        name: Some(field("name")),
        email: Some(field("email")),
        phone: Some(field("phone")),
        description: field("description"),
        image: image
            .as_ref()
            .map(|i| format!("/media/custom_orders/{}", i.file_name)),
        status: field("status").parse().unwrap_or_default(),
        created_at: None,
    };
    state.next_custom_order_id += 1;
    state.custom_orders.push(order.clone());
    state.custom_images.extend(image);
    (StatusCode::CREATED, Json(order)).into_response()
}

async fn list_custom_orders(
    State(shared): State<Shared>,
    Query(query): Query<EmailQuery>,
) -> Response {
    let state = shared.lock();
    let orders: Vec<CustomOrder> = state
        .custom_orders
        .iter()
        .filter(|o| {
            query
                .email
                .as_deref()
                .is_none_or(|email| o.email.as_deref() == Some(email))
        })
        .cloned()
        .collect();
    Json(orders).into_response()
}

async fn delete_custom_order(State(shared): State<Shared>, UrlPath(id): UrlPath<i32>) -> Response {
    let mut state = shared.lock();
    let before = state.custom_orders.len();
    state
        .custom_orders
        .retain(|o| o.id != CustomOrderId::new(id));
    if state.custom_orders.len() == before {
        return detail(StatusCode::NOT_FOUND, "Not found.");
    }
    StatusCode::NO_CONTENT.into_response()
}

// -----------------------------------------------------------------------------
// Notifications
// -----------------------------------------------------------------------------

async fn notify(
    State(shared): State<Shared>,
    UrlPath(kind): UrlPath<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = shared.lock();
    state.notifications.push(Notification { kind, body });
    if state.failures.notifications_down {
        return detail(StatusCode::BAD_GATEWAY, "Mail server unreachable");
    }
    Json(json!({ "message": "Email sent" })).into_response()
}

// -----------------------------------------------------------------------------
// Auth
// -----------------------------------------------------------------------------

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

fn auth_response(identity: &Identity) -> Response {
    Json(json!({
        "token": format!("token-{}", identity.id),
        "user": identity,
    }))
    .into_response()
}

async fn login(State(shared): State<Shared>, Json(body): Json<LoginBody>) -> Response {
    let state = shared.lock();
    match state
        .users
        .iter()
        .find(|u| u.identity.email.as_str() == body.email && u.password == body.password)
    {
        Some(user) => auth_response(&user.identity),
        // No message: the client supplies its own text
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}

#[derive(Deserialize)]
struct RegisterBody {
    name: String,
    email: String,
    password: String,
}

async fn register(State(shared): State<Shared>, Json(body): Json<RegisterBody>) -> Response {
    let mut state = shared.lock();
    if state
        .users
        .iter()
        .any(|u| u.identity.email.as_str() == body.email)
    {
        return detail(StatusCode::BAD_REQUEST, "A user with this email already exists.");
    }
    let Ok(email) = Email::parse(&body.email) else {
        return detail(StatusCode::BAD_REQUEST, "Enter a valid email address.");
    };

    let next_id = i32::try_from(state.users.len()).unwrap_or(i32::MAX).saturating_add(1);
    let identity = Identity {
        id: UserId::new(next_id),
        name: body.name,
        email,
        phone: None,
        full_name: None,
    };
    state.users.push(FakeUser {
        identity: identity.clone(),
        password: body.password,
    });
    auth_response(&identity)
}

async fn forgot_password(State(shared): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = shared.lock();
    let known = body
        .get("email")
        .and_then(Value::as_str)
        .is_some_and(|email| state.users.iter().any(|u| u.identity.email.as_str() == email));
    if !known {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "No account with that email." })),
        )
            .into_response();
    }
    state.password_resets.push(body);
    Json(json!({ "message": "Reset link sent" })).into_response()
}

#[derive(Deserialize)]
struct ResetBody {
    token: String,
    password: String,
}

async fn reset_password(State(shared): State<Shared>, Json(body): Json<ResetBody>) -> Response {
    if body.token != VALID_RESET_TOKEN {
        return detail(StatusCode::BAD_REQUEST, "Invalid or expired token");
    }
    let mut state = shared.lock();
    if let Some(user) = state.users.first_mut() {
        user.password = body.password;
    }
    Json(json!({ "message": "Password reset" })).into_response()
}
