//! Application state shared across the front end.

use std::sync::Arc;

use tracing::info;

use crate::api::{ApiClient, CatalogClient};
use crate::config::StorefrontConfig;
use crate::error::StorefrontError;
use crate::models::Identity;
use crate::notice::NoticeBoard;
use crate::services::{
    AuthService, CartMode, CartStore, CheckoutSequencer, CustomOrderService,
};
use crate::session::{FileStorage, SessionProvider, SessionStorage};

/// Posted at startup when the server cart could not be loaded.
pub const OFFLINE_CART_NOTICE: &str =
    "Working offline; cart changes are kept for this session only. Reconcile the cart once the store is reachable.";

/// Every storefront component, constructed once at startup.
///
/// This struct is cheaply cloneable via `Arc`. Components receive their
/// collaborators through constructors; nothing is reached through globals.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    session: SessionProvider,
    api: ApiClient,
    cart: Arc<CartStore>,
    checkout: CheckoutSequencer,
    catalog: CatalogClient,
    auth: AuthService,
    custom_orders: CustomOrderService,
    notices: NoticeBoard,
}

impl AppState {
    /// Build the state with the session persisted under
    /// `config.session_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub async fn init(config: StorefrontConfig) -> Result<Self, StorefrontError> {
        let storage = Arc::new(FileStorage::new(&config.session_dir));
        Self::with_storage(config, storage).await
    }

    /// Build the state on top of an explicit session storage.
    ///
    /// Restores the persisted identity, then loads the server cart. A failed
    /// cart load leaves an empty, degraded cart rather than failing startup.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub async fn with_storage(
        config: StorefrontConfig,
        storage: Arc<dyn SessionStorage>,
    ) -> Result<Self, StorefrontError> {
        let session = SessionProvider::new(storage);
        let restored = session.restore();

        let api = ApiClient::new(&config, session.clone())?;
        let cart = Arc::new(CartStore::new(Arc::new(api.clone()), session.clone()));
        let mode = cart.load().await;

        let checkout =
            CheckoutSequencer::new(Arc::new(api.clone()), cart.clone(), session.clone());
        let catalog = CatalogClient::new(api.clone(), config.catalog_cache_ttl);
        let auth = AuthService::new(api.clone(), session.clone(), config.frontend_url.clone());
        let custom_orders = CustomOrderService::new(Arc::new(api.clone()), session.clone());
        let notices = NoticeBoard::new(config.notice_ttl);

        info!(
            api_base = %config.api_base,
            signed_in = restored.is_some(),
            cart_mode = ?mode,
            "Storefront initialized"
        );
        if mode == CartMode::Degraded {
            notices.info(OFFLINE_CART_NOTICE);
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                session,
                api,
                cart,
                checkout,
                catalog,
                auth,
                custom_orders,
                notices,
            }),
        })
    }

    /// Release caches before the process exits.
    pub fn shutdown(&self) {
        self.inner.catalog.invalidate_all();
        self.inner.notices.dismiss_all();
        info!(
            cart_lines = self.inner.cart.snapshot().len(),
            cart_mode = ?self.inner.cart.mode(),
            "Storefront shut down"
        );
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn session(&self) -> &SessionProvider {
        &self.inner.session
    }

    /// The active identity, if signed in.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.inner.session.identity()
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutSequencer {
        &self.inner.checkout
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogClient {
        &self.inner.catalog
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    #[must_use]
    pub fn custom_orders(&self) -> &CustomOrderService {
        &self.inner.custom_orders
    }

    #[must_use]
    pub fn notices(&self) -> &NoticeBoard {
        &self.inner.notices
    }
}
