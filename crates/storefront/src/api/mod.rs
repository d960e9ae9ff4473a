//! REST client for the JuliD's backend.
//!
//! # Architecture
//!
//! - One [`ApiClient`] shares a `reqwest` connection pool across clones
//! - Gateway traits ([`CartGateway`], [`OrderGateway`],
//!   [`CustomOrderGateway`]) are the seams the cart store, checkout
//!   sequencer and custom order service depend on
//! - Every request carries an `x-request-id` header and, when a session is
//!   active, a bearer credential
//! - No retries: each call is a single attempt
//! - Catalog reads are cached in memory via `moka`

mod auth;
mod cache;
mod cart;
mod catalog;
mod custom_orders;
mod orders;

pub use auth::AuthResponse;
pub use cart::CartGateway;
pub use catalog::CatalogClient;
pub use custom_orders::CustomOrderGateway;
pub use orders::OrderGateway;

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::config::StorefrontConfig;
use crate::session::SessionProvider;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, timeout or body read failure.
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Non-2xx response.
    #[error("Backend returned {status}: {}", .message.as_deref().unwrap_or("(no message)"))]
    Rejected {
        status: StatusCode,
        /// `detail` or `message` from the response body, when present.
        message: Option<String>,
    },

    /// 404 response.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Response parsed but lacked required fields.
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// The structured message the server attached to a rejection.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

/// Pull the human-readable message out of an error body.
///
/// `detail` wins over `message`; blank strings are ignored.
#[must_use]
pub fn rejection_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["detail", "message"].iter().find_map(|key| {
        value
            .get(key)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    })
}

/// Client for the storefront backend.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    /// Always ends with `/` so relative joins keep the base path.
    base: Url,
    session: SessionProvider,
}

impl ApiClient {
    /// Create a client for `config.api_base`.
    ///
    /// The session is consulted on every request for the bearer credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &StorefrontConfig, session: SessionProvider) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(concat!("julid-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base: config.api_base.clone(),
                session,
            }),
        })
    }

    /// Base URL all paths are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base.join(path)?)
    }

    fn url_with_query(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = self.url(path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Start a request with the request id and (when signed in) bearer auth.
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request_id = Uuid::new_v4();
        tracing::Span::current().record("request_id", tracing::field::display(request_id));

        let builder = self
            .inner
            .client
            .request(method, url)
            .header("x-request-id", request_id.to_string());

        match self.inner.session.credential() {
            Some(token) => builder.bearer_auth(token.expose()),
            None => builder,
        }
    }

    /// Send and return the body of a 2xx response.
    async fn send(&self, builder: RequestBuilder) -> Result<String, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let path = response.url().path().to_string();

        // Read the body first for better diagnostics
        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(path));
        }

        if !status.is_success() {
            tracing::warn!(
                status = %status,
                path = %path,
                body = %body.chars().take(500).collect::<String>(),
                "Backend returned non-success status"
            );
            return Err(ApiError::Rejected {
                status,
                message: rejection_message(&body),
            });
        }

        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let body = self.send(builder).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            ApiError::Parse(e)
        })
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        self.send(builder).await.map(|_| ())
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base", &self.inner.base.as_str())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_message_prefers_detail() {
        let body = r#"{"detail":"Out of stock","message":"Bad request"}"#;
        assert_eq!(rejection_message(body).as_deref(), Some("Out of stock"));
    }

    #[test]
    fn test_rejection_message_falls_back_to_message() {
        assert_eq!(
            rejection_message(r#"{"detail":"  ","message":"Email taken"}"#).as_deref(),
            Some("Email taken")
        );
        assert_eq!(rejection_message(r#"{"errors":[]}"#), None);
        assert_eq!(rejection_message("<html>502</html>"), None);
    }

    #[test]
    fn test_rejected_display_includes_message() {
        let err = ApiError::Rejected {
            status: StatusCode::BAD_REQUEST,
            message: Some("Out of stock".to_string()),
        };
        assert_eq!(err.to_string(), "Backend returned 400 Bad Request: Out of stock");
        assert_eq!(err.server_message(), Some("Out of stock"));
    }
}
