//! Unified error handling with Sentry integration.
//!
//! [`StorefrontError`] is what every storefront operation returns. Use
//! [`StorefrontError::user_message`] for the text of a transient notice and
//! [`StorefrontError::report`] to capture server-side-looking failures.

use reqwest::StatusCode;
use thiserror::Error;

use julid_core::CartLineId;

use crate::api::ApiError;
use crate::models::PlacedOrder;
use crate::session::SessionError;

const NETWORK_MESSAGE: &str = "Network error. Please try again.";
const UNEXPECTED_RESPONSE_MESSAGE: &str = "Unexpected response format from server.";
const AUTH_REQUIRED_MESSAGE: &str = "Please login to continue";
const GENERIC_MESSAGE: &str = "Something went wrong. Try again.";

/// Storefront-level error type.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Network or response-format failure talking to the backend.
    #[error("Transport error: {0}")]
    Transport(#[source] ApiError),

    /// Non-2xx response, with the server's message when it sent one.
    #[error("Server rejected request ({status}): {}", .message.as_deref().unwrap_or("(no message)"))]
    ServerRejection {
        status: StatusCode,
        message: Option<String>,
    },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input, caught before any network call.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The operation needs a signed-in identity.
    #[error("Authentication required")]
    AuthRequired,

    /// A best-effort notification failed.
    #[error("Notification failed: {0}")]
    Notification(#[source] ApiError),

    /// An order-creation call failed mid-checkout. Orders in `committed`
    /// were created before the failure and remain on the backend.
    #[error("Checkout aborted at cart line {line} after {} committed order(s): {source}", .committed.len())]
    CheckoutAborted {
        line: CartLineId,
        committed: Vec<PlacedOrder>,
        source: ApiError,
    },

    /// Durable session storage failed.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

impl From<ApiError> for StorefrontError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Rejected { status, message } => Self::ServerRejection { status, message },
            ApiError::NotFound(what) => Self::NotFound(what),
            other => Self::Transport(other),
        }
    }
}

impl StorefrontError {
    /// Shorthand for [`StorefrontError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// The structured message the server attached, if any.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::ServerRejection { message, .. } => message.as_deref(),
            Self::CheckoutAborted { source, .. } | Self::Notification(source) => {
                source.server_message()
            }
            _ => None,
        }
    }

    /// Text for a transient notice.
    #[must_use]
    pub fn user_message(&self) -> String {
        self.user_message_or(self.default_message())
    }

    /// Text for a transient notice, using `fallback` where only generic
    /// text would be available. A server-provided message always wins.
    #[must_use]
    pub fn user_message_or(&self, fallback: &str) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::AuthRequired => AUTH_REQUIRED_MESSAGE.to_string(),
            _ => self.server_message().unwrap_or(fallback).to_string(),
        }
    }

    fn default_message(&self) -> &'static str {
        match self {
            Self::Transport(ApiError::Parse(_) | ApiError::Decode(_)) => {
                UNEXPECTED_RESPONSE_MESSAGE
            }
            Self::Transport(_) => NETWORK_MESSAGE,
            Self::NotFound(_) => "Not found.",
            Self::CheckoutAborted { .. } => "Checkout failed",
            Self::Notification(_) => "Notification could not be sent.",
            Self::Session(_) => "Could not save your session.",
            Self::ServerRejection { .. } | Self::Validation(_) | Self::AuthRequired => {
                GENERIC_MESSAGE
            }
        }
    }

    /// Whether this failure should reach Sentry.
    #[must_use]
    pub fn is_reportable(&self) -> bool {
        match self {
            Self::ServerRejection { status, .. } => status.is_server_error(),
            Self::CheckoutAborted { .. } | Self::Session(_) => true,
            Self::Transport(e) => matches!(e, ApiError::Parse(_) | ApiError::Decode(_)),
            _ => false,
        }
    }

    /// Capture to Sentry and log, when [`Self::is_reportable`].
    pub fn report(&self) {
        if !self.is_reportable() {
            return;
        }
        let event_id = sentry::capture_error(self);
        tracing::error!(
            error = %self,
            sentry_event_id = %event_id,
            "Storefront error"
        );
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Set the Sentry user context.
///
/// Called when a session becomes active so errors are associated with the
/// signed-in user.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of cart and
/// checkout actions leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
