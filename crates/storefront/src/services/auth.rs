//! Authentication service.
//!
//! Login and registration exchange credentials for a bearer token and
//! profile, then hand both to the [`SessionProvider`]. Password reset is a
//! two-step email flow. Input is validated before any network call.

use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument};
use url::Url;

use julid_core::Email;

use crate::api::{ApiClient, ApiError};
use crate::error::StorefrontError;
use crate::models::Identity;
use crate::session::SessionProvider;

const INVALID_CREDENTIALS: &str = "Invalid credentials. Please try again.";
const REGISTRATION_FAILED: &str = "Registration failed. Please try again.";
const RESET_LINK_FAILED: &str = "Failed to send reset link. Try again later.";
const RESET_FAILED: &str = "Failed to reset password.";
const PASSWORD_MISMATCH: &str = "Passwords do not match!";
const MISSING_RESET_TOKEN: &str = "Invalid or missing reset token.";

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
    session: SessionProvider,
    frontend_url: String,
}

impl AuthService {
    /// `frontend_url` is the origin password reset links point at.
    #[must_use]
    pub fn new(api: ApiClient, session: SessionProvider, frontend_url: impl Into<String>) -> Self {
        Self {
            api,
            session,
            frontend_url: frontend_url.into(),
        }
    }

    /// Sign in and make the returned identity active.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a malformed email, `ServerRejection` when the
    /// backend refuses the credentials, or `Session` if the identity cannot
    /// be persisted.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, StorefrontError> {
        let email = parse_email(email)?;
        if password.expose_secret().is_empty() {
            return Err(StorefrontError::validation("Password is required"));
        }

        let response = self
            .api
            .login(&email, password)
            .await
            .map_err(|e| rejected_or(e, INVALID_CREDENTIALS))?;
        let (token, identity) = response.into_parts()?;

        self.session.login(token, identity.clone())?;
        info!(user_id = %identity.id, "Login succeeded");
        Ok(identity)
    }

    /// Create an account and sign in as it.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank name, malformed email or mismatched
    /// confirmation (no network call is made), otherwise as [`Self::login`].
    #[instrument(skip(self, password, confirm))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &SecretString,
        confirm: &SecretString,
    ) -> Result<Identity, StorefrontError> {
        if password.expose_secret() != confirm.expose_secret() {
            return Err(StorefrontError::validation(PASSWORD_MISMATCH));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(StorefrontError::validation("Name is required"));
        }
        let email = parse_email(email)?;
        if password.expose_secret().is_empty() {
            return Err(StorefrontError::validation("Password is required"));
        }

        let response = self
            .api
            .register(name, &email, password)
            .await
            .map_err(|e| rejected_or(e, REGISTRATION_FAILED))?;
        let (token, identity) = response.into_parts()?;

        self.session.login(token, identity.clone())?;
        info!(user_id = %identity.id, "Registration succeeded");
        Ok(identity)
    }

    /// Sign out.
    ///
    /// # Errors
    ///
    /// Returns `Session` if the persisted session cannot be removed; the
    /// in-memory identity is cleared regardless.
    pub fn logout(&self) -> Result<(), StorefrontError> {
        Ok(self.session.logout()?)
    }

    /// Email a password reset link.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a malformed email or `ServerRejection` when
    /// the backend refuses.
    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> Result<(), StorefrontError> {
        let email = parse_email(email)?;
        self.api
            .forgot_password(&email, &self.frontend_url)
            .await
            .map_err(|e| rejected_or(e, RESET_LINK_FAILED))?;
        info!("Password reset link requested");
        Ok(())
    }

    /// Set a new password with a reset token.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for mismatched passwords or a blank token (no
    /// network call is made), or `ServerRejection` carrying the server's
    /// `detail`/`message` when the backend refuses.
    #[instrument(skip(self, token, password, confirm))]
    pub async fn reset_password(
        &self,
        token: &str,
        password: &SecretString,
        confirm: &SecretString,
    ) -> Result<(), StorefrontError> {
        if password.expose_secret() != confirm.expose_secret() {
            return Err(StorefrontError::validation(PASSWORD_MISMATCH));
        }
        let token = token.trim();
        if token.is_empty() {
            return Err(StorefrontError::validation(MISSING_RESET_TOKEN));
        }

        self.api
            .reset_password(token, password)
            .await
            .map_err(|e| rejected_or(e, RESET_FAILED))?;
        info!("Password reset");
        Ok(())
    }
}

/// Extract a reset token from a reset link.
///
/// Takes `?token=` when present, otherwise the last non-empty path segment
/// if it contains a `-` (links shaped `/reset-password/<uid>-<token>`).
/// Bare paths are accepted as well as absolute URLs.
#[must_use]
pub fn reset_token_from_link(link: &str) -> Option<String> {
    let link = link.trim();
    let url = Url::parse(link)
        .or_else(|_| Url::parse("http://localhost/").and_then(|base| base.join(link)))
        .ok()?;

    if let Some((_, token)) = url.query_pairs().find(|(key, _)| key == "token")
        && !token.is_empty()
    {
        return Some(token.into_owned());
    }

    url.path_segments()?
        .rev()
        .find(|segment| !segment.is_empty())
        .filter(|segment| segment.contains('-'))
        .map(String::from)
}

fn parse_email(email: &str) -> Result<Email, StorefrontError> {
    Email::parse(email).map_err(|e| StorefrontError::validation(format!("Invalid email: {e}")))
}

/// Map a gateway error, giving rejections without a server message the
/// flow-specific fallback text.
fn rejected_or(err: ApiError, fallback: &str) -> StorefrontError {
    match err {
        ApiError::Rejected { status, message } => StorefrontError::ServerRejection {
            status,
            message: message.or_else(|| Some(fallback.to_string())),
        },
        other => other.into(),
    }
}
