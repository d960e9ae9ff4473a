//! Account endpoints: login, registration and password reset.

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use julid_core::Email;

use super::{ApiClient, ApiError};
use crate::models::Identity;
use crate::session::BearerToken;

/// Body of a successful login or registration.
///
/// Both fields are optional on the wire; use [`AuthResponse::into_parts`] to
/// require them.
#[derive(Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<Identity>,
}

impl AuthResponse {
    /// Split into credential and identity.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Decode`] if either field is missing or the token
    /// is blank.
    pub fn into_parts(self) -> Result<(BearerToken, Identity), ApiError> {
        match (self.token, self.user) {
            (Some(token), Some(user)) if !token.trim().is_empty() => {
                Ok((BearerToken::new(token), user))
            }
            _ => Err(ApiError::Decode(
                "auth response is missing token or user".to_string(),
            )),
        }
    }
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct ForgotPasswordBody<'a> {
    email: &'a str,
    frontend_url: &'a str,
}

#[derive(Serialize)]
struct ResetPasswordBody<'a> {
    token: &'a str,
    password: &'a str,
}

impl ApiClient {
    /// Exchange credentials for a bearer token and profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend refuses.
    #[instrument(skip(self, password), fields(request_id = tracing::field::Empty))]
    pub async fn login(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthResponse, ApiError> {
        let url = self.url("auth/login/")?;
        let body = LoginBody {
            email: email.as_str(),
            password: password.expose_secret(),
        };
        self.send_json(self.request(Method::POST, url).json(&body))
            .await
    }

    /// Create an account. The backend signs the new user in.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend refuses.
    #[instrument(skip(self, password), fields(request_id = tracing::field::Empty))]
    pub async fn register(
        &self,
        name: &str,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthResponse, ApiError> {
        let url = self.url("auth/register/")?;
        let body = RegisterBody {
            name,
            email: email.as_str(),
            password: password.expose_secret(),
        };
        self.send_json(self.request(Method::POST, url).json(&body))
            .await
    }

    /// Request a reset link. The backend appends the token to `frontend_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend refuses.
    #[instrument(skip(self), fields(request_id = tracing::field::Empty))]
    pub async fn forgot_password(&self, email: &Email, frontend_url: &str) -> Result<(), ApiError> {
        let url = self.url("auth/forgot-password/")?;
        let body = ForgotPasswordBody {
            email: email.as_str(),
            frontend_url,
        };
        self.send_empty(self.request(Method::POST, url).json(&body))
            .await
    }

    /// Set a new password using a reset token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend refuses.
    #[instrument(skip(self, token, password), fields(request_id = tracing::field::Empty))]
    pub async fn reset_password(
        &self,
        token: &str,
        password: &SecretString,
    ) -> Result<(), ApiError> {
        let url = self.url("auth/reset-password/")?;
        let body = ResetPasswordBody {
            token,
            password: password.expose_secret(),
        };
        self.send_empty(self.request(Method::POST, url).json(&body))
            .await
    }
}
