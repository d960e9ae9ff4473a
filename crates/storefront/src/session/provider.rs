//! The active identity and its durable persistence.

use std::sync::{Arc, PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use super::{SessionError, SessionStorage, TOKEN_KEY, USER_KEY};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::Identity;

/// Opaque bearer credential issued by the backend.
///
/// Implements `Debug` manually to redact the secret.
#[derive(Clone)]
pub struct BearerToken(SecretString);

impl BearerToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The raw credential, for the `Authorization` header and storage.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}

impl From<String> for BearerToken {
    fn from(token: String) -> Self {
        Self::new(token)
    }
}

/// Holds at most one active identity for the process.
///
/// Cheaply cloneable; every clone observes the same active identity.
#[derive(Clone)]
pub struct SessionProvider {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    storage: Arc<dyn SessionStorage>,
    active: RwLock<Option<ActiveSession>>,
}

#[derive(Clone)]
struct ActiveSession {
    identity: Identity,
    token: BearerToken,
}

impl SessionProvider {
    /// Create a provider with no active identity.
    #[must_use]
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                storage,
                active: RwLock::new(None),
            }),
        }
    }

    /// Restore the persisted identity, if any.
    ///
    /// Returns `None` when either key is absent, the profile is malformed,
    /// or storage cannot be read.
    pub fn restore(&self) -> Option<Identity> {
        let (token, profile) = match (
            self.inner.storage.read(TOKEN_KEY),
            self.inner.storage.read(USER_KEY),
        ) {
            (Ok(Some(token)), Ok(Some(profile))) => (token, profile),
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Failed to read persisted session");
                return None;
            }
            _ => {
                debug!("No persisted session");
                return None;
            }
        };

        let token = token.trim();
        if token.is_empty() {
            debug!("Persisted session has an empty token");
            return None;
        }

        let identity: Identity = match serde_json::from_str(&profile) {
            Ok(identity) => identity,
            Err(e) => {
                warn!(error = %e, "Persisted user profile is malformed, ignoring");
                return None;
            }
        };

        self.activate(ActiveSession {
            identity: identity.clone(),
            token: BearerToken::new(token),
        });
        info!(user_id = %identity.id, "Session restored");
        Some(identity)
    }

    /// Persist `identity` and `token` and make them active.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be written; the previously active
    /// identity (if any) stays active in that case.
    pub fn login(&self, token: BearerToken, identity: Identity) -> Result<(), SessionError> {
        let profile = serde_json::to_string(&identity)?;
        self.inner.storage.write(TOKEN_KEY, token.expose())?;
        if let Err(e) = self.inner.storage.write(USER_KEY, &profile) {
            if let Err(cleanup) = self.inner.storage.remove(TOKEN_KEY) {
                warn!(error = %cleanup, "Failed to remove token after incomplete login");
            }
            return Err(e);
        }

        info!(user_id = %identity.id, "Signed in");
        self.activate(ActiveSession { identity, token });
        Ok(())
    }

    /// Clear the active identity and its durable copy.
    ///
    /// The in-memory identity is always cleared, even if storage fails.
    ///
    /// # Errors
    ///
    /// Returns the first storage error encountered.
    pub fn logout(&self) -> Result<(), SessionError> {
        *self
            .inner
            .active
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
        clear_sentry_user();

        let token = self.inner.storage.remove(TOKEN_KEY);
        let user = self.inner.storage.remove(USER_KEY);
        info!("Signed out");
        token.and(user)
    }

    /// The active identity.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.read_active(|s| s.identity.clone())
    }

    /// The active bearer credential.
    #[must_use]
    pub fn credential(&self) -> Option<BearerToken> {
        self.read_active(|s| s.token.clone())
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read_active(|_| ()).is_some()
    }

    fn read_active<T>(&self, f: impl FnOnce(&ActiveSession) -> T) -> Option<T> {
        self.inner
            .active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(f)
    }

    fn activate(&self, session: ActiveSession) {
        set_sentry_user(&session.identity.id, Some(session.identity.email.as_str()));
        *self
            .inner
            .active
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(session);
    }
}

impl std::fmt::Debug for SessionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionProvider")
            .field("identity", &self.identity())
            .finish_non_exhaustive()
    }
}
