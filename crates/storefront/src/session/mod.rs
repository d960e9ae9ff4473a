//! Session/identity provider.
//!
//! The active identity and its bearer credential are persisted under two
//! durable keys (`token`, `user`) and restored once at startup. Consumers
//! read the active identity synchronously and never trigger authentication
//! themselves.

mod provider;
mod storage;

pub use provider::{BearerToken, SessionProvider};
pub use storage::{FileStorage, MemoryStorage, SessionStorage, TOKEN_KEY, USER_KEY};

use thiserror::Error;

/// Errors raised by durable session storage.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Reading or writing the storage backend failed.
    #[error("Session storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored profile could not be (de)serialized.
    #[error("Session profile JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
