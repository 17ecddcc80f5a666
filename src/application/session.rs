//! Session verification against the external token provider.

use async_trait::async_trait;
use thiserror::Error;

/// The signed-in user a session token belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session token is missing")]
    Missing,
    #[error("{0}")]
    Rejected(String),
    #[error("session provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn verify(&self, token: &str) -> Result<SessionUser, SessionError>;
}

/// Extracts the session token from an `Authorization` header value.
///
/// Both the bare token and the `Bearer <token>` form are accepted.
pub fn token_from_header(value: &str) -> Option<&str> {
    let value = value.trim_start();
    let token = match value.get(..7) {
        Some(scheme) if scheme.eq_ignore_ascii_case("bearer ") => &value[7..],
        _ => value,
    }
    .trim();
    if token.is_empty() { None } else { Some(token) }
}
