//! Error types for the session layer.

use kportal_protocol::{ProtocolError, error_detail};
use kportal_transport::TransportError;

/// Errors that can occur while authenticating or making authorized calls.
///
/// These cover the full lifecycle of a client session: login, refresh,
/// authorized requests, and token persistence.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The backend rejected the email/password pair.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The third-party token was missing or the backend rejected it.
    #[error("federated login failed: {0}")]
    FederatedAuthFailed(String),

    /// No usable session: the token is gone, expired beyond refresh, or
    /// the backend answered `401` even after a refresh.
    #[error("session expired")]
    SessionExpired,

    /// Authenticated, but not allowed to do this.
    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    /// Any other non-2xx answer. `detail` is the backend's message, if any.
    #[error("request rejected ({status}): {}", detail.as_deref().unwrap_or("no detail"))]
    Rejected { status: u16, detail: Option<String> },

    /// The backend could not be reached at all.
    #[error("network error: {0}")]
    Network(#[from] TransportError),

    /// The backend answered, but with a body we could not use.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Reading or writing the token store failed.
    #[error("token storage error: {0}")]
    Storage(String),
}

impl SessionError {
    /// Maps a non-2xx status and its body to the matching variant.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        match status {
            401 => SessionError::SessionExpired,
            403 => SessionError::Forbidden,
            404 => SessionError::NotFound,
            _ => SessionError::Rejected {
                status,
                detail: error_detail(body),
            },
        }
    }
}
