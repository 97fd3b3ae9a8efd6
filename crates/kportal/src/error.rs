//! Unified error type for kportal.

use kportal_protocol::ProtocolError;
use kportal_session::SessionError;
use kportal_stream::StreamError;
use kportal_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `kportal` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant auto-generates `From` impls, so the `?`
/// operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    /// A transport-level error (building the HTTP client).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (credentials, expiry, backend rejection).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The reveal task for streamed text went away.
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// Input rejected client-side; no request was sent.
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
}

impl PortalError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        PortalError::Validation {
            field,
            message: message.into(),
        }
    }

    /// The message to show next to the control that triggered the error.
    pub fn user_message(&self) -> String {
        match self {
            PortalError::Validation { message, .. } => message.clone(),
            PortalError::Session(err) => session_message(err),
            PortalError::Transport(_) => NETWORK_MESSAGE.to_string(),
            PortalError::Protocol(_) => {
                "The server sent an unexpected response. Please try again later.".to_string()
            }
            PortalError::Stream(_) => "The text display stopped unexpectedly.".to_string(),
        }
    }
}

const NETWORK_MESSAGE: &str = "Network error. Please check your connection and try again.";

fn session_message(err: &SessionError) -> String {
    match err {
        SessionError::InvalidCredentials => "Invalid email or password".to_string(),
        SessionError::FederatedAuthFailed(_) => "Failed to login with Google".to_string(),
        SessionError::SessionExpired => {
            "Your session has expired. Please log in again.".to_string()
        }
        SessionError::Forbidden => "You do not have permission to do that.".to_string(),
        SessionError::NotFound => "Not found.".to_string(),
        SessionError::Rejected {
            status: 422,
            detail,
        } => format!(
            "Validation error: {}",
            detail.as_deref().unwrap_or("invalid data")
        ),
        SessionError::Rejected {
            detail: Some(detail),
            ..
        } => detail.clone(),
        SessionError::Rejected { .. } => {
            "The request failed. Please try again later.".to_string()
        }
        SessionError::Network(_) => NETWORK_MESSAGE.to_string(),
        SessionError::Protocol(_) => {
            "The server sent an unexpected response. Please try again later.".to_string()
        }
        SessionError::Storage(_) => "Could not save your session on this device.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::Network("gone".into());
        let portal_err: PortalError = err.into();
        assert!(matches!(portal_err, PortalError::Transport(_)));
        assert!(portal_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let portal_err: PortalError = err.into();
        assert!(matches!(portal_err, PortalError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let portal_err: PortalError = SessionError::SessionExpired.into();
        assert!(matches!(portal_err, PortalError::Session(_)));
        assert_eq!(
            portal_err.user_message(),
            "Your session has expired. Please log in again."
        );
    }

    #[test]
    fn test_user_message_invalid_credentials() {
        let err: PortalError = SessionError::InvalidCredentials.into();
        assert_eq!(err.user_message(), "Invalid email or password");
    }

    #[test]
    fn test_user_message_network_from_session() {
        let err: PortalError = SessionError::Network(TransportError::Timeout).into();
        assert_eq!(err.user_message(), NETWORK_MESSAGE);
    }

    #[test]
    fn test_user_message_rejected_uses_backend_detail() {
        let err: PortalError = SessionError::Rejected {
            status: 400,
            detail: Some("Email already registered".into()),
        }
        .into();
        assert_eq!(err.user_message(), "Email already registered");

        let err: PortalError = SessionError::Rejected {
            status: 422,
            detail: Some("field required".into()),
        }
        .into();
        assert_eq!(err.user_message(), "Validation error: field required");
    }

    #[test]
    fn test_user_message_validation_is_message() {
        let err = PortalError::validation("username", "Username must be between 3 and 50 characters");
        assert_eq!(err.user_message(), "Username must be between 3 and 50 characters");
        assert_eq!(
            err.to_string(),
            "invalid username: Username must be between 3 and 50 characters"
        );
    }
}
