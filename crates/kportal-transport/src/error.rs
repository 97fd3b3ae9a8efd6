/// Errors that can occur in the transport layer.
///
/// Only failures where the backend never answered. An HTTP 401 or 500 is
/// a successful transport round-trip and comes back as an `HttpResponse`.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No response: DNS failure, refused connection, reset, TLS failure.
    #[error("network error: {0}")]
    Network(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The request could not be built (bad base URL, invalid header).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
