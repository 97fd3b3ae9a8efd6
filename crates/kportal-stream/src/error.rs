//! Error types for the reveal driver.

/// Errors from talking to a reveal task.
///
/// The state machine itself has no failure path; malformed markup renders
/// as literal text.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StreamError {
    /// The reveal task has stopped (shut down or panicked).
    #[error("reveal task closed")]
    Closed,
}
