//! Wire protocol for kportal.
//!
//! This crate defines what the client and the learning-portal backend
//! exchange:
//!
//! - **Types** ([`User`], [`TokenResponse`], [`QuizSubmission`], etc.):
//!   the JSON bodies of every endpoint the client calls.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those bodies are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while encoding or
//!   decoding. A response that does not match its type is a tagged
//!   [`ProtocolError::Decode`], never an unchecked cast.
//!
//! ```text
//! Transport (bytes) → Protocol (typed bodies) → Session (auth context)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod error;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::{Codec, JsonCodec};
pub use error::{ProtocolError, error_detail};
pub use types::{
    ContentKind, ContentResult, ContentSearchRequest, ContentSearchResponse, Credentials,
    FederatedLoginRequest, LearningPath, LearningPathCreate, LearningPathProgress,
    LearningPathRequest, ProfileUpdate, Question, Quiz, QuizRequest, QuizResult, QuizSubmission,
    RefreshRequest, RefreshResponse, Registration, TokenResponse, User, UserId, Video,
    VideoCompletion, VideoProgressUpdate,
};
pub use types::{MAX_INTERESTS, SKILL_LEVELS};
