//! # kportal
//!
//! Client library for the knowledge-portal learning backend.
//!
//! kportal owns the session (login, bearer token, proactive refresh,
//! logout, route gating) and exposes typed calls to the backend's quiz,
//! content-search, profile, learning-path and video endpoints. The incremental
//! text renderer from [`kportal_stream`] is re-exported for showing
//! generated answers as if they were typed live.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kportal::prelude::*;
//!
//! # async fn run() -> Result<(), PortalError> {
//! let portal = Portal::builder()
//!     .base_url("http://localhost:8000/api/v1")
//!     .build()?;
//!
//! portal
//!     .session()
//!     .login(&Credentials::new("ada@example.com", "correct horse"))
//!     .await?;
//!
//! for quiz in portal.quizzes().available().await? {
//!     println!("{}", quiz.title);
//! }
//! # Ok(())
//! # }
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod error;
mod portal;
pub mod services;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use error::PortalError;
pub use portal::{DEFAULT_BASE_URL, MIN_PASSWORD_LEN, Portal, PortalBuilder};

pub use kportal_protocol as protocol;
pub use kportal_session as session;
pub use kportal_stream as stream;
pub use kportal_transport as transport;

/// Everything a typical caller needs.
pub mod prelude {
    pub use crate::services::{
        ContentSearchService, LearningPathService, ProfileService, QuizService, VideoService,
        generated_answer, relevant_segments,
    };
    pub use crate::{Portal, PortalBuilder, PortalError};
    pub use kportal_protocol::{
        ContentKind, ContentResult, Credentials, LearningPath, LearningPathCreate, ProfileUpdate,
        Quiz, QuizRequest, QuizResult, QuizSubmission, Registration, User, UserId, Video,
    };
    pub use kportal_session::{
        FileStore, MemoryStore, RouteDecision, SessionClient, SessionConfig, SessionError,
        TokenStore,
    };
    pub use kportal_stream::{
        RevealConfig, RevealFrame, RevealHandle, format_spans, render_ansi, render_plain,
        spawn_reveal,
    };
    pub use kportal_transport::Transport;
}
