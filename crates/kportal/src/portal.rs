//! `Portal` builder and entry point.
//!
//! This is the entry point for talking to the learning-portal backend. It
//! ties together all the layers: transport → protocol → session → services.

use std::sync::Arc;
use std::time::Duration;

use kportal_protocol::{Registration, User};
use kportal_session::{AppState, MemoryStore, SessionClient, SessionConfig, TokenStore};
use kportal_transport::Transport;
#[cfg(feature = "reqwest")]
use kportal_transport::ReqwestTransport;
use tracing::info;

use crate::services::{
    ContentSearchService, LearningPathService, ProfileService, QuizService, VideoService,
};
use crate::PortalError;

/// Backend used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";

/// Shortest password `register` accepts.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Builder for configuring a [`Portal`].
///
/// # Example
///
/// ```rust,ignore
/// use kportal::prelude::*;
///
/// let portal = Portal::builder()
///     .base_url("https://learn.example.com/api/v1")
///     .timeout(Duration::from_secs(10))
///     .build()?;
/// portal.session().login(&Credentials::new("ada@example.com", "pw")).await?;
/// ```
#[derive(Debug, Clone)]
pub struct PortalBuilder {
    base_url: String,
    session_config: SessionConfig,
    timeout: Option<Duration>,
    state: Option<Arc<AppState>>,
}

impl PortalBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            session_config: SessionConfig::default(),
            timeout: None,
            state: None,
        }
    }

    /// Sets the backend base URL (including any `/api/v1` prefix).
    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Sets a per-request timeout for the HTTP transport.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Shares an existing [`AppState`] instead of creating a fresh one.
    pub fn app_state(mut self, state: Arc<AppState>) -> Self {
        self.state = Some(state);
        self
    }

    /// Builds a portal over reqwest with an in-memory token store.
    #[cfg(feature = "reqwest")]
    pub fn build(self) -> Result<Portal<ReqwestTransport>, PortalError> {
        self.build_with_store(MemoryStore::new())
    }

    /// Builds a portal over reqwest with the given token store (for
    /// example a [`FileStore`](kportal_session::FileStore) so the session
    /// survives restarts).
    #[cfg(feature = "reqwest")]
    pub fn build_with_store<S: TokenStore>(
        self,
        store: S,
    ) -> Result<Portal<ReqwestTransport, S>, PortalError> {
        let transport = match self.timeout {
            Some(timeout) => ReqwestTransport::with_timeout(&self.base_url, timeout)?,
            None => ReqwestTransport::new(&self.base_url)?,
        };
        Ok(self.build_with_transport(transport, store))
    }

    /// Builds a portal over any transport. The base URL and timeout are
    /// the transport's business here and are ignored.
    pub fn build_with_transport<T: Transport, S: TokenStore>(
        self,
        transport: T,
        store: S,
    ) -> Portal<T, S> {
        let state = self.state.unwrap_or_default();
        let session = SessionClient::with_state(transport, store, self.session_config, state);
        info!(base_url = %self.base_url, "portal ready");
        Portal { session }
    }
}

impl Default for PortalBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A configured portal client.
///
/// Cheap to clone; clones share the session.
pub struct Portal<T, S = MemoryStore> {
    session: SessionClient<T, S>,
}

impl<T, S> Clone for Portal<T, S> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
        }
    }
}

impl<T, S> std::fmt::Debug for Portal<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Portal")
            .field("session", &self.session)
            .finish()
    }
}

impl Portal<()> {
    /// Creates a new builder.
    pub fn builder() -> PortalBuilder {
        PortalBuilder::new()
    }
}

impl<T: Transport, S: TokenStore> Portal<T, S> {
    /// The session client: login, logout, tokens, route guard.
    pub fn session(&self) -> &SessionClient<T, S> {
        &self.session
    }

    pub fn quizzes(&self) -> QuizService<'_, T, S> {
        QuizService::new(&self.session)
    }

    pub fn search(&self) -> ContentSearchService<'_, T, S> {
        ContentSearchService::new(&self.session)
    }

    pub fn profiles(&self) -> ProfileService<'_, T, S> {
        ProfileService::new(&self.session)
    }

    pub fn learning_paths(&self) -> LearningPathService<'_, T, S> {
        LearningPathService::new(&self.session)
    }

    pub fn videos(&self) -> VideoService<'_, T, S> {
        VideoService::new(&self.session)
    }

    /// Creates an account after checking the password locally.
    ///
    /// # Errors
    /// - [`PortalError::Validation`] if `confirm_password` differs or the
    ///   password is shorter than [`MIN_PASSWORD_LEN`]; nothing is sent
    /// - whatever [`SessionClient::register`] fails with
    pub async fn register(
        &self,
        registration: &Registration,
        confirm_password: &str,
    ) -> Result<User, PortalError> {
        if registration.password != confirm_password {
            return Err(PortalError::validation("password", "Passwords do not match"));
        }
        if registration.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(PortalError::validation(
                "password",
                format!("Password must be at least {MIN_PASSWORD_LEN} characters long"),
            ));
        }
        Ok(self.session.register(registration).await?)
    }
}
