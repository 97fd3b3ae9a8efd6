//! The session client: bearer token lifecycle plus authorized requests.
//!
//! This is the central piece of the session layer. It's responsible for:
//! - Logging in (password or federated) and registering accounts
//! - Persisting the access/refresh token pair in a [`TokenStore`]
//! - Refreshing proactively, `refresh_lead` before the token expires
//! - Retrying an authorized request once after a `401`
//! - Clearing everything on logout or when a refresh fails
//!
//! ## Lifecycle
//!
//! ```text
//!                  login() / federated_login()
//! [Unauthenticated] ─────────────────────────→ [Authenticated] ──┐
//!        ▲                                      │   ▲            │ timer fires
//!        │   logout() / refresh fails /         │   └─ refresh ok┘
//!        └──────── malformed token ─────────────┘
//! ```
//!
//! Authenticated carries exactly one armed [`RefreshTimer`]; Unauthenticated
//! carries none.
//!
//! # Concurrency note
//!
//! `SessionClient` is a cheap `Arc` handle. Clones share one token, one
//! timer and one [`AppState`]. Refreshes are single-flight: callers that
//! arrive while a refresh is in progress wait for it and reuse its outcome
//! instead of spending the refresh token twice.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Duration;

use chrono::Utc;
use kportal_protocol::{
    Codec, Credentials, FederatedLoginRequest, JsonCodec, RefreshRequest, RefreshResponse,
    Registration, TokenResponse, User, error_detail,
};
use kportal_transport::{HttpRequest, HttpResponse, Transport};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::token::{decode_claims, is_token_expired, refresh_delay};
use crate::{AppState, MemoryStore, RefreshTimer, SessionConfig, SessionError, TokenStore};

pub(crate) struct Inner<T, S> {
    transport: T,
    store: S,
    codec: JsonCodec,
    config: SessionConfig,
    state: Arc<AppState>,

    /// Mirror of the stored token as a ready-to-send header value.
    auth_header: RwLock<Option<String>>,

    timer: RefreshTimer,

    /// Serializes refreshes.
    refresh_lock: tokio::sync::Mutex<()>,

    /// Bumped after every completed refresh attempt. A caller that saw
    /// epoch `n` and finds `n + 1` after taking the lock knows someone else
    /// already refreshed on its behalf.
    refresh_epoch: AtomicU64,
}

/// Authenticated client for the learning-portal backend.
///
/// Generic over the [`Transport`] (reqwest in production, a scripted
/// transport in tests) and the [`TokenStore`] (memory or file).
pub struct SessionClient<T, S = MemoryStore> {
    pub(crate) inner: Arc<Inner<T, S>>,
}

impl<T, S> Clone for SessionClient<T, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport, S: TokenStore> SessionClient<T, S> {
    /// Creates a client with a fresh [`AppState`].
    ///
    /// Reads the store: if a token is already there (a previous run), the
    /// header mirror is primed and the refresh timer armed.
    pub fn new(transport: T, store: S, config: SessionConfig) -> Self {
        Self::with_state(transport, store, config, Arc::new(AppState::new()))
    }

    /// Like [`new`](Self::new), sharing an existing [`AppState`].
    pub fn with_state(transport: T, store: S, config: SessionConfig, state: Arc<AppState>) -> Self {
        let config = config.validated();
        let stored = store.get(&config.access_token_key);

        let client = Self {
            inner: Arc::new(Inner {
                transport,
                store,
                codec: JsonCodec,
                config,
                state,
                auth_header: RwLock::new(None),
                timer: RefreshTimer::new(),
                refresh_lock: tokio::sync::Mutex::new(()),
                refresh_epoch: AtomicU64::new(0),
            }),
        };

        if let Some(token) = stored {
            debug!("restoring stored session");
            client.set_header(Some(&token));
            client.schedule_refresh(&token, Duration::ZERO);
        }
        client
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.inner.state
    }

    pub fn refresh_timer(&self) -> &RefreshTimer {
        &self.inner.timer
    }

    // -----------------------------------------------------------------------
    // Login / registration
    // -----------------------------------------------------------------------

    /// Password login.
    ///
    /// On success the token pair is stored, the refresh timer armed and the
    /// current user fetched into [`AppState`].
    ///
    /// # Errors
    /// - [`SessionError::InvalidCredentials`] on 400/401/403; nothing is stored
    /// - [`SessionError::Network`] if the backend is unreachable
    pub async fn login(&self, credentials: &Credentials) -> Result<TokenResponse, SessionError> {
        let body = self.inner.codec.encode(credentials)?;
        let request = HttpRequest::post("/auth/login").with_json_body(body);
        let response = self.inner.transport.send(request).await?;

        match response.status {
            s if (200..300).contains(&s) => {}
            400 | 401 | 403 => {
                warn!(user = %credentials.username, status = response.status, "login rejected");
                return Err(SessionError::InvalidCredentials);
            }
            status => return Err(SessionError::from_status(status, &response.body)),
        }

        let tokens: TokenResponse = self.inner.codec.decode(&response.body)?;
        self.complete_login(&tokens).await?;
        info!(user = %credentials.username, "logged in");
        Ok(tokens)
    }

    /// Login with a third-party (Google) ID token.
    ///
    /// # Errors
    /// [`SessionError::FederatedAuthFailed`] if `external_token` is blank or
    /// the backend rejects it.
    pub async fn federated_login(&self, external_token: &str) -> Result<TokenResponse, SessionError> {
        if external_token.trim().is_empty() {
            return Err(SessionError::FederatedAuthFailed(
                "no federated credential received".to_string(),
            ));
        }

        let body = self.inner.codec.encode(&FederatedLoginRequest {
            token: external_token.to_string(),
        })?;
        let request = HttpRequest::post("/auth/google/login").with_json_body(body);
        let response = self.inner.transport.send(request).await?;

        if !response.is_success() {
            let detail = error_detail(&response.body)
                .unwrap_or_else(|| format!("backend answered {}", response.status));
            warn!(status = response.status, %detail, "federated login rejected");
            return Err(SessionError::FederatedAuthFailed(detail));
        }

        let tokens: TokenResponse = self.inner.codec.decode(&response.body)?;
        self.complete_login(&tokens).await?;
        info!("logged in with federated credential");
        Ok(tokens)
    }

    /// Creates an account. Does not log in.
    ///
    /// # Errors
    /// [`SessionError::Rejected`] with the backend's detail for any non-2xx
    /// answer (e.g. "Email already registered").
    pub async fn register(&self, registration: &Registration) -> Result<User, SessionError> {
        let body = self.inner.codec.encode(registration)?;
        let request = HttpRequest::post("/auth/register").with_json_body(body);
        let response = self.inner.transport.send(request).await?;

        if !response.is_success() {
            return Err(SessionError::Rejected {
                status: response.status,
                detail: error_detail(&response.body),
            });
        }

        let user: User = self.inner.codec.decode(&response.body)?;
        info!(user = %user.email, "account registered");
        Ok(user)
    }

    async fn complete_login(&self, tokens: &TokenResponse) -> Result<(), SessionError> {
        self.set_token(&tokens.access_token)?;
        if let Some(refresh) = &tokens.refresh_token {
            self.set_refresh_token(refresh)?;
        }

        // The token is what counts; a failed profile fetch only costs the
        // cached record.
        match self.fetch_user().await {
            Ok(user) => self.inner.state.set_user(user),
            Err(err) => {
                warn!(error = %err, "could not fetch current user after login");
                if let Some(user) = &tokens.user {
                    self.inner.state.set_user(user.clone());
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Token accessors
    // -----------------------------------------------------------------------

    pub fn get_token(&self) -> Option<String> {
        self.inner.store.get(&self.inner.config.access_token_key)
    }

    /// Persists `token`, updates the header mirror and re-arms the timer.
    ///
    /// # Errors
    /// [`SessionError::Storage`] if the store refuses the write.
    pub fn set_token(&self, token: &str) -> Result<(), SessionError> {
        self.install_token(token, Duration::ZERO)
    }

    /// Stores `token` and arms the timer no sooner than `floor` from now
    /// (capped at the token's own expiry).
    fn install_token(&self, token: &str, floor: Duration) -> Result<(), SessionError> {
        self.inner
            .store
            .set(&self.inner.config.access_token_key, token)?;
        self.set_header(Some(token));
        self.schedule_refresh(token, floor);
        Ok(())
    }

    /// Removes both stored tokens, clears the header mirror and disarms
    /// the timer. Everything is attempted even if one removal fails.
    ///
    /// # Errors
    /// The first [`SessionError::Storage`] encountered.
    pub fn remove_token(&self) -> Result<(), SessionError> {
        self.inner.timer.cancel();
        self.set_header(None);
        let access = self.inner.store.remove(&self.inner.config.access_token_key);
        let refresh = self.inner.store.remove(&self.inner.config.refresh_token_key);
        access.and(refresh)
    }

    pub fn refresh_token_value(&self) -> Option<String> {
        self.inner.store.get(&self.inner.config.refresh_token_key)
    }

    pub fn set_refresh_token(&self, token: &str) -> Result<(), SessionError> {
        self.inner
            .store
            .set(&self.inner.config.refresh_token_key, token)
    }

    /// The `Authorization` value sent with requests, `Bearer <token>`.
    pub fn authorization_header(&self) -> Option<String> {
        self.inner
            .auth_header
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_header(&self, token: Option<&str>) {
        *self
            .inner
            .auth_header
            .write()
            .unwrap_or_else(PoisonError::into_inner) = token.map(|t| format!("Bearer {t}"));
    }

    // -----------------------------------------------------------------------
    // Authentication status
    // -----------------------------------------------------------------------

    /// Fail-closed expiry check on an arbitrary token string.
    pub fn is_token_expired(&self, token: &str) -> bool {
        is_token_expired(token)
    }

    /// `true` only for a stored, well-formed, unexpired token.
    ///
    /// An expired token kicks off a background refresh (when called inside
    /// a Tokio runtime) and still reads as unauthenticated this time. A
    /// token without `sub` or `exp` is malformed and logs the session out.
    pub fn is_authenticated(&self) -> bool {
        let Some(token) = self.get_token() else {
            return false;
        };

        let claims = match decode_claims(&token) {
            Ok(claims) if claims.sub.is_some() && claims.exp.is_some() => claims,
            Ok(_) => {
                warn!("stored token lacks sub or exp, logging out");
                self.logout();
                return false;
            }
            Err(err) => {
                warn!(error = %err, "stored token malformed, logging out");
                self.logout();
                return false;
            }
        };

        if claims.is_expired_at(Utc::now()) {
            debug!("stored token expired, refreshing in background");
            self.spawn_refresh();
            return false;
        }
        true
    }

    // -----------------------------------------------------------------------
    // Refresh
    // -----------------------------------------------------------------------

    /// Exchanges the refresh token for a new access token.
    ///
    /// Concurrent calls share one request. Any failure logs the session
    /// out before the error is returned.
    ///
    /// # Errors
    /// - [`SessionError::SessionExpired`] without a refresh token or user
    ///   identifier, or when the backend rejects the refresh
    /// - [`SessionError::Network`] / [`SessionError::Protocol`] as usual
    pub async fn refresh_token(&self) -> Result<(), SessionError> {
        self.refresh_since(self.current_epoch()).await
    }

    async fn refresh_since(&self, epoch: u64) -> Result<(), SessionError> {
        let _guard = self.inner.refresh_lock.lock().await;

        if self.inner.refresh_epoch.load(Ordering::SeqCst) != epoch {
            debug!("refresh already completed by another caller");
            return match self.get_token() {
                Some(_) => Ok(()),
                None => Err(SessionError::SessionExpired),
            };
        }

        let exchanged = self.exchange_refresh_token().await;
        // Bump before storing so the timer armed by `set_token` belongs to
        // the new epoch.
        self.inner.refresh_epoch.fetch_add(1, Ordering::SeqCst);
        let result = exchanged.and_then(|renewed| {
            // A renewed token that already sits inside the lead would
            // otherwise re-arm at zero and refresh back to back.
            self.install_token(&renewed.access_token, self.inner.config.min_refresh_interval)?;
            if let Some(rotated) = &renewed.refresh_token {
                self.set_refresh_token(rotated)?;
            }
            Ok(())
        });

        match &result {
            Ok(()) => info!("session refreshed"),
            Err(err) => {
                warn!(error = %err, "refresh failed, logging out");
                self.logout();
            }
        }
        result
    }

    async fn exchange_refresh_token(&self) -> Result<RefreshResponse, SessionError> {
        let Some(refresh_token) = self.refresh_token_value() else {
            debug!("no refresh token stored");
            return Err(SessionError::SessionExpired);
        };
        let Some(email) = self.user_identifier() else {
            debug!("no user identifier for refresh");
            return Err(SessionError::SessionExpired);
        };

        let body = self.inner.codec.encode(&RefreshRequest {
            email,
            refresh_token,
        })?;
        let request = HttpRequest::post("/auth/refresh").with_json_body(body);
        let response = self.inner.transport.send(request).await?;
        if !response.is_success() {
            return Err(SessionError::from_status(response.status, &response.body));
        }
        Ok(self.inner.codec.decode(&response.body)?)
    }

    /// The account email: the stored token's `sub`, else the cached user.
    fn user_identifier(&self) -> Option<String> {
        self.get_token()
            .and_then(|token| decode_claims(&token).ok())
            .and_then(|claims| claims.sub)
            .or_else(|| self.inner.state.user().map(|user| user.email))
    }

    fn schedule_refresh(&self, token: &str, floor: Duration) {
        let claims = match decode_claims(token) {
            Ok(claims) => claims,
            Err(err) => {
                debug!(error = %err, "token unreadable, no refresh scheduled");
                self.inner.timer.cancel();
                return;
            }
        };

        let now = Utc::now();
        match refresh_delay(&claims, self.inner.config.refresh_lead, now) {
            Some(delay) => {
                let until_expiry = refresh_delay(&claims, Duration::ZERO, now).unwrap_or_default();
                let delay = delay.max(floor.min(until_expiry));
                let job = Self::refresh_job(Arc::downgrade(&self.inner), self.current_epoch());
                let armed = self.inner.timer.arm(delay, job);
                if armed {
                    debug!(
                        expires_at = ?claims.expires_at(),
                        in_secs = delay.as_secs(),
                        "proactive refresh scheduled"
                    );
                }
            }
            None => {
                debug!("token has no exp, no refresh scheduled");
                self.inner.timer.cancel();
            }
        }
    }

    fn spawn_refresh(&self) {
        match Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(Self::refresh_job(
                    Arc::downgrade(&self.inner),
                    self.current_epoch(),
                ));
            }
            Err(_) => debug!("no tokio runtime, background refresh skipped"),
        }
    }

    fn current_epoch(&self) -> u64 {
        self.inner.refresh_epoch.load(Ordering::SeqCst)
    }

    /// The background refresh. Holds only a weak reference so a pending
    /// timer never keeps a dropped client alive. Skipped if any refresh
    /// completed after `epoch` was read.
    fn refresh_job(
        inner: Weak<Inner<T, S>>,
        epoch: u64,
    ) -> impl Future<Output = ()> + Send + 'static {
        async move {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let client = SessionClient { inner };
            if let Err(err) = client.refresh_since(epoch).await {
                debug!(error = %err, "background refresh failed");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Current user / logout
    // -----------------------------------------------------------------------

    /// Fetches `/auth/me` and caches the result in [`AppState`].
    ///
    /// Goes through [`send_authorized`](Self::send_authorized), so a `401`
    /// is refreshed and retried once. A `403` triggers a refresh attempt
    /// before the error surfaces, so the next call can succeed.
    ///
    /// # Errors
    /// [`SessionError::SessionExpired`] without a token or when the retry
    /// is also rejected, [`SessionError::Forbidden`] on 403.
    pub async fn current_user(&self) -> Result<User, SessionError> {
        if self.get_token().is_none() {
            return Err(SessionError::SessionExpired);
        }

        let response = self.send_authorized(HttpRequest::get("/auth/me")).await?;
        if response.status == 403 {
            debug!("current user forbidden, attempting refresh");
            if let Err(refresh_err) = self.refresh_token().await {
                debug!(error = %refresh_err, "refresh after forbidden /auth/me failed");
            }
            return Err(SessionError::Forbidden);
        }

        let user = self.decode_user(&response)?;
        self.inner.state.set_user(user.clone());
        Ok(user)
    }

    /// One `/auth/me` round trip without the refresh-and-retry, for use
    /// right after a login has stored fresh tokens.
    async fn fetch_user(&self) -> Result<User, SessionError> {
        if self.get_token().is_none() {
            return Err(SessionError::SessionExpired);
        }
        let response = self.send_with_auth(HttpRequest::get("/auth/me")).await?;
        self.decode_user(&response)
    }

    fn decode_user(&self, response: &HttpResponse) -> Result<User, SessionError> {
        if !response.is_success() {
            return Err(SessionError::from_status(response.status, &response.body));
        }
        Ok(self.inner.codec.decode(&response.body)?)
    }

    /// Clears the token pair, the refresh timer and the cached user.
    pub fn logout(&self) {
        if let Err(err) = self.remove_token() {
            warn!(error = %err, "could not clear stored tokens");
        }
        self.inner.state.clear_user();
        info!("logged out");
    }

    // -----------------------------------------------------------------------
    // Authorized requests
    // -----------------------------------------------------------------------

    /// Sends `request` with the bearer header.
    ///
    /// On `401` exactly one refresh is attempted and the request retried
    /// once with the new token. A second `401` logs out.
    ///
    /// Other statuses are returned as-is for the caller to interpret.
    ///
    /// # Errors
    /// - [`SessionError::SessionExpired`] if the retry is also rejected
    /// - whatever the refresh failed with
    /// - [`SessionError::Network`] if the backend is unreachable
    pub async fn send_authorized(&self, request: HttpRequest) -> Result<HttpResponse, SessionError> {
        let epoch = self.current_epoch();
        let response = self.send_with_auth(request.clone()).await?;
        if response.status != 401 {
            return Ok(response);
        }

        debug!(method = %request.method, path = %request.path, "401, refreshing before retry");
        self.refresh_since(epoch).await?;

        let retried = self.send_with_auth(request).await?;
        if retried.status == 401 {
            warn!("request rejected after refresh, logging out");
            self.logout();
            return Err(SessionError::SessionExpired);
        }
        Ok(retried)
    }

    async fn send_with_auth(&self, mut request: HttpRequest) -> Result<HttpResponse, SessionError> {
        if let Some(header) = self.authorization_header() {
            request.set_header("Authorization", &header);
        }
        Ok(self.inner.transport.send(request).await?)
    }

    /// Authorized GET, decoding a 2xx body into `R`.
    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, SessionError> {
        self.request_json(HttpRequest::get(path)).await
    }

    /// Authorized POST with a JSON body.
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, SessionError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let bytes = self.inner.codec.encode(body)?;
        self.request_json(HttpRequest::post(path).with_json_body(bytes))
            .await
    }

    /// Authorized POST with a JSON body whose response body is ignored.
    pub async fn post_no_content<B>(&self, path: &str, body: &B) -> Result<(), SessionError>
    where
        B: Serialize + ?Sized,
    {
        let bytes = self.inner.codec.encode(body)?;
        let response = self
            .send_authorized(HttpRequest::post(path).with_json_body(bytes))
            .await?;
        if !response.is_success() {
            return Err(SessionError::from_status(response.status, &response.body));
        }
        Ok(())
    }

    /// Authorized PUT with a JSON body.
    pub async fn put_json<B, R>(&self, path: &str, body: &B) -> Result<R, SessionError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let bytes = self.inner.codec.encode(body)?;
        self.request_json(HttpRequest::put(path).with_json_body(bytes))
            .await
    }

    async fn request_json<R: DeserializeOwned>(&self, request: HttpRequest) -> Result<R, SessionError> {
        let response = self.send_authorized(request).await?;
        if !response.is_success() {
            return Err(SessionError::from_status(response.status, &response.body));
        }
        Ok(self.inner.codec.decode(&response.body)?)
    }
}

impl<T, S> std::fmt::Debug for SessionClient<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("config", &self.inner.config)
            .field("timer", &self.inner.timer)
            .finish_non_exhaustive()
    }
}
