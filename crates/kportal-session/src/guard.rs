//! Route guard for protected views.
//!
//! The guard only decides; navigating is the caller's job.
//!
//! ```text
//! no token / expired ──→ logout, remember path ──→ RedirectToLogin
//! token, no cached user ──→ GET /auth/me ──┬─ ok ──→ Render(user)
//!                                          ├─ session expired ─→ logout, RedirectToLogin
//!                                          └─ other err ─→ RedirectToLogin (tokens kept)
//! token + cached user ──────────────────────────────→ Render(user)
//! ```

use kportal_protocol::User;
use kportal_transport::Transport;
use tracing::{debug, warn};

use crate::token::is_token_expired;
use crate::{SessionClient, SessionError, TokenStore};

/// What to show for a requested path.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteDecision {
    /// Show the protected view for this user.
    Render(User),

    /// Send the visitor to `login_path`. `return_to` is the path that was
    /// recorded for after login, if any.
    RedirectToLogin {
        login_path: String,
        return_to: Option<String>,
    },
}

impl RouteDecision {
    pub fn is_render(&self) -> bool {
        matches!(self, RouteDecision::Render(_))
    }
}

impl<T: Transport, S: TokenStore> SessionClient<T, S> {
    /// Decides whether `requested_path` may be rendered.
    pub async fn check_route(&self, requested_path: &str) -> RouteDecision {
        let usable = self
            .get_token()
            .is_some_and(|token| !is_token_expired(&token));
        if !usable {
            debug!(path = requested_path, "no usable token, redirecting to login");
            self.logout();
            return self.redirect_to_login(requested_path);
        }

        if let Some(user) = self.state().user() {
            return RouteDecision::Render(user);
        }

        match self.current_user().await {
            Ok(user) => RouteDecision::Render(user),
            Err(err) => {
                warn!(path = requested_path, error = %err, "could not load user for protected route");
                // Only a dead session is cleared; a network or server
                // failure keeps the tokens for the next attempt.
                if matches!(err, SessionError::SessionExpired) {
                    self.logout();
                }
                self.redirect_to_login(requested_path)
            }
        }
    }

    /// The path recorded by the last redirect, returned once.
    pub fn take_return_path(&self) -> Option<String> {
        self.state().take_return_path()
    }

    fn redirect_to_login(&self, requested_path: &str) -> RouteDecision {
        let login_path = self.config().login_path.clone();
        let return_to = if requested_path.is_empty() || requested_path == login_path {
            None
        } else {
            self.state().record_return_path(requested_path);
            Some(requested_path.to_string())
        };

        RouteDecision::RedirectToLogin {
            login_path,
            return_to,
        }
    }
}
