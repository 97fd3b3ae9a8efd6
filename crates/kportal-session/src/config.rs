//! Session configuration.

use std::time::Duration;

use tracing::warn;

/// Configuration for a [`SessionClient`](crate::SessionClient).
///
/// The storage keys and login path are configurable for embedding, but
/// the defaults match what the portal's other clients use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long before `exp` the proactive refresh fires.
    pub refresh_lead: Duration,

    /// Shortest wait before the next proactive refresh after one has
    /// completed. Tokens that live no longer than `refresh_lead` would
    /// otherwise be renewed back to back.
    pub min_refresh_interval: Duration,

    /// Store key holding the access token.
    pub access_token_key: String,

    /// Store key holding the refresh token.
    pub refresh_token_key: String,

    /// Where the route guard redirects unauthenticated visitors.
    pub login_path: String,
}

impl SessionConfig {
    /// Upper bound for `refresh_lead`. The backend issues access tokens
    /// for days; short-lived deployments are covered by
    /// `min_refresh_interval`.
    pub const MAX_REFRESH_LEAD: Duration = Duration::from_secs(25 * 60);

    /// Clamps out-of-range values and restores empty keys to their defaults.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if self.refresh_lead > Self::MAX_REFRESH_LEAD {
            warn!(
                lead_secs = self.refresh_lead.as_secs(),
                max_secs = Self::MAX_REFRESH_LEAD.as_secs(),
                "refresh_lead exceeds maximum, clamping"
            );
            self.refresh_lead = Self::MAX_REFRESH_LEAD;
        }
        if self.access_token_key.is_empty() {
            self.access_token_key = defaults.access_token_key;
        }
        if self.refresh_token_key.is_empty() || self.refresh_token_key == self.access_token_key {
            warn!("refresh_token_key empty or shared with access_token_key, using default");
            self.refresh_token_key = defaults.refresh_token_key;
        }
        if !self.login_path.starts_with('/') {
            self.login_path = format!("/{}", self.login_path);
        }
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_lead: Duration::from_secs(5 * 60),
            min_refresh_interval: Duration::from_secs(30),
            access_token_key: "access_token".to_string(),
            refresh_token_key: "refresh_token".to_string(),
            login_path: "/login".to_string(),
        }
    }
}
