//! Bearer token inspection.
//!
//! The client never verifies signatures (that's the backend's job). It only
//! reads the payload segment to learn when the token expires and whom it
//! belongs to, so it can refresh proactively and fail closed on garbage.
//!
//! A token is `header.payload.signature`, each segment base64url without
//! padding. The payload is a JSON object with at least:
//!
//! - `exp`: expiry, unix seconds
//! - `sub`: the account email

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// The claims the client cares about. Everything else is ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub exp: Option<f64>,
    #[serde(default)]
    pub sub: Option<String>,
}

impl TokenClaims {
    /// Expiry as a UTC timestamp, for logging.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let exp = self.exp?;
        DateTime::from_timestamp_millis((exp * 1000.0) as i64)
    }

    /// `true` when `exp` is missing or already in the past. A token whose
    /// `exp` is exactly `now` is still valid.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.exp {
            Some(exp) => exp < unix_seconds(now),
            None => true,
        }
    }
}

/// Why a token could not be read.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token is not three dot-separated segments")]
    Malformed,

    #[error("payload is not base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not a JSON claims object: {0}")]
    Claims(#[from] serde_json::Error),
}

/// Decodes the payload segment of a token.
///
/// # Errors
/// Returns a [`TokenError`] for anything that is not a three-segment token
/// with a base64url JSON-object payload.
pub fn decode_claims(token: &str) -> Result<TokenClaims, TokenError> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(TokenError::Malformed);
    };
    if payload.is_empty() {
        return Err(TokenError::Malformed);
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Fail-closed expiry check: `true` if the token is expired, lacks `exp`,
/// or cannot be decoded at all.
pub fn is_token_expired(token: &str) -> bool {
    match decode_claims(token) {
        Ok(claims) => claims.is_expired_at(Utc::now()),
        Err(err) => {
            tracing::debug!(error = %err, "token unreadable, treating as expired");
            true
        }
    }
}

/// How long to wait before refreshing: `exp - lead - now`, floored at zero.
///
/// Returns `None` when the claims have no `exp` (nothing to schedule).
pub fn refresh_delay(claims: &TokenClaims, lead: Duration, now: DateTime<Utc>) -> Option<Duration> {
    let exp = claims.exp?;
    let fire_at = exp - lead.as_secs_f64();
    let remaining = fire_at - unix_seconds(now);
    if remaining <= 0.0 || !remaining.is_finite() {
        Some(Duration::ZERO)
    } else {
        Some(Duration::from_secs_f64(remaining))
    }
}

fn unix_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / 1000.0
}
