use kportal_protocol::{ProfileUpdate, User, UserId};
use kportal_session::{SessionClient, SessionError, TokenStore};
use kportal_transport::Transport;
use tracing::info;
use validator::{Validate, ValidationErrors};

use crate::PortalError;

/// Profile reads and edits.
pub struct ProfileService<'a, T, S> {
    session: &'a SessionClient<T, S>,
}

impl<'a, T: Transport, S: TokenStore> ProfileService<'a, T, S> {
    pub(crate) fn new(session: &'a SessionClient<T, S>) -> Self {
        Self { session }
    }

    pub async fn get(&self, user_id: UserId) -> Result<User, PortalError> {
        Ok(self
            .session
            .get_json(&format!("/users/{user_id}/profile"))
            .await?)
    }

    /// Validates and sends a profile edit. When the edited profile is the
    /// cached user's, the cache is replaced with the backend's answer.
    ///
    /// # Errors
    /// - [`PortalError::Validation`] for the first violated constraint
    /// - [`SessionError::SessionExpired`] without a live session
    ///
    /// Nothing is sent in either case.
    pub async fn update(&self, user_id: UserId, update: ProfileUpdate) -> Result<User, PortalError> {
        let update = validate_profile_update(update)?;
        if !self.session.is_authenticated() {
            return Err(SessionError::SessionExpired.into());
        }

        let user: User = self
            .session
            .put_json(&format!("/users/{user_id}/profile"), &update)
            .await?;
        info!(user_id = %user_id, "profile updated");

        let state = self.session.state();
        if state.user().is_some_and(|cached| cached.id == user.id) {
            state.set_user(user.clone());
        }
        Ok(user)
    }
}

/// Fields in the order their errors are reported.
const FIELD_ORDER: [&str; 4] = ["skill_level", "interests", "username", "full_name"];

/// Checks a profile edit and normalizes the skill level to lowercase.
///
/// Absent fields are not checked. When several fields are invalid, the
/// first in [`FIELD_ORDER`] is reported.
pub fn validate_profile_update(mut update: ProfileUpdate) -> Result<ProfileUpdate, PortalError> {
    if let Some(level) = update.skill_level.as_mut() {
        *level = level.trim().to_lowercase();
    }

    match update.validate() {
        Ok(()) => Ok(update),
        Err(errors) => Err(first_violation(&errors)),
    }
}

fn first_violation(errors: &ValidationErrors) -> PortalError {
    let fields = errors.field_errors();
    for field in FIELD_ORDER {
        if let Some(error) = fields.get(field).and_then(|errs| errs.first()) {
            let message = error
                .message
                .as_deref()
                .map(str::to_string)
                .unwrap_or_else(|| error.code.to_string());
            return PortalError::validation(field, message);
        }
    }
    PortalError::validation("profile", errors.to_string())
}
