//! Application state shared by views: the cached user record and the
//! post-login return path.
//!
//! The cached user is display data. It is never consulted to decide
//! whether a request is allowed; the stored token is.

use std::sync::{PoisonError, RwLock};

use kportal_protocol::User;

#[derive(Debug, Default)]
pub struct AppState {
    user: RwLock<Option<User>>,
    return_path: RwLock<Option<String>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the cached user record, if any.
    pub fn user(&self) -> Option<User> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn has_user(&self) -> bool {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn set_user(&self, user: User) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = Some(user);
    }

    pub fn clear_user(&self) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Remembers where a redirected visitor was headed. Latest wins.
    pub fn record_return_path(&self, path: impl Into<String>) {
        *self
            .return_path
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(path.into());
    }

    /// Returns the recorded path once, clearing it.
    pub fn take_return_path(&self) -> Option<String> {
        self.return_path
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
