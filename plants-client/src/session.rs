use std::sync::Arc;

use parking_lot::RwLock;

use crate::api::{AccessToken, User};

/// Failed logins after which the login screen suggests a password reset
pub const PASSWORD_RESET_HINT_ATTEMPTS: u32 = 3;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    pub access_token: Option<AccessToken>,
    pub login_attempts: u32,
    pub remember_me: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionState {
    Authenticated,
    Unauthenticated,
}

/// Shared handle on the signed-in identity. Every method takes the lock for
/// a single read or write, never across an await point.
#[derive(Clone, Debug, Default)]
pub struct AuthStore(Arc<RwLock<AuthState>>);

impl AuthStore {
    pub fn new() -> AuthStore {
        AuthStore::default()
    }

    pub fn snapshot(&self) -> AuthState {
        self.0.read().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.0.read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.0.read().user.is_some()
    }

    pub fn state(&self) -> SessionState {
        match self.is_authenticated() {
            true => SessionState::Authenticated,
            false => SessionState::Unauthenticated,
        }
    }

    pub fn access_token(&self) -> Option<AccessToken> {
        self.0.read().access_token.clone()
    }

    pub fn set_access_token(&self, token: AccessToken) {
        self.0.write().access_token = Some(token);
    }

    pub fn clear_access_token(&self) {
        self.0.write().access_token = None;
    }

    pub fn remember_me(&self) -> bool {
        self.0.read().remember_me
    }

    pub fn set_remember_me(&self, remember_me: bool) {
        self.0.write().remember_me = remember_me;
    }

    /// Commits a signed-in user and forgets previous failed attempts
    pub fn login(&self, user: User) {
        let mut s = self.0.write();
        s.user = Some(user);
        s.login_attempts = 0;
    }

    /// Drops everything local: user, token, remember-me and attempt count
    pub fn logout(&self) {
        *self.0.write() = AuthState::default();
    }

    /// Applies `f` to the current user, if any
    pub fn update_user(&self, f: impl FnOnce(&mut User)) {
        if let Some(u) = self.0.write().user.as_mut() {
            f(u);
        }
    }

    pub fn login_attempts(&self) -> u32 {
        self.0.read().login_attempts
    }

    pub fn increment_login_attempts(&self) -> u32 {
        let mut s = self.0.write();
        s.login_attempts += 1;
        s.login_attempts
    }

    pub fn reset_login_attempts(&self) {
        self.0.write().login_attempts = 0;
    }

    pub fn should_suggest_password_reset(&self) -> bool {
        self.login_attempts() >= PASSWORD_RESET_HINT_ATTEMPTS
    }
}

/// What survives a restart when remember-me is set
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SavedSession {
    pub host: String,
    pub access_token: Option<AccessToken>,
    pub refresh_token: Option<String>,
    pub remember_me: bool,
}
