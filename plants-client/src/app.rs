use crate::{
    api::{ApiError, ErrorCode, User},
    ApiClient, AuthStore, ModalStore, QueryCache, SavedSession,
};

pub const LOGIN_REQUIRED: &str = "로그인이 필요합니다.";

/// Everything a screen needs: the backend handle, the comment cache and the
/// modal slot. Clones share all three.
#[derive(Clone, Debug)]
pub struct Plants {
    pub api: ApiClient,
    pub cache: QueryCache,
    pub modal: ModalStore,
}

impl Plants {
    pub fn new(base_url: &str) -> Result<Plants, ApiError> {
        Ok(Plants {
            api: ApiClient::new(base_url, AuthStore::new())?,
            cache: QueryCache::new(),
            modal: ModalStore::new(),
        })
    }

    pub fn auth(&self) -> &AuthStore {
        self.api.auth()
    }

    /// The signed-in user, or the error shown when an action needs one
    pub fn require_user(&self) -> Result<User, ApiError> {
        self.auth()
            .user()
            .ok_or_else(|| ApiError::new(401, ErrorCode::AUTHENTICATION_REQUIRED, LOGIN_REQUIRED))
    }

    /// Loads persisted credentials into the stores, without calling out
    pub fn restore(&self, saved: &SavedSession) {
        let auth = self.auth();
        auth.set_remember_me(saved.remember_me);
        if let Some(tok) = &saved.access_token {
            auth.set_access_token(tok.clone());
        }
        if let Some(refresh) = &saved.refresh_token {
            self.api.set_refresh_token(refresh);
        }
    }

    /// What to persist; nothing unless remember-me is set
    pub fn save(&self) -> Option<SavedSession> {
        let state = self.auth().snapshot();
        if !state.remember_me {
            return None;
        }
        Some(SavedSession {
            host: String::from(self.api.base_url()),
            access_token: state.access_token,
            refresh_token: self.api.refresh_token(),
            remember_me: true,
        })
    }
}
