mod app;
pub use app::{Plants, LOGIN_REQUIRED};

mod auth;
pub use auth::Outcome;

mod cache;
pub use cache::{CommentList, QueryCache};

mod comments;
pub use comments::EMPTY_COMMENT;

mod error;
pub use error::{Error, Result};

mod http;
pub use http::{encode_segment, parse_envelope, ApiClient, Body, FormPart, Request, REFRESH_PATH};

mod members;

mod modal;
pub use modal::{ConfirmAction, Modal, ModalKind, ModalStore};

mod optimistic;
pub use optimistic::{PendingToggle, PostInteraction, Toggle};

mod posts;
pub use posts::PostFeed;

mod route;
pub use route::{MypageSection, Route};

mod session;
pub use session::{AuthState, AuthStore, SavedSession, SessionState, PASSWORD_RESET_HINT_ATTEMPTS};

mod tree;
pub use tree::{build_comment_tree, CommentNode, CommentTree};

pub mod api {
    pub use plants_api::*;
}
