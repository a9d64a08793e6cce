mod auth;
pub use auth::{
    AccessToken, EmailVerificationRequest, EmailVerificationResponse, EmailVerifyRequest,
    JwtClaims, LoginRequest, LoginResponse, NewPasswordRequest, NicknameCheckResponse,
    PasswordResetRequest, SignupRequest, TermsVersions, User, TERMS_VERSIONS,
};

mod comment;
pub use comment::{
    comment_depth, generate_comment_path, root_path, Comment, CommentPath, MyComment,
    MyCommentPage, NewComment, PathError,
};

mod error;
pub use error::{ApiError, ErrorCode, DEFAULT_FAILURE_MESSAGE};

pub mod format;

mod member;
pub use member::{AuthInfo, AuthProvider, ChangeEmailRequest, ImageChange, Profile, ProfileUpdate};

mod post;
pub use post::{
    ContentKind, ContentPart, ImageFile, ListPosts, OrderInfo, PageRequest, PagedPosts,
    PostDetail, PostDraft, PostEditData, PostId, PostPage, PostSummary, PrimaryCategory,
    SecondaryCategory, ACCEPTED_IMAGE_TYPES, DEFAULT_FEED_PAGE_SIZE, DEFAULT_LIST_PAGE_SIZE,
    MAX_IMAGES, MAX_IMAGE_BYTES, MAX_TITLE_CHARS, TEXT_PART_FILENAME,
};

pub mod validate;

pub use uuid::Uuid;
pub type Time = chrono::DateTime<chrono::Utc>;

/// Name of the cookie carrying the short-lived access token
pub const ACCESS_TOKEN_COOKIE_NAME: &str = "accessToken";

/// Name of the HTTP-only cookie carrying the refresh credential
pub const REFRESH_TOKEN_COOKIE_NAME: &str = "refreshToken";

/// Access tokens live for 30 minutes
pub const ACCESS_TOKEN_MAX_AGE_SECS: i64 = 30 * 60;

/// Refresh tokens and the remember-me flag live for a week
pub const REFRESH_TOKEN_MAX_AGE_SECS: i64 = 7 * 24 * 60 * 60;
pub const REMEMBER_ME_MAX_AGE_SECS: i64 = 7 * 24 * 60 * 60;

/// Envelope wrapping every backend response
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ApiResponse<T> {
    pub status: u16,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> ApiResponse<T> {
        ApiResponse {
            status: 200,
            code: String::from("success"),
            message: String::from("요청에 성공했습니다"),
            data: Some(data),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status < 400
    }
}

impl ApiResponse<()> {
    pub fn empty() -> ApiResponse<()> {
        ApiResponse {
            status: 200,
            code: String::from("success"),
            message: String::from("요청에 성공했습니다"),
            data: None,
        }
    }
}

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct MemberId(pub Uuid);

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.as_hyphenated())
    }
}

impl std::str::FromStr for MemberId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<MemberId, uuid::Error> {
        Ok(MemberId(Uuid::try_parse(s)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_without_data() {
        let resp: ApiResponse<LoginResponse> =
            serde_json::from_str(r#"{"status":401,"code":"unauthorized","message":"no"}"#)
                .unwrap();
        assert_eq!(resp.status, 401);
        assert!(resp.data.is_none());
        assert!(!resp.is_success());
    }

    #[test]
    fn envelope_with_data() {
        let resp: ApiResponse<LoginResponse> = serde_json::from_str(
            r#"{"status":200,"code":"ok","message":"","data":{"accessToken":"abc"}}"#,
        )
        .unwrap();
        assert_eq!(resp.data.unwrap().access_token, AccessToken(String::from("abc")));
    }
}
