use anyhow::{anyhow, Context};
use serde_json::json;

/// Error codes the client reacts to specifically
pub struct ErrorCode;

impl ErrorCode {
    pub const NETWORK_ERROR: &'static str = "network_error";
    pub const AUTHENTICATION_REQUIRED: &'static str = "authentication_required";
    pub const TOKEN_REFRESH_FAILED: &'static str = "token_refresh_failed";
    pub const INVALID_RESPONSE: &'static str = "invalid_response";
    pub const INVALID_INPUT: &'static str = "invalid_input";
    pub const UNAUTHORIZED: &'static str = "unauthorized";
    pub const FORBIDDEN: &'static str = "forbidden";
    pub const NOT_FOUND: &'static str = "not_found";
    pub const MEMBER_NOT_FOUND_WITH_EMAIL: &'static str = "member_not_found_with_email";
    pub const INVALID_CREDENTIALS: &'static str = "invalid_credentials";
    pub const DUPLICATE_EMAIL: &'static str = "duplicate_email";
    pub const DUPLICATE_NICKNAME: &'static str = "duplicate_nickname";
    pub const EMAIL_NOT_VERIFIED: &'static str = "email_not_verified";
    pub const INVALID_VERIFY_CODE: &'static str = "invalid_verify_code";
    pub const COMMENT_PATH_CONFLICT: &'static str = "comment_path_conflict";
    pub const INTERNAL: &'static str = "internal_server_error";
}

pub const DEFAULT_FAILURE_MESSAGE: &str = "요청에 실패했습니다";

/// Flat error shape surfaced by the HTTP layer
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{message} ({status} {code})")]
pub struct ApiError {
    pub status: u16,
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> ApiError {
        let message = message.into();
        ApiError {
            status,
            code: code.into(),
            message: match message.is_empty() {
                true => String::from(DEFAULT_FAILURE_MESSAGE),
                false => message,
            },
        }
    }

    pub fn network() -> ApiError {
        ApiError::new(500, ErrorCode::NETWORK_ERROR, "네트워크 오류가 발생했습니다")
    }

    pub fn authentication_required() -> ApiError {
        ApiError::new(401, ErrorCode::AUTHENTICATION_REQUIRED, "다시 로그인해주세요")
    }

    pub fn token_refresh_failed(status: u16) -> ApiError {
        ApiError::new(
            status,
            ErrorCode::TOKEN_REFRESH_FAILED,
            format!("토큰 갱신에 실패했습니다 ({status})"),
        )
    }

    pub fn invalid_response() -> ApiError {
        ApiError::new(500, ErrorCode::INVALID_RESPONSE, "유효하지 않은 응답입니다")
    }

    pub fn invalid_input(message: impl Into<String>) -> ApiError {
        ApiError::new(400, ErrorCode::INVALID_INPUT, message)
    }

    pub fn unauthorized() -> ApiError {
        ApiError::new(401, ErrorCode::UNAUTHORIZED, "인증이 필요합니다")
    }

    pub fn forbidden() -> ApiError {
        ApiError::new(403, ErrorCode::FORBIDDEN, "권한이 없습니다")
    }

    pub fn not_found(what: &str) -> ApiError {
        ApiError::new(404, ErrorCode::NOT_FOUND, format!("{what}을(를) 찾을 수 없습니다"))
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn is_server_side(&self) -> bool {
        self.status >= 500
    }

    pub fn status_code(&self) -> http::StatusCode {
        http::StatusCode::from_u16(self.status).unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Text to show the user for this error, matched on well-known codes
    pub fn user_message(&self) -> String {
        match self.code.as_str() {
            ErrorCode::MEMBER_NOT_FOUND_WITH_EMAIL => String::from("등록된 이메일이 아닙니다."),
            ErrorCode::INVALID_INPUT => String::from("입력을 확인해주세요."),
            ErrorCode::AUTHENTICATION_REQUIRED | ErrorCode::TOKEN_REFRESH_FAILED => {
                String::from("다시 로그인해주세요")
            }
            ErrorCode::INVALID_CREDENTIALS => {
                String::from("이메일 또는 비밀번호가 일치하지 않습니다.")
            }
            ErrorCode::DUPLICATE_NICKNAME => String::from("이미 사용중인 닉네임입니다."),
            ErrorCode::DUPLICATE_EMAIL => String::from("이미 가입된 이메일입니다."),
            ErrorCode::NETWORK_ERROR => String::from("네트워크 오류가 발생했습니다"),
            _ if self.is_server_side() => String::from("네트워크 오류가 발생했습니다"),
            _ => self.message.clone(),
        }
    }

    /// Serialized response body, in the backend's envelope shape
    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "status": self.status,
            "code": self.code,
            "message": self.message,
        }))
        .expect("serializing error envelope")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<ApiError> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        let status = data
            .get("status")
            .and_then(|s| s.as_u64())
            .and_then(|s| u16::try_from(s).ok())
            .ok_or_else(|| anyhow!("error status is not a valid status code"))?;
        let code = data
            .get("code")
            .and_then(|c| c.as_str())
            .ok_or_else(|| anyhow!("error code is not a string"))?;
        let message = data.get("message").and_then(|m| m.as_str()).unwrap_or("");
        Ok(ApiError::new(status, code, message))
    }
}
