use serde::de::IgnoredAny;

use crate::{
    api::{
        validate::{self, LoginForm, NewPasswordForm, SignupForm, ValidationErrors},
        AccessToken, ApiError, ApiResponse, EmailVerificationRequest, EmailVerificationResponse,
        EmailVerifyRequest, ErrorCode, JwtClaims, LoginRequest, LoginResponse, NewPasswordRequest,
        NicknameCheckResponse, PasswordResetRequest, SignupRequest, User, DEFAULT_FAILURE_MESSAGE,
    },
    http::{encode_segment, Request},
    ApiClient, Plants, Result, SavedSession, SessionState,
};

impl ApiClient {
    pub async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, ApiError> {
        self.fetch(Request::post("/api/auth/login").skip_auth().json(req)?)
            .await
    }

    pub async fn signup(&self, req: &SignupRequest) -> Result<(), ApiError> {
        self.execute(Request::post("/api/members/register").skip_auth().json(req)?)
            .await
    }

    /// Returns the whole envelope; anything but status 200 means the mail
    /// was not sent, with the reason in `message`
    pub async fn send_verification_email(
        &self,
        email: &str,
    ) -> Result<ApiResponse<IgnoredAny>, ApiError> {
        let req = Request::post("/api/members/verify-email/send")
            .skip_auth()
            .json(&EmailVerificationRequest {
                email: String::from(email),
            })?;
        self.send(req).await
    }

    pub async fn verify_email(
        &self,
        email: &str,
        code: &str,
    ) -> Result<Option<EmailVerificationResponse>, ApiError> {
        let req = Request::post("/api/members/verify-email")
            .skip_auth()
            .json(&EmailVerifyRequest {
                email: String::from(email),
                verify_code: String::from(code),
            })?;
        Ok(self.send(req).await?.data)
    }

    pub async fn nickname_exists(&self, nickname: &str) -> Result<bool, ApiError> {
        let path = format!("/api/v1/members/check/nickname/{}", encode_segment(nickname));
        let resp = self
            .send::<NicknameCheckResponse>(Request::get(path).skip_auth())
            .await?;
        Ok(resp.data.map(|d| d.is_nickname_existed).unwrap_or(false))
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), ApiError> {
        let req = Request::post("/api/auth/reset-password-request/send")
            .skip_auth()
            .json(&PasswordResetRequest {
                email: String::from(email),
            })?;
        self.execute(req).await
    }

    /// Accepts the token from the reset link
    pub async fn verify_password_reset(&self, uuid: &str) -> Result<(), ApiError> {
        let req = Request::post("/api/auth/reset-password-request/verify/email")
            .skip_auth()
            .query(vec![("uuid", String::from(uuid))]);
        self.execute(req).await
    }

    pub async fn reset_password(&self, password: &str) -> Result<(), ApiError> {
        let req = Request::post("/api/auth/reset-password-request/verify/input")
            .skip_auth()
            .json(&NewPasswordRequest {
                password: String::from(password),
            })?;
        self.execute(req).await
    }
}

/// Result of a helper that never fails, only reports
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Outcome {
    pub success: bool,
    /// Only set by the nickname check
    pub available: Option<bool>,
    pub message: String,
}

impl Outcome {
    fn new(success: bool, message: impl Into<String>) -> Outcome {
        Outcome {
            success,
            available: None,
            message: message.into(),
        }
    }
}

/// The backend's message when it sent one, the screen's fallback otherwise
fn message_or(e: &ApiError, fallback: &str) -> String {
    match e.message.as_str() {
        "" | DEFAULT_FAILURE_MESSAGE => String::from(fallback),
        m => String::from(m),
    }
}

fn verification_sent(res: Result<ApiResponse<IgnoredAny>, ApiError>) -> Outcome {
    match res {
        Ok(r) if r.status == 200 => Outcome::new(true, "인증 메일이 발송되었습니다."),
        Ok(r) => Outcome::new(false, r.message),
        Err(e) => Outcome::new(false, message_or(&e, "인증 메일 발송에 실패했습니다.")),
    }
}

impl Plants {
    pub async fn request_email_verification(&self, email: &str) -> Outcome {
        verification_sent(self.api.send_verification_email(email).await)
    }

    pub async fn verify_email_code(&self, email: &str, code: &str) -> Outcome {
        match self.api.verify_email(email, code).await {
            Ok(Some(EmailVerificationResponse {
                has_email_auth: true,
            })) => Outcome::new(true, "이메일 인증이 완료되었습니다."),
            Ok(_) => Outcome::new(false, "인증에 실패했습니다."),
            Err(e) => Outcome::new(false, message_or(&e, "인증 코드 확인에 실패했습니다.")),
        }
    }

    pub async fn check_nickname(&self, nickname: &str) -> Outcome {
        match self.api.nickname_exists(nickname).await {
            Ok(exists) => Outcome {
                success: true,
                available: Some(!exists),
                message: String::from(match exists {
                    true => "이미 사용중인 닉네임입니다.",
                    false => "사용 가능한 닉네임입니다.",
                }),
            },
            Err(e) => Outcome {
                success: false,
                available: Some(false),
                message: message_or(&e, "닉네임 확인에 실패했습니다."),
            },
        }
    }

    /// Validates, signs in and commits the user. Server-side failures count
    /// towards the password reset hint.
    pub async fn login(&self, form: &LoginForm) -> Result<User> {
        form.validate()?;
        let req = LoginRequest {
            email: form.email.clone(),
            password: form.password.clone(),
        };
        let token = match self.api.login(&req).await {
            Ok(r) => r.access_token,
            Err(e) => {
                let attempts = self.auth().increment_login_attempts();
                tracing::info!(attempts, code = %e.code, "login failed");
                return Err(e.into());
            }
        };
        // the profile call needs the token; nothing else is kept until it succeeds
        self.auth().set_access_token(token.clone());
        let user = match self.complete_auth(&token).await {
            Ok(user) => user,
            Err(e) => {
                self.auth().clear_access_token();
                self.api.clear_refresh_token();
                let attempts = self.auth().increment_login_attempts();
                tracing::info!(attempts, code = %e.code, "login could not be completed");
                return Err(e.into());
            }
        };
        self.auth().set_remember_me(form.remember_me);
        self.auth().login(user.clone());
        tracing::info!(member = %user.id, "logged in");
        Ok(user)
    }

    /// Builds the user from a token: identity from its claims, display
    /// fields from the profile when it can be fetched
    pub async fn complete_auth(&self, token: &AccessToken) -> Result<User, ApiError> {
        let claims = JwtClaims::decode(&token.0).map_err(|e| {
            tracing::warn!(error = %e, "access token payload is unreadable");
            ApiError::new(401, "invalid_token", "유효하지 않은 토큰입니다.")
        })?;
        let mut user = User::from_claims(&claims);
        match self.api.profile(claims.sub).await {
            Ok(p) => {
                if !p.nickname.is_empty() {
                    user.nickname = p.nickname;
                }
                user.image = p.image_url;
                user.introduction = p.introduction;
            }
            Err(e) if e.code == ErrorCode::AUTHENTICATION_REQUIRED => return Err(e),
            Err(e) => tracing::warn!(error = %e, "profile fetch failed, using token claims"),
        }
        Ok(user)
    }

    /// Restores a persisted session. Without remember-me nothing is restored.
    pub async fn bootstrap(&self, saved: &SavedSession) -> SessionState {
        if !saved.remember_me {
            return SessionState::Unauthenticated;
        }
        self.restore(saved);
        let now = chrono::Utc::now();
        let token = match self.auth().access_token() {
            Some(t) if !t.is_expired(now) => t,
            _ if self.api.refresh_token().is_some() => match self.api.refresh().await {
                Ok(t) => t,
                Err(e) => {
                    tracing::info!(error = %e, "saved session could not be refreshed");
                    self.logout();
                    return SessionState::Unauthenticated;
                }
            },
            _ => return SessionState::Unauthenticated,
        };
        match self.complete_auth(&token).await {
            Ok(user) => {
                self.auth().login(user);
                SessionState::Authenticated
            }
            Err(e) => {
                tracing::info!(error = %e, "saved session is unusable");
                self.logout();
                SessionState::Unauthenticated
            }
        }
    }

    /// Local only: the backend keeps no session to close
    pub fn logout(&self) {
        self.auth().logout();
        self.api.clear_refresh_token();
        self.cache.clear();
    }

    pub async fn signup(&self, form: &SignupForm) -> Result<()> {
        form.validate()?;
        let req = SignupRequest::new(
            form.email.clone(),
            form.password.clone(),
            form.nickname.clone(),
            form.agree_to_marketing,
        );
        self.api.signup(&req).await?;
        Ok(())
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        validate::check_email(email).map_err(|e| ValidationErrors::single("email", e))?;
        self.api.request_password_reset(email).await?;
        Ok(())
    }

    /// Sets the new password once the reset link's token was accepted
    pub async fn reset_password(&self, form: &NewPasswordForm) -> Result<()> {
        form.validate()?;
        self.api.reset_password(&form.password).await?;
        Ok(())
    }
}
