use anyhow::{anyhow, Context};
use base64::Engine;

use crate::{MemberId, Time};

/// Versions of the terms the signup form agrees to
pub const TERMS_VERSIONS: TermsVersions = TermsVersions {
    terms_of_use: "v1.1.3",
    privacy_policy: "v1.1.3",
    ad_info_receiving: "v2.0.7",
};

pub struct TermsVersions {
    pub terms_of_use: &'static str,
    pub privacy_policy: &'static str,
    pub ad_info_receiving: &'static str,
}

#[derive(Clone, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct AccessToken(pub String);

impl AccessToken {
    pub fn claims(&self) -> anyhow::Result<JwtClaims> {
        JwtClaims::decode(&self.0)
    }

    /// Tokens whose payload cannot be read count as expired
    pub fn is_expired(&self, now: Time) -> bool {
        match self.claims() {
            Ok(c) => c.exp <= now.timestamp(),
            Err(_) => true,
        }
    }
}

/// Payload of an access token. The signature is never checked client-side.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct JwtClaims {
    pub sub: MemberId,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
    pub exp: i64,
}

impl JwtClaims {
    pub fn decode(token: &str) -> anyhow::Result<JwtClaims> {
        let payload = token
            .split('.')
            .nth(1)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| anyhow!("token has no payload segment"))?;
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .context("decoding token payload as base64url")?;
        serde_json::from_slice(&bytes).context("parsing token payload")
    }

    /// Builds an unsigned token carrying these claims
    pub fn encode_unsigned(&self) -> String {
        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        let header = engine.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload =
            engine.encode(serde_json::to_vec(self).expect("serializing token claims"));
        format!("{header}.{payload}.")
    }
}

/// The authenticated member as the client knows it
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct User {
    pub id: MemberId,
    pub email: String,
    pub nickname: String,
    pub role: String,
    pub image: Option<String>,
    pub introduction: Option<String>,
}

impl User {
    pub fn from_claims(claims: &JwtClaims) -> User {
        User {
            id: claims.sub,
            email: claims.email.clone(),
            nickname: claims.nickname.clone(),
            role: claims.role.clone(),
            image: None,
            introduction: None,
        }
    }
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: AccessToken,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub nickname: String,
    pub agreed_terms_of_use_version: String,
    pub agreed_privacy_policy_version: String,
    /// Empty when the optional marketing agreement was declined
    pub agreed_ad_info_receiving_version: String,
}

impl SignupRequest {
    pub fn new(email: String, password: String, nickname: String, marketing: bool) -> SignupRequest {
        SignupRequest {
            email,
            password,
            nickname,
            agreed_terms_of_use_version: String::from(TERMS_VERSIONS.terms_of_use),
            agreed_privacy_policy_version: String::from(TERMS_VERSIONS.privacy_policy),
            agreed_ad_info_receiving_version: match marketing {
                true => String::from(TERMS_VERSIONS.ad_info_receiving),
                false => String::new(),
            },
        }
    }
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct EmailVerificationRequest {
    pub email: String,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailVerifyRequest {
    pub email: String,
    pub verify_code: String,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailVerificationResponse {
    pub has_email_auth: bool,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NicknameCheckResponse {
    pub is_nickname_existed: bool,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct NewPasswordRequest {
    pub password: String,
}
