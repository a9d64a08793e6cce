use std::fmt;

use crate::{ImageFile, MemberId};

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: MemberId,
    pub image_url: Option<String>,
    pub introduction: Option<String>,
    pub nickname: String,
}

/// What to do with the profile picture on update
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum ImageChange {
    #[default]
    Keep,
    Replace(ImageFile),
    Delete,
}

/// Sent as multipart: only the fields that are set become parts
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ProfileUpdate {
    pub nickname: Option<String>,
    pub introduction: Option<String>,
    pub image: ImageChange,
}

impl ProfileUpdate {
    pub fn is_noop(&self) -> bool {
        self.nickname.is_none() && self.introduction.is_none() && self.image == ImageChange::Keep
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum AuthProvider {
    #[serde(rename = "BASIC")]
    Basic,
    Google,
    Kakao,
    Naver,
}

impl AuthProvider {
    /// Social accounts have no password or email to change here
    pub fn is_social(self) -> bool {
        self != AuthProvider::Basic
    }
}

impl fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuthProvider::Basic => "이메일",
            AuthProvider::Google => "Google",
            AuthProvider::Kakao => "카카오",
            AuthProvider::Naver => "네이버",
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthInfo {
    pub id: MemberId,
    pub email: String,
    pub auth_provider: AuthProvider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEmailRequest {
    pub current_email: String,
    pub new_email: String,
}
