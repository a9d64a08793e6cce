//! Client-side form checks, run before any request is sent.
//!
//! Each form reports at most one message per field, in field order. Password
//! confirmation is only compared once every other field passes.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    post::{ACCEPTED_IMAGE_TYPES, MAX_IMAGES, MAX_IMAGE_BYTES, MAX_TITLE_CHARS},
    ImageFile, PostDraft,
};

lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

pub const PASSWORD_SPECIALS: &str = "@$!%*?&#";

pub const EMAIL_REQUIRED: &str = "이메일을 입력해주세요";
pub const EMAIL_INVALID: &str = "올바른 이메일을 입력해주세요";
pub const PASSWORD_REQUIRED: &str = "비밀번호를 입력해주세요";
pub const PASSWORD_POLICY: &str =
    "영문 대소문자, 숫자, 특수문자를 포함한 8자 이상의 비밀번호로 입력해주세요";
pub const PASSWORD_CONFIRM_REQUIRED: &str = "비밀번호 확인을 입력해주세요";
pub const PASSWORD_MISMATCH: &str = "비밀번호가 서로 일치하지 않습니다";
pub const VERIFICATION_CODE_REQUIRED: &str = "인증코드를 입력해주세요";
pub const NICKNAME_REQUIRED: &str = "닉네임을 입력해주세요";
pub const NICKNAME_TOO_LONG: &str = "닉네임은 20자 이내로 입력해주세요";
pub const TERMS_REQUIRED: &str = "이용약관에 동의해주세요";
pub const PRIVACY_REQUIRED: &str = "개인정보처리방침에 동의해주세요";
pub const COMMUNITY_REQUIRED: &str = "커뮤니티 운영정책에 동의해주세요";

pub const CATEGORY_REQUIRED: &str = "카테고리를 선택해주세요";
pub const TITLE_REQUIRED: &str = "제목을 입력해주세요";
pub const TITLE_TOO_LONG: &str = "제목은 60자 이내로 입력해주세요";
pub const BODY_REQUIRED: &str = "내용을 입력하거나 이미지를 등록해주세요";
pub const IMAGE_TYPE_UNSUPPORTED: &str =
    "지원하지 않는 파일 형식입니다. jpeg, png, jpg 파일만 업로드 가능합니다.";
pub const IMAGE_TOO_LARGE: &str = "10MB 이하의 이미지를 등록해주세요.";

/// Field-keyed validation failures, in the order they were found
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ValidationErrors {
    errors: Vec<(&'static str, String)>,
}

impl ValidationErrors {
    pub fn new() -> ValidationErrors {
        ValidationErrors::default()
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> ValidationErrors {
        let mut errs = ValidationErrors::new();
        errs.add(field, message);
        errs
    }

    /// Keeps only the first message for each field
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        if self.get(field).is_none() {
            self.errors.push((field, message.into()));
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, m)| m.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn first_message(&self) -> Option<&str> {
        self.errors.first().map(|(_, m)| m.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.errors.iter().map(|(f, m)| (*f, m.as_str()))
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        match self.is_empty() {
            true => Ok(()),
            false => Err(self),
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.first_message().unwrap_or("입력을 확인해주세요."))
    }
}

impl std::error::Error for ValidationErrors {}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

pub fn check_email(email: &str) -> Result<(), &'static str> {
    if email.is_empty() {
        Err(EMAIL_REQUIRED)
    } else if !is_valid_email(email) {
        Err(EMAIL_INVALID)
    } else {
        Ok(())
    }
}

/// Each password rule, reported separately for the live checklist
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PasswordRequirements {
    pub min_length: bool,
    pub has_lower_case: bool,
    pub has_upper_case: bool,
    pub has_number: bool,
    pub has_special_char: bool,
}

impl PasswordRequirements {
    pub fn check(password: &str) -> PasswordRequirements {
        PasswordRequirements {
            min_length: password.chars().count() >= 8,
            has_lower_case: password.chars().any(|c| c.is_ascii_lowercase()),
            has_upper_case: password.chars().any(|c| c.is_ascii_uppercase()),
            has_number: password.chars().any(|c| c.is_ascii_digit()),
            has_special_char: password.chars().any(|c| PASSWORD_SPECIALS.contains(c)),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.min_length
            && self.has_lower_case
            && self.has_upper_case
            && self.has_number
            && self.has_special_char
    }
}

/// Full password policy: every requirement, and nothing outside
/// `[A-Za-z0-9@$!%*?&#]`
pub fn check_password(password: &str) -> Result<(), &'static str> {
    let only_allowed = password
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c));
    match PasswordRequirements::check(password).is_valid() && only_allowed {
        true => Ok(()),
        false => Err(PASSWORD_POLICY),
    }
}

fn check_password_pair(
    errs: &mut ValidationErrors,
    (pw_field, password): (&'static str, &str),
    (confirm_field, confirm): (&'static str, &str),
) {
    if let Err(e) = check_password(password) {
        errs.add(pw_field, e);
    }
    if confirm.is_empty() {
        errs.add(confirm_field, PASSWORD_CONFIRM_REQUIRED);
    }
    if errs.is_empty() && password != confirm {
        errs.add(confirm_field, PASSWORD_MISMATCH);
    }
}

#[derive(Clone, Debug, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub remember_me: bool,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();
        if let Err(e) = check_email(&self.email) {
            errs.add("email", e);
        }
        if self.password.is_empty() {
            errs.add("password", PASSWORD_REQUIRED);
        }
        errs.into_result()
    }
}

#[derive(Clone, Debug, Default)]
pub struct SignupForm {
    pub email: String,
    pub verification_code: String,
    pub password: String,
    pub password_confirm: String,
    pub nickname: String,
    pub agree_to_terms: bool,
    pub agree_to_privacy: bool,
    pub agree_to_community: bool,
    pub agree_to_marketing: bool,
}

impl SignupForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();
        if let Err(e) = check_email(&self.email) {
            errs.add("email", e);
        }
        if self.verification_code.is_empty() {
            errs.add("verificationCode", VERIFICATION_CODE_REQUIRED);
        }
        let nick_len = self.nickname.chars().count();
        if nick_len == 0 {
            errs.add("nickname", NICKNAME_REQUIRED);
        } else if nick_len > 20 {
            errs.add("nickname", NICKNAME_TOO_LONG);
        }
        if !self.agree_to_terms {
            errs.add("agreeToTerms", TERMS_REQUIRED);
        }
        if !self.agree_to_privacy {
            errs.add("agreeToPrivacy", PRIVACY_REQUIRED);
        }
        if !self.agree_to_community {
            errs.add("agreeToCommunity", COMMUNITY_REQUIRED);
        }
        check_password_pair(
            &mut errs,
            ("password", &self.password),
            ("passwordConfirm", &self.password_confirm),
        );
        errs.into_result()
    }
}

/// Reset with an emailed verification code
#[derive(Clone, Debug, Default)]
pub struct ResetPasswordForm {
    pub email: String,
    pub verification_code: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

impl ResetPasswordForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();
        if let Err(e) = check_email(&self.email) {
            errs.add("email", e);
        }
        if self.verification_code.is_empty() {
            errs.add("verificationCode", VERIFICATION_CODE_REQUIRED);
        }
        check_password_pair(
            &mut errs,
            ("newPassword", &self.new_password),
            ("newPasswordConfirm", &self.new_password_confirm),
        );
        errs.into_result()
    }
}

/// New password once the reset link's token was accepted
#[derive(Clone, Debug, Default)]
pub struct NewPasswordForm {
    pub password: String,
    pub password_confirm: String,
}

impl NewPasswordForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();
        check_password_pair(
            &mut errs,
            ("password", &self.password),
            ("passwordConfirm", &self.password_confirm),
        );
        errs.into_result()
    }
}

fn is_nickname_char(c: char) -> bool {
    matches!(c, '가'..='힣') || c.is_ascii_alphanumeric() || c == '_'
}

/// Stricter nickname rules shown next to the duplicate check. Returns every
/// failing rule.
pub fn validate_nickname(nickname: &str) -> Result<(), Vec<&'static str>> {
    let mut errors = Vec::new();
    if nickname.trim().is_empty() {
        errors.push(NICKNAME_REQUIRED);
    } else {
        let len = nickname.chars().count();
        if len < 2 {
            errors.push("닉네임은 2자 이상이어야 합니다");
        }
        if len > 20 {
            errors.push("닉네임은 20자 이내여야 합니다");
        }
        if !nickname.chars().all(is_nickname_char) {
            errors.push("닉네임은 한글, 영문, 숫자, 언더스코어만 사용할 수 있습니다");
        }
        if nickname.chars().all(|c| c.is_ascii_digit()) {
            errors.push("닉네임은 숫자로만 구성될 수 없습니다");
        }
    }
    match errors.is_empty() {
        true => Ok(()),
        false => Err(errors),
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PasswordStrength {
    pub score: u8,
    pub feedback: &'static str,
}

pub fn password_strength(password: &str) -> PasswordStrength {
    if password.is_empty() {
        return PasswordStrength {
            score: 0,
            feedback: "비밀번호를 입력하세요",
        };
    }
    let checks = [
        password.chars().count() >= 8,
        password.chars().any(|c| c.is_ascii_lowercase()),
        password.chars().any(|c| c.is_ascii_uppercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| "@$!%*?&".contains(c)),
    ];
    let score = checks.iter().filter(|c| **c).count() as u8;
    let feedback = match score {
        0 => "매우 약함",
        1 => "약함",
        2 | 3 => "보통",
        4 => "강함",
        _ => "매우 강함",
    };
    PasswordStrength { score, feedback }
}

pub fn check_image(image: &ImageFile) -> Result<(), &'static str> {
    if !ACCEPTED_IMAGE_TYPES.contains(&image.mime.as_str()) {
        return Err(IMAGE_TYPE_UNSUPPORTED);
    }
    if image.len() > MAX_IMAGE_BYTES {
        return Err(IMAGE_TOO_LARGE);
    }
    Ok(())
}

pub fn image_count_exceeded() -> String {
    format!("최대 {MAX_IMAGES}장 등록 가능합니다. 선택된 사진을 삭제 후 재시도 해주세요.")
}

/// Filters a batch of picked images: unsupported or oversized files are
/// dropped with their message, and the whole batch is refused if it would
/// go over the limit.
pub fn accept_images(
    existing: usize,
    picked: Vec<ImageFile>,
) -> Result<(Vec<ImageFile>, Vec<&'static str>), String> {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    for img in picked {
        match check_image(&img) {
            Ok(()) => accepted.push(img),
            Err(e) => rejected.push(e),
        }
    }
    if existing + accepted.len() > MAX_IMAGES {
        return Err(image_count_exceeded());
    }
    Ok((accepted, rejected))
}

pub fn validate_post_draft(draft: &PostDraft) -> Result<(), ValidationErrors> {
    let mut errs = ValidationErrors::new();
    if draft.primary_category_id.trim().is_empty() {
        errs.add("primaryCategoryId", CATEGORY_REQUIRED);
    }
    if draft.secondary_category_id.trim().is_empty() {
        errs.add("secondaryCategoryId", CATEGORY_REQUIRED);
    }
    if draft.title.trim().is_empty() {
        errs.add("title", TITLE_REQUIRED);
    } else if draft.title.chars().count() > MAX_TITLE_CHARS {
        errs.add("title", TITLE_TOO_LONG);
    }
    if !draft.has_text() && draft.images.is_empty() {
        errs.add("content", BODY_REQUIRED);
    }
    if draft.images.len() > MAX_IMAGES {
        errs.add("images", image_count_exceeded());
    }
    for img in &draft.images {
        if let Err(e) = check_image(img) {
            errs.add("images", e);
        }
    }
    errs.into_result()
}
