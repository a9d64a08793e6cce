use plants_client::{
    api::{
        validate::{LoginForm, NewPasswordForm, SignupForm},
        ErrorCode,
    },
    SessionState,
};
use plants_mock_server::{FailPoint, SEED_PASSWORD};
use tests::Backend;

const FERN: &str = "fern@plants.kr";

async fn backend() -> Backend {
    Backend::start(|s| {
        s.seed_member(FERN, SEED_PASSWORD, "고사리");
    })
    .await
    .expect("starting mock backend")
}

#[tokio::test]
async fn login_then_bootstrap_from_saved_session() {
    let b = backend().await;
    let plants = b.signed_in(FERN).await.unwrap();
    let user = plants.auth().user().unwrap();
    assert_eq!(user.nickname, "고사리");
    assert_eq!(user.email, FERN);

    let saved = plants.save().expect("remember-me sessions are saved");
    assert!(saved.refresh_token.is_some());

    let other = b.client().unwrap();
    assert_eq!(other.bootstrap(&saved).await, SessionState::Authenticated);
    assert_eq!(other.auth().user().unwrap().id, user.id);
    assert_eq!(other.api.refresh_count(), 0);
}

#[tokio::test]
async fn bootstrap_without_access_token_refreshes() {
    let b = backend().await;
    let plants = b.signed_in(FERN).await.unwrap();
    let mut saved = plants.save().unwrap();
    saved.access_token = None;

    let other = b.client().unwrap();
    assert_eq!(other.bootstrap(&saved).await, SessionState::Authenticated);
    assert_eq!(other.api.refresh_count(), 1);
    assert!(other.auth().access_token().is_some());
}

#[tokio::test]
async fn bootstrap_with_rejected_refresh_logs_out() {
    let b = backend().await;
    let plants = b.signed_in(FERN).await.unwrap();
    let mut saved = plants.save().unwrap();
    saved.access_token = None;
    saved.refresh_token = Some(String::from("not-a-refresh-token"));

    let other = b.client().unwrap();
    assert_eq!(other.bootstrap(&saved).await, SessionState::Unauthenticated);
    assert!(other.auth().user().is_none());
    assert!(other.save().is_none());
}

#[tokio::test]
async fn sessions_without_remember_me_are_not_kept() {
    let b = backend().await;
    let plants = b.client().unwrap();
    let form = LoginForm {
        email: String::from(FERN),
        password: String::from(SEED_PASSWORD),
        remember_me: false,
    };
    plants.login(&form).await.unwrap();
    assert!(plants.auth().is_authenticated());
    assert!(plants.save().is_none());
}

#[tokio::test]
async fn failed_logins_suggest_a_password_reset() {
    let b = backend().await;
    let plants = b.client().unwrap();
    let form = LoginForm {
        email: String::from(FERN),
        password: String::from("Wrong123!"),
        remember_me: false,
    };
    for _ in 0..3 {
        let err = plants.login(&form).await.unwrap_err();
        assert_eq!(err.api().unwrap().code, ErrorCode::INVALID_CREDENTIALS);
    }
    assert!(plants.auth().should_suggest_password_reset());

    let unknown = LoginForm {
        email: String::from("nobody@plants.kr"),
        ..form
    };
    let err = plants.login(&unknown).await.unwrap_err();
    assert_eq!(err.user_message(), "등록된 이메일이 아닙니다.");

    let ok = LoginForm {
        email: String::from(FERN),
        password: String::from(SEED_PASSWORD),
        remember_me: false,
    };
    plants.login(&ok).await.unwrap();
    assert_eq!(plants.auth().login_attempts(), 0);
}

#[tokio::test]
async fn invalid_login_form_never_reaches_the_backend() {
    let b = backend().await;
    let plants = b.client().unwrap();
    let form = LoginForm {
        email: String::from("not-an-email"),
        password: String::new(),
        remember_me: false,
    };
    let err = plants.login(&form).await.unwrap_err();
    assert!(err.api().is_none());
    assert_eq!(plants.auth().login_attempts(), 0);
}

#[tokio::test]
async fn profile_failure_falls_back_on_token_claims() {
    let b = backend().await;
    b.server.lock().fail_next(FailPoint::Profile, 1);
    let plants = b.signed_in(FERN).await.unwrap();
    let user = plants.auth().user().unwrap();
    assert_eq!(user.nickname, "고사리");
    assert_eq!(user.introduction, None);
}

#[tokio::test]
async fn login_left_unfinished_keeps_nothing() {
    let b = backend().await;
    {
        let mut s = b.server.lock();
        s.revoke_issued_tokens(1);
        s.fail_next(FailPoint::Refresh, 1);
    }
    let plants = b.client().unwrap();
    let form = LoginForm {
        email: String::from(FERN),
        password: String::from(SEED_PASSWORD),
        remember_me: true,
    };
    let err = plants.login(&form).await.unwrap_err();
    assert_eq!(err.api().unwrap().code, ErrorCode::AUTHENTICATION_REQUIRED);
    assert_eq!(plants.auth().login_attempts(), 1);
    assert!(plants.auth().user().is_none());
    assert!(plants.auth().access_token().is_none());
    assert!(!plants.auth().remember_me());
    assert!(plants.api.refresh_token().is_none());
    assert!(plants.save().is_none());

    plants.login(&form).await.unwrap();
    assert_eq!(plants.auth().login_attempts(), 0);
    assert!(plants.save().is_some());
}

#[tokio::test]
async fn logout_forgets_the_refresh_cookie() {
    let b = backend().await;
    let plants = b.signed_in(FERN).await.unwrap();
    assert!(plants.api.refresh_token().is_some());
    plants.logout();
    assert!(!plants.auth().is_authenticated());
    assert!(plants.api.refresh_token().is_none());
    assert!(plants.save().is_none());
}

#[tokio::test]
async fn signup_with_verified_email() {
    let b = backend().await;
    let plants = b.client().unwrap();
    let email = "ivy@plants.kr";

    let sent = plants.request_email_verification(email).await;
    assert!(sent.success, "{}", sent.message);
    let code = b.server.lock().verification_code(email).unwrap();

    let wrong = plants.verify_email_code(email, "000000x").await;
    assert!(!wrong.success);
    let ok = plants.verify_email_code(email, &code).await;
    assert!(ok.success, "{}", ok.message);

    let taken = plants.check_nickname("고사리").await;
    assert_eq!(taken.available, Some(false));
    let free = plants.check_nickname("아이비").await;
    assert_eq!(free.available, Some(true));

    let form = SignupForm {
        email: String::from(email),
        verification_code: code,
        password: String::from("Ivy12345!"),
        password_confirm: String::from("Ivy12345!"),
        nickname: String::from("아이비"),
        agree_to_terms: true,
        agree_to_privacy: true,
        agree_to_community: true,
        agree_to_marketing: false,
    };
    plants.signup(&form).await.unwrap();
    assert_eq!(b.server.lock().test_num_members(), 2);

    let err = plants.signup(&form).await.unwrap_err();
    assert_eq!(err.api().unwrap().code, ErrorCode::DUPLICATE_EMAIL);

    let login = LoginForm {
        email: String::from(email),
        password: String::from("Ivy12345!"),
        remember_me: false,
    };
    assert_eq!(plants.login(&login).await.unwrap().nickname, "아이비");
}

#[tokio::test]
async fn signup_needs_a_verified_email() {
    let b = backend().await;
    let plants = b.client().unwrap();
    let form = SignupForm {
        email: String::from("moss@plants.kr"),
        verification_code: String::from("123456"),
        password: String::from("Moss1234!"),
        password_confirm: String::from("Moss1234!"),
        nickname: String::from("이끼"),
        agree_to_terms: true,
        agree_to_privacy: true,
        agree_to_community: true,
        agree_to_marketing: true,
    };
    let err = plants.signup(&form).await.unwrap_err();
    assert_eq!(err.api().unwrap().code, ErrorCode::EMAIL_NOT_VERIFIED);
}

#[tokio::test]
async fn password_reset_through_emailed_link() {
    let b = backend().await;
    let plants = b.client().unwrap();
    plants.request_password_reset(FERN).await.unwrap();
    let token = b.server.lock().reset_token(FERN).unwrap();

    plants.api.verify_password_reset(&token).await.unwrap();
    let form = NewPasswordForm {
        password: String::from("Fresh123!"),
        password_confirm: String::from("Fresh123!"),
    };
    plants.reset_password(&form).await.unwrap();

    let old = LoginForm {
        email: String::from(FERN),
        password: String::from(SEED_PASSWORD),
        remember_me: false,
    };
    assert!(plants.login(&old).await.is_err());
    let new = LoginForm {
        password: String::from("Fresh123!"),
        ..old
    };
    plants.login(&new).await.unwrap();

    // the link only works once
    assert!(plants.api.verify_password_reset(&token).await.is_err());
}

#[tokio::test]
async fn password_reset_for_unknown_email() {
    let b = backend().await;
    let plants = b.client().unwrap();
    let err = plants
        .request_password_reset("nobody@plants.kr")
        .await
        .unwrap_err();
    assert_eq!(err.api().unwrap().code, ErrorCode::MEMBER_NOT_FOUND_WITH_EMAIL);

    let err = plants.request_password_reset("nobody").await.unwrap_err();
    assert!(err.api().is_none());
}
