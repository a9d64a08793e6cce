use plants_client::api::{
    validate::LoginForm, AuthProvider, ErrorCode, ImageChange, ImageFile, ProfileUpdate,
};
use plants_mock_server::SEED_PASSWORD;
use tests::Backend;

const FERN: &str = "fern@plants.kr";
const IVY: &str = "ivy@plants.kr";

async fn backend() -> Backend {
    Backend::start(|s| {
        s.seed_member(FERN, SEED_PASSWORD, "고사리");
        s.seed_member(IVY, SEED_PASSWORD, "아이비");
    })
    .await
    .expect("starting mock backend")
}

#[tokio::test]
async fn profile_edits_show_up_in_the_session() {
    let b = backend().await;
    let fern = b.signed_in(FERN).await.unwrap();

    let update = ProfileUpdate {
        nickname: Some(String::from("큰고사리")),
        introduction: Some(String::from("양치식물을 좋아해요")),
        image: ImageChange::Replace(ImageFile::new(String::from("me.jpg"), vec![0xff, 0xd8, 0xff])),
    };
    let profile = fern.update_profile(&update).await.unwrap();
    assert_eq!(profile.nickname, "큰고사리");
    assert!(profile
        .image_url
        .as_deref()
        .unwrap()
        .starts_with("data:image/jpeg;base64,"));
    assert_eq!(fern.modal.take().unwrap().description, "프로필이 수정되었습니다.");

    let user = fern.auth().user().unwrap();
    assert_eq!(user.nickname, "큰고사리");
    assert_eq!(user.introduction.as_deref(), Some("양치식물을 좋아해요"));
    assert_eq!(user.image, profile.image_url);

    // only the picture goes away
    let cleared = fern
        .update_profile(&ProfileUpdate {
            image: ImageChange::Delete,
            ..ProfileUpdate::default()
        })
        .await
        .unwrap();
    assert_eq!(cleared.image_url, None);
    assert_eq!(cleared.nickname, "큰고사리");
    assert_eq!(fern.my_profile().await.unwrap(), cleared);
}

#[tokio::test]
async fn nicknames_are_checked_both_sides() {
    let b = backend().await;
    let fern = b.signed_in(FERN).await.unwrap();

    let taken = ProfileUpdate {
        nickname: Some(String::from("아이비")),
        ..ProfileUpdate::default()
    };
    let err = fern.update_profile(&taken).await.unwrap_err();
    assert_eq!(err.api().unwrap().code, ErrorCode::DUPLICATE_NICKNAME);
    assert_eq!(err.user_message(), "이미 사용중인 닉네임입니다.");
    assert_eq!(fern.auth().user().unwrap().nickname, "고사리");

    let invalid = ProfileUpdate {
        nickname: Some(String::from("12345")),
        ..ProfileUpdate::default()
    };
    let err = fern.update_profile(&invalid).await.unwrap_err();
    assert!(err.api().is_none());

    let gif = ProfileUpdate {
        image: ImageChange::Replace(ImageFile::new(String::from("me.gif"), vec![1])),
        ..ProfileUpdate::default()
    };
    assert!(fern.update_profile(&gif).await.unwrap_err().api().is_none());
}

#[tokio::test]
async fn auth_info_and_email_change() {
    let b = backend().await;
    let fern = b.signed_in(FERN).await.unwrap();

    let info = fern.my_auth_info().await.unwrap();
    assert_eq!(info.email, FERN);
    assert_eq!(info.auth_provider, AuthProvider::Basic);
    assert!(!info.auth_provider.is_social());
    assert!(info.created_at.is_some());

    let err = fern.change_email(IVY).await.unwrap_err();
    assert_eq!(err.api().unwrap().code, ErrorCode::DUPLICATE_EMAIL);
    assert!(fern.change_email("not-an-email").await.unwrap_err().api().is_none());

    fern.change_email("fern2@plants.kr").await.unwrap();
    assert_eq!(fern.auth().user().unwrap().email, "fern2@plants.kr");
    assert_eq!(fern.my_auth_info().await.unwrap().email, "fern2@plants.kr");

    let other = b.client().unwrap();
    let login = LoginForm {
        email: String::from("fern2@plants.kr"),
        password: String::from(SEED_PASSWORD),
        remember_me: false,
    };
    assert_eq!(other.login(&login).await.unwrap().nickname, "고사리");
}

#[tokio::test]
async fn members_only_see_their_own_account() {
    let b = backend().await;
    let fern = b.signed_in(FERN).await.unwrap();
    let ivy = b.signed_in(IVY).await.unwrap();
    let ivy_id = ivy.auth().user().unwrap().id;

    // profiles are public to members, account details are not
    assert_eq!(fern.api.profile(ivy_id).await.unwrap().nickname, "아이비");
    assert_eq!(fern.api.auth_info(ivy_id).await.unwrap_err().status, 403);

    let anonymous = b.client().unwrap();
    assert!(anonymous.my_profile().await.unwrap_err().is_unauthorized());
}
