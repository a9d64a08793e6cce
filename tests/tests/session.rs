use plants_client::{
    api::{ErrorCode, ListPosts, PrimaryCategory, SecondaryCategory},
    ModalKind, PostInteraction,
};
use plants_mock_server::{FailPoint, SEED_PASSWORD};
use tests::Backend;

const FERN: &str = "fern@plants.kr";

async fn backend() -> Backend {
    Backend::start(|s| {
        let fern = s.seed_member(FERN, SEED_PASSWORD, "고사리");
        s.seed_post(fern, PrimaryCategory::Daily, SecondaryCategory::Begonia, "베고니아", "꽃이 폈어요");
    })
    .await
    .expect("starting mock backend")
}

#[tokio::test]
async fn rejected_token_is_refreshed_once_and_retried() {
    let b = backend().await;
    let plants = b.signed_in(FERN).await.unwrap();
    let before = plants.api.refresh_token().unwrap();
    b.server.lock().expire_access_tokens();

    let profile = plants.my_profile().await.unwrap();
    assert_eq!(profile.nickname, "고사리");
    assert_eq!(plants.api.refresh_count(), 1);
    assert_eq!(b.server.lock().refresh_calls(), 1);
    // refresh tokens rotate
    assert_ne!(plants.api.refresh_token().unwrap(), before);

    // the new token sticks
    plants.my_profile().await.unwrap();
    assert_eq!(plants.api.refresh_count(), 1);
}

#[tokio::test]
async fn failed_refresh_signs_out() {
    let b = backend().await;
    let plants = b.signed_in(FERN).await.unwrap();
    {
        let mut s = b.server.lock();
        s.expire_access_tokens();
        s.fail_next(FailPoint::Refresh, 1);
    }

    let err = plants.my_profile().await.unwrap_err();
    assert_eq!(err.api().unwrap().code, ErrorCode::AUTHENTICATION_REQUIRED);
    assert_eq!(err.user_message(), "다시 로그인해주세요");
    assert!(plants.auth().user().is_none());
    assert!(plants.auth().access_token().is_none());

    // nothing signed in, so nothing is sent
    let err = plants.my_profile().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(plants.api.refresh_count(), 1);
}

#[tokio::test]
async fn failure_after_retry_is_returned_as_is() {
    let b = backend().await;
    let plants = b.signed_in(FERN).await.unwrap();
    let mut feed = plants.feed(ListPosts::default());
    feed.load_more().await.unwrap();
    let mut state = PostInteraction::from_summary(&feed.posts()[0]);
    {
        let mut s = b.server.lock();
        s.expire_access_tokens();
        s.fail_next(FailPoint::PostLike, 1);
    }

    let err = plants.toggle_post_like(&mut state).await.unwrap_err();
    assert_eq!(err.api().unwrap().status, 500);
    assert_eq!(plants.api.refresh_count(), 1);
    assert!(plants.auth().is_authenticated());
    assert!(!state.like.active);
    assert_eq!(state.like_count(), 0);
    let snackbar = plants.modal.take().unwrap();
    assert_eq!(snackbar.kind, ModalKind::Snackbar);
    assert_eq!(snackbar.description, "네트워크 오류가 발생했습니다");
}

#[tokio::test]
async fn concurrent_rejections_each_refresh() {
    let b = backend().await;
    let plants = b.signed_in(FERN).await.unwrap();
    b.server.lock().expire_access_tokens();

    let query = ListPosts::default();
    let results = futures::future::join_all((0..3).map(|_| plants.api.list_posts(&query))).await;

    // every call saw the stale token, so each one refreshed on its own
    assert_eq!(plants.api.refresh_count(), 3);
    assert_eq!(b.server.lock().refresh_calls(), 3);
    assert!(results.iter().any(|r| r.is_ok()));
    for r in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(r.code, ErrorCode::AUTHENTICATION_REQUIRED);
    }
}

#[tokio::test]
async fn anonymous_calls_never_refresh() {
    let b = backend().await;
    let plants = b.client().unwrap();
    let mut feed = plants.feed(ListPosts::default());
    assert_eq!(feed.load_more().await.unwrap(), 1);
    assert_eq!(plants.api.refresh_count(), 0);
    assert_eq!(b.server.lock().refresh_calls(), 0);
}
