use plants_client::{
    api::{CommentPath, ErrorCode, PageRequest, PostId, PrimaryCategory, SecondaryCategory},
    ModalKind, Plants, EMPTY_COMMENT,
};
use plants_mock_server::{FailPoint, SEED_PASSWORD};
use tests::Backend;

const FERN: &str = "fern@plants.kr";
const IVY: &str = "ivy@plants.kr";

fn path(s: &str) -> CommentPath {
    CommentPath::parse(s).unwrap()
}

async fn backend() -> (Backend, PostId) {
    let mut post = None;
    let b = Backend::start(|s| {
        let fern = s.seed_member(FERN, SEED_PASSWORD, "고사리");
        s.seed_member(IVY, SEED_PASSWORD, "아이비");
        post = Some(s.seed_post(
            fern,
            PrimaryCategory::Qna,
            SecondaryCategory::LeafGrowthPest,
            "잎이 노래져요",
            "물을 너무 많이 줬을까요?",
        ));
    })
    .await
    .expect("starting mock backend");
    (b, post.unwrap())
}

async fn paths(plants: &Plants, post: &PostId) -> Vec<String> {
    plants
        .comments(post)
        .await
        .unwrap()
        .walk()
        .into_iter()
        .map(|n| String::from(n.path().as_str()))
        .collect()
}

#[tokio::test]
async fn replies_nest_under_their_parent() {
    let (b, post) = backend().await;
    let fern = b.signed_in(FERN).await.unwrap();
    let ivy = b.signed_in(IVY).await.unwrap();

    assert_eq!(fern.create_comment(&post, None, "과습 같아요").await.unwrap(), path("0"));
    assert_eq!(ivy.create_comment(&post, None, "통풍은요?").await.unwrap(), path("1"));
    let reply = fern
        .create_comment(&post, Some(&path("0")), "  흙이 계속 젖어 있어요  ")
        .await
        .unwrap();
    assert_eq!(reply, path("0.0"));
    assert_eq!(
        ivy.create_comment(&post, Some(&path("0.0")), "화분 바꿔보세요").await.unwrap(),
        path("0.0.0")
    );

    let tree = ivy.comments(&post).await.unwrap();
    assert_eq!(tree.total_count, 4);
    assert_eq!(tree.root_count(), 2);
    let node = tree.find(&path("0.0")).unwrap();
    assert_eq!(node.depth, 1);
    assert_eq!(node.comment.content, "흙이 계속 젖어 있어요");
    assert_eq!(node.comment.nickname, "고사리");
    assert_eq!(paths(&ivy, &post).await, ["0", "0.0", "0.0.0", "1"]);
}

#[tokio::test]
async fn deleted_comments_keep_their_replies_and_index() {
    let (b, post) = backend().await;
    let fern = b.signed_in(FERN).await.unwrap();
    fern.create_comment(&post, None, "첫 댓글").await.unwrap();
    fern.create_comment(&post, Some(&path("0")), "답글").await.unwrap();

    fern.delete_comment(&post, &path("0")).await.unwrap();
    assert_eq!(fern.modal.take().unwrap().description, "댓글이 삭제되었습니다.");

    let tree = fern.comments(&post).await.unwrap();
    let root = tree.find(&path("0")).unwrap();
    assert!(root.comment.is_deleted);
    assert_eq!(root.comment.content, "");
    assert_eq!(root.children.len(), 1);

    // the tombstone still counts as a sibling
    assert_eq!(fern.create_comment(&post, None, "다시").await.unwrap(), path("1"));
    // and can no longer be deleted
    assert_eq!(
        fern.delete_comment(&post, &path("0")).await.unwrap_err().api().unwrap().status,
        404
    );
}

#[tokio::test]
async fn only_the_author_deletes() {
    let (b, post) = backend().await;
    let fern = b.signed_in(FERN).await.unwrap();
    let ivy = b.signed_in(IVY).await.unwrap();
    fern.create_comment(&post, None, "제 댓글").await.unwrap();

    let err = ivy.delete_comment(&post, &path("0")).await.unwrap_err();
    assert_eq!(err.api().unwrap().code, ErrorCode::FORBIDDEN);
    assert!(!ivy.comments(&post).await.unwrap().roots[0].comment.is_deleted);
}

#[tokio::test]
async fn bad_comments_are_refused() {
    let (b, post) = backend().await;
    let fern = b.signed_in(FERN).await.unwrap();

    let err = fern.create_comment(&post, None, " \t ").await.unwrap_err();
    assert_eq!(err.user_message(), EMPTY_COMMENT);

    let err = fern
        .create_comment(&post, Some(&path("3")), "없는 댓글에 답글")
        .await
        .unwrap_err();
    assert_eq!(err.api().unwrap().code, ErrorCode::NOT_FOUND);

    let err = fern
        .create_comment(&PostId::from("999"), None, "없는 글")
        .await
        .unwrap_err();
    assert_eq!(err.api().unwrap().status, 404);

    let anonymous = b.client().unwrap();
    assert!(anonymous
        .create_comment(&post, None, "익명")
        .await
        .unwrap_err()
        .is_unauthorized());
}

#[tokio::test]
async fn stale_listing_collides_on_the_path() {
    let (b, post) = backend().await;
    let fern = b.signed_in(FERN).await.unwrap();
    let ivy = b.signed_in(IVY).await.unwrap();

    // ivy caches the empty listing, then fern writes
    assert!(ivy.comments(&post).await.unwrap().roots.is_empty());
    fern.create_comment(&post, None, "먼저").await.unwrap();

    let err = ivy.create_comment(&post, None, "나중").await.unwrap_err();
    assert_eq!(err.api().unwrap().code, ErrorCode::COMMENT_PATH_CONFLICT);
    // a plain resubmit sees fern's comment and moves past it
    assert_eq!(ivy.create_comment(&post, None, "나중").await.unwrap(), path("1"));
    assert_eq!(paths(&ivy, &post).await, ["0", "1"]);
}

#[tokio::test]
async fn comment_likes_are_optimistic() {
    let (b, post) = backend().await;
    let fern = b.signed_in(FERN).await.unwrap();
    let ivy = b.signed_in(IVY).await.unwrap();
    fern.create_comment(&post, None, "좋아요 눌러주세요").await.unwrap();

    let comment = ivy.comment_list(&post).await.unwrap()[0].clone();
    assert!(!comment.is_liked);
    ivy.toggle_comment_like(&post, &comment).await.unwrap();
    let liked = ivy.comment_list(&post).await.unwrap()[0].clone();
    assert!(liked.is_liked);
    assert_eq!(liked.like_count, 1);

    // fern sees the count but not ivy's like
    let seen = fern.comment_list(&post).await.unwrap()[0].clone();
    assert_eq!((seen.like_count, seen.is_liked), (1, false));

    b.server.lock().fail_next(FailPoint::CommentLike, 1);
    let err = ivy.toggle_comment_like(&post, &liked).await.unwrap_err();
    assert_eq!(err.api().unwrap().status, 500);
    let snackbar = ivy.modal.take().unwrap();
    assert_eq!(snackbar.kind, ModalKind::Snackbar);
    assert_eq!(snackbar.description, "네트워크 오류가 발생했습니다");
    let after = ivy.comment_list(&post).await.unwrap()[0].clone();
    assert_eq!((after.like_count, after.is_liked), (1, true));

    ivy.toggle_comment_like(&post, &after).await.unwrap();
    let unliked = ivy.comment_list(&post).await.unwrap()[0].clone();
    assert_eq!((unliked.like_count, unliked.is_liked), (0, false));
}

#[tokio::test]
async fn my_comments_skip_deleted_ones() {
    let (b, post) = backend().await;
    let fern = b.signed_in(FERN).await.unwrap();
    let ivy = b.signed_in(IVY).await.unwrap();
    fern.create_comment(&post, None, "남길 댓글").await.unwrap();
    fern.create_comment(&post, None, "지울 댓글").await.unwrap();
    ivy.create_comment(&post, None, "남의 댓글").await.unwrap();
    fern.delete_comment(&post, &path("1")).await.unwrap();

    let page = fern.my_comments(PageRequest::default()).await.unwrap();
    assert_eq!(page.total_elements, 1);
    assert!(!page.has_next);
    let mine = &page.comments[0];
    assert_eq!(mine.content, "남길 댓글");
    assert_eq!(mine.post_title, "잎이 노래져요");
    assert_eq!(mine.post_id, post);

    assert!(b.client().unwrap().my_comments(PageRequest::default()).await.is_err());
}
