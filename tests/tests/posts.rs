use plants_client::{
    api::{
        ContentKind, ErrorCode, ImageFile, ListPosts, PageRequest, PostDraft, PostId,
        PrimaryCategory, SecondaryCategory,
    },
    ModalKind, PostInteraction,
};
use plants_mock_server::{FailPoint, SEED_PASSWORD};
use tests::Backend;

const FERN: &str = "fern@plants.kr";
const IVY: &str = "ivy@plants.kr";

/// Posts 1..=30, alternating between a daily and a question category
async fn feed_backend() -> Backend {
    Backend::start(|s| {
        let fern = s.seed_member(FERN, SEED_PASSWORD, "고사리");
        for i in 1..=30 {
            let (primary, secondary, title) = match i % 2 {
                0 => (PrimaryCategory::Daily, SecondaryCategory::Geranium, "제라늄"),
                _ => (PrimaryCategory::Qna, SecondaryCategory::WateringSoil, "질문"),
            };
            s.seed_post(fern, primary, secondary, &format!("{title} {i}"), "본문");
        }
    })
    .await
    .expect("starting mock backend")
}

async fn backend() -> Backend {
    Backend::start(|s| {
        s.seed_member(FERN, SEED_PASSWORD, "고사리");
        s.seed_member(IVY, SEED_PASSWORD, "아이비");
    })
    .await
    .expect("starting mock backend")
}

fn draft(title: &str, text: &str, images: Vec<ImageFile>) -> PostDraft {
    PostDraft {
        primary_category_id: String::from("daily"),
        secondary_category_id: String::from("succulent-cactus"),
        title: String::from(title),
        text_content: String::from(text),
        images,
    }
}

fn png() -> ImageFile {
    ImageFile::new(String::from("cactus.png"), vec![0x89, b'P', b'N', b'G'])
}

#[tokio::test]
async fn feed_pages_until_the_end() {
    let b = feed_backend().await;
    let plants = b.client().unwrap();
    let mut feed = plants.feed(ListPosts::default());

    let mut sizes = Vec::new();
    while feed.has_next() {
        sizes.push(feed.load_more().await.unwrap());
    }
    assert_eq!(sizes, [12, 12, 6]);
    assert_eq!(feed.load_more().await.unwrap(), 0);

    let ids: Vec<&str> = feed.posts().iter().map(|p| p.post_id.0.as_str()).collect();
    assert_eq!(ids.len(), 30);
    assert_eq!((ids[0], ids[29]), ("30", "1"));
    assert_eq!(ids[12], "18");
}

#[tokio::test]
async fn feed_filters_by_category() {
    let b = feed_backend().await;
    let plants = b.client().unwrap();
    let mut feed = plants.feed(ListPosts {
        primary_category_id: Some(String::from("qna")),
        ..ListPosts::default()
    });
    assert_eq!(feed.load_more().await.unwrap(), 12);
    assert_eq!(feed.load_more().await.unwrap(), 3);
    assert!(!feed.has_next());
    assert!(feed.posts().iter().all(|p| p.primary_category == "Q&A"));

    feed.reset(ListPosts {
        primary_category_id: Some(String::from("daily")),
        secondary_category_id: Some(String::from("geranium")),
        size: 20,
        ..ListPosts::default()
    });
    assert!(feed.posts().is_empty());
    assert_eq!(feed.load_more().await.unwrap(), 15);
    assert!(!feed.has_next());
    assert!(feed.posts().iter().all(|p| p.secondary_category == "제라늄"));
}

#[tokio::test]
async fn write_edit_and_delete_a_post() {
    let b = backend().await;
    let fern = b.signed_in(FERN).await.unwrap();

    let id = fern
        .create_post(&draft("선인장 꽃", "처음 핀 꽃이에요", vec![png()]))
        .await
        .unwrap()
        .expect("backend returns the new id");
    assert_eq!(fern.modal.take().unwrap().description, "게시글이 등록되었습니다.");

    let detail = fern.open_post(&id).await.unwrap();
    assert_eq!(detail.title, "선인장 꽃");
    assert_eq!(detail.author_nickname, "고사리");
    let kinds: Vec<ContentKind> = detail.content.iter().map(|c| c.kind).collect();
    assert_eq!(kinds, [ContentKind::Text, ContentKind::Image]);
    assert_eq!(detail.content[0].data, "처음 핀 꽃이에요");
    assert!(detail.content[1].data.starts_with("data:image/png;base64,"));

    let data = fern.api.post_edit_data(&id).await.unwrap();
    assert_eq!(data.secondary_category_id, "succulent-cactus");
    let mut edit = PostDraft::from_edit_data(&data);
    assert_eq!(edit.text_content, "처음 핀 꽃이에요");
    edit.title = String::from("선인장 꽃 (수정)");
    fern.update_post(&id, &edit).await.unwrap();
    let detail = fern.api.post_detail(&id).await.unwrap();
    assert_eq!(detail.title, "선인장 꽃 (수정)");
    assert_eq!(detail.content.len(), 1);

    fern.delete_post(&id).await.unwrap();
    assert_eq!(fern.modal.take().unwrap().description, "게시글이 삭제되었습니다.");
    assert_eq!(fern.api.post_detail(&id).await.unwrap_err().status, 404);
}

#[tokio::test]
async fn image_only_posts_are_fine() {
    let b = backend().await;
    let fern = b.signed_in(FERN).await.unwrap();
    let id = fern
        .create_post(&draft("사진만", "  ", vec![png()]))
        .await
        .unwrap()
        .unwrap();
    let detail = fern.api.post_detail(&id).await.unwrap();
    assert_eq!(detail.content.len(), 1);
    assert_eq!(detail.content[0].kind, ContentKind::Image);
    assert_eq!(detail.content[0].order, 1);
}

#[tokio::test]
async fn bad_drafts_and_strangers_are_refused() {
    let b = backend().await;
    let fern = b.signed_in(FERN).await.unwrap();
    let ivy = b.signed_in(IVY).await.unwrap();

    let err = fern.create_post(&draft(" ", "", Vec::new())).await.unwrap_err();
    assert!(err.api().is_none());
    let text = err.user_message();
    assert!(text.contains("제목"), "{text}");

    let gif = ImageFile::new(String::from("dance.gif"), vec![1, 2, 3]);
    assert!(fern.create_post(&draft("움짤", "", vec![gif])).await.is_err());

    let anonymous = b.client().unwrap();
    assert!(anonymous
        .create_post(&draft("익명", "글", Vec::new()))
        .await
        .unwrap_err()
        .is_unauthorized());

    let id = fern.create_post(&draft("내 글", "본문", Vec::new())).await.unwrap().unwrap();
    let err = ivy.update_post(&id, &draft("남의 글", "본문", Vec::new())).await.unwrap_err();
    assert_eq!(err.api().unwrap().code, ErrorCode::FORBIDDEN);
    assert!(ivy.delete_post(&id).await.is_err());
    assert_eq!(ivy.api.post_edit_data(&id).await.unwrap_err().status, 403);
}

#[tokio::test]
async fn opening_a_post_counts_the_view() {
    let b = feed_backend().await;
    let post = PostId::from("7");
    let anonymous = b.client().unwrap();
    anonymous.open_post(&post).await.unwrap();
    let fern = b.signed_in(FERN).await.unwrap();
    let detail = fern.open_post(&post).await.unwrap();
    // the count is bumped after reading
    assert_eq!(detail.view_count, 1);
    assert_eq!(b.server.lock().test_post_views(&post), Some(2));

    fern.open_post(&PostId::from("3")).await.unwrap();
    fern.open_post(&post).await.unwrap();
    let recent = fern.api.recent_posts(PageRequest::default()).await.unwrap();
    let ids: Vec<&str> = recent.posts.iter().map(|p| p.post_id.0.as_str()).collect();
    assert_eq!(ids, ["7", "3"]);

    let err = anonymous.open_post(&PostId::from("99")).await.unwrap_err();
    assert_eq!(err.api().unwrap().status, 404);
}

#[tokio::test]
async fn likes_and_bookmarks_toggle() {
    let b = feed_backend().await;
    let fern = b.signed_in(FERN).await.unwrap();
    let post = PostId::from("12");
    let detail = fern.api.post_detail(&post).await.unwrap();
    let mut state = PostInteraction::from_detail(post.clone(), &detail);
    assert!(!state.like.active && !state.bookmark.active);

    fern.toggle_post_like(&mut state).await.unwrap();
    fern.toggle_post_bookmark(&mut state).await.unwrap();
    assert!(state.like.active && state.bookmark.active);
    assert_eq!(state.like_count(), 1);

    let detail = fern.api.post_detail(&post).await.unwrap();
    assert!(detail.is_liked && detail.is_bookmarked);
    assert_eq!((detail.like_count, detail.bookmark_count), (1, 1));
    // others see the count only
    let anonymous = b.client().unwrap().api.post_detail(&post).await.unwrap();
    assert_eq!((anonymous.like_count, anonymous.is_liked), (1, false));

    let liked = fern.api.liked_posts(PageRequest::default()).await.unwrap();
    assert_eq!(liked.total_elements, 1);
    assert_eq!(liked.posts[0].post_id, post);
    let saved = fern.api.bookmarked_posts(PageRequest::default()).await.unwrap();
    assert_eq!(saved.posts[0].post_id, post);

    fern.toggle_post_like(&mut state).await.unwrap();
    assert_eq!((state.like.active, state.like_count()), (false, 0));
    assert_eq!(fern.api.liked_posts(PageRequest::default()).await.unwrap().total_elements, 0);
}

#[tokio::test]
async fn failed_toggles_revert() {
    let b = feed_backend().await;
    let fern = b.signed_in(FERN).await.unwrap();
    let post = PostId::from("5");
    let detail = fern.api.post_detail(&post).await.unwrap();
    let mut state = PostInteraction::from_detail(post.clone(), &detail);
    let before = state.clone();

    b.server.lock().fail_next(FailPoint::PostBookmark, 1);
    assert!(fern.toggle_post_bookmark(&mut state).await.is_err());
    assert_eq!(state, before);
    let snackbar = fern.modal.take().unwrap();
    assert_eq!(snackbar.kind, ModalKind::Snackbar);
    assert_eq!(snackbar.description, "네트워크 오류가 발생했습니다");

    b.server.lock().fail_next(FailPoint::PostLike, 1);
    assert!(fern.toggle_post_like(&mut state).await.is_err());
    assert_eq!(state, before);
    assert!(!fern.api.post_detail(&post).await.unwrap().is_liked);

    let anonymous = b.client().unwrap();
    let err = anonymous.toggle_post_like(&mut state).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(state, before);
}

#[tokio::test]
async fn my_posts_are_paged() {
    let b = feed_backend().await;
    let fern = b.signed_in(FERN).await.unwrap();
    let page = fern
        .api
        .my_posts(PageRequest { page: 4, size: 8 })
        .await
        .unwrap();
    assert_eq!((page.total_elements, page.total_pages), (30, 4));
    assert_eq!(page.posts.len(), 6);
    assert!(!page.has_next);
    assert_eq!(page.posts[0].post_id.0, "6");

    let err = b.client().unwrap().api.my_posts(PageRequest::default()).await.unwrap_err();
    assert!(err.is_unauthorized());
}
