use crate::{
    api::{
        validate, ApiError, ListPosts, MemberId, PageRequest, PagedPosts, PostDetail, PostDraft,
        PostEditData, PostId, PostPage, PostSummary, TEXT_PART_FILENAME,
    },
    http::{encode_segment, FormPart, Request},
    ApiClient, PostInteraction, Plants, Result,
};

const POSTS: &str = "/api/v1/communication/posts";

fn post_path(post: &PostId) -> String {
    format!("{POSTS}/{}", encode_segment(&post.0))
}

fn reaction_path(member: MemberId, kind: &str, post: &PostId) -> String {
    format!(
        "/api/v1/members/{member}/{kind}/communication/post/{}",
        encode_segment(&post.0)
    )
}

/// Text first as `text_0.txt`, then each image, then the order manifest
fn draft_parts(draft: &PostDraft) -> Result<Vec<FormPart>, ApiError> {
    let mut parts = Vec::with_capacity(draft.images.len() + 2);
    if draft.has_text() {
        parts.push(FormPart::file(
            "content",
            String::from(TEXT_PART_FILENAME),
            String::from("text/plain"),
            draft.text_content.clone().into_bytes(),
        ));
    }
    for img in &draft.images {
        parts.push(FormPart::file(
            "content",
            img.filename.clone(),
            img.mime.clone(),
            img.bytes.clone(),
        ));
    }
    parts.push(FormPart::json("orderInfo", &draft.order_info())?);
    Ok(parts)
}

impl ApiClient {
    pub async fn list_posts(&self, query: &ListPosts) -> Result<PostPage, ApiError> {
        self.fetch(Request::get(POSTS).query(query.query())).await
    }

    pub async fn post_detail(&self, post: &PostId) -> Result<PostDetail, ApiError> {
        self.fetch(Request::get(post_path(post))).await
    }

    pub async fn post_edit_data(&self, post: &PostId) -> Result<PostEditData, ApiError> {
        self.fetch(Request::get(format!("{}/data", post_path(post))))
            .await
    }

    pub async fn increment_views(&self, post: &PostId) -> Result<(), ApiError> {
        self.execute(Request::patch(format!("{}/views", post_path(post))))
            .await
    }

    /// Returns the new post's id when the backend reports it
    pub async fn create_post(&self, draft: &PostDraft) -> Result<Option<PostId>, ApiError> {
        let req = Request::post(POSTS)
            .query(draft.query())
            .multipart(draft_parts(draft)?);
        Ok(self.send::<PostId>(req).await?.data)
    }

    pub async fn update_post(&self, post: &PostId, draft: &PostDraft) -> Result<(), ApiError> {
        let req = Request::put(post_path(post))
            .query(draft.query())
            .multipart(draft_parts(draft)?);
        self.execute(req).await
    }

    pub async fn delete_post(&self, post: &PostId) -> Result<(), ApiError> {
        self.execute(Request::delete(post_path(post))).await
    }

    pub async fn my_posts(&self, page: PageRequest) -> Result<PagedPosts, ApiError> {
        self.fetch(Request::get(format!("{POSTS}/me")).query(page.query()))
            .await
    }

    pub async fn recent_posts(&self, page: PageRequest) -> Result<PagedPosts, ApiError> {
        self.fetch(Request::get(format!("{POSTS}/me/history")).query(page.query()))
            .await
    }

    pub async fn liked_posts(&self, page: PageRequest) -> Result<PagedPosts, ApiError> {
        self.fetch(Request::get(format!("{POSTS}/me/likes")).query(page.query()))
            .await
    }

    pub async fn bookmarked_posts(&self, page: PageRequest) -> Result<PagedPosts, ApiError> {
        self.fetch(Request::get(format!("{POSTS}/me/bookmarks")).query(page.query()))
            .await
    }

    pub async fn like_post(&self, member: MemberId, post: &PostId) -> Result<(), ApiError> {
        self.execute(Request::put(reaction_path(member, "like", post)))
            .await
    }

    pub async fn unlike_post(&self, member: MemberId, post: &PostId) -> Result<(), ApiError> {
        self.execute(Request::delete(reaction_path(member, "like", post)))
            .await
    }

    pub async fn bookmark_post(&self, member: MemberId, post: &PostId) -> Result<(), ApiError> {
        self.execute(Request::put(reaction_path(member, "bookmark", post)))
            .await
    }

    pub async fn unbookmark_post(&self, member: MemberId, post: &PostId) -> Result<(), ApiError> {
        self.execute(Request::delete(reaction_path(member, "bookmark", post)))
            .await
    }
}

impl Plants {
    /// Loads a post for reading and counts the view. A failed view count
    /// does not prevent reading.
    pub async fn open_post(&self, post: &PostId) -> Result<PostDetail> {
        let detail = self.api.post_detail(post).await?;
        if let Err(e) = self.api.increment_views(post).await {
            tracing::warn!(%post, error = %e, "failed counting post view");
        }
        Ok(detail)
    }

    pub async fn create_post(&self, draft: &PostDraft) -> Result<Option<PostId>> {
        self.require_user()?;
        validate::validate_post_draft(draft)?;
        let id = self.api.create_post(draft).await?;
        tracing::info!(post = ?id, images = draft.images.len(), "post created");
        self.modal.snackbar("게시글이 등록되었습니다.");
        Ok(id)
    }

    pub async fn update_post(&self, post: &PostId, draft: &PostDraft) -> Result<()> {
        self.require_user()?;
        validate::validate_post_draft(draft)?;
        self.api.update_post(post, draft).await?;
        tracing::info!(%post, "post updated");
        self.modal.snackbar("게시글이 수정되었습니다.");
        Ok(())
    }

    pub async fn delete_post(&self, post: &PostId) -> Result<()> {
        self.require_user()?;
        self.api.delete_post(post).await?;
        self.cache.invalidate(post);
        self.modal.snackbar("게시글이 삭제되었습니다.");
        Ok(())
    }

    /// Flips the like right away, then confirms with the backend. On failure
    /// the previous state comes back and the error shows as a snackbar.
    pub async fn toggle_post_like(&self, state: &mut PostInteraction) -> Result<()> {
        let user = self.require_user()?;
        let pending = state.like.begin();
        let res = match pending.was_active() {
            true => self.api.unlike_post(user.id, &state.post).await,
            false => self.api.like_post(user.id, &state.post).await,
        };
        pending.settle(&mut state.like, &res);
        self.report(res)
    }

    pub async fn toggle_post_bookmark(&self, state: &mut PostInteraction) -> Result<()> {
        let user = self.require_user()?;
        let pending = state.bookmark.begin();
        let res = match pending.was_active() {
            true => self.api.unbookmark_post(user.id, &state.post).await,
            false => self.api.bookmark_post(user.id, &state.post).await,
        };
        pending.settle(&mut state.bookmark, &res);
        self.report(res)
    }

    pub(crate) fn report(&self, res: Result<(), ApiError>) -> Result<()> {
        res.map_err(|e| {
            tracing::warn!(error = %e, "optimistic update reverted");
            self.modal.snackbar(e.user_message());
            e.into()
        })
    }

    /// Main feed, one cursor page at a time
    pub fn feed(&self, query: ListPosts) -> PostFeed {
        PostFeed::new(self.api.clone(), query)
    }
}

/// Cursor-paginated feed. Pages are appended until the backend reports no
/// further page.
#[derive(Debug)]
pub struct PostFeed {
    api: ApiClient,
    query: ListPosts,
    posts: Vec<PostSummary>,
    has_next: bool,
}

impl PostFeed {
    pub fn new(api: ApiClient, query: ListPosts) -> PostFeed {
        PostFeed {
            api,
            query: ListPosts {
                last_post_id: None,
                ..query
            },
            posts: Vec::new(),
            has_next: true,
        }
    }

    pub fn posts(&self) -> &[PostSummary] {
        &self.posts
    }

    pub fn has_next(&self) -> bool {
        self.has_next
    }

    /// Fetches the next page and returns how many posts it added. Once the
    /// end was reached this sends nothing.
    pub async fn load_more(&mut self) -> Result<usize, ApiError> {
        if !self.has_next {
            return Ok(0);
        }
        let page = self.api.list_posts(&self.query).await?;
        let added = page.posts.len();
        self.has_next = page.has_next;
        self.query.last_post_id = page
            .next_post_id
            .or_else(|| page.posts.last().map(|p| p.post_id.clone()));
        self.posts.extend(page.posts);
        tracing::debug!(added, has_next = self.has_next, "feed page loaded");
        Ok(added)
    }

    /// Starts again from the first page, eg. after a category change
    pub fn reset(&mut self, query: ListPosts) {
        *self = PostFeed::new(self.api.clone(), query);
    }
}
