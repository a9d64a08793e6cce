use crate::{
    api::{
        validate::ValidationErrors, ApiError, Comment, CommentPath, MemberId, MyCommentPage,
        NewComment, PageRequest, PostId,
    },
    http::{encode_segment, Request},
    ApiClient, CommentList, CommentTree, Plants, Result,
};

const COMMENTS: &str = "/api/v1/communication/comments";

pub const EMPTY_COMMENT: &str = "댓글 내용을 입력해주세요.";

fn comment_like_path(member: MemberId, post: &PostId, path: &CommentPath) -> String {
    format!(
        "/api/v1/members/{member}/like/communication/post/{}/path/{}",
        encode_segment(&post.0),
        encode_segment(path.as_str()),
    )
}

impl ApiClient {
    /// Flat listing; see `CommentTree` for the nested view
    pub async fn list_comments(&self, post: &PostId) -> Result<Vec<Comment>, ApiError> {
        let path = format!("{COMMENTS}/post/{}", encode_segment(&post.0));
        Ok(self.send(Request::get(path)).await?.data.unwrap_or_default())
    }

    pub async fn create_comment(&self, comment: &NewComment) -> Result<(), ApiError> {
        self.execute(Request::post(COMMENTS).json(comment)?).await
    }

    pub async fn delete_comment(&self, post: &PostId, path: &CommentPath) -> Result<(), ApiError> {
        let path = format!(
            "{COMMENTS}/post/{}/path/{}",
            encode_segment(&post.0),
            encode_segment(path.as_str())
        );
        self.execute(Request::delete(path)).await
    }

    pub async fn like_comment(
        &self,
        member: MemberId,
        post: &PostId,
        path: &CommentPath,
    ) -> Result<(), ApiError> {
        self.execute(Request::put(comment_like_path(member, post, path)))
            .await
    }

    pub async fn unlike_comment(
        &self,
        member: MemberId,
        post: &PostId,
        path: &CommentPath,
    ) -> Result<(), ApiError> {
        self.execute(Request::delete(comment_like_path(member, post, path)))
            .await
    }

    pub async fn my_comments(
        &self,
        member: MemberId,
        page: PageRequest,
    ) -> Result<MyCommentPage, ApiError> {
        let req = Request::get(format!("{COMMENTS}/me"))
            .query(page.query())
            .query(vec![("uuid", member.to_string())]);
        self.fetch(req).await
    }
}

impl Plants {
    /// Flat listing for `post`, from the cache when present
    pub async fn comment_list(&self, post: &PostId) -> Result<CommentList, ApiError> {
        if let Some(list) = self.cache.comments(post) {
            return Ok(list);
        }
        let list = self.api.list_comments(post).await?;
        Ok(self.cache.put_comments(post.clone(), list))
    }

    pub async fn comments(&self, post: &PostId) -> Result<CommentTree> {
        let list = self.comment_list(post).await?;
        Ok(CommentTree::build(&list))
    }

    /// Posts a root comment or a reply to `parent`. The path comes from the
    /// current sibling count, so two writers racing on the same parent can
    /// collide; the backend decides. The cached listing is dropped whatever
    /// the outcome, so a resubmit counts siblings afresh.
    pub async fn create_comment(
        &self,
        post: &PostId,
        parent: Option<&CommentPath>,
        content: &str,
    ) -> Result<CommentPath> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ValidationErrors::single("content", EMPTY_COMMENT).into());
        }
        self.require_user()?;
        let tree = self.comments(post).await?;
        let siblings = tree
            .sibling_count(parent)
            .ok_or_else(|| ApiError::not_found("댓글"))?;
        let path = CommentPath::generate(parent, siblings);
        let req = NewComment {
            post_id: post.clone(),
            path: path.clone(),
            content: String::from(content),
        };
        let res = self.api.create_comment(&req).await;
        self.cache.invalidate(post);
        res?;
        tracing::info!(%post, %path, "comment created");
        Ok(path)
    }

    pub async fn delete_comment(&self, post: &PostId, path: &CommentPath) -> Result<()> {
        self.require_user()?;
        let res = self.api.delete_comment(post, path).await;
        self.cache.invalidate(post);
        res?;
        self.modal.snackbar("댓글이 삭제되었습니다.");
        Ok(())
    }

    /// Optimistic like on the cached listing. The listing is put back on
    /// failure and refetched on the next read either way.
    pub async fn toggle_comment_like(&self, post: &PostId, comment: &Comment) -> Result<()> {
        let user = self.require_user()?;
        let snapshot = self
            .cache
            .apply_comment_like(post, &comment.path, comment.is_liked);
        let res = match comment.is_liked {
            true => self.api.unlike_comment(user.id, post, &comment.path).await,
            false => self.api.like_comment(user.id, post, &comment.path).await,
        };
        if let (Err(_), Some(snapshot)) = (&res, snapshot) {
            self.cache.restore(post.clone(), snapshot);
        }
        self.cache.invalidate(post);
        self.report(res)
    }

    pub async fn my_comments(&self, page: PageRequest) -> Result<MyCommentPage> {
        let user = self.require_user()?;
        Ok(self.api.my_comments(user.id, page).await?)
    }
}
