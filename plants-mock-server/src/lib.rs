use std::{
    collections::{BTreeMap, HashMap, HashSet},
    net::SocketAddr,
    sync::Arc,
};

use anyhow::Context;
use base64::Engine;
use chrono::SecondsFormat;
use parking_lot::Mutex;
use plants_client::api::{
    ApiError, AuthInfo, AuthProvider, ChangeEmailRequest, Comment, CommentPath, ContentKind,
    ContentPart, ErrorCode, ImageChange, JwtClaims, LoginRequest, MemberId, MyComment,
    MyCommentPage, NewComment, OrderInfo, PageRequest, PagedPosts, PostDetail, PostEditData,
    PostId, PostPage, PostSummary, PrimaryCategory, Profile, SecondaryCategory, SignupRequest,
    Time, Uuid, ACCESS_TOKEN_MAX_AGE_SECS, DEFAULT_FEED_PAGE_SIZE, TEXT_PART_FILENAME,
};

mod error;
pub use error::Error;

mod extractors;

mod handlers;
pub use handlers::router;

mod seed;
pub use seed::{Seed, SeedComment, SeedMember, SeedPost, SEED_PASSWORD};

/// Tests have no use for slow hashes
pub const BCRYPT_COST: u32 = 4;

pub type SharedServer = Arc<Mutex<MockServer>>;

/// Endpoints whose next calls can be made to fail with a 500
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FailPoint {
    Refresh,
    Profile,
    PostLike,
    PostBookmark,
    CommentLike,
    CommentCreate,
}

#[derive(Debug)]
struct DbMember {
    email: String,
    nickname: String,
    pass_hash: String,
    introduction: Option<String>,
    image_url: Option<String>,
    created_at: Time,
}

#[derive(Debug)]
struct DbPost {
    author: MemberId,
    primary: PrimaryCategory,
    secondary: SecondaryCategory,
    title: String,
    content: Vec<ContentPart>,
    views: i64,
    created_at: Time,
    updated_at: Time,
}

#[derive(Debug)]
struct DbComment {
    path: CommentPath,
    author: MemberId,
    content: String,
    created_at: Time,
    deleted: bool,
}

/// A file or text field of an uploaded post
#[derive(Clone, Debug)]
pub struct Upload {
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Query-string half of a post upload
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftMeta {
    pub primary_category_id: String,
    pub secondary_category_id: String,
    pub title: String,
    #[serde(default)]
    pub is_published: Option<bool>,
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    pub size: Option<u32>,
    pub last_post_id: Option<String>,
    pub primary_category_id: Option<String>,
    pub secondary_category_id: Option<String>,
}

/// Profile update as read from its multipart form
#[derive(Clone, Debug, Default)]
pub struct ProfileForm {
    pub nickname: Option<String>,
    pub introduction: Option<String>,
    pub image: ImageChange,
}

fn stamp(t: Time) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn random_token() -> String {
    Uuid::new_v4().simple().to_string()
}

fn post_key(post: &PostId) -> Result<u64, ApiError> {
    post.0.parse().map_err(|_| ApiError::not_found("게시글"))
}

fn data_url(mime: &str, bytes: &[u8]) -> String {
    let b64 = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime};base64,{b64}")
}

fn paged<T>(items: Vec<T>, page: PageRequest) -> (Vec<T>, u64, u32, bool) {
    let total = items.len() as u64;
    let size = page.size.max(1);
    let total_pages = total.div_ceil(u64::from(size)) as u32;
    let start = (page.page.max(1) - 1) as usize * size as usize;
    let items: Vec<T> = items.into_iter().skip(start).take(size as usize).collect();
    (items, total, total_pages, page.page < total_pages)
}

#[derive(Debug, Default)]
pub struct MockServer {
    members: BTreeMap<MemberId, DbMember>,
    access_tokens: HashMap<String, MemberId>,
    refresh_tokens: HashMap<String, MemberId>,
    verification_codes: HashMap<String, String>,
    verified_emails: HashSet<String>,
    reset_tokens: HashMap<String, MemberId>,
    reset_sessions: HashMap<String, MemberId>,
    posts: BTreeMap<u64, DbPost>,
    next_post: u64,
    comments: HashMap<u64, Vec<DbComment>>,
    post_likes: HashSet<(MemberId, u64)>,
    bookmarks: HashSet<(MemberId, u64)>,
    comment_likes: HashSet<(MemberId, u64, CommentPath)>,
    /// Most recent view last, one entry per member and post
    history: Vec<(MemberId, u64)>,
    refresh_calls: usize,
    failures: HashMap<FailPoint, usize>,
    revoked_on_issue: usize,
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer::default()
    }

    /// Creates a verified member directly
    pub fn seed_member(&mut self, email: &str, password: &str, nickname: &str) -> MemberId {
        let id = MemberId(Uuid::new_v4());
        self.members.insert(
            id,
            DbMember {
                email: String::from(email),
                nickname: String::from(nickname),
                pass_hash: bcrypt::hash(password, BCRYPT_COST).expect("hashing seeded password"),
                introduction: None,
                image_url: None,
                created_at: chrono::Utc::now(),
            },
        );
        self.verified_emails.insert(String::from(email));
        id
    }

    pub fn seed_post(
        &mut self,
        author: MemberId,
        primary: PrimaryCategory,
        secondary: SecondaryCategory,
        title: &str,
        text: &str,
    ) -> PostId {
        let content = vec![ContentPart {
            kind: ContentKind::Text,
            order: 1,
            filename: String::from(TEXT_PART_FILENAME),
            data: String::from(text),
        }];
        self.insert_post(author, primary, secondary, String::from(title), content)
    }

    /// Inserts a comment as-is, without checking that its parent exists
    pub fn seed_comment(&mut self, post: &PostId, author: MemberId, path: &str, content: &str) {
        let (Ok(key), Ok(path)) = (post_key(post), CommentPath::parse(path)) else {
            panic!("seeding comment {path:?} on post {post}");
        };
        self.comments.entry(key).or_default().push(DbComment {
            path,
            author,
            content: String::from(content),
            created_at: chrono::Utc::now(),
            deleted: false,
        });
    }

    /// Makes every access token handed out so far invalid
    pub fn expire_access_tokens(&mut self) {
        self.access_tokens.clear();
    }

    /// The next `times` access tokens are handed out already revoked
    pub fn revoke_issued_tokens(&mut self, times: usize) {
        self.revoked_on_issue = times;
    }

    /// Refresh requests received so far, failed ones included
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls
    }

    pub fn fail_next(&mut self, point: FailPoint, times: usize) {
        self.failures.insert(point, times);
    }

    pub fn verification_code(&self, email: &str) -> Option<String> {
        self.verification_codes.get(email).cloned()
    }

    pub fn reset_token(&self, email: &str) -> Option<String> {
        let id = self.member_by_email(email)?;
        self.reset_tokens
            .iter()
            .find(|(_, m)| **m == id)
            .map(|(t, _)| t.clone())
    }

    pub fn test_num_members(&self) -> usize {
        self.members.len()
    }

    pub fn test_post_views(&self, post: &PostId) -> Option<i64> {
        self.posts.get(&post_key(post).ok()?).map(|p| p.views)
    }

    fn check_failure(&mut self, point: FailPoint) -> Result<(), ApiError> {
        match self.failures.get_mut(&point) {
            Some(n) if *n > 0 => {
                *n -= 1;
                Err(ApiError::new(500, ErrorCode::INTERNAL, format!("injected failure at {point:?}")))
            }
            _ => Ok(()),
        }
    }

    fn member_by_email(&self, email: &str) -> Option<MemberId> {
        self.members
            .iter()
            .find(|(_, m)| m.email == email)
            .map(|(id, _)| *id)
    }

    fn member(&self, id: MemberId) -> Result<&DbMember, ApiError> {
        self.members.get(&id).ok_or_else(|| ApiError::not_found("회원"))
    }

    fn nickname(&self, id: MemberId) -> String {
        self.members
            .get(&id)
            .map(|m| m.nickname.clone())
            .unwrap_or_default()
    }

    pub fn resolve(&self, access_token: &str) -> Result<MemberId, ApiError> {
        self.access_tokens
            .get(access_token)
            .copied()
            .ok_or_else(|| ApiError::new(401, "expired_token", "토큰이 만료되었습니다"))
    }

    fn require_self(member: MemberId, target: MemberId) -> Result<(), ApiError> {
        match member == target {
            true => Ok(()),
            false => Err(ApiError::forbidden()),
        }
    }

    /// Access token plus a fresh refresh token
    fn issue_tokens(&mut self, id: MemberId) -> Result<(String, String), ApiError> {
        let m = self.member(id)?;
        let claims = JwtClaims {
            sub: id,
            nickname: m.nickname.clone(),
            email: m.email.clone(),
            role: String::from("ROLE_USER"),
            exp: chrono::Utc::now().timestamp() + ACCESS_TOKEN_MAX_AGE_SECS,
        };
        // two tokens minted in the same second must still differ
        let access = format!("{}{}", claims.encode_unsigned(), random_token());
        let refresh = random_token();
        match self.revoked_on_issue {
            0 => {
                self.access_tokens.insert(access.clone(), id);
            }
            n => self.revoked_on_issue = n - 1,
        }
        self.refresh_tokens.insert(refresh.clone(), id);
        Ok((access, refresh))
    }

    pub fn login(&mut self, req: &LoginRequest) -> Result<(String, String), ApiError> {
        let id = self.member_by_email(&req.email).ok_or_else(|| {
            ApiError::new(404, ErrorCode::MEMBER_NOT_FOUND_WITH_EMAIL, "등록된 이메일이 아닙니다.")
        })?;
        let hash = &self.member(id)?.pass_hash;
        if !bcrypt::verify(&req.password, hash).unwrap_or(false) {
            return Err(ApiError::new(
                401,
                ErrorCode::INVALID_CREDENTIALS,
                "이메일 또는 비밀번호가 일치하지 않습니다.",
            ));
        }
        tracing::info!(member = %id, "member logged in");
        self.issue_tokens(id)
    }

    /// Rotates the refresh token
    pub fn refresh(&mut self, refresh_token: Option<&str>) -> Result<(String, String), ApiError> {
        self.refresh_calls += 1;
        self.check_failure(FailPoint::Refresh)?;
        let id = refresh_token
            .and_then(|t| self.refresh_tokens.remove(t))
            .ok_or_else(|| ApiError::new(401, "invalid_refresh_token", "다시 로그인해주세요"))?;
        self.issue_tokens(id)
    }

    pub fn register(&mut self, req: &SignupRequest) -> Result<MemberId, ApiError> {
        if !self.verified_emails.contains(&req.email) {
            return Err(ApiError::new(400, ErrorCode::EMAIL_NOT_VERIFIED, "이메일 인증이 필요합니다."));
        }
        if self.member_by_email(&req.email).is_some() {
            return Err(ApiError::new(409, ErrorCode::DUPLICATE_EMAIL, "이미 가입된 이메일입니다."));
        }
        if self.nickname_exists(&req.nickname) {
            return Err(ApiError::new(409, ErrorCode::DUPLICATE_NICKNAME, "이미 사용중인 닉네임입니다."));
        }
        let pass_hash = bcrypt::hash(&req.password, BCRYPT_COST)
            .map_err(|e| ApiError::new(500, ErrorCode::INTERNAL, e.to_string()))?;
        let id = MemberId(Uuid::new_v4());
        self.members.insert(
            id,
            DbMember {
                email: req.email.clone(),
                nickname: req.nickname.clone(),
                pass_hash,
                introduction: None,
                image_url: None,
                created_at: chrono::Utc::now(),
            },
        );
        tracing::info!(member = %id, "member registered");
        Ok(id)
    }

    pub fn send_verification(&mut self, email: &str) -> String {
        let code = format!("{:06}", Uuid::new_v4().as_u128() % 1_000_000);
        self.verification_codes.insert(String::from(email), code.clone());
        code
    }

    pub fn verify_email(&mut self, email: &str, code: &str) -> bool {
        let ok = self.verification_codes.get(email).map(String::as_str) == Some(code);
        if ok {
            self.verification_codes.remove(email);
            self.verified_emails.insert(String::from(email));
        }
        ok
    }

    pub fn nickname_exists(&self, nickname: &str) -> bool {
        self.members.values().any(|m| m.nickname == nickname)
    }

    pub fn request_password_reset(&mut self, email: &str) -> Result<(), ApiError> {
        let id = self.member_by_email(email).ok_or_else(|| {
            ApiError::new(404, ErrorCode::MEMBER_NOT_FOUND_WITH_EMAIL, "등록된 이메일이 아닙니다.")
        })?;
        self.reset_tokens.retain(|_, m| *m != id);
        self.reset_tokens.insert(random_token(), id);
        Ok(())
    }

    /// Trades the emailed token for a reset session, returned as a cookie
    pub fn verify_reset(&mut self, token: &str) -> Result<String, ApiError> {
        let id = self
            .reset_tokens
            .remove(token)
            .ok_or_else(|| ApiError::new(400, "invalid_reset_token", "유효하지 않은 링크입니다."))?;
        let session = random_token();
        self.reset_sessions.insert(session.clone(), id);
        Ok(session)
    }

    pub fn reset_password(&mut self, session: Option<&str>, password: &str) -> Result<(), ApiError> {
        let id = session
            .and_then(|s| self.reset_sessions.remove(s))
            .ok_or_else(ApiError::unauthorized)?;
        let hash = bcrypt::hash(password, BCRYPT_COST)
            .map_err(|e| ApiError::new(500, ErrorCode::INTERNAL, e.to_string()))?;
        if let Some(m) = self.members.get_mut(&id) {
            m.pass_hash = hash;
        }
        self.refresh_tokens.retain(|_, m| *m != id);
        tracing::info!(member = %id, "password reset");
        Ok(())
    }

    fn summary(&self, viewer: Option<MemberId>, id: u64, p: &DbPost) -> PostSummary {
        let first_text = p.content.iter().find(|c| c.kind == ContentKind::Text);
        let first_image = p.content.iter().find(|c| c.kind == ContentKind::Image);
        PostSummary {
            post_id: PostId(id.to_string()),
            primary_category: String::from(p.primary.label()),
            secondary_category: String::from(p.secondary.label()),
            nickname: self.nickname(p.author),
            title: p.title.clone(),
            content: first_text.into_iter().chain(first_image).cloned().collect(),
            like_count: self.like_count(id),
            published_at: stamp(p.created_at),
            comment_count: self.comment_count(id),
            is_liked: viewer.is_some_and(|v| self.post_likes.contains(&(v, id))),
            is_bookmarked: viewer.is_some_and(|v| self.bookmarks.contains(&(v, id))),
        }
    }

    fn like_count(&self, id: u64) -> i64 {
        self.post_likes.iter().filter(|(_, p)| *p == id).count() as i64
    }

    fn comment_count(&self, id: u64) -> i64 {
        self.comments
            .get(&id)
            .map(|cs| cs.iter().filter(|c| !c.deleted).count() as i64)
            .unwrap_or(0)
    }

    fn post(&self, post: &PostId) -> Result<(u64, &DbPost), ApiError> {
        let key = post_key(post)?;
        let p = self
            .posts
            .get(&key)
            .ok_or_else(|| ApiError::not_found("게시글"))?;
        Ok((key, p))
    }

    /// Newest first; the cursor is the last post id already shown
    pub fn list_posts(&self, viewer: Option<MemberId>, q: &FeedQuery) -> Result<PostPage, ApiError> {
        let size = q.size.unwrap_or(DEFAULT_FEED_PAGE_SIZE).max(1);
        let before = match q.last_post_id.as_deref().filter(|s| !s.is_empty()) {
            None => u64::MAX,
            Some(id) => id.parse().map_err(|_| ApiError::invalid_input("잘못된 커서입니다"))?,
        };
        let primary = q
            .primary_category_id
            .as_deref()
            .and_then(PrimaryCategory::from_slug)
            .filter(|c| *c != PrimaryCategory::All);
        let secondary = q
            .secondary_category_id
            .as_deref()
            .and_then(SecondaryCategory::from_slug)
            .filter(|c| *c != SecondaryCategory::All);
        let mut matching = self
            .posts
            .range(..before)
            .rev()
            .filter(|(_, p)| primary.map_or(true, |c| p.primary == c))
            .filter(|(_, p)| secondary.map_or(true, |c| p.secondary == c));
        let posts: Vec<PostSummary> = matching
            .by_ref()
            .take(size as usize)
            .map(|(id, p)| self.summary(viewer, *id, p))
            .collect();
        let has_next = matching.next().is_some();
        Ok(PostPage {
            next_post_id: match has_next {
                true => posts.last().map(|p| p.post_id.clone()),
                false => None,
            },
            has_next,
            size,
            posts,
        })
    }

    pub fn post_detail(
        &self,
        viewer: Option<MemberId>,
        post: &PostId,
    ) -> Result<PostDetail, ApiError> {
        let (key, p) = self.post(post)?;
        Ok(PostDetail {
            author_uuid: p.author.to_string(),
            author_nickname: self.nickname(p.author),
            title: p.title.clone(),
            content: p.content.clone(),
            primary_category: String::from(p.primary.label()),
            secondary_category: String::from(p.secondary.label()),
            view_count: p.views,
            like_count: self.like_count(key),
            bookmark_count: self.bookmarks.iter().filter(|(_, b)| *b == key).count() as i64,
            comment_count: self.comment_count(key),
            created_at: stamp(p.created_at),
            updated_at: stamp(p.updated_at),
            is_liked: viewer.is_some_and(|v| self.post_likes.contains(&(v, key))),
            is_bookmarked: viewer.is_some_and(|v| self.bookmarks.contains(&(v, key))),
        })
    }

    pub fn edit_data(&self, member: MemberId, post: &PostId) -> Result<PostEditData, ApiError> {
        let (_, p) = self.post(post)?;
        MockServer::require_self(member, p.author)?;
        Ok(PostEditData {
            primary_category_id: String::from(p.primary.slug()),
            secondary_category_id: String::from(p.secondary.slug()),
            title: p.title.clone(),
            content: p.content.clone(),
        })
    }

    pub fn add_view(&mut self, viewer: Option<MemberId>, post: &PostId) -> Result<(), ApiError> {
        let key = post_key(post)?;
        let p = self
            .posts
            .get_mut(&key)
            .ok_or_else(|| ApiError::not_found("게시글"))?;
        p.views += 1;
        if let Some(v) = viewer {
            self.history.retain(|h| *h != (v, key));
            self.history.push((v, key));
        }
        Ok(())
    }

    fn insert_post(
        &mut self,
        author: MemberId,
        primary: PrimaryCategory,
        secondary: SecondaryCategory,
        title: String,
        content: Vec<ContentPart>,
    ) -> PostId {
        self.next_post += 1;
        let now = chrono::Utc::now();
        self.posts.insert(
            self.next_post,
            DbPost {
                author,
                primary,
                secondary,
                title,
                content,
                views: 0,
                created_at: now,
                updated_at: now,
            },
        );
        PostId(self.next_post.to_string())
    }

    fn read_draft(
        meta: &DraftMeta,
        uploads: Vec<Upload>,
        order: &[OrderInfo],
    ) -> Result<(PrimaryCategory, SecondaryCategory, Vec<ContentPart>), ApiError> {
        let primary = PrimaryCategory::from_slug(&meta.primary_category_id)
            .filter(|c| *c != PrimaryCategory::All)
            .ok_or_else(|| ApiError::invalid_input("카테고리를 선택해주세요"))?;
        let secondary = SecondaryCategory::from_slug(&meta.secondary_category_id)
            .filter(|c| c.belongs_to(primary))
            .ok_or_else(|| ApiError::invalid_input("카테고리를 선택해주세요"))?;
        if meta.title.trim().is_empty() {
            return Err(ApiError::invalid_input("제목을 입력해주세요"));
        }
        if uploads.is_empty() {
            return Err(ApiError::invalid_input("내용을 입력하거나 이미지를 등록해주세요"));
        }
        let mut content = Vec::with_capacity(uploads.len());
        for u in uploads {
            let order = order
                .iter()
                .find(|o| o.filename == u.filename)
                .map(|o| o.order)
                .ok_or_else(|| ApiError::invalid_input(format!("{} has no order", u.filename)))?;
            let (kind, data) = match u.filename == TEXT_PART_FILENAME {
                true => (
                    ContentKind::Text,
                    String::from_utf8(u.bytes)
                        .map_err(|_| ApiError::invalid_input("text part is not utf-8"))?,
                ),
                false => (ContentKind::Image, data_url(&u.mime, &u.bytes)),
            };
            content.push(ContentPart {
                kind,
                order,
                filename: u.filename,
                data,
            });
        }
        content.sort_by_key(|c| c.order);
        Ok((primary, secondary, content))
    }

    pub fn create_post(
        &mut self,
        author: MemberId,
        meta: &DraftMeta,
        uploads: Vec<Upload>,
        order: &[OrderInfo],
    ) -> Result<PostId, ApiError> {
        let (primary, secondary, content) = MockServer::read_draft(meta, uploads, order)?;
        let id = self.insert_post(author, primary, secondary, meta.title.clone(), content);
        tracing::info!(post = %id, member = %author, "post created");
        Ok(id)
    }

    pub fn update_post(
        &mut self,
        member: MemberId,
        post: &PostId,
        meta: &DraftMeta,
        uploads: Vec<Upload>,
        order: &[OrderInfo],
    ) -> Result<(), ApiError> {
        let key = post_key(post)?;
        let (primary, secondary, content) = MockServer::read_draft(meta, uploads, order)?;
        let p = self
            .posts
            .get_mut(&key)
            .ok_or_else(|| ApiError::not_found("게시글"))?;
        MockServer::require_self(member, p.author)?;
        p.primary = primary;
        p.secondary = secondary;
        p.title = meta.title.clone();
        p.content = content;
        p.updated_at = chrono::Utc::now();
        Ok(())
    }

    pub fn delete_post(&mut self, member: MemberId, post: &PostId) -> Result<(), ApiError> {
        let (key, p) = self.post(post)?;
        MockServer::require_self(member, p.author)?;
        self.posts.remove(&key);
        self.comments.remove(&key);
        self.post_likes.retain(|(_, p)| *p != key);
        self.bookmarks.retain(|(_, p)| *p != key);
        self.comment_likes.retain(|(_, p, _)| *p != key);
        self.history.retain(|(_, p)| *p != key);
        Ok(())
    }

    fn paged_posts(&self, member: MemberId, ids: Vec<u64>, page: PageRequest) -> PagedPosts {
        let (ids, total_elements, total_pages, has_next) = paged(ids, page);
        PagedPosts {
            posts: ids
                .into_iter()
                .filter_map(|id| Some(self.summary(Some(member), id, self.posts.get(&id)?)))
                .collect(),
            page: page.page,
            size: page.size,
            total_elements,
            total_pages,
            has_next,
        }
    }

    pub fn my_posts(&self, member: MemberId, page: PageRequest) -> PagedPosts {
        let ids = self
            .posts
            .iter()
            .rev()
            .filter(|(_, p)| p.author == member)
            .map(|(id, _)| *id)
            .collect();
        self.paged_posts(member, ids, page)
    }

    pub fn recent_posts(&self, member: MemberId, page: PageRequest) -> PagedPosts {
        let ids = self
            .history
            .iter()
            .rev()
            .filter(|(m, _)| *m == member)
            .map(|(_, p)| *p)
            .collect();
        self.paged_posts(member, ids, page)
    }

    pub fn liked_posts(&self, member: MemberId, page: PageRequest) -> PagedPosts {
        let mut ids: Vec<u64> = self
            .post_likes
            .iter()
            .filter(|(m, _)| *m == member)
            .map(|(_, p)| *p)
            .collect();
        ids.sort_unstable_by(|a, b| b.cmp(a));
        self.paged_posts(member, ids, page)
    }

    pub fn bookmarked_posts(&self, member: MemberId, page: PageRequest) -> PagedPosts {
        let mut ids: Vec<u64> = self
            .bookmarks
            .iter()
            .filter(|(m, _)| *m == member)
            .map(|(_, p)| *p)
            .collect();
        ids.sort_unstable_by(|a, b| b.cmp(a));
        self.paged_posts(member, ids, page)
    }

    pub fn set_post_like(
        &mut self,
        member: MemberId,
        target: MemberId,
        post: &PostId,
        on: bool,
    ) -> Result<(), ApiError> {
        MockServer::require_self(member, target)?;
        let (key, _) = self.post(post)?;
        self.check_failure(FailPoint::PostLike)?;
        match on {
            true => self.post_likes.insert((member, key)),
            false => self.post_likes.remove(&(member, key)),
        };
        Ok(())
    }

    pub fn set_bookmark(
        &mut self,
        member: MemberId,
        target: MemberId,
        post: &PostId,
        on: bool,
    ) -> Result<(), ApiError> {
        MockServer::require_self(member, target)?;
        let (key, _) = self.post(post)?;
        self.check_failure(FailPoint::PostBookmark)?;
        match on {
            true => self.bookmarks.insert((member, key)),
            false => self.bookmarks.remove(&(member, key)),
        };
        Ok(())
    }

    fn comment_like_count(&self, post: u64, path: &CommentPath) -> i64 {
        self.comment_likes
            .iter()
            .filter(|(_, p, l)| *p == post && l == path)
            .count() as i64
    }

    pub fn list_comments(
        &self,
        viewer: Option<MemberId>,
        post: &PostId,
    ) -> Result<Vec<Comment>, ApiError> {
        let (key, _) = self.post(post)?;
        let Some(comments) = self.comments.get(&key) else {
            return Ok(Vec::new());
        };
        Ok(comments
            .iter()
            .map(|c| Comment {
                path: c.path.clone(),
                nickname: self.nickname(c.author),
                content: match c.deleted {
                    true => String::new(),
                    false => c.content.clone(),
                },
                like_count: self.comment_like_count(key, &c.path),
                created_at: stamp(c.created_at),
                is_deleted: c.deleted,
                is_liked: viewer
                    .is_some_and(|v| self.comment_likes.contains(&(v, key, c.path.clone()))),
            })
            .collect())
    }

    pub fn create_comment(&mut self, author: MemberId, req: &NewComment) -> Result<(), ApiError> {
        let (key, _) = self.post(&req.post_id)?;
        self.check_failure(FailPoint::CommentCreate)?;
        if req.content.trim().is_empty() {
            return Err(ApiError::invalid_input("댓글 내용을 입력해주세요."));
        }
        let comments = self.comments.entry(key).or_default();
        if comments.iter().any(|c| c.path == req.path) {
            return Err(ApiError::new(409, ErrorCode::COMMENT_PATH_CONFLICT, "이미 존재하는 댓글 경로입니다."));
        }
        if let Some(parent) = req.path.parent() {
            if !comments.iter().any(|c| c.path == parent) {
                return Err(ApiError::not_found("상위 댓글"));
            }
        }
        comments.push(DbComment {
            path: req.path.clone(),
            author,
            content: req.content.clone(),
            created_at: chrono::Utc::now(),
            deleted: false,
        });
        tracing::info!(post = %req.post_id, path = %req.path, "comment created");
        Ok(())
    }

    /// Deleted comments stay as tombstones so paths are never reused
    pub fn delete_comment(
        &mut self,
        member: MemberId,
        post: &PostId,
        path: &CommentPath,
    ) -> Result<(), ApiError> {
        let key = post_key(post)?;
        let c = self
            .comments
            .get_mut(&key)
            .and_then(|cs| cs.iter_mut().find(|c| c.path == *path && !c.deleted))
            .ok_or_else(|| ApiError::not_found("댓글"))?;
        MockServer::require_self(member, c.author)?;
        c.deleted = true;
        Ok(())
    }

    pub fn set_comment_like(
        &mut self,
        member: MemberId,
        target: MemberId,
        post: &PostId,
        path: &CommentPath,
        on: bool,
    ) -> Result<(), ApiError> {
        MockServer::require_self(member, target)?;
        let key = post_key(post)?;
        let exists = self
            .comments
            .get(&key)
            .is_some_and(|cs| cs.iter().any(|c| c.path == *path && !c.deleted));
        if !exists {
            return Err(ApiError::not_found("댓글"));
        }
        self.check_failure(FailPoint::CommentLike)?;
        match on {
            true => self.comment_likes.insert((member, key, path.clone())),
            false => self.comment_likes.remove(&(member, key, path.clone())),
        };
        Ok(())
    }

    pub fn my_comments(
        &self,
        member: MemberId,
        target: MemberId,
        page: PageRequest,
    ) -> Result<MyCommentPage, ApiError> {
        MockServer::require_self(member, target)?;
        let mut mine = Vec::new();
        for (key, cs) in self.comments.iter() {
            let Some(p) = self.posts.get(key) else { continue };
            for c in cs.iter().filter(|c| c.author == member && !c.deleted) {
                mine.push(MyComment {
                    post_id: PostId(key.to_string()),
                    post_title: p.title.clone(),
                    path: c.path.clone(),
                    content: c.content.clone(),
                    like_count: self.comment_like_count(*key, &c.path),
                    created_at: stamp(c.created_at),
                });
            }
        }
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let (comments, total_elements, total_pages, has_next) = paged(mine, page);
        Ok(MyCommentPage {
            comments,
            page: page.page,
            size: page.size,
            total_elements,
            total_pages,
            has_next,
        })
    }

    pub fn profile(&mut self, target: MemberId) -> Result<Profile, ApiError> {
        self.check_failure(FailPoint::Profile)?;
        let m = self.member(target)?;
        Ok(Profile {
            id: target,
            image_url: m.image_url.clone(),
            introduction: m.introduction.clone(),
            nickname: m.nickname.clone(),
        })
    }

    pub fn update_profile(
        &mut self,
        member: MemberId,
        target: MemberId,
        form: ProfileForm,
    ) -> Result<Profile, ApiError> {
        MockServer::require_self(member, target)?;
        if let Some(n) = &form.nickname {
            let taken = self
                .members
                .iter()
                .any(|(id, m)| *id != member && m.nickname == *n);
            if taken {
                return Err(ApiError::new(409, ErrorCode::DUPLICATE_NICKNAME, "이미 사용중인 닉네임입니다."));
            }
        }
        let m = self
            .members
            .get_mut(&member)
            .ok_or_else(|| ApiError::not_found("회원"))?;
        if let Some(n) = form.nickname {
            m.nickname = n;
        }
        if let Some(i) = form.introduction {
            m.introduction = Some(i).filter(|i| !i.is_empty());
        }
        match form.image {
            ImageChange::Keep => (),
            ImageChange::Delete => m.image_url = None,
            ImageChange::Replace(img) => m.image_url = Some(data_url(&img.mime, &img.bytes)),
        }
        Ok(Profile {
            id: member,
            image_url: m.image_url.clone(),
            introduction: m.introduction.clone(),
            nickname: m.nickname.clone(),
        })
    }

    pub fn auth_info(&self, member: MemberId, target: MemberId) -> Result<AuthInfo, ApiError> {
        MockServer::require_self(member, target)?;
        let m = self.member(target)?;
        Ok(AuthInfo {
            id: target,
            email: m.email.clone(),
            auth_provider: AuthProvider::Basic,
            created_at: Some(stamp(m.created_at)),
        })
    }

    pub fn change_email(
        &mut self,
        member: MemberId,
        target: MemberId,
        req: &ChangeEmailRequest,
    ) -> Result<(), ApiError> {
        MockServer::require_self(member, target)?;
        if self.member(member)?.email != req.current_email {
            return Err(ApiError::invalid_input("현재 이메일이 일치하지 않습니다."));
        }
        if self.member_by_email(&req.new_email).is_some() {
            return Err(ApiError::new(409, ErrorCode::DUPLICATE_EMAIL, "이미 가입된 이메일입니다."));
        }
        if let Some(m) = self.members.get_mut(&member) {
            m.email = req.new_email.clone();
        }
        Ok(())
    }
}

/// Serves `server` on an ephemeral local port until the runtime shuts down
pub async fn spawn(server: MockServer) -> anyhow::Result<(SocketAddr, SharedServer)> {
    let state = Arc::new(Mutex::new(server));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("binding mock server socket")?;
    let addr = listener.local_addr().context("reading mock server address")?;
    let app = router(state.clone());
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            tracing::error!(?err, "mock server stopped");
        }
    });
    tracing::debug!(%addr, "mock server listening");
    Ok((addr, state))
}
