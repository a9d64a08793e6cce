use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, HeaderMap},
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use plants_client::api::{
    AccessToken, ApiResponse, AuthInfo, ChangeEmailRequest, Comment, CommentPath,
    EmailVerificationRequest, EmailVerificationResponse, EmailVerifyRequest, ImageChange,
    ImageFile, LoginRequest, LoginResponse, MyCommentPage, NewComment, NewPasswordRequest,
    NicknameCheckResponse, OrderInfo, PageRequest, PagedPosts, PasswordResetRequest, PostDetail,
    PostEditData, PostId, PostPage, Profile, SignupRequest, MAX_IMAGES, MAX_IMAGE_BYTES,
    REFRESH_TOKEN_COOKIE_NAME, REFRESH_TOKEN_MAX_AGE_SECS,
};
use tower_http::trace::TraceLayer;

use crate::{
    extractors::{cookie, member_id, Auth, MaybeAuth},
    DraftMeta, Error, FeedQuery, ProfileForm, SharedServer, Upload,
};

const RESET_SESSION_COOKIE: &str = "resetSession";

type Reply<T> = Result<Json<ApiResponse<T>>, Error>;

fn ok<T>(data: T) -> Reply<T> {
    Ok(Json(ApiResponse::ok(data)))
}

fn done() -> Reply<()> {
    Ok(Json(ApiResponse::empty()))
}

fn refresh_cookie(token: &str) -> String {
    format!(
        "{REFRESH_TOKEN_COOKIE_NAME}={token}; Path=/; HttpOnly; Max-Age={REFRESH_TOKEN_MAX_AGE_SECS}"
    )
}

type CookieReply<T> = Result<([(header::HeaderName, String); 1], Json<ApiResponse<T>>), Error>;

fn with_tokens(access: String, refresh: &str) -> CookieReply<LoginResponse> {
    Ok((
        [(header::SET_COOKIE, refresh_cookie(refresh))],
        Json(ApiResponse::ok(LoginResponse {
            access_token: AccessToken(access),
        })),
    ))
}

pub fn router(state: SharedServer) -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/token/refresh", post(refresh))
        .route("/api/auth/reset-password-request/send", post(request_reset))
        .route("/api/auth/reset-password-request/verify/email", post(verify_reset))
        .route("/api/auth/reset-password-request/verify/input", post(reset_password))
        .route("/api/members/register", post(register))
        .route("/api/members/verify-email/send", post(send_verification))
        .route("/api/members/verify-email", post(verify_email))
        .route("/api/v1/members/check/nickname/:nickname", get(check_nickname))
        .route("/api/v1/members/:member/profile", get(profile).put(update_profile))
        .route("/api/v1/members/:member/auth-info", get(auth_info))
        .route("/api/v1/members/:member/modify/email", post(change_email))
        .route(
            "/api/v1/members/:member/like/communication/post/:post",
            put(like_post).delete(unlike_post),
        )
        .route(
            "/api/v1/members/:member/bookmark/communication/post/:post",
            put(bookmark_post).delete(unbookmark_post),
        )
        .route(
            "/api/v1/members/:member/like/communication/post/:post/path/:path",
            put(like_comment).delete(unlike_comment),
        )
        .route("/api/v1/communication/posts", get(list_posts).post(create_post))
        .route("/api/v1/communication/posts/me", get(my_posts))
        .route("/api/v1/communication/posts/me/history", get(recent_posts))
        .route("/api/v1/communication/posts/me/likes", get(liked_posts))
        .route("/api/v1/communication/posts/me/bookmarks", get(bookmarked_posts))
        .route(
            "/api/v1/communication/posts/:post",
            get(post_detail).put(update_post).delete(delete_post),
        )
        .route("/api/v1/communication/posts/:post/data", get(edit_data))
        .route("/api/v1/communication/posts/:post/views", patch(add_view))
        .route("/api/v1/communication/comments", post(create_comment))
        .route("/api/v1/communication/comments/me", get(my_comments))
        .route("/api/v1/communication/comments/post/:post", get(list_comments))
        .route(
            "/api/v1/communication/comments/post/:post/path/:path",
            delete(delete_comment),
        )
        .layer(DefaultBodyLimit::max((MAX_IMAGES + 1) * MAX_IMAGE_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn login(
    State(srv): State<SharedServer>,
    Json(req): Json<LoginRequest>,
) -> CookieReply<LoginResponse> {
    let (access, refresh) = srv.lock().login(&req)?;
    with_tokens(access, &refresh)
}

async fn refresh(
    State(srv): State<SharedServer>,
    headers: HeaderMap,
) -> CookieReply<LoginResponse> {
    let token = cookie(&headers, REFRESH_TOKEN_COOKIE_NAME);
    let (access, refresh) = srv.lock().refresh(token.as_deref())?;
    with_tokens(access, &refresh)
}

async fn register(State(srv): State<SharedServer>, Json(req): Json<SignupRequest>) -> Reply<()> {
    srv.lock().register(&req)?;
    done()
}

async fn send_verification(
    State(srv): State<SharedServer>,
    Json(req): Json<EmailVerificationRequest>,
) -> Reply<()> {
    let code = srv.lock().send_verification(&req.email);
    tracing::info!(email = %req.email, %code, "verification code sent");
    done()
}

async fn verify_email(
    State(srv): State<SharedServer>,
    Json(req): Json<EmailVerifyRequest>,
) -> Reply<EmailVerificationResponse> {
    let has_email_auth = srv.lock().verify_email(&req.email, &req.verify_code);
    ok(EmailVerificationResponse { has_email_auth })
}

async fn check_nickname(
    State(srv): State<SharedServer>,
    Path(nickname): Path<String>,
) -> Reply<NicknameCheckResponse> {
    let is_nickname_existed = srv.lock().nickname_exists(&nickname);
    ok(NicknameCheckResponse { is_nickname_existed })
}

async fn request_reset(
    State(srv): State<SharedServer>,
    Json(req): Json<PasswordResetRequest>,
) -> Reply<()> {
    srv.lock().request_password_reset(&req.email)?;
    done()
}

#[derive(serde::Deserialize)]
struct ResetLink {
    uuid: String,
}

async fn verify_reset(
    State(srv): State<SharedServer>,
    Query(link): Query<ResetLink>,
) -> CookieReply<()> {
    let session = srv.lock().verify_reset(&link.uuid)?;
    Ok((
        [(header::SET_COOKIE, format!("{RESET_SESSION_COOKIE}={session}; Path=/; HttpOnly"))],
        Json(ApiResponse::empty()),
    ))
}

async fn reset_password(
    State(srv): State<SharedServer>,
    headers: HeaderMap,
    Json(req): Json<NewPasswordRequest>,
) -> Reply<()> {
    let session = cookie(&headers, RESET_SESSION_COOKIE);
    srv.lock().reset_password(session.as_deref(), &req.password)?;
    done()
}

async fn profile(
    State(srv): State<SharedServer>,
    Auth(_): Auth,
    Path(member): Path<String>,
) -> Reply<Profile> {
    ok(srv.lock().profile(member_id(&member)?)?)
}

async fn update_profile(
    State(srv): State<SharedServer>,
    Auth(user): Auth,
    Path(member): Path<String>,
    mut form: Multipart,
) -> Reply<Profile> {
    let target = member_id(&member)?;
    let mut update = ProfileForm::default();
    while let Some(field) = form
        .next_field()
        .await
        .map_err(|e| Error::invalid_input(e.to_string()))?
    {
        let name = field.name().map(String::from).unwrap_or_default();
        let filename = field.file_name().map(String::from);
        let mime = field.content_type().map(String::from);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| Error::invalid_input(e.to_string()))?;
        let text = || String::from_utf8_lossy(&bytes).into_owned();
        match (name.as_str(), filename) {
            ("nickname", _) => update.nickname = Some(text()),
            ("introduction", _) => update.introduction = Some(text()),
            ("image", None) if &bytes[..] == b"null" => update.image = ImageChange::Delete,
            ("image", Some(filename)) => {
                let mut img = ImageFile::new(filename, bytes.to_vec());
                if let Some(mime) = mime {
                    img.mime = mime;
                }
                update.image = ImageChange::Replace(img);
            }
            _ => tracing::debug!(%name, "ignoring profile field"),
        }
    }
    ok(srv.lock().update_profile(user, target, update)?)
}

async fn auth_info(
    State(srv): State<SharedServer>,
    Auth(user): Auth,
    Path(member): Path<String>,
) -> Reply<AuthInfo> {
    ok(srv.lock().auth_info(user, member_id(&member)?)?)
}

async fn change_email(
    State(srv): State<SharedServer>,
    Auth(user): Auth,
    Path(member): Path<String>,
    Json(req): Json<ChangeEmailRequest>,
) -> Reply<()> {
    srv.lock().change_email(user, member_id(&member)?, &req)?;
    done()
}

async fn like_post(
    State(srv): State<SharedServer>,
    Auth(user): Auth,
    Path((member, post)): Path<(String, String)>,
) -> Reply<()> {
    srv.lock().set_post_like(user, member_id(&member)?, &PostId(post), true)?;
    done()
}

async fn unlike_post(
    State(srv): State<SharedServer>,
    Auth(user): Auth,
    Path((member, post)): Path<(String, String)>,
) -> Reply<()> {
    srv.lock().set_post_like(user, member_id(&member)?, &PostId(post), false)?;
    done()
}

async fn bookmark_post(
    State(srv): State<SharedServer>,
    Auth(user): Auth,
    Path((member, post)): Path<(String, String)>,
) -> Reply<()> {
    srv.lock().set_bookmark(user, member_id(&member)?, &PostId(post), true)?;
    done()
}

async fn unbookmark_post(
    State(srv): State<SharedServer>,
    Auth(user): Auth,
    Path((member, post)): Path<(String, String)>,
) -> Reply<()> {
    srv.lock().set_bookmark(user, member_id(&member)?, &PostId(post), false)?;
    done()
}

fn comment_path(s: &str) -> Result<CommentPath, Error> {
    CommentPath::parse(s).map_err(|e| Error::invalid_input(e.to_string()))
}

async fn like_comment(
    State(srv): State<SharedServer>,
    Auth(user): Auth,
    Path((member, post, path)): Path<(String, String, String)>,
) -> Reply<()> {
    let path = comment_path(&path)?;
    srv.lock()
        .set_comment_like(user, member_id(&member)?, &PostId(post), &path, true)?;
    done()
}

async fn unlike_comment(
    State(srv): State<SharedServer>,
    Auth(user): Auth,
    Path((member, post, path)): Path<(String, String, String)>,
) -> Reply<()> {
    let path = comment_path(&path)?;
    srv.lock()
        .set_comment_like(user, member_id(&member)?, &PostId(post), &path, false)?;
    done()
}

async fn list_posts(
    State(srv): State<SharedServer>,
    MaybeAuth(viewer): MaybeAuth,
    Query(q): Query<FeedQuery>,
) -> Reply<PostPage> {
    ok(srv.lock().list_posts(viewer, &q)?)
}

/// Reads the `content` parts and the `orderInfo` manifest of a post upload
async fn read_upload(mut form: Multipart) -> Result<(Vec<Upload>, Vec<OrderInfo>), Error> {
    let mut uploads = Vec::new();
    let mut order = Vec::new();
    while let Some(field) = form
        .next_field()
        .await
        .map_err(|e| Error::invalid_input(e.to_string()))?
    {
        let name = field.name().map(String::from).unwrap_or_default();
        let filename = field.file_name().map(String::from);
        let mime = field
            .content_type()
            .map(String::from)
            .unwrap_or_else(|| String::from("application/octet-stream"));
        let bytes = field
            .bytes()
            .await
            .map_err(|e| Error::invalid_input(e.to_string()))?;
        match (name.as_str(), filename) {
            ("content", Some(filename)) => uploads.push(Upload {
                filename,
                mime,
                bytes: bytes.to_vec(),
            }),
            ("orderInfo", _) => {
                order = serde_json::from_slice(&bytes)
                    .map_err(|e| Error::invalid_input(format!("orderInfo: {e}")))?
            }
            _ => tracing::debug!(%name, "ignoring post field"),
        }
    }
    Ok((uploads, order))
}

async fn create_post(
    State(srv): State<SharedServer>,
    Auth(user): Auth,
    Query(meta): Query<DraftMeta>,
    form: Multipart,
) -> Reply<PostId> {
    let (uploads, order) = read_upload(form).await?;
    ok(srv.lock().create_post(user, &meta, uploads, &order)?)
}

async fn update_post(
    State(srv): State<SharedServer>,
    Auth(user): Auth,
    Path(post): Path<String>,
    Query(meta): Query<DraftMeta>,
    form: Multipart,
) -> Reply<()> {
    let (uploads, order) = read_upload(form).await?;
    srv.lock()
        .update_post(user, &PostId(post), &meta, uploads, &order)?;
    done()
}

async fn delete_post(
    State(srv): State<SharedServer>,
    Auth(user): Auth,
    Path(post): Path<String>,
) -> Reply<()> {
    srv.lock().delete_post(user, &PostId(post))?;
    done()
}

async fn post_detail(
    State(srv): State<SharedServer>,
    MaybeAuth(viewer): MaybeAuth,
    Path(post): Path<String>,
) -> Reply<PostDetail> {
    ok(srv.lock().post_detail(viewer, &PostId(post))?)
}

async fn edit_data(
    State(srv): State<SharedServer>,
    Auth(user): Auth,
    Path(post): Path<String>,
) -> Reply<PostEditData> {
    ok(srv.lock().edit_data(user, &PostId(post))?)
}

async fn add_view(
    State(srv): State<SharedServer>,
    MaybeAuth(viewer): MaybeAuth,
    Path(post): Path<String>,
) -> Reply<()> {
    srv.lock().add_view(viewer, &PostId(post))?;
    done()
}

async fn my_posts(
    State(srv): State<SharedServer>,
    Auth(user): Auth,
    Query(page): Query<PageRequest>,
) -> Reply<PagedPosts> {
    ok(srv.lock().my_posts(user, page))
}

async fn recent_posts(
    State(srv): State<SharedServer>,
    Auth(user): Auth,
    Query(page): Query<PageRequest>,
) -> Reply<PagedPosts> {
    ok(srv.lock().recent_posts(user, page))
}

async fn liked_posts(
    State(srv): State<SharedServer>,
    Auth(user): Auth,
    Query(page): Query<PageRequest>,
) -> Reply<PagedPosts> {
    ok(srv.lock().liked_posts(user, page))
}

async fn bookmarked_posts(
    State(srv): State<SharedServer>,
    Auth(user): Auth,
    Query(page): Query<PageRequest>,
) -> Reply<PagedPosts> {
    ok(srv.lock().bookmarked_posts(user, page))
}

async fn list_comments(
    State(srv): State<SharedServer>,
    MaybeAuth(viewer): MaybeAuth,
    Path(post): Path<String>,
) -> Reply<Vec<Comment>> {
    ok(srv.lock().list_comments(viewer, &PostId(post))?)
}

async fn create_comment(
    State(srv): State<SharedServer>,
    Auth(user): Auth,
    Json(req): Json<NewComment>,
) -> Reply<()> {
    srv.lock().create_comment(user, &req)?;
    done()
}

async fn delete_comment(
    State(srv): State<SharedServer>,
    Auth(user): Auth,
    Path((post, path)): Path<(String, String)>,
) -> Reply<()> {
    let path = comment_path(&path)?;
    srv.lock().delete_comment(user, &PostId(post), &path)?;
    done()
}

#[derive(serde::Deserialize)]
struct MyCommentsQuery {
    page: u32,
    size: u32,
    uuid: String,
}

async fn my_comments(
    State(srv): State<SharedServer>,
    Auth(user): Auth,
    Query(q): Query<MyCommentsQuery>,
) -> Reply<MyCommentPage> {
    let page = PageRequest {
        page: q.page,
        size: q.size,
    };
    ok(srv.lock().my_comments(user, member_id(&q.uuid)?, page)?)
}
