use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono_tz::Tz;
use plants_client::{
    api::{
        validate::{self, LoginForm, NewPasswordForm, SignupForm},
        ApiError, CommentPath, ImageChange, ImageFile, ListPosts, PageRequest, PostDraft, PostId,
        ProfileUpdate, DEFAULT_FEED_PAGE_SIZE,
    },
    MypageSection, Plants, PostInteraction, Route, SessionState,
};
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

mod render;
mod session;

#[derive(Debug, StructOpt)]
#[structopt(name = "plants-ctl", about = "모두의식물 from the command line")]
struct Opt {
    /// Backend base URL
    #[structopt(long, env = "PLANTS_HOST", default_value = "http://127.0.0.1:8080")]
    host: String,

    /// Where a remembered session is kept between runs
    #[structopt(long, env = "PLANTS_SESSION", default_value = ".plants-session.json")]
    session: PathBuf,

    /// Time zone dates are shown in
    #[structopt(long, env = "PLANTS_TZ", default_value = "Asia/Seoul")]
    tz: Tz,

    #[structopt(subcommand)]
    cmd: Command,
}

fn parse_section(s: &str) -> Result<MypageSection, String> {
    MypageSection::from_slug(s).ok_or_else(|| {
        let known: Vec<&str> = MypageSection::ALL.iter().map(|m| m.slug()).collect();
        format!("unknown section {s:?}, expected one of {}", known.join(", "))
    })
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Sign in; the session is only kept with --remember-me
    Login {
        email: String,
        password: String,
        #[structopt(long)]
        remember_me: bool,
    },

    Logout,

    /// Show the signed-in user
    Whoami,

    /// Send a signup verification code by email
    SendCode { email: String },

    /// Check a verification code received by email
    VerifyCode { email: String, code: String },

    CheckNickname { nickname: String },

    /// Create an account, once its email is verified
    Signup {
        email: String,
        code: String,
        password: String,
        nickname: String,
        /// Agree to the terms of use, privacy policy and community policy
        #[structopt(long)]
        agree: bool,
        /// Also agree to receive marketing information
        #[structopt(long)]
        marketing: bool,
    },

    /// Ask for a password reset link
    ForgotPassword { email: String },

    /// Set a new password with the token from the reset link
    ResetPassword { token: String, password: String },

    /// Browse the feed
    Feed {
        /// Primary category id, eg. `daily`
        #[structopt(long)]
        category: Option<String>,
        /// Secondary category id, eg. `geranium`
        #[structopt(long)]
        sub: Option<String>,
        #[structopt(long, default_value = "1")]
        pages: usize,
        #[structopt(long, default_value = "12")]
        size: u32,
    },

    /// Read a post and its comments
    Show {
        #[structopt(parse(from_str))]
        post: PostId,
    },

    /// Write a new post
    Write {
        #[structopt(long)]
        category: String,
        #[structopt(long, default_value = "all")]
        sub: String,
        #[structopt(long)]
        title: String,
        #[structopt(long, default_value = "")]
        text: String,
        #[structopt(long = "image")]
        images: Vec<PathBuf>,
    },

    /// Edit one of your posts. The post keeps only the images given here.
    Edit {
        #[structopt(parse(from_str))]
        post: PostId,
        #[structopt(long)]
        title: Option<String>,
        #[structopt(long)]
        text: Option<String>,
        #[structopt(long = "image")]
        images: Vec<PathBuf>,
    },

    Delete {
        #[structopt(parse(from_str))]
        post: PostId,
    },

    /// Like a post, or take the like back
    Like {
        #[structopt(parse(from_str))]
        post: PostId,
    },

    /// Bookmark a post, or remove the bookmark
    Bookmark {
        #[structopt(parse(from_str))]
        post: PostId,
    },

    /// Comment on a post, or reply to a comment with --reply-to
    Comment {
        #[structopt(parse(from_str))]
        post: PostId,
        content: String,
        #[structopt(long)]
        reply_to: Option<CommentPath>,
    },

    DeleteComment {
        #[structopt(parse(from_str))]
        post: PostId,
        path: CommentPath,
    },

    LikeComment {
        #[structopt(parse(from_str))]
        post: PostId,
        path: CommentPath,
    },

    /// One of the mypage sections
    Mypage {
        #[structopt(parse(try_from_str = parse_section))]
        section: MypageSection,
        #[structopt(long, default_value = "1")]
        page: u32,
    },

    EditProfile {
        #[structopt(long)]
        nickname: Option<String>,
        #[structopt(long)]
        introduction: Option<String>,
        #[structopt(long, conflicts_with = "remove-image")]
        image: Option<PathBuf>,
        #[structopt(long)]
        remove_image: bool,
    },

    ChangeEmail { new_email: String },

    /// Show whatever screen a path points to, eg. `/community/12`
    Open { path: String },
}

fn read_image(path: &Path) -> anyhow::Result<ImageFile> {
    let bytes = std::fs::read(path).with_context(|| format!("reading image {path:?}"))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{path:?} has no file name"))?;
    Ok(ImageFile::new(name, bytes))
}

fn read_images(paths: &[PathBuf]) -> anyhow::Result<Vec<ImageFile>> {
    let picked = paths
        .iter()
        .map(|p| read_image(p))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let (accepted, rejected) = validate::accept_images(0, picked).map_err(anyhow::Error::msg)?;
    for msg in rejected {
        eprintln!("{msg}");
    }
    Ok(accepted)
}

struct Ctl {
    plants: Plants,
    tz: Tz,
}

impl Ctl {
    async fn feed(&self, query: ListPosts, pages: usize) -> anyhow::Result<()> {
        let mut feed = self.plants.feed(query);
        for _ in 0..pages {
            if feed.load_more().await? == 0 {
                break;
            }
        }
        for p in feed.posts() {
            println!("{}", render::post_card(p, self.tz));
        }
        if feed.posts().is_empty() {
            println!("게시글이 없습니다.");
        } else if feed.has_next() {
            println!("더 보려면 --pages를 늘려주세요.");
        }
        Ok(())
    }

    async fn show(&self, post: &PostId) -> anyhow::Result<()> {
        let detail = self.plants.open_post(post).await?;
        let state = PostInteraction::from_detail(post.clone(), &detail);
        let now = chrono::Utc::now();
        println!("{}", render::post_detail(post, &detail, &state, now, self.tz));
        let tree = self.plants.comments(post).await?;
        println!("\n{}", render::comment_tree(&tree, now, self.tz));
        Ok(())
    }

    async fn mypage(&self, section: MypageSection, page: u32) -> anyhow::Result<()> {
        let page = PageRequest {
            page,
            ..PageRequest::default()
        };
        let user = self.plants.require_user()?;
        println!("{} · {}", user.nickname, section.label());
        let out = match section {
            MypageSection::Profile => render::profile(&self.plants.my_profile().await?),
            MypageSection::Account => {
                render::auth_info(&self.plants.my_auth_info().await?, self.tz)
            }
            MypageSection::Recent => {
                render::paged_posts(&self.plants.api.recent_posts(page).await?, self.tz)
            }
            MypageSection::Posts => {
                render::paged_posts(&self.plants.api.my_posts(page).await?, self.tz)
            }
            MypageSection::Comments => {
                render::my_comments(&self.plants.my_comments(page).await?, self.tz)
            }
            MypageSection::Likes => {
                render::paged_posts(&self.plants.api.liked_posts(page).await?, self.tz)
            }
            MypageSection::Bookmarks => {
                render::paged_posts(&self.plants.api.bookmarked_posts(page).await?, self.tz)
            }
        };
        println!("{out}");
        Ok(())
    }

    async fn open(&self, path: &str) -> anyhow::Result<()> {
        let route = Route::parse(path);
        if route.requires_auth() {
            self.plants.require_user()?;
        }
        let hint = match route {
            Route::Home => return self.feed(ListPosts::default(), 1).await,
            Route::Post(id) => return self.show(&id).await,
            Route::Mypage(section) => return self.mypage(section, 1).await,
            Route::Login => String::from("plants-ctl login <email> <password>"),
            Route::Signup => String::from("plants-ctl send-code <email>, then signup"),
            Route::ResetPassword => String::from("plants-ctl reset-password <token> <password>"),
            Route::Write => String::from("plants-ctl write --category <id> --title <title>"),
            Route::Edit(id) => format!("plants-ctl edit {id}"),
            Route::NotFound => String::from("페이지를 찾을 수 없습니다."),
        };
        println!("{hint}");
        Ok(())
    }

    async fn run(&self, cmd: Command) -> anyhow::Result<()> {
        let plants = &self.plants;
        match cmd {
            Command::Login {
                email,
                password,
                remember_me,
            } => {
                let form = LoginForm {
                    email,
                    password,
                    remember_me,
                };
                match plants.login(&form).await {
                    Ok(user) => println!("{}님 환영합니다.", user.nickname),
                    Err(e) => {
                        if plants.auth().should_suggest_password_reset() {
                            eprintln!("비밀번호를 잊으셨나요? plants-ctl forgot-password <email>");
                        }
                        return Err(e.into());
                    }
                }
            }
            Command::Logout => {
                plants.logout();
                println!("로그아웃되었습니다.");
            }
            Command::Whoami => match plants.auth().user() {
                Some(u) => println!("{} <{}>", u.nickname, u.email),
                None => println!("로그인하지 않았습니다."),
            },
            Command::SendCode { email } => {
                let out = plants.request_email_verification(&email).await;
                println!("{}", out.message);
                anyhow::ensure!(out.success, "verification email was not sent");
            }
            Command::VerifyCode { email, code } => {
                let out = plants.verify_email_code(&email, &code).await;
                println!("{}", out.message);
                anyhow::ensure!(out.success, "verification code was not accepted");
            }
            Command::CheckNickname { nickname } => {
                let out = plants.check_nickname(&nickname).await;
                println!("{}", out.message);
                anyhow::ensure!(out.success, "nickname could not be checked");
            }
            Command::Signup {
                email,
                code,
                password,
                nickname,
                agree,
                marketing,
            } => {
                let form = SignupForm {
                    email,
                    verification_code: code,
                    password_confirm: password.clone(),
                    password,
                    nickname,
                    agree_to_terms: agree,
                    agree_to_privacy: agree,
                    agree_to_community: agree,
                    agree_to_marketing: marketing,
                };
                plants.signup(&form).await?;
                println!("회원가입이 완료되었습니다. 로그인해주세요.");
            }
            Command::ForgotPassword { email } => {
                plants.request_password_reset(&email).await?;
                println!("비밀번호 재설정 메일이 발송되었습니다.");
            }
            Command::ResetPassword { token, password } => {
                plants.api.verify_password_reset(&token).await?;
                let form = NewPasswordForm {
                    password_confirm: password.clone(),
                    password,
                };
                plants.reset_password(&form).await?;
                println!("비밀번호가 변경되었습니다.");
            }
            Command::Feed {
                category,
                sub,
                pages,
                size,
            } => {
                let query = ListPosts {
                    size: if size == 0 { DEFAULT_FEED_PAGE_SIZE } else { size },
                    last_post_id: None,
                    primary_category_id: category,
                    secondary_category_id: sub,
                };
                self.feed(query, pages).await?;
            }
            Command::Show { post } => self.show(&post).await?,
            Command::Write {
                category,
                sub,
                title,
                text,
                images,
            } => {
                let draft = PostDraft {
                    primary_category_id: category,
                    secondary_category_id: sub,
                    title,
                    text_content: text,
                    images: read_images(&images)?,
                };
                match plants.create_post(&draft).await? {
                    Some(id) => println!("{}", Route::Post(id)),
                    None => println!("{}", Route::Home),
                }
            }
            Command::Edit {
                post,
                title,
                text,
                images,
            } => {
                let data = plants.api.post_edit_data(&post).await?;
                let mut draft = PostDraft::from_edit_data(&data);
                if let Some(title) = title {
                    draft.title = title;
                }
                if let Some(text) = text {
                    draft.text_content = text;
                }
                draft.images = read_images(&images)?;
                plants.update_post(&post, &draft).await?;
                println!("{}", Route::Post(post));
            }
            Command::Delete { post } => plants.delete_post(&post).await?,
            Command::Like { post } => {
                let detail = plants.api.post_detail(&post).await?;
                let mut state = PostInteraction::from_detail(post, &detail);
                plants.toggle_post_like(&mut state).await?;
                println!(
                    "{} 좋아요 {}",
                    if state.like.active { "♥" } else { "♡" },
                    state.like_count()
                );
            }
            Command::Bookmark { post } => {
                let detail = plants.api.post_detail(&post).await?;
                let mut state = PostInteraction::from_detail(post, &detail);
                plants.toggle_post_bookmark(&mut state).await?;
                println!(
                    "{}",
                    if state.bookmark.active { "북마크했습니다." } else { "북마크를 해제했습니다." }
                );
            }
            Command::Comment {
                post,
                content,
                reply_to,
            } => {
                let path = plants.create_comment(&post, reply_to.as_ref(), &content).await?;
                println!("[{path}] 댓글이 등록되었습니다.");
            }
            Command::DeleteComment { post, path } => plants.delete_comment(&post, &path).await?,
            Command::LikeComment { post, path } => {
                let list = plants.comment_list(&post).await?;
                let comment = list
                    .iter()
                    .rev()
                    .find(|c| c.path == path && !c.is_deleted)
                    .cloned()
                    .with_context(|| format!("no comment at {path} on post {post}"))?;
                plants.toggle_comment_like(&post, &comment).await?;
            }
            Command::Mypage { section, page } => self.mypage(section, page).await?,
            Command::EditProfile {
                nickname,
                introduction,
                image,
                remove_image,
            } => {
                let image = match (image, remove_image) {
                    (Some(path), _) => ImageChange::Replace(read_image(&path)?),
                    (None, true) => ImageChange::Delete,
                    (None, false) => ImageChange::Keep,
                };
                let update = ProfileUpdate {
                    nickname,
                    introduction,
                    image,
                };
                anyhow::ensure!(!update.is_noop(), "nothing to update");
                let profile = plants.update_profile(&update).await?;
                println!("{}", render::profile(&profile));
            }
            Command::ChangeEmail { new_email } => {
                plants.change_email(&new_email).await?;
                println!("이메일이 변경되었습니다.");
            }
            Command::Open { path } => self.open(&path).await?,
        }
        Ok(())
    }
}

/// Prints a client error the way a screen would show it. Anything else is
/// handed back.
fn report(err: anyhow::Error, shown: Option<&str>) -> anyhow::Result<()> {
    let msg = if let Some(e) = err.downcast_ref::<plants_client::Error>() {
        match e {
            plants_client::Error::Validation(v) => render::validation(v),
            e => e.user_message(),
        }
    } else if let Some(e) = err.downcast_ref::<ApiError>() {
        e.user_message()
    } else {
        return Err(err);
    };
    if shown != Some(msg.as_str()) {
        eprintln!("{msg}");
    }
    std::process::exit(1)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let opt = Opt::from_args();

    let plants = Plants::new(&opt.host).context("setting up the client")?;
    if let Some(saved) = session::load(&opt.session, plants.api.base_url())? {
        if plants.bootstrap(&saved).await == SessionState::Unauthenticated {
            eprintln!("저장된 로그인이 만료되었습니다. 다시 로그인해주세요.");
        }
    }

    let ctl = Ctl {
        plants: plants.clone(),
        tz: opt.tz,
    };
    let res = ctl.run(opt.cmd).await;

    let shown = plants.modal.take();
    if let Some(m) = &shown {
        println!("{}", render::modal(m));
    }
    session::store(&opt.session, plants.save().as_ref())?;

    match res {
        Ok(()) => Ok(()),
        Err(e) => report(e, shown.as_ref().map(|m| m.description.as_str())),
    }
}
