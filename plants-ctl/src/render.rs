//! Plain-text rendering of each screen.

use std::fmt::Write;

use chrono_tz::Tz;
use plants_client::{
    api::{
        format, validate::ValidationErrors, AuthInfo, MyCommentPage, PagedPosts, PostDetail,
        PostId, PostSummary, Profile, Time,
    },
    CommentNode, CommentTree, Modal, ModalKind, PostInteraction,
};

pub const DELETED_COMMENT: &str = "삭제된 댓글입니다";

fn badge(primary: &str, secondary: &str) -> String {
    match secondary {
        "" | "전체" => format!("[{primary}]"),
        s => format!("[{primary} · {s}]"),
    }
}

/// Feed card: badge and title, then byline and counters, then the excerpt
pub fn post_card(post: &PostSummary, tz: Tz) -> String {
    let mut out = format!(
        "#{} {} {}\n    {} · {} · 좋아요 {} · 댓글 {}",
        post.post_id,
        badge(&post.primary_category, &post.secondary_category),
        post.title,
        post.nickname,
        format::format_post_date(&post.published_at, tz),
        post.like_count,
        post.comment_count,
    );
    let excerpt = format::excerpt(post);
    if !excerpt.is_empty() {
        let line = excerpt.lines().next().unwrap_or_default();
        let _ = write!(out, "\n    {line}");
    }
    out
}

pub fn post_detail(
    post: &PostId,
    detail: &PostDetail,
    state: &PostInteraction,
    now: Time,
    tz: Tz,
) -> String {
    let mut out = format!(
        "#{post} {} {}\n{} · {} · 조회 {}\n",
        badge(&detail.primary_category, &detail.secondary_category),
        detail.title,
        detail.author_nickname,
        format::format_relative_time(&detail.created_at, now, tz),
        detail.view_count,
    );
    let text = detail.text();
    if !text.is_empty() {
        let _ = writeln!(out, "\n{text}");
    }
    for img in detail.images() {
        let _ = writeln!(out, "[이미지 {}] {}", img.order, img.filename);
    }
    let _ = write!(
        out,
        "\n{} 좋아요 {} · {} · 댓글 {}",
        if state.like.active { "♥" } else { "♡" },
        state.like_count(),
        if state.bookmark.active { "북마크됨" } else { "북마크" },
        detail.comment_count,
    );
    out
}

fn comment_node(out: &mut String, node: &CommentNode, now: Time, tz: Tz) {
    let indent = "  ".repeat(node.depth);
    let c = &node.comment;
    if c.is_deleted {
        let _ = writeln!(out, "{indent}[{}] {DELETED_COMMENT}", c.path);
    } else {
        let _ = writeln!(
            out,
            "{indent}[{}] {} · {} · {} {}",
            c.path,
            c.nickname,
            format::format_relative_time(&c.created_at, now, tz),
            if c.is_liked { "♥" } else { "♡" },
            c.like_count,
        );
        for line in c.content.lines() {
            let _ = writeln!(out, "{indent}  {line}");
        }
    }
    for child in &node.children {
        comment_node(out, child, now, tz);
    }
}

/// Replies are indented under their parent; deleted comments keep their
/// place so that replies to them stay readable.
pub fn comment_tree(tree: &CommentTree, now: Time, tz: Tz) -> String {
    let mut out = format!("댓글 {}\n", tree.total_count);
    if tree.roots.is_empty() {
        out.push_str("첫 댓글을 남겨보세요.\n");
    }
    for root in &tree.roots {
        comment_node(&mut out, root, now, tz);
    }
    out
}

pub fn paged_posts(page: &PagedPosts, tz: Tz) -> String {
    let mut out = String::new();
    for p in &page.posts {
        let _ = writeln!(out, "{}", post_card(p, tz));
    }
    if page.posts.is_empty() {
        out.push_str("게시글이 없습니다.\n");
    }
    let _ = write!(
        out,
        "{}/{} 페이지 · 총 {}개",
        page.page,
        page.total_pages.max(1),
        page.total_elements
    );
    out
}

pub fn my_comments(page: &MyCommentPage, tz: Tz) -> String {
    let mut out = String::new();
    for c in &page.comments {
        let _ = writeln!(
            out,
            "#{} {}\n    [{}] {} · {} · 좋아요 {}",
            c.post_id,
            c.post_title,
            c.path,
            c.content,
            format::format_date(&c.created_at, tz),
            c.like_count,
        );
    }
    if page.comments.is_empty() {
        out.push_str("작성한 댓글이 없습니다.\n");
    }
    let _ = write!(
        out,
        "{}/{} 페이지 · 총 {}개",
        page.page,
        page.total_pages.max(1),
        page.total_elements
    );
    out
}

pub fn profile(p: &Profile) -> String {
    format!(
        "{}\n소개: {}\n이미지: {}",
        p.nickname,
        p.introduction.as_deref().unwrap_or("-"),
        p.image_url.as_deref().unwrap_or("-"),
    )
}

pub fn auth_info(info: &AuthInfo, tz: Tz) -> String {
    let mut out = format!("이메일: {}\n가입 방식: {}", info.email, info.auth_provider);
    if let Some(at) = &info.created_at {
        let _ = write!(out, "\n가입일: {}", format::format_date(at, tz));
    }
    if info.auth_provider.is_social() {
        out.push_str("\n소셜 계정은 이메일을 변경할 수 없습니다.");
    }
    out
}

pub fn modal(m: &Modal) -> String {
    match (m.kind, &m.title) {
        (ModalKind::Snackbar, _) | (_, None) => m.description.clone(),
        (_, Some(title)) => format!("{title}: {}", m.description),
    }
}

/// One line per invalid field
pub fn validation(errs: &ValidationErrors) -> String {
    errs.iter()
        .map(|(field, msg)| format!("{field}: {msg}"))
        .collect::<Vec<_>>()
        .join("\n")
}
