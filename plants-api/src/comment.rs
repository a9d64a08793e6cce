use std::{fmt, str::FromStr};

use crate::PostId;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum PathError {
    #[error("comment path is empty")]
    Empty,

    #[error("comment path {0:?} has an empty segment")]
    EmptySegment(String),

    #[error("comment path {0:?} has a non-numeric segment")]
    NotNumeric(String),
}

/// Dot-separated sibling indices, eg. `0.1.2`: the third reply to the second
/// reply to the first root comment.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Serialize)]
#[serde(transparent)]
pub struct CommentPath(String);

impl CommentPath {
    pub fn parse(s: &str) -> Result<CommentPath, PathError> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }
        for seg in s.split('.') {
            if seg.is_empty() {
                return Err(PathError::EmptySegment(String::from(s)));
            }
            if !seg.bytes().all(|b| b.is_ascii_digit()) {
                return Err(PathError::NotNumeric(String::from(s)));
            }
        }
        Ok(CommentPath(String::from(s)))
    }

    pub fn root(index: usize) -> CommentPath {
        CommentPath(index.to_string())
    }

    /// Path for a new comment, given how many siblings already exist at the
    /// target level. Uniqueness is up to the caller.
    pub fn generate(parent: Option<&CommentPath>, sibling_count: usize) -> CommentPath {
        match parent {
            None => CommentPath::root(sibling_count),
            Some(p) => CommentPath(format!("{}.{}", p.0, sibling_count)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    pub fn depth(&self) -> usize {
        comment_depth(&self.0)
    }

    pub fn is_root(&self) -> bool {
        !self.0.contains('.')
    }

    pub fn parent(&self) -> Option<CommentPath> {
        self.0
            .rsplit_once('.')
            .map(|(parent, _)| CommentPath(String::from(parent)))
    }

    pub fn root_path(&self) -> CommentPath {
        CommentPath(String::from(root_path(&self.0)))
    }

    pub fn is_ancestor_of(&self, other: &CommentPath) -> bool {
        other.0.len() > self.0.len()
            && other.0.starts_with(&self.0)
            && other.0.as_bytes()[self.0.len()] == b'.'
    }
}

impl fmt::Display for CommentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CommentPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<CommentPath, PathError> {
        CommentPath::parse(s)
    }
}

impl<'de> serde::Deserialize<'de> for CommentPath {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<CommentPath, D::Error> {
        let s = String::deserialize(d)?;
        CommentPath::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// `sibling_count` when there is no parent, `{parent}.{sibling_count}` otherwise
pub fn generate_comment_path(parent_path: Option<&str>, sibling_count: usize) -> String {
    match parent_path {
        None | Some("") => sibling_count.to_string(),
        Some(parent) => format!("{parent}.{sibling_count}"),
    }
}

pub fn comment_depth(path: &str) -> usize {
    path.split('.').count() - 1
}

pub fn root_path(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}

/// A comment as listed by the backend, flat
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub path: CommentPath,
    pub nickname: String,
    pub content: String,
    pub like_count: i64,
    pub created_at: String,

    /// Tombstones stay listed so that their replies keep a parent
    #[serde(default)]
    pub is_deleted: bool,

    #[serde(default)]
    pub is_liked: bool,
}

impl Comment {
    pub fn depth(&self) -> usize {
        self.path.depth()
    }
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub post_id: PostId,
    pub path: CommentPath,
    pub content: String,
}

/// One entry of the "my comments" listing
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyComment {
    pub post_id: PostId,
    pub post_title: String,
    pub path: CommentPath,
    pub content: String,
    pub like_count: i64,
    pub created_at: String,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyCommentPage {
    pub comments: Vec<MyComment>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
    pub has_next: bool,
}
