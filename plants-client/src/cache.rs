use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use crate::api::{Comment, CommentPath, PostId};

/// Flat comment listing cached for one post. Snapshots share storage until
/// the next write.
pub type CommentList = Arc<Vec<Comment>>;

/// Per-post comment listings. Any mutation invalidates the post's entry so
/// the next read refetches.
#[derive(Clone, Debug, Default)]
pub struct QueryCache {
    comments: Arc<RwLock<HashMap<PostId, CommentList>>>,
}

impl QueryCache {
    pub fn new() -> QueryCache {
        QueryCache::default()
    }

    pub fn comments(&self, post: &PostId) -> Option<CommentList> {
        self.comments.read().get(post).cloned()
    }

    pub fn put_comments(&self, post: PostId, comments: Vec<Comment>) -> CommentList {
        let list = Arc::new(comments);
        self.comments.write().insert(post, list.clone());
        list
    }

    pub fn invalidate(&self, post: &PostId) {
        if self.comments.write().remove(post).is_some() {
            tracing::trace!(%post, "invalidated cached comments");
        }
    }

    pub fn clear(&self) {
        self.comments.write().clear();
    }

    /// Flips the like state of one cached comment and returns the listing as
    /// it was before, for `restore`. Nothing is cached: nothing to flip.
    pub fn apply_comment_like(
        &self,
        post: &PostId,
        path: &CommentPath,
        currently_liked: bool,
    ) -> Option<CommentList> {
        let mut map = self.comments.write();
        let entry = map.get_mut(post)?;
        let previous = entry.clone();
        for c in Arc::make_mut(entry).iter_mut().filter(|c| c.path == *path) {
            c.like_count += match currently_liked {
                true => -1,
                false => 1,
            };
            c.is_liked = !currently_liked;
        }
        Some(previous)
    }

    pub fn restore(&self, post: PostId, snapshot: CommentList) {
        self.comments.write().insert(post, snapshot);
    }
}
