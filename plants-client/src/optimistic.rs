use crate::api::{PostDetail, PostId, PostSummary};

/// An on/off state shown to the user, optionally with a counter that follows
/// it (likes have one, bookmarks do not)
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Toggle {
    pub active: bool,
    pub count: Option<i64>,
}

impl Toggle {
    pub fn new(active: bool, count: Option<i64>) -> Toggle {
        Toggle { active, count }
    }

    /// Flips the state right away and remembers what it was
    pub fn begin(&mut self) -> PendingToggle {
        let before = *self;
        self.active = !before.active;
        if let Some(c) = self.count.as_mut() {
            *c += match before.active {
                true => -1,
                false => 1,
            };
        }
        PendingToggle { before }
    }
}

/// A flip whose request is in flight
#[must_use = "a pending toggle must be settled with the request outcome"]
#[derive(Debug)]
pub struct PendingToggle {
    before: Toggle,
}

impl PendingToggle {
    /// State before the click, which decides between do and undo requests
    pub fn was_active(&self) -> bool {
        self.before.active
    }

    pub fn before(&self) -> Toggle {
        self.before
    }

    /// Keeps the new state on success, puts the old one back on failure
    pub fn settle<T, E>(self, toggle: &mut Toggle, outcome: &Result<T, E>) {
        if outcome.is_err() {
            *toggle = self.before;
        }
    }
}

/// Like and bookmark state of the post being viewed
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PostInteraction {
    pub post: PostId,
    pub like: Toggle,
    pub bookmark: Toggle,
}

impl PostInteraction {
    pub fn new(post: PostId, liked: bool, like_count: i64, bookmarked: bool) -> PostInteraction {
        PostInteraction {
            post,
            like: Toggle::new(liked, Some(like_count)),
            bookmark: Toggle::new(bookmarked, None),
        }
    }

    pub fn from_detail(post: PostId, detail: &PostDetail) -> PostInteraction {
        PostInteraction::new(post, detail.is_liked, detail.like_count, detail.is_bookmarked)
    }

    pub fn from_summary(summary: &PostSummary) -> PostInteraction {
        PostInteraction::new(
            summary.post_id.clone(),
            summary.is_liked,
            summary.like_count,
            summary.is_bookmarked,
        )
    }

    pub fn like_count(&self) -> i64 {
        self.like.count.unwrap_or(0)
    }
}
