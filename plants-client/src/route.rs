use std::fmt;

use crate::api::PostId;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MypageSection {
    Profile,
    Account,
    Recent,
    Posts,
    Comments,
    Likes,
    Bookmarks,
}

impl MypageSection {
    pub const ALL: [MypageSection; 7] = [
        MypageSection::Profile,
        MypageSection::Account,
        MypageSection::Recent,
        MypageSection::Posts,
        MypageSection::Comments,
        MypageSection::Likes,
        MypageSection::Bookmarks,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            MypageSection::Profile => "profile",
            MypageSection::Account => "account",
            MypageSection::Recent => "recent",
            MypageSection::Posts => "posts",
            MypageSection::Comments => "comments",
            MypageSection::Likes => "likes",
            MypageSection::Bookmarks => "bookmarks",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MypageSection::Profile => "프로필",
            MypageSection::Account => "계정 관리",
            MypageSection::Recent => "최근 본 글",
            MypageSection::Posts => "내가 쓴 글",
            MypageSection::Comments => "내가 쓴 댓글",
            MypageSection::Likes => "좋아요",
            MypageSection::Bookmarks => "북마크",
        }
    }

    pub fn from_slug(s: &str) -> Option<MypageSection> {
        MypageSection::ALL.into_iter().find(|m| m.slug() == s)
    }
}

/// Screens addressable by path
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Route {
    Home,
    Login,
    Signup,
    ResetPassword,
    Post(PostId),
    Write,
    Edit(PostId),
    Mypage(MypageSection),
    NotFound,
}

impl Route {
    /// Ignores the query string and a trailing slash
    pub fn parse(path: &str) -> Route {
        let path = path.split(['?', '#']).next().unwrap_or("");
        let segs: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segs.as_slice() {
            [] => Route::Home,
            ["login"] => Route::Login,
            ["signup"] => Route::Signup,
            ["reset-password"] => Route::ResetPassword,
            ["community", "write"] => Route::Write,
            ["community", "write", "edit", id] => Route::Edit(PostId::from(*id)),
            ["community", id] => Route::Post(PostId::from(*id)),
            ["mypage", s] => MypageSection::from_slug(s)
                .map(Route::Mypage)
                .unwrap_or(Route::NotFound),
            _ => Route::NotFound,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => String::from("/"),
            Route::Login => String::from("/login"),
            Route::Signup => String::from("/signup"),
            Route::ResetPassword => String::from("/reset-password"),
            Route::Post(id) => format!("/community/{id}"),
            Route::Write => String::from("/community/write"),
            Route::Edit(id) => format!("/community/write/edit/{id}"),
            Route::Mypage(s) => format!("/mypage/{}", s.slug()),
            Route::NotFound => String::from("/404"),
        }
    }

    pub fn requires_auth(&self) -> bool {
        matches!(self, Route::Write | Route::Edit(_) | Route::Mypage(_))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
