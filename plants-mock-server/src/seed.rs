use anyhow::Context;
use plants_client::api::{CommentPath, MemberId, PostId, PrimaryCategory, SecondaryCategory};

use crate::MockServer;

/// Password of every seeded member
pub const SEED_PASSWORD: &str = "Plants123!";

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct SeedMember {
    pub email: String,
    pub nickname: String,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct SeedComment {
    pub author: usize,
    pub path: String,
    pub content: String,
}

/// Categories are slugs, eg. `daily` / `geranium`
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct SeedPost {
    pub author: usize,
    pub primary: String,
    pub secondary: String,
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub comments: Vec<SeedComment>,
}

/// Community content to start from. Authors are indices into `members` and
/// comments are listed parents first.
#[derive(Clone, Debug, Default, serde::Deserialize, serde::Serialize)]
pub struct Seed {
    pub members: Vec<SeedMember>,
    pub posts: Vec<SeedPost>,
}

impl Seed {
    /// One member with a handful of posts, for trying things out by hand
    pub fn demo() -> Seed {
        let post = |primary: &str, secondary: &str, title: &str, text: &str| SeedPost {
            author: 0,
            primary: String::from(primary),
            secondary: String::from(secondary),
            title: String::from(title),
            text: String::from(text),
            comments: Vec::new(),
        };
        let mut first = post(
            "daily",
            "foliage-wildflower",
            "몬스테라 새 잎이 났어요",
            "찢잎이 드디어 나왔습니다.",
        );
        first.comments = vec![
            SeedComment {
                author: 0,
                path: String::from("0"),
                content: String::from("축하해요!"),
            },
            SeedComment {
                author: 0,
                path: String::from("0.0"),
                content: String::from("감사합니다"),
            },
        ];
        Seed {
            members: vec![SeedMember {
                email: String::from("demo@plants.kr"),
                nickname: String::from("데모"),
            }],
            posts: vec![
                first,
                post(
                    "qna",
                    "watering-soil",
                    "다육이 물 주기 질문",
                    "겨울에는 얼마나 자주 줘야 하나요?",
                ),
                post("tip", "all", "분갈이 흙 배합", "상토 6, 펄라이트 3, 마사토 1로 섞어요."),
            ],
        }
    }

    /// Loads everything into `server`, returning the post ids in seed order
    pub fn apply(&self, server: &mut MockServer) -> anyhow::Result<Vec<PostId>> {
        let ids: Vec<MemberId> = self
            .members
            .iter()
            .map(|m| server.seed_member(&m.email, SEED_PASSWORD, &m.nickname))
            .collect();
        let author = |i: usize| {
            ids.get(i)
                .copied()
                .with_context(|| format!("no seeded member {i}"))
        };
        let mut posts = Vec::with_capacity(self.posts.len());
        for p in &self.posts {
            let primary = PrimaryCategory::from_slug(&p.primary)
                .with_context(|| format!("unknown category {:?}", p.primary))?;
            let secondary = SecondaryCategory::from_slug(&p.secondary)
                .filter(|s| s.belongs_to(primary))
                .with_context(|| format!("{:?} is not a category of {primary}", p.secondary))?;
            let id = server.seed_post(author(p.author)?, primary, secondary, &p.title, &p.text);
            for c in &p.comments {
                CommentPath::parse(&c.path)
                    .with_context(|| format!("bad comment path {:?}", c.path))?;
                server.seed_comment(&id, author(c.author)?, &c.path, &c.content);
            }
            posts.push(id);
        }
        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_applies() {
        let mut server = MockServer::new();
        let posts = Seed::demo().apply(&mut server).unwrap();
        assert_eq!(posts.len(), 3);
        assert_eq!(server.test_num_members(), 1);
    }

    #[test]
    fn bad_author_or_category_is_rejected() {
        let mut seed = Seed::demo();
        seed.posts[0].author = 3;
        assert!(seed.apply(&mut MockServer::new()).is_err());

        let mut seed = Seed::demo();
        seed.posts[1].secondary = String::from("geranium");
        assert!(seed.apply(&mut MockServer::new()).is_err());
    }
}
