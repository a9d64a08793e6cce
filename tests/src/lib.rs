//! Fixtures shared by the integration tests and the sample data generator.

use std::{collections::HashMap, net::SocketAddr};

use anyhow::Context;
use plants_client::{
    api::{generate_comment_path, validate::LoginForm, PrimaryCategory, SecondaryCategory},
    Plants,
};
use plants_mock_server::{
    MockServer, Seed, SeedComment, SeedMember, SeedPost, SharedServer, SEED_PASSWORD,
};
use rand::{seq::SliceRandom, Rng};

/// A mock backend served on an ephemeral port for the duration of a test
pub struct Backend {
    pub addr: SocketAddr,
    pub server: SharedServer,
}

impl Backend {
    pub async fn start(setup: impl FnOnce(&mut MockServer)) -> anyhow::Result<Backend> {
        let mut server = MockServer::new();
        setup(&mut server);
        let (addr, server) = plants_mock_server::spawn(server).await?;
        Ok(Backend { addr, server })
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// A fresh client with its own cookie jar and stores
    pub fn client(&self) -> anyhow::Result<Plants> {
        Plants::new(&self.url()).context("creating client")
    }

    /// A client signed in as a seeded member, with remember-me set
    pub async fn signed_in(&self, email: &str) -> anyhow::Result<Plants> {
        let plants = self.client()?;
        let form = LoginForm {
            email: String::from(email),
            password: String::from(SEED_PASSWORD),
            remember_me: true,
        };
        plants
            .login(&form)
            .await
            .with_context(|| format!("logging in as {email}"))?;
        Ok(plants)
    }
}

const TITLE_WORDS: usize = 4;
const TEXT_WORDS: usize = 25;
const COMMENT_WORDS: usize = 8;
const MAX_COMMENTS_PER_POST: usize = 6;

fn gen_comments(rng: &mut impl Rng, members: usize) -> Vec<SeedComment> {
    let mut comments: Vec<SeedComment> = Vec::new();
    let mut replies: HashMap<Option<String>, usize> = HashMap::new();
    for _ in 0..rng.gen_range(0..=MAX_COMMENTS_PER_POST) {
        // roughly half are replies
        let parent = match rng.gen_bool(0.5) {
            true => comments.choose(rng).map(|c| c.path.clone()),
            false => None,
        };
        let siblings = replies.entry(parent.clone()).or_default();
        let path = generate_comment_path(parent.as_deref(), *siblings);
        *siblings += 1;
        comments.push(SeedComment {
            author: rng.gen_range(0..members),
            path,
            content: lipsum::lipsum_words_with_rng(&mut *rng, COMMENT_WORDS),
        });
    }
    comments
}

/// Random members and posts, each post with a random comment tree. Member
/// `i` signs in as `member{i}@plants.kr`.
pub fn gen_seed(rng: &mut impl Rng, members: usize, posts: usize) -> Seed {
    let members: Vec<SeedMember> = (0..members)
        .map(|i| SeedMember {
            email: format!("member{i}@plants.kr"),
            nickname: format!("식물{i}"),
        })
        .collect();
    let posts = (0..posts)
        .map(|_| {
            let primary = *PrimaryCategory::ALL[1..]
                .choose(rng)
                .unwrap_or(&PrimaryCategory::Daily);
            let secondary = *primary
                .secondaries()
                .choose(rng)
                .unwrap_or(&SecondaryCategory::All);
            SeedPost {
                author: rng.gen_range(0..members.len()),
                primary: String::from(primary.slug()),
                secondary: String::from(secondary.slug()),
                title: lipsum::lipsum_words_with_rng(&mut *rng, TITLE_WORDS),
                text: lipsum::lipsum_words_with_rng(&mut *rng, TEXT_WORDS),
                comments: gen_comments(rng, members.len()),
            }
        })
        .collect();
    Seed { members, posts }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn generated_comments_come_after_their_parent() {
        let mut rng = StdRng::seed_from_u64(7);
        let seed = gen_seed(&mut rng, 3, 20);
        assert_eq!(seed.posts.len(), 20);
        for p in &seed.posts {
            assert!(p.author < 3);
            let paths: Vec<&str> = p.comments.iter().map(|c| c.path.as_str()).collect();
            for (i, c) in p.comments.iter().enumerate() {
                if let Some((parent, _)) = c.path.rsplit_once('.') {
                    assert!(paths[..i].contains(&parent), "{} before its parent", c.path);
                }
                assert!(!paths[..i].contains(&c.path.as_str()), "duplicate {}", c.path);
            }
        }
    }

    #[test]
    fn generated_seed_loads_into_server() {
        let mut rng = StdRng::seed_from_u64(1);
        let seed = gen_seed(&mut rng, 2, 3);
        let mut server = MockServer::new();
        assert_eq!(seed.apply(&mut server).unwrap().len(), 3);
        assert_eq!(server.test_num_members(), 2);
    }
}
