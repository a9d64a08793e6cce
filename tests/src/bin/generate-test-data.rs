//! Prints a random seed as JSON, for `plants-mock-server --seed-file`.
//!
//! Usage: generate-test-data [NUM_MEMBERS [NUM_POSTS]]

use anyhow::Context;

const NUM_MEMBERS: usize = 5;
const NUM_POSTS: usize = 60;

fn arg(n: usize, default: usize) -> anyhow::Result<usize> {
    match std::env::args().nth(n) {
        None => Ok(default),
        Some(a) => a
            .parse()
            .with_context(|| format!("argument {n} should be a count, got {a:?}")),
    }
}

fn main() -> anyhow::Result<()> {
    let members = arg(1, NUM_MEMBERS)?;
    let posts = arg(2, NUM_POSTS)?;
    anyhow::ensure!(members > 0, "at least one member is needed to author posts");

    let seed = tests::gen_seed(&mut rand::thread_rng(), members, posts);
    let json = serde_json::to_string_pretty(&seed).context("serializing seed")?;
    println!("{json}");
    Ok(())
}
