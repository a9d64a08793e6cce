use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context;
use parking_lot::Mutex;
use plants_mock_server::{router, MockServer, Seed, SEED_PASSWORD};
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, StructOpt)]
#[structopt(name = "plants-mock-server", about = "In-memory backend for local runs")]
struct Opt {
    /// Address to listen on
    #[structopt(long, default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// Start with a demo member (demo@plants.kr) and a few posts
    #[structopt(long)]
    seed: bool,

    /// Start with the content of a JSON seed, eg. from generate-test-data
    #[structopt(long, conflicts_with = "seed", parse(from_os_str))]
    seed_file: Option<PathBuf>,
}

fn load_seed(opt: &Opt) -> anyhow::Result<Option<Seed>> {
    if opt.seed {
        return Ok(Some(Seed::demo()));
    }
    let Some(path) = &opt.seed_file else {
        return Ok(None);
    };
    let json = std::fs::read(path).with_context(|| format!("reading seed file {path:?}"))?;
    let seed = serde_json::from_slice(&json).with_context(|| format!("parsing seed file {path:?}"))?;
    Ok(Some(seed))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let opt = Opt::from_args();

    let mut server = MockServer::new();
    if let Some(seed) = load_seed(&opt)? {
        let posts = seed.apply(&mut server).context("seeding mock server")?;
        tracing::info!(
            members = seed.members.len(),
            posts = posts.len(),
            password = SEED_PASSWORD,
            "seeded"
        );
    }
    let app = router(Arc::new(Mutex::new(server)));

    let listener = tokio::net::TcpListener::bind(opt.listen)
        .await
        .with_context(|| format!("binding {}", opt.listen))?;
    tracing::info!("listening on {}", opt.listen);
    axum::serve(listener, app)
        .await
        .context("serving axum webserver")
}
