//! CodeTel Simulator server binary
//!
//! Boot sequence: load configuration from the environment, load the seed
//! (file path or built-in preset), run the initial generation pass, serve.

use anyhow::Context;
use tracing::{info, warn};

use codetel_shared::{Config, RegenMode, RegenerateRequest, Velocity};
use codetel_simulator::{admin, seed_loader, server, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "codetel_simulator=info,tower_http=info".into()),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env();
    info!(
        port = config.server.port,
        velocity = %config.generation.velocity,
        "starting CodeTel simulator"
    );

    let seed = match &config.seed_path {
        Some(path) => seed_loader::load_from_path(path)
            .with_context(|| format!("loading seed from {}", path))?,
        None => seed_loader::builtin_default(),
    };
    info!(
        developers = seed.developers.len(),
        repositories = seed.repositories.len(),
        "seed loaded"
    );

    let state = AppState::new(config.clone(), seed);

    if config.generation.generate_on_start {
        let request = RegenerateRequest {
            mode: RegenMode::Override,
            days: config.generation.days,
            velocity: Velocity::parse(&config.generation.velocity).unwrap_or(Velocity::Medium),
            developers: 0,
            max_commits: config.generation.max_commits,
            rng_seed: None,
        };
        match admin::run_regeneration(&state, &request) {
            Ok(report) => info!(
                commits = report.total_commits,
                prs = report.total_prs,
                duration_ms = report.duration_ms,
                "initial corpus generated"
            ),
            Err(e) => warn!("initial generation failed, serving empty corpus: {}", e),
        }
    }

    server::serve(state).await
}
