pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod matching;
pub mod models;
pub mod sensing;
pub mod server;
pub mod session;
pub mod settings;
pub mod utils;

pub use client::{ChallengeApi, HttpChallengeClient};
pub use config::{GameConfig, ServerConfig};
pub use db::Database;
pub use error::{GameError, GameResult};
pub use models::{Challenge, ChallengeType, Sticker};
pub use session::{ChallengeSession, SessionEvent, SessionPhase, SessionState};
pub use settings::SettingsStore;

use anyhow::Context;
use tokio::net::TcpListener;

/// `info` unless the environment names a filter.
fn logger(env: env_logger::Env<'_>) -> env_logger::Builder {
    env_logger::Builder::from_env(env.default_filter_or("info"))
}

/// Runs the challenge backend until it fails.
pub async fn run() -> anyhow::Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    logger(env_logger::Env::default()).init();

    log::info!("Sticker hunt backend starting up...");

    let config = ServerConfig::from_env();
    let db = Database::new(config.db_path.clone())?;

    if config.seed_catalog {
        db.seed_default_challenges().await?;
    }

    let listener = TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    server::serve(listener, server::AppState { db }).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_filter_defaults_to_info_unless_set() {
        let unset = logger(env_logger::Env::new().filter("STICKERHUNT_TEST_LOG_UNSET")).build();
        assert_eq!(unset.filter(), log::LevelFilter::Info);

        std::env::set_var("STICKERHUNT_TEST_LOG_DEBUG", "debug");
        let set = logger(env_logger::Env::new().filter("STICKERHUNT_TEST_LOG_DEBUG")).build();
        assert_eq!(set.filter(), log::LevelFilter::Debug);
    }
}
