mod http;

pub use http::HttpChallengeClient;

use async_trait::async_trait;

use crate::{
    error::GameResult,
    models::{Challenge, Sticker},
};

/// Backend operations the game needs. The HTTP client is the production
/// implementation; sessions only see this trait.
#[async_trait]
pub trait ChallengeApi: Send + Sync {
    /// Random challenge the user has not unlocked yet.
    async fn fetch_challenge(&self, user_id: Option<&str>) -> GameResult<Challenge>;

    /// Records the unlock and returns the sticker.
    async fn submit_found(&self, user_id: &str, challenge_id: i64) -> GameResult<Sticker>;

    /// All unlocked stickers, most recent first.
    async fn fetch_progress(&self, user_id: &str) -> GameResult<Vec<Sticker>>;
}
