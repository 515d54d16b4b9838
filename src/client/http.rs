use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    config::GameConfig,
    error::{GameError, GameResult},
    models::{Challenge, Sticker},
    settings::SettingsStore,
};

use super::ChallengeApi;

#[derive(Deserialize)]
struct ChallengeEnvelope {
    challenge: Challenge,
}

#[derive(Deserialize)]
struct FoundEnvelope {
    unlocked: Sticker,
}

#[derive(Deserialize)]
struct ProgressEnvelope {
    #[serde(default)]
    stickers: Vec<Sticker>,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

#[derive(Serialize)]
struct FoundRequest<'a> {
    user_id: &'a str,
    challenge_id: i64,
}

pub struct HttpChallengeClient {
    client: Client,
    base_url: String,
}

impl HttpChallengeClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> GameResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Client for the configured backend with the configured timeout.
    pub fn from_settings(settings: &SettingsStore, config: &GameConfig) -> GameResult<Self> {
        Self::new(settings.api_base_url(), config.request_timeout)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl ChallengeApi for HttpChallengeClient {
    async fn fetch_challenge(&self, user_id: Option<&str>) -> GameResult<Challenge> {
        let mut request = self.client.get(self.url("/api/challenge"));
        if let Some(user_id) = user_id.filter(|id| !id.is_empty()) {
            request = request.query(&[("user_id", user_id)]);
        }

        let envelope: ChallengeEnvelope = read_json(request.send().await?).await?;
        debug!(
            "Fetched challenge {} ({} {})",
            envelope.challenge.id,
            envelope.challenge.kind.as_str(),
            envelope.challenge.target_value
        );
        Ok(envelope.challenge)
    }

    async fn submit_found(&self, user_id: &str, challenge_id: i64) -> GameResult<Sticker> {
        let response = self
            .client
            .post(self.url("/api/found"))
            .json(&FoundRequest {
                user_id,
                challenge_id,
            })
            .send()
            .await?;

        let envelope: FoundEnvelope = read_json(response).await?;
        Ok(envelope.unlocked)
    }

    async fn fetch_progress(&self, user_id: &str) -> GameResult<Vec<Sticker>> {
        let response = self
            .client
            .get(self.url("/api/progress"))
            .query(&[("user_id", user_id)])
            .send()
            .await?;

        let envelope: ProgressEnvelope = read_json(response).await?;
        Ok(envelope.stickers)
    }
}

/// Maps the backend's `{error, detail}` responses onto [`GameError`].
async fn read_json<T: DeserializeOwned>(response: Response) -> GameResult<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body: ErrorBody = response.json().await.unwrap_or_default();
    let message = body
        .error
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    warn!("Backend responded {status}: {message}");
    Err(match status {
        StatusCode::BAD_REQUEST => GameError::Validation(message),
        StatusCode::NOT_FOUND => GameError::NotFound(message),
        _ => GameError::Internal {
            message,
            detail: body.detail,
        },
    })
}
