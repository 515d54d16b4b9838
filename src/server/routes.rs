use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    response::Json,
};
use log::info;
use serde::Serialize;
use serde_json::Value;
use uuid::{Uuid, Variant};

use crate::models::{Challenge, Sticker};

use super::{error::ApiError, AppState};

/// Raw query pairs in request order; repeated keys are kept.
pub type QueryPairs = Result<Query<Vec<(String, String)>>, QueryRejection>;

/// First value for `key`, like `URLSearchParams.get`.
fn query_param(pairs: QueryPairs, key: &str) -> Result<Option<String>, ApiError> {
    let Query(pairs) =
        pairs.map_err(|_| ApiError::BadRequest("malformed query string".into()))?;
    Ok(pairs
        .into_iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value))
}

#[derive(Serialize)]
pub struct ChallengeResponse {
    challenge: Challenge,
}

#[derive(Serialize)]
pub struct FoundResponse {
    ok: bool,
    unlocked: Sticker,
}

#[derive(Serialize)]
pub struct ProgressResponse {
    stickers: Vec<Sticker>,
}

/// Hyphenated RFC 4122 UUID, versions 1 through 5, any letter case.
pub fn is_uuid(value: &str) -> bool {
    if value.len() != 36 {
        return false;
    }
    match Uuid::try_parse(value) {
        Ok(uuid) => {
            matches!(uuid.get_version_num(), 1..=5) && uuid.get_variant() == Variant::RFC4122
        }
        Err(_) => false,
    }
}

fn require_uuid(value: Option<&str>) -> Result<String, ApiError> {
    match value {
        Some(id) if is_uuid(id) => Ok(id.to_string()),
        _ => Err(ApiError::BadRequest("user_id must be a UUID".into())),
    }
}

/// Accepts a JSON integer or an all-digit string.
fn parse_challenge_id(value: Option<&Value>) -> Option<i64> {
    let id = match value? {
        Value::Number(number) => number.as_i64()?,
        Value::String(raw) => raw.trim().parse().ok()?,
        _ => return None,
    };
    (id > 0).then_some(id)
}

pub async fn get_challenge(
    State(state): State<AppState>,
    query: QueryPairs,
) -> Result<Json<ChallengeResponse>, ApiError> {
    let user_id = match query_param(query, "user_id")?.filter(|id| !id.is_empty()) {
        Some(id) => Some(require_uuid(Some(&id))?),
        None => None,
    };

    let challenge = state
        .db
        .random_unseen_challenge(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No available challenges found".into()))?;

    Ok(Json(ChallengeResponse { challenge }))
}

pub async fn post_found(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<FoundResponse>, ApiError> {
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|_| ApiError::BadRequest("request body must be JSON".into()))?;

    let user_id = require_uuid(payload.get("user_id").and_then(Value::as_str))?;
    let challenge_id = parse_challenge_id(payload.get("challenge_id"))
        .ok_or_else(|| ApiError::BadRequest("challenge_id must be a positive integer".into()))?;

    let unlocked = state
        .db
        .save_found(&user_id, challenge_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Challenge not found".into()))?;

    info!("User {user_id} unlocked challenge {challenge_id}");
    Ok(Json(FoundResponse { ok: true, unlocked }))
}

pub async fn get_progress(
    State(state): State<AppState>,
    query: QueryPairs,
) -> Result<Json<ProgressResponse>, ApiError> {
    let user_id = require_uuid(query_param(query, "user_id")?.as_deref())?;
    let stickers = state.db.unlocked_stickers(&user_id).await?;
    Ok(Json(ProgressResponse { stickers }))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".into())
}
