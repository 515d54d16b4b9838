use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ChallengeType;

/// Reward record for a completed challenge. At most one exists per
/// (user, challenge); unlocking again only refreshes `unlocked_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sticker {
    pub challenge_id: i64,
    pub animal_name: String,
    pub animal_image_url: String,
    #[serde(rename = "type")]
    pub kind: ChallengeType,
    pub target_value: String,
    pub unlocked_at: DateTime<Utc>,
}
