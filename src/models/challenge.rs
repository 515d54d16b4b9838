use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeType {
    Color,
    Object,
}

impl ChallengeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeType::Color => "color",
            ChallengeType::Object => "object",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "color" => Some(ChallengeType::Color),
            "object" => Some(ChallengeType::Object),
            _ => None,
        }
    }
}

/// A server-issued target the player has to find with the camera.
///
/// Immutable once handed to a session; `id` is the identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Challenge {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ChallengeType,
    pub target_value: String,
    pub animal_name: String,
    pub animal_image_url: String,
    #[serde(default)]
    pub audio_prompt_url: Option<String>,
}

impl Challenge {
    /// Text shown while the round is running.
    pub fn prompt(&self) -> String {
        match self.kind {
            ChallengeType::Color => format!("Find something {}!", self.target_value),
            ChallengeType::Object => format!("Find a {}!", self.target_value),
        }
    }
}
