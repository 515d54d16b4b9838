//! Error taxonomy shared by the client, the detector adapter and the session.

use thiserror::Error;

pub type GameResult<T> = Result<T, GameError>;

#[derive(Error, Debug)]
pub enum GameError {
    /// Malformed identifiers (HTTP 400).
    #[error("validation error: {0}")]
    Validation(String),

    /// No unseen challenge left, or an unknown challenge id (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Transport failure or timeout; carries no HTTP status.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("detection model failed to load: {0}")]
    ModelLoad(String),

    #[error("detection failed: {0}")]
    Detection(String),

    /// Unexpected server-side fault (HTTP 500). `detail` is diagnostic only.
    #[error("internal error: {message}")]
    Internal {
        message: String,
        detail: Option<String>,
    },

    #[error("invalid session transition: {0}")]
    InvalidTransition(String),
}

impl GameError {
    pub fn invalid_transition(message: impl Into<String>) -> Self {
        GameError::InvalidTransition(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GameError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let err = GameError::NotFound("No available challenges found".into());
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "not found: No available challenges found");

        let err = GameError::Internal {
            message: "Internal server error".into(),
            detail: Some("disk full".into()),
        };
        assert_eq!(err.to_string(), "internal error: Internal server error");
    }
}
