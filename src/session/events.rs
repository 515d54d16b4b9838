use crate::models::Sticker;

use super::state::SessionState;

pub const SUCCESS_AUDIO_CUE: &str = "/audio/success.mp3";

/// Notifications for whatever renders the game. Delivered over a broadcast
/// channel; slow receivers may observe `Lagged`.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged(SessionState),
    Toast(String),
    /// URL of a clip to play.
    AudioCue(String),
    StickerUnlocked(Sticker),
    SubmissionFailed { challenge_id: i64, message: String },
}
