pub mod challenge;
pub mod sticker;

pub use challenge::{Challenge, ChallengeType};
pub use sticker::Sticker;
