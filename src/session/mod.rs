mod controller;
mod events;
mod loop_worker;
mod scheduler;
mod state;

pub use controller::ChallengeSession;
pub use events::{SessionEvent, SUCCESS_AUDIO_CUE};
pub use loop_worker::TickOutcome;
pub use scheduler::{FrameClock, FrameScheduler, ImmediateScheduler};
pub use state::{SessionPhase, SessionState};
