use serde::{Deserialize, Serialize};

use crate::{
    error::{GameError, GameResult},
    matching::Rgb,
    models::Challenge,
};

pub const STATUS_WELCOME: &str = "Tap Start Game to begin";
pub const STATUS_STARTING: &str = "Starting game. Getting one challenge...";
pub const STATUS_INIT_FAILED: &str = "Could not initialize camera or model.";
pub const STATUS_NO_CHALLENGES: &str = "No new challenges left. Every sticker is unlocked!";
pub const STATUS_PAUSED: &str = "Game paused. Tap Start Game to continue.";
pub const STATUS_DETECTION_PAUSED: &str = "Detection paused. Tap retry.";
pub const STATUS_NEW_CHALLENGE_FAILED: &str = "Could not load challenge.";
pub const STATUS_LOADING_MODEL: &str = "Loading detection model...";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    /// Camera off, no polling.
    #[default]
    Idle,
    /// Fetching a challenge and, for object challenges, loading the model.
    Initializing,
    /// Polling loop active.
    Detecting,
    /// A tick failed; the loop is gone until `retry`.
    DetectionPaused,
    /// Target found, unlock being recorded. Camera is already off.
    Submitting,
    /// Initialization failed; retry-eligible, no loop running.
    Error,
}

/// Client-owned session state. Every transition returns a new value; the
/// controller swaps it in atomically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub phase: SessionPhase,
    pub camera_enabled: bool,
    pub challenge: Option<Challenge>,
    pub is_submitting: bool,
    pub is_loading_model: bool,
    pub last_sample: Option<Rgb>,
    pub status: String,
    /// Bumped whenever in-flight work must be discarded (start, stop,
    /// submission, teardown).
    #[serde(skip)]
    pub epoch: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Idle,
            camera_enabled: false,
            challenge: None,
            is_submitting: false,
            is_loading_model: false,
            last_sample: None,
            status: STATUS_WELCOME.to_string(),
            epoch: 0,
        }
    }
}

/// Status text for a failed initialization.
pub fn failure_status(err: &GameError) -> &'static str {
    if err.is_not_found() {
        STATUS_NO_CHALLENGES
    } else {
        STATUS_INIT_FAILED
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The polling loop may run only while this holds.
    pub fn loop_may_run(&self) -> bool {
        self.phase == SessionPhase::Detecting
            && self.camera_enabled
            && self.challenge.is_some()
            && !self.is_submitting
    }

    fn check_epoch(&self, epoch: u64) -> GameResult<()> {
        if epoch == self.epoch {
            Ok(())
        } else {
            Err(GameError::invalid_transition(format!(
                "stale result for epoch {epoch} (current {})",
                self.epoch
            )))
        }
    }

    fn expect_phase(&self, allowed: &[SessionPhase], action: &str) -> GameResult<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(GameError::invalid_transition(format!(
                "cannot {action} while {:?}",
                self.phase
            )))
        }
    }

    pub fn start(&self) -> GameResult<Self> {
        self.expect_phase(&[SessionPhase::Idle], "start")?;
        if self.is_submitting {
            return Err(GameError::invalid_transition("cannot start while submitting"));
        }

        Ok(Self {
            phase: SessionPhase::Initializing,
            camera_enabled: true,
            challenge: None,
            is_submitting: false,
            is_loading_model: false,
            last_sample: None,
            status: STATUS_STARTING.to_string(),
            epoch: self.epoch + 1,
        })
    }

    /// Re-enter initialization from `Error` without toggling the camera.
    pub fn restart_initialization(&self) -> GameResult<Self> {
        self.expect_phase(&[SessionPhase::Error], "retry initialization")?;
        Ok(Self {
            phase: SessionPhase::Initializing,
            challenge: None,
            last_sample: None,
            is_loading_model: false,
            status: STATUS_STARTING.to_string(),
            epoch: self.epoch + 1,
            ..self.clone()
        })
    }

    /// A fetched challenge arrives. While initializing it becomes the
    /// active target; while idle it is shown as the next round.
    pub fn challenge_loaded(&self, epoch: u64, challenge: Challenge) -> GameResult<Self> {
        self.check_epoch(epoch)?;
        let status = match self.phase {
            SessionPhase::Initializing => challenge.prompt(),
            SessionPhase::Idle => format!("Ready: {} Tap Start Game.", challenge.prompt()),
            _ => {
                return Err(GameError::invalid_transition(format!(
                    "unexpected challenge while {:?}",
                    self.phase
                )))
            }
        };

        Ok(Self {
            challenge: Some(challenge),
            last_sample: None,
            status,
            ..self.clone()
        })
    }

    pub fn model_loading(&self, epoch: u64, loading: bool) -> GameResult<Self> {
        self.check_epoch(epoch)?;
        self.expect_phase(&[SessionPhase::Initializing], "load the model")?;
        let status = if loading {
            STATUS_LOADING_MODEL.to_string()
        } else {
            self.challenge
                .as_ref()
                .map(Challenge::prompt)
                .unwrap_or_else(|| self.status.clone())
        };
        Ok(Self {
            is_loading_model: loading,
            status,
            ..self.clone()
        })
    }

    /// Camera flag stays on; the user retries or stops.
    pub fn initialization_failed(&self, epoch: u64, status: &str) -> GameResult<Self> {
        self.check_epoch(epoch)?;
        self.expect_phase(&[SessionPhase::Initializing], "fail initialization")?;
        Ok(Self {
            phase: SessionPhase::Error,
            is_loading_model: false,
            status: status.to_string(),
            ..self.clone()
        })
    }

    pub fn detection_started(&self, epoch: u64) -> GameResult<Self> {
        self.check_epoch(epoch)?;
        self.expect_phase(
            &[SessionPhase::Initializing, SessionPhase::DetectionPaused],
            "start detection",
        )?;
        let Some(challenge) = self.challenge.as_ref() else {
            return Err(GameError::invalid_transition("no challenge to detect"));
        };
        if !self.camera_enabled || self.is_submitting {
            return Err(GameError::invalid_transition("camera is not available"));
        }

        Ok(Self {
            phase: SessionPhase::Detecting,
            is_loading_model: false,
            status: challenge.prompt(),
            ..self.clone()
        })
    }

    pub fn sampled(&self, epoch: u64, sample: Option<Rgb>) -> GameResult<Self> {
        self.check_epoch(epoch)?;
        self.expect_phase(&[SessionPhase::Detecting], "record a sample")?;
        Ok(Self {
            last_sample: sample,
            ..self.clone()
        })
    }

    pub fn detection_paused(&self, epoch: u64) -> GameResult<Self> {
        self.check_epoch(epoch)?;
        self.expect_phase(&[SessionPhase::Detecting], "pause detection")?;
        Ok(Self {
            phase: SessionPhase::DetectionPaused,
            status: STATUS_DETECTION_PAUSED.to_string(),
            ..self.clone()
        })
    }

    /// Only one submission at a time: fails while one is in flight. The
    /// camera goes off immediately so completion shows before the server
    /// confirms.
    pub fn begin_submission(&self) -> GameResult<Self> {
        if self.is_submitting {
            return Err(GameError::invalid_transition("submission already in flight"));
        }
        self.expect_phase(&[SessionPhase::Detecting], "submit")?;
        let Some(challenge) = self.challenge.as_ref() else {
            return Err(GameError::invalid_transition("no challenge to submit"));
        };

        Ok(Self {
            phase: SessionPhase::Submitting,
            camera_enabled: false,
            is_submitting: true,
            status: format!(
                "Success! You found {}. Tap Start Game to play again.",
                challenge.target_value
            ),
            epoch: self.epoch + 1,
            ..self.clone()
        })
    }

    /// Always applicable; clears the in-flight flag on every exit path.
    pub fn submission_finished(&self) -> Self {
        let phase = if self.phase == SessionPhase::Submitting {
            SessionPhase::Idle
        } else {
            self.phase
        };
        Self {
            phase,
            is_submitting: false,
            ..self.clone()
        }
    }

    pub fn stop(&self) -> GameResult<Self> {
        self.expect_phase(
            &[
                SessionPhase::Initializing,
                SessionPhase::Detecting,
                SessionPhase::DetectionPaused,
                SessionPhase::Error,
            ],
            "stop",
        )?;
        Ok(Self {
            phase: SessionPhase::Idle,
            camera_enabled: false,
            is_loading_model: false,
            status: STATUS_PAUSED.to_string(),
            epoch: self.epoch + 1,
            ..self.clone()
        })
    }

    /// Owner went away: cancel everything regardless of phase. An in-flight
    /// submission still clears its own flag when it completes.
    pub fn torn_down(&self) -> Self {
        let phase = if self.is_submitting {
            SessionPhase::Submitting
        } else {
            SessionPhase::Idle
        };
        Self {
            phase,
            camera_enabled: false,
            is_loading_model: false,
            epoch: self.epoch + 1,
            ..self.clone()
        }
    }

    pub fn can_fetch_new_challenge(&self) -> GameResult<()> {
        if self.camera_enabled || self.is_submitting || self.phase != SessionPhase::Idle {
            return Err(GameError::invalid_transition(
                "finish or stop the current game before fetching a new challenge",
            ));
        }
        Ok(())
    }

    pub fn new_challenge_failed(&self, epoch: u64) -> GameResult<Self> {
        self.check_epoch(epoch)?;
        Ok(Self {
            status: STATUS_NEW_CHALLENGE_FAILED.to_string(),
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChallengeType;

    fn challenge(kind: ChallengeType, target: &str) -> Challenge {
        Challenge {
            id: 7,
            kind,
            target_value: target.into(),
            animal_name: "Fox".into(),
            animal_image_url: "/stickers/fox.png".into(),
            audio_prompt_url: None,
        }
    }

    fn detecting() -> SessionState {
        let state = SessionState::new().start().unwrap();
        let state = state
            .challenge_loaded(state.epoch, challenge(ChallengeType::Color, "red"))
            .unwrap();
        state.detection_started(state.epoch).unwrap()
    }

    #[test]
    fn start_clears_previous_round() {
        let mut idle = SessionState::new();
        idle.challenge = Some(challenge(ChallengeType::Color, "blue"));
        idle.last_sample = Some(Rgb::new(1.0, 2.0, 3.0));

        let started = idle.start().unwrap();
        assert_eq!(started.phase, SessionPhase::Initializing);
        assert!(started.camera_enabled);
        assert!(started.challenge.is_none());
        assert!(started.last_sample.is_none());
        assert_eq!(started.epoch, idle.epoch + 1);
        assert!(!started.loop_may_run());

        assert!(started.start().is_err());
    }

    #[test]
    fn loop_runs_only_while_detecting() {
        let state = detecting();
        assert!(state.loop_may_run());
        assert_eq!(state.status, "Find something red!");

        let paused = state.detection_paused(state.epoch).unwrap();
        assert!(!paused.loop_may_run());
        assert_eq!(paused.status, STATUS_DETECTION_PAUSED);

        let resumed = paused.detection_started(paused.epoch).unwrap();
        assert!(resumed.loop_may_run());
    }

    #[test]
    fn stale_results_are_rejected() {
        let started = SessionState::new().start().unwrap();
        let stopped = started.stop().unwrap();
        let late = stopped.challenge_loaded(started.epoch, challenge(ChallengeType::Color, "red"));
        assert!(matches!(late, Err(GameError::InvalidTransition(_))));
    }

    #[test]
    fn submission_is_exclusive_and_turns_camera_off() {
        let state = detecting();
        let submitting = state.begin_submission().unwrap();
        assert!(submitting.is_submitting);
        assert!(!submitting.camera_enabled);
        assert_eq!(submitting.phase, SessionPhase::Submitting);
        assert!(submitting.status.starts_with("Success! You found red."));
        assert!(!submitting.loop_may_run());

        assert!(submitting.begin_submission().is_err());

        let done = submitting.submission_finished();
        assert_eq!(done.phase, SessionPhase::Idle);
        assert!(!done.is_submitting);
        assert!(done.start().is_ok());
    }

    #[test]
    fn failed_initialization_keeps_camera_flag() {
        let started = SessionState::new().start().unwrap();
        let failed = started
            .initialization_failed(started.epoch, failure_status(&GameError::NotFound("none".into())))
            .unwrap();
        assert_eq!(failed.phase, SessionPhase::Error);
        assert!(failed.camera_enabled);
        assert!(!failed.loop_may_run());
        assert_eq!(failed.status, STATUS_NO_CHALLENGES);

        let retried = failed.restart_initialization().unwrap();
        assert_eq!(retried.phase, SessionPhase::Initializing);
        assert_eq!(retried.epoch, failed.epoch + 1);

        let stopped = failed.stop().unwrap();
        assert_eq!(stopped.phase, SessionPhase::Idle);
        assert!(!stopped.camera_enabled);
    }

    #[test]
    fn new_challenge_only_while_idle() {
        let idle = SessionState::new();
        assert!(idle.can_fetch_new_challenge().is_ok());

        let ready = idle
            .challenge_loaded(idle.epoch, challenge(ChallengeType::Object, "cup"))
            .unwrap();
        assert_eq!(ready.status, "Ready: Find a cup! Tap Start Game.");
        assert!(!ready.camera_enabled);

        assert!(detecting().can_fetch_new_challenge().is_err());
        assert!(detecting()
            .begin_submission()
            .unwrap()
            .can_fetch_new_challenge()
            .is_err());
    }

    #[test]
    fn stop_is_rejected_when_not_active() {
        assert!(SessionState::new().stop().is_err());
        assert!(detecting().begin_submission().unwrap().stop().is_err());
    }

    #[test]
    fn teardown_preserves_in_flight_submission() {
        let submitting = detecting().begin_submission().unwrap();
        let gone = submitting.torn_down();
        assert!(gone.is_submitting);
        assert_eq!(gone.submission_finished().phase, SessionPhase::Idle);

        let gone = detecting().torn_down();
        assert_eq!(gone.phase, SessionPhase::Idle);
        assert!(!gone.camera_enabled);
    }
}
