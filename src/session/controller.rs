use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};
use tokio::{sync::broadcast, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    client::ChallengeApi,
    config::GameConfig,
    error::{GameError, GameResult},
    matching::{detections_match, is_color_match, Rgb},
    models::{Challenge, ChallengeType, Sticker},
    sensing::{average_color, FrameSource, ObjectDetector},
};

use super::{
    events::{SessionEvent, SUCCESS_AUDIO_CUE},
    loop_worker::{detection_loop, TickOutcome},
    scheduler::{FrameClock, FrameScheduler},
    state::{failure_status, SessionPhase, SessionState},
};

const EVENT_CAPACITY: usize = 64;

const TOAST_STARTED: &str = "Game started. Find this one target.";
const TOAST_FINISHED: &str = "Success! Game finished.";
const TOAST_PAUSED: &str = "Game paused.";
const TOAST_BUSY: &str = "Finish this game first, or stop camera.";

struct DetectionLoop {
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Drives one game: fetch a challenge, poll frames until the target is in
/// view, record the unlock. Cheap to clone; clones share the session.
#[derive(Clone)]
pub struct ChallengeSession {
    state: Arc<Mutex<SessionState>>,
    api: Arc<dyn ChallengeApi>,
    detector: Arc<ObjectDetector>,
    camera: Arc<dyn FrameSource>,
    scheduler: Arc<dyn FrameScheduler>,
    config: GameConfig,
    user_id: Option<String>,
    events: broadcast::Sender<SessionEvent>,
    detection: Arc<Mutex<Option<DetectionLoop>>>,
}

/// Clears the in-flight submission flag however `submit_found` exits.
struct SubmissionGuard<'a> {
    session: &'a ChallengeSession,
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        self.session.finish_submission();
    }
}

impl ChallengeSession {
    /// Without a `user_id` the game still plays, but unlocks are not
    /// recorded.
    pub fn new(
        api: Arc<dyn ChallengeApi>,
        detector: Arc<ObjectDetector>,
        camera: Arc<dyn FrameSource>,
        config: GameConfig,
        user_id: Option<String>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let scheduler: Arc<dyn FrameScheduler> = Arc::new(FrameClock::new(config.frame_interval));

        Self {
            state: Arc::new(Mutex::new(SessionState::new())),
            api,
            detector,
            camera,
            scheduler,
            config,
            user_id,
            events,
            detection: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn FrameScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn snapshot(&self) -> SessionState {
        self.lock_state().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn detector(&self) -> &Arc<ObjectDetector> {
        &self.detector
    }

    /// True while a polling loop task is alive.
    pub fn detection_active(&self) -> bool {
        self.lock_detection()
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    pub(super) fn scheduler(&self) -> &Arc<dyn FrameScheduler> {
        &self.scheduler
    }

    /// Turns the camera on and prepares a round. Resolves once the loop is
    /// running or initialization has failed; the returned state says which.
    pub async fn start(&self) -> GameResult<SessionState> {
        let state = self.transition(|s| s.start())?;
        info!("Game started (epoch {})", state.epoch);
        self.emit(SessionEvent::Toast(TOAST_STARTED.into()));
        Ok(self.initialize(state.epoch).await)
    }

    pub fn stop(&self) -> GameResult<SessionState> {
        let state = self.transition(|s| s.stop())?;
        self.halt_detection();
        info!("Game paused");
        self.emit(SessionEvent::Toast(TOAST_PAUSED.into()));
        Ok(state)
    }

    /// Re-runs initialization after an error, or restarts a paused loop.
    pub async fn retry(&self) -> GameResult<SessionState> {
        match self.snapshot().phase {
            SessionPhase::Error => {
                let state = self.transition(|s| s.restart_initialization())?;
                info!("Retrying initialization (epoch {})", state.epoch);
                Ok(self.initialize(state.epoch).await)
            }
            SessionPhase::DetectionPaused => {
                let state = self.transition(|s| s.detection_started(s.epoch))?;
                info!("Resuming detection (epoch {})", state.epoch);
                self.spawn_detection(state.epoch);
                Ok(state)
            }
            phase => Err(GameError::invalid_transition(format!(
                "nothing to retry while {phase:?}"
            ))),
        }
    }

    /// Fetch a different challenge to show while idle.
    pub async fn new_challenge(&self) -> GameResult<Challenge> {
        let checked = {
            let state = self.lock_state();
            let epoch = state.epoch;
            state.can_fetch_new_challenge().map(|()| epoch)
        };
        let epoch = match checked {
            Ok(epoch) => epoch,
            Err(err) => {
                self.emit(SessionEvent::Toast(TOAST_BUSY.into()));
                return Err(err);
            }
        };

        match self.api.fetch_challenge(self.user_id.as_deref()).await {
            Ok(challenge) => {
                self.transition(|s| s.challenge_loaded(epoch, challenge.clone()))?;
                self.announce(&challenge);
                Ok(challenge)
            }
            Err(err) => {
                warn!("Fetching a new challenge failed: {err}");
                let _ = self.transition(|s| s.new_challenge_failed(epoch));
                Err(err)
            }
        }
    }

    /// Records the current challenge as found. Calls made while another
    /// submission is in flight, or with nothing to submit, are ignored and
    /// return `Ok(None)`.
    ///
    /// Completion is shown before the server answers and is not rolled back
    /// on failure; a `SubmissionFailed` event is emitted instead.
    pub async fn submit_found(&self) -> GameResult<Option<Sticker>> {
        let state = match self.transition(|s| s.begin_submission()) {
            Ok(state) => state,
            Err(err) => {
                debug!("Ignoring submission: {err}");
                return Ok(None);
            }
        };
        let guard = SubmissionGuard { session: self };
        self.halt_detection();

        let Some(challenge) = state.challenge else {
            return Ok(None);
        };
        self.emit(SessionEvent::Toast(TOAST_FINISHED.into()));

        let result = match self.user_id.as_deref() {
            Some(user_id) => self.api.submit_found(user_id, challenge.id).await.map(Some),
            None => {
                debug!("No player identity; unlock not recorded");
                Ok(None)
            }
        };
        drop(guard);

        match result {
            Ok(sticker) => {
                self.emit(SessionEvent::AudioCue(SUCCESS_AUDIO_CUE.into()));
                if let Some(sticker) = &sticker {
                    info!("Unlocked sticker {} for challenge {}", sticker.animal_name, challenge.id);
                    self.emit(SessionEvent::StickerUnlocked(sticker.clone()));
                }
                Ok(sticker)
            }
            Err(err) => {
                warn!("Recording unlock for challenge {} failed: {err}", challenge.id);
                self.emit(SessionEvent::SubmissionFailed {
                    challenge_id: challenge.id,
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Owner teardown: cancels the loop and discards pending results.
    pub fn shutdown(&self) {
        let snapshot = {
            let mut guard = self.lock_state();
            *guard = guard.torn_down();
            guard.clone()
        };
        self.halt_detection();
        self.emit(SessionEvent::StateChanged(snapshot));
    }

    /// Evaluates the current frame against the active challenge.
    pub(super) async fn tick(
        &self,
        epoch: u64,
        cancel_token: &CancellationToken,
    ) -> GameResult<TickOutcome> {
        let challenge = {
            let state = self.lock_state();
            if cancel_token.is_cancelled() || state.epoch != epoch || !state.loop_may_run() {
                return Ok(TickOutcome::Halted);
            }
            match state.challenge.clone() {
                Some(challenge) => challenge,
                None => return Ok(TickOutcome::Halted),
            }
        };

        // Stream not ready yet.
        let Some(frame) = self.camera.current_frame() else {
            return Ok(TickOutcome::Continue);
        };

        let found = match challenge.kind {
            ChallengeType::Color => {
                let sample = average_color(frame.as_ref(), self.config.center_sample_size);
                self.record_sample(epoch, sample);
                sample.is_some_and(|avg| is_color_match(avg, &challenge.target_value))
            }
            ChallengeType::Object => {
                let detections = self.detector.detect(frame.as_ref()).await?;
                detections_match(
                    &detections,
                    &challenge.target_value,
                    self.config.object_confidence_threshold,
                )
            }
        };

        if cancel_token.is_cancelled() || !self.is_current(epoch) {
            return Ok(TickOutcome::Halted);
        }
        Ok(if found {
            TickOutcome::Matched
        } else {
            TickOutcome::Continue
        })
    }

    pub(super) fn pause_detection(&self, epoch: u64) {
        if self.transition(|s| s.detection_paused(epoch)).is_ok() {
            info!("Detection paused (epoch {epoch})");
        }
    }

    async fn initialize(&self, epoch: u64) -> SessionState {
        if let Err(err) = self.prepare_round(epoch).await {
            if self.is_current(epoch) {
                warn!("Initialization failed: {err}");
                let _ = self.transition(|s| s.initialization_failed(epoch, failure_status(&err)));
            } else {
                debug!("Discarding stale initialization result: {err}");
            }
        }
        self.snapshot()
    }

    async fn prepare_round(&self, epoch: u64) -> GameResult<()> {
        let challenge = self.api.fetch_challenge(self.user_id.as_deref()).await?;
        self.transition(|s| s.challenge_loaded(epoch, challenge.clone()))?;
        self.announce(&challenge);

        if challenge.kind == ChallengeType::Object {
            self.transition(|s| s.model_loading(epoch, true))?;
            let loaded = self.detector.ensure_loaded().await;
            let _ = self.transition(|s| s.model_loading(epoch, false));
            loaded?;
        }

        self.transition(|s| s.detection_started(epoch))?;
        self.spawn_detection(epoch);
        Ok(())
    }

    fn announce(&self, challenge: &Challenge) {
        if let Some(url) = &challenge.audio_prompt_url {
            self.emit(SessionEvent::AudioCue(url.clone()));
        }
    }

    fn spawn_detection(&self, epoch: u64) {
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(detection_loop(self.clone(), epoch, cancel_token.clone()));
        let previous = self
            .lock_detection()
            .replace(DetectionLoop { cancel_token, handle });
        if let Some(previous) = previous {
            previous.cancel_token.cancel();
        }
    }

    /// Cancels the loop without awaiting it; the loop itself may be the
    /// caller.
    fn halt_detection(&self) {
        if let Some(running) = self.lock_detection().take() {
            running.cancel_token.cancel();
        }
    }

    fn record_sample(&self, epoch: u64, sample: Option<Rgb>) {
        let mut guard = self.lock_state();
        if let Ok(next) = guard.sampled(epoch, sample) {
            *guard = next;
        }
    }

    fn finish_submission(&self) {
        let snapshot = {
            let mut guard = self.lock_state();
            *guard = guard.submission_finished();
            guard.clone()
        };
        self.emit(SessionEvent::StateChanged(snapshot));
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.lock_state().epoch == epoch
    }

    fn transition<F>(&self, apply: F) -> GameResult<SessionState>
    where
        F: FnOnce(&SessionState) -> GameResult<SessionState>,
    {
        let snapshot = {
            let mut guard = self.lock_state();
            let next = apply(&guard)?;
            *guard = next.clone();
            next
        };
        self.emit(SessionEvent::StateChanged(snapshot.clone()));
        Ok(snapshot)
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_detection(&self) -> MutexGuard<'_, Option<DetectionLoop>> {
        self.detection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
