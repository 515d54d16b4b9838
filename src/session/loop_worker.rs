use tokio_util::sync::CancellationToken;

use super::controller::ChallengeSession;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Result of evaluating one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Keep polling.
    Continue,
    /// The target is in view.
    Matched,
    /// Session moved on (stopped, restarted, submitting); exit quietly.
    Halted,
}

pub async fn detection_loop(session: ChallengeSession, epoch: u64, cancel_token: CancellationToken) {
    log_debug!("detection loop started for epoch {epoch}");

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                log_debug!("detection loop cancelled (epoch {epoch})");
                break;
            }
            _ = session.scheduler().next_frame() => {}
        }

        match session.tick(epoch, &cancel_token).await {
            Ok(TickOutcome::Continue) => {}
            Ok(TickOutcome::Matched) => {
                log_info!("target found (epoch {epoch})");
                if let Err(err) = session.submit_found().await {
                    log_error!("recording unlock failed: {err}");
                }
                break;
            }
            Ok(TickOutcome::Halted) => break,
            Err(err) => {
                log_warn!("detection tick failed, pausing: {err}");
                session.pause_detection(epoch);
                break;
            }
        }
    }
}
