use std::time::Duration;

use async_trait::async_trait;

/// Paces the detection loop. Resolves when the next frame should be
/// evaluated.
#[async_trait]
pub trait FrameScheduler: Send + Sync {
    async fn next_frame(&self);
}

/// Fixed-interval pacing, roughly one tick per display frame by default.
pub struct FrameClock {
    interval: Duration,
}

impl FrameClock {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

#[async_trait]
impl FrameScheduler for FrameClock {
    async fn next_frame(&self) {
        tokio::time::sleep(self.interval).await;
    }
}

/// Yields to the runtime and ticks again. For headless runs.
pub struct ImmediateScheduler;

#[async_trait]
impl FrameScheduler for ImmediateScheduler {
    async fn next_frame(&self) {
        tokio::task::yield_now().await;
    }
}
