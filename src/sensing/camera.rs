use std::sync::Arc;

use image::RgbaImage;
use tokio::sync::watch;

use super::sampler::Frame;

/// Supplies the most recent camera frame, or `None` while the stream is
/// not ready yet.
pub trait FrameSource: Send + Sync {
    fn current_frame(&self) -> Option<Arc<dyn Frame>>;
}

/// Latest-frame slot fed by a capture backend. Readers always see the most
/// recent frame; older frames are dropped.
#[derive(Clone)]
pub struct CameraFeed {
    tx: Arc<watch::Sender<Option<Arc<dyn Frame>>>>,
}

impl CameraFeed {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn publish(&self, frame: Arc<dyn Frame>) {
        self.tx.send_replace(Some(frame));
    }

    pub fn publish_image(&self, image: RgbaImage) {
        self.publish(Arc::new(image));
    }

    /// Drop the current frame, e.g. when the stream is released.
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }
}

impl Default for CameraFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for CameraFeed {
    fn current_frame(&self) -> Option<Arc<dyn Frame>> {
        self.tx.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn feed_returns_latest_frame() {
        let feed = CameraFeed::new();
        assert!(feed.current_frame().is_none());

        feed.publish_image(RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255])));
        feed.publish_image(RgbaImage::from_pixel(8, 2, Rgba([1, 2, 3, 255])));
        let frame = feed.current_frame().unwrap();
        assert_eq!((frame.width(), frame.height()), (8, 2));

        feed.clear();
        assert!(feed.current_frame().is_none());
    }
}
