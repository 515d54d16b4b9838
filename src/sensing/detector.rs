use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use log::{info, warn};
use tokio::sync::OnceCell;

use crate::{
    error::{GameError, GameResult},
    matching::Detection,
};

use super::sampler::Frame;

/// Loaded classification capability. Opaque to the game.
#[async_trait]
pub trait ObjectModel: Send + Sync {
    async fn detect(&self, frame: &dyn Frame) -> anyhow::Result<Vec<Detection>>;
}

/// Produces an [`ObjectModel`]; expected to be slow (weights download,
/// backend warm-up).
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self) -> anyhow::Result<Arc<dyn ObjectModel>>;
}

/// Holds `loading` high until dropped, including when the load future is
/// cancelled mid-flight.
struct LoadingFlag<'a>(&'a AtomicBool);

impl<'a> LoadingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Lazily loads the object model once and shares it for the lifetime of
/// the process. Concurrent callers join the single in-flight load.
pub struct ObjectDetector {
    loader: Arc<dyn ModelLoader>,
    model: OnceCell<Arc<dyn ObjectModel>>,
    loading: AtomicBool,
}

impl ObjectDetector {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            model: OnceCell::new(),
            loading: AtomicBool::new(false),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    /// A failed load leaves the detector unloaded so a later call retries.
    pub async fn ensure_loaded(&self) -> GameResult<Arc<dyn ObjectModel>> {
        if let Some(model) = self.model.get() {
            return Ok(model.clone());
        }

        let model = self
            .model
            .get_or_try_init(|| async {
                let loading = LoadingFlag::raise(&self.loading);
                info!("Loading object detection model");
                let result = self.loader.load().await;
                drop(loading);
                match result {
                    Ok(model) => {
                        info!("Object detection model ready");
                        Ok(model)
                    }
                    Err(err) => {
                        warn!("Object detection model failed to load: {err:#}");
                        Err(GameError::ModelLoad(format!("{err:#}")))
                    }
                }
            })
            .await?;

        Ok(model.clone())
    }

    pub async fn detect(&self, frame: &dyn Frame) -> GameResult<Vec<Detection>> {
        let model = self.ensure_loaded().await?;
        model
            .detect(frame)
            .await
            .map_err(|err| GameError::Detection(format!("{err:#}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use image::{Rgba, RgbaImage};

    struct FixedModel;

    #[async_trait]
    impl ObjectModel for FixedModel {
        async fn detect(&self, _frame: &dyn Frame) -> anyhow::Result<Vec<Detection>> {
            Ok(vec![Detection::new("cup", 0.9)])
        }
    }

    struct SlowLoader {
        loads: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl ModelLoader for SlowLoader {
        async fn load(&self) -> anyhow::Result<Arc<dyn ObjectModel>> {
            let attempt = self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            if self.fail_first && attempt == 0 {
                anyhow::bail!("weights unavailable");
            }
            Ok(Arc::new(FixedModel))
        }
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_load() {
        let loader = Arc::new(SlowLoader {
            loads: AtomicUsize::new(0),
            fail_first: false,
        });
        let detector = Arc::new(ObjectDetector::new(loader.clone()));

        let a = tokio::spawn({
            let detector = detector.clone();
            async move { detector.ensure_loaded().await.unwrap() }
        });
        let b = tokio::spawn({
            let detector = detector.clone();
            async move { detector.ensure_loaded().await.unwrap() }
        });

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(detector.is_loading());

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert!(!detector.is_loading());
        assert!(detector.is_loaded());

        let c = detector.ensure_loaded().await.unwrap();
        assert!(Arc::ptr_eq(&a, &c));
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn abandoned_load_clears_loading_flag() {
        let loader = Arc::new(SlowLoader {
            loads: AtomicUsize::new(0),
            fail_first: false,
        });
        let detector = ObjectDetector::new(loader.clone());

        let attempt = tokio::time::timeout(Duration::from_millis(5), detector.ensure_loaded()).await;
        assert!(attempt.is_err());
        assert!(!detector.is_loading());
        assert!(!detector.is_loaded());

        detector.ensure_loaded().await.unwrap();
        assert!(detector.is_loaded());
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_load_surfaces_and_can_be_retried() {
        let loader = Arc::new(SlowLoader {
            loads: AtomicUsize::new(0),
            fail_first: true,
        });
        let detector = ObjectDetector::new(loader.clone());

        let err = detector.ensure_loaded().await.err().unwrap();
        assert!(matches!(err, GameError::ModelLoad(ref msg) if msg.contains("weights unavailable")));
        assert!(!detector.is_loading());

        let frame = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let detections = detector.detect(&frame).await.unwrap();
        assert_eq!(detections, vec![Detection::new("cup", 0.9)]);
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
    }
}
