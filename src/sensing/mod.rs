pub mod camera;
pub mod detector;
pub mod sampler;

pub use camera::{CameraFeed, FrameSource};
pub use detector::{ModelLoader, ObjectDetector, ObjectModel};
pub use sampler::{average_color, center_region, Frame};
