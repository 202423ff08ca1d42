use std::time::Duration;

pub const FACE_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const FACE_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Directory name under the platform cache dir where models are stored.
pub const MODEL_CACHE_DIR_NAME: &str = "focusguard";

pub const DEFAULT_DEVICE_INDEX: u32 = 0;

/// Seconds without any face before the status flips to DISTRACTED.
pub const DEFAULT_DISTRACTION_THRESHOLD_SECS: f64 = 2.0;

pub const DEFAULT_SCALE_FACTOR: f64 = 1.3;
pub const DEFAULT_MIN_NEIGHBORS: usize = 5;
pub const DEFAULT_CONFIDENCE: f64 = 0.25;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &["http://localhost:3000", "http://localhost:3001"];

pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";
pub const DEFAULT_JPEG_QUALITY: u8 = 80;
pub const MULTIPART_BOUNDARY: &str = "frame";

/// Consecutive transient read failures tolerated before the device is
/// declared unavailable.
pub const DEFAULT_MAX_READ_RETRIES: u32 = 5;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// Frames buffered per stream subscriber before frames start being dropped.
pub const SUBSCRIBER_CHANNEL_CAPACITY: usize = 4;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
