use crate::shared::frame::Frame;

use super::detection_result::DetectionResult;

/// Domain interface for face (and nested eye) detection.
///
/// Implementations may keep per-frame scratch state, hence `&mut self`.
/// Returning no faces is a normal outcome; `Err` is reserved for frames the
/// detector cannot process at all.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<DetectionResult, Box<dyn std::error::Error>>;
}
