use crate::attention::domain::attention_status::AttentionStatus;
use crate::detection::domain::detection_result::DetectionResult;
use crate::shared::frame::Frame;

/// Draws visual feedback onto a frame in place.
///
/// Purely cosmetic: it never influences the attention state and must not
/// fail. Regions that cannot be drawn are skipped.
pub trait FrameAnnotator: Send + Sync {
    fn annotate(&self, frame: &mut Frame, detections: &DetectionResult, status: AttentionStatus);
}
