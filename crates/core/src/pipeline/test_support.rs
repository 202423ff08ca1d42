//! Scripted collaborators for exercising the pipeline without hardware.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::attention::domain::attention_status::AttentionStatus;
use crate::detection::domain::detection_result::{DetectionResult, FaceRegion};
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::encoded_frame::EncodedFrame;
use crate::shared::frame::Frame;
use crate::shared::region::Region;
use crate::video::domain::frame_encoder::FrameEncoder;
use crate::video::domain::frame_source::{FrameSource, FrameSourceError};

/// Plays back a fixed list of read results, then reports the device gone.
pub(crate) struct ScriptedSource {
    script: VecDeque<Result<(), FrameSourceError>>,
    endless: bool,
    pub reads: Arc<AtomicUsize>,
    pub releases: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<(), FrameSourceError>>) -> Self {
        Self {
            script: script.into(),
            endless: false,
            reads: Arc::new(AtomicUsize::new(0)),
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn frames(count: usize) -> Self {
        Self::new((0..count).map(|_| Ok(())).collect())
    }

    /// Never runs out of frames.
    pub fn endless() -> Self {
        Self {
            endless: true,
            ..Self::new(vec![])
        }
    }
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self) -> Result<Frame, FrameSourceError> {
        let index = self.reads.fetch_add(1, Ordering::SeqCst);
        let next = self.script.pop_front().or(self.endless.then_some(Ok(())));
        match next {
            Some(Ok(())) => Ok(Frame::new(vec![0u8; 4 * 4 * 3], 4, 4, 3, index)),
            Some(Err(e)) => Err(e),
            None => Err(FrameSourceError::Unavailable("script exhausted".into())),
        }
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// `Ok(true)` yields one face, `Ok(false)` none. Runs dry into "no face".
pub(crate) struct ScriptedDetector {
    script: VecDeque<Result<bool, String>>,
}

impl ScriptedDetector {
    pub fn new(script: Vec<Result<bool, String>>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl FaceDetector for ScriptedDetector {
    fn detect(&mut self, _frame: &Frame) -> Result<DetectionResult, Box<dyn std::error::Error>> {
        match self.script.pop_front() {
            Some(Ok(true)) => Ok(face()),
            Some(Ok(false)) | None => Ok(DetectionResult::none()),
            Some(Err(e)) => Err(e.into()),
        }
    }
}

pub(crate) fn face() -> DetectionResult {
    DetectionResult::new(vec![FaceRegion::new(Region::new(0, 0, 2, 2), vec![])])
}

pub(crate) struct StubAnnotator;

impl FrameAnnotator for StubAnnotator {
    fn annotate(&self, _frame: &mut Frame, _detections: &DetectionResult, _status: AttentionStatus) {}
}

/// Emits the frame index as a single byte.
pub(crate) struct StubEncoder;

impl FrameEncoder for StubEncoder {
    fn encode(&self, frame: &Frame) -> Result<EncodedFrame, Box<dyn std::error::Error>> {
        Ok(EncodedFrame::new(
            vec![frame.index() as u8],
            "application/octet-stream",
            frame.index(),
        ))
    }
}

pub(crate) struct FailingEncoder;

impl FrameEncoder for FailingEncoder {
    fn encode(&self, _frame: &Frame) -> Result<EncodedFrame, Box<dyn std::error::Error>> {
        Err("encoder broke".into())
    }
}
