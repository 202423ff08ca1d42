use std::time::{Duration, Instant};

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::attention::domain::attention_state_machine::AttentionStateMachine;
use crate::attention::domain::attention_status::AttentionStatus;
use crate::attention::domain::clock::Clock;
use crate::attention::domain::status_cell::StatusCell;
use crate::detection::domain::detection_result::DetectionResult;
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::encoded_frame::EncodedFrame;
use crate::video::domain::frame_encoder::FrameEncoder;
use crate::video::domain::frame_source::FrameSource;

use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};

/// What one successful tick produced.
#[derive(Debug, Clone)]
pub struct TickOutput {
    pub status: AttentionStatus,
    pub frame: EncodedFrame,
    pub faces: usize,
}

#[derive(Debug, Clone)]
pub enum TickOutcome {
    /// A frame was captured, evaluated and encoded.
    Frame(TickOutput),
    /// The status advanced but the annotated frame could not be encoded.
    Dropped(AttentionStatus),
    /// The frame source is gone. Every later tick returns this too.
    Ended,
}

/// Runs the capture → detect → evaluate → annotate → encode pipeline one
/// frame at a time.
///
/// The service owns the frame source and the attention state. The only thing
/// it shares is the [`StatusCell`], which it overwrites after every
/// evaluation. Ticks are strictly sequential since `tick` takes `&mut self`.
pub struct AttentionService {
    source: Box<dyn FrameSource>,
    detector: Box<dyn FaceDetector>,
    annotator: Box<dyn FrameAnnotator>,
    encoder: Box<dyn FrameEncoder>,
    machine: AttentionStateMachine,
    clock: Box<dyn Clock>,
    status: StatusCell,
    logger: Box<dyn PipelineLogger>,
    ticks: usize,
    ended: bool,
    released: bool,
}

impl AttentionService {
    /// The absence timer starts at `clock.now()`, so a frame without a face
    /// on the very first tick already counts the time since construction.
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn FaceDetector>,
        annotator: Box<dyn FrameAnnotator>,
        encoder: Box<dyn FrameEncoder>,
        clock: Box<dyn Clock>,
        threshold: Duration,
    ) -> Self {
        let machine = AttentionStateMachine::started_at(threshold, clock.now());
        Self {
            source,
            detector,
            annotator,
            encoder,
            machine,
            clock,
            status: StatusCell::default(),
            logger: Box::new(NullPipelineLogger),
            ticks: 0,
            ended: false,
            released: false,
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Publishes into an existing cell instead of a private one.
    pub fn with_status_cell(mut self, cell: StatusCell) -> Self {
        cell.store(self.machine.status());
        self.status = cell;
        self
    }

    /// Handle for readers. Cloning is cheap and every clone sees the same value.
    pub fn status_cell(&self) -> StatusCell {
        self.status.clone()
    }

    pub fn status(&self) -> AttentionStatus {
        self.status.load()
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.ended {
            return TickOutcome::Ended;
        }

        let t0 = Instant::now();
        let mut frame = match self.source.next_frame() {
            Ok(frame) => frame,
            Err(e) => {
                self.logger.info(&format!("Frame source ended: {e}"));
                self.ended = true;
                return TickOutcome::Ended;
            }
        };
        let t1 = Instant::now();

        let detections = match self.detector.detect(&frame) {
            Ok(detections) => detections,
            Err(e) => {
                log::warn!("Detection failed on frame {}: {e}", frame.index());
                DetectionResult::none()
            }
        };
        let t2 = Instant::now();

        let previous = self.machine.status();
        let status = self.machine.update(&detections, self.clock.now());
        self.status.store(status);
        if status != previous {
            self.logger.status_changed(previous, status);
        }

        self.annotator.annotate(&mut frame, &detections, status);
        let t3 = Instant::now();

        let encoded = self.encoder.encode(&frame);
        let t4 = Instant::now();

        self.ticks += 1;
        self.logger.timing("read", ms(t1 - t0));
        self.logger.timing("detect", ms(t2 - t1));
        self.logger.timing("annotate", ms(t3 - t2));
        self.logger.timing("encode", ms(t4 - t3));
        self.logger.metric("faces", detections.face_count() as f64);
        self.logger.metric("eyes", detections.eye_count() as f64);
        self.logger.progress(self.ticks);

        match encoded {
            Ok(frame) => TickOutcome::Frame(TickOutput {
                status,
                frame,
                faces: detections.face_count(),
            }),
            Err(e) => {
                log::warn!("Failed to encode frame {}: {e}", frame.index());
                TickOutcome::Dropped(status)
            }
        }
    }

    /// Releases the frame source. Only the first call has any effect.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.ended = true;
        self.source.release();
        self.logger.info("Frame source released");
    }

    pub fn summary(&self) {
        self.logger.summary();
    }
}

impl Drop for AttentionService {
    fn drop(&mut self) {
        self.release();
    }
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attention::infrastructure::manual_clock::ManualClock;
    use crate::pipeline::test_support::{
        FailingEncoder, ScriptedDetector, ScriptedSource, StubAnnotator, StubEncoder,
    };
    use crate::video::domain::frame_source::FrameSourceError;
    use std::sync::atomic::Ordering;

    fn service(
        source: ScriptedSource,
        detector: ScriptedDetector,
        clock: &ManualClock,
    ) -> AttentionService {
        AttentionService::new(
            Box::new(source),
            Box::new(detector),
            Box::new(StubAnnotator),
            Box::new(StubEncoder),
            Box::new(clock.clone()),
            Duration::from_secs(2),
        )
    }

    // ── Tick ──

    #[test]
    fn test_tick_publishes_status_and_frame() {
        let clock = ManualClock::new();
        let mut svc = service(
            ScriptedSource::frames(1),
            ScriptedDetector::new(vec![Ok(true)]),
            &clock,
        );

        match svc.tick() {
            TickOutcome::Frame(out) => {
                assert_eq!(out.status, AttentionStatus::Focused);
                assert_eq!(out.faces, 1);
                assert_eq!(out.frame.index(), 0);
            }
            other => panic!("expected a frame, got {other:?}"),
        }
        assert_eq!(svc.ticks(), 1);
    }

    #[test]
    fn test_status_cell_follows_state_machine() {
        let clock = ManualClock::new();
        let mut svc = service(
            ScriptedSource::frames(3),
            ScriptedDetector::new(vec![Ok(false), Ok(false), Ok(true)]),
            &clock,
        );
        let cell = svc.status_cell();

        clock.set_secs(1.0);
        svc.tick();
        assert_eq!(cell.load(), AttentionStatus::Focused);

        clock.set_secs(2.5);
        svc.tick();
        assert_eq!(cell.load(), AttentionStatus::Distracted);

        clock.set_secs(2.6);
        svc.tick();
        assert_eq!(cell.load(), AttentionStatus::Focused);
    }

    #[test]
    fn test_detector_error_counts_as_no_face() {
        let clock = ManualClock::new();
        let mut svc = service(
            ScriptedSource::frames(2),
            ScriptedDetector::new(vec![Err("bad frame".into()), Ok(false)]),
            &clock,
        );

        clock.set_secs(3.0);
        match svc.tick() {
            TickOutcome::Frame(out) => {
                assert_eq!(out.faces, 0);
                assert_eq!(out.status, AttentionStatus::Distracted);
            }
            other => panic!("expected a frame, got {other:?}"),
        }
        assert!(matches!(svc.tick(), TickOutcome::Frame(_)));
    }

    #[test]
    fn test_encoder_failure_still_advances_status() {
        let clock = ManualClock::new();
        let mut svc = AttentionService::new(
            Box::new(ScriptedSource::frames(1)),
            Box::new(ScriptedDetector::new(vec![Ok(false)])),
            Box::new(StubAnnotator),
            Box::new(FailingEncoder),
            Box::new(clock.clone()),
            Duration::from_secs(2),
        );

        clock.set_secs(5.0);
        assert!(matches!(
            svc.tick(),
            TickOutcome::Dropped(AttentionStatus::Distracted)
        ));
        assert_eq!(svc.status(), AttentionStatus::Distracted);
    }

    #[test]
    fn test_source_failure_ends_for_good() {
        let clock = ManualClock::new();
        let source = ScriptedSource::new(vec![
            Err(FrameSourceError::Unavailable("unplugged".into())),
            Ok(()),
        ]);
        let reads = source.reads.clone();
        let mut svc = service(source, ScriptedDetector::new(vec![]), &clock);

        assert!(matches!(svc.tick(), TickOutcome::Ended));
        assert!(matches!(svc.tick(), TickOutcome::Ended));
        assert!(svc.is_ended());
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert_eq!(svc.status(), AttentionStatus::Focused);
    }

    // ── Release ──

    #[test]
    fn test_release_is_idempotent_including_drop() {
        let clock = ManualClock::new();
        let source = ScriptedSource::frames(1);
        let releases = source.releases.clone();
        let mut svc = service(source, ScriptedDetector::new(vec![]), &clock);

        svc.release();
        svc.release();
        drop(svc);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_released_service_does_not_read() {
        let clock = ManualClock::new();
        let source = ScriptedSource::frames(3);
        let reads = source.reads.clone();
        let mut svc = service(source, ScriptedDetector::new(vec![]), &clock);

        svc.release();
        assert!(matches!(svc.tick(), TickOutcome::Ended));
        assert_eq!(reads.load(Ordering::SeqCst), 0);
    }

    // ── Shared cell ──

    #[test]
    fn test_with_status_cell_shares_value() {
        let clock = ManualClock::new();
        let external = StatusCell::new(AttentionStatus::Distracted);
        let mut svc = service(
            ScriptedSource::frames(1),
            ScriptedDetector::new(vec![Ok(true)]),
            &clock,
        )
        .with_status_cell(external.clone());

        assert_eq!(external.load(), AttentionStatus::Focused);
        clock.set_secs(0.1);
        svc.tick();
        assert_eq!(external.load(), svc.status());
    }
}
