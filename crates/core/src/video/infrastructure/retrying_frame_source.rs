use std::time::Duration;

use crate::shared::frame::Frame;
use crate::video::domain::frame_source::{FrameSource, FrameSourceError};

/// Decorator that absorbs short bursts of transient read failures.
///
/// Up to `max_retries` consecutive `Transient` errors are retried, sleeping
/// `backoff` between attempts. One more failure after that is reported as
/// `Unavailable`. A successful read resets the budget. `Unavailable` from
/// the inner source is passed through untouched.
pub struct RetryingFrameSource {
    inner: Box<dyn FrameSource>,
    max_retries: u32,
    backoff: Duration,
    released: bool,
}

impl RetryingFrameSource {
    pub fn new(inner: Box<dyn FrameSource>, max_retries: u32, backoff: Duration) -> Self {
        Self {
            inner,
            max_retries,
            backoff,
            released: false,
        }
    }
}

impl FrameSource for RetryingFrameSource {
    fn next_frame(&mut self) -> Result<Frame, FrameSourceError> {
        let mut failures = 0u32;
        loop {
            match self.inner.next_frame() {
                Ok(frame) => return Ok(frame),
                Err(FrameSourceError::Transient(reason)) => {
                    if failures >= self.max_retries {
                        return Err(FrameSourceError::Unavailable(format!(
                            "{} consecutive read failures, last: {reason}",
                            failures + 1
                        )));
                    }
                    failures += 1;
                    log::warn!(
                        "Frame read failed ({reason}), retry {failures}/{}",
                        self.max_retries
                    );
                    if !self.backoff.is_zero() {
                        std::thread::sleep(self.backoff);
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.inner.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Replays a script of read results, then reports the device gone.
    struct ScriptedSource {
        script: VecDeque<Result<(), FrameSourceError>>,
        reads: Arc<AtomicUsize>,
        releases: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<(), FrameSourceError>>) -> Self {
            Self {
                script: script.into(),
                reads: Arc::new(AtomicUsize::new(0)),
                releases: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl FrameSource for ScriptedSource {
        fn next_frame(&mut self) -> Result<Frame, FrameSourceError> {
            let index = self.reads.fetch_add(1, Ordering::SeqCst);
            match self.script.pop_front() {
                Some(Ok(())) => Ok(Frame::new(vec![0u8; 3], 1, 1, 3, index)),
                Some(Err(e)) => Err(e),
                None => Err(FrameSourceError::Unavailable("script exhausted".into())),
            }
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn transient() -> Result<(), FrameSourceError> {
        Err(FrameSourceError::Transient("blip".into()))
    }

    fn retrying(source: ScriptedSource, max_retries: u32) -> RetryingFrameSource {
        RetryingFrameSource::new(Box::new(source), max_retries, Duration::ZERO)
    }

    #[test]
    fn test_transient_failures_within_budget_are_absorbed() {
        let source = ScriptedSource::new(vec![transient(), transient(), Ok(())]);
        let reads = source.reads.clone();
        let mut retrying = retrying(source, 2);

        assert!(retrying.next_frame().is_ok());
        assert_eq!(reads.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_exhausted_budget_becomes_unavailable() {
        let source = ScriptedSource::new(vec![transient(), transient(), transient(), Ok(())]);
        let mut retrying = retrying(source, 2);

        let err = retrying.next_frame().unwrap_err();
        assert!(err.is_terminal());
        assert!(err.to_string().contains("3 consecutive"));
    }

    #[test]
    fn test_success_resets_budget() {
        let source = ScriptedSource::new(vec![transient(), Ok(()), transient(), Ok(())]);
        let mut retrying = retrying(source, 1);

        assert!(retrying.next_frame().is_ok());
        assert!(retrying.next_frame().is_ok());
    }

    #[test]
    fn test_zero_budget_fails_on_first_transient() {
        let source = ScriptedSource::new(vec![transient(), Ok(())]);
        let mut retrying = retrying(source, 0);
        assert!(retrying.next_frame().unwrap_err().is_terminal());
    }

    #[test]
    fn test_unavailable_is_not_retried() {
        let source = ScriptedSource::new(vec![Err(FrameSourceError::Unavailable("gone".into()))]);
        let reads = source.reads.clone();
        let mut retrying = retrying(source, 5);

        assert_eq!(
            retrying.next_frame(),
            Err(FrameSourceError::Unavailable("gone".into()))
        );
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_release_delegates_once() {
        let source = ScriptedSource::new(vec![]);
        let releases = source.releases.clone();
        let mut retrying = retrying(source, 1);

        retrying.release();
        retrying.release();
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }
}
