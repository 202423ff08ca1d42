use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameSourceError {
    /// The device cannot be opened or has stopped producing data for good.
    #[error("capture device unavailable: {0}")]
    Unavailable(String),
    /// A single read failed but the device is still open.
    #[error("transient frame read failure: {0}")]
    Transient(String),
}

impl FrameSourceError {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FrameSourceError::Unavailable(_))
    }
}

/// Produces raw frames from a capture device or file.
///
/// Exclusively owned by the producer loop. Every successful call returns a
/// freshly allocated frame.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Frame, FrameSourceError>;

    /// Releases the underlying device. Callers invoke this once, on loop exit.
    fn release(&mut self);
}
