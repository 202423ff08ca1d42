use crate::shared::encoded_frame::EncodedFrame;
use crate::shared::frame::Frame;

/// Compresses an annotated frame into its wire representation.
pub trait FrameEncoder: Send {
    fn encode(&self, frame: &Frame) -> Result<EncodedFrame, Box<dyn std::error::Error>>;
}
