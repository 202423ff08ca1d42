use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::shared::constants::{DEFAULT_JPEG_QUALITY, JPEG_CONTENT_TYPE};
use crate::shared::encoded_frame::EncodedFrame;
use crate::shared::frame::Frame;
use crate::video::domain::frame_encoder::FrameEncoder;

/// Encodes RGB frames as baseline JPEG.
pub struct JpegFrameEncoder {
    quality: u8,
}

impl JpegFrameEncoder {
    /// `quality` is clamped to 1..=100.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for JpegFrameEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl FrameEncoder for JpegFrameEncoder {
    fn encode(&self, frame: &Frame) -> Result<EncodedFrame, Box<dyn std::error::Error>> {
        if frame.channels() != 3 {
            return Err(format!("JPEG encoder expects RGB, got {} channels", frame.channels()).into());
        }
        if frame.width() == 0 || frame.height() == 0 {
            return Err("cannot encode an empty frame".into());
        }

        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, self.quality).encode(
            frame.data(),
            frame.width(),
            frame.height(),
            ExtendedColorType::Rgb8,
        )?;
        Ok(EncodedFrame::new(buf, JPEG_CONTENT_TYPE, frame.index()))
    }
}
