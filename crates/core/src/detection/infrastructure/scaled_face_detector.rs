use image::imageops::{self, FilterType};

use crate::detection::domain::detection_result::{DetectionResult, FaceRegion};
use crate::detection::domain::detector_params::ParamsError;
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::frame::Frame;

/// Decorator that runs the inner detector on a frame shrunk by `scale_factor`.
///
/// Results are mapped back to full-resolution coordinates. Eye boxes are
/// face-relative, so they are rescaled without translation.
pub struct ScaledFaceDetector {
    inner: Box<dyn FaceDetector>,
    scale_factor: f64,
}

impl ScaledFaceDetector {
    pub fn new(inner: Box<dyn FaceDetector>, scale_factor: f64) -> Result<Self, ParamsError> {
        if !scale_factor.is_finite() || scale_factor < 1.0 {
            return Err(ParamsError::ScaleFactor(scale_factor));
        }
        Ok(Self {
            inner,
            scale_factor,
        })
    }

    fn downscale(&self, frame: &Frame) -> Result<Frame, Box<dyn std::error::Error>> {
        let image = frame
            .to_rgb_image()
            .ok_or("frame is not a valid RGB buffer")?;
        let w = ((frame.width() as f64 / self.scale_factor).round() as u32).max(1);
        let h = ((frame.height() as f64 / self.scale_factor).round() as u32).max(1);
        let small = imageops::resize(&image, w, h, FilterType::Triangle);
        Ok(Frame::from_rgb_image(small, frame.index()))
    }
}

impl FaceDetector for ScaledFaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<DetectionResult, Box<dyn std::error::Error>> {
        if self.scale_factor <= 1.0 {
            return self.inner.detect(frame);
        }

        let small = self.downscale(frame)?;
        let found = self.inner.detect(&small)?;

        let sx = frame.width() as f64 / small.width() as f64;
        let sy = frame.height() as f64 / small.height() as f64;
        let faces = found
            .faces
            .into_iter()
            .filter_map(|face| {
                let bounds = face.bounds.scale(sx, sy).clamp_to(frame.width(), frame.height())?;
                let eyes = face
                    .eyes
                    .iter()
                    .filter_map(|eye| {
                        eye.scale(sx, sy)
                            .clamp_to(bounds.width as u32, bounds.height as u32)
                    })
                    .collect();
                Some(FaceRegion::new(bounds, eyes))
            })
            .collect();

        Ok(DetectionResult::new(faces))
    }
}
