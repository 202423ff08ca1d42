use thiserror::Error;

use crate::shared::constants::{DEFAULT_CONFIDENCE, DEFAULT_MIN_NEIGHBORS, DEFAULT_SCALE_FACTOR};

#[derive(Error, Debug, PartialEq)]
pub enum ParamsError {
    #[error("scale factor must be a finite number >= 1.0, got {0}")]
    ScaleFactor(f64),
    #[error("confidence must be between 0.0 and 1.0, got {0}")]
    Confidence(f64),
}

/// Detector sensitivity knobs.
///
/// - `scale_factor`: frames are shrunk by this factor before inference.
///   Larger values are faster and miss small faces.
/// - `min_neighbors`: overlapping raw candidates a face needs before it is
///   reported. Larger values mean fewer, more certain detections.
/// - `confidence`: per-candidate score cut-off.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorParams {
    pub scale_factor: f64,
    pub min_neighbors: usize,
    pub confidence: f64,
}

impl DetectorParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !self.scale_factor.is_finite() || self.scale_factor < 1.0 {
            return Err(ParamsError::ScaleFactor(self.scale_factor));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ParamsError::Confidence(self.confidence));
        }
        Ok(())
    }
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}
