use crate::shared::region::Region;

/// One detected face and the eyes found inside it.
///
/// `eyes` are relative to the face's own origin, i.e. coordinates in the
/// face sub-image rather than in the full frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceRegion {
    pub bounds: Region,
    pub eyes: Vec<Region>,
}

impl FaceRegion {
    pub fn new(bounds: Region, eyes: Vec<Region>) -> Self {
        Self { bounds, eyes }
    }

    /// Eye rectangles translated into frame coordinates.
    pub fn eyes_in_frame(&self) -> impl Iterator<Item = Region> + '_ {
        self.eyes
            .iter()
            .map(|eye| eye.translate(self.bounds.x, self.bounds.y))
    }
}

/// Faces found in a single frame, in detector order.
///
/// Produced fresh each tick and never retained. An empty result is a
/// legitimate observation, not a failure.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionResult {
    pub faces: Vec<FaceRegion>,
}

impl DetectionResult {
    pub fn new(faces: Vec<FaceRegion>) -> Self {
        Self { faces }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn has_face(&self) -> bool {
        !self.faces.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn eye_count(&self) -> usize {
        self.faces.iter().map(|f| f.eyes.len()).sum()
    }
}
