/// YOLO face-pose detector running on ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference, neighbour-counting NMS and
/// eye-box synthesis from the model's eye keypoints.
use std::path::Path;

use crate::detection::domain::detection_result::{DetectionResult, FaceRegion};
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// NMS IoU threshold; candidates above it count as neighbours of the kept box.
const NMS_IOU_THRESH: f64 = 0.45;

/// 5 landmarks × (x, y, conf), starting with left eye then right eye.
const NUM_KEYPOINT_VALUES: usize = 15;

const KEYPOINT_CONF_THRESH: f64 = 0.5;

/// Eye box side as a fraction of the inter-ocular distance.
const EYE_BOX_RATIO: f64 = 0.6;

/// Eye box side as a fraction of face width when only one eye is visible.
const SINGLE_EYE_BOX_RATIO: f64 = 0.25;

pub struct OnnxFaceDetector {
    session: ort::session::Session,
    confidence: f64,
    min_neighbors: usize,
    input_size: u32,
}

impl OnnxFaceDetector {
    /// Loads a YOLO face-pose ONNX model.
    ///
    /// The input resolution is read from the model's NCHW input shape and
    /// falls back to 640 when the shape is dynamic.
    pub fn new(
        model_path: &Path,
        confidence: f64,
        min_neighbors: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?.commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::info!(
            "Loaded face model {} (input {input_size}px, min_neighbors {min_neighbors})",
            model_path.display()
        );

        Ok(Self {
            session,
            confidence,
            min_neighbors,
            input_size,
        })
    }
}

impl FaceDetector for OnnxFaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<DetectionResult, Box<dyn std::error::Error>> {
        if frame.channels() != 3 || frame.width() == 0 || frame.height() == 0 {
            return Err(format!(
                "unsupported frame layout {}x{}x{}",
                frame.width(),
                frame.height(),
                frame.channels()
            )
            .into());
        }

        let (input_tensor, scale, pad_x, pad_y) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("face model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 {
            return Err(format!("unexpected face model output shape: {shape:?}").into());
        }

        // Output is [1, features, detections] or [1, detections, features]
        let transposed = shape[1] < shape[2];
        let (num_dets, num_feats) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };
        let data = tensor.as_slice().ok_or("face model output is not contiguous")?;

        let mut candidates = Vec::new();
        for i in 0..num_dets {
            let row: Vec<f32> = if transposed {
                (0..num_feats).map(|f| data[f * num_dets + i]).collect()
            } else {
                data[i * num_feats..(i + 1) * num_feats].to_vec()
            };
            if let Some(candidate) =
                parse_candidate(&row, self.confidence, scale, pad_x as f64, pad_y as f64)
            {
                candidates.push(candidate);
            }
        }

        let faces = group_candidates(&mut candidates, NMS_IOU_THRESH, self.min_neighbors)
            .into_iter()
            .filter_map(|c| c.into_face(frame.width(), frame.height()))
            .collect();

        Ok(DetectionResult::new(faces))
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

// ---------------------------------------------------------------------------
// Post-processing
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct Candidate {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    confidence: f64,
    left_eye: Option<(f64, f64)>,
    right_eye: Option<(f64, f64)>,
}

impl Candidate {
    fn bbox(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    /// Converts to a frame-clamped face with eyes relative to the face origin.
    fn into_face(self, frame_w: u32, frame_h: u32) -> Option<FaceRegion> {
        let bounds = Region::from_corners(self.x1, self.y1, self.x2, self.y2)
            .clamp_to(frame_w, frame_h)?;
        let eyes = eye_regions(&bounds, self.left_eye, self.right_eye);
        Some(FaceRegion::new(bounds, eyes))
    }
}

/// Parses one model row `[cx, cy, w, h, conf, kp0_x, kp0_y, kp0_conf, ...]`
/// into frame coordinates, or `None` when it is below the confidence cut-off.
fn parse_candidate(
    row: &[f32],
    min_confidence: f64,
    scale: f64,
    pad_x: f64,
    pad_y: f64,
) -> Option<Candidate> {
    if row.len() < 5 {
        return None;
    }
    let confidence = row[4] as f64;
    if confidence < min_confidence {
        return None;
    }

    let (cx, cy, w, h) = (row[0] as f64, row[1] as f64, row[2] as f64, row[3] as f64);
    let unletterbox = |x: f64, y: f64| ((x - pad_x) / scale, (y - pad_y) / scale);
    let (x1, y1) = unletterbox(cx - w / 2.0, cy - h / 2.0);
    let (x2, y2) = unletterbox(cx + w / 2.0, cy + h / 2.0);

    let keypoint = |k: usize| -> Option<(f64, f64)> {
        if row.len() < 5 + NUM_KEYPOINT_VALUES {
            return None;
        }
        let base = 5 + k * 3;
        if (row[base + 2] as f64) < KEYPOINT_CONF_THRESH {
            return None;
        }
        Some(unletterbox(row[base] as f64, row[base + 1] as f64))
    };

    Some(Candidate {
        x1,
        y1,
        x2,
        y2,
        confidence,
        left_eye: keypoint(0),
        right_eye: keypoint(1),
    })
}

/// Greedy NMS that also counts, for each kept box, how many suppressed
/// candidates overlapped it. Boxes with fewer than `min_neighbors` such
/// neighbours are discarded.
fn group_candidates(
    candidates: &mut [Candidate],
    iou_thresh: f64,
    min_neighbors: usize,
) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; candidates.len()];

    for i in 0..candidates.len() {
        if suppressed[i] {
            continue;
        }
        let mut neighbors = 0;
        for j in (i + 1)..candidates.len() {
            if suppressed[j] {
                continue;
            }
            if bbox_iou(&candidates[i].bbox(), &candidates[j].bbox()) > iou_thresh {
                suppressed[j] = true;
                neighbors += 1;
            }
        }
        if neighbors >= min_neighbors {
            keep.push(candidates[i].clone());
        }
    }
    keep
}

/// Square eye boxes centred on the eye keypoints, relative to `face`.
fn eye_regions(
    face: &Region,
    left: Option<(f64, f64)>,
    right: Option<(f64, f64)>,
) -> Vec<Region> {
    let side = match (left, right) {
        (Some(l), Some(r)) => ((r.0 - l.0).powi(2) + (r.1 - l.1).powi(2)).sqrt() * EYE_BOX_RATIO,
        _ => face.width as f64 * SINGLE_EYE_BOX_RATIO,
    };
    if side < 1.0 {
        return Vec::new();
    }

    [left, right]
        .into_iter()
        .flatten()
        .filter_map(|(ex, ey)| {
            let local_x = ex - face.x as f64;
            let local_y = ey - face.y as f64;
            Region::from_corners(
                local_x - side / 2.0,
                local_y - side / 2.0,
                local_x + side / 2.0,
                local_y + side / 2.0,
            )
            .clamp_to(face.width as u32, face.height as u32)
        })
        .collect()
}

fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
