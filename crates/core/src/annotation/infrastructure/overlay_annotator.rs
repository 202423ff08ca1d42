use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::attention::domain::attention_status::AttentionStatus;
use crate::detection::domain::detection_result::DetectionResult;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

use super::bitmap_font::{glyph_bits, GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};

type Rgb = [u8; 3];

const FACE_COLOR: Rgb = [0, 255, 0];
const EYE_COLOR: Rgb = [255, 255, 0];
const FOCUSED_COLOR: Rgb = [0, 255, 0];
const DISTRACTED_COLOR: Rgb = [255, 0, 0];

const DEFAULT_LINE_THICKNESS: i32 = 2;
const DEFAULT_TEXT_SCALE: i32 = 4;

/// Left edge and baseline of the status banner.
const BANNER_ORIGIN: (i32, i32) = (10, 50);

/// Draws face and eye outlines plus a colour-coded status banner.
pub struct OverlayAnnotator {
    line_thickness: i32,
    text_scale: i32,
}

impl OverlayAnnotator {
    pub fn new(line_thickness: i32, text_scale: i32) -> Self {
        Self {
            line_thickness: line_thickness.max(1),
            text_scale: text_scale.max(1),
        }
    }

    pub fn banner_text(status: AttentionStatus) -> String {
        format!("STATUS: {status}")
    }

    fn banner_color(status: AttentionStatus) -> Rgb {
        match status {
            AttentionStatus::Focused => FOCUSED_COLOR,
            AttentionStatus::Distracted => DISTRACTED_COLOR,
        }
    }

    fn outline_visible(&self, frame: &mut Frame, region: Region, color: Rgb, what: &str) {
        match region.clamp_to(frame.width(), frame.height()) {
            Some(visible) => draw_outline(frame, visible, color, self.line_thickness),
            None => log::debug!(
                "Skipping {what} region {region:?} outside {}x{} frame {}",
                frame.width(),
                frame.height(),
                frame.index()
            ),
        }
    }
}

impl Default for OverlayAnnotator {
    fn default() -> Self {
        Self::new(DEFAULT_LINE_THICKNESS, DEFAULT_TEXT_SCALE)
    }
}

impl FrameAnnotator for OverlayAnnotator {
    fn annotate(&self, frame: &mut Frame, detections: &DetectionResult, status: AttentionStatus) {
        for face in &detections.faces {
            self.outline_visible(frame, face.bounds, FACE_COLOR, "face");
            for eye in face.eyes_in_frame() {
                self.outline_visible(frame, eye, EYE_COLOR, "eye");
            }
        }

        let (x, baseline) = BANNER_ORIGIN;
        draw_text(
            frame,
            x,
            baseline,
            &Self::banner_text(status),
            self.text_scale,
            Self::banner_color(status),
        );
    }
}

/// Rectangle outline growing inward by `thickness` pixels.
fn draw_outline(frame: &mut Frame, region: Region, color: Rgb, thickness: i32) {
    for inset in 0..thickness {
        let left = region.x + inset;
        let top = region.y + inset;
        let right = region.right() - 1 - inset;
        let bottom = region.bottom() - 1 - inset;
        if left > right || top > bottom {
            break;
        }
        for x in left..=right {
            frame.put_pixel(x, top, color);
            frame.put_pixel(x, bottom, color);
        }
        for y in top..=bottom {
            frame.put_pixel(left, y, color);
            frame.put_pixel(right, y, color);
        }
    }
}

fn fill_block(frame: &mut Frame, x: i32, y: i32, size: i32, color: Rgb) {
    for dy in 0..size {
        for dx in 0..size {
            frame.put_pixel(x + dx, y + dy, color);
        }
    }
}

/// Renders `text` with its glyph bottoms resting on `baseline`.
fn draw_text(frame: &mut Frame, mut x: i32, baseline: i32, text: &str, scale: i32, color: Rgb) {
    let top = baseline - GLYPH_HEIGHT * scale;
    for ch in text.chars() {
        if let Some(rows) = glyph_bits(ch) {
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if (bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 1 {
                        let px = x + col * scale;
                        let py = top + row as i32 * scale;
                        fill_block(frame, px, py, scale, color);
                    }
                }
            }
        }
        x += GLYPH_ADVANCE * scale;
    }
}
