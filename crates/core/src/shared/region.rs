/// Axis-aligned pixel rectangle.
///
/// Detector output may extend past the frame or be degenerate; consumers
/// call [`Region::clamp_to`] before touching pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a region from corner coordinates, rounding each corner to the nearest pixel.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let x = x1.round() as i32;
        let y = y1.round() as i32;
        Self {
            x,
            y,
            width: x2.round() as i32 - x,
            height: y2.round() as i32 - y,
        }
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Region {
        Region {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            ..*self
        }
    }

    /// Scales origin and extent independently along each axis.
    pub fn scale(&self, sx: f64, sy: f64) -> Region {
        Region::from_corners(
            self.x as f64 * sx,
            self.y as f64 * sy,
            self.right() as f64 * sx,
            self.bottom() as f64 * sy,
        )
    }

    /// Intersects with `[0, width) x [0, height)`.
    ///
    /// Returns `None` when nothing of the region is visible, which is how
    /// malformed detector output gets filtered out.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Region> {
        if self.is_empty() {
            return None;
        }
        let x1 = self.x.max(0);
        let y1 = self.y.max(0);
        let x2 = self.right().min(width.min(i32::MAX as u32) as i32);
        let y2 = self.bottom().min(height.min(i32::MAX as u32) as i32);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Region::new(x1, y1, x2 - x1, y2 - y1))
    }
}
