/// A raw box in frame pixel coordinates, as produced by a detector.
///
/// Corners may lie outside the frame; [`Region::clamp`] turns the box into
/// the area that can actually be read from a frame buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

/// ROI rectangle inside a frame, guaranteed in bounds and non-empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoiRect {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

impl Region {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    /// Clamps every corner into `[0, width - 1] x [0, height - 1]`.
    ///
    /// The clamped corners are then used as a half-open range, so a box
    /// that spills past the bottom-right edge loses its last row/column.
    pub fn clamped(&self, width: u32, height: u32) -> Region {
        let max_x = width.saturating_sub(1) as i32;
        let max_y = height.saturating_sub(1) as i32;
        Region {
            x1: self.x1.clamp(0, max_x),
            y1: self.y1.clamp(0, max_y),
            x2: self.x2.clamp(0, max_x),
            y2: self.y2.clamp(0, max_y),
        }
    }

    /// Returns the readable ROI, or `None` when the clamped box has no area.
    pub fn clamp(&self, width: u32, height: u32) -> Option<RoiRect> {
        if width == 0 || height == 0 {
            return None;
        }
        let c = self.clamped(width, height);
        if c.x2 <= c.x1 || c.y2 <= c.y1 {
            return None;
        }
        Some(RoiRect {
            x: c.x1 as usize,
            y: c.y1 as usize,
            w: (c.x2 - c.x1) as usize,
            h: (c.y2 - c.y1) as usize,
        })
    }
}
