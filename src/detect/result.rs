/// Axis-aligned box `(x1, y1, x2, y2)` in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Shift by a region origin (region-relative to frame coordinates).
    /// Saturates at `i32::MAX` instead of overflowing on out-of-range boxes.
    pub fn offset(self, dx: u32, dy: u32) -> Self {
        let dx = i32::try_from(dx).unwrap_or(i32::MAX);
        let dy = i32::try_from(dy).unwrap_or(i32::MAX);
        Self {
            x1: self.x1.saturating_add(dx),
            y1: self.y1.saturating_add(dy),
            x2: self.x2.saturating_add(dx),
            y2: self.y2.saturating_add(dy),
        }
    }

    pub fn to_array(self) -> [i32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

/// One labeled box produced by a detector. Ephemeral: consumed within the frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub label: String,
    /// 0..=1
    pub confidence: f32,
    pub bbox: BBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
        }
    }
}
