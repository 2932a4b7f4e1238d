//! Region-of-interest lifecycle.
//!
//! The ROI is the only piece of state shared between the input surface and the
//! frame loop. `RoiManager` keeps it behind a mutex; drag gestures arrive as
//! discrete calls and the frame loop reads one `current()` snapshot per frame.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};

/// Default minimum ROI side length in pixels.
pub const DEFAULT_MIN_ROI_SIZE: u32 = 10;

/// A point reported by the input surface. Signed: a drag may leave the window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Normalized region of interest in frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoiRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl RoiRect {
    /// `[x, y, width, height]`, the wire layout used in notifications.
    pub fn to_array(self) -> [u32; 4] {
        [self.x, self.y, self.width, self.height]
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl std::fmt::Display for RoiRect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "x={}, y={}, w={}, h={}",
            self.x, self.y, self.width, self.height
        )
    }
}

/// Apply the minimum-size rule to a raw drag.
///
/// Each axis is checked independently: a side shorter than `min_size` is
/// extended away from the start point, in the direction of the drag.
pub fn validate_drag(start: Point, end: Point, min_size: u32) -> (i64, i64, i64, i64) {
    let min = min_size as i64;
    let (x1, y1) = (start.x as i64, start.y as i64);
    let (mut x2, mut y2) = (end.x as i64, end.y as i64);

    if (x2 - x1).abs() < min {
        x2 = if x2 > x1 { x1 + min } else { x1 - min };
    }
    if (y2 - y1).abs() < min {
        y2 = if y2 > y1 { y1 + min } else { y1 - min };
    }
    (x1, y1, x2, y2)
}

/// Validate and normalize a drag into a `RoiRect`.
///
/// An origin left of or above the frame is shifted to zero, keeping the size.
pub fn normalize_drag(start: Point, end: Point, min_size: u32) -> RoiRect {
    let (x1, y1, x2, y2) = validate_drag(start, end, min_size);
    let width = (x2 - x1).unsigned_abs();
    let height = (y2 - y1).unsigned_abs();
    RoiRect {
        x: to_coord(x1.min(x2)),
        y: to_coord(y1.min(y2)),
        width: to_coord(width as i64),
        height: to_coord(height as i64),
    }
}

fn to_coord(value: i64) -> u32 {
    value.clamp(0, u32::MAX as i64) as u32
}

#[derive(Debug, Default)]
struct RoiState {
    active: Option<RoiRect>,
    drawing: bool,
    start: Option<Point>,
}

/// Owner of the active ROI and the in-progress drag.
#[derive(Debug)]
pub struct RoiManager {
    min_size: u32,
    state: Mutex<RoiState>,
}

impl RoiManager {
    pub fn new(min_size: u32) -> Self {
        Self {
            min_size: min_size.max(1),
            state: Mutex::new(RoiState::default()),
        }
    }

    pub fn min_size(&self) -> u32 {
        self.min_size
    }

    // A panic while holding the lock cannot leave a torn rectangle: every write
    // replaces the whole `Option<RoiRect>` in one assignment.
    fn lock(&self) -> MutexGuard<'_, RoiState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start a drag gesture.
    pub fn begin_drag(&self, point: Point) {
        let mut state = self.lock();
        state.drawing = true;
        state.start = Some(point);
    }

    /// Record a provisional end point. Returns the preview rectangle.
    ///
    /// The preview is for rendering only; the active ROI is not touched.
    pub fn update_drag(&self, point: Point) -> Option<RoiRect> {
        let state = self.lock();
        if !state.drawing {
            return None;
        }
        let start = state.start?;
        Some(normalize_drag(start, point, self.min_size))
    }

    /// Finish a drag. The validated rectangle replaces the active ROI.
    ///
    /// Without a preceding `begin_drag` this is a no-op that keeps the prior ROI.
    pub fn end_drag(&self, point: Point) -> Option<RoiRect> {
        let mut state = self.lock();
        state.drawing = false;
        let Some(start) = state.start.take() else {
            log::warn!(
                "roi: end_drag at ({}, {}) without begin_drag; keeping current roi",
                point.x,
                point.y
            );
            return None;
        };
        let roi = normalize_drag(start, point, self.min_size);
        state.active = Some(roi);
        log::info!("roi set: {}", roi);
        Some(roi)
    }

    /// Drop the active ROI and any drag in progress.
    pub fn clear(&self) {
        let mut state = self.lock();
        *state = RoiState::default();
        log::info!("roi cleared");
    }

    /// Snapshot of the active ROI.
    pub fn current(&self) -> Option<RoiRect> {
        self.lock().active
    }
}

impl Default for RoiManager {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_ROI_SIZE)
    }
}
