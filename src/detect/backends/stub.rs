use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::detect::backend::ObjectDetector;
use crate::detect::result::{BBox, Detection};
use crate::frame::FrameRegion;

/// Marker color painted by the synthetic frame source for a simulated object.
pub const MARKER_RGB: [u8; 3] = [255, 255, 255];

/// Stub backend for development and tests.
///
/// Reports one `person` box around the marker-colored pixels in the region.
/// Regions whose pixels hash the same as the previous call reuse the previous
/// result instead of rescanning.
pub struct StubDetector {
    label: String,
    confidence: f32,
    last_hash: Option<[u8; 32]>,
    last_result: Vec<Detection>,
}

impl StubDetector {
    pub fn new(label: &str, confidence: f32) -> Self {
        Self {
            label: label.to_string(),
            confidence,
            last_hash: None,
            last_result: Vec::new(),
        }
    }

    fn scan(&self, region: &FrameRegion<'_>) -> Vec<Detection> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for y in 0..region.height() {
            for x in 0..region.width() {
                if region.pixel(x, y) != Some(MARKER_RGB) {
                    continue;
                }
                bounds = Some(match bounds {
                    None => (x, y, x, y),
                    Some((x1, y1, x2, y2)) => (x1.min(x), y1.min(y), x2.max(x), y2.max(y)),
                });
            }
        }
        match bounds {
            Some((x1, y1, x2, y2)) => vec![Detection::new(
                self.label.clone(),
                self.confidence,
                BBox::new(x1 as i32, y1 as i32, x2 as i32 + 1, y2 as i32 + 1),
            )],
            None => Vec::new(),
        }
    }
}

impl Default for StubDetector {
    fn default() -> Self {
        Self::new("person", 0.9)
    }
}

impl ObjectDetector for StubDetector {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, region: &FrameRegion<'_>) -> Result<Vec<Detection>> {
        let mut hasher = Sha256::new();
        hasher.update(region.width().to_le_bytes());
        hasher.update(region.height().to_le_bytes());
        for y in 0..region.height() {
            if let Some(row) = region.row(y) {
                hasher.update(row);
            }
        }
        let current_hash: [u8; 32] = hasher.finalize().into();

        if self.last_hash != Some(current_hash) {
            self.last_result = self.scan(region);
            self.last_hash = Some(current_hash);
        }
        Ok(self.last_result.clone())
    }
}
