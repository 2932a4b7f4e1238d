use anyhow::Result;

use crate::detect::result::Detection;
use crate::frame::FrameRegion;

/// Object detector seam.
///
/// A detector receives the clipped ROI and returns zero or more labeled,
/// confidence-scored boxes. Box coordinates are relative to the region's
/// top-left corner; the pipeline translates them into frame coordinates.
///
/// Detectors are assumed synchronous. An `Err` is treated as a transient
/// per-frame failure: the frame is skipped and the loop continues.
pub trait ObjectDetector: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a clipped region.
    fn detect(&mut self, region: &FrameRegion<'_>) -> Result<Vec<Detection>>;

    /// Optional warm-up hook, run once before the frame loop.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
