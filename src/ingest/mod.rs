//! Frame sources.
//!
//! A source produces `Frame`s for the pipeline, one per tick. `Ok(None)` from
//! `next_frame` means "no frame this tick" and is not an error; the loop
//! simply skips the tick. Failing to open a source is a startup error.
//!
//! - `stub://<name>`: synthetic scene (development and tests)

pub mod synthetic;

use anyhow::{anyhow, Result};

pub use synthetic::SyntheticSource;

use crate::config::CameraSettings;
use crate::frame::Frame;

/// Statistics for a frame source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub url: String,
}

/// External frame source seam.
pub trait FrameSource: Send {
    /// Open the underlying device or stream.
    fn connect(&mut self) -> Result<()>;

    /// Capture the next frame. `Ok(None)` is a transient miss.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    fn is_healthy(&self) -> bool;

    fn stats(&self) -> SourceStats;
}

/// Build a source for the configured camera URL.
pub fn open_source(camera: &CameraSettings) -> Result<Box<dyn FrameSource>> {
    if camera.url.starts_with("stub://") {
        return Ok(Box::new(SyntheticSource::new(
            &camera.url,
            camera.width,
            camera.height,
        )));
    }
    Err(anyhow!(
        "camera '{}' cannot be opened: unsupported source url '{}' (supported: stub://)",
        camera.id,
        camera.url
    ))
}
