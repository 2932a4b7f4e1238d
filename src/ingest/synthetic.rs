use anyhow::{anyhow, Result};

use super::{FrameSource, SourceStats};
use crate::detect::backends::stub::MARKER_RGB;
use crate::frame::Frame;
use crate::roi::RoiRect;

const BACKGROUND_RGB: [u8; 3] = [40, 40, 40];
const CYCLE_FRAMES: u64 = 60;
const VISIBLE_FROM: u64 = 20;
const VISIBLE_UNTIL: u64 = 40;

/// Synthetic source for `stub://` URLs.
///
/// Simulates a scene where an object walks in and out: in every cycle of 60
/// frames, a marker block is visible for frames 20..40, at a position that
/// shifts from cycle to cycle. Pair it with `StubDetector`.
pub struct SyntheticSource {
    url: String,
    width: u32,
    height: u32,
    connected: bool,
    frame_count: u64,
}

impl SyntheticSource {
    pub fn new(url: &str, width: u32, height: u32) -> Self {
        Self {
            url: url.to_string(),
            width,
            height,
            connected: false,
            frame_count: 0,
        }
    }

    fn marker_rect(&self, cycle: u64) -> RoiRect {
        let width = (self.width / 10).max(1);
        let height = (self.height / 4).max(1);
        let lanes = (self.width / width.max(1)).max(1) as u64;
        RoiRect {
            x: ((cycle % lanes) as u32) * width,
            y: self.height / 2 - height / 2,
            width,
            height,
        }
    }

    fn render(&self) -> Frame {
        let mut frame = Frame::filled(self.width, self.height, BACKGROUND_RGB, self.frame_count);
        let phase = (self.frame_count - 1) % CYCLE_FRAMES;
        if (VISIBLE_FROM..VISIBLE_UNTIL).contains(&phase) {
            let cycle = (self.frame_count - 1) / CYCLE_FRAMES;
            frame.fill_rect(self.marker_rect(cycle), MARKER_RGB);
        }
        frame
    }
}

impl FrameSource for SyntheticSource {
    fn connect(&mut self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(anyhow!(
                "synthetic source {} has empty frame size {}x{}",
                self.url,
                self.width,
                self.height
            ));
        }
        self.connected = true;
        log::info!(
            "SyntheticSource: connected to {} ({}x{})",
            self.url,
            self.width,
            self.height
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if !self.connected {
            return Err(anyhow!("synthetic source not connected; call connect() first"));
        }
        self.frame_count += 1;
        Ok(Some(self.render()))
    }

    fn is_healthy(&self) -> bool {
        self.connected
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            url: self.url.clone(),
        }
    }
}
