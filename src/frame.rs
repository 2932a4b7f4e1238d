//! Frame model.
//!
//! - `Frame`: one RGB pixel grid produced by a frame source.
//! - `FrameRegion`: read-only view of the part of a frame inside the ROI.
//!   Detectors receive this, never the whole frame.
//!
//! Clipping never panics: a ROI that extends past the frame edges is shrunk to
//! fit, and a clip with no area yields `None`.

use anyhow::{anyhow, Result};

use crate::roi::RoiRect;

/// Bytes per pixel. Frames are packed RGB.
pub const CHANNELS: usize = 3;

/// A decoded RGB frame.
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Monotonic sequence number assigned by the source.
    pub sequence: u64,
}

impl Frame {
    /// Wrap packed RGB bytes. Fails when the buffer does not match the dimensions.
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(CHANNELS))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            sequence,
        })
    }

    /// Solid-color frame, mostly useful for tests and synthetic sources.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], sequence: u64) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * CHANNELS);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self {
            data,
            width,
            height,
            sequence,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * CHANNELS;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    /// Paint an axis-aligned block. Out-of-range parts are ignored.
    pub fn fill_rect(&mut self, rect: RoiRect, rgb: [u8; 3]) {
        let Some(clamped) = clamp_to_extent(rect, self.width, self.height) else {
            return;
        };
        for y in clamped.y..clamped.y + clamped.height {
            for x in clamped.x..clamped.x + clamped.width {
                let idx = (y as usize * self.width as usize + x as usize) * CHANNELS;
                self.data[idx..idx + CHANNELS].copy_from_slice(&rgb);
            }
        }
    }

    /// Clip the frame to a ROI. Returns `None` when the clipped area is empty.
    pub fn clip(&self, roi: RoiRect) -> Option<FrameRegion<'_>> {
        let rect = clamp_to_extent(roi, self.width, self.height)?;
        Some(FrameRegion { frame: self, rect })
    }
}

/// Shrink `rect` so it lies inside a `width` x `height` frame.
pub fn clamp_to_extent(rect: RoiRect, width: u32, height: u32) -> Option<RoiRect> {
    if rect.x >= width || rect.y >= height {
        return None;
    }
    let w = rect.width.min(width - rect.x);
    let h = rect.height.min(height - rect.y);
    if w == 0 || h == 0 {
        return None;
    }
    Some(RoiRect {
        x: rect.x,
        y: rect.y,
        width: w,
        height: h,
    })
}

/// Read-only view of the clipped part of a frame.
///
/// Coordinates passed to `pixel` are relative to the region's top-left corner.
pub struct FrameRegion<'a> {
    frame: &'a Frame,
    rect: RoiRect,
}

impl<'a> FrameRegion<'a> {
    pub fn width(&self) -> u32 {
        self.rect.width
    }

    pub fn height(&self) -> u32 {
        self.rect.height
    }

    /// The clamped rectangle in frame coordinates.
    pub fn rect(&self) -> RoiRect {
        self.rect
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.rect.width || y >= self.rect.height {
            return None;
        }
        self.frame.pixel(self.rect.x + x, self.rect.y + y)
    }

    /// One row of packed RGB bytes.
    pub fn row(&self, y: u32) -> Option<&'a [u8]> {
        if y >= self.rect.height {
            return None;
        }
        let stride = self.frame.width as usize * CHANNELS;
        let start = (self.rect.y + y) as usize * stride + self.rect.x as usize * CHANNELS;
        let end = start + self.rect.width as usize * CHANNELS;
        Some(&self.frame.data[start..end])
    }
}
