//! Captured frames.
//!
//! A `Frame` lives for one loop iteration: it is captured, preprocessed,
//! handed to the display with its overlay plan, and dropped.

use anyhow::{anyhow, Result};
use image::RgbImage;
use std::time::Instant;

/// One captured RGB frame.
pub struct Frame {
    image: RgbImage,
    /// Monotonic capture instant; the debounce timers run on this clock.
    pub captured_at: Instant,
    /// Per-source capture counter, starting at 1.
    pub sequence: u64,
}

impl Frame {
    pub fn new(image: RgbImage, captured_at: Instant, sequence: u64) -> Self {
        Self {
            image,
            captured_at,
            sequence,
        }
    }

    /// Wrap a packed RGB24 buffer.
    pub fn from_rgb(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        captured_at: Instant,
        sequence: u64,
    ) -> Result<Self> {
        let len = pixels.len();
        let image = RgbImage::from_raw(width, height, pixels).ok_or_else(|| {
            anyhow!(
                "RGB frame length mismatch: {}x{} needs {} bytes, got {}",
                width,
                height,
                width as usize * height as usize * 3,
                len
            )
        })?;
        Ok(Self::new(image, captured_at, sequence))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }
}
