//! Synthetic frame source (`stub://`).
//!
//! Produces a smooth background with a bright oval where a face would sit.
//! Timestamps come from the wall clock unless a fixed frame interval is set,
//! which makes runs reproducible in tests and the demo.

use anyhow::{bail, Result};
use image::{Rgb, RgbImage};
use std::time::{Duration, Instant};

use super::{FrameSource, SourceStats};
use crate::frame::Frame;

pub struct SyntheticSource {
    name: String,
    width: u32,
    height: u32,
    frame_count: u64,
    connected: bool,
    clock: Option<(Instant, Duration)>,
    limit: Option<u64>,
}

impl SyntheticSource {
    pub fn new(name: &str, width: u32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            frame_count: 0,
            connected: false,
            clock: None,
            limit: None,
        }
    }

    /// Stamp frame `n` (1-based) at `start + n * interval` instead of now.
    pub fn with_clock(mut self, start: Instant, interval: Duration) -> Self {
        self.clock = Some((start, interval));
        self
    }

    /// Fail capture after `frames` frames, ending the session.
    pub fn with_limit(mut self, frames: u64) -> Self {
        self.limit = Some(frames);
        self
    }

    fn captured_at(&self) -> Instant {
        match self.clock {
            Some((start, interval)) => {
                let steps = u32::try_from(self.frame_count).unwrap_or(u32::MAX);
                start + interval * steps
            }
            None => Instant::now(),
        }
    }

    fn render(&self) -> RgbImage {
        let (w, h) = (self.width as f64, self.height as f64);
        let (cx, cy) = (w / 2.0, h / 2.0);
        let (rx, ry) = (w / 6.0, h / 3.0);
        let shade = (self.frame_count % 16) as u8;
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let dx = (x as f64 - cx) / rx;
            let dy = (y as f64 - cy) / ry;
            if dx * dx + dy * dy <= 1.0 {
                Rgb([210, 170, 140])
            } else {
                let base = ((x + y) % 64) as u8 + shade;
                Rgb([base, base / 2 + 40, 90])
            }
        })
    }
}

impl FrameSource for SyntheticSource {
    fn connect(&mut self) -> Result<()> {
        self.connected = true;
        log::info!("SyntheticSource: connected to stub://{} (synthetic)", self.name);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        if !self.connected {
            bail!("synthetic source stub://{} not connected", self.name);
        }
        if self.limit.is_some_and(|limit| self.frame_count >= limit) {
            bail!("synthetic source stub://{} exhausted", self.name);
        }
        self.frame_count += 1;
        Ok(Frame::new(self.render(), self.captured_at(), self.frame_count))
    }

    fn is_healthy(&self) -> bool {
        self.connected
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: format!("stub://{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_connect() {
        let mut source = SyntheticSource::new("t", 8, 8);
        assert!(source.next_frame().is_err());
        assert!(!source.is_healthy());
    }

    #[test]
    fn fixed_clock_and_limit() -> Result<()> {
        let start = Instant::now();
        let mut source = SyntheticSource::new("t", 16, 12)
            .with_clock(start, Duration::from_millis(500))
            .with_limit(2);
        source.connect()?;

        let first = source.next_frame()?;
        let second = source.next_frame()?;
        assert_eq!(first.captured_at, start + Duration::from_millis(500));
        assert_eq!(second.captured_at, start + Duration::from_secs(1));
        assert_eq!(second.sequence, 2);
        assert!(source.next_frame().is_err());
        assert_eq!(source.stats().frames_captured, 2);
        Ok(())
    }
}
