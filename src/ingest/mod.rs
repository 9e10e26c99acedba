//! Frame ingestion sources.
//!
//! This module provides the sources a monitor can read from:
//! - OpenCV camera by index (feature: backend-opencv)
//! - USB/V4L2 devices (feature: ingest-v4l2)
//! - Still-image directories replayed in name order
//! - Stub source (testing and the demo)
//!
//! Sources are chosen by URI (`camera:0`, `v4l2:/dev/video0`, `images:./clip`,
//! `stub://name`). A source that cannot deliver a frame returns an error; the
//! capture loop treats that as the end of the session.

#[cfg(feature = "backend-opencv")]
pub mod camera;
pub mod images;
#[cfg(feature = "ingest-v4l2")]
mod normalize;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

#[cfg(feature = "backend-opencv")]
pub use camera::CameraSource;
pub use images::ImageSequenceSource;
pub use synthetic::SyntheticSource;
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::V4l2Source;

use anyhow::{anyhow, bail, Result};
use std::fmt;
use std::path::PathBuf;

use crate::frame::Frame;

/// A source of captured frames.
pub trait FrameSource {
    /// Open the underlying device or stream.
    fn connect(&mut self) -> Result<()>;

    /// Capture the next frame. Errors end the capture loop.
    fn next_frame(&mut self) -> Result<Frame>;

    /// Check if the source is healthy.
    fn is_healthy(&self) -> bool;

    /// Get frame statistics.
    fn stats(&self) -> SourceStats;
}

/// Statistics for a frame source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub source: String,
}

/// Capture settings shared by all sources.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceSettings {
    pub uri: SourceUri,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
}

/// Parsed source URI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceUri {
    Camera(i32),
    V4l2(String),
    Images(PathBuf),
    Stub(String),
}

impl SourceUri {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if let Some(name) = raw.strip_prefix("stub://") {
            return Ok(SourceUri::Stub(name.to_string()));
        }
        let Some((scheme, rest)) = raw.split_once(':') else {
            bail!("source '{}' has no scheme (camera:|v4l2:|images:|stub://)", raw);
        };
        if rest.trim().is_empty() {
            bail!("source '{}' is missing a device, index or path", raw);
        }
        match scheme {
            "camera" => {
                let index = rest
                    .parse::<i32>()
                    .map_err(|_| anyhow!("camera index must be an integer, got '{}'", rest))?;
                if index < 0 {
                    bail!("camera index must be >= 0");
                }
                Ok(SourceUri::Camera(index))
            }
            "v4l2" => Ok(SourceUri::V4l2(rest.to_string())),
            "images" => Ok(SourceUri::Images(PathBuf::from(rest))),
            other => Err(anyhow!("unknown source scheme '{}'", other)),
        }
    }
}

impl fmt::Display for SourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceUri::Camera(index) => write!(f, "camera:{}", index),
            SourceUri::V4l2(device) => write!(f, "v4l2:{}", device),
            SourceUri::Images(dir) => write!(f, "images:{}", dir.display()),
            SourceUri::Stub(name) => write!(f, "stub://{}", name),
        }
    }
}

/// Build the source named by `settings.uri`.
pub fn open_source(settings: &SourceSettings) -> Result<Box<dyn FrameSource>> {
    match &settings.uri {
        SourceUri::Stub(name) => Ok(Box::new(SyntheticSource::new(
            name,
            settings.width,
            settings.height,
        ))),
        SourceUri::Images(dir) => Ok(Box::new(ImageSequenceSource::new(dir.clone())?)),
        SourceUri::Camera(index) => {
            #[cfg(feature = "backend-opencv")]
            {
                Ok(Box::new(CameraSource::new(
                    *index,
                    settings.width,
                    settings.height,
                    settings.target_fps,
                )))
            }
            #[cfg(not(feature = "backend-opencv"))]
            {
                bail!("camera:{} requires the backend-opencv feature", index)
            }
        }
        SourceUri::V4l2(device) => {
            #[cfg(feature = "ingest-v4l2")]
            {
                Ok(Box::new(V4l2Source::new(v4l2::V4l2Config {
                    device: device.clone(),
                    target_fps: settings.target_fps,
                    width: settings.width,
                    height: settings.height,
                })))
            }
            #[cfg(not(feature = "ingest-v4l2"))]
            {
                bail!("v4l2:{} requires the ingest-v4l2 feature", device)
            }
        }
    }
}
