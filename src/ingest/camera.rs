//! OpenCV camera source (`camera:<index>`).

use anyhow::{anyhow, bail, Context, Result};
use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture};
use std::time::Instant;

use super::{FrameSource, SourceStats};
use crate::cv::bgr_mat_to_rgb;
use crate::frame::Frame;

pub struct CameraSource {
    index: i32,
    width: u32,
    height: u32,
    target_fps: u32,
    capture: Option<VideoCapture>,
    frame_count: u64,
    last_error: Option<String>,
}

impl CameraSource {
    pub fn new(index: i32, width: u32, height: u32, target_fps: u32) -> Self {
        Self {
            index,
            width,
            height,
            target_fps,
            capture: None,
            frame_count: 0,
            last_error: None,
        }
    }
}

impl FrameSource for CameraSource {
    fn connect(&mut self) -> Result<()> {
        let mut capture = VideoCapture::new(self.index, videoio::CAP_ANY)
            .with_context(|| format!("open camera {}", self.index))?;
        if !capture.is_opened()? {
            bail!("camera {} could not be opened", self.index);
        }
        for (prop, value) in [
            (videoio::CAP_PROP_FRAME_WIDTH, f64::from(self.width)),
            (videoio::CAP_PROP_FRAME_HEIGHT, f64::from(self.height)),
            (videoio::CAP_PROP_FPS, f64::from(self.target_fps)),
        ] {
            if !capture.set(prop, value).unwrap_or(false) {
                log::warn!(
                    "CameraSource: camera {} ignored property {} = {}",
                    self.index,
                    prop,
                    value
                );
            }
        }
        self.capture = Some(capture);
        self.last_error = None;
        log::info!("CameraSource: connected to camera {}", self.index);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        let capture = self
            .capture
            .as_mut()
            .ok_or_else(|| anyhow!("camera {} not connected", self.index))?;
        let mut mat = Mat::default();
        let grabbed = capture.read(&mut mat).context("capture camera frame")?;
        if !grabbed || mat.empty() {
            self.last_error = Some("no frame returned".to_string());
            bail!("camera {} returned no frame", self.index);
        }
        let image = bgr_mat_to_rgb(&mat)?;
        self.frame_count += 1;
        Ok(Frame::new(image, Instant::now(), self.frame_count))
    }

    fn is_healthy(&self) -> bool {
        self.capture.is_some() && self.last_error.is_none()
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: format!("camera:{}", self.index),
        }
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            if let Err(err) = capture.release() {
                log::warn!("CameraSource: failed to release camera {}: {}", self.index, err);
            }
        }
    }
}
