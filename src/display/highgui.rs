use anyhow::{Context, Result};
use opencv::core::{Mat, Point, Rect, Scalar};
use opencv::{highgui, imgproc};

use super::{Display, DisplayEvent};
use crate::cv::rgb_to_bgr_mat;
use crate::frame::Frame;
use crate::overlay::{Color, OverlayOp, LINE_THICKNESS, POINT_RADIUS, TEXT_SCALE};

/// OpenCV HighGUI window.
pub struct HighGuiDisplay {
    window: String,
    quit_key: char,
}

impl HighGuiDisplay {
    pub fn new(title: &str, quit_key: char) -> Result<Self> {
        highgui::named_window(title, highgui::WINDOW_AUTOSIZE)
            .with_context(|| format!("failed to open display window '{}'", title))?;
        log::info!("HighGuiDisplay: window '{}' open, press '{}' to quit", title, quit_key);
        Ok(Self {
            window: title.to_string(),
            quit_key,
        })
    }

    fn draw(canvas: &mut Mat, op: &OverlayOp) -> Result<()> {
        match op {
            OverlayOp::Rect { face, color } => imgproc::rectangle(
                canvas,
                Rect::new(face.x, face.y, face.w, face.h),
                scalar(*color),
                LINE_THICKNESS,
                imgproc::LINE_8,
                0,
            )?,
            OverlayOp::Dot { at, color } => imgproc::circle(
                canvas,
                Point::new(at.0, at.1),
                POINT_RADIUS,
                scalar(*color),
                -1,
                imgproc::LINE_8,
                0,
            )?,
            OverlayOp::Text { text, at, color } => imgproc::put_text(
                canvas,
                text,
                Point::new(at.0, at.1),
                imgproc::FONT_HERSHEY_SIMPLEX,
                TEXT_SCALE,
                scalar(*color),
                LINE_THICKNESS,
                imgproc::LINE_8,
                false,
            )?,
        }
        Ok(())
    }
}

impl Display for HighGuiDisplay {
    fn show(&mut self, frame: &Frame, overlay: &[OverlayOp]) -> Result<DisplayEvent> {
        let mut canvas = rgb_to_bgr_mat(frame.image())?;
        for op in overlay {
            Self::draw(&mut canvas, op)?;
        }
        highgui::imshow(&self.window, &canvas).context("imshow failed")?;

        let key = highgui::wait_key(1)?;
        if key >= 0 && char::from((key & 0xFF) as u8) == self.quit_key {
            log::info!("quit key pressed");
            return Ok(DisplayEvent::Quit);
        }
        Ok(DisplayEvent::Continue)
    }
}

impl Drop for HighGuiDisplay {
    fn drop(&mut self) {
        if let Err(err) = highgui::destroy_window(&self.window) {
            log::warn!("HighGuiDisplay: failed to close window: {}", err);
        }
    }
}

/// Overlay colours are RGB; OpenCV scalars are BGR.
fn scalar(color: Color) -> Scalar {
    Scalar::new(
        f64::from(color.b),
        f64::from(color.g),
        f64::from(color.r),
        0.0,
    )
}
