//! Frame display and keyboard polling.

#[cfg(feature = "backend-opencv")]
pub mod highgui;

#[cfg(feature = "backend-opencv")]
pub use highgui::HighGuiDisplay;

use anyhow::Result;

use crate::frame::Frame;
use crate::overlay::OverlayOp;

pub const DEFAULT_WINDOW_TITLE: &str = "Driver Monitoring - EAR & MAR Detection";
pub const DEFAULT_QUIT_KEY: char = 'x';

/// What the user did while the frame was on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayEvent {
    Continue,
    Quit,
}

/// Shows annotated frames and polls for the quit key.
pub trait Display {
    fn show(&mut self, frame: &Frame, overlay: &[OverlayOp]) -> Result<DisplayEvent>;
}

/// Headless display: draws nothing, never asks to quit.
#[derive(Default)]
pub struct NullDisplay {
    shown: u64,
}

impl NullDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_shown(&self) -> u64 {
        self.shown
    }
}

impl Display for NullDisplay {
    fn show(&mut self, frame: &Frame, overlay: &[OverlayOp]) -> Result<DisplayEvent> {
        self.shown += 1;
        log::trace!(
            "frame #{}: {} overlay ops (headless)",
            frame.sequence,
            overlay.len()
        );
        Ok(DisplayEvent::Continue)
    }
}
