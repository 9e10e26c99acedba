//! Overlay plan: the boxes, points and text drawn over a frame.
//!
//! Building the plan is separate from drawing it so every display backend
//! renders the same diagnostics.

use crate::alert::AlertKind;
use crate::detect::FaceBox;
use crate::monitor::FrameReport;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const RED: Color = Color { r: 255, g: 0, b: 0 };
    pub const GREEN: Color = Color { r: 0, g: 255, b: 0 };
    pub const BLUE: Color = Color { r: 0, g: 0, b: 255 };
}

pub const TEXT_SCALE: f64 = 0.7;
pub const LINE_THICKNESS: i32 = 2;
pub const POINT_RADIUS: i32 = 2;

pub const NO_FACE_BANNER: &str = "NO FACE DETECTED!";

#[derive(Clone, Debug, PartialEq)]
pub enum OverlayOp {
    /// Outline around a coarse face box.
    Rect { face: FaceBox, color: Color },
    /// Filled landmark dot.
    Dot { at: (i32, i32), color: Color },
    /// Text anchored at its baseline-left corner.
    Text {
        text: String,
        at: (i32, i32),
        color: Color,
    },
}

/// Build the overlay for one analysed frame.
pub fn plan(report: &FrameReport) -> Vec<OverlayOp> {
    let mut ops = Vec::new();

    if report.no_face() {
        ops.push(text(NO_FACE_BANNER, (50, 50), Color::RED));
    }
    for face in &report.coarse_faces {
        ops.push(OverlayOp::Rect {
            face: *face,
            color: Color::BLUE,
        });
    }

    for landmarks in &report.landmarks {
        let eyes = landmarks.left_eye().into_iter().chain(landmarks.right_eye());
        for p in eyes {
            ops.push(OverlayOp::Dot {
                at: p.to_pixel(),
                color: Color::GREEN,
            });
        }
        for p in landmarks.mouth() {
            ops.push(OverlayOp::Dot {
                at: p.to_pixel(),
                color: Color::BLUE,
            });
        }
    }

    if let Some(m) = report.measurement {
        ops.push(text(&format!("EAR: {}", fmt_ratio(m.ear)), (50, 100), Color::GREEN));
        ops.push(text(&format!("MAR: {}", fmt_ratio(m.mar)), (50, 130), Color::BLUE));
    }

    for kind in report.alerts() {
        let at = match kind {
            AlertKind::Drowsiness => (50, 50),
            AlertKind::Yawning => (50, 70),
        };
        ops.push(text(kind.banner(), at, Color::RED));
    }

    ops
}

fn text(text: &str, at: (i32, i32), color: Color) -> OverlayOp {
    OverlayOp::Text {
        text: text.to_string(),
        at,
        color,
    }
}

fn fmt_ratio(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "--".to_string(),
    }
}
