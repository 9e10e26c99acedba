//! Scripted backend: replays predetermined detections frame by frame.
//!
//! Used by the synthetic demo and by tests. Each capability has its own queue,
//! so the coarse pass and the landmark pass advance independently. An empty
//! queue reports no faces.

use anyhow::Result;
use image::GrayImage;
use std::collections::VecDeque;
use std::f64::consts::PI;

use crate::detect::backend::{DetectionCapability, DetectorBackend};
use crate::detect::result::{DetectionResult, FaceBox, FaceLandmarks, LANDMARK_COUNT};
use crate::geometry::Point;

/// One scripted frame: what the face locator and the landmark pass report.
#[derive(Clone, Debug, Default)]
pub struct ScriptedFrame {
    pub faces: Vec<FaceBox>,
    pub landmarks: Vec<FaceLandmarks>,
}

impl ScriptedFrame {
    /// A single face whose landmarks produce the given EAR and MAR.
    pub fn face(ear: f64, mar: f64) -> Self {
        let center = Point::new(320.0, 240.0);
        let scale = 120.0;
        Self {
            faces: vec![FaceBox::new(200, 120, 240, 240)],
            landmarks: vec![synthetic_landmarks(center, scale, ear, mar)],
        }
    }

    /// No face found by either pass.
    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Default)]
pub struct ScriptedBackend {
    faces: VecDeque<Vec<FaceBox>>,
    landmarks: VecDeque<Vec<FaceLandmarks>>,
}

impl ScriptedBackend {
    pub fn new(frames: impl IntoIterator<Item = ScriptedFrame>) -> Self {
        let mut backend = Self::default();
        for frame in frames {
            backend.push(frame);
        }
        backend
    }

    /// Script from per-frame `(ear, mar)` pairs; `None` is a frame without a face.
    pub fn from_ratios(ratios: impl IntoIterator<Item = Option<(f64, f64)>>) -> Self {
        Self::new(ratios.into_iter().map(|r| match r {
            Some((ear, mar)) => ScriptedFrame::face(ear, mar),
            None => ScriptedFrame::empty(),
        }))
    }

    pub fn push(&mut self, frame: ScriptedFrame) {
        self.faces.push_back(frame.faces);
        self.landmarks.push_back(frame.landmarks);
    }

    /// Frames left in the landmark queue.
    pub fn remaining(&self) -> usize {
        self.landmarks.len()
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn supports(&self, capability: DetectionCapability) -> bool {
        matches!(
            capability,
            DetectionCapability::FaceLocalization | DetectionCapability::Landmarks
        )
    }

    fn detect(
        &mut self,
        capability: DetectionCapability,
        _gray: &GrayImage,
    ) -> Result<DetectionResult> {
        Ok(match capability {
            DetectionCapability::FaceLocalization => {
                DetectionResult::faces(self.faces.pop_front().unwrap_or_default())
            }
            DetectionCapability::Landmarks => {
                DetectionResult::with_landmarks(self.landmarks.pop_front().unwrap_or_default())
            }
        })
    }
}

/// Build a plausible 68-point face whose eyes have exactly `ear` and whose
/// mouth has exactly `mar`. `scale` is roughly half the face width in pixels.
pub fn synthetic_landmarks(center: Point, scale: f64, ear: f64, mar: f64) -> FaceLandmarks {
    let mut unit = [Point::default(); LANDMARK_COUNT];

    // Jaw 0..17: lower half-ellipse from left temple to right temple.
    for (i, p) in unit.iter_mut().enumerate().take(17) {
        let t = PI - (i as f64) * PI / 16.0;
        *p = Point::new(t.cos(), 0.1 + 0.9 * t.sin());
    }
    // Brows 17..27.
    for (i, p) in unit.iter_mut().enumerate().skip(17).take(10) {
        let k = (i - 17) as f64;
        let x = if k < 5.0 { -0.8 + k * 0.13 } else { 0.28 + (k - 5.0) * 0.13 };
        *p = Point::new(x, -0.55);
    }
    // Nose 27..36: bridge then base.
    for (i, p) in unit.iter_mut().enumerate().skip(27).take(4) {
        *p = Point::new(0.0, -0.35 + (i - 27) as f64 * 0.12);
    }
    for (i, p) in unit.iter_mut().enumerate().skip(31).take(5) {
        *p = Point::new(-0.16 + (i - 31) as f64 * 0.08, 0.15);
    }

    // Eyes: corners 0.3 apart, lids at +-h with two vertical spans of 2h.
    // EAR = (2h + 2h) / (2 * 0.3).
    let h = 0.15 * ear;
    for (start, cx) in [(36usize, -0.4), (42usize, 0.4)] {
        let cy = -0.3;
        let eye = [
            Point::new(cx - 0.15, cy),
            Point::new(cx - 0.075, cy - h),
            Point::new(cx + 0.075, cy - h),
            Point::new(cx + 0.15, cy),
            Point::new(cx + 0.075, cy + h),
            Point::new(cx - 0.075, cy + h),
        ];
        unit[start..start + 6].copy_from_slice(&eye);
    }

    // Mouth: outer contour on an ellipse with half-width 0.3. Points 2/10 and
    // 4/8 sit at +-60 degrees from vertical, so each vertical span is
    // 2 * k * sin(60deg) and MAR = 2 * k * sin(60deg) / 0.6.
    let k = 0.3 * mar / (PI / 3.0).sin();
    let (mx, my) = (0.0, 0.45);
    for i in 0..12 {
        let t = PI - (i as f64) * PI / 6.0;
        unit[48 + i] = Point::new(mx + 0.3 * t.cos(), my - k * t.sin());
    }
    for i in 0..8 {
        let t = PI - (i as f64) * PI / 4.0;
        unit[60 + i] = Point::new(mx + 0.2 * t.cos(), my - 0.6 * k * t.sin());
    }

    FaceLandmarks::new(unit.map(|p| Point::new(center.x + p.x * scale, center.y + p.y * scale)))
}
