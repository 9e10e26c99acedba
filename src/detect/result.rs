use anyhow::{anyhow, Result};
use std::ops::Range;

use crate::geometry::{bounding_area, Point};

/// Number of fiducial points produced per face by the landmark detector.
pub const LANDMARK_COUNT: usize = 68;

pub const LEFT_EYE: Range<usize> = 36..42;
pub const RIGHT_EYE: Range<usize> = 42..48;
pub const MOUTH: Range<usize> = 48..68;

/// Result of running a detector backend on one preprocessed frame.
#[derive(Clone, Debug, Default)]
pub struct DetectionResult {
    /// Face rectangles (pixel coordinates).
    pub faces: Vec<FaceBox>,
    /// Landmark sets, one per face found by a landmark-capable backend.
    pub landmarks: Vec<FaceLandmarks>,
}

impl DetectionResult {
    pub fn faces(faces: Vec<FaceBox>) -> Self {
        Self {
            faces,
            landmarks: Vec::new(),
        }
    }

    pub fn with_landmarks(landmarks: Vec<FaceLandmarks>) -> Self {
        Self {
            faces: Vec::new(),
            landmarks,
        }
    }
}

/// Face rectangle in frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl FaceBox {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }
}

/// The 68-point face landmark layout (iBUG 300-W ordering).
#[derive(Clone, Debug, PartialEq)]
pub struct FaceLandmarks {
    points: [Point; LANDMARK_COUNT],
}

impl FaceLandmarks {
    pub fn new(points: [Point; LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    /// Build from a detector's point list, which must hold exactly 68 points.
    pub fn from_slice(points: &[Point]) -> Result<Self> {
        let points: [Point; LANDMARK_COUNT] = points.try_into().map_err(|_| {
            anyhow!(
                "landmark set must have {} points, got {}",
                LANDMARK_COUNT,
                points.len()
            )
        })?;
        Ok(Self { points })
    }

    pub fn left_eye(&self) -> [Point; 6] {
        self.slice(LEFT_EYE)
    }

    pub fn right_eye(&self) -> [Point; 6] {
        self.slice(RIGHT_EYE)
    }

    pub fn mouth(&self) -> [Point; 20] {
        self.slice(MOUTH)
    }

    /// Bounding-box area of all points; used to pick the driver's face.
    pub fn area(&self) -> f64 {
        bounding_area(&self.points)
    }

    fn slice<const N: usize>(&self, range: Range<usize>) -> [Point; N] {
        debug_assert_eq!(range.len(), N);
        std::array::from_fn(|i| self.points[range.start + i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indexed() -> FaceLandmarks {
        FaceLandmarks::new(std::array::from_fn(|i| Point::new(i as f64, 0.0)))
    }

    #[test]
    fn slices_follow_fixed_index_ranges() {
        let lm = indexed();
        assert_eq!(lm.left_eye()[0].x, 36.0);
        assert_eq!(lm.left_eye()[5].x, 41.0);
        assert_eq!(lm.right_eye()[0].x, 42.0);
        assert_eq!(lm.right_eye()[5].x, 47.0);
        assert_eq!(lm.mouth()[0].x, 48.0);
        assert_eq!(lm.mouth()[19].x, 67.0);
    }

    #[test]
    fn from_slice_rejects_wrong_length() {
        let points = vec![Point::default(); 5];
        assert!(FaceLandmarks::from_slice(&points).is_err());
        let points = vec![Point::default(); LANDMARK_COUNT];
        assert!(FaceLandmarks::from_slice(&points).is_ok());
    }
}
