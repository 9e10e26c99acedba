//! Landmark geometry: points, distances and the aspect ratios.
//!
//! Both ratios compare two vertical spans against one horizontal span of the
//! same feature, which makes them dimensionless: they do not change when the
//! face moves across the frame or towards the camera.

/// A landmark position in frame pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Pixel position rounded for drawing.
    pub fn to_pixel(self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }
}

/// Eye Aspect Ratio over six points ordered: outer corner, two upper lid
/// points, inner corner, two lower lid points.
///
/// Returns `None` when the eye corners coincide or the result is not finite.
pub fn eye_aspect_ratio(eye: &[Point; 6]) -> Option<f64> {
    let a = eye[1].distance(&eye[5]);
    let b = eye[2].distance(&eye[4]);
    let c = eye[0].distance(&eye[3]);
    span_ratio(a, b, c)
}

/// Mouth Aspect Ratio over the 20-point mouth contour (landmarks 48..68).
///
/// Returns `None` when the mouth corners coincide or the result is not finite.
pub fn mouth_aspect_ratio(mouth: &[Point; 20]) -> Option<f64> {
    let a = mouth[2].distance(&mouth[10]);
    let b = mouth[4].distance(&mouth[8]);
    let c = mouth[0].distance(&mouth[6]);
    span_ratio(a, b, c)
}

/// Mean EAR of both eyes. Undefined if either eye is.
pub fn average_ear(left: Option<f64>, right: Option<f64>) -> Option<f64> {
    Some((left? + right?) / 2.0)
}

fn span_ratio(vertical_a: f64, vertical_b: f64, horizontal: f64) -> Option<f64> {
    if horizontal <= f64::EPSILON {
        return None;
    }
    let ratio = (vertical_a + vertical_b) / (2.0 * horizontal);
    ratio.is_finite().then_some(ratio)
}

/// Axis-aligned bounding box area of a point set.
pub(crate) fn bounding_area(points: &[Point]) -> f64 {
    let Some(first) = points.first() else {
        return 0.0;
    };
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    (max_x - min_x) * (max_y - min_y)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Six points on an ellipse with semi-axes `rx`, `ry`, at the angles the
    /// eye ordering expects (corner, upper lid, upper lid, corner, lower lid,
    /// lower lid).
    fn ellipse_eye(cx: f64, cy: f64, rx: f64, ry: f64) -> [Point; 6] {
        let angles = [180.0_f64, 120.0, 60.0, 0.0, 300.0, 240.0];
        angles.map(|deg| {
            let rad = deg.to_radians();
            Point::new(cx + rx * rad.cos(), cy - ry * rad.sin())
        })
    }

    fn mouth(width: f64, opening: f64) -> [Point; 20] {
        let mut pts = [Point::default(); 20];
        // Outer contour 0..12, inner contour 12..20. Only 0, 2, 4, 6, 8, 10
        // enter the ratio.
        for (i, p) in pts.iter_mut().enumerate().take(12) {
            let angle = std::f64::consts::PI - (i as f64) * std::f64::consts::PI / 6.0;
            *p = Point::new(width / 2.0 * angle.cos(), -opening / 2.0 * angle.sin());
        }
        for (i, p) in pts.iter_mut().enumerate().skip(12) {
            *p = Point::new((i as f64 - 16.0) * width / 10.0, 0.0);
        }
        pts
    }

    #[test]
    fn circle_eye_has_closed_form_ear() {
        // On a circle, |p1-p5| = |p2-p4| = 2r sin(60deg) and |p0-p3| = 2r,
        // so EAR = sin(60deg).
        let eye = ellipse_eye(10.0, 20.0, 5.0, 5.0);
        let ear = eye_aspect_ratio(&eye).unwrap();
        assert!((ear - 60f64.to_radians().sin()).abs() < 1e-9);
        assert!(ear > 0.86 && ear < 0.87);
    }

    #[test]
    fn ratios_are_translation_and_scale_invariant() {
        let eye = ellipse_eye(0.0, 0.0, 12.0, 3.0);
        let base = eye_aspect_ratio(&eye).unwrap();

        let moved = eye.map(|p| Point::new(p.x + 130.0, p.y - 42.5));
        assert!((eye_aspect_ratio(&moved).unwrap() - base).abs() < 1e-9);

        let scaled = eye.map(|p| Point::new(p.x * 3.5, p.y * 3.5));
        assert!((eye_aspect_ratio(&scaled).unwrap() - base).abs() < 1e-9);

        let m = mouth(40.0, 30.0);
        let mar = mouth_aspect_ratio(&m).unwrap();
        let m2 = m.map(|p| Point::new(p.x * 0.5 + 7.0, p.y * 0.5 + 9.0));
        assert!((mouth_aspect_ratio(&m2).unwrap() - mar).abs() < 1e-9);
    }

    #[test]
    fn anisotropic_scaling_changes_ratio() {
        let eye = ellipse_eye(0.0, 0.0, 12.0, 3.0);
        let base = eye_aspect_ratio(&eye).unwrap();
        let squashed = eye.map(|p| Point::new(p.x, p.y * 0.5));
        let ear = eye_aspect_ratio(&squashed).unwrap();
        assert!((ear - base * 0.5).abs() < 1e-9);
    }

    #[test]
    fn open_mouth_has_higher_mar() {
        let closed = mouth_aspect_ratio(&mouth(40.0, 4.0)).unwrap();
        let open = mouth_aspect_ratio(&mouth(40.0, 40.0)).unwrap();
        assert!(closed < 0.6);
        assert!(open > 0.6);
    }

    #[test]
    fn degenerate_corners_are_undefined() {
        let eye = [Point::new(3.0, 3.0); 6];
        assert_eq!(eye_aspect_ratio(&eye), None);

        let mut m = mouth(40.0, 20.0);
        m[6] = m[0];
        assert_eq!(mouth_aspect_ratio(&m), None);

        let nan_eye = ellipse_eye(f64::NAN, 0.0, 5.0, 5.0);
        assert_eq!(eye_aspect_ratio(&nan_eye), None);
    }

    #[test]
    fn average_requires_both_eyes() {
        assert_eq!(average_ear(Some(0.2), Some(0.3)), Some(0.25));
        assert_eq!(average_ear(None, Some(0.3)), None);
    }

    #[test]
    fn bounding_area_of_points() {
        let pts = [Point::new(1.0, 1.0), Point::new(4.0, 3.0), Point::new(2.0, 5.0)];
        assert_eq!(bounding_area(&pts), 12.0);
        assert_eq!(bounding_area(&[]), 0.0);
    }
}
