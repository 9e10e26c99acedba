#![cfg(feature = "backend-opencv")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::GrayImage;
use opencv::core::{Point2f, Ptr, Rect, Size, Vector};
use opencv::face::{self, Facemark};
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::*;

use crate::cv::gray_to_mat;
use crate::detect::backend::{CascadeParams, DetectionCapability, DetectorBackend};
use crate::detect::result::{DetectionResult, FaceBox, FaceLandmarks};
use crate::geometry::Point;

fn load_cascade(path: &Path) -> Result<CascadeClassifier> {
    let path_str = path
        .to_str()
        .ok_or_else(|| anyhow!("cascade path {} is not valid UTF-8", path.display()))?;
    let cascade = CascadeClassifier::new(path_str)
        .with_context(|| format!("failed to load face cascade from {}", path.display()))?;
    if cascade.empty()? {
        return Err(anyhow!("face cascade {} is empty", path.display()));
    }
    Ok(cascade)
}

fn run_cascade(
    cascade: &mut CascadeClassifier,
    params: CascadeParams,
    gray: &GrayImage,
) -> Result<Vector<Rect>> {
    let mat = gray_to_mat(gray)?;
    let mut rects = Vector::<Rect>::new();
    cascade
        .detect_multi_scale(
            &mat,
            &mut rects,
            params.scale_factor,
            params.min_neighbors,
            0,
            Size::new(params.min_size, params.min_size),
            Size::new(0, 0),
        )
        .context("cascade detection failed")?;
    Ok(rects)
}

/// Coarse Haar cascade face locator.
pub struct HaarFaceLocator {
    cascade: CascadeClassifier,
    params: CascadeParams,
}

impl HaarFaceLocator {
    pub fn new<P: AsRef<Path>>(cascade_path: P, params: CascadeParams) -> Result<Self> {
        Ok(Self {
            cascade: load_cascade(cascade_path.as_ref())?,
            params,
        })
    }
}

impl DetectorBackend for HaarFaceLocator {
    fn name(&self) -> &'static str {
        "haar"
    }

    fn supports(&self, capability: DetectionCapability) -> bool {
        matches!(capability, DetectionCapability::FaceLocalization)
    }

    fn detect(
        &mut self,
        _capability: DetectionCapability,
        gray: &GrayImage,
    ) -> Result<DetectionResult> {
        let rects = run_cascade(&mut self.cascade, self.params, gray)?;
        Ok(DetectionResult::faces(
            rects
                .iter()
                .map(|r| FaceBox::new(r.x, r.y, r.width, r.height))
                .collect(),
        ))
    }
}

/// Landmark pipeline: its own face pass followed by the LBF 68-point facemark.
///
/// The face pass uses a dedicated cascade instance, normally with the finer
/// [`CascadeParams::LANDMARK`] settings; the two passes never share results.
pub struct LbfLandmarkBackend {
    cascade: CascadeClassifier,
    params: CascadeParams,
    facemark: Ptr<Facemark>,
}

impl LbfLandmarkBackend {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        model_path: P,
        cascade_path: Q,
        params: CascadeParams,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model_str = model_path
            .to_str()
            .ok_or_else(|| anyhow!("model path {} is not valid UTF-8", model_path.display()))?;
        let mut facemark = face::create_facemark_lbf().context("failed to create LBF facemark")?;
        facemark
            .load_model(model_str)
            .with_context(|| format!("failed to load landmark model from {}", model_path.display()))?;
        Ok(Self {
            cascade: load_cascade(cascade_path.as_ref())?,
            params,
            facemark,
        })
    }
}

impl DetectorBackend for LbfLandmarkBackend {
    fn name(&self) -> &'static str {
        "lbf"
    }

    fn supports(&self, capability: DetectionCapability) -> bool {
        matches!(capability, DetectionCapability::Landmarks)
    }

    fn detect(
        &mut self,
        _capability: DetectionCapability,
        gray: &GrayImage,
    ) -> Result<DetectionResult> {
        let faces = run_cascade(&mut self.cascade, self.params, gray)?;
        if faces.is_empty() {
            return Ok(DetectionResult::default());
        }
        let mat = gray_to_mat(gray)?;
        let mut shapes = Vector::<Vector<Point2f>>::new();
        let fitted = self
            .facemark
            .fit(&mat, &faces, &mut shapes)
            .context("landmark fit failed")?;
        if !fitted {
            return Ok(DetectionResult::default());
        }

        let mut landmarks = Vec::with_capacity(shapes.len());
        for shape in shapes.iter() {
            let points: Vec<Point> = shape
                .iter()
                .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
                .collect();
            match FaceLandmarks::from_slice(&points) {
                Ok(set) => landmarks.push(set),
                Err(err) => log::debug!("lbf: dropping face: {}", err),
            }
        }
        Ok(DetectionResult {
            faces: faces
                .iter()
                .map(|r| FaceBox::new(r.x, r.y, r.width, r.height))
                .collect(),
            landmarks,
        })
    }
}
