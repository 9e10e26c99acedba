use anyhow::{bail, Result};
use image::GrayImage;

use crate::detect::result::DetectionResult;

/// Detection capabilities a backend can provide.
///
/// The monitor asks the registry for one backend per capability, so the
/// coarse face locator and the landmark pipeline stay independent even when
/// one backend supports both.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectionCapability {
    /// Face rectangles only (coarse cascade pass).
    FaceLocalization,
    /// 68-point landmark sets per face.
    Landmarks,
}

/// Parameters for one cascade face pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CascadeParams {
    pub scale_factor: f64,
    pub min_neighbors: i32,
    /// Smallest face side in pixels.
    pub min_size: i32,
}

impl Default for CascadeParams {
    fn default() -> Self {
        Self {
            scale_factor: 1.3,
            min_neighbors: 5,
            min_size: 30,
        }
    }
}

impl CascadeParams {
    /// Finer pass run ahead of landmark fitting.
    pub const LANDMARK: CascadeParams = CascadeParams {
        scale_factor: 1.1,
        min_neighbors: 3,
        min_size: 30,
    };

    pub fn validate(&self) -> Result<()> {
        if !(self.scale_factor.is_finite() && self.scale_factor > 1.0) {
            bail!("cascade scale factor must be greater than 1.0");
        }
        if self.min_neighbors < 0 {
            bail!("cascade min neighbours must not be negative");
        }
        if self.min_size < 1 {
            bail!("cascade min size must be at least 1 pixel");
        }
        Ok(())
    }
}

/// Detector backend trait.
///
/// Backends receive the preprocessed (grayscale, contrast-enhanced) frame and
/// must treat it as read-only and ephemeral.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Returns true when the backend supports a capability.
    fn supports(&self, capability: DetectionCapability) -> bool;

    /// Run detection for `capability` on a grayscale frame.
    ///
    /// Backends fill `faces` for `FaceLocalization` and `landmarks` for
    /// `Landmarks`.
    fn detect(
        &mut self,
        capability: DetectionCapability,
        gray: &GrayImage,
    ) -> Result<DetectionResult>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
