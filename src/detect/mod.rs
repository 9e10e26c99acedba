//! Face detection backends.
//!
//! Two detector roles run on every frame: a coarse face locator whose output
//! only drives the on-screen boxes and the "no face" warning, and a landmark
//! detector whose 68-point sets feed the aspect ratios.

mod backend;
pub mod backends;
mod registry;
mod result;

pub use backend::{CascadeParams, DetectionCapability, DetectorBackend};
pub use backends::{ScriptedBackend, ScriptedFrame};
pub use registry::BackendRegistry;
pub use result::{
    DetectionResult, FaceBox, FaceLandmarks, LANDMARK_COUNT, LEFT_EYE, MOUTH, RIGHT_EYE,
};
