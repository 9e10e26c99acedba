pub mod scripted;

#[cfg(feature = "backend-opencv")]
pub mod opencv;

pub use scripted::{synthetic_landmarks, ScriptedBackend, ScriptedFrame};

#[cfg(feature = "backend-opencv")]
pub use self::opencv::{HaarFaceLocator, LbfLandmarkBackend};
