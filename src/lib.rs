//! Driver drowsiness monitor.
//!
//! Watches a driver-facing camera and raises two alerts: drowsiness when the
//! eye aspect ratio (EAR) stays below its threshold, and yawning when the
//! mouth aspect ratio (MAR) stays above its threshold, each for a
//! configurable span (3 s by default).
//!
//! # Pipeline
//!
//! Per frame: capture, grayscale and CLAHE enhancement, a coarse face pass
//! for on-screen feedback, a 68-point landmark pass, EAR/MAR on the largest
//! face, debounce timers, overlay, display.
//!
//! # Module Structure
//!
//! - `ingest`: frame sources (OpenCV camera, V4L2, image directories, stub)
//! - `preprocess`: grayscale and CLAHE
//! - `detect`: detector backends and their registry
//! - `geometry`: EAR and MAR
//! - `alert`: debounce timers
//! - `notify`: cooled-down driver notifications on top of the alerts
//! - `monitor`: the per-frame pipeline and session counters
//! - `overlay` / `display`: what gets drawn and where
//! - `runtime`: the capture loop
//! - `config`: file and environment configuration

pub mod alert;
pub mod config;
#[cfg(feature = "backend-opencv")]
mod cv;
pub mod detect;
pub mod display;
pub mod frame;
pub mod geometry;
pub mod ingest;
pub mod monitor;
pub mod notify;
pub mod overlay;
pub mod preprocess;
pub mod runtime;
pub mod ui;

pub use alert::{AlertKind, AlertPhase, AlertTimer, AlertTransition};
pub use config::{DisplaySettings, ModelSettings, MonitorConfig};
pub use detect::{
    BackendRegistry, CascadeParams, DetectionCapability, DetectionResult, DetectorBackend,
    FaceBox, FaceLandmarks, ScriptedBackend, ScriptedFrame,
};
pub use display::{Display, DisplayEvent, NullDisplay};
pub use frame::Frame;
pub use geometry::{eye_aspect_ratio, mouth_aspect_ratio, Point};
pub use ingest::{open_source, FrameSource, SourceSettings, SourceStats, SourceUri};
pub use monitor::{
    FaceLossPolicy, FrameReport, Measurement, Monitor, MonitorSettings, SessionStats,
};
pub use notify::{AlertSink, ConsoleSink, Notifier, NotifyRule, NotifySettings};
pub use preprocess::ClaheParams;
pub use runtime::{RunSummary, Session, Step, StopReason};
