//! Per-frame drowsiness analysis.
//!
//! `Monitor` owns the detector registry, both debounce timers and the session
//! counters. Each call to [`Monitor::process`] runs one frame through the
//! pipeline and returns a [`FrameReport`] describing what was found; the
//! caller decides how to render and log it.

use anyhow::{anyhow, Result};
use image::GrayImage;
use serde::Deserialize;
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::alert::{AlertKind, AlertPhase, AlertTimer, AlertTransition};
use crate::detect::{BackendRegistry, DetectionCapability, FaceBox, FaceLandmarks};
use crate::frame::Frame;
use crate::geometry::{average_ear, eye_aspect_ratio, mouth_aspect_ratio};
use crate::preprocess::{self, ClaheParams};

pub const DEFAULT_EAR_THRESHOLD: f64 = 0.21;
pub const DEFAULT_MAR_THRESHOLD: f64 = 0.6;
pub const DEFAULT_ALERT_SECS: f64 = 3.0;

/// What happens to the timers on a frame where the landmark pass finds no face.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceLossPolicy {
    /// Leave both timers untouched until a face reappears.
    #[default]
    Hold,
    /// Clear both timers.
    Reset,
}

impl FromStr for FaceLossPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hold" => Ok(FaceLossPolicy::Hold),
            "reset" => Ok(FaceLossPolicy::Reset),
            other => Err(anyhow!("unknown face loss policy '{}' (hold|reset)", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MonitorSettings {
    /// Eyes count as closed below this EAR.
    pub ear_threshold: f64,
    /// Mouth counts as open above this MAR.
    pub mar_threshold: f64,
    /// How long a condition must hold before alerting.
    pub alert_after: Duration,
    pub clahe: ClaheParams,
    pub face_loss: FaceLossPolicy,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            ear_threshold: DEFAULT_EAR_THRESHOLD,
            mar_threshold: DEFAULT_MAR_THRESHOLD,
            alert_after: Duration::from_secs_f64(DEFAULT_ALERT_SECS),
            clahe: ClaheParams::default(),
            face_loss: FaceLossPolicy::Hold,
        }
    }
}

/// Ratios measured on the driver's face. `None` marks degenerate geometry.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Measurement {
    pub left_ear: Option<f64>,
    pub right_ear: Option<f64>,
    pub ear: Option<f64>,
    pub mar: Option<f64>,
}

impl Measurement {
    pub fn from_landmarks(landmarks: &FaceLandmarks) -> Self {
        let left_ear = eye_aspect_ratio(&landmarks.left_eye());
        let right_ear = eye_aspect_ratio(&landmarks.right_eye());
        Self {
            left_ear,
            right_ear,
            ear: average_ear(left_ear, right_ear),
            mar: mouth_aspect_ratio(&landmarks.mouth()),
        }
    }
}

/// Everything the pipeline learned about one frame.
#[derive(Clone, Debug)]
pub struct FrameReport {
    pub sequence: u64,
    pub captured_at: Instant,
    /// Coarse locator boxes (visual feedback only).
    pub coarse_faces: Vec<FaceBox>,
    /// All landmark sets from the landmark pass.
    pub landmarks: Vec<FaceLandmarks>,
    /// Index into `landmarks` of the face used for the ratios.
    pub driver: Option<usize>,
    pub measurement: Option<Measurement>,
    pub drowsiness: AlertPhase,
    pub yawning: AlertPhase,
}

impl FrameReport {
    /// The coarse locator found nothing.
    pub fn no_face(&self) -> bool {
        self.coarse_faces.is_empty()
    }

    /// Conditions currently alerting.
    pub fn alerts(&self) -> Vec<AlertKind> {
        let mut alerts = Vec::new();
        if self.drowsiness.is_alerting() {
            alerts.push(AlertKind::Drowsiness);
        }
        if self.yawning.is_alerting() {
            alerts.push(AlertKind::Yawning);
        }
        alerts
    }

    pub fn driver_landmarks(&self) -> Option<&FaceLandmarks> {
        self.driver.and_then(|i| self.landmarks.get(i))
    }
}

/// In-memory session counters, reported on shutdown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: u64,
    pub no_face_frames: u64,
    pub landmark_frames: u64,
    pub undefined_ratio_frames: u64,
    pub drowsiness_alerts: u64,
    pub yawning_alerts: u64,
}

pub struct Monitor {
    settings: MonitorSettings,
    registry: BackendRegistry,
    drowsiness: AlertTimer,
    yawning: AlertTimer,
    last_frame_at: Option<Instant>,
    stats: SessionStats,
}

impl Monitor {
    /// Without a session start, a condition seen on the first frame is
    /// timed from that frame's own capture instant.
    pub fn new(settings: MonitorSettings, registry: BackendRegistry) -> Self {
        Self {
            drowsiness: AlertTimer::new(settings.alert_after),
            yawning: AlertTimer::new(settings.alert_after),
            settings,
            registry,
            last_frame_at: None,
            stats: SessionStats::default(),
        }
    }

    /// Time a condition seen on the first frame from `start` instead.
    pub fn with_session_start(mut self, start: Instant) -> Self {
        self.last_frame_at = Some(start);
        self
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Preprocess a captured frame and analyse it.
    pub fn process(&mut self, frame: &Frame) -> Result<FrameReport> {
        let gray = preprocess::enhance(frame.image(), self.settings.clahe);
        self.analyze(&gray, frame.sequence, frame.captured_at)
    }

    /// Analyse an already preprocessed frame captured at `captured_at`.
    pub fn analyze(
        &mut self,
        gray: &GrayImage,
        sequence: u64,
        captured_at: Instant,
    ) -> Result<FrameReport> {
        self.stats.frames += 1;

        let coarse = self
            .registry
            .detect_with_capability(DetectionCapability::FaceLocalization, gray)?;
        if coarse.faces.is_empty() {
            self.stats.no_face_frames += 1;
        }

        let detected = self
            .registry
            .detect_with_capability(DetectionCapability::Landmarks, gray)?;
        let landmarks = detected.landmarks;
        let driver = primary_face(&landmarks);
        let measurement = driver.map(|i| Measurement::from_landmarks(&landmarks[i]));
        if measurement.is_some() {
            self.stats.landmark_frames += 1;
        }

        let (drowsiness, yawning) = self.update(measurement, captured_at);

        Ok(FrameReport {
            sequence,
            captured_at,
            coarse_faces: coarse.faces,
            landmarks,
            driver,
            measurement,
            drowsiness,
            yawning,
        })
    }

    /// Advance both timers with this frame's measurement (`None`: no face).
    pub fn update(
        &mut self,
        measurement: Option<Measurement>,
        now: Instant,
    ) -> (AlertPhase, AlertPhase) {
        let onset = self.last_frame_at.replace(now).unwrap_or(now);

        let Some(m) = measurement else {
            if self.settings.face_loss == FaceLossPolicy::Reset {
                for kind in [AlertKind::Drowsiness, AlertKind::Yawning] {
                    let edge = self.timer_mut(kind).reset();
                    self.log_transition(kind, edge);
                }
            }
            return (self.drowsiness.held_at(now), self.yawning.held_at(now));
        };

        if m.ear.is_none() || m.mar.is_none() {
            self.stats.undefined_ratio_frames += 1;
        }

        let drowsiness = match m.ear {
            Some(ear) => {
                let (phase, edge) =
                    self.drowsiness
                        .update(ear < self.settings.ear_threshold, onset, now);
                self.log_transition(AlertKind::Drowsiness, edge);
                phase
            }
            None => {
                log::debug!("eye landmarks degenerate, EAR undefined; drowsiness timer unchanged");
                self.drowsiness.held_at(now)
            }
        };

        let yawning = match m.mar {
            Some(mar) => {
                let (phase, edge) =
                    self.yawning
                        .update(mar > self.settings.mar_threshold, onset, now);
                self.log_transition(AlertKind::Yawning, edge);
                phase
            }
            None => {
                log::debug!("mouth landmarks degenerate, MAR undefined; yawning timer unchanged");
                self.yawning.held_at(now)
            }
        };

        (drowsiness, yawning)
    }

    fn timer_mut(&mut self, kind: AlertKind) -> &mut AlertTimer {
        match kind {
            AlertKind::Drowsiness => &mut self.drowsiness,
            AlertKind::Yawning => &mut self.yawning,
        }
    }

    fn log_transition(&mut self, kind: AlertKind, edge: AlertTransition) {
        match edge {
            AlertTransition::None => {}
            AlertTransition::Armed => log::info!("{} timer armed", kind),
            AlertTransition::Escalated => {
                match kind {
                    AlertKind::Drowsiness => self.stats.drowsiness_alerts += 1,
                    AlertKind::Yawning => self.stats.yawning_alerts += 1,
                }
                log::info!(
                    "{} held for {:.1}s, alerting",
                    kind,
                    self.settings.alert_after.as_secs_f64()
                );
            }
            AlertTransition::Cleared => log::info!("{} timer cleared", kind),
        }
    }
}

/// The largest landmark set is taken to be the driver.
fn primary_face(landmarks: &[FaceLandmarks]) -> Option<usize> {
    landmarks
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.area().total_cmp(&b.area()))
        .map(|(i, _)| i)
}
