//! Driver-facing alert notifications.
//!
//! The overlay banner and the `warn!` line repeat on every alerting frame.
//! Notifications are the attention-getting channel on top of that: each kind
//! fires only after its alert has been seen on `streak` consecutive measured
//! frames, and then not again until its cooldown has passed.

use anyhow::{Context, Result};
use std::io::Write;
use std::time::{Duration, Instant};

use crate::alert::{AlertKind, AlertPhase};
use crate::monitor::FrameReport;

pub const DEFAULT_DROWSINESS_COOLDOWN_SECS: f64 = 10.0;
pub const DEFAULT_YAWNING_COOLDOWN_SECS: f64 = 12.0;
pub const DEFAULT_DROWSINESS_STREAK: u32 = 1;
pub const DEFAULT_YAWNING_STREAK: u32 = 2;

/// When one alert kind may notify.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NotifyRule {
    /// Consecutive alerting frames required before notifying.
    pub streak: u32,
    /// Minimum time between two notifications of this kind.
    pub cooldown: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NotifySettings {
    pub enabled: bool,
    /// Ring the terminal bell with each notification.
    pub bell: bool,
    pub drowsiness: NotifyRule,
    pub yawning: NotifyRule,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            bell: true,
            drowsiness: NotifyRule {
                streak: DEFAULT_DROWSINESS_STREAK,
                cooldown: Duration::from_secs_f64(DEFAULT_DROWSINESS_COOLDOWN_SECS),
            },
            yawning: NotifyRule {
                streak: DEFAULT_YAWNING_STREAK,
                cooldown: Duration::from_secs_f64(DEFAULT_YAWNING_COOLDOWN_SECS),
            },
        }
    }
}

/// The message delivered for each kind.
pub fn advice(kind: AlertKind) -> &'static str {
    match kind {
        AlertKind::Drowsiness => "Warning: drowsiness detected. Stay alert and consider taking a break.",
        AlertKind::Yawning => "Warning: yawning detected. You may be getting tired; consider a rest.",
    }
}

/// Where notifications go.
pub trait AlertSink {
    fn notify(&mut self, kind: AlertKind, message: &str) -> Result<()>;
}

/// Writes notifications to stderr, optionally with the terminal bell.
pub struct ConsoleSink {
    bell: bool,
}

impl ConsoleSink {
    pub fn new(bell: bool) -> Self {
        Self { bell }
    }
}

impl AlertSink for ConsoleSink {
    fn notify(&mut self, _kind: AlertKind, message: &str) -> Result<()> {
        let mut stderr = std::io::stderr().lock();
        if self.bell {
            stderr.write_all(b"\x07").context("write terminal bell")?;
        }
        writeln!(stderr, "{message}").context("write notification")?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct RuleState {
    streak: u32,
    last_sent: Option<Instant>,
}

impl RuleState {
    /// Feed one frame's phase; true when a notification is due at `now`.
    fn observe(&mut self, rule: NotifyRule, phase: AlertPhase, now: Instant) -> bool {
        match phase {
            AlertPhase::Alerting { .. } => self.streak = self.streak.saturating_add(1),
            // Not measured this frame: keep the streak as it is.
            AlertPhase::Held { .. } => return false,
            AlertPhase::Idle | AlertPhase::Armed { .. } => {
                self.streak = 0;
                return false;
            }
        }
        if self.streak < rule.streak.max(1) {
            return false;
        }
        let cooled = self
            .last_sent
            .map_or(true, |sent| now.saturating_duration_since(sent) >= rule.cooldown);
        if !cooled {
            log::debug!("alert streak reached but still cooling down");
            return false;
        }
        self.last_sent = Some(now);
        self.streak = 0;
        true
    }
}

/// Applies the streak and cooldown rules and forwards to a sink.
pub struct Notifier {
    settings: NotifySettings,
    sink: Box<dyn AlertSink>,
    drowsiness: RuleState,
    yawning: RuleState,
    sent: u64,
}

impl Notifier {
    pub fn new(settings: NotifySettings, sink: Box<dyn AlertSink>) -> Self {
        Self {
            settings,
            sink,
            drowsiness: RuleState::default(),
            yawning: RuleState::default(),
            sent: 0,
        }
    }

    /// Notifications delivered so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Feed one analysed frame; returns the kinds that were notified.
    pub fn observe(&mut self, report: &FrameReport) -> Result<Vec<AlertKind>> {
        if !self.settings.enabled {
            return Ok(Vec::new());
        }
        let now = report.captured_at;
        let mut due = Vec::new();
        if self
            .drowsiness
            .observe(self.settings.drowsiness, report.drowsiness, now)
        {
            due.push(AlertKind::Drowsiness);
        }
        if self.yawning.observe(self.settings.yawning, report.yawning, now) {
            due.push(AlertKind::Yawning);
        }
        for kind in &due {
            log::info!("notifying driver: {}", kind);
            self.sink.notify(*kind, advice(*kind))?;
            self.sent += 1;
        }
        Ok(due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<AlertKind>>>);

    impl AlertSink for Recorder {
        fn notify(&mut self, kind: AlertKind, _message: &str) -> Result<()> {
            self.0.lock().unwrap().push(kind);
            Ok(())
        }
    }

    fn alerting() -> AlertPhase {
        AlertPhase::Alerting {
            elapsed: Duration::from_secs(3),
        }
    }

    fn report(at: Instant, drowsiness: AlertPhase, yawning: AlertPhase) -> FrameReport {
        FrameReport {
            sequence: 0,
            captured_at: at,
            coarse_faces: Vec::new(),
            landmarks: Vec::new(),
            driver: None,
            measurement: None,
            drowsiness,
            yawning,
        }
    }

    #[test]
    fn drowsiness_notifies_once_per_cooldown() {
        let t0 = Instant::now();
        let recorder = Recorder::default();
        let mut notifier = Notifier::new(NotifySettings::default(), Box::new(recorder.clone()));

        let mut fired = Vec::new();
        for s in 0..=12 {
            let r = report(t0 + Duration::from_secs(s), alerting(), AlertPhase::Idle);
            if !notifier.observe(&r).unwrap().is_empty() {
                fired.push(s);
            }
        }
        assert_eq!(fired, vec![0, 10]);
        assert_eq!(notifier.sent(), 2);
        assert_eq!(recorder.0.lock().unwrap().len(), 2);
    }

    #[test]
    fn yawning_needs_two_consecutive_alerting_frames() {
        let t0 = Instant::now();
        let mut notifier = Notifier::new(NotifySettings::default(), Box::new(Recorder::default()));
        let at = |s| t0 + Duration::from_secs(s);

        assert!(notifier.observe(&report(at(0), AlertPhase::Idle, alerting())).unwrap().is_empty());
        // A non-alerting frame breaks the streak.
        let armed = AlertPhase::Armed {
            elapsed: Duration::from_secs(1),
        };
        assert!(notifier.observe(&report(at(1), AlertPhase::Idle, armed)).unwrap().is_empty());
        assert!(notifier.observe(&report(at(2), AlertPhase::Idle, alerting())).unwrap().is_empty());
        // An unmeasured frame neither counts nor breaks it.
        let held = AlertPhase::Held {
            elapsed: Duration::from_secs(4),
        };
        assert!(notifier.observe(&report(at(3), AlertPhase::Idle, held)).unwrap().is_empty());
        assert_eq!(
            notifier.observe(&report(at(4), AlertPhase::Idle, alerting())).unwrap(),
            vec![AlertKind::Yawning]
        );
    }

    #[test]
    fn disabled_notifier_stays_silent() {
        let settings = NotifySettings {
            enabled: false,
            ..NotifySettings::default()
        };
        let mut notifier = Notifier::new(settings, Box::new(Recorder::default()));
        let r = report(Instant::now(), alerting(), alerting());
        assert!(notifier.observe(&r).unwrap().is_empty());
        assert_eq!(notifier.sent(), 0);
    }
}
