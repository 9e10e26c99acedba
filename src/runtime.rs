//! The capture loop.
//!
//! One blocking iteration per frame: capture, analyse, log, notify, draw,
//! poll for quit. A capture failure, the quit key or a shutdown signal ends the loop.

use anyhow::Result;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use crate::display::{Display, DisplayEvent};
use crate::ingest::{FrameSource, SourceStats};
use crate::monitor::{FrameReport, Monitor, SessionStats};
use crate::notify::Notifier;
use crate::overlay;

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Why the loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    CaptureFailed,
    QuitKey,
    Interrupted,
}

/// Outcome of one loop iteration.
#[derive(Debug)]
pub enum Step {
    Frame(FrameReport),
    Stopped(StopReason),
}

#[derive(Clone, Debug)]
pub struct RunSummary {
    pub reason: StopReason,
    pub session: SessionStats,
    pub source: SourceStats,
    pub notifications: u64,
    pub elapsed: Duration,
}

pub struct Session<'a> {
    source: &'a mut dyn FrameSource,
    monitor: &'a mut Monitor,
    display: &'a mut dyn Display,
    notifier: Option<&'a mut Notifier>,
    shutdown: Option<&'a Receiver<()>>,
    started: Instant,
    last_health_log: Instant,
}

impl<'a> Session<'a> {
    /// `source` must already be connected.
    pub fn new(
        source: &'a mut dyn FrameSource,
        monitor: &'a mut Monitor,
        display: &'a mut dyn Display,
    ) -> Self {
        let now = Instant::now();
        Self {
            source,
            monitor,
            display,
            notifier: None,
            shutdown: None,
            started: now,
            last_health_log: now,
        }
    }

    /// Stop at the next iteration once anything arrives on (or hangs up) `rx`.
    pub fn with_shutdown(mut self, rx: &'a Receiver<()>) -> Self {
        self.shutdown = Some(rx);
        self
    }

    pub fn with_notifier(mut self, notifier: &'a mut Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn step(&mut self) -> Result<Step> {
        if self.shutdown_requested() {
            log::info!("shutdown signal received");
            return Ok(Step::Stopped(StopReason::Interrupted));
        }

        let frame = match self.source.next_frame() {
            Ok(frame) => frame,
            Err(err) => {
                log::error!("failed to capture image: {:#}", err);
                return Ok(Step::Stopped(StopReason::CaptureFailed));
            }
        };

        let report = self.monitor.process(&frame)?;
        log_report(&report);
        if let Some(notifier) = self.notifier.as_deref_mut() {
            if let Err(err) = notifier.observe(&report) {
                log::warn!("failed to notify driver: {:#}", err);
            }
        }

        let ops = overlay::plan(&report);
        let event = self.display.show(&frame, &ops)?;

        if self.last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
            let stats = self.source.stats();
            log::info!(
                "source health={} frames={} source={}",
                self.source.is_healthy(),
                stats.frames_captured,
                stats.source
            );
            self.last_health_log = Instant::now();
        }

        if event == DisplayEvent::Quit {
            return Ok(Step::Stopped(StopReason::QuitKey));
        }
        Ok(Step::Frame(report))
    }

    /// Step until the loop stops.
    pub fn run(mut self) -> Result<RunSummary> {
        let reason = loop {
            if let Step::Stopped(reason) = self.step()? {
                break reason;
            }
        };
        let summary = RunSummary {
            reason,
            session: self.monitor.stats(),
            source: self.source.stats(),
            notifications: self.notifier.as_deref().map_or(0, Notifier::sent),
            elapsed: self.started.elapsed(),
        };
        log::info!(
            "monitor stopped ({:?}) after {} frames: {} drowsiness and {} yawning alerts",
            summary.reason,
            summary.session.frames,
            summary.session.drowsiness_alerts,
            summary.session.yawning_alerts
        );
        Ok(summary)
    }

    fn shutdown_requested(&self) -> bool {
        match self.shutdown {
            Some(rx) => match rx.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => true,
                Err(TryRecvError::Empty) => false,
            },
            None => false,
        }
    }
}

fn log_report(report: &FrameReport) {
    if report.no_face() {
        log::warn!("ALERT! NO FACE DETECTED (frame #{})", report.sequence);
    }
    for kind in report.alerts() {
        log::warn!("ALERT! {} (frame #{})", kind.banner(), report.sequence);
    }
    if let Some(m) = report.measurement {
        log::debug!(
            "frame #{}: ear={:?} mar={:?} drowsiness={:?} yawning={:?}",
            report.sequence,
            m.ear,
            m.mar,
            report.drowsiness,
            report.yawning
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BackendRegistry, ScriptedBackend};
    use crate::display::NullDisplay;
    use crate::ingest::SyntheticSource;
    use crate::alert::AlertKind;
    use crate::monitor::MonitorSettings;
    use crate::notify::{AlertSink, NotifySettings};
    use std::sync::mpsc;

    fn fixture(frames: u64) -> (SyntheticSource, Monitor) {
        scripted(std::iter::repeat(Some((0.3, 0.1))).take(frames as usize).collect())
    }

    fn scripted(ratios: Vec<Option<(f64, f64)>>) -> (SyntheticSource, Monitor) {
        let t0 = Instant::now();
        let mut source = SyntheticSource::new("runtime", 32, 24)
            .with_clock(t0, Duration::from_secs(1))
            .with_limit(ratios.len() as u64);
        source.connect().unwrap();
        let mut registry = BackendRegistry::new();
        registry.register(ScriptedBackend::from_ratios(ratios));
        let monitor = Monitor::new(MonitorSettings::default(), registry).with_session_start(t0);
        (source, monitor)
    }

    #[test]
    fn capture_failure_ends_the_session() {
        let (mut source, mut monitor) = fixture(3);
        let mut display = NullDisplay::new();
        let summary = Session::new(&mut source, &mut monitor, &mut display)
            .run()
            .unwrap();
        assert_eq!(summary.reason, StopReason::CaptureFailed);
        assert_eq!(summary.session.frames, 3);
        assert_eq!(summary.source.frames_captured, 3);
        assert_eq!(display.frames_shown(), 3);
    }

    #[test]
    fn shutdown_signal_stops_before_capture() {
        let (mut source, mut monitor) = fixture(3);
        let mut display = NullDisplay::new();
        let (tx, rx) = mpsc::channel();
        tx.send(()).unwrap();
        let summary = Session::new(&mut source, &mut monitor, &mut display)
            .with_shutdown(&rx)
            .run()
            .unwrap();
        assert_eq!(summary.reason, StopReason::Interrupted);
        assert_eq!(summary.session.frames, 0);
    }

    struct QuitAfter(u64);

    impl Display for QuitAfter {
        fn show(
            &mut self,
            frame: &crate::frame::Frame,
            _overlay: &[overlay::OverlayOp],
        ) -> Result<DisplayEvent> {
            Ok(if frame.sequence >= self.0 {
                DisplayEvent::Quit
            } else {
                DisplayEvent::Continue
            })
        }
    }

    #[test]
    fn quit_key_stops_the_loop() {
        let (mut source, mut monitor) = fixture(10);
        let mut display = QuitAfter(2);
        let summary = Session::new(&mut source, &mut monitor, &mut display)
            .run()
            .unwrap();
        assert_eq!(summary.reason, StopReason::QuitKey);
        assert_eq!(summary.session.frames, 2);
    }

    struct Silent;

    impl AlertSink for Silent {
        fn notify(&mut self, _kind: AlertKind, _message: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn notifier_fires_once_per_episode_within_cooldown() {
        // Eyes closed for eight frames one second apart: alerting from frame 3.
        let (mut source, mut monitor) = scripted(vec![Some((0.1, 0.1)); 8]);
        let mut display = NullDisplay::new();
        let mut notifier = Notifier::new(NotifySettings::default(), Box::new(Silent));
        let summary = Session::new(&mut source, &mut monitor, &mut display)
            .with_notifier(&mut notifier)
            .run()
            .unwrap();
        assert_eq!(summary.session.drowsiness_alerts, 1);
        assert_eq!(summary.notifications, 1);
    }
}
