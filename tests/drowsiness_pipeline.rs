use std::time::{Duration, Instant};

use drowsy_watch::ingest::SyntheticSource;
use drowsy_watch::overlay::{self, OverlayOp, NO_FACE_BANNER};
use drowsy_watch::{
    AlertPhase, BackendRegistry, FrameSource, Monitor, MonitorSettings, NullDisplay,
    ScriptedBackend, Session, Step, StopReason,
};

fn scripted_session(
    script: Vec<Option<(f64, f64)>>,
) -> (SyntheticSource, Monitor, Instant) {
    let t0 = Instant::now();
    let mut source = SyntheticSource::new("pipeline", 64, 48)
        .with_clock(t0, Duration::from_secs(1))
        .with_limit(script.len() as u64);
    source.connect().expect("connect");
    let mut registry = BackendRegistry::new();
    registry.register(ScriptedBackend::from_ratios(script));
    let monitor = Monitor::new(MonitorSettings::default(), registry).with_session_start(t0);
    (source, monitor, t0)
}

fn collect(session: &mut Session<'_>) -> (Vec<drowsy_watch::FrameReport>, StopReason) {
    let mut reports = Vec::new();
    loop {
        match session.step().expect("step") {
            Step::Frame(report) => reports.push(report),
            Step::Stopped(reason) => return (reports, reason),
        }
    }
}

#[test]
fn closed_eyes_escalate_after_three_seconds_and_clear_on_open() {
    let script = [0.15, 0.15, 0.15, 0.25]
        .into_iter()
        .map(|ear| Some((ear, 0.2)))
        .collect();
    let (mut source, mut monitor, _t0) = scripted_session(script);
    let mut display = NullDisplay::new();
    let mut session = Session::new(&mut source, &mut monitor, &mut display);
    let (reports, reason) = collect(&mut session);
    drop(session);

    assert_eq!(reason, StopReason::CaptureFailed);
    let phases: Vec<AlertPhase> = reports.iter().map(|r| r.drowsiness).collect();
    assert_eq!(
        phases,
        vec![
            AlertPhase::Armed {
                elapsed: Duration::from_secs(1)
            },
            AlertPhase::Armed {
                elapsed: Duration::from_secs(2)
            },
            AlertPhase::Alerting {
                elapsed: Duration::from_secs(3)
            },
            AlertPhase::Idle,
        ]
    );
    assert!(reports.iter().all(|r| r.yawning == AlertPhase::Idle));

    let alert_ops = overlay::plan(&reports[2]);
    assert!(alert_ops.iter().any(|op| matches!(
        op,
        OverlayOp::Text { text, .. } if text == "DROWSINESS DETECTED"
    )));

    let stats = monitor.stats();
    assert_eq!(stats.frames, 4);
    assert_eq!(stats.drowsiness_alerts, 1);
    assert_eq!(stats.yawning_alerts, 0);
    assert_eq!(display.frames_shown(), 4);
}

#[test]
fn yawn_alerts_independently_of_eyes() {
    let script = vec![Some((0.3, 0.9)); 5];
    let (mut source, mut monitor, _t0) = scripted_session(script);
    let mut display = NullDisplay::new();
    let summary = Session::new(&mut source, &mut monitor, &mut display)
        .run()
        .expect("run");

    assert_eq!(summary.reason, StopReason::CaptureFailed);
    assert_eq!(summary.session.frames, 5);
    assert_eq!(summary.session.yawning_alerts, 1);
    assert_eq!(summary.session.drowsiness_alerts, 0);
}

#[test]
fn frames_without_a_face_warn_and_hold_timers() {
    let script = vec![Some((0.15, 0.2)), None, None, Some((0.15, 0.2))];
    let (mut source, mut monitor, _t0) = scripted_session(script);
    let mut display = NullDisplay::new();
    let mut session = Session::new(&mut source, &mut monitor, &mut display);
    let (reports, _) = collect(&mut session);
    drop(session);

    assert!(reports[1].no_face());
    assert!(overlay::plan(&reports[1]).iter().any(|op| matches!(
        op,
        OverlayOp::Text { text, .. } if text == NO_FACE_BANNER
    )));
    // The gap neither clears nor pauses the timer, but nothing alerts on a
    // frame where the eyes were not measured.
    assert_eq!(
        reports[2].drowsiness,
        AlertPhase::Held {
            elapsed: Duration::from_secs(3)
        }
    );
    assert!(reports[2].alerts().is_empty());
    assert!(!overlay::plan(&reports[2]).iter().any(|op| matches!(
        op,
        OverlayOp::Text { text, .. } if text == "DROWSINESS DETECTED"
    )));
    assert_eq!(
        reports[3].drowsiness,
        AlertPhase::Alerting {
            elapsed: Duration::from_secs(4)
        }
    );
    assert!(reports[1].measurement.is_none());
    assert_eq!(monitor.stats().drowsiness_alerts, 1);
    assert_eq!(monitor.stats().no_face_frames, 2);
}
