//! demo - end-to-end synthetic run of the drowsiness pipeline
//!
//! Feeds a stub camera through the full pipeline with scripted detections:
//! open eyes, a long blink that escalates to a drowsiness alert, a yawn that
//! escalates to a yawning alert, and a stretch with no face. Timestamps are
//! simulated so the run finishes immediately.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::time::{Duration, Instant};

use drowsy_watch::{
    AlertPhase, BackendRegistry, FaceLossPolicy, FrameSource, Monitor, MonitorSettings,
    NullDisplay, ScriptedBackend, Session, Step,
};

const OPEN_EYES: f64 = 0.30;
const CLOSED_EYES: f64 = 0.15;
const CLOSED_MOUTH: f64 = 0.20;
const YAWN: f64 = 0.80;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Simulated frames per second.
    #[arg(long, default_value_t = 2)]
    fps: u32,
    /// Seconds per scripted segment.
    #[arg(long, default_value_t = 4)]
    segment_secs: u32,
    /// Clear the timers on frames without a face.
    #[arg(long)]
    reset_on_face_loss: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if args.fps == 0 {
        return Err(anyhow!("fps must be >= 1"));
    }

    let per_segment = (args.fps * args.segment_secs) as usize;
    let script: Vec<Option<(f64, f64)>> = [
        Some((OPEN_EYES, CLOSED_MOUTH)),
        Some((CLOSED_EYES, CLOSED_MOUTH)),
        Some((OPEN_EYES, YAWN)),
        None,
        Some((OPEN_EYES, CLOSED_MOUTH)),
    ]
    .into_iter()
    .flat_map(|segment| std::iter::repeat(segment).take(per_segment))
    .collect();
    let frames = script.len() as u64;

    let t0 = Instant::now();
    let interval = Duration::from_secs_f64(1.0 / f64::from(args.fps));
    let mut source = drowsy_watch::ingest::SyntheticSource::new("demo", 640, 480)
        .with_clock(t0, interval)
        .with_limit(frames);
    source.connect()?;

    let mut registry = BackendRegistry::new();
    registry.register(ScriptedBackend::from_ratios(script));
    let settings = MonitorSettings {
        face_loss: if args.reset_on_face_loss {
            FaceLossPolicy::Reset
        } else {
            FaceLossPolicy::Hold
        },
        ..MonitorSettings::default()
    };
    let mut monitor = Monitor::new(settings, registry).with_session_start(t0);
    let mut display = NullDisplay::new();

    println!("frame    t(s)   EAR    MAR    drowsiness        yawning");
    let mut session = Session::new(&mut source, &mut monitor, &mut display);
    let reason = loop {
        match session.step()? {
            Step::Frame(report) => {
                let (ear, mar) = report
                    .measurement
                    .map(|m| (fmt_ratio(m.ear), fmt_ratio(m.mar)))
                    .unwrap_or_else(|| ("--".into(), "--".into()));
                println!(
                    "{:>5}  {:>6.2}  {:>5}  {:>5}    {:<16}  {}",
                    report.sequence,
                    report.captured_at.duration_since(t0).as_secs_f64(),
                    ear,
                    mar,
                    fmt_phase(report.drowsiness),
                    fmt_phase(report.yawning)
                );
            }
            Step::Stopped(reason) => break reason,
        }
    };
    drop(session);

    let stats = monitor.stats();
    println!();
    println!("stopped: {:?}", reason);
    println!(
        "frames={} no_face={} drowsiness_alerts={} yawning_alerts={}",
        stats.frames, stats.no_face_frames, stats.drowsiness_alerts, stats.yawning_alerts
    );
    Ok(())
}

fn fmt_ratio(ratio: Option<f64>) -> String {
    ratio
        .map(|r| format!("{:.2}", r))
        .unwrap_or_else(|| "--".into())
}

fn fmt_phase(phase: AlertPhase) -> String {
    match phase {
        AlertPhase::Idle => "idle".to_string(),
        AlertPhase::Armed { elapsed } => format!("armed {:.1}s", elapsed.as_secs_f64()),
        AlertPhase::Alerting { elapsed } => format!("ALERT {:.1}s", elapsed.as_secs_f64()),
        AlertPhase::Held { elapsed } => format!("held {:.1}s", elapsed.as_secs_f64()),
    }
}
