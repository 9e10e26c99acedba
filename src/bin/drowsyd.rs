//! drowsyd - live driver drowsiness monitor
//!
//! Reads frames from the configured camera, runs the EAR/MAR pipeline on each
//! one and shows the annotated feed until the quit key, Ctrl-C or a capture
//! failure.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::mpsc;

use drowsy_watch::config::alert_duration;
use drowsy_watch::ui::{Ui, UiMode};
use drowsy_watch::{
    open_source, BackendRegistry, ConsoleSink, Display, Monitor, MonitorConfig, Notifier,
    NullDisplay, Session, SourceUri,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Frame source URI (camera:<index>, v4l2:<device>, images:<dir>, stub://<name>).
    #[arg(long)]
    source: Option<String>,
    /// LBF 68-point landmark model.
    #[arg(long)]
    landmark_model: Option<PathBuf>,
    /// Haar cascade for the face passes.
    #[arg(long)]
    face_cascade: Option<PathBuf>,
    #[arg(long)]
    ear_threshold: Option<f64>,
    #[arg(long)]
    mar_threshold: Option<f64>,
    /// Seconds a condition must hold before alerting.
    #[arg(long)]
    alert_secs: Option<f64>,
    /// Timer behaviour on frames without a face (hold|reset).
    #[arg(long)]
    face_loss: Option<String>,
    /// Run without a window.
    #[arg(long)]
    headless: bool,
    /// Do not send driver notifications (banners and log alerts still appear).
    #[arg(long)]
    no_notify: bool,
    #[arg(long, value_enum, default_value_t = UiMode::Auto)]
    ui: UiMode,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let ui = Ui::detect(args.ui);

    let cfg = {
        let _stage = ui.stage("Loading configuration");
        MonitorConfig::load_with(|cfg| apply_args(cfg, &args))?
    };
    log::info!(
        "source={} ear<{} mar>{} alert_after={:.1}s face_loss={:?} notify={}",
        cfg.source.uri,
        cfg.monitor.ear_threshold,
        cfg.monitor.mar_threshold,
        cfg.monitor.alert_after.as_secs_f64(),
        cfg.monitor.face_loss,
        cfg.notify.enabled
    );

    let registry = {
        let _stage = ui.stage("Loading detectors");
        let mut registry = build_registry(&cfg)?;
        registry.warm_up_all()?;
        registry
    };

    let mut source = {
        let _stage = ui.stage(&format!("Connecting to {}", cfg.source.uri));
        let mut source = open_source(&cfg.source)?;
        source.connect()?;
        source
    };

    let mut display = open_display(&cfg)?;

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .expect("error setting Ctrl-C handler");

    log::info!(
        "drowsyd running; press '{}' in the window or Ctrl-C to stop",
        cfg.display.quit_key
    );
    // No session start: the first frame is its own onset, so camera warm-up
    // never counts towards an alert.
    let mut monitor = Monitor::new(cfg.monitor, registry);
    let mut notifier = Notifier::new(cfg.notify, Box::new(ConsoleSink::new(cfg.notify.bell)));
    let summary = Session::new(source.as_mut(), &mut monitor, display.as_mut())
        .with_notifier(&mut notifier)
        .with_shutdown(&rx)
        .run()?;

    ui.summary(&summary.session, &summary.source, summary.elapsed);
    if summary.notifications > 0 {
        log::info!("{} driver notifications sent", summary.notifications);
    }
    Ok(())
}

fn apply_args(cfg: &mut MonitorConfig, args: &Args) -> Result<()> {
    if let Some(source) = &args.source {
        cfg.source.uri = SourceUri::parse(source)?;
    }
    if let Some(path) = &args.landmark_model {
        cfg.models.landmark_model = path.clone();
    }
    if let Some(path) = &args.face_cascade {
        cfg.models.face_cascade = path.clone();
    }
    if let Some(ear) = args.ear_threshold {
        cfg.monitor.ear_threshold = ear;
    }
    if let Some(mar) = args.mar_threshold {
        cfg.monitor.mar_threshold = mar;
    }
    if let Some(secs) = args.alert_secs {
        cfg.monitor.alert_after = alert_duration(secs)?;
    }
    if let Some(policy) = &args.face_loss {
        cfg.monitor.face_loss = policy.parse()?;
    }
    if args.headless {
        cfg.display.enabled = false;
    }
    if args.no_notify {
        cfg.notify.enabled = false;
    }
    Ok(())
}

#[cfg(feature = "backend-opencv")]
fn build_registry(cfg: &MonitorConfig) -> Result<BackendRegistry> {
    use drowsy_watch::detect::backends::{HaarFaceLocator, LbfLandmarkBackend};

    let mut registry = BackendRegistry::new();
    registry.register(HaarFaceLocator::new(&cfg.models.face_cascade, cfg.cascade)?);
    registry.register(LbfLandmarkBackend::new(
        &cfg.models.landmark_model,
        &cfg.models.face_cascade,
        cfg.landmark_cascade,
    )?);
    log::info!(
        "detectors loaded: {} (model {})",
        registry.list().join(", "),
        cfg.models.landmark_model.display()
    );
    Ok(registry)
}

#[cfg(not(feature = "backend-opencv"))]
fn build_registry(_cfg: &MonitorConfig) -> Result<BackendRegistry> {
    anyhow::bail!("drowsyd needs its detectors; build with --features backend-opencv")
}

fn open_display(cfg: &MonitorConfig) -> Result<Box<dyn Display>> {
    if !cfg.display.enabled {
        log::info!("display disabled, running headless");
        return Ok(Box::new(NullDisplay::new()));
    }
    #[cfg(feature = "backend-opencv")]
    {
        Ok(Box::new(drowsy_watch::display::HighGuiDisplay::new(
            &cfg.display.window_title,
            cfg.display.quit_key,
        )?))
    }
    #[cfg(not(feature = "backend-opencv"))]
    {
        log::warn!("built without backend-opencv; no window available, running headless");
        Ok(Box::new(NullDisplay::new()))
    }
}
