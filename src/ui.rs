//! Terminal feedback for the binaries: startup stages and the exit summary.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::IsTerminal;
use std::time::{Duration, Instant};

use crate::ingest::SourceStats;
use crate::monitor::SessionStats;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum UiMode {
    #[default]
    Auto,
    Plain,
    Pretty,
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool) -> Self {
        Self { mode, is_tty }
    }

    /// Spinners only when stderr is a terminal and `NO_COLOR` is unset.
    pub fn detect(mode: UiMode) -> Self {
        let is_tty = std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none();
        Self::new(mode, is_tty)
    }

    fn pretty(&self) -> bool {
        match self.mode {
            UiMode::Pretty => true,
            UiMode::Auto => self.is_tty,
            UiMode::Plain => false,
        }
    }

    pub fn stage(&self, name: &str) -> StageGuard {
        if self.pretty() {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner.set_message(format!("{name}…"));
            StageGuard::new(name.to_string(), Some(spinner))
        } else {
            eprintln!("==> {}", name);
            StageGuard::new(name.to_string(), None)
        }
    }

    pub fn summary(&self, session: &SessionStats, source: &SourceStats, elapsed: Duration) {
        for line in summary_lines(session, source, elapsed) {
            eprintln!("{line}");
        }
    }
}

pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
}

impl StageGuard {
    fn new(name: String, spinner: Option<ProgressBar>) -> Self {
        Self {
            name,
            start: Instant::now(),
            spinner,
        }
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let message = format!("✔ {} ({})", self.name, format_duration(self.start.elapsed()));
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(message);
        } else {
            eprintln!("{message}");
        }
    }
}

fn summary_lines(session: &SessionStats, source: &SourceStats, elapsed: Duration) -> Vec<String> {
    vec![
        format!(
            "session: {} frames from {} in {}",
            session.frames,
            source.source,
            format_duration(elapsed)
        ),
        format!(
            "  faces: {} with landmarks, {} with no face, {} with undefined ratios",
            session.landmark_frames, session.no_face_frames, session.undefined_ratio_frames
        ),
        format!(
            "  alerts: {} drowsiness, {} yawning",
            session.drowsiness_alerts, session.yawning_alerts
        ),
    ]
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_mode_never_uses_spinners() {
        assert!(!Ui::new(UiMode::Plain, true).pretty());
        assert!(!Ui::new(UiMode::Auto, false).pretty());
        assert!(Ui::new(UiMode::Auto, true).pretty());
        assert!(Ui::new(UiMode::Pretty, false).pretty());
    }

    #[test]
    fn durations_switch_units_at_one_second() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }

    #[test]
    fn summary_mentions_alert_counts() {
        let session = SessionStats {
            frames: 10,
            drowsiness_alerts: 2,
            yawning_alerts: 1,
            ..SessionStats::default()
        };
        let source = SourceStats {
            frames_captured: 10,
            source: "stub://t".into(),
        };
        let lines = summary_lines(&session, &source, Duration::from_secs(2));
        assert!(lines[0].contains("10 frames from stub://t"));
        assert!(lines[2].contains("2 drowsiness, 1 yawning"));
    }
}
