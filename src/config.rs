use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::detect::CascadeParams;
use crate::display::{DEFAULT_QUIT_KEY, DEFAULT_WINDOW_TITLE};
use crate::ingest::{SourceSettings, SourceUri};
use crate::monitor::{
    FaceLossPolicy, MonitorSettings, DEFAULT_ALERT_SECS, DEFAULT_EAR_THRESHOLD,
    DEFAULT_MAR_THRESHOLD,
};
use crate::notify::{NotifyRule, NotifySettings};
use crate::preprocess::ClaheParams;

const DEFAULT_SOURCE: &str = "camera:0";
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_FPS: u32 = 30;
const DEFAULT_LANDMARK_MODEL: &str = "models/lbfmodel.yaml";
const DEFAULT_FACE_CASCADE: &str = "models/haarcascade_frontalface_default.xml";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct MonitorConfigFile {
    source: Option<SourceConfigFile>,
    models: Option<ModelConfigFile>,
    thresholds: Option<ThresholdConfigFile>,
    clahe: Option<ClaheConfigFile>,
    cascade: Option<CascadeConfigFile>,
    landmark_cascade: Option<CascadeConfigFile>,
    display: Option<DisplayConfigFile>,
    notify: Option<NotifyConfigFile>,
    face_loss: Option<FaceLossPolicy>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    uri: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    landmark_model: Option<PathBuf>,
    face_cascade: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct ThresholdConfigFile {
    ear: Option<f64>,
    mar: Option<f64>,
    alert_secs: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct ClaheConfigFile {
    clip_limit: Option<f64>,
    tile_grid: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct CascadeConfigFile {
    scale_factor: Option<f64>,
    min_neighbors: Option<i32>,
    min_size: Option<i32>,
}

#[derive(Debug, Deserialize, Default)]
struct DisplayConfigFile {
    enabled: Option<bool>,
    window_title: Option<String>,
    quit_key: Option<char>,
}

#[derive(Debug, Deserialize, Default)]
struct NotifyConfigFile {
    enabled: Option<bool>,
    bell: Option<bool>,
    drowsiness_cooldown_secs: Option<f64>,
    yawning_cooldown_secs: Option<f64>,
    drowsiness_streak: Option<u32>,
    yawning_streak: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub source: SourceSettings,
    pub models: ModelSettings,
    pub monitor: MonitorSettings,
    /// Coarse face locator pass.
    pub cascade: CascadeParams,
    /// Face pass run by the landmark backend before fitting.
    pub landmark_cascade: CascadeParams,
    pub display: DisplaySettings,
    pub notify: NotifySettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSettings {
    pub landmark_model: PathBuf,
    pub face_cascade: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySettings {
    pub enabled: bool,
    pub window_title: String,
    pub quit_key: char,
}

impl MonitorConfig {
    /// Defaults, then the file named by `DROWSY_CONFIG`, then `DROWSY_*` env vars.
    pub fn load() -> Result<Self> {
        Self::load_with(|_| Ok(()))
    }

    /// Like [`MonitorConfig::load`], with `overrides` (command-line flags)
    /// applied after the environment and before validation.
    pub fn load_with<F>(overrides: F) -> Result<Self>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let config_path = std::env::var("DROWSY_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        overrides(&mut cfg)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: MonitorConfigFile) -> Result<Self> {
        let source_file = file.source.unwrap_or_default();
        let uri = SourceUri::parse(source_file.uri.as_deref().unwrap_or(DEFAULT_SOURCE))?;
        let source = SourceSettings {
            uri,
            width: source_file.width.unwrap_or(DEFAULT_WIDTH),
            height: source_file.height.unwrap_or(DEFAULT_HEIGHT),
            target_fps: source_file.target_fps.unwrap_or(DEFAULT_FPS),
        };

        let models_file = file.models.unwrap_or_default();
        let models = ModelSettings {
            landmark_model: models_file
                .landmark_model
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LANDMARK_MODEL)),
            face_cascade: models_file
                .face_cascade
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FACE_CASCADE)),
        };

        let thresholds = file.thresholds.unwrap_or_default();
        let clahe_defaults = ClaheParams::default();
        let clahe = file
            .clahe
            .map(|clahe| ClaheParams {
                clip_limit: clahe.clip_limit.unwrap_or(clahe_defaults.clip_limit),
                tile_grid: clahe.tile_grid.unwrap_or(clahe_defaults.tile_grid),
            })
            .unwrap_or(clahe_defaults);
        let monitor = MonitorSettings {
            ear_threshold: thresholds.ear.unwrap_or(DEFAULT_EAR_THRESHOLD),
            mar_threshold: thresholds.mar.unwrap_or(DEFAULT_MAR_THRESHOLD),
            alert_after: alert_duration(thresholds.alert_secs.unwrap_or(DEFAULT_ALERT_SECS))?,
            clahe,
            face_loss: file.face_loss.unwrap_or_default(),
        };

        let cascade = cascade_params(file.cascade, CascadeParams::default());
        let landmark_cascade = cascade_params(file.landmark_cascade, CascadeParams::LANDMARK);

        let display_file = file.display.unwrap_or_default();
        let display = DisplaySettings {
            enabled: display_file.enabled.unwrap_or(true),
            window_title: display_file
                .window_title
                .unwrap_or_else(|| DEFAULT_WINDOW_TITLE.to_string()),
            quit_key: display_file.quit_key.unwrap_or(DEFAULT_QUIT_KEY),
        };

        let notify_file = file.notify.unwrap_or_default();
        let notify_defaults = NotifySettings::default();
        let notify = NotifySettings {
            enabled: notify_file.enabled.unwrap_or(notify_defaults.enabled),
            bell: notify_file.bell.unwrap_or(notify_defaults.bell),
            drowsiness: NotifyRule {
                streak: notify_file
                    .drowsiness_streak
                    .unwrap_or(notify_defaults.drowsiness.streak),
                cooldown: match notify_file.drowsiness_cooldown_secs {
                    Some(secs) => cooldown_duration(secs)?,
                    None => notify_defaults.drowsiness.cooldown,
                },
            },
            yawning: NotifyRule {
                streak: notify_file
                    .yawning_streak
                    .unwrap_or(notify_defaults.yawning.streak),
                cooldown: match notify_file.yawning_cooldown_secs {
                    Some(secs) => cooldown_duration(secs)?,
                    None => notify_defaults.yawning.cooldown,
                },
            },
        };

        Ok(Self {
            source,
            models,
            monitor,
            cascade,
            landmark_cascade,
            display,
            notify,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(source) = env_value("DROWSY_SOURCE") {
            self.source.uri = SourceUri::parse(&source)?;
        }
        if let Some(path) = env_value("DROWSY_LANDMARK_MODEL") {
            self.models.landmark_model = PathBuf::from(path);
        }
        if let Some(path) = env_value("DROWSY_FACE_CASCADE") {
            self.models.face_cascade = PathBuf::from(path);
        }
        if let Some(ear) = env_value("DROWSY_EAR_THRESHOLD") {
            self.monitor.ear_threshold = ear
                .parse()
                .map_err(|_| anyhow!("DROWSY_EAR_THRESHOLD must be a number"))?;
        }
        if let Some(mar) = env_value("DROWSY_MAR_THRESHOLD") {
            self.monitor.mar_threshold = mar
                .parse()
                .map_err(|_| anyhow!("DROWSY_MAR_THRESHOLD must be a number"))?;
        }
        if let Some(secs) = env_value("DROWSY_ALERT_SECS") {
            let secs: f64 = secs
                .parse()
                .map_err(|_| anyhow!("DROWSY_ALERT_SECS must be a number of seconds"))?;
            self.monitor.alert_after = alert_duration(secs)?;
        }
        if let Some(policy) = env_value("DROWSY_FACE_LOSS") {
            self.monitor.face_loss = policy.parse()?;
        }
        if let Some(headless) = env_value("DROWSY_HEADLESS") {
            self.display.enabled = !parse_flag("DROWSY_HEADLESS", &headless)?;
        }
        if let Some(notify) = env_value("DROWSY_NOTIFY") {
            self.notify.enabled = parse_flag("DROWSY_NOTIFY", &notify)?;
        }
        Ok(())
    }

    /// Checks ranges and that both model files exist.
    pub fn validate(&self) -> Result<()> {
        let m = &self.monitor;
        if !(m.ear_threshold.is_finite() && m.ear_threshold > 0.0) {
            return Err(anyhow!("EAR threshold must be a positive number"));
        }
        if !(m.mar_threshold.is_finite() && m.mar_threshold > 0.0) {
            return Err(anyhow!("MAR threshold must be a positive number"));
        }
        if m.alert_after.is_zero() {
            return Err(anyhow!("alert time must be greater than zero"));
        }
        m.clahe.validate()?;
        self.cascade.validate()?;
        self.landmark_cascade.validate()?;
        if self.notify.drowsiness.streak == 0 || self.notify.yawning.streak == 0 {
            return Err(anyhow!("notification streaks must be at least one frame"));
        }

        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!("capture resolution must be non-zero"));
        }
        if self.display.window_title.trim().is_empty() {
            return Err(anyhow!("window title must not be empty"));
        }
        if !self.display.quit_key.is_ascii_graphic() {
            return Err(anyhow!("quit key must be a printable ASCII character"));
        }

        for (what, path) in [
            ("landmark model", &self.models.landmark_model),
            ("face cascade", &self.models.face_cascade),
        ] {
            if !path.is_file() {
                return Err(anyhow!("{} not found at {}", what, path.display()));
            }
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<MonitorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow!("{} must be a boolean (1/0, true/false)", key)),
    }
}

fn cascade_params(file: Option<CascadeConfigFile>, defaults: CascadeParams) -> CascadeParams {
    file.map(|cascade| CascadeParams {
        scale_factor: cascade.scale_factor.unwrap_or(defaults.scale_factor),
        min_neighbors: cascade.min_neighbors.unwrap_or(defaults.min_neighbors),
        min_size: cascade.min_size.unwrap_or(defaults.min_size),
    })
    .unwrap_or(defaults)
}

/// Seconds a condition must hold before alerting; positive and representable.
pub fn alert_duration(secs: f64) -> Result<Duration> {
    let duration = Duration::try_from_secs_f64(secs)
        .map_err(|e| anyhow!("alert time {} is not a usable number of seconds: {}", secs, e))?;
    if duration.is_zero() {
        return Err(anyhow!("alert time must be greater than zero"));
    }
    Ok(duration)
}

fn cooldown_duration(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|e| anyhow!("notify cooldown {} is not a usable number of seconds: {}", secs, e))
}
