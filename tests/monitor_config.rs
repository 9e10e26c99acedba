use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use tempfile::{Builder, NamedTempFile, TempDir};

use drowsy_watch::config::MonitorConfig;
use drowsy_watch::{FaceLossPolicy, SourceUri};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "DROWSY_CONFIG",
        "DROWSY_SOURCE",
        "DROWSY_LANDMARK_MODEL",
        "DROWSY_FACE_CASCADE",
        "DROWSY_EAR_THRESHOLD",
        "DROWSY_MAR_THRESHOLD",
        "DROWSY_ALERT_SECS",
        "DROWSY_FACE_LOSS",
        "DROWSY_HEADLESS",
        "DROWSY_NOTIFY",
    ] {
        std::env::remove_var(key);
    }
}

/// Empty stand-ins for the model files; validation only checks they exist.
fn model_files() -> (TempDir, PathBuf, PathBuf) {
    let dir = tempfile::tempdir().expect("temp dir");
    let model = dir.path().join("lbfmodel.yaml");
    let cascade = dir.path().join("haarcascade_frontalface_default.xml");
    std::fs::write(&model, "").expect("write model");
    std::fs::write(&cascade, "").expect("write cascade");
    (dir, model, cascade)
}

/// Point the model env vars at fresh stand-ins.
fn env_model_files() -> TempDir {
    let (dir, model, cascade) = model_files();
    std::env::set_var("DROWSY_LANDMARK_MODEL", &model);
    std::env::set_var("DROWSY_FACE_CASCADE", &cascade);
    dir
}

fn write_config(suffix: &str, body: &str) -> NamedTempFile {
    let mut file = Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("temp config");
    std::io::Write::write_all(&mut file, body.as_bytes()).expect("write config");
    file
}

#[test]
fn loads_json_config_with_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();
    let (_dir, model, cascade) = model_files();

    let json = format!(
        r#"{{
            "source": {{ "uri": "v4l2:/dev/video2", "width": 800, "height": 600, "target_fps": 15 }},
            "models": {{ "landmark_model": "{}", "face_cascade": "{}" }},
            "thresholds": {{ "ear": 0.2, "mar": 0.7, "alert_secs": 2.5 }},
            "clahe": {{ "clip_limit": 3.0, "tile_grid": 4 }},
            "cascade": {{ "scale_factor": 1.2, "min_neighbors": 4, "min_size": 40 }},
            "landmark_cascade": {{ "min_neighbors": 6 }},
            "display": {{ "window_title": "cab", "quit_key": "q" }},
            "face_loss": "reset"
        }}"#,
        model.display(),
        cascade.display()
    );
    let file = write_config(".json", &json);

    std::env::set_var("DROWSY_CONFIG", file.path());
    std::env::set_var("DROWSY_SOURCE", "camera:1");
    std::env::set_var("DROWSY_EAR_THRESHOLD", "0.18");
    std::env::set_var("DROWSY_HEADLESS", "true");

    let cfg = MonitorConfig::load().expect("load config");
    assert_eq!(cfg.source.uri, SourceUri::Camera(1));
    assert_eq!((cfg.source.width, cfg.source.height), (800, 600));
    assert_eq!(cfg.source.target_fps, 15);
    assert_eq!(cfg.models.landmark_model, model);
    assert_eq!(cfg.monitor.ear_threshold, 0.18);
    assert_eq!(cfg.monitor.mar_threshold, 0.7);
    assert_eq!(cfg.monitor.alert_after, Duration::from_millis(2500));
    assert_eq!(cfg.monitor.clahe.clip_limit, 3.0);
    assert_eq!(cfg.monitor.clahe.tile_grid, 4);
    assert_eq!(cfg.monitor.face_loss, FaceLossPolicy::Reset);
    assert_eq!(cfg.cascade.min_size, 40);
    assert_eq!(cfg.landmark_cascade.min_neighbors, 6);
    assert_eq!(cfg.landmark_cascade.scale_factor, 1.1);
    assert!(!cfg.display.enabled);
    assert_eq!(cfg.display.window_title, "cab");
    assert_eq!(cfg.display.quit_key, 'q');

    clear_env();
}

#[test]
fn loads_toml_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();
    let _models = env_model_files();

    let file = write_config(
        ".toml",
        r#"
face_loss = "hold"

[source]
uri = "stub://cab"

[thresholds]
mar = 0.65

[notify]
yawning_cooldown_secs = 20
"#,
    );
    std::env::set_var("DROWSY_CONFIG", file.path());

    let cfg = MonitorConfig::load().expect("load config");
    assert_eq!(cfg.source.uri, SourceUri::Stub("cab".into()));
    assert_eq!(cfg.monitor.mar_threshold, 0.65);
    assert_eq!(cfg.monitor.ear_threshold, 0.21);
    assert_eq!(cfg.monitor.alert_after, Duration::from_secs(3));
    assert!(cfg.display.enabled);
    assert!(cfg.notify.enabled);
    assert_eq!(cfg.notify.yawning.cooldown, Duration::from_secs(20));

    clear_env();
}

#[test]
fn huge_alert_time_is_an_error_not_a_panic() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();
    let _models = env_model_files();

    let file = write_config(".json", r#"{ "thresholds": { "alert_secs": 1e30 } }"#);
    std::env::set_var("DROWSY_CONFIG", file.path());
    let err = MonitorConfig::load().expect_err("1e30 s must be rejected");
    assert!(err.to_string().contains("alert time"));

    std::env::remove_var("DROWSY_CONFIG");
    std::env::set_var("DROWSY_ALERT_SECS", "1e30");
    assert!(MonitorConfig::load().is_err());

    clear_env();
}

#[test]
fn backend_selection_is_not_a_config_key() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();
    let _models = env_model_files();

    let file = write_config(".toml", "backend = \"scripted\"\n");
    std::env::set_var("DROWSY_CONFIG", file.path());
    assert!(MonitorConfig::load().is_err());

    clear_env();
}

#[test]
fn missing_landmark_model_fails_validation() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();
    let (_dir, _model, cascade) = model_files();

    std::env::set_var("DROWSY_LANDMARK_MODEL", "/nonexistent/lbfmodel.yaml");
    std::env::set_var("DROWSY_FACE_CASCADE", &cascade);

    let err = MonitorConfig::load().expect_err("missing model must fail");
    assert!(err.to_string().contains("landmark model"));

    clear_env();
}

#[test]
fn overrides_apply_before_validation() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();
    let (_dir, model, cascade) = model_files();

    std::env::set_var("DROWSY_FACE_LOSS", "reset");
    let cfg = MonitorConfig::load_with(|cfg| {
        cfg.models.landmark_model = model.clone();
        cfg.models.face_cascade = cascade.clone();
        Ok(())
    })
    .expect("load config");
    assert_eq!(cfg.models.landmark_model, model);
    assert_eq!(cfg.monitor.face_loss, FaceLossPolicy::Reset);

    clear_env();
}

#[test]
fn rejects_invalid_env_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let _models = env_model_files();
    for (key, value) in [
        ("DROWSY_ALERT_SECS", "0"),
        ("DROWSY_EAR_THRESHOLD", "abc"),
        ("DROWSY_FACE_LOSS", "forget"),
        ("DROWSY_SOURCE", "rtsp://cam"),
        ("DROWSY_HEADLESS", "maybe"),
        ("DROWSY_NOTIFY", "loud"),
    ] {
        std::env::set_var(key, value);
        assert!(MonitorConfig::load().is_err(), "{}={} should fail", key, value);
        std::env::remove_var(key);
    }

    clear_env();
}
