use super::load::{default_config_path, resolve_config_path};
use super::schema::*;
use std::sync::{Mutex, OnceLock};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct EnvGuard {
    key: &'static str,
    old: Option<std::ffi::OsString>,
}

impl EnvGuard {
    fn set(key: &'static str, val: &str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::set_var(key, val);
        }
        Self { key, old }
    }

    fn remove(key: &'static str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::remove_var(key);
        }
        Self { key, old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match self.old.take() {
            Some(v) => unsafe {
                std::env::set_var(self.key, v);
            },
            None => unsafe {
                std::env::remove_var(self.key);
            },
        }
    }
}

#[test]
fn resolve_config_path_prefers_soundwave_config_path() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("SOUNDWAVE_CONFIG_PATH", "/tmp/soundwave-test-config.toml");
    assert_eq!(
        resolve_config_path().unwrap(),
        std::path::PathBuf::from("/tmp/soundwave-test-config.toml")
    );
}

#[test]
fn default_config_path_prefers_xdg_config_home() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_CONFIG_HOME", "/tmp/xdg-config-home");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-should-not-win");

    let p = default_config_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/xdg-config-home")
            .join("soundwave")
            .join("config.toml")
    );
}

#[test]
fn default_config_path_falls_back_to_home_dot_config() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("XDG_CONFIG_HOME");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-dir");

    let p = default_config_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/home-dir")
            .join(".config")
            .join("soundwave")
            .join("config.toml")
    );
}

#[test]
fn defaults_pass_validation() {
    let s = Settings::default();
    assert!(s.validate().is_ok());
    assert_eq!(s.analysis.fft_size, 128);
    assert_eq!(s.analysis.smoothing, 0.8);
    assert_eq!(s.audio.initial_volume, 75);
}

#[test]
fn validate_rejects_bad_analysis_parameters() {
    let mut s = Settings::default();
    s.analysis.fft_size = 100;
    assert!(s.validate().is_err());

    // 64 would only yield 32 bins, too few for the 50-point waveform.
    s.analysis.fft_size = 64;
    assert!(s.validate().is_err());

    s.analysis.fft_size = 256;
    s.analysis.smoothing = 1.5;
    assert!(s.validate().is_err());

    s.analysis.smoothing = 0.5;
    s.analysis.min_decibels = -20.0;
    s.analysis.max_decibels = -30.0;
    assert!(s.validate().is_err());

    s.analysis.min_decibels = -90.0;
    assert!(s.validate().is_ok());

    s.visualizer.frame_interval_ms = 0;
    assert!(s.validate().is_err());

    s.visualizer.frame_interval_ms = 16;
    s.audio.stream_timeout_ms = 0;
    assert!(s.validate().is_err());
}

#[test]
fn settings_load_from_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[audio]
poll_interval_ms = 40
quit_fade_out_ms = 0
initial_volume = 30
stream_timeout_ms = 2500

[analysis]
fft_size = 512
smoothing = 0.5

[visualizer]
frame_interval_ms = 33
show_particles = false

[controls]
scrub_seconds = 9
volume_step = 10

[ui]
header_text = "hello"
now_playing_time_fields = ["elapsed", "remaining"]
now_playing_time_separator = " | "

[library]
extensions = ["mp3"]
recursive = false

[logging]
level = "debug"
file = "/tmp/soundwave-test.log"
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("SOUNDWAVE_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::remove("SOUNDWAVE__AUDIO__INITIAL_VOLUME");

    let s = Settings::load().unwrap();
    assert_eq!(s.audio.poll_interval_ms, 40);
    assert_eq!(s.audio.quit_fade_out_ms, 0);
    assert_eq!(s.audio.initial_volume, 30);
    assert_eq!(s.audio.stream_timeout_ms, 2500);
    assert_eq!(s.analysis.fft_size, 512);
    assert_eq!(s.analysis.smoothing, 0.5);
    // Untouched keys keep their defaults.
    assert_eq!(s.analysis.max_decibels, -30.0);
    assert_eq!(s.visualizer.frame_interval_ms, 33);
    assert!(!s.visualizer.show_particles);
    assert_eq!(s.controls.scrub_seconds, 9);
    assert_eq!(s.controls.volume_step, 10);
    assert_eq!(s.ui.header_text, "hello");
    assert_eq!(s.ui.now_playing_time_fields.len(), 2);
    assert!(matches!(s.ui.now_playing_time_fields[1], TimeField::Remaining));
    assert_eq!(s.ui.now_playing_time_separator, " | ");
    assert_eq!(s.library.extensions, vec!["mp3".to_string()]);
    assert!(!s.library.recursive);
    assert_eq!(s.logging.level, "debug");
    assert_eq!(
        s.logging.file,
        Some(std::path::PathBuf::from("/tmp/soundwave-test.log"))
    );
}

#[test]
fn settings_env_overrides_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[audio]
initial_volume = 75
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("SOUNDWAVE_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::set("SOUNDWAVE__AUDIO__INITIAL_VOLUME", "20");

    let s = Settings::load().unwrap();
    assert_eq!(s.audio.initial_volume, 20);
}
