use std::{env, path::PathBuf};

use super::schema::Settings;

/// Configuration loading helpers.
///
/// `Settings::load` tries environment variables first (prefix `SOUNDWAVE__`), then an
/// optional config file and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("SOUNDWAVE")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Reject settings the analyser or the scheduler cannot work with.
    pub fn validate(&self) -> Result<(), String> {
        let fft = self.analysis.fft_size;
        if !fft.is_power_of_two() || !(128..=32768).contains(&fft) {
            return Err(format!(
                "analysis.fft_size must be a power of two in 128..=32768, got {fft}"
            ));
        }
        if !(0.0..=1.0).contains(&self.analysis.smoothing) {
            return Err("analysis.smoothing must be within 0.0..=1.0".to_string());
        }
        if self.analysis.min_decibels >= self.analysis.max_decibels {
            return Err("analysis.min_decibels must be below analysis.max_decibels".to_string());
        }
        if self.visualizer.frame_interval_ms == 0 {
            return Err("visualizer.frame_interval_ms must be >= 1".to_string());
        }
        if self.audio.poll_interval_ms == 0 {
            return Err("audio.poll_interval_ms must be >= 1".to_string());
        }
        if self.audio.stream_timeout_ms == 0 {
            return Err("audio.stream_timeout_ms must be >= 1".to_string());
        }
        if self.audio.initial_volume > 100 {
            return Err("audio.initial_volume must be <= 100".to_string());
        }
        Ok(())
    }
}

/// Resolve the config path from `SOUNDWAVE_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("SOUNDWAVE_CONFIG_PATH") {
        return Some(PathBuf::from(p));
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/soundwave/config.toml`
/// or `~/.config/soundwave/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    let config_home = if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    };

    config_home.map(|d| d.join("soundwave").join("config.toml"))
}
