use std::fs::OpenOptions;
use std::path::PathBuf;

use env_logger::{Env, Target};

use crate::config::LoggingSettings;

pub fn log_file_path(settings: &LoggingSettings) -> PathBuf {
    settings
        .file
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("soundwave.log"))
}

/// Route `log` output to a file; the terminal belongs to the UI.
/// `RUST_LOG` wins over the configured level.
pub fn init_logging(settings: &LoggingSettings) -> PathBuf {
    let path = log_file_path(settings);

    let mut builder =
        env_logger::Builder::from_env(Env::default().default_filter_or(settings.level.as_str()));
    builder.format_timestamp_millis();

    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => {
            builder.target(Target::Pipe(Box::new(file)));
        }
        Err(e) => {
            eprintln!("soundwave: cannot open log file {}: {e}", path.display());
            builder.filter_level(log::LevelFilter::Off);
        }
    }

    if let Err(e) = builder.try_init() {
        eprintln!("soundwave: logger already initialised: {e}");
    }
    path
}
