//! Application module: exposes the app model used by the TUI and runtime.
//!
//! The `App` model lives in `app::model` and holds the playlist view, cursor,
//! playback and visualizer snapshots, and the intake prompt.

mod model;

pub use model::*;
