//! Track intake and the playlist model.
//!
//! Tracks come from local files (single file or a scanned directory) or from
//! remote URLs. The playlist is shared between the UI and the audio thread.

mod display;
mod model;
mod scan;

pub use display::format_duration;
pub use model::*;
pub use scan::{scan, track_from_file, track_from_url};
