//! Audio subsystem.
//!
//! A dedicated thread owns playback (the media element), the analysis graph
//! and any microphone capture. The UI talks to it through `AudioPlayer` and
//! reads the spectrum through an `AnalysisHandle`.

mod analyser;
mod bus;
mod capture;
mod element;
mod fetch;
mod graph;
mod player;
mod queue;
mod sink;
mod tap;
mod thread;
mod transport;
mod types;

pub use analyser::AnalysisHandle;
pub use player::AudioPlayer;
pub use types::{AudioCmd, AudioEvent, PlaybackHandle, PlaybackInfo};
