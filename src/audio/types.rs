//! Audio-related small types and handles.
//!
//! This module defines the commands sent to the audio thread, the events it
//! sends back, and the playback information it shares with the UI.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::Error;
use crate::library::Track;

#[derive(Debug)]
pub enum AudioCmd {
    /// Toggle pause/resume (stops the microphone if it is active).
    TogglePlay,
    /// Skip to the next track, wrapping around.
    Next,
    /// Go to the previous track, wrapping around.
    Prev,
    /// Start playing the playlist entry at the given index.
    Select(usize),
    /// Insert a track at the front of the playlist and make it current.
    AddTrack(Track),
    /// Seek to a percentage (0-100) of the current track.
    Seek(f32),
    /// Seek by the specified number of seconds (positive or negative).
    SeekBy(i64),
    /// Set the volume, in percent.
    SetVolume(u8),
    StartMicrophone,
    StopMicrophone,
    /// Quit the audio thread, optionally fading out over `fade_out_ms` milliseconds.
    Quit { fade_out_ms: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AudioEvent {
    /// A command failed; playback state has already been reset.
    Failed(Error),
    /// The element reported the duration of a freshly loaded track.
    MetadataLoaded { title: String, duration: Duration },
}

#[derive(Debug, Clone, PartialEq)]
/// Runtime playback information shared with the UI.
pub struct PlaybackInfo {
    /// Current track index in the playlist (if the playlist is not empty).
    pub index: Option<usize>,
    /// Elapsed playback time for the current track.
    pub elapsed: Duration,
    /// Duration of the current track, once known.
    pub total: Option<Duration>,
    /// Elapsed as a percentage of `total` (0-100).
    pub progress: f32,
    /// Whether playback (or microphone capture) is currently active.
    pub playing: bool,
    pub using_microphone: bool,
    /// Volume in percent.
    pub volume: u8,
}

impl Default for PlaybackInfo {
    fn default() -> Self {
        Self {
            index: None,
            elapsed: Duration::ZERO,
            total: None,
            progress: 0.0,
            playing: false,
            using_microphone: false,
            volume: 75,
        }
    }
}

pub type PlaybackHandle = Arc<Mutex<PlaybackInfo>>;
