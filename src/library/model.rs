use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::display::format_duration;

static NEXT_TRACK_ID: AtomicU64 = AtomicU64::new(1);

/// Where a track's audio comes from. A track has exactly one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackSource {
    File(PathBuf),
    Url(String),
}

/// Display accent color for a track (RGB).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AccentColor(pub u8, pub u8, pub u8);

impl AccentColor {
    pub fn random() -> Self {
        let [r, g, b, _] = rand::random::<u32>().to_be_bytes();
        Self(r, g, b)
    }
}

#[derive(Debug, Clone)]
pub struct Track {
    pub id: u64,
    pub title: String,
    pub artist: String,
    /// Unknown until the media element reports it after loading.
    pub duration: Option<Duration>,
    pub source: TrackSource,
    pub color: AccentColor,
}

impl Track {
    pub fn new(title: String, artist: String, source: TrackSource) -> Self {
        Self {
            id: NEXT_TRACK_ID.fetch_add(1, Ordering::Relaxed),
            title,
            artist,
            duration: None,
            source,
            color: AccentColor::random(),
        }
    }

    /// Duration as `m:ss`, `0:00` while still unknown.
    pub fn duration_label(&self) -> String {
        format_duration(self.duration.unwrap_or(Duration::ZERO))
    }
}

/// Ordered list of tracks. New tracks go to the front.
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    tracks: Vec<Track>,
}

pub type PlaylistHandle = Arc<Mutex<Playlist>>;

impl Playlist {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    pub fn into_handle(self) -> PlaylistHandle {
        Arc::new(Mutex::new(self))
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Insert `track` at the front; it becomes index 0.
    pub fn prepend(&mut self, track: Track) {
        self.tracks.insert(0, track);
    }

    /// Record a duration reported by the media element.
    pub fn set_duration(&mut self, index: usize, duration: Duration) {
        if let Some(track) = self.tracks.get_mut(index) {
            track.duration = Some(duration);
        }
    }
}
