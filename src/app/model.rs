//! Application model types: `App` and the intake `Prompt`.
//!
//! The `App` struct holds the cursor, the latest playback and visualizer
//! snapshots, and the purely cosmetic toggles shown in the status bar.

use std::sync::Arc;

use crate::audio::{PlaybackHandle, PlaybackInfo};
use crate::library::{PlaylistHandle, Track};
use crate::visualizer::VisualSnapshot;

/// What a prompt's text will be turned into.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PromptKind {
    /// A path to a local audio file.
    File,
    /// A remote stream URL.
    Url,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub buffer: String,
}

/// The main application model.
pub struct App {
    pub playlist: PlaylistHandle,
    pub selected: usize,
    pub playback: PlaybackInfo,
    pub playback_handle: Option<PlaybackHandle>,
    pub visual: Arc<VisualSnapshot>,

    /// Cursor follows the now-playing entry until the user moves it.
    pub follow_playback: bool,

    pub liked: bool,
    /// Shown in the status bar only; playback order is unaffected.
    pub shuffle: bool,
    /// Shown in the status bar only; the playlist always wraps.
    pub repeat: bool,

    pub prompt: Option<Prompt>,
    pub alert: Option<String>,
    pub status: Option<String>,
    pub current_dir: Option<String>,
}

impl App {
    /// Create a new `App` over a shared playlist.
    pub fn new(playlist: PlaylistHandle) -> Self {
        Self {
            playlist,
            selected: 0,
            playback: PlaybackInfo::default(),
            playback_handle: None,
            visual: Arc::new(VisualSnapshot::default()),
            follow_playback: true,
            liked: false,
            shuffle: false,
            repeat: false,
            prompt: None,
            alert: None,
            status: None,
            current_dir: None,
        }
    }

    /// Attach a `PlaybackHandle` used to observe playback progress.
    pub fn set_playback_handle(&mut self, h: PlaybackHandle) {
        self.playback = h.lock().map(|info| info.clone()).unwrap_or_default();
        self.playback_handle = Some(h);
    }

    /// Record the scanned directory in the app state.
    pub fn set_current_dir(&mut self, dir: String) {
        self.current_dir = Some(dir);
    }

    /// Copy the audio thread's latest `PlaybackInfo`; follow it with the
    /// cursor when following is on.
    pub fn sync_playback(&mut self) {
        let Some(info) = self
            .playback_handle
            .as_ref()
            .and_then(|h| h.lock().ok().map(|info| info.clone()))
        else {
            return;
        };
        if self.follow_playback {
            if let Some(idx) = info.index {
                self.selected = idx;
            }
        }
        self.playback = info;
        self.clamp_selected();
    }

    pub fn set_visual(&mut self, snapshot: Arc<VisualSnapshot>) {
        self.visual = snapshot;
    }

    /// Whether the visualizer should be sampling right now.
    pub fn should_analyze(&self) -> bool {
        self.playback.playing && (self.playback.index.is_some() || self.playback.using_microphone)
    }

    /// A copy of the playlist for rendering.
    pub fn tracks(&self) -> Vec<Track> {
        self.playlist
            .lock()
            .map(|p| p.tracks().to_vec())
            .unwrap_or_default()
    }

    pub fn track_count(&self) -> usize {
        self.playlist.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Return true if the playlist contains any tracks.
    pub fn has_tracks(&self) -> bool {
        self.track_count() > 0
    }

    /// The track the audio thread considers current.
    pub fn current_track(&self) -> Option<Track> {
        let idx = self.playback.index?;
        self.playlist.lock().ok()?.get(idx).cloned()
    }

    fn clamp_selected(&mut self) {
        let len = self.track_count();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    /// Move selection to the next track, wrapping to the top.
    pub fn next(&mut self) {
        let len = self.track_count();
        if len > 0 {
            self.selected = (self.selected + 1) % len;
        }
    }

    /// Move selection to the previous track, wrapping to the bottom.
    pub fn prev(&mut self) {
        let len = self.track_count();
        if len > 0 {
            self.selected = if self.selected == 0 || self.selected >= len {
                len - 1
            } else {
                self.selected - 1
            };
        }
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.track_count().saturating_sub(1);
    }

    /// Enable following playback (cursor follows currently playing track).
    pub fn follow_playback_on(&mut self) {
        self.follow_playback = true;
    }

    pub fn follow_playback_off(&mut self) {
        self.follow_playback = false;
    }

    pub fn toggle_like(&mut self) {
        self.liked = !self.liked;
    }

    pub fn toggle_shuffle(&mut self) {
        self.shuffle = !self.shuffle;
    }

    pub fn toggle_repeat(&mut self) {
        self.repeat = !self.repeat;
    }

    /// Volume after stepping up by `step` percent, capped at 100.
    pub fn volume_up(&self, step: u8) -> u8 {
        self.playback.volume.saturating_add(step).min(100)
    }

    pub fn volume_down(&self, step: u8) -> u8 {
        self.playback.volume.saturating_sub(step)
    }

    /// Open an empty prompt, replacing any prompt in progress.
    pub fn open_prompt(&mut self, kind: PromptKind) {
        self.prompt = Some(Prompt {
            kind,
            buffer: String::new(),
        });
    }

    pub fn cancel_prompt(&mut self) {
        self.prompt = None;
    }

    pub fn push_prompt_char(&mut self, c: char) {
        if let Some(p) = self.prompt.as_mut() {
            p.buffer.push(c);
        }
    }

    pub fn pop_prompt_char(&mut self) {
        if let Some(p) = self.prompt.as_mut() {
            p.buffer.pop();
        }
    }

    /// Close the prompt and hand back its kind and trimmed text. Blank input
    /// closes the prompt and yields nothing.
    pub fn take_prompt(&mut self) -> Option<(PromptKind, String)> {
        let prompt = self.prompt.take()?;
        let text = prompt.buffer.trim();
        if text.is_empty() {
            None
        } else {
            Some((prompt.kind, text.to_string()))
        }
    }

    pub fn show_alert(&mut self, message: impl Into<String>) {
        self.alert = Some(message.into());
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }
}
