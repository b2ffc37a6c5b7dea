//! Playback transport: the state machine behind every play/skip/seek key.
//!
//! The transport owns the media element and the audio graph, keeps the
//! playlist cursor, and publishes a `PlaybackInfo` after every change.

use std::sync::mpsc::Sender;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::library::{PlaylistHandle, Track};

use super::capture::InputDevice;
use super::element::MediaElement;
use super::graph::AudioGraph;
use super::queue::{next_index, prev_index};
use super::types::{AudioEvent, PlaybackHandle};

pub struct Transport<E, D> {
    element: E,
    graph: AudioGraph<D>,
    playlist: PlaylistHandle,
    playback: PlaybackHandle,
    events: Sender<AudioEvent>,
    current: usize,
    playing: bool,
    using_microphone: bool,
    volume: u8,
    /// Id of the track the element currently holds.
    loaded: Option<u64>,
}

impl<E: MediaElement, D: InputDevice> Transport<E, D> {
    pub fn new(
        element: E,
        graph: AudioGraph<D>,
        playlist: PlaylistHandle,
        playback: PlaybackHandle,
        events: Sender<AudioEvent>,
        volume: u8,
    ) -> Self {
        let mut transport = Self {
            element,
            graph,
            playlist,
            playback,
            events,
            current: 0,
            playing: false,
            using_microphone: false,
            volume: volume.min(100),
            loaded: None,
        };
        transport.element.set_volume(transport.volume as f32 / 100.0);
        transport.publish();
        transport
    }

    #[cfg(test)]
    pub fn element(&self) -> &E {
        &self.element
    }

    #[cfg(test)]
    pub fn element_mut(&mut self) -> &mut E {
        &mut self.element
    }

    fn len(&self) -> usize {
        self.playlist.lock().map(|p| p.len()).unwrap_or(0)
    }

    fn track_at(&self, index: usize) -> Option<Track> {
        self.playlist
            .lock()
            .ok()
            .and_then(|p| p.get(index).cloned())
    }

    fn current_is_loaded(&self) -> bool {
        self.element.is_loaded()
            && self.loaded.is_some()
            && self.loaded == self.track_at(self.current).map(|t| t.id)
    }

    /// Load the current playlist entry into the element, paused at zero.
    fn load_current(&mut self) -> Result<()> {
        let Some(track) = self.track_at(self.current) else {
            return Ok(());
        };
        self.loaded = None;
        self.element.load(&track.source)?;
        self.loaded = Some(track.id);
        self.announce(track);
        Ok(())
    }

    /// Record the element's duration for `track` and tell the UI about it.
    fn announce(&mut self, track: Track) {
        let Some(duration) = self.element.duration() else {
            return;
        };
        if let Ok(mut playlist) = self.playlist.lock() {
            playlist.set_duration(self.current, duration);
        }
        let _ = self.events.send(AudioEvent::MetadataLoaded {
            title: track.title,
            duration,
        });
    }

    fn connect_media(&mut self) -> Result<()> {
        let port = self.graph.connect_track()?;
        self.element.connect(port)
    }

    /// Start the element, keeping `playing` in step with the outcome.
    fn start_element(&mut self) -> Result<()> {
        self.connect_media()?;
        self.graph.resume();
        match self.element.play() {
            Ok(()) => {
                self.playing = true;
                Ok(())
            }
            Err(e) => {
                self.playing = false;
                Err(e)
            }
        }
    }

    /// Move to `index`, reload, and keep playing if playback was active.
    fn switch_to(&mut self, index: usize) -> Result<()> {
        let resume = self.playing && !self.using_microphone;
        self.current = index;

        let result = self.load_current().and_then(|()| {
            if resume {
                self.start_element()
            } else {
                Ok(())
            }
        });
        if result.is_err() && !self.using_microphone {
            self.playing = false;
        }
        self.publish();
        result
    }

    pub fn toggle_play(&mut self) -> Result<()> {
        if self.using_microphone {
            self.stop_microphone();
            return Ok(());
        }
        if self.len() == 0 {
            return Ok(());
        }

        let result = self.toggle_media();
        if result.is_err() {
            self.playing = false;
        }
        self.publish();
        result
    }

    fn toggle_media(&mut self) -> Result<()> {
        if !self.current_is_loaded() {
            self.load_current()?;
        }
        if self.playing {
            self.element.pause();
            self.playing = false;
            Ok(())
        } else {
            self.start_element()
        }
    }

    pub fn next(&mut self) -> Result<()> {
        match next_index(self.current, self.len()) {
            Some(i) => self.switch_to(i),
            None => Ok(()),
        }
    }

    pub fn previous(&mut self) -> Result<()> {
        match prev_index(self.current, self.len()) {
            Some(i) => self.switch_to(i),
            None => Ok(()),
        }
    }

    /// Play a specific playlist entry. Switches away from the microphone.
    pub fn select(&mut self, index: usize) -> Result<()> {
        if index >= self.len() {
            return Ok(());
        }
        if self.using_microphone {
            self.stop_microphone();
        }
        self.current = index;

        let result = self.load_current().and_then(|()| self.start_element());
        if result.is_err() {
            self.playing = false;
        }
        self.publish();
        result
    }

    /// Insert `track` at the front of the playlist and make it current.
    pub fn add_track(&mut self, track: Track) -> Result<()> {
        log::info!("transport: adding {:?}", track.title);
        if let Ok(mut playlist) = self.playlist.lock() {
            playlist.prepend(track);
        }
        // Everything shifted down by one; the element still holds the old id.
        self.switch_to(0)
    }

    /// Seek to `percent` of the current track. No-op while the duration is unknown.
    pub fn seek(&mut self, percent: f32) -> Result<()> {
        let Some(total) = self.element.duration().filter(|d| !d.is_zero()) else {
            return Ok(());
        };
        let fraction = (percent / 100.0).clamp(0.0, 1.0);
        let result = self.element.seek(total.mul_f32(fraction));
        self.publish();
        result
    }

    /// Scrub by `seconds`, clamped to the track.
    pub fn seek_by(&mut self, seconds: i64) -> Result<()> {
        if !self.element.is_loaded() {
            return Ok(());
        }
        let position = self.element.position();
        let delta = Duration::from_secs(seconds.unsigned_abs());
        let mut target = if seconds < 0 {
            position.saturating_sub(delta)
        } else {
            position + delta
        };
        if let Some(total) = self.element.duration() {
            target = target.min(total);
        }
        let result = self.element.seek(target);
        self.publish();
        result
    }

    pub fn set_volume(&mut self, percent: u8) {
        self.volume = percent.min(100);
        self.element.set_volume(self.volume as f32 / 100.0);
        self.publish();
    }

    /// Switch the analyser to the microphone. On denial nothing changes.
    pub fn start_microphone(&mut self) -> Result<()> {
        if self.using_microphone {
            return Ok(());
        }
        self.graph.connect_microphone()?;
        self.graph.resume();
        self.element.pause();
        self.using_microphone = true;
        self.playing = true;
        self.publish();
        Ok(())
    }

    pub fn stop_microphone(&mut self) {
        self.graph.disconnect_microphone();
        self.using_microphone = false;
        self.playing = false;
        self.publish();
    }

    /// Periodic clock tick: finish background loads, refresh elapsed time,
    /// and auto-advance at the end.
    pub fn poll(&mut self) -> Result<()> {
        match self.element.poll_load() {
            Some(Ok(())) => {
                let track = self
                    .track_at(self.current)
                    .filter(|t| Some(t.id) == self.loaded);
                if let Some(track) = track {
                    self.announce(track);
                }
            }
            Some(Err(e)) => {
                if !self.using_microphone {
                    self.playing = false;
                }
                self.publish();
                return Err(e);
            }
            None => {}
        }
        if self.playing && !self.using_microphone && self.element.ended() {
            log::debug!("transport: track {} ended", self.current);
            return self.next();
        }
        self.publish();
        Ok(())
    }

    /// Fade out, release every input, and leave the shared state stopped.
    pub fn shutdown(&mut self, fade_out: Duration) {
        if self.playing && !self.using_microphone {
            self.element.fade_out(fade_out);
        }
        self.element.stop();
        self.loaded = None;
        self.graph.teardown();
        self.using_microphone = false;
        self.playing = false;
        self.publish();
    }

    /// Report a failed command to the UI.
    pub fn report(&self, error: Error) {
        log::warn!("transport: {error}");
        let _ = self.events.send(AudioEvent::Failed(error));
    }

    fn publish(&self) {
        let len = self.len();
        let total = if self.current_is_loaded() {
            self.element.duration()
        } else {
            None
        };
        let elapsed = if self.current_is_loaded() {
            let position = self.element.position();
            total.map_or(position, |t| position.min(t))
        } else {
            Duration::ZERO
        };
        let progress = match total {
            Some(t) if !t.is_zero() => {
                (elapsed.as_secs_f32() / t.as_secs_f32() * 100.0).clamp(0.0, 100.0)
            }
            _ => 0.0,
        };

        if let Ok(mut info) = self.playback.lock() {
            info.index = (len > 0).then(|| self.current.min(len - 1));
            info.elapsed = elapsed;
            info.total = total;
            info.progress = progress;
            info.playing = self.playing;
            info.using_microphone = self.using_microphone;
            info.volume = self.volume;
        }
    }
}
