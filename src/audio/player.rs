use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::Settings;
use crate::library::PlaylistHandle;

use super::analyser::AnalysisHandle;
use super::thread::{AudioThreadArgs, spawn_audio_thread};
use super::types::{AudioCmd, AudioEvent, PlaybackHandle, PlaybackInfo};

pub struct AudioPlayer {
    tx: Sender<AudioCmd>,
    events: Receiver<AudioEvent>,
    playback: PlaybackHandle,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl AudioPlayer {
    pub fn new(playlist: PlaylistHandle, analysis: AnalysisHandle, settings: &Settings) -> Self {
        let (tx, rx) = mpsc::channel::<AudioCmd>();
        let (event_tx, events) = mpsc::channel::<AudioEvent>();
        let playback_info: PlaybackHandle = Arc::new(Mutex::new(PlaybackInfo {
            volume: settings.audio.initial_volume.min(100),
            ..PlaybackInfo::default()
        }));

        let audio_handle = spawn_audio_thread(
            rx,
            AudioThreadArgs {
                playlist,
                playback: playback_info.clone(),
                analysis,
                events: event_tx,
                audio: settings.audio.clone(),
                analysis_settings: settings.analysis.clone(),
            },
        );

        Self {
            tx,
            events,
            playback: playback_info,
            join: Mutex::new(Some(audio_handle)),
        }
    }

    pub fn playback_handle(&self) -> PlaybackHandle {
        self.playback.clone()
    }

    pub fn send(&self, cmd: AudioCmd) -> Result<(), mpsc::SendError<AudioCmd>> {
        self.tx.send(cmd)
    }

    /// Events the audio thread produced since the last call.
    pub fn drain_events(&self) -> Vec<AudioEvent> {
        self.events.try_iter().collect()
    }

    pub fn quit_softly(&self, fade_out: Duration) {
        let _ = self.send(AudioCmd::Quit {
            fade_out_ms: fade_out.as_millis() as u64,
        });

        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}
