use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::{AnalysisSettings, AudioSettings};
use crate::library::PlaylistHandle;

use super::analyser::AnalysisHandle;
use super::capture::{CpalInput, InputDevice};
use super::element::{MediaElement, RodioElement};
use super::graph::AudioGraph;
use super::transport::Transport;
use super::types::{AudioCmd, AudioEvent, PlaybackHandle};

pub(super) struct AudioThreadArgs {
    pub playlist: PlaylistHandle,
    pub playback: PlaybackHandle,
    pub analysis: AnalysisHandle,
    pub events: Sender<AudioEvent>,
    pub audio: AudioSettings,
    pub analysis_settings: AnalysisSettings,
}

pub(super) fn spawn_audio_thread(rx: Receiver<AudioCmd>, args: AudioThreadArgs) -> JoinHandle<()> {
    thread::spawn(move || {
        let AudioThreadArgs {
            playlist,
            playback,
            analysis,
            events,
            audio,
            analysis_settings,
        } = args;

        let element = RodioElement::new(Duration::from_millis(audio.stream_timeout_ms));
        let graph = AudioGraph::new(analysis, analysis_settings, CpalInput);
        let mut transport = Transport::new(
            element,
            graph,
            playlist,
            playback,
            events,
            audio.initial_volume,
        );

        let poll = Duration::from_millis(audio.poll_interval_ms.max(1));
        log::info!("audio: thread started (poll every {:?})", poll);

        loop {
            match rx.recv_timeout(poll) {
                Ok(AudioCmd::Quit { fade_out_ms }) => {
                    transport.shutdown(Duration::from_millis(fade_out_ms));
                    break;
                }
                Ok(cmd) => dispatch(&mut transport, cmd),
                Err(RecvTimeoutError::Timeout) => {
                    // Periodic check for elapsed time and auto-advance.
                    if let Err(e) = transport.poll() {
                        transport.report(e);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    transport.shutdown(Duration::ZERO);
                    break;
                }
            }
        }
        log::info!("audio: thread stopped");
    })
}

pub(super) fn dispatch<E: MediaElement, D: InputDevice>(
    transport: &mut Transport<E, D>,
    cmd: AudioCmd,
) {
    log::debug!("audio: {:?}", cmd);
    let result = match cmd {
        AudioCmd::TogglePlay => transport.toggle_play(),
        AudioCmd::Next => transport.next(),
        AudioCmd::Prev => transport.previous(),
        AudioCmd::Select(i) => transport.select(i),
        AudioCmd::AddTrack(track) => transport.add_track(track),
        AudioCmd::Seek(percent) => transport.seek(percent),
        AudioCmd::SeekBy(secs) => transport.seek_by(secs),
        AudioCmd::SetVolume(v) => {
            transport.set_volume(v);
            Ok(())
        }
        AudioCmd::StartMicrophone => transport.start_microphone(),
        AudioCmd::StopMicrophone => {
            transport.stop_microphone();
            Ok(())
        }
        AudioCmd::Quit { fade_out_ms } => {
            transport.shutdown(Duration::from_millis(fade_out_ms));
            Ok(())
        }
    };
    if let Err(e) = result {
        transport.report(e);
    }
}
