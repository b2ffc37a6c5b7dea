//! The media element: one loaded track, its audible output, and its clock.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};

use crate::error::{Error, Result};
use crate::library::TrackSource;

use super::bus::InputPort;
use super::fetch::{StreamReader, open_stream, probe_duration, read_file};
use super::sink::{create_sink_at, create_stream_sink, decoder, stream_decoder};

/// What the transport needs from a player of a single track.
pub trait MediaElement {
    /// Replace the current media. The element is left paused at zero.
    /// Remote sources may still be opening when this returns.
    fn load(&mut self, source: &TrackSource) -> Result<()>;
    fn is_loaded(&self) -> bool;
    /// Route the element's samples into `port` as well as to the output.
    fn connect(&mut self, port: InputPort) -> Result<()>;
    /// Finish a load that `load` left running in the background. `Some` once
    /// it has completed, successfully or not.
    fn poll_load(&mut self) -> Option<Result<()>>;
    /// Known once the media is loaded (the metadata callback). Live streams
    /// never report one.
    fn duration(&self) -> Option<Duration>;
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    fn seek(&mut self, position: Duration) -> Result<()>;
    /// `volume` is linear gain in `0.0..=1.0`.
    fn set_volume(&mut self, volume: f32);
    fn position(&self) -> Duration;
    /// True once a playing element has run out of samples.
    fn ended(&self) -> bool;
    fn fade_out(&mut self, over: Duration);
    fn stop(&mut self);
}

enum Media {
    /// Fully in memory; seekable and restartable.
    Buffered {
        data: Arc<[u8]>,
        duration: Option<Duration>,
    },
    /// A network stream. Its decoder is consumed by the first sink built.
    Stream {
        url: String,
        decoder: Option<Decoder<StreamReader>>,
    },
}

enum SinkInput {
    Buffered(Arc<[u8]>),
    Stream(Decoder<StreamReader>),
}

/// A stream URL being opened on a worker thread.
struct PendingStream {
    url: String,
    result: Receiver<Result<Decoder<StreamReader>>>,
}

/// `MediaElement` backed by `rodio`. The output stream is opened on first load.
pub struct RodioElement {
    stream_timeout: Duration,
    stream: Option<OutputStream>,
    media: Option<Media>,
    pending: Option<PendingStream>,
    sink: Option<Sink>,
    port: Option<InputPort>,
    volume: f32,
    paused: bool,

    // Track start time and accumulated elapsed when paused.
    started_at: Option<Instant>,
    accumulated: Duration,
}

impl RodioElement {
    pub fn new(stream_timeout: Duration) -> Self {
        Self {
            stream_timeout,
            stream: None,
            media: None,
            pending: None,
            sink: None,
            port: None,
            volume: 1.0,
            paused: true,
            started_at: None,
            accumulated: Duration::ZERO,
        }
    }

    fn ensure_stream(&mut self) -> Result<&OutputStream> {
        if self.stream.is_none() {
            let mut stream = OutputStreamBuilder::open_default_stream()
                .map_err(|e| Error::PlaybackFailure(format!("no audio output: {e}")))?;
            // rodio logs to stderr when OutputStream is dropped, which would
            // scribble over the TUI.
            stream.log_on_drop(false);
            self.stream = Some(stream);
        }
        self.stream
            .as_ref()
            .ok_or_else(|| Error::PlaybackFailure("no audio output".into()))
    }

    /// Open `url` off the audio thread; `poll_load` picks up the outcome.
    fn begin_stream(&mut self, url: String) {
        let (tx, result) = mpsc::channel();
        let timeout = self.stream_timeout;
        let target = url.clone();
        thread::spawn(move || {
            let opened = open_stream(&target, timeout).and_then(stream_decoder);
            // The element may have moved on to another track meanwhile.
            let _ = tx.send(opened);
        });
        log::debug!("element: opening {url} in the background");
        self.pending = Some(PendingStream { url, result });
    }

    /// Replace the sink with a fresh one positioned at `at`.
    fn rebuild_sink(&mut self, at: Duration) -> Result<()> {
        let input = match self.media.as_mut() {
            None => return Ok(()),
            Some(Media::Buffered { data, .. }) => SinkInput::Buffered(Arc::clone(data)),
            Some(Media::Stream { decoder, .. }) => match decoder.take() {
                Some(d) => SinkInput::Stream(d),
                None => {
                    log::debug!("element: streams cannot be rewound; keeping the current sink");
                    return Ok(());
                }
            },
        };
        let port = self.port.clone();
        let stream = self.ensure_stream()?;
        let sink = match input {
            SinkInput::Buffered(data) => create_sink_at(stream, &data, at, port.as_ref())?,
            SinkInput::Stream(decoder) => create_stream_sink(stream, decoder, port.as_ref()),
        };
        sink.set_volume(self.volume);

        if let Some(old) = self.sink.take() {
            old.stop();
        }
        if self.paused {
            self.started_at = None;
        } else {
            sink.play();
            self.started_at = Some(Instant::now());
        }
        self.sink = Some(sink);
        self.accumulated = at;
        Ok(())
    }

    fn elapsed(&self) -> Duration {
        self.accumulated + self.started_at.map_or(Duration::ZERO, |st| st.elapsed())
    }
}

impl MediaElement for RodioElement {
    fn load(&mut self, source: &TrackSource) -> Result<()> {
        self.stop();

        let path = match source {
            TrackSource::File(path) => path,
            TrackSource::Url(url) => {
                self.begin_stream(url.clone());
                return Ok(());
            }
        };

        let data = read_file(path)?;
        let duration = decoder(&data)?
            .total_duration()
            .or_else(|| probe_duration(&data));
        log::info!(
            "element: loaded {} ({} bytes, duration {:?})",
            path.display(),
            data.len(),
            duration
        );

        self.media = Some(Media::Buffered { data, duration });
        if let Err(e) = self.rebuild_sink(Duration::ZERO) {
            self.media = None;
            return Err(e);
        }
        Ok(())
    }

    fn poll_load(&mut self) -> Option<Result<()>> {
        let outcome = match self.pending.as_ref()?.result.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => {
                Err(Error::PlaybackFailure("stream loader exited".into()))
            }
        };
        let url = self.pending.take()?.url;

        let result = outcome.and_then(|decoder| {
            log::info!("element: streaming {url}");
            self.media = Some(Media::Stream {
                url,
                decoder: Some(decoder),
            });
            self.rebuild_sink(Duration::ZERO)
        });
        if result.is_err() {
            self.media = None;
            self.paused = true;
            self.started_at = None;
        }
        Some(result)
    }

    fn is_loaded(&self) -> bool {
        self.media.is_some() || self.pending.is_some()
    }

    fn connect(&mut self, port: InputPort) -> Result<()> {
        if self.port.as_ref().is_some_and(|p| p.id() == port.id()) {
            return Ok(());
        }
        self.port = Some(port);
        // The tap lives inside the sink's source chain, so rewiring means a new sink.
        let at = self.elapsed();
        self.rebuild_sink(at)
    }

    fn duration(&self) -> Option<Duration> {
        match self.media.as_ref()? {
            Media::Buffered { duration, .. } => *duration,
            Media::Stream { .. } => None,
        }
    }

    fn play(&mut self) -> Result<()> {
        if self.pending.is_some() {
            // Starts as soon as the stream is open.
            self.paused = false;
            return Ok(());
        }
        if self.sink.as_ref().is_none_or(Sink::empty) {
            match self.media.as_ref() {
                None => return Err(Error::PlaybackFailure("nothing loaded".into())),
                Some(Media::Stream { url, .. }) => {
                    // A finished stream can only be reopened.
                    let url = url.clone();
                    self.stop();
                    self.begin_stream(url);
                    self.paused = false;
                    return Ok(());
                }
                // Finished (or never built): start over, like a media element does.
                Some(Media::Buffered { .. }) => self.rebuild_sink(Duration::ZERO)?,
            }
        }
        let Some(sink) = self.sink.as_ref() else {
            return Err(Error::PlaybackFailure("nothing loaded".into()));
        };
        if self.paused {
            sink.play();
            self.paused = false;
            self.started_at = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&mut self) {
        if self.paused {
            return;
        }
        if let Some(s) = self.sink.as_ref() {
            s.pause();
        }
        if let Some(st) = self.started_at.take() {
            self.accumulated += st.elapsed();
        }
        self.paused = true;
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        if !matches!(self.media, Some(Media::Buffered { .. })) {
            return Ok(());
        }
        let position = match self.duration() {
            Some(total) => position.min(total),
            None => position,
        };
        // Scrubbing: rebuild the current sink and skip into the data.
        self.rebuild_sink(position)
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(s) = self.sink.as_ref() {
            s.set_volume(self.volume);
        }
    }

    fn position(&self) -> Duration {
        let elapsed = self.elapsed();
        match self.duration() {
            Some(total) => elapsed.min(total),
            None => elapsed,
        }
    }

    fn ended(&self) -> bool {
        !self.paused && self.sink.as_ref().is_some_and(Sink::empty)
    }

    fn fade_out(&mut self, over: Duration) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };
        if self.paused {
            return;
        }
        let fade_out_ms = over.as_millis() as u64;
        if fade_out_ms == 0 {
            sink.set_volume(0.0);
            return;
        }
        let steps: u64 = 20;
        let step_ms = (fade_out_ms / steps).max(1);
        for step in 1..=steps {
            let t = step as f32 / steps as f32;
            sink.set_volume(self.volume * (1.0 - t));
            thread::sleep(Duration::from_millis(step_ms));
        }
        sink.set_volume(0.0);
    }

    fn stop(&mut self) {
        if let Some(s) = self.sink.take() {
            s.stop();
        }
        self.media = None;
        self.pending = None;
        self.paused = true;
        self.started_at = None;
        self.accumulated = Duration::ZERO;
    }
}
