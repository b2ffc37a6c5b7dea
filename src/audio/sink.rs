//! Utilities for creating `rodio` sinks from track data.
//!
//! The helpers here decode in-memory bytes or a network stream, optionally
//! route the samples through the analyser tap, and hand back a paused `Sink`.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use rodio::{Decoder, OutputStream, Sink, Source};

use crate::error::{Error, Result};

use super::bus::InputPort;
use super::fetch::StreamReader;
use super::tap::TapSource;

pub(super) fn decoder(data: &Arc<[u8]>) -> Result<Decoder<Cursor<Arc<[u8]>>>> {
    Decoder::builder()
        .with_data(Cursor::new(Arc::clone(data)))
        .with_byte_len(data.len() as u64)
        .build()
        .map_err(|e| Error::PlaybackFailure(format!("decode failed: {e}")))
}

/// Decoder over a live body. It can only move forward.
pub(super) fn stream_decoder(reader: StreamReader) -> Result<Decoder<StreamReader>> {
    Decoder::builder()
        .with_data(reader)
        .with_seekable(false)
        .build()
        .map_err(|e| Error::PlaybackFailure(format!("decode failed: {e}")))
}

/// Create a paused `Sink` that starts playback at `start_at`.
pub(super) fn create_sink_at(
    stream: &OutputStream,
    data: &Arc<[u8]>,
    start_at: Duration,
    port: Option<&InputPort>,
) -> Result<Sink> {
    // `skip_duration` is our seeking primitive; even Duration::ZERO is fine.
    let source = decoder(data)?.skip_duration(start_at);
    Ok(paused_sink(stream, source, port))
}

/// Create a paused `Sink` over an already opened stream decoder.
pub(super) fn create_stream_sink(
    stream: &OutputStream,
    source: Decoder<StreamReader>,
    port: Option<&InputPort>,
) -> Sink {
    paused_sink(stream, source, port)
}

fn paused_sink<S>(stream: &OutputStream, source: S, port: Option<&InputPort>) -> Sink
where
    S: Source + Send + 'static,
{
    let sink = Sink::connect_new(stream.mixer());
    sink.pause();
    match port {
        Some(port) => sink.append(TapSource::new(source, port.clone())),
        None => sink.append(source),
    }
    sink
}
