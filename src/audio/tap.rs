//! A pass-through `rodio` source that also feeds the analyser bus.

use std::time::Duration;

use rodio::source::SeekError;
use rodio::{ChannelCount, SampleRate, Source};

use super::bus::InputPort;

/// Mono frames buffered before each write to the bus.
const BATCH: usize = 256;

/// Wraps a decoded source; every sample still reaches the output, and a mono
/// downmix of each frame is pushed to `port`.
pub struct TapSource<S> {
    inner: S,
    port: InputPort,
    channels: ChannelCount,
    sample_rate: SampleRate,
    frame_sum: f32,
    frame_fill: u16,
    pending: Vec<f32>,
}

impl<S> TapSource<S>
where
    S: Source<Item = f32>,
{
    pub fn new(source: S, port: InputPort) -> Self {
        let channels = source.channels().max(1);
        let sample_rate = source.sample_rate();
        Self {
            inner: source,
            port,
            channels,
            sample_rate,
            frame_sum: 0.0,
            frame_fill: 0,
            pending: Vec::with_capacity(BATCH),
        }
    }

    fn flush(&mut self) {
        if !self.pending.is_empty() {
            self.port.push(&self.pending);
            self.pending.clear();
        }
    }
}

impl<S> Iterator for TapSource<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let Some(sample) = self.inner.next() else {
            self.flush();
            return None;
        };

        self.frame_sum += sample;
        self.frame_fill += 1;
        if self.frame_fill >= self.channels {
            self.pending.push(self.frame_sum / self.channels as f32);
            self.frame_sum = 0.0;
            self.frame_fill = 0;
            if self.pending.len() >= BATCH {
                self.flush();
            }
        }

        Some(sample)
    }
}

impl<S> Source for TapSource<S>
where
    S: Source<Item = f32>,
{
    fn current_span_len(&self) -> Option<usize> {
        self.inner.current_span_len()
    }

    fn channels(&self) -> ChannelCount {
        self.channels
    }

    fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }

    fn try_seek(&mut self, pos: Duration) -> Result<(), SeekError> {
        self.frame_sum = 0.0;
        self.frame_fill = 0;
        self.pending.clear();
        self.inner.try_seek(pos)
    }
}
