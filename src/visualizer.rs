//! Visualization sampler.
//!
//! On a per-frame cadence the sampler pulls the analyser's byte spectrum,
//! derives bar levels, a "waveform" strip and five energy bands, keeps a small
//! particle stream alive, and publishes immutable snapshots to subscribers.

mod particles;
mod projection;
mod publish;
mod sampler;
mod schedule;

pub use particles::Particle;
pub use projection::{BAND_LABELS, BAR_COUNT, WAVEFORM_POINTS};
pub use sampler::Sampler;

use crate::audio::AnalysisHandle;

/// Anything the sampler can read a byte spectrum from.
pub trait FrequencySource {
    fn frequency_data(&mut self) -> Vec<u8>;
}

impl FrequencySource for AnalysisHandle {
    fn frequency_data(&mut self) -> Vec<u8> {
        self.read_frequency_buffer()
    }
}

/// One published frame. Every level is in `0..=100`.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualSnapshot {
    pub bars: Vec<f32>,
    pub waveform: Vec<f32>,
    /// Bass, low mid, mid, high mid, treble.
    pub bands: [f32; 5],
    pub particles: Vec<Particle>,
    /// False once the frame task has stopped; the levels are then stale.
    pub active: bool,
}

impl Default for VisualSnapshot {
    fn default() -> Self {
        Self {
            bars: vec![0.0; BAR_COUNT],
            waveform: vec![0.0; WAVEFORM_POINTS],
            bands: [0.0; 5],
            particles: Vec::new(),
            active: false,
        }
    }
}

#[cfg(test)]
mod tests;
