//! Frequency analyser and the shared analysis context.
//!
//! The analyser follows the byte-frequency contract of a Web Audio
//! `AnalyserNode`: Blackman window, FFT, magnitude scaled by `1/N`, exponential
//! smoothing against the previous read, then decibels mapped onto `0..=255`.

use std::f32::consts::PI;
use std::sync::{Arc, Mutex};

use rustfft::{Fft, FftPlanner, num_complex::Complex};

use crate::config::AnalysisSettings;

use super::bus::InputBus;

pub struct Analyser {
    fft_size: usize,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    bytes: Vec<u8>,
}

impl Analyser {
    pub fn new(settings: &AnalysisSettings) -> Self {
        let fft_size = settings.fft_size;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let bins = fft_size / 2;

        Self {
            fft_size,
            smoothing: settings.smoothing.clamp(0.0, 1.0),
            min_decibels: settings.min_decibels,
            max_decibels: settings.max_decibels,
            fft,
            window: (0..fft_size).map(|i| blackman_window(i, fft_size)).collect(),
            spectrum: vec![Complex::new(0.0, 0.0); fft_size],
            smoothed: vec![0.0; bins],
            bytes: vec![0; bins],
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Analyse one window of `fft_size` samples (oldest first) and return the
    /// updated byte magnitudes.
    pub fn process(&mut self, samples: &[f32]) -> &[u8] {
        for (i, slot) in self.spectrum.iter_mut().enumerate() {
            let s = samples.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(s * self.window[i], 0.0);
        }

        self.fft.process(&mut self.spectrum);

        let scale = 1.0 / self.fft_size as f32;
        let range = self.max_decibels - self.min_decibels;
        for k in 0..self.smoothed.len() {
            let magnitude = self.spectrum[k].norm() * scale;
            let mut s = self.smoothing * self.smoothed[k] + (1.0 - self.smoothing) * magnitude;
            if !s.is_finite() {
                s = 0.0;
            }
            self.smoothed[k] = s;

            let db = 20.0 * s.log10();
            let scaled = (255.0 / range * (db - self.min_decibels)).floor();
            self.bytes[k] = if scaled.is_nan() {
                0
            } else {
                scaled.clamp(0.0, 255.0) as u8
            };
        }

        &self.bytes
    }

    /// Byte magnitudes from the last `process` call.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Blackman window (alpha = 0.16) over `size` points.
pub fn blackman_window(index: usize, size: usize) -> f32 {
    let x = index as f32 / size as f32;
    0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ContextState {
    /// Created but not yet allowed to process; resumed on the first playback gesture.
    Suspended,
    Running,
    Closed,
}

/// The analyser together with its input bus.
pub struct AnalysisContext {
    state: ContextState,
    analyser: Analyser,
    bus: Arc<InputBus>,
    window: Vec<f32>,
}

impl AnalysisContext {
    pub fn new(settings: &AnalysisSettings) -> Self {
        let analyser = Analyser::new(settings);
        let size = analyser.fft_size();
        Self {
            state: ContextState::Suspended,
            analyser,
            bus: InputBus::new(size),
            window: vec![0.0; size],
        }
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn bus(&self) -> Arc<InputBus> {
        Arc::clone(&self.bus)
    }

    /// Returns true when the context actually transitioned to running.
    pub fn resume(&mut self) -> bool {
        if self.state == ContextState::Suspended {
            self.state = ContextState::Running;
            true
        } else {
            false
        }
    }

    pub fn close(&mut self) {
        self.state = ContextState::Closed;
    }

    /// Current byte magnitudes. Only a running context advances; otherwise the
    /// last computed (possibly all-zero) buffer is returned.
    pub fn read_frequency_buffer(&mut self) -> Vec<u8> {
        if self.state == ContextState::Running {
            self.bus.copy_latest(&mut self.window);
            self.analyser.process(&self.window);
        }
        self.analyser.bytes().to_vec()
    }
}

/// Thread-safe, lazily populated handle to the process-wide analysis context.
///
/// The audio thread creates and tears down the context; the UI thread reads
/// frequency buffers through the same handle.
#[derive(Clone)]
pub struct AnalysisHandle {
    inner: Arc<Mutex<Option<AnalysisContext>>>,
    bins: usize,
}

impl AnalysisHandle {
    pub fn new(settings: &AnalysisSettings) -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
            bins: settings.fft_size / 2,
        }
    }

    /// Bus of the live context, creating the context if absent (or closed).
    pub(super) fn ensure_context(&self, settings: &AnalysisSettings) -> Option<Arc<InputBus>> {
        let mut guard = self.inner.lock().ok()?;
        let reusable = matches!(guard.as_ref(), Some(ctx) if ctx.state() != ContextState::Closed);
        if !reusable {
            log::info!(
                "analysis: creating context (fft_size={}, smoothing={})",
                settings.fft_size,
                settings.smoothing
            );
            *guard = Some(AnalysisContext::new(settings));
        }
        guard.as_ref().map(AnalysisContext::bus)
    }

    pub fn resume(&self) -> bool {
        self.inner
            .lock()
            .ok()
            .and_then(|mut g| g.as_mut().map(AnalysisContext::resume))
            .unwrap_or(false)
    }

    pub fn close(&self) {
        if let Ok(mut g) = self.inner.lock() {
            if let Some(ctx) = g.as_mut() {
                ctx.close();
            }
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> Option<ContextState> {
        self.inner
            .lock()
            .ok()
            .and_then(|g| g.as_ref().map(AnalysisContext::state))
    }

    #[cfg(test)]
    pub fn attached_input(&self) -> Option<super::bus::InputKind> {
        self.inner
            .lock()
            .ok()
            .and_then(|g| g.as_ref().and_then(|ctx| ctx.bus.attached_kind()))
    }

    /// Current byte magnitudes, zeroed before the context exists.
    pub fn read_frequency_buffer(&self) -> Vec<u8> {
        match self.inner.lock() {
            Ok(mut g) => match g.as_mut() {
                Some(ctx) => ctx.read_frequency_buffer(),
                None => vec![0; self.bins],
            },
            Err(_) => vec![0; self.bins],
        }
    }
}
