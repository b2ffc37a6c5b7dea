//! The analyser's single input slot.
//!
//! Every audio input (the media element's tap, a microphone capture) writes
//! through an `InputPort`. The bus keeps the most recent mono samples in a ring
//! and accepts writes only from the one port that is currently attached, so at
//! most one input ever feeds the analyser.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Fixed-capacity ring of the latest mono samples.
#[derive(Debug, Clone)]
pub struct SampleRing {
    samples: Vec<f32>,
    write_pos: usize,
}

impl SampleRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity.max(1)],
            write_pos: 0,
        }
    }

    pub fn push_slice(&mut self, input: &[f32]) {
        let cap = self.samples.len();
        // Only the tail can survive a write larger than the ring.
        let input = &input[input.len().saturating_sub(cap)..];
        for &s in input {
            self.samples[self.write_pos] = s;
            self.write_pos = (self.write_pos + 1) % cap;
        }
    }

    /// Copy the most recent `out.len()` samples, oldest first.
    pub fn copy_latest(&self, out: &mut [f32]) {
        let cap = self.samples.len();
        let n = out.len().min(cap);
        let start = (self.write_pos + cap - n) % cap;
        for (i, slot) in out.iter_mut().take(n).enumerate() {
            *slot = self.samples[(start + i) % cap];
        }
        for slot in out.iter_mut().skip(n) {
            *slot = 0.0;
        }
    }

    pub fn clear(&mut self) {
        self.samples.fill(0.0);
        self.write_pos = 0;
    }
}

/// What kind of input a port belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InputKind {
    Media,
    Microphone,
}

#[derive(Debug)]
struct BusState {
    ring: SampleRing,
    /// Id and kind of the attached port.
    attached: Option<(u64, InputKind)>,
}

#[derive(Debug)]
pub struct InputBus {
    state: Mutex<BusState>,
    next_port: AtomicU64,
}

impl InputBus {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(BusState {
                ring: SampleRing::new(capacity),
                attached: None,
            }),
            next_port: AtomicU64::new(1),
        })
    }

    /// Create a new, detached port on this bus.
    pub fn port(self: &Arc<Self>, kind: InputKind) -> InputPort {
        InputPort {
            id: self.next_port.fetch_add(1, Ordering::Relaxed),
            kind,
            bus: Arc::clone(self),
        }
    }

    /// Make `port` the only input. Whatever was attached before is severed first.
    pub fn attach(&self, port: &InputPort) {
        if let Ok(mut st) = self.state.lock() {
            if st.attached.map(|(id, _)| id) != Some(port.id) {
                // Samples from the previous input must not reach the analyser.
                st.ring.clear();
                st.attached = Some((port.id, port.kind));
            }
        }
    }

    /// Sever `port` if it is the attached one. Returns whether anything changed.
    pub fn detach(&self, port: &InputPort) -> bool {
        match self.state.lock() {
            Ok(mut st) if st.attached.is_some_and(|(id, _)| id == port.id) => {
                st.attached = None;
                true
            }
            _ => false,
        }
    }

    #[cfg(test)]
    pub fn attached_kind(&self) -> Option<InputKind> {
        self.state.lock().ok().and_then(|st| st.attached.map(|(_, kind)| kind))
    }

    /// Copy the most recent samples into `out`, oldest first.
    pub fn copy_latest(&self, out: &mut [f32]) {
        if let Ok(st) = self.state.lock() {
            st.ring.copy_latest(out);
        }
    }

    fn write(&self, port_id: u64, samples: &[f32]) -> bool {
        match self.state.lock() {
            Ok(mut st) if st.attached.is_some_and(|(id, _)| id == port_id) => {
                st.ring.push_slice(samples);
                true
            }
            _ => false,
        }
    }
}

/// A connection point between one input and the bus.
///
/// Cloning a port does not create a new input: clones share the id, which is
/// how the media element reuses its single port across tracks.
#[derive(Debug, Clone)]
pub struct InputPort {
    id: u64,
    kind: InputKind,
    bus: Arc<InputBus>,
}

impl InputPort {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn bus(&self) -> &Arc<InputBus> {
        &self.bus
    }

    /// Feed mono samples. Dropped unless this port is the attached one.
    pub fn push(&self, samples: &[f32]) -> bool {
        self.bus.write(self.id, samples)
    }
}
