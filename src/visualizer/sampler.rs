use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::VisualizerSettings;

use super::particles::ParticleField;
use super::projection::{bands, bar_levels, mean, waveform};
use super::publish::SnapshotPublisher;
use super::schedule::PeriodicTask;
use super::{FrequencySource, VisualSnapshot};

const PARTICLE_TICK: Duration = Duration::from_millis(50);

pub struct Sampler {
    frame: PeriodicTask,
    particle_tick: PeriodicTask,
    field: ParticleField,
    show_particles: bool,
    active: bool,
    closed: bool,
    rng: StdRng,
    publisher: SnapshotPublisher,
    latest: Arc<VisualSnapshot>,
}

impl Sampler {
    pub fn new(settings: &VisualizerSettings) -> Self {
        Self::with_rng(settings, StdRng::from_os_rng())
    }

    pub fn with_rng(settings: &VisualizerSettings, rng: StdRng) -> Self {
        Self {
            frame: PeriodicTask::new(Duration::from_millis(settings.frame_interval_ms)),
            particle_tick: PeriodicTask::new(PARTICLE_TICK),
            field: ParticleField::default(),
            show_particles: settings.show_particles,
            active: false,
            closed: false,
            rng,
            publisher: SnapshotPublisher::default(),
            latest: Arc::new(VisualSnapshot::default()),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<Arc<VisualSnapshot>> {
        self.publisher.subscribe()
    }

    /// Feed the "should analyze" predicate. Turning on schedules a frame for
    /// `now`; turning off cancels the frame task at once.
    pub fn set_active(&mut self, active: bool, now: Instant) {
        if self.closed || active == self.active {
            return;
        }
        self.active = active;
        if active {
            self.frame.start(now);
            // Particles keep drifting and fading after playback stops.
            self.particle_tick.start(now);
        } else {
            self.frame.stop();
            self.publish();
        }
    }

    /// Run whatever is due at `now`. Returns whether a snapshot was published.
    pub fn advance<S: FrequencySource + ?Sized>(&mut self, now: Instant, source: &mut S) -> bool {
        let mut changed = false;
        if self.frame.poll(now) {
            self.run_frame(source);
            changed = true;
        }
        if self.particle_tick.poll(now) && self.field.tick() {
            changed = true;
        }
        if changed {
            self.publish();
        }
        changed
    }

    /// How long the caller may sleep before something is due.
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        [self.frame.time_until_next(now), self.particle_tick.time_until_next(now)]
            .into_iter()
            .flatten()
            .min()
    }

    /// Cancel both tasks and drop every subscriber.
    pub fn shutdown(&mut self) {
        self.frame.stop();
        self.particle_tick.stop();
        self.active = false;
        self.closed = true;
        self.publisher.clear();
    }

    fn run_frame<S: FrequencySource + ?Sized>(&mut self, source: &mut S) {
        let data = source.frequency_data();
        let bars = bar_levels(&data);
        let wave = waveform(&data);
        let banded = bands(&bars);

        if self.show_particles {
            self.field.maybe_emit(mean(&bars), &mut self.rng);
        }

        self.latest = Arc::new(VisualSnapshot {
            bars,
            waveform: wave,
            bands: banded,
            particles: Vec::new(),
            active: self.active,
        });
    }

    fn publish(&mut self) {
        let snapshot = Arc::new(VisualSnapshot {
            particles: self.field.particles().to_vec(),
            active: self.active,
            ..(*self.latest).clone()
        });
        self.publisher.publish(&snapshot);
        self.latest = snapshot;
    }
}
